//! Descriptor update templates: the creation shadow and the builder that
//! rewrites an application data blob with real handles.

use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use tracing::error;

use crate::chain::LocalChain;
use crate::dispatch::DeviceDispatchObject;
use crate::error::LayerError;
use crate::validation::Command;
use crate::wrap::{read_array, HandleWrapper};

/// What one descriptor slot of a template blob holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Image,
    Buffer,
    TexelBufferView,
    AccelerationStructureKHR,
    AccelerationStructureNV,
    /// Raw bytes, copied once per entry
    InlineUniformBlock { size: usize },
}

impl SlotKind {
    /// Payload kind of `descriptor_type`. `count` is only used for inline
    /// uniform blocks, where it is a byte size.
    pub fn of(descriptor_type: vk::DescriptorType, count: u32) -> Result<Self, LayerError> {
        let kind = match descriptor_type {
            vk::DescriptorType::SAMPLER
            | vk::DescriptorType::COMBINED_IMAGE_SAMPLER
            | vk::DescriptorType::SAMPLED_IMAGE
            | vk::DescriptorType::STORAGE_IMAGE
            | vk::DescriptorType::INPUT_ATTACHMENT => SlotKind::Image,
            vk::DescriptorType::UNIFORM_BUFFER
            | vk::DescriptorType::STORAGE_BUFFER
            | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
            | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC => SlotKind::Buffer,
            vk::DescriptorType::UNIFORM_TEXEL_BUFFER | vk::DescriptorType::STORAGE_TEXEL_BUFFER => {
                SlotKind::TexelBufferView
            }
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR => SlotKind::AccelerationStructureKHR,
            vk::DescriptorType::ACCELERATION_STRUCTURE_NV => SlotKind::AccelerationStructureNV,
            vk::DescriptorType::INLINE_UNIFORM_BLOCK => SlotKind::InlineUniformBlock {
                size: count as usize,
            },
            other => return Err(LayerError::UnknownDescriptorType(other)),
        };
        Ok(kind)
    }

    /// Bytes one slot of this kind occupies in the blob.
    pub fn size(&self) -> usize {
        match self {
            SlotKind::Image => size_of::<vk::DescriptorImageInfo>(),
            SlotKind::Buffer => size_of::<vk::DescriptorBufferInfo>(),
            SlotKind::TexelBufferView => size_of::<vk::BufferView>(),
            SlotKind::AccelerationStructureKHR => size_of::<vk::AccelerationStructureKHR>(),
            SlotKind::AccelerationStructureNV => size_of::<vk::AccelerationStructureNV>(),
            SlotKind::InlineUniformBlock { size } => *size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSlot {
    pub offset: usize,
    pub kind: SlotKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateEntry {
    pub binding: u32,
    pub array_element: u32,
    pub count: u32,
    pub descriptor_type: vk::DescriptorType,
    pub offset: usize,
    pub stride: usize,
}

/// Shadow of a descriptor update template's creation parameters.
#[derive(Debug, Clone)]
pub struct TemplateState {
    pub template_type: vk::DescriptorUpdateTemplateType,
    pub entries: Vec<TemplateEntry>,
}

impl TemplateState {
    /// # Safety
    /// `info` must be a valid create info.
    pub unsafe fn from_create_info(info: &vk::DescriptorUpdateTemplateCreateInfo<'_>) -> Self {
        let entries = unsafe {
            read_array(
                info.p_descriptor_update_entries,
                info.descriptor_update_entry_count,
            )
        };
        Self {
            template_type: info.template_type,
            entries: entries
                .iter()
                .map(|e| TemplateEntry {
                    binding: e.dst_binding,
                    array_element: e.dst_array_element,
                    count: e.descriptor_count,
                    descriptor_type: e.descriptor_type,
                    offset: e.offset,
                    stride: e.stride,
                })
                .collect(),
        }
    }

    /// Every slot the template reads from an application blob, in entry
    /// order. Entries with an unsupported descriptor type are left out.
    pub fn slots(&self) -> Vec<TemplateSlot> {
        let mut slots = Vec::new();
        for entry in &self.entries {
            let kind = match SlotKind::of(entry.descriptor_type, entry.count) {
                Ok(kind) => kind,
                Err(e) => {
                    error!("{}", e);
                    debug_assert!(false, "{}", e);
                    continue;
                }
            };
            if let SlotKind::InlineUniformBlock { .. } = kind {
                slots.push(TemplateSlot {
                    offset: entry.offset,
                    kind,
                });
                continue;
            }
            for element in 0..entry.count as usize {
                slots.push(TemplateSlot {
                    offset: entry.offset + element * entry.stride,
                    kind,
                });
            }
        }
        slots
    }

    /// Copy of `data` with every handle replaced by the real one.
    ///
    /// # Safety
    /// `data` must hold every slot this template describes.
    pub unsafe fn build_unwrapped(
        &self,
        wrapper: &HandleWrapper,
        data: *const c_void,
    ) -> UnwrappedTemplateData {
        let slots = self.slots();
        let len = slots
            .iter()
            .map(|slot| slot.offset + slot.kind.size())
            .max()
            .unwrap_or(0);
        let mut words = vec![0u64; len.div_ceil(8)];
        if data.is_null() {
            return UnwrappedTemplateData { words, len };
        }

        let src_base = data.cast::<u8>();
        let dst_base = words.as_mut_ptr().cast::<u8>();
        for slot in slots {
            unsafe {
                let src = src_base.add(slot.offset);
                let dst = dst_base.add(slot.offset);
                match slot.kind {
                    SlotKind::Image => {
                        let mut info = ptr::read_unaligned(src.cast::<vk::DescriptorImageInfo>());
                        info.sampler = wrapper.unwrap(info.sampler);
                        info.image_view = wrapper.unwrap(info.image_view);
                        ptr::write_unaligned(dst.cast(), info);
                    }
                    SlotKind::Buffer => {
                        let mut info = ptr::read_unaligned(src.cast::<vk::DescriptorBufferInfo>());
                        info.buffer = wrapper.unwrap(info.buffer);
                        ptr::write_unaligned(dst.cast(), info);
                    }
                    SlotKind::TexelBufferView => {
                        let view = ptr::read_unaligned(src.cast::<vk::BufferView>());
                        ptr::write_unaligned(dst.cast(), wrapper.unwrap(view));
                    }
                    SlotKind::AccelerationStructureKHR => {
                        let structure = ptr::read_unaligned(src.cast::<vk::AccelerationStructureKHR>());
                        ptr::write_unaligned(dst.cast(), wrapper.unwrap(structure));
                    }
                    SlotKind::AccelerationStructureNV => {
                        let structure = ptr::read_unaligned(src.cast::<vk::AccelerationStructureNV>());
                        ptr::write_unaligned(dst.cast(), wrapper.unwrap(structure));
                    }
                    SlotKind::InlineUniformBlock { size } => {
                        ptr::copy_nonoverlapping(src, dst, size);
                    }
                }
            }
        }
        UnwrappedTemplateData { words, len }
    }
}

/// Layer-owned template blob, zero where the template reads nothing.
pub struct UnwrappedTemplateData {
    words: Vec<u64>,
    len: usize,
}

impl UnwrappedTemplateData {
    pub fn as_ptr(&self) -> *const c_void {
        self.words.as_ptr().cast()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.len) }
    }
}

// ── Entry points ────────────────────────────────────────────

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkCreateDescriptorUpdateTemplate` validity rules.
    pub unsafe fn create_descriptor_update_template(
        &self,
        p_create_info: *const vk::DescriptorUpdateTemplateCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_descriptor_update_template: *mut vk::DescriptorUpdateTemplate,
    ) -> vk::Result {
        let result = self.create_object(
            Command::CreateDescriptorUpdateTemplate,
            p_descriptor_update_template,
            || unsafe {
                if !self.wrap_handles() {
                    return self.table.create_descriptor_update_template(
                        self.device(),
                        p_create_info,
                        p_allocator,
                        p_descriptor_update_template,
                    );
                }
                let mut local = *p_create_info;
                if local.template_type == vk::DescriptorUpdateTemplateType::DESCRIPTOR_SET {
                    local.descriptor_set_layout = self.wrapper.unwrap(local.descriptor_set_layout);
                }
                if local.template_type == vk::DescriptorUpdateTemplateType::PUSH_DESCRIPTORS_KHR {
                    local.pipeline_layout = self.wrapper.unwrap(local.pipeline_layout);
                }
                self.table.create_descriptor_update_template(
                    self.device(),
                    &local,
                    p_allocator,
                    p_descriptor_update_template,
                )
            },
        );
        if result == vk::Result::SUCCESS && self.wrap_handles() {
            let state = unsafe { TemplateState::from_create_info(&*p_create_info) };
            self.state
                .write()
                .templates
                .insert(unsafe { *p_descriptor_update_template }, Arc::new(state));
        }
        result
    }

    /// # Safety
    /// Pointers must follow `vkDestroyDescriptorUpdateTemplate` validity rules.
    pub unsafe fn destroy_descriptor_update_template(
        &self,
        descriptor_update_template: vk::DescriptorUpdateTemplate,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.state
            .write()
            .templates
            .remove(&descriptor_update_template);
        self.destroy_object(
            Command::DestroyDescriptorUpdateTemplate,
            descriptor_update_template,
            |real| unsafe {
                self.table
                    .destroy_descriptor_update_template(self.device(), real, p_allocator)
            },
        );
    }

    /// Unwrapped copy of a template blob, or `None` when the template is not
    /// tracked (the blob is then forwarded as is).
    unsafe fn unwrapped_blob(
        &self,
        template: vk::DescriptorUpdateTemplate,
        data: *const c_void,
    ) -> Option<UnwrappedTemplateData> {
        let state = self.state.read().templates.get(&template).cloned();
        match state {
            Some(state) => Some(unsafe { state.build_unwrapped(&self.wrapper, data) }),
            None => {
                error!("{}", LayerError::MissingTemplate(template.as_raw()));
                None
            }
        }
    }

    /// # Safety
    /// Pointers must follow `vkUpdateDescriptorSetWithTemplate` validity rules.
    pub unsafe fn update_descriptor_set_with_template(
        &self,
        descriptor_set: vk::DescriptorSet,
        descriptor_update_template: vk::DescriptorUpdateTemplate,
        p_data: *const c_void,
    ) {
        self.chain()
            .intercept_void(Command::UpdateDescriptorSetWithTemplate, || unsafe {
                if !self.wrap_handles() {
                    return self.table.update_descriptor_set_with_template(
                        self.device(),
                        descriptor_set,
                        descriptor_update_template,
                        p_data,
                    );
                }
                let blob = self.unwrapped_blob(descriptor_update_template, p_data);
                let data = blob.as_ref().map_or(p_data, UnwrappedTemplateData::as_ptr);
                self.table.update_descriptor_set_with_template(
                    self.device(),
                    self.wrapper.unwrap(descriptor_set),
                    self.wrapper.unwrap(descriptor_update_template),
                    data,
                );
            });
    }

    /// # Safety
    /// Pointers must follow `vkCmdPushDescriptorSetWithTemplateKHR` validity
    /// rules.
    pub unsafe fn cmd_push_descriptor_set_with_template_khr(
        &self,
        command_buffer: vk::CommandBuffer,
        descriptor_update_template: vk::DescriptorUpdateTemplate,
        layout: vk::PipelineLayout,
        set: u32,
        p_data: *const c_void,
    ) {
        self.chain()
            .intercept_void(Command::CmdPushDescriptorSetWithTemplateKHR, || unsafe {
                if !self.wrap_handles() {
                    return self.table.cmd_push_descriptor_set_with_template_khr(
                        command_buffer,
                        descriptor_update_template,
                        layout,
                        set,
                        p_data,
                    );
                }
                let blob = self.unwrapped_blob(descriptor_update_template, p_data);
                let data = blob.as_ref().map_or(p_data, UnwrappedTemplateData::as_ptr);
                self.table.cmd_push_descriptor_set_with_template_khr(
                    command_buffer,
                    self.wrapper.unwrap(descriptor_update_template),
                    self.wrapper.unwrap(layout),
                    set,
                    data,
                );
            });
    }

    /// The info struct form of the push above. Its chain may carry a
    /// pipeline layout description whose set layouts are unwrapped too.
    ///
    /// # Safety
    /// Pointers must follow `vkCmdPushDescriptorSetWithTemplate2KHR` validity
    /// rules.
    pub unsafe fn cmd_push_descriptor_set_with_template2_khr(
        &self,
        command_buffer: vk::CommandBuffer,
        p_push_descriptor_set_with_template_info: *const vk::PushDescriptorSetWithTemplateInfoKHR<'_>,
    ) {
        self.chain()
            .intercept_void(Command::CmdPushDescriptorSetWithTemplate2KHR, || unsafe {
                if !self.wrap_handles() {
                    return self.table.cmd_push_descriptor_set_with_template2_khr(
                        command_buffer,
                        p_push_descriptor_set_with_template_info,
                    );
                }
                let mut local = *p_push_descriptor_set_with_template_info;
                let chain = LocalChain::copy(&self.wrapper, local.p_next);
                local.p_next = chain.head();
                let blob = self.unwrapped_blob(local.descriptor_update_template, local.p_data);
                if let Some(blob) = &blob {
                    local.p_data = blob.as_ptr();
                }
                local.descriptor_update_template =
                    self.wrapper.unwrap(local.descriptor_update_template);
                local.layout = self.wrapper.unwrap(local.layout);
                self.table
                    .cmd_push_descriptor_set_with_template2_khr(command_buffer, &local);
            });
    }
}
