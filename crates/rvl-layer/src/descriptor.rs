use std::ffi::c_void;
use std::ptr;

use ash::vk;

use crate::chain::LocalChain;
use crate::dispatch::DeviceDispatchObject;
use crate::template::SlotKind;
use crate::validation::Command;
use crate::wrap::{local_ptr, read_array};

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkCreateDescriptorSetLayout` validity rules.
    pub unsafe fn create_descriptor_set_layout(
        &self,
        p_create_info: *const vk::DescriptorSetLayoutCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_set_layout: *mut vk::DescriptorSetLayout,
    ) -> vk::Result {
        self.create_object(Command::CreateDescriptorSetLayout, p_set_layout, || unsafe {
            if !self.wrap_handles() {
                return self.table.create_descriptor_set_layout(
                    self.device(),
                    p_create_info,
                    p_allocator,
                    p_set_layout,
                );
            }
            let mut local = *p_create_info;
            let mut bindings = read_array(local.p_bindings, local.binding_count);
            let mut samplers = Vec::with_capacity(bindings.len());
            for binding in &mut bindings {
                let immutable = matches!(
                    binding.descriptor_type,
                    vk::DescriptorType::SAMPLER | vk::DescriptorType::COMBINED_IMAGE_SAMPLER
                );
                if immutable && !binding.p_immutable_samplers.is_null() {
                    let local_samplers = self
                        .wrapper
                        .unwrap_array(binding.p_immutable_samplers, binding.descriptor_count);
                    binding.p_immutable_samplers = local_samplers.as_ptr();
                    samplers.push(local_samplers);
                }
            }
            local.p_bindings = local_ptr(&bindings, local.p_bindings);
            self.table
                .create_descriptor_set_layout(self.device(), &local, p_allocator, p_set_layout)
        })
    }

    /// # Safety
    /// Pointers must follow `vkDestroyDescriptorSetLayout` validity rules.
    pub unsafe fn destroy_descriptor_set_layout(
        &self,
        descriptor_set_layout: vk::DescriptorSetLayout,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.destroy_object(
            Command::DestroyDescriptorSetLayout,
            descriptor_set_layout,
            |real| unsafe {
                self.table
                    .destroy_descriptor_set_layout(self.device(), real, p_allocator)
            },
        );
    }

    /// # Safety
    /// Pointers must follow `vkCreateDescriptorPool` validity rules.
    pub unsafe fn create_descriptor_pool(
        &self,
        p_create_info: *const vk::DescriptorPoolCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_descriptor_pool: *mut vk::DescriptorPool,
    ) -> vk::Result {
        self.create_object(Command::CreateDescriptorPool, p_descriptor_pool, || unsafe {
            self.table.create_descriptor_pool(
                self.device(),
                p_create_info,
                p_allocator,
                p_descriptor_pool,
            )
        })
    }

    /// Sets allocated from the pool die with it: their surrogates are erased
    /// before the pool itself is popped.
    ///
    /// # Safety
    /// Pointers must follow `vkDestroyDescriptorPool` validity rules.
    pub unsafe fn destroy_descriptor_pool(
        &self,
        descriptor_pool: vk::DescriptorPool,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        let chain = self.chain();
        chain.intercept_void(Command::DestroyDescriptorPool, || {
            let sets = self
                .state
                .write()
                .pool_descriptor_sets
                .remove(&descriptor_pool)
                .unwrap_or_default();
            for set in sets {
                self.wrapper.erase(set);
                chain.object_destroyed(set);
            }
            let real = self.wrapper.pop(descriptor_pool);
            unsafe {
                self.table
                    .destroy_descriptor_pool(self.device(), real, p_allocator)
            };
            chain.object_destroyed(descriptor_pool);
        });
    }

    /// # Safety
    /// Pointers must follow `vkResetDescriptorPool` validity rules.
    pub unsafe fn reset_descriptor_pool(
        &self,
        descriptor_pool: vk::DescriptorPool,
        flags: vk::DescriptorPoolResetFlags,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::ResetDescriptorPool, || {
            let result = unsafe {
                self.table.reset_descriptor_pool(
                    self.device(),
                    self.wrapper.unwrap(descriptor_pool),
                    flags,
                )
            };
            if result == vk::Result::SUCCESS {
                let sets = self
                    .state
                    .write()
                    .pool_descriptor_sets
                    .get_mut(&descriptor_pool)
                    .map(std::mem::take)
                    .unwrap_or_default();
                for set in sets {
                    self.wrapper.erase(set);
                    chain.object_destroyed(set);
                }
            }
            result
        })
    }

    /// # Safety
    /// Pointers must follow `vkAllocateDescriptorSets` validity rules.
    pub unsafe fn allocate_descriptor_sets(
        &self,
        p_allocate_info: *const vk::DescriptorSetAllocateInfo<'_>,
        p_descriptor_sets: *mut vk::DescriptorSet,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::AllocateDescriptorSets, || unsafe {
            if !self.wrap_handles() {
                return self.table.allocate_descriptor_sets(
                    self.device(),
                    p_allocate_info,
                    p_descriptor_sets,
                );
            }
            let info = &*p_allocate_info;
            let mut local = *info;
            local.descriptor_pool = self.wrapper.unwrap(info.descriptor_pool);
            let layouts = self
                .wrapper
                .unwrap_array(info.p_set_layouts, info.descriptor_set_count);
            local.p_set_layouts = local_ptr(&layouts, info.p_set_layouts);

            let result =
                self.table
                    .allocate_descriptor_sets(self.device(), &local, p_descriptor_sets);
            if result == vk::Result::SUCCESS {
                let mut created = Vec::with_capacity(info.descriptor_set_count as usize);
                for index in 0..info.descriptor_set_count as usize {
                    let slot = p_descriptor_sets.add(index);
                    *slot = self.wrapper.wrap_new(*slot);
                    created.push(*slot);
                }
                self.state
                    .write()
                    .pool_descriptor_sets
                    .entry(info.descriptor_pool)
                    .or_default()
                    .extend(created.iter().copied());
                for set in created {
                    chain.object_created(set);
                }
            }
            result
        })
    }

    /// # Safety
    /// Pointers must follow `vkFreeDescriptorSets` validity rules.
    pub unsafe fn free_descriptor_sets(
        &self,
        descriptor_pool: vk::DescriptorPool,
        descriptor_set_count: u32,
        p_descriptor_sets: *const vk::DescriptorSet,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::FreeDescriptorSets, || unsafe {
            if !self.wrap_handles() {
                return self.table.free_descriptor_sets(
                    self.device(),
                    descriptor_pool,
                    descriptor_set_count,
                    p_descriptor_sets,
                );
            }
            let sets = read_array(p_descriptor_sets, descriptor_set_count);
            let local: Vec<_> = sets.iter().map(|&set| self.wrapper.unwrap(set)).collect();
            let result = self.table.free_descriptor_sets(
                self.device(),
                self.wrapper.unwrap(descriptor_pool),
                descriptor_set_count,
                local_ptr(&local, p_descriptor_sets),
            );
            if result == vk::Result::SUCCESS {
                if let Some(pool_sets) = self
                    .state
                    .write()
                    .pool_descriptor_sets
                    .get_mut(&descriptor_pool)
                {
                    for set in &sets {
                        pool_sets.remove(set);
                    }
                }
                for set in sets {
                    self.wrapper.erase(set);
                    chain.object_destroyed(set);
                }
            }
            result
        })
    }

    /// # Safety
    /// Pointers must follow `vkUpdateDescriptorSets` validity rules.
    pub unsafe fn update_descriptor_sets(
        &self,
        descriptor_write_count: u32,
        p_descriptor_writes: *const vk::WriteDescriptorSet<'_>,
        descriptor_copy_count: u32,
        p_descriptor_copies: *const vk::CopyDescriptorSet<'_>,
    ) {
        self.chain()
            .intercept_void(Command::UpdateDescriptorSets, || unsafe {
                if !self.wrap_handles() {
                    return self.table.update_descriptor_sets(
                        self.device(),
                        descriptor_write_count,
                        p_descriptor_writes,
                        descriptor_copy_count,
                        p_descriptor_copies,
                    );
                }
                let mut writes = read_array(p_descriptor_writes, descriptor_write_count);
                let mut storage = WriteStorage::default();
                for write in &mut writes {
                    storage.unwrap_write(self, write);
                }
                let mut copies = read_array(p_descriptor_copies, descriptor_copy_count);
                for copy in &mut copies {
                    copy.src_set = self.wrapper.unwrap(copy.src_set);
                    copy.dst_set = self.wrapper.unwrap(copy.dst_set);
                }
                self.table.update_descriptor_sets(
                    self.device(),
                    descriptor_write_count,
                    local_ptr(&writes, p_descriptor_writes),
                    descriptor_copy_count,
                    local_ptr(&copies, p_descriptor_copies),
                );
            });
    }
}

impl DeviceDispatchObject {
    /// Descriptor buffer reads name their sampler and image view directly.
    /// Address and acceleration structure payloads are device addresses and
    /// go down unchanged.
    ///
    /// # Safety
    /// Pointers must follow `vkGetDescriptorEXT` validity rules.
    pub unsafe fn get_descriptor_ext(
        &self,
        p_descriptor_info: *const vk::DescriptorGetInfoEXT<'_>,
        data_size: usize,
        p_descriptor: *mut c_void,
    ) {
        self.chain().intercept_void(Command::GetDescriptorEXT, || unsafe {
            if !self.wrap_handles() {
                return self.table.get_descriptor_ext(
                    self.device(),
                    p_descriptor_info,
                    data_size,
                    p_descriptor,
                );
            }
            let mut local = *p_descriptor_info;
            local.p_next = ptr::null();
            let sampler;
            let image_info;
            match local.ty {
                vk::DescriptorType::SAMPLER => {
                    if let Some(app_sampler) = local.data.p_sampler.as_ref() {
                        sampler = self.wrapper.unwrap(*app_sampler);
                        local.data.p_sampler = &sampler;
                    }
                }
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER
                | vk::DescriptorType::SAMPLED_IMAGE
                | vk::DescriptorType::STORAGE_IMAGE
                | vk::DescriptorType::INPUT_ATTACHMENT => {
                    // The four image members share one pointer.
                    if let Some(app_info) = local.data.p_combined_image_sampler.as_ref() {
                        image_info = vk::DescriptorImageInfo {
                            sampler: self.wrapper.unwrap(app_info.sampler),
                            image_view: self.wrapper.unwrap(app_info.image_view),
                            image_layout: app_info.image_layout,
                        };
                        local.data.p_combined_image_sampler = &image_info;
                    }
                }
                _ => {}
            }
            self.table
                .get_descriptor_ext(self.device(), &local, data_size, p_descriptor);
        });
    }
}

/// Arrays backing the local copies of descriptor writes.
#[derive(Default)]
struct WriteStorage {
    images: Vec<Vec<vk::DescriptorImageInfo>>,
    buffers: Vec<Vec<vk::DescriptorBufferInfo>>,
    texel_views: Vec<Vec<vk::BufferView>>,
    chains: Vec<LocalChain>,
}

impl WriteStorage {
    /// Point `write` at unwrapped copies of its payload. Only the array its
    /// descriptor type selects is read; the others may be garbage.
    unsafe fn unwrap_write(
        &mut self,
        dispatch: &DeviceDispatchObject,
        write: &mut vk::WriteDescriptorSet<'_>,
    ) {
        let wrapper = &dispatch.wrapper;
        write.dst_set = wrapper.unwrap(write.dst_set);
        let chain = unsafe { LocalChain::copy(wrapper, write.p_next) };
        write.p_next = chain.head();
        self.chains.push(chain);

        match SlotKind::of(write.descriptor_type, write.descriptor_count) {
            Ok(SlotKind::Image) => {
                let mut images = unsafe { read_array(write.p_image_info, write.descriptor_count) };
                for image in &mut images {
                    image.sampler = wrapper.unwrap(image.sampler);
                    image.image_view = wrapper.unwrap(image.image_view);
                }
                write.p_image_info = local_ptr(&images, write.p_image_info);
                self.images.push(images);
            }
            Ok(SlotKind::Buffer) => {
                let mut buffers =
                    unsafe { read_array(write.p_buffer_info, write.descriptor_count) };
                for buffer in &mut buffers {
                    buffer.buffer = wrapper.unwrap(buffer.buffer);
                }
                write.p_buffer_info = local_ptr(&buffers, write.p_buffer_info);
                self.buffers.push(buffers);
            }
            Ok(SlotKind::TexelBufferView) => {
                let views = unsafe {
                    wrapper.unwrap_array(write.p_texel_buffer_view, write.descriptor_count)
                };
                write.p_texel_buffer_view = local_ptr(&views, write.p_texel_buffer_view);
                self.texel_views.push(views);
            }
            // Payload travels in the pNext chain copied above.
            _ => {}
        }
    }
}
