//! Fake next layer shared by the dispatch tests.
//!
//! Mints its own "real" handles, records the handles it is handed, and
//! plays the driver side of swapchain images, deferred operations and
//! output chains.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use parking_lot::Mutex;
use rvl_core::LayerSettings;
use rvl_layer::{
    DeviceDispatchObject, DeviceTable, InstanceDispatchObject, InstanceTable, ValidationObject,
};

pub const FAKE_INSTANCE: u64 = 0xA000;
pub const FAKE_PHYSICAL_DEVICE: u64 = 0xB000;
pub const FAKE_DEVICE: u64 = 0xC000;

/// Pipeline outputs of a deferred ray tracing creation, written at join.
struct DeferredPipelines {
    output: usize,
    count: u32,
}

pub struct FakeDriver {
    next_handle: AtomicU64,
    received: Mutex<Vec<(&'static str, u64)>>,
    pub swapchain_image_count: AtomicU32,
    swapchain_images: Mutex<HashMap<u64, Vec<u64>>>,
    pub defer_ray_tracing: AtomicBool,
    deferred_pipelines: Mutex<HashMap<u64, DeferredPipelines>>,
    pub joins: AtomicU32,
    /// Whether each graphics pipeline arrived with color blend and
    /// depth/stencil state
    pub graphics_states: Mutex<Vec<(bool, bool)>>,
    /// Bytes of the last template blob, `template_blob_len` long
    pub template_blob_len: AtomicUsize,
    pub template_blobs: Mutex<Vec<Vec<u8>>>,
    /// sTypes and addresses of the chain each creation call received
    pub chains: Mutex<Vec<Vec<(vk::StructureType, usize)>>>,
    pub instance_references: Mutex<Vec<u64>>,
    pub displays: Vec<u64>,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_handle: AtomicU64::new(0x10_0000),
            received: Mutex::new(Vec::new()),
            swapchain_image_count: AtomicU32::new(3),
            swapchain_images: Mutex::new(HashMap::new()),
            defer_ray_tracing: AtomicBool::new(false),
            deferred_pipelines: Mutex::new(HashMap::new()),
            joins: AtomicU32::new(0),
            graphics_states: Mutex::new(Vec::new()),
            template_blob_len: AtomicUsize::new(0),
            template_blobs: Mutex::new(Vec::new()),
            chains: Mutex::new(Vec::new()),
            instance_references: Mutex::new(Vec::new()),
            displays: vec![0xD15_0001, 0xD15_0002],
        })
    }

    pub fn mint(&self) -> u64 {
        self.next_handle.fetch_add(0x10, Ordering::Relaxed)
    }

    fn record(&self, entry_point: &'static str, raw: u64) {
        self.received.lock().push((entry_point, raw));
    }

    /// Raw handles `entry_point` was called with, in call order.
    pub fn received(&self, entry_point: &str) -> Vec<u64> {
        self.received
            .lock()
            .iter()
            .filter(|(name, _)| *name == entry_point)
            .map(|&(_, raw)| raw)
            .collect()
    }

    /// Whether `raw` was ever handed out by this driver.
    pub fn is_real(&self, raw: u64) -> bool {
        raw >= 0x10_0000 && raw < self.next_handle.load(Ordering::Relaxed)
    }

    unsafe fn record_chain(&self, mut node: *const c_void) {
        let mut blocks = Vec::new();
        while !node.is_null() {
            let header = unsafe { &*(node as *const vk::BaseInStructure<'_>) };
            blocks.push((header.s_type, node as usize));
            node = header.p_next.cast();
        }
        self.chains.lock().push(blocks);
    }

    unsafe fn create<H: Handle>(&self, p_handle: *mut H) -> vk::Result {
        unsafe { *p_handle = H::from_raw(self.mint()) };
        vk::Result::SUCCESS
    }
}

pub struct FakeTable(pub Arc<FakeDriver>);

impl InstanceTable for FakeTable {
    unsafe fn destroy_instance(
        &self,
        instance: vk::Instance,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.0.record("vkDestroyInstance", instance.as_raw());
    }

    unsafe fn get_physical_device_properties(
        &self,
        _physical_device: vk::PhysicalDevice,
        p_properties: *mut vk::PhysicalDeviceProperties,
    ) {
        unsafe { (*p_properties).api_version = vk::make_api_version(0, 1, 3, 250) };
    }

    unsafe fn destroy_surface_khr(
        &self,
        _instance: vk::Instance,
        surface: vk::SurfaceKHR,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.0.record("vkDestroySurfaceKHR", surface.as_raw());
    }

    unsafe fn get_physical_device_display_properties_khr(
        &self,
        _physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayPropertiesKHR<'_>,
    ) -> vk::Result {
        unsafe {
            if p_properties.is_null() {
                *p_property_count = self.0.displays.len() as u32;
                return vk::Result::SUCCESS;
            }
            let count = (*p_property_count as usize).min(self.0.displays.len());
            for (index, &display) in self.0.displays.iter().take(count).enumerate() {
                (*p_properties.add(index)).display = vk::DisplayKHR::from_raw(display);
            }
            *p_property_count = count as u32;
            if count < self.0.displays.len() {
                vk::Result::INCOMPLETE
            } else {
                vk::Result::SUCCESS
            }
        }
    }

    unsafe fn get_display_plane_supported_displays_khr(
        &self,
        _physical_device: vk::PhysicalDevice,
        _plane_index: u32,
        p_display_count: *mut u32,
        p_displays: *mut vk::DisplayKHR,
    ) -> vk::Result {
        unsafe {
            *p_display_count = self.0.displays.len() as u32;
            if !p_displays.is_null() {
                for (index, &display) in self.0.displays.iter().enumerate() {
                    *p_displays.add(index) = vk::DisplayKHR::from_raw(display);
                }
            }
        }
        vk::Result::SUCCESS
    }

    unsafe fn get_display_mode_properties_khr(
        &self,
        _physical_device: vk::PhysicalDevice,
        display: vk::DisplayKHR,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayModePropertiesKHR,
    ) -> vk::Result {
        self.0.record("vkGetDisplayModePropertiesKHR", display.as_raw());
        unsafe {
            *p_property_count = 1;
            if !p_properties.is_null() {
                (*p_properties).display_mode = vk::DisplayModeKHR::from_raw(self.0.mint());
            }
        }
        vk::Result::SUCCESS
    }

    unsafe fn get_physical_device_display_properties2_khr(
        &self,
        _physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayProperties2KHR<'_>,
    ) -> vk::Result {
        unsafe {
            *p_property_count = self.0.displays.len() as u32;
            if !p_properties.is_null() {
                for (index, &display) in self.0.displays.iter().enumerate() {
                    (*p_properties.add(index)).display_properties.display =
                        vk::DisplayKHR::from_raw(display);
                }
            }
        }
        vk::Result::SUCCESS
    }

    /// Plane 0 shows the first display; plane 1 is idle.
    unsafe fn get_physical_device_display_plane_properties2_khr(
        &self,
        _physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayPlaneProperties2KHR<'_>,
    ) -> vk::Result {
        unsafe {
            *p_property_count = 2;
            if !p_properties.is_null() {
                (*p_properties).display_plane_properties.current_display =
                    vk::DisplayKHR::from_raw(self.0.displays[0]);
                (*p_properties.add(1)).display_plane_properties.current_display =
                    vk::DisplayKHR::null();
            }
        }
        vk::Result::SUCCESS
    }

    unsafe fn get_display_mode_properties2_khr(
        &self,
        _physical_device: vk::PhysicalDevice,
        display: vk::DisplayKHR,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayModeProperties2KHR<'_>,
    ) -> vk::Result {
        self.0.record("vkGetDisplayModeProperties2KHR", display.as_raw());
        unsafe {
            *p_property_count = 1;
            if !p_properties.is_null() {
                (*p_properties).display_mode_properties.display_mode =
                    vk::DisplayModeKHR::from_raw(self.0.mint());
            }
        }
        vk::Result::SUCCESS
    }

    /// One tool of its own; the EXT alias is left unresolved.
    unsafe fn get_physical_device_tool_properties(
        &self,
        _physical_device: vk::PhysicalDevice,
        p_tool_count: *mut u32,
        p_tool_properties: *mut vk::PhysicalDeviceToolProperties<'_>,
    ) -> vk::Result {
        unsafe {
            if p_tool_properties.is_null() {
                *p_tool_count = 1;
                return vk::Result::SUCCESS;
            }
            if *p_tool_count == 0 {
                return vk::Result::INCOMPLETE;
            }
            let tool = &mut *p_tool_properties;
            tool.purposes = vk::ToolPurposeFlags::PROFILING;
            *p_tool_count = 1;
        }
        vk::Result::SUCCESS
    }
}

impl DeviceTable for FakeTable {
    unsafe fn create_buffer(
        &self,
        _device: vk::Device,
        _p_create_info: *const vk::BufferCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_buffer: *mut vk::Buffer,
    ) -> vk::Result {
        unsafe { self.0.create(p_buffer) }
    }

    unsafe fn destroy_buffer(
        &self,
        _device: vk::Device,
        buffer: vk::Buffer,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.0.record("vkDestroyBuffer", buffer.as_raw());
    }

    unsafe fn create_buffer_view(
        &self,
        _device: vk::Device,
        p_create_info: *const vk::BufferViewCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_view: *mut vk::BufferView,
    ) -> vk::Result {
        unsafe {
            self.0
                .record("vkCreateBufferView", (*p_create_info).buffer.as_raw());
            self.0.create(p_view)
        }
    }

    /// Records the swapchain a swapchain-backed image names.
    unsafe fn create_image(
        &self,
        _device: vk::Device,
        p_create_info: *const vk::ImageCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_image: *mut vk::Image,
    ) -> vk::Result {
        unsafe {
            let mut node = (*p_create_info).p_next as *const vk::BaseInStructure<'_>;
            while !node.is_null() {
                if (*node).s_type == vk::StructureType::IMAGE_SWAPCHAIN_CREATE_INFO_KHR {
                    let info = &*(node as *const vk::ImageSwapchainCreateInfoKHR<'_>);
                    self.0.record("vkCreateImage.swapchain", info.swapchain.as_raw());
                }
                node = (*node).p_next;
            }
            self.0.record_chain((*p_create_info).p_next);
            self.0.create(p_image)
        }
    }

    /// Records the image of a dedicated allocation.
    unsafe fn allocate_memory(
        &self,
        _device: vk::Device,
        p_allocate_info: *const vk::MemoryAllocateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_memory: *mut vk::DeviceMemory,
    ) -> vk::Result {
        unsafe {
            let mut node = (*p_allocate_info).p_next as *const vk::BaseInStructure<'_>;
            while !node.is_null() {
                if (*node).s_type == vk::StructureType::MEMORY_DEDICATED_ALLOCATE_INFO {
                    let info = &*(node as *const vk::MemoryDedicatedAllocateInfo<'_>);
                    self.0.record("vkAllocateMemory.image", info.image.as_raw());
                }
                node = (*node).p_next;
            }
            self.0.record_chain((*p_allocate_info).p_next);
            self.0.create(p_memory)
        }
    }

    unsafe fn create_image_view(
        &self,
        _device: vk::Device,
        p_create_info: *const vk::ImageViewCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_view: *mut vk::ImageView,
    ) -> vk::Result {
        unsafe {
            self.0
                .record("vkCreateImageView", (*p_create_info).image.as_raw());
            self.0.create(p_view)
        }
    }

    unsafe fn create_sampler(
        &self,
        _device: vk::Device,
        p_create_info: *const vk::SamplerCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_sampler: *mut vk::Sampler,
    ) -> vk::Result {
        unsafe {
            let mut node = (*p_create_info).p_next as *const vk::BaseInStructure<'_>;
            while !node.is_null() {
                if (*node).s_type == vk::StructureType::SAMPLER_YCBCR_CONVERSION_INFO {
                    let info = &*(node as *const vk::SamplerYcbcrConversionInfo<'_>);
                    self.0.record("vkCreateSampler", info.conversion.as_raw());
                }
                node = (*node).p_next;
            }
            self.0.record_chain((*p_create_info).p_next);
            self.0.create(p_sampler)
        }
    }

    unsafe fn create_fence(
        &self,
        _device: vk::Device,
        _p_create_info: *const vk::FenceCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_fence: *mut vk::Fence,
    ) -> vk::Result {
        unsafe { self.0.create(p_fence) }
    }

    unsafe fn destroy_fence(
        &self,
        _device: vk::Device,
        fence: vk::Fence,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.0.record("vkDestroyFence", fence.as_raw());
    }

    unsafe fn create_descriptor_set_layout(
        &self,
        _device: vk::Device,
        p_create_info: *const vk::DescriptorSetLayoutCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_set_layout: *mut vk::DescriptorSetLayout,
    ) -> vk::Result {
        unsafe {
            let info = &*p_create_info;
            let bindings: &[vk::DescriptorSetLayoutBinding<'_>] = if info.p_bindings.is_null() {
                &[]
            } else {
                std::slice::from_raw_parts(info.p_bindings, info.binding_count as usize)
            };
            for binding in bindings {
                if !binding.p_immutable_samplers.is_null() {
                    let samplers = std::slice::from_raw_parts(
                        binding.p_immutable_samplers,
                        binding.descriptor_count as usize,
                    );
                    for sampler in samplers {
                        self.0.record("vkCreateDescriptorSetLayout", sampler.as_raw());
                    }
                }
            }
            self.0.create(p_set_layout)
        }
    }

    unsafe fn create_descriptor_pool(
        &self,
        _device: vk::Device,
        _p_create_info: *const vk::DescriptorPoolCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_descriptor_pool: *mut vk::DescriptorPool,
    ) -> vk::Result {
        unsafe { self.0.create(p_descriptor_pool) }
    }

    unsafe fn destroy_descriptor_pool(
        &self,
        _device: vk::Device,
        descriptor_pool: vk::DescriptorPool,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.0.record("vkDestroyDescriptorPool", descriptor_pool.as_raw());
    }

    unsafe fn reset_descriptor_pool(
        &self,
        _device: vk::Device,
        descriptor_pool: vk::DescriptorPool,
        _flags: vk::DescriptorPoolResetFlags,
    ) -> vk::Result {
        self.0.record("vkResetDescriptorPool", descriptor_pool.as_raw());
        vk::Result::SUCCESS
    }

    unsafe fn allocate_descriptor_sets(
        &self,
        _device: vk::Device,
        p_allocate_info: *const vk::DescriptorSetAllocateInfo<'_>,
        p_descriptor_sets: *mut vk::DescriptorSet,
    ) -> vk::Result {
        unsafe {
            let info = &*p_allocate_info;
            self.0
                .record("vkAllocateDescriptorSets", info.descriptor_pool.as_raw());
            for index in 0..info.descriptor_set_count as usize {
                let layout = *info.p_set_layouts.add(index);
                self.0.record("vkAllocateDescriptorSets.layout", layout.as_raw());
                *p_descriptor_sets.add(index) = vk::DescriptorSet::from_raw(self.0.mint());
            }
        }
        vk::Result::SUCCESS
    }

    unsafe fn free_descriptor_sets(
        &self,
        _device: vk::Device,
        _descriptor_pool: vk::DescriptorPool,
        descriptor_set_count: u32,
        p_descriptor_sets: *const vk::DescriptorSet,
    ) -> vk::Result {
        for index in 0..descriptor_set_count as usize {
            let set = unsafe { *p_descriptor_sets.add(index) };
            self.0.record("vkFreeDescriptorSets", set.as_raw());
        }
        vk::Result::SUCCESS
    }

    unsafe fn update_descriptor_sets(
        &self,
        _device: vk::Device,
        descriptor_write_count: u32,
        p_descriptor_writes: *const vk::WriteDescriptorSet<'_>,
        descriptor_copy_count: u32,
        p_descriptor_copies: *const vk::CopyDescriptorSet<'_>,
    ) {
        unsafe {
            for index in 0..descriptor_write_count as usize {
                let write = &*p_descriptor_writes.add(index);
                self.0.record("vkUpdateDescriptorSets.dst", write.dst_set.as_raw());
                if !write.p_buffer_info.is_null() {
                    for element in 0..write.descriptor_count as usize {
                        let info = &*write.p_buffer_info.add(element);
                        self.0.record("vkUpdateDescriptorSets.buffer", info.buffer.as_raw());
                    }
                }
                if !write.p_image_info.is_null() {
                    for element in 0..write.descriptor_count as usize {
                        let info = &*write.p_image_info.add(element);
                        self.0
                            .record("vkUpdateDescriptorSets.view", info.image_view.as_raw());
                    }
                }
            }
            for index in 0..descriptor_copy_count as usize {
                let copy = &*p_descriptor_copies.add(index);
                self.0.record("vkUpdateDescriptorSets.src", copy.src_set.as_raw());
                self.0.record("vkUpdateDescriptorSets.dst", copy.dst_set.as_raw());
            }
        }
    }

    unsafe fn create_descriptor_update_template(
        &self,
        _device: vk::Device,
        p_create_info: *const vk::DescriptorUpdateTemplateCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_descriptor_update_template: *mut vk::DescriptorUpdateTemplate,
    ) -> vk::Result {
        unsafe {
            self.0.record(
                "vkCreateDescriptorUpdateTemplate",
                (*p_create_info).descriptor_set_layout.as_raw(),
            );
            self.0.create(p_descriptor_update_template)
        }
    }

    unsafe fn update_descriptor_set_with_template(
        &self,
        _device: vk::Device,
        descriptor_set: vk::DescriptorSet,
        descriptor_update_template: vk::DescriptorUpdateTemplate,
        p_data: *const c_void,
    ) {
        self.0
            .record("vkUpdateDescriptorSetWithTemplate", descriptor_set.as_raw());
        self.0.record(
            "vkUpdateDescriptorSetWithTemplate.template",
            descriptor_update_template.as_raw(),
        );
        let len = self.0.template_blob_len.load(Ordering::Relaxed);
        let blob = unsafe { std::slice::from_raw_parts(p_data.cast::<u8>(), len) }.to_vec();
        self.0.template_blobs.lock().push(blob);
    }

    unsafe fn cmd_push_descriptor_set_with_template2_khr(
        &self,
        _command_buffer: vk::CommandBuffer,
        p_push_descriptor_set_with_template_info: *const vk::PushDescriptorSetWithTemplateInfoKHR<'_>,
    ) {
        unsafe {
            let info = &*p_push_descriptor_set_with_template_info;
            self.0.record(
                "vkCmdPushDescriptorSetWithTemplate2KHR.template",
                info.descriptor_update_template.as_raw(),
            );
            self.0
                .record("vkCmdPushDescriptorSetWithTemplate2KHR.layout", info.layout.as_raw());
            let mut node = info.p_next as *const vk::BaseInStructure<'_>;
            while !node.is_null() {
                if (*node).s_type == vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO {
                    let layout_info = &*(node as *const vk::PipelineLayoutCreateInfo<'_>);
                    for index in 0..layout_info.set_layout_count as usize {
                        self.0.record(
                            "vkCmdPushDescriptorSetWithTemplate2KHR.set_layout",
                            (*layout_info.p_set_layouts.add(index)).as_raw(),
                        );
                    }
                }
                node = (*node).p_next;
            }
            let len = self.0.template_blob_len.load(Ordering::Relaxed);
            let blob = std::slice::from_raw_parts(info.p_data.cast::<u8>(), len).to_vec();
            self.0.template_blobs.lock().push(blob);
        }
    }

    unsafe fn get_descriptor_ext(
        &self,
        _device: vk::Device,
        p_descriptor_info: *const vk::DescriptorGetInfoEXT<'_>,
        _data_size: usize,
        _p_descriptor: *mut c_void,
    ) {
        unsafe {
            let info = &*p_descriptor_info;
            match info.ty {
                vk::DescriptorType::SAMPLER => {
                    self.0
                        .record("vkGetDescriptorEXT.sampler", (*info.data.p_sampler).as_raw());
                }
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER => {
                    let image = &*info.data.p_combined_image_sampler;
                    self.0.record("vkGetDescriptorEXT.sampler", image.sampler.as_raw());
                    self.0
                        .record("vkGetDescriptorEXT.view", image.image_view.as_raw());
                }
                vk::DescriptorType::STORAGE_IMAGE => {
                    let image = &*info.data.p_storage_image;
                    self.0
                        .record("vkGetDescriptorEXT.view", image.image_view.as_raw());
                }
                _ => {}
            }
        }
    }

    unsafe fn create_render_pass(
        &self,
        _device: vk::Device,
        _p_create_info: *const vk::RenderPassCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_render_pass: *mut vk::RenderPass,
    ) -> vk::Result {
        unsafe { self.0.create(p_render_pass) }
    }

    unsafe fn create_render_pass2(
        &self,
        _device: vk::Device,
        _p_create_info: *const vk::RenderPassCreateInfo2<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_render_pass: *mut vk::RenderPass,
    ) -> vk::Result {
        unsafe { self.0.create(p_render_pass) }
    }

    unsafe fn cmd_begin_render_pass(
        &self,
        _command_buffer: vk::CommandBuffer,
        p_render_pass_begin: *const vk::RenderPassBeginInfo<'_>,
        _contents: vk::SubpassContents,
    ) {
        unsafe {
            let begin = &*p_render_pass_begin;
            self.0
                .record("vkCmdBeginRenderPass", begin.render_pass.as_raw());
            self.0
                .record("vkCmdBeginRenderPass", begin.framebuffer.as_raw());
        }
    }

    unsafe fn create_pipeline_layout(
        &self,
        _device: vk::Device,
        _p_create_info: *const vk::PipelineLayoutCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipeline_layout: *mut vk::PipelineLayout,
    ) -> vk::Result {
        unsafe { self.0.create(p_pipeline_layout) }
    }

    unsafe fn create_graphics_pipelines(
        &self,
        _device: vk::Device,
        _pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::GraphicsPipelineCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result {
        unsafe {
            for index in 0..create_info_count as usize {
                let info = &*p_create_infos.add(index);
                self.0
                    .record("vkCreateGraphicsPipelines", info.render_pass.as_raw());
                self.0.graphics_states.lock().push((
                    !info.p_color_blend_state.is_null(),
                    !info.p_depth_stencil_state.is_null(),
                ));
                // Fill any creation feedback request.
                let mut node = info.p_next as *const vk::BaseInStructure<'_>;
                while !node.is_null() {
                    if (*node).s_type == vk::StructureType::PIPELINE_CREATION_FEEDBACK_CREATE_INFO {
                        let feedback = &*(node as *const vk::PipelineCreationFeedbackCreateInfo<'_>);
                        if !feedback.p_pipeline_creation_feedback.is_null() {
                            *feedback.p_pipeline_creation_feedback = vk::PipelineCreationFeedback {
                                flags: vk::PipelineCreationFeedbackFlags::VALID,
                                duration: 1234,
                            };
                        }
                    }
                    node = (*node).p_next;
                }
                self.0.record_chain(info.p_next);
                *p_pipelines.add(index) = vk::Pipeline::from_raw(self.0.mint());
            }
        }
        vk::Result::SUCCESS
    }

    unsafe fn create_ray_tracing_pipelines_khr(
        &self,
        _device: vk::Device,
        deferred_operation: vk::DeferredOperationKHR,
        _pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::RayTracingPipelineCreateInfoKHR<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result {
        unsafe {
            for index in 0..create_info_count as usize {
                let info = &*p_create_infos.add(index);
                self.0
                    .record("vkCreateRayTracingPipelinesKHR", info.layout.as_raw());
            }
        }
        if self.0.defer_ray_tracing.load(Ordering::Relaxed)
            && deferred_operation != vk::DeferredOperationKHR::null()
        {
            self.0.deferred_pipelines.lock().insert(
                deferred_operation.as_raw(),
                DeferredPipelines {
                    output: p_pipelines as usize,
                    count: create_info_count,
                },
            );
            return vk::Result::OPERATION_DEFERRED_KHR;
        }
        for index in 0..create_info_count as usize {
            unsafe { *p_pipelines.add(index) = vk::Pipeline::from_raw(self.0.mint()) };
        }
        vk::Result::SUCCESS
    }

    unsafe fn destroy_pipeline(
        &self,
        _device: vk::Device,
        pipeline: vk::Pipeline,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.0.record("vkDestroyPipeline", pipeline.as_raw());
    }

    unsafe fn create_command_pool(
        &self,
        _device: vk::Device,
        _p_create_info: *const vk::CommandPoolCreateInfo<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_command_pool: *mut vk::CommandPool,
    ) -> vk::Result {
        unsafe { self.0.create(p_command_pool) }
    }

    unsafe fn allocate_command_buffers(
        &self,
        _device: vk::Device,
        p_allocate_info: *const vk::CommandBufferAllocateInfo<'_>,
        p_command_buffers: *mut vk::CommandBuffer,
    ) -> vk::Result {
        unsafe {
            let info = &*p_allocate_info;
            self.0
                .record("vkAllocateCommandBuffers", info.command_pool.as_raw());
            for index in 0..info.command_buffer_count as usize {
                *p_command_buffers.add(index) = vk::CommandBuffer::from_raw(self.0.mint());
            }
        }
        vk::Result::SUCCESS
    }

    unsafe fn begin_command_buffer(
        &self,
        _command_buffer: vk::CommandBuffer,
        p_begin_info: *const vk::CommandBufferBeginInfo<'_>,
    ) -> vk::Result {
        unsafe {
            if let Some(inheritance) = (*p_begin_info).p_inheritance_info.as_ref() {
                self.0
                    .record("vkBeginCommandBuffer", inheritance.render_pass.as_raw());
            }
        }
        vk::Result::SUCCESS
    }

    unsafe fn create_swapchain_khr(
        &self,
        _device: vk::Device,
        p_create_info: *const vk::SwapchainCreateInfoKHR<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_swapchain: *mut vk::SwapchainKHR,
    ) -> vk::Result {
        unsafe {
            self.0
                .record("vkCreateSwapchainKHR", (*p_create_info).surface.as_raw());
            self.0.create(p_swapchain)
        }
    }

    unsafe fn destroy_swapchain_khr(
        &self,
        _device: vk::Device,
        swapchain: vk::SwapchainKHR,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.0.record("vkDestroySwapchainKHR", swapchain.as_raw());
    }

    unsafe fn get_swapchain_images_khr(
        &self,
        _device: vk::Device,
        swapchain: vk::SwapchainKHR,
        p_swapchain_image_count: *mut u32,
        p_swapchain_images: *mut vk::Image,
    ) -> vk::Result {
        let total = self.0.swapchain_image_count.load(Ordering::Relaxed) as usize;
        let mut swapchains = self.0.swapchain_images.lock();
        let images = swapchains.entry(swapchain.as_raw()).or_default();
        while images.len() < total {
            images.push(self.0.mint());
        }
        unsafe {
            if p_swapchain_images.is_null() {
                *p_swapchain_image_count = total as u32;
                return vk::Result::SUCCESS;
            }
            let count = (*p_swapchain_image_count as usize).min(total);
            for (index, &image) in images.iter().take(count).enumerate() {
                *p_swapchain_images.add(index) = vk::Image::from_raw(image);
            }
            *p_swapchain_image_count = count as u32;
            if count < total {
                vk::Result::INCOMPLETE
            } else {
                vk::Result::SUCCESS
            }
        }
    }

    unsafe fn queue_present_khr(
        &self,
        _queue: vk::Queue,
        p_present_info: *const vk::PresentInfoKHR<'_>,
    ) -> vk::Result {
        unsafe {
            let info = &*p_present_info;
            for index in 0..info.swapchain_count as usize {
                let swapchain = *info.p_swapchains.add(index);
                self.0.record("vkQueuePresentKHR", swapchain.as_raw());
                if !info.p_results.is_null() {
                    *info.p_results.add(index) = vk::Result::SUBOPTIMAL_KHR;
                }
            }
        }
        vk::Result::SUBOPTIMAL_KHR
    }

    unsafe fn create_deferred_operation_khr(
        &self,
        _device: vk::Device,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_deferred_operation: *mut vk::DeferredOperationKHR,
    ) -> vk::Result {
        unsafe { self.0.create(p_deferred_operation) }
    }

    unsafe fn destroy_deferred_operation_khr(
        &self,
        _device: vk::Device,
        operation: vk::DeferredOperationKHR,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.0
            .record("vkDestroyDeferredOperationKHR", operation.as_raw());
    }

    unsafe fn deferred_operation_join_khr(
        &self,
        _device: vk::Device,
        operation: vk::DeferredOperationKHR,
    ) -> vk::Result {
        self.0.joins.fetch_add(1, Ordering::SeqCst);
        self.complete(operation)
    }

    unsafe fn get_deferred_operation_result_khr(
        &self,
        _device: vk::Device,
        operation: vk::DeferredOperationKHR,
    ) -> vk::Result {
        self.complete(operation)
    }

    unsafe fn create_acceleration_structure_khr(
        &self,
        _device: vk::Device,
        p_create_info: *const vk::AccelerationStructureCreateInfoKHR<'_>,
        _p_allocator: *const vk::AllocationCallbacks<'_>,
        p_acceleration_structure: *mut vk::AccelerationStructureKHR,
    ) -> vk::Result {
        unsafe {
            self.0.record(
                "vkCreateAccelerationStructureKHR",
                (*p_create_info).buffer.as_raw(),
            );
            self.0.create(p_acceleration_structure)
        }
    }

    unsafe fn build_acceleration_structures_khr(
        &self,
        _device: vk::Device,
        _deferred_operation: vk::DeferredOperationKHR,
        info_count: u32,
        p_infos: *const vk::AccelerationStructureBuildGeometryInfoKHR<'_>,
        pp_build_range_infos: *const *const vk::AccelerationStructureBuildRangeInfoKHR,
    ) -> vk::Result {
        unsafe {
            for info_index in 0..info_count as usize {
                let info = &*p_infos.add(info_index);
                self.0.record(
                    "vkBuildAccelerationStructuresKHR",
                    info.dst_acceleration_structure.as_raw(),
                );
                for geometry_index in 0..info.geometry_count as usize {
                    let geometry = &*info.p_geometries.add(geometry_index);
                    if geometry.geometry_type != vk::GeometryTypeKHR::INSTANCES {
                        continue;
                    }
                    let range = &*(*pp_build_range_infos.add(info_index)).add(geometry_index);
                    let base = geometry
                        .geometry
                        .instances
                        .data
                        .host_address
                        .cast::<u8>()
                        .add(range.primitive_offset as usize)
                        .cast::<vk::AccelerationStructureInstanceKHR>();
                    for primitive in 0..range.primitive_count as usize {
                        let instance = std::ptr::read_unaligned(base.add(primitive));
                        self.0
                            .instance_references
                            .lock()
                            .push(instance.acceleration_structure_reference.host_handle.as_raw());
                    }
                }
            }
        }
        vk::Result::SUCCESS
    }

    unsafe fn acquire_performance_configuration_intel(
        &self,
        _device: vk::Device,
        _p_acquire_info: *const vk::PerformanceConfigurationAcquireInfoINTEL<'_>,
        p_configuration: *mut vk::PerformanceConfigurationINTEL,
    ) -> vk::Result {
        unsafe { self.0.create(p_configuration) }
    }

    unsafe fn release_performance_configuration_intel(
        &self,
        _device: vk::Device,
        configuration: vk::PerformanceConfigurationINTEL,
    ) -> vk::Result {
        self.0
            .record("vkReleasePerformanceConfigurationINTEL", configuration.as_raw());
        vk::Result::SUCCESS
    }

    unsafe fn set_debug_utils_object_name_ext(
        &self,
        _device: vk::Device,
        p_name_info: *const vk::DebugUtilsObjectNameInfoEXT<'_>,
    ) -> vk::Result {
        self.0.record("vkSetDebugUtilsObjectNameEXT", unsafe {
            (*p_name_info).object_handle
        });
        vk::Result::SUCCESS
    }
}

impl FakeTable {
    /// Finish a deferred ray tracing creation: the driver writes its
    /// pipelines into the array it was given at creation time.
    fn complete(&self, operation: vk::DeferredOperationKHR) -> vk::Result {
        let pending = self.0.deferred_pipelines.lock().remove(&operation.as_raw());
        if let Some(pending) = pending {
            let output = pending.output as *mut vk::Pipeline;
            for index in 0..pending.count as usize {
                unsafe { *output.add(index) = vk::Pipeline::from_raw(self.0.mint()) };
            }
        }
        vk::Result::SUCCESS
    }
}

pub fn settings_with(disables: &str, enables: &str) -> LayerSettings {
    let mut settings = LayerSettings::default();
    if let Err(e) = settings.apply_overrides(disables, enables) {
        panic!("expected valid overrides, got {:?}", e);
    }
    settings
}

pub fn make_instance(
    driver: &Arc<FakeDriver>,
    settings: LayerSettings,
    objects: Vec<Arc<dyn ValidationObject>>,
) -> InstanceDispatchObject {
    let app_info = vk::ApplicationInfo::default().api_version(vk::make_api_version(0, 1, 2, 7));
    let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);
    unsafe {
        InstanceDispatchObject::new(
            vk::Instance::from_raw(FAKE_INSTANCE),
            &create_info,
            settings,
            Box::new(FakeTable(driver.clone())),
            objects,
        )
    }
}

/// A device on a fresh instance, with handle wrapping per `settings`.
pub fn make_device(
    settings: LayerSettings,
    objects: Vec<Arc<dyn ValidationObject>>,
) -> (Arc<FakeDriver>, InstanceDispatchObject, DeviceDispatchObject) {
    let driver = FakeDriver::new();
    let instance = make_instance(&driver, settings, objects.clone());
    let device = unsafe {
        DeviceDispatchObject::new(
            &instance,
            vk::PhysicalDevice::from_raw(FAKE_PHYSICAL_DEVICE),
            vk::Device::from_raw(FAKE_DEVICE),
            Box::new(FakeTable(driver.clone())),
            objects,
        )
    };
    (driver, instance, device)
}

pub fn wrapping_device() -> (Arc<FakeDriver>, InstanceDispatchObject, DeviceDispatchObject) {
    make_device(LayerSettings::default(), Vec::new())
}
