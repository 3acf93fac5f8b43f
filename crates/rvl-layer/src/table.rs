//! Dispatch tables for the next layer in the chain.
//!
//! Every intercepted entry point forwards to the next layer (or the driver)
//! through one of these tables after the handle bookkeeping is done. The
//! traits mirror the C signatures one method per entry point, so the loaded
//! tables are thin function pointer calls, and tests can stand in a fake
//! driver by implementing only the methods they exercise. Methods a table does
//! not provide return `ERROR_EXTENSION_NOT_PRESENT` (or do nothing).

use std::ffi::{c_char, c_void};

use ash::vk;

/// Fallback result for an entry point the next layer does not expose.
pub(crate) trait Missing {
    fn missing() -> Self;
}

impl Missing for () {
    fn missing() {}
}

impl Missing for vk::Result {
    fn missing() -> Self {
        vk::Result::ERROR_EXTENSION_NOT_PRESENT
    }
}

/// Reinterpret a loader-returned void function pointer as its real signature.
///
/// # Safety
/// `F` must be the function pointer type of the entry point `pfn` was
/// resolved for.
unsafe fn cast_pfn<F: Copy>(pfn: vk::PFN_vkVoidFunction) -> Option<F> {
    pfn.map(|f| unsafe { std::mem::transmute_copy::<unsafe extern "system" fn(), F>(&f) })
}

macro_rules! dispatch_table {
    (
        $(#[$trait_meta:meta])*
        trait $trait_name:ident;
        $(#[$table_meta:meta])*
        struct $table_name:ident;
        $(
            fn $method:ident = $vk_name:literal ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)? ;
        )*
    ) => {
        $(#[$trait_meta])*
        pub trait $trait_name: Send + Sync {
            $(
                #[doc = concat!("`", $vk_name, "`")]
                #[allow(unused_variables)]
                unsafe fn $method(&self, $($arg: $ty),*) $(-> $ret)? {
                    Missing::missing()
                }
            )*
        }

        $(#[$table_meta])*
        pub struct $table_name {
            $( $method: Option<unsafe extern "system" fn($($ty),*) $(-> $ret)?>, )*
        }

        impl $table_name {
            fn resolve(mut lookup: impl FnMut(*const c_char) -> vk::PFN_vkVoidFunction) -> Self {
                Self {
                    $(
                        $method: unsafe {
                            cast_pfn(lookup(concat!($vk_name, "\0").as_ptr() as *const c_char))
                        },
                    )*
                }
            }

            /// Names of the entry points the next layer did not resolve.
            pub fn unresolved(&self) -> Vec<&'static str> {
                let mut names = Vec::new();
                $(
                    if self.$method.is_none() {
                        names.push($vk_name);
                    }
                )*
                names
            }
        }

        impl $trait_name for $table_name {
            $(
                unsafe fn $method(&self, $($arg: $ty),*) $(-> $ret)? {
                    match self.$method {
                        Some(pfn) => unsafe { pfn($($arg),*) },
                        None => Missing::missing(),
                    }
                }
            )*
        }
    };
}

dispatch_table! {
    /// Instance-level entry points of the next layer.
    trait InstanceTable;
    /// Instance table resolved through the next layer's `vkGetInstanceProcAddr`.
    struct LoadedInstanceTable;

    fn destroy_instance = "vkDestroyInstance"(
        instance: vk::Instance,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn get_physical_device_properties = "vkGetPhysicalDeviceProperties"(
        physical_device: vk::PhysicalDevice,
        p_properties: *mut vk::PhysicalDeviceProperties,
    );
    fn destroy_surface_khr = "vkDestroySurfaceKHR"(
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn get_physical_device_display_properties_khr = "vkGetPhysicalDeviceDisplayPropertiesKHR"(
        physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayPropertiesKHR<'_>,
    ) -> vk::Result;
    fn get_physical_device_display_plane_properties_khr = "vkGetPhysicalDeviceDisplayPlanePropertiesKHR"(
        physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayPlanePropertiesKHR,
    ) -> vk::Result;
    fn get_display_plane_supported_displays_khr = "vkGetDisplayPlaneSupportedDisplaysKHR"(
        physical_device: vk::PhysicalDevice,
        plane_index: u32,
        p_display_count: *mut u32,
        p_displays: *mut vk::DisplayKHR,
    ) -> vk::Result;
    fn get_display_mode_properties_khr = "vkGetDisplayModePropertiesKHR"(
        physical_device: vk::PhysicalDevice,
        display: vk::DisplayKHR,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayModePropertiesKHR,
    ) -> vk::Result;
    fn get_physical_device_display_properties2_khr = "vkGetPhysicalDeviceDisplayProperties2KHR"(
        physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayProperties2KHR<'_>,
    ) -> vk::Result;
    fn get_physical_device_display_plane_properties2_khr = "vkGetPhysicalDeviceDisplayPlaneProperties2KHR"(
        physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayPlaneProperties2KHR<'_>,
    ) -> vk::Result;
    fn get_display_mode_properties2_khr = "vkGetDisplayModeProperties2KHR"(
        physical_device: vk::PhysicalDevice,
        display: vk::DisplayKHR,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayModeProperties2KHR<'_>,
    ) -> vk::Result;
    fn get_physical_device_tool_properties = "vkGetPhysicalDeviceToolProperties"(
        physical_device: vk::PhysicalDevice,
        p_tool_count: *mut u32,
        p_tool_properties: *mut vk::PhysicalDeviceToolProperties<'_>,
    ) -> vk::Result;
    fn get_physical_device_tool_properties_ext = "vkGetPhysicalDeviceToolPropertiesEXT"(
        physical_device: vk::PhysicalDevice,
        p_tool_count: *mut u32,
        p_tool_properties: *mut vk::PhysicalDeviceToolProperties<'_>,
    ) -> vk::Result;
}

impl LoadedInstanceTable {
    /// Resolve every entry point through the next layer.
    ///
    /// # Safety
    /// `get_instance_proc_addr` must be the next layer's resolver and
    /// `instance` a live instance created through it.
    pub unsafe fn load(
        instance: vk::Instance,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    ) -> Self {
        Self::resolve(|name| unsafe { get_instance_proc_addr(instance, name) })
    }
}

dispatch_table! {
    /// Device-level entry points of the next layer.
    trait DeviceTable;
    /// Device table resolved through the next layer's `vkGetDeviceProcAddr`.
    struct LoadedDeviceTable;

    fn destroy_device = "vkDestroyDevice"(
        device: vk::Device,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );

    // ── Resources ───────────────────────────────────────────
    fn create_buffer = "vkCreateBuffer"(
        device: vk::Device,
        p_create_info: *const vk::BufferCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_buffer: *mut vk::Buffer,
    ) -> vk::Result;
    fn destroy_buffer = "vkDestroyBuffer"(
        device: vk::Device,
        buffer: vk::Buffer,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_buffer_view = "vkCreateBufferView"(
        device: vk::Device,
        p_create_info: *const vk::BufferViewCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_view: *mut vk::BufferView,
    ) -> vk::Result;
    fn destroy_buffer_view = "vkDestroyBufferView"(
        device: vk::Device,
        buffer_view: vk::BufferView,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_image = "vkCreateImage"(
        device: vk::Device,
        p_create_info: *const vk::ImageCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_image: *mut vk::Image,
    ) -> vk::Result;
    fn destroy_image = "vkDestroyImage"(
        device: vk::Device,
        image: vk::Image,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_image_view = "vkCreateImageView"(
        device: vk::Device,
        p_create_info: *const vk::ImageViewCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_view: *mut vk::ImageView,
    ) -> vk::Result;
    fn destroy_image_view = "vkDestroyImageView"(
        device: vk::Device,
        image_view: vk::ImageView,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_sampler = "vkCreateSampler"(
        device: vk::Device,
        p_create_info: *const vk::SamplerCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_sampler: *mut vk::Sampler,
    ) -> vk::Result;
    fn destroy_sampler = "vkDestroySampler"(
        device: vk::Device,
        sampler: vk::Sampler,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_shader_module = "vkCreateShaderModule"(
        device: vk::Device,
        p_create_info: *const vk::ShaderModuleCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_shader_module: *mut vk::ShaderModule,
    ) -> vk::Result;
    fn destroy_shader_module = "vkDestroyShaderModule"(
        device: vk::Device,
        shader_module: vk::ShaderModule,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_semaphore = "vkCreateSemaphore"(
        device: vk::Device,
        p_create_info: *const vk::SemaphoreCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_semaphore: *mut vk::Semaphore,
    ) -> vk::Result;
    fn destroy_semaphore = "vkDestroySemaphore"(
        device: vk::Device,
        semaphore: vk::Semaphore,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_fence = "vkCreateFence"(
        device: vk::Device,
        p_create_info: *const vk::FenceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_fence: *mut vk::Fence,
    ) -> vk::Result;
    fn destroy_fence = "vkDestroyFence"(
        device: vk::Device,
        fence: vk::Fence,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn allocate_memory = "vkAllocateMemory"(
        device: vk::Device,
        p_allocate_info: *const vk::MemoryAllocateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_memory: *mut vk::DeviceMemory,
    ) -> vk::Result;
    fn free_memory = "vkFreeMemory"(
        device: vk::Device,
        memory: vk::DeviceMemory,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );

    // ── Descriptors ─────────────────────────────────────────
    fn create_descriptor_set_layout = "vkCreateDescriptorSetLayout"(
        device: vk::Device,
        p_create_info: *const vk::DescriptorSetLayoutCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_set_layout: *mut vk::DescriptorSetLayout,
    ) -> vk::Result;
    fn destroy_descriptor_set_layout = "vkDestroyDescriptorSetLayout"(
        device: vk::Device,
        descriptor_set_layout: vk::DescriptorSetLayout,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_descriptor_pool = "vkCreateDescriptorPool"(
        device: vk::Device,
        p_create_info: *const vk::DescriptorPoolCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_descriptor_pool: *mut vk::DescriptorPool,
    ) -> vk::Result;
    fn destroy_descriptor_pool = "vkDestroyDescriptorPool"(
        device: vk::Device,
        descriptor_pool: vk::DescriptorPool,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn reset_descriptor_pool = "vkResetDescriptorPool"(
        device: vk::Device,
        descriptor_pool: vk::DescriptorPool,
        flags: vk::DescriptorPoolResetFlags,
    ) -> vk::Result;
    fn allocate_descriptor_sets = "vkAllocateDescriptorSets"(
        device: vk::Device,
        p_allocate_info: *const vk::DescriptorSetAllocateInfo<'_>,
        p_descriptor_sets: *mut vk::DescriptorSet,
    ) -> vk::Result;
    fn free_descriptor_sets = "vkFreeDescriptorSets"(
        device: vk::Device,
        descriptor_pool: vk::DescriptorPool,
        descriptor_set_count: u32,
        p_descriptor_sets: *const vk::DescriptorSet,
    ) -> vk::Result;
    fn update_descriptor_sets = "vkUpdateDescriptorSets"(
        device: vk::Device,
        descriptor_write_count: u32,
        p_descriptor_writes: *const vk::WriteDescriptorSet<'_>,
        descriptor_copy_count: u32,
        p_descriptor_copies: *const vk::CopyDescriptorSet<'_>,
    );
    fn create_descriptor_update_template = "vkCreateDescriptorUpdateTemplate"(
        device: vk::Device,
        p_create_info: *const vk::DescriptorUpdateTemplateCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_descriptor_update_template: *mut vk::DescriptorUpdateTemplate,
    ) -> vk::Result;
    fn destroy_descriptor_update_template = "vkDestroyDescriptorUpdateTemplate"(
        device: vk::Device,
        descriptor_update_template: vk::DescriptorUpdateTemplate,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn update_descriptor_set_with_template = "vkUpdateDescriptorSetWithTemplate"(
        device: vk::Device,
        descriptor_set: vk::DescriptorSet,
        descriptor_update_template: vk::DescriptorUpdateTemplate,
        p_data: *const c_void,
    );
    fn cmd_push_descriptor_set_with_template_khr = "vkCmdPushDescriptorSetWithTemplateKHR"(
        command_buffer: vk::CommandBuffer,
        descriptor_update_template: vk::DescriptorUpdateTemplate,
        layout: vk::PipelineLayout,
        set: u32,
        p_data: *const c_void,
    );
    fn cmd_push_descriptor_set_with_template2_khr = "vkCmdPushDescriptorSetWithTemplate2KHR"(
        command_buffer: vk::CommandBuffer,
        p_push_descriptor_set_with_template_info: *const vk::PushDescriptorSetWithTemplateInfoKHR<'_>,
    );
    fn get_descriptor_ext = "vkGetDescriptorEXT"(
        device: vk::Device,
        p_descriptor_info: *const vk::DescriptorGetInfoEXT<'_>,
        data_size: usize,
        p_descriptor: *mut c_void,
    );

    // ── Render passes ───────────────────────────────────────
    fn create_render_pass = "vkCreateRenderPass"(
        device: vk::Device,
        p_create_info: *const vk::RenderPassCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_render_pass: *mut vk::RenderPass,
    ) -> vk::Result;
    fn create_render_pass2 = "vkCreateRenderPass2"(
        device: vk::Device,
        p_create_info: *const vk::RenderPassCreateInfo2<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_render_pass: *mut vk::RenderPass,
    ) -> vk::Result;
    fn destroy_render_pass = "vkDestroyRenderPass"(
        device: vk::Device,
        render_pass: vk::RenderPass,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_framebuffer = "vkCreateFramebuffer"(
        device: vk::Device,
        p_create_info: *const vk::FramebufferCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_framebuffer: *mut vk::Framebuffer,
    ) -> vk::Result;
    fn destroy_framebuffer = "vkDestroyFramebuffer"(
        device: vk::Device,
        framebuffer: vk::Framebuffer,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn cmd_begin_render_pass = "vkCmdBeginRenderPass"(
        command_buffer: vk::CommandBuffer,
        p_render_pass_begin: *const vk::RenderPassBeginInfo<'_>,
        contents: vk::SubpassContents,
    );

    // ── Pipelines ───────────────────────────────────────────
    fn create_pipeline_cache = "vkCreatePipelineCache"(
        device: vk::Device,
        p_create_info: *const vk::PipelineCacheCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipeline_cache: *mut vk::PipelineCache,
    ) -> vk::Result;
    fn destroy_pipeline_cache = "vkDestroyPipelineCache"(
        device: vk::Device,
        pipeline_cache: vk::PipelineCache,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_pipeline_layout = "vkCreatePipelineLayout"(
        device: vk::Device,
        p_create_info: *const vk::PipelineLayoutCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipeline_layout: *mut vk::PipelineLayout,
    ) -> vk::Result;
    fn destroy_pipeline_layout = "vkDestroyPipelineLayout"(
        device: vk::Device,
        pipeline_layout: vk::PipelineLayout,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn create_graphics_pipelines = "vkCreateGraphicsPipelines"(
        device: vk::Device,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::GraphicsPipelineCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result;
    fn create_compute_pipelines = "vkCreateComputePipelines"(
        device: vk::Device,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::ComputePipelineCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result;
    fn create_ray_tracing_pipelines_khr = "vkCreateRayTracingPipelinesKHR"(
        device: vk::Device,
        deferred_operation: vk::DeferredOperationKHR,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::RayTracingPipelineCreateInfoKHR<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result;
    fn destroy_pipeline = "vkDestroyPipeline"(
        device: vk::Device,
        pipeline: vk::Pipeline,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );

    // ── Command buffers ─────────────────────────────────────
    fn create_command_pool = "vkCreateCommandPool"(
        device: vk::Device,
        p_create_info: *const vk::CommandPoolCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_command_pool: *mut vk::CommandPool,
    ) -> vk::Result;
    fn destroy_command_pool = "vkDestroyCommandPool"(
        device: vk::Device,
        command_pool: vk::CommandPool,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn allocate_command_buffers = "vkAllocateCommandBuffers"(
        device: vk::Device,
        p_allocate_info: *const vk::CommandBufferAllocateInfo<'_>,
        p_command_buffers: *mut vk::CommandBuffer,
    ) -> vk::Result;
    fn free_command_buffers = "vkFreeCommandBuffers"(
        device: vk::Device,
        command_pool: vk::CommandPool,
        command_buffer_count: u32,
        p_command_buffers: *const vk::CommandBuffer,
    );
    fn begin_command_buffer = "vkBeginCommandBuffer"(
        command_buffer: vk::CommandBuffer,
        p_begin_info: *const vk::CommandBufferBeginInfo<'_>,
    ) -> vk::Result;

    // ── Swapchain ───────────────────────────────────────────
    fn create_swapchain_khr = "vkCreateSwapchainKHR"(
        device: vk::Device,
        p_create_info: *const vk::SwapchainCreateInfoKHR<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_swapchain: *mut vk::SwapchainKHR,
    ) -> vk::Result;
    fn destroy_swapchain_khr = "vkDestroySwapchainKHR"(
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn get_swapchain_images_khr = "vkGetSwapchainImagesKHR"(
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        p_swapchain_image_count: *mut u32,
        p_swapchain_images: *mut vk::Image,
    ) -> vk::Result;
    fn acquire_next_image_khr = "vkAcquireNextImageKHR"(
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
        p_image_index: *mut u32,
    ) -> vk::Result;
    fn queue_present_khr = "vkQueuePresentKHR"(
        queue: vk::Queue,
        p_present_info: *const vk::PresentInfoKHR<'_>,
    ) -> vk::Result;

    // ── Deferred host operations ────────────────────────────
    fn create_deferred_operation_khr = "vkCreateDeferredOperationKHR"(
        device: vk::Device,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_deferred_operation: *mut vk::DeferredOperationKHR,
    ) -> vk::Result;
    fn destroy_deferred_operation_khr = "vkDestroyDeferredOperationKHR"(
        device: vk::Device,
        operation: vk::DeferredOperationKHR,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn deferred_operation_join_khr = "vkDeferredOperationJoinKHR"(
        device: vk::Device,
        operation: vk::DeferredOperationKHR,
    ) -> vk::Result;
    fn get_deferred_operation_result_khr = "vkGetDeferredOperationResultKHR"(
        device: vk::Device,
        operation: vk::DeferredOperationKHR,
    ) -> vk::Result;

    // ── Acceleration structures ─────────────────────────────
    fn create_acceleration_structure_khr = "vkCreateAccelerationStructureKHR"(
        device: vk::Device,
        p_create_info: *const vk::AccelerationStructureCreateInfoKHR<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_acceleration_structure: *mut vk::AccelerationStructureKHR,
    ) -> vk::Result;
    fn destroy_acceleration_structure_khr = "vkDestroyAccelerationStructureKHR"(
        device: vk::Device,
        acceleration_structure: vk::AccelerationStructureKHR,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    );
    fn build_acceleration_structures_khr = "vkBuildAccelerationStructuresKHR"(
        device: vk::Device,
        deferred_operation: vk::DeferredOperationKHR,
        info_count: u32,
        p_infos: *const vk::AccelerationStructureBuildGeometryInfoKHR<'_>,
        pp_build_range_infos: *const *const vk::AccelerationStructureBuildRangeInfoKHR,
    ) -> vk::Result;
    fn cmd_build_acceleration_structures_khr = "vkCmdBuildAccelerationStructuresKHR"(
        command_buffer: vk::CommandBuffer,
        info_count: u32,
        p_infos: *const vk::AccelerationStructureBuildGeometryInfoKHR<'_>,
        pp_build_range_infos: *const *const vk::AccelerationStructureBuildRangeInfoKHR,
    );
    fn get_acceleration_structure_build_sizes_khr = "vkGetAccelerationStructureBuildSizesKHR"(
        device: vk::Device,
        build_type: vk::AccelerationStructureBuildTypeKHR,
        p_build_info: *const vk::AccelerationStructureBuildGeometryInfoKHR<'_>,
        p_max_primitive_counts: *const u32,
        p_size_info: *mut vk::AccelerationStructureBuildSizesInfoKHR<'_>,
    );

    // ── Debug naming ────────────────────────────────────────
    fn set_debug_utils_object_name_ext = "vkSetDebugUtilsObjectNameEXT"(
        device: vk::Device,
        p_name_info: *const vk::DebugUtilsObjectNameInfoEXT<'_>,
    ) -> vk::Result;
    fn set_debug_utils_object_tag_ext = "vkSetDebugUtilsObjectTagEXT"(
        device: vk::Device,
        p_tag_info: *const vk::DebugUtilsObjectTagInfoEXT<'_>,
    ) -> vk::Result;
    fn debug_marker_set_object_name_ext = "vkDebugMarkerSetObjectNameEXT"(
        device: vk::Device,
        p_name_info: *const vk::DebugMarkerObjectNameInfoEXT<'_>,
    ) -> vk::Result;
    fn debug_marker_set_object_tag_ext = "vkDebugMarkerSetObjectTagEXT"(
        device: vk::Device,
        p_tag_info: *const vk::DebugMarkerObjectTagInfoEXT<'_>,
    ) -> vk::Result;

    // ── Performance queries ─────────────────────────────────
    fn acquire_performance_configuration_intel = "vkAcquirePerformanceConfigurationINTEL"(
        device: vk::Device,
        p_acquire_info: *const vk::PerformanceConfigurationAcquireInfoINTEL<'_>,
        p_configuration: *mut vk::PerformanceConfigurationINTEL,
    ) -> vk::Result;
    fn release_performance_configuration_intel = "vkReleasePerformanceConfigurationINTEL"(
        device: vk::Device,
        configuration: vk::PerformanceConfigurationINTEL,
    ) -> vk::Result;

    // ── Platform ────────────────────────────────────────────
    fn export_metal_objects_ext = "vkExportMetalObjectsEXT"(
        device: vk::Device,
        p_metal_objects_info: *mut vk::ExportMetalObjectsInfoEXT<'_>,
    );
}

impl LoadedDeviceTable {
    /// Resolve every entry point through the next layer.
    ///
    /// # Safety
    /// `get_device_proc_addr` must be the next layer's resolver and `device` a
    /// live device created through it.
    pub unsafe fn load(device: vk::Device, get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr) -> Self {
        Self::resolve(|name| unsafe { get_device_proc_addr(device, name) })
    }
}
