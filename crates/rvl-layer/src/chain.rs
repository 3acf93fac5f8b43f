//! Layer-owned copies of pNext chains.
//!
//! The application's chain is never written. Each known block is copied into
//! storage owned by a [`LocalChain`], handles inside it are replaced by the
//! real ones, and output blocks get their own storage that is copied back to
//! the application's block once the forwarded call returns.

use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;

use ash::vk;
use tracing::error;

use crate::error::LayerError;
use crate::wrap::{local_ptr, read_array, HandleWrapper};

// ── Blocks ──────────────────────────────────────────────────

enum Block {
    /// Handle-free block copied verbatim, 8-byte aligned.
    Plain(Vec<u64>),
    Rendering(Box<vk::PipelineRenderingCreateInfo<'static>>),
    Library {
        info: Box<vk::PipelineLibraryCreateInfoKHR<'static>>,
        _libraries: Vec<vk::Pipeline>,
    },
    ShaderGroups {
        info: Box<vk::GraphicsPipelineShaderGroupsCreateInfoNV<'static>>,
        _groups: Vec<vk::GraphicsShaderGroupCreateInfoNV<'static>>,
        _stages: Vec<Vec<vk::PipelineShaderStageCreateInfo<'static>>>,
        _pipelines: Vec<vk::Pipeline>,
    },
    Feedback {
        info: Box<vk::PipelineCreationFeedbackCreateInfo<'static>>,
        pipeline: Box<vk::PipelineCreationFeedback>,
        stages: Vec<vk::PipelineCreationFeedback>,
    },
    YcbcrConversion(Box<vk::SamplerYcbcrConversionInfo<'static>>),
    ValidationCache(Box<vk::ShaderModuleValidationCacheCreateInfoEXT<'static>>),
    DedicatedAllocation(Box<vk::MemoryDedicatedAllocateInfo<'static>>),
    AccelerationStructureWrite {
        info: Box<vk::WriteDescriptorSetAccelerationStructureKHR<'static>>,
        _structures: Vec<vk::AccelerationStructureKHR>,
    },
    AccelerationStructureWriteNV {
        info: Box<vk::WriteDescriptorSetAccelerationStructureNV<'static>>,
        _structures: Vec<vk::AccelerationStructureNV>,
    },
    DedicatedAllocationNV(Box<vk::DedicatedAllocationMemoryAllocateInfoNV<'static>>),
    ImageSwapchain(Box<vk::ImageSwapchainCreateInfoKHR<'static>>),
    SubpassShading(Box<vk::SubpassShadingPipelineCreateInfoHUAWEI<'static>>),
    PipelineLayout {
        info: Box<vk::PipelineLayoutCreateInfo<'static>>,
        _set_layouts: Vec<vk::DescriptorSetLayout>,
    },
    FrameBoundary {
        info: Box<vk::FrameBoundaryEXT<'static>>,
        _images: Vec<vk::Image>,
        _buffers: Vec<vk::Buffer>,
    },
    PresentFences {
        info: Box<vk::SwapchainPresentFenceInfoEXT<'static>>,
        _fences: Vec<vk::Fence>,
    },
    AttachmentBegin {
        info: Box<vk::RenderPassAttachmentBeginInfo<'static>>,
        _views: Vec<vk::ImageView>,
    },
    OpacityMicromap(Box<vk::AccelerationStructureTrianglesOpacityMicromapEXT<'static>>),
    DisplacementMicromap(Box<vk::AccelerationStructureTrianglesDisplacementMicromapNV<'static>>),
    MetalDevice(Box<vk::ExportMetalDeviceInfoEXT<'static>>),
    MetalCommandQueue(Box<vk::ExportMetalCommandQueueInfoEXT<'static>>),
    MetalBuffer(Box<vk::ExportMetalBufferInfoEXT<'static>>),
    MetalTexture(Box<vk::ExportMetalTextureInfoEXT<'static>>),
    MetalIOSurface(Box<vk::ExportMetalIOSurfaceInfoEXT<'static>>),
    MetalSharedEvent(Box<vk::ExportMetalSharedEventInfoEXT<'static>>),
}

fn base<T>(block: &mut T) -> *mut vk::BaseOutStructure<'static> {
    (block as *mut T).cast()
}

impl Block {
    fn header(&mut self) -> *mut vk::BaseOutStructure<'static> {
        match self {
            Block::Plain(words) => words.as_mut_ptr().cast(),
            Block::Rendering(info) => base(&mut **info),
            Block::Library { info, .. } => base(&mut **info),
            Block::ShaderGroups { info, .. } => base(&mut **info),
            Block::Feedback { info, .. } => base(&mut **info),
            Block::YcbcrConversion(info) => base(&mut **info),
            Block::ValidationCache(info) => base(&mut **info),
            Block::DedicatedAllocation(info) => base(&mut **info),
            Block::AccelerationStructureWrite { info, .. } => base(&mut **info),
            Block::AccelerationStructureWriteNV { info, .. } => base(&mut **info),
            Block::DedicatedAllocationNV(info) => base(&mut **info),
            Block::ImageSwapchain(info) => base(&mut **info),
            Block::SubpassShading(info) => base(&mut **info),
            Block::PipelineLayout { info, .. } => base(&mut **info),
            Block::FrameBoundary { info, .. } => base(&mut **info),
            Block::PresentFences { info, .. } => base(&mut **info),
            Block::AttachmentBegin { info, .. } => base(&mut **info),
            Block::OpacityMicromap(info) => base(&mut **info),
            Block::DisplacementMicromap(info) => base(&mut **info),
            Block::MetalDevice(info) => base(&mut **info),
            Block::MetalCommandQueue(info) => base(&mut **info),
            Block::MetalBuffer(info) => base(&mut **info),
            Block::MetalTexture(info) => base(&mut **info),
            Block::MetalIOSurface(info) => base(&mut **info),
            Block::MetalSharedEvent(info) => base(&mut **info),
        }
    }

    /// Write outputs produced into this copy back to the application block.
    ///
    /// # Safety
    /// `dst` must be the application block this one was copied from.
    unsafe fn copy_back(&self, dst: *mut c_void) {
        unsafe {
            match self {
                Block::Feedback { pipeline, stages, .. } => {
                    let dst = &*(dst as *const vk::PipelineCreationFeedbackCreateInfo<'static>);
                    if !dst.p_pipeline_creation_feedback.is_null() {
                        *dst.p_pipeline_creation_feedback = **pipeline;
                    }
                    if !dst.p_pipeline_stage_creation_feedbacks.is_null() {
                        let count = stages
                            .len()
                            .min(dst.pipeline_stage_creation_feedback_count as usize);
                        ptr::copy_nonoverlapping(
                            stages.as_ptr(),
                            dst.p_pipeline_stage_creation_feedbacks,
                            count,
                        );
                    }
                }
                Block::MetalDevice(info) => {
                    (*(dst as *mut vk::ExportMetalDeviceInfoEXT<'static>)).mtl_device =
                        info.mtl_device;
                }
                Block::MetalCommandQueue(info) => {
                    (*(dst as *mut vk::ExportMetalCommandQueueInfoEXT<'static>))
                        .mtl_command_queue = info.mtl_command_queue;
                }
                Block::MetalBuffer(info) => {
                    (*(dst as *mut vk::ExportMetalBufferInfoEXT<'static>)).mtl_buffer =
                        info.mtl_buffer;
                }
                Block::MetalTexture(info) => {
                    (*(dst as *mut vk::ExportMetalTextureInfoEXT<'static>)).mtl_texture =
                        info.mtl_texture;
                }
                Block::MetalIOSurface(info) => {
                    (*(dst as *mut vk::ExportMetalIOSurfaceInfoEXT<'static>)).io_surface =
                        info.io_surface;
                }
                Block::MetalSharedEvent(info) => {
                    (*(dst as *mut vk::ExportMetalSharedEventInfoEXT<'static>))
                        .mtl_shared_event = info.mtl_shared_event;
                }
                _ => {}
            }
        }
    }
}

/// Size of the handle-free blocks that are copied byte for byte.
///
/// Covers every block the intercepted parents accept that carries no
/// wrapped handle. Pointers inside these blocks are shared with the
/// application.
fn plain_size(s_type: vk::StructureType) -> Option<usize> {
    macro_rules! plain_blocks {
        ($($s_type:ident => $ty:ident),* $(,)?) => {
            match s_type {
                $(vk::StructureType::$s_type => Some(size_of::<vk::$ty<'static>>()),)*
                _ => None,
            }
        };
    }
    plain_blocks! {
        // pipelines
        PIPELINE_ROBUSTNESS_CREATE_INFO_EXT => PipelineRobustnessCreateInfoEXT,
        PIPELINE_CREATE_FLAGS_2_CREATE_INFO_KHR => PipelineCreateFlags2CreateInfoKHR,
        PIPELINE_COMPILER_CONTROL_CREATE_INFO_AMD => PipelineCompilerControlCreateInfoAMD,
        GRAPHICS_PIPELINE_LIBRARY_CREATE_INFO_EXT => GraphicsPipelineLibraryCreateInfoEXT,
        PIPELINE_DISCARD_RECTANGLE_STATE_CREATE_INFO_EXT => PipelineDiscardRectangleStateCreateInfoEXT,
        PIPELINE_FRAGMENT_SHADING_RATE_STATE_CREATE_INFO_KHR => PipelineFragmentShadingRateStateCreateInfoKHR,
        PIPELINE_FRAGMENT_SHADING_RATE_ENUM_STATE_CREATE_INFO_NV => PipelineFragmentShadingRateEnumStateCreateInfoNV,
        PIPELINE_REPRESENTATIVE_FRAGMENT_TEST_STATE_CREATE_INFO_NV => PipelineRepresentativeFragmentTestStateCreateInfoNV,
        ATTACHMENT_SAMPLE_COUNT_INFO_AMD => AttachmentSampleCountInfoAMD,
        MULTIVIEW_PER_VIEW_ATTRIBUTES_INFO_NVX => MultiviewPerViewAttributesInfoNVX,
        RENDERING_ATTACHMENT_LOCATION_INFO_KHR => RenderingAttachmentLocationInfoKHR,
        RENDERING_INPUT_ATTACHMENT_INDEX_INFO_KHR => RenderingInputAttachmentIndexInfoKHR,
        EXTERNAL_FORMAT_ANDROID => ExternalFormatANDROID,
        COMPUTE_PIPELINE_INDIRECT_BUFFER_INFO_NV => ComputePipelineIndirectBufferInfoNV,
        // images and views
        DEDICATED_ALLOCATION_IMAGE_CREATE_INFO_NV => DedicatedAllocationImageCreateInfoNV,
        EXTERNAL_MEMORY_IMAGE_CREATE_INFO_NV => ExternalMemoryImageCreateInfoNV,
        EXTERNAL_MEMORY_IMAGE_CREATE_INFO => ExternalMemoryImageCreateInfo,
        IMAGE_FORMAT_LIST_CREATE_INFO => ImageFormatListCreateInfo,
        IMAGE_DRM_FORMAT_MODIFIER_LIST_CREATE_INFO_EXT => ImageDrmFormatModifierListCreateInfoEXT,
        IMAGE_DRM_FORMAT_MODIFIER_EXPLICIT_CREATE_INFO_EXT => ImageDrmFormatModifierExplicitCreateInfoEXT,
        IMAGE_STENCIL_USAGE_CREATE_INFO => ImageStencilUsageCreateInfo,
        IMAGE_COMPRESSION_CONTROL_EXT => ImageCompressionControlEXT,
        VIDEO_PROFILE_LIST_INFO_KHR => VideoProfileListInfoKHR,
        OPAQUE_CAPTURE_DESCRIPTOR_DATA_CREATE_INFO_EXT => OpaqueCaptureDescriptorDataCreateInfoEXT,
        BUFFER_COLLECTION_IMAGE_CREATE_INFO_FUCHSIA => BufferCollectionImageCreateInfoFUCHSIA,
        EXPORT_METAL_OBJECT_CREATE_INFO_EXT => ExportMetalObjectCreateInfoEXT,
        IMPORT_METAL_TEXTURE_INFO_EXT => ImportMetalTextureInfoEXT,
        IMPORT_METAL_IO_SURFACE_INFO_EXT => ImportMetalIOSurfaceInfoEXT,
        OPTICAL_FLOW_IMAGE_FORMAT_INFO_NV => OpticalFlowImageFormatInfoNV,
        EXTERNAL_FORMAT_QNX => ExternalFormatQNX,
        IMAGE_VIEW_USAGE_CREATE_INFO => ImageViewUsageCreateInfo,
        IMAGE_VIEW_SLICED_CREATE_INFO_EXT => ImageViewSlicedCreateInfoEXT,
        IMAGE_VIEW_ASTC_DECODE_MODE_EXT => ImageViewASTCDecodeModeEXT,
        IMAGE_VIEW_MIN_LOD_CREATE_INFO_EXT => ImageViewMinLodCreateInfoEXT,
        IMAGE_VIEW_SAMPLE_WEIGHT_CREATE_INFO_QCOM => ImageViewSampleWeightCreateInfoQCOM,
        // samplers
        SAMPLER_REDUCTION_MODE_CREATE_INFO => SamplerReductionModeCreateInfo,
        SAMPLER_CUSTOM_BORDER_COLOR_CREATE_INFO_EXT => SamplerCustomBorderColorCreateInfoEXT,
        SAMPLER_BORDER_COLOR_COMPONENT_MAPPING_CREATE_INFO_EXT => SamplerBorderColorComponentMappingCreateInfoEXT,
        SAMPLER_CUBIC_WEIGHTS_CREATE_INFO_QCOM => SamplerCubicWeightsCreateInfoQCOM,
        SAMPLER_BLOCK_MATCH_WINDOW_CREATE_INFO_QCOM => SamplerBlockMatchWindowCreateInfoQCOM,
        // memory
        MEMORY_ALLOCATE_FLAGS_INFO => MemoryAllocateFlagsInfo,
        MEMORY_OPAQUE_CAPTURE_ADDRESS_ALLOCATE_INFO => MemoryOpaqueCaptureAddressAllocateInfo,
        MEMORY_PRIORITY_ALLOCATE_INFO_EXT => MemoryPriorityAllocateInfoEXT,
        EXPORT_MEMORY_ALLOCATE_INFO => ExportMemoryAllocateInfo,
        EXPORT_MEMORY_ALLOCATE_INFO_NV => ExportMemoryAllocateInfoNV,
        EXPORT_MEMORY_WIN32_HANDLE_INFO_KHR => ExportMemoryWin32HandleInfoKHR,
        EXPORT_MEMORY_WIN32_HANDLE_INFO_NV => ExportMemoryWin32HandleInfoNV,
        IMPORT_MEMORY_WIN32_HANDLE_INFO_KHR => ImportMemoryWin32HandleInfoKHR,
        IMPORT_MEMORY_WIN32_HANDLE_INFO_NV => ImportMemoryWin32HandleInfoNV,
        IMPORT_MEMORY_FD_INFO_KHR => ImportMemoryFdInfoKHR,
        IMPORT_MEMORY_HOST_POINTER_INFO_EXT => ImportMemoryHostPointerInfoEXT,
        IMPORT_MEMORY_ZIRCON_HANDLE_INFO_FUCHSIA => ImportMemoryZirconHandleInfoFUCHSIA,
        IMPORT_MEMORY_BUFFER_COLLECTION_FUCHSIA => ImportMemoryBufferCollectionFUCHSIA,
        IMPORT_ANDROID_HARDWARE_BUFFER_INFO_ANDROID => ImportAndroidHardwareBufferInfoANDROID,
        IMPORT_METAL_BUFFER_INFO_EXT => ImportMetalBufferInfoEXT,
        IMPORT_SCREEN_BUFFER_INFO_QNX => ImportScreenBufferInfoQNX,
        // descriptor writes
        WRITE_DESCRIPTOR_SET_INLINE_UNIFORM_BLOCK => WriteDescriptorSetInlineUniformBlock,
        // presentation
        PRESENT_ID_KHR => PresentIdKHR,
        PRESENT_REGIONS_KHR => PresentRegionsKHR,
        PRESENT_TIMES_INFO_GOOGLE => PresentTimesInfoGOOGLE,
        PRESENT_FRAME_TOKEN_GGP => PresentFrameTokenGGP,
        DISPLAY_PRESENT_INFO_KHR => DisplayPresentInfoKHR,
        DEVICE_GROUP_PRESENT_INFO_KHR => DeviceGroupPresentInfoKHR,
        SWAPCHAIN_PRESENT_MODE_INFO_EXT => SwapchainPresentModeInfoEXT,
        // render pass begin
        DEVICE_GROUP_RENDER_PASS_BEGIN_INFO => DeviceGroupRenderPassBeginInfo,
        RENDER_PASS_SAMPLE_LOCATIONS_BEGIN_INFO_EXT => RenderPassSampleLocationsBeginInfoEXT,
        RENDER_PASS_TRANSFORM_BEGIN_INFO_QCOM => RenderPassTransformBeginInfoQCOM,
        MULTIVIEW_PER_VIEW_RENDER_AREAS_RENDER_PASS_BEGIN_INFO_QCOM => MultiviewPerViewRenderAreasRenderPassBeginInfoQCOM,
        RENDER_PASS_STRIPE_BEGIN_INFO_ARM => RenderPassStripeBeginInfoARM,
        // acceleration structure geometry
        ACCELERATION_STRUCTURE_GEOMETRY_MOTION_TRIANGLES_DATA_NV => AccelerationStructureGeometryMotionTrianglesDataNV,
    }
}

unsafe fn read<T>(src: *const vk::BaseInStructure<'static>) -> T {
    unsafe { ptr::read(src.cast::<T>()) }
}

/// Copy one application block, unwrapping the handles it carries.
///
/// # Safety
/// `src` must point to a valid structure whose `s_type` matches its layout.
unsafe fn copy_block(
    wrapper: &HandleWrapper,
    src: *const vk::BaseInStructure<'static>,
) -> Result<Block, LayerError> {
    let s_type = unsafe { (*src).s_type };
    let block = unsafe {
        match s_type {
            vk::StructureType::PIPELINE_RENDERING_CREATE_INFO => {
                Block::Rendering(Box::new(read(src)))
            }
            vk::StructureType::PIPELINE_LIBRARY_CREATE_INFO_KHR => {
                let mut info: Box<vk::PipelineLibraryCreateInfoKHR<'static>> =
                    Box::new(read(src));
                let libraries = wrapper.unwrap_array(info.p_libraries, info.library_count);
                info.p_libraries = local_ptr(&libraries, info.p_libraries);
                Block::Library { info, _libraries: libraries }
            }
            vk::StructureType::GRAPHICS_PIPELINE_SHADER_GROUPS_CREATE_INFO_NV => {
                let mut info: Box<vk::GraphicsPipelineShaderGroupsCreateInfoNV<'static>> =
                    Box::new(read(src));
                let mut groups = read_array(info.p_groups, info.group_count);
                let mut stages = Vec::with_capacity(groups.len());
                for group in &mut groups {
                    let mut group_stages = read_array(group.p_stages, group.stage_count);
                    for stage in &mut group_stages {
                        stage.module = wrapper.unwrap(stage.module);
                    }
                    group.p_stages = local_ptr(&group_stages, group.p_stages);
                    stages.push(group_stages);
                }
                info.p_groups = local_ptr(&groups, info.p_groups);
                let pipelines = wrapper.unwrap_array(info.p_pipelines, info.pipeline_count);
                info.p_pipelines = local_ptr(&pipelines, info.p_pipelines);
                Block::ShaderGroups {
                    info,
                    _groups: groups,
                    _stages: stages,
                    _pipelines: pipelines,
                }
            }
            vk::StructureType::PIPELINE_CREATION_FEEDBACK_CREATE_INFO => {
                let mut info: Box<vk::PipelineCreationFeedbackCreateInfo<'static>> =
                    Box::new(read(src));
                let mut pipeline = Box::new(vk::PipelineCreationFeedback::default());
                let mut stages = vec![
                    vk::PipelineCreationFeedback::default();
                    info.pipeline_stage_creation_feedback_count as usize
                ];
                if !info.p_pipeline_creation_feedback.is_null() {
                    info.p_pipeline_creation_feedback = &mut *pipeline;
                }
                if !info.p_pipeline_stage_creation_feedbacks.is_null() {
                    info.p_pipeline_stage_creation_feedbacks = stages.as_mut_ptr();
                }
                Block::Feedback { info, pipeline, stages }
            }
            vk::StructureType::SAMPLER_YCBCR_CONVERSION_INFO => {
                let mut info: Box<vk::SamplerYcbcrConversionInfo<'static>> = Box::new(read(src));
                info.conversion = wrapper.unwrap(info.conversion);
                Block::YcbcrConversion(info)
            }
            vk::StructureType::SHADER_MODULE_VALIDATION_CACHE_CREATE_INFO_EXT => {
                let mut info: Box<vk::ShaderModuleValidationCacheCreateInfoEXT<'static>> =
                    Box::new(read(src));
                info.validation_cache = wrapper.unwrap(info.validation_cache);
                Block::ValidationCache(info)
            }
            vk::StructureType::MEMORY_DEDICATED_ALLOCATE_INFO => {
                let mut info: Box<vk::MemoryDedicatedAllocateInfo<'static>> = Box::new(read(src));
                info.image = wrapper.unwrap(info.image);
                info.buffer = wrapper.unwrap(info.buffer);
                Block::DedicatedAllocation(info)
            }
            vk::StructureType::WRITE_DESCRIPTOR_SET_ACCELERATION_STRUCTURE_KHR => {
                let mut info: Box<vk::WriteDescriptorSetAccelerationStructureKHR<'static>> =
                    Box::new(read(src));
                let structures = wrapper.unwrap_array(
                    info.p_acceleration_structures,
                    info.acceleration_structure_count,
                );
                info.p_acceleration_structures =
                    local_ptr(&structures, info.p_acceleration_structures);
                Block::AccelerationStructureWrite { info, _structures: structures }
            }
            vk::StructureType::WRITE_DESCRIPTOR_SET_ACCELERATION_STRUCTURE_NV => {
                let mut info: Box<vk::WriteDescriptorSetAccelerationStructureNV<'static>> =
                    Box::new(read(src));
                let structures = wrapper.unwrap_array(
                    info.p_acceleration_structures,
                    info.acceleration_structure_count,
                );
                info.p_acceleration_structures =
                    local_ptr(&structures, info.p_acceleration_structures);
                Block::AccelerationStructureWriteNV { info, _structures: structures }
            }
            vk::StructureType::DEDICATED_ALLOCATION_MEMORY_ALLOCATE_INFO_NV => {
                let mut info: Box<vk::DedicatedAllocationMemoryAllocateInfoNV<'static>> =
                    Box::new(read(src));
                info.image = wrapper.unwrap(info.image);
                info.buffer = wrapper.unwrap(info.buffer);
                Block::DedicatedAllocationNV(info)
            }
            vk::StructureType::IMAGE_SWAPCHAIN_CREATE_INFO_KHR => {
                let mut info: Box<vk::ImageSwapchainCreateInfoKHR<'static>> = Box::new(read(src));
                info.swapchain = wrapper.unwrap(info.swapchain);
                Block::ImageSwapchain(info)
            }
            vk::StructureType::SUBPASS_SHADING_PIPELINE_CREATE_INFO_HUAWEI => {
                let mut info: Box<vk::SubpassShadingPipelineCreateInfoHUAWEI<'static>> =
                    Box::new(read(src));
                info.render_pass = wrapper.unwrap(info.render_pass);
                Block::SubpassShading(info)
            }
            vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO => {
                let mut info: Box<vk::PipelineLayoutCreateInfo<'static>> = Box::new(read(src));
                let set_layouts = wrapper.unwrap_array(info.p_set_layouts, info.set_layout_count);
                info.p_set_layouts = local_ptr(&set_layouts, info.p_set_layouts);
                Block::PipelineLayout { info, _set_layouts: set_layouts }
            }
            vk::StructureType::FRAME_BOUNDARY_EXT => {
                let mut info: Box<vk::FrameBoundaryEXT<'static>> = Box::new(read(src));
                let images = wrapper.unwrap_array(info.p_images, info.image_count);
                info.p_images = local_ptr(&images, info.p_images);
                let buffers = wrapper.unwrap_array(info.p_buffers, info.buffer_count);
                info.p_buffers = local_ptr(&buffers, info.p_buffers);
                Block::FrameBoundary { info, _images: images, _buffers: buffers }
            }
            vk::StructureType::SWAPCHAIN_PRESENT_FENCE_INFO_EXT => {
                let mut info: Box<vk::SwapchainPresentFenceInfoEXT<'static>> = Box::new(read(src));
                let fences = wrapper.unwrap_array(info.p_fences, info.swapchain_count);
                info.p_fences = local_ptr(&fences, info.p_fences);
                Block::PresentFences { info, _fences: fences }
            }
            vk::StructureType::RENDER_PASS_ATTACHMENT_BEGIN_INFO => {
                let mut info: Box<vk::RenderPassAttachmentBeginInfo<'static>> =
                    Box::new(read(src));
                let views = wrapper.unwrap_array(info.p_attachments, info.attachment_count);
                info.p_attachments = local_ptr(&views, info.p_attachments);
                Block::AttachmentBegin { info, _views: views }
            }
            vk::StructureType::ACCELERATION_STRUCTURE_TRIANGLES_OPACITY_MICROMAP_EXT => {
                let mut info: Box<vk::AccelerationStructureTrianglesOpacityMicromapEXT<'static>> =
                    Box::new(read(src));
                info.micromap = wrapper.unwrap(info.micromap);
                Block::OpacityMicromap(info)
            }
            vk::StructureType::ACCELERATION_STRUCTURE_TRIANGLES_DISPLACEMENT_MICROMAP_NV => {
                let mut info: Box<vk::AccelerationStructureTrianglesDisplacementMicromapNV<'static>> =
                    Box::new(read(src));
                info.micromap = wrapper.unwrap(info.micromap);
                Block::DisplacementMicromap(info)
            }
            vk::StructureType::EXPORT_METAL_DEVICE_INFO_EXT => {
                Block::MetalDevice(Box::new(read(src)))
            }
            vk::StructureType::EXPORT_METAL_COMMAND_QUEUE_INFO_EXT => {
                Block::MetalCommandQueue(Box::new(read(src)))
            }
            vk::StructureType::EXPORT_METAL_BUFFER_INFO_EXT => {
                let mut info: Box<vk::ExportMetalBufferInfoEXT<'static>> = Box::new(read(src));
                info.memory = wrapper.unwrap(info.memory);
                Block::MetalBuffer(info)
            }
            vk::StructureType::EXPORT_METAL_TEXTURE_INFO_EXT => {
                let mut info: Box<vk::ExportMetalTextureInfoEXT<'static>> = Box::new(read(src));
                info.image = wrapper.unwrap(info.image);
                info.image_view = wrapper.unwrap(info.image_view);
                info.buffer_view = wrapper.unwrap(info.buffer_view);
                Block::MetalTexture(info)
            }
            vk::StructureType::EXPORT_METAL_IO_SURFACE_INFO_EXT => {
                let mut info: Box<vk::ExportMetalIOSurfaceInfoEXT<'static>> = Box::new(read(src));
                info.image = wrapper.unwrap(info.image);
                Block::MetalIOSurface(info)
            }
            vk::StructureType::EXPORT_METAL_SHARED_EVENT_INFO_EXT => {
                let mut info: Box<vk::ExportMetalSharedEventInfoEXT<'static>> =
                    Box::new(read(src));
                info.semaphore = wrapper.unwrap(info.semaphore);
                info.event = wrapper.unwrap(info.event);
                Block::MetalSharedEvent(info)
            }
            other => match plain_size(other) {
                Some(size) => {
                    let mut words = vec![0u64; size.div_ceil(8)];
                    ptr::copy_nonoverlapping(src.cast::<u8>(), words.as_mut_ptr().cast::<u8>(), size);
                    Block::Plain(words)
                }
                None => return Err(LayerError::UnknownStructure(other)),
            },
        }
    };
    Ok(block)
}

// ── LocalChain ──────────────────────────────────────────────

/// Deep copy of an application pNext chain with handles unwrapped.
///
/// Dropping the chain releases every copy. A block of unknown layout cannot
/// be copied, so it and everything after it are linked by reference and
/// passed through untouched.
pub struct LocalChain {
    blocks: Vec<Block>,
    head: *const c_void,
    tail: *const c_void,
}

// The chain owns its blocks; `tail` points into application memory that the
// calling command requires to stay valid until the layer is done with it.
unsafe impl Send for LocalChain {}
unsafe impl Sync for LocalChain {}

impl LocalChain {
    pub fn empty() -> Self {
        Self {
            blocks: Vec::new(),
            head: ptr::null(),
            tail: ptr::null(),
        }
    }

    /// Copy the chain starting at `head`.
    ///
    /// # Safety
    /// `head` must be null or a valid pNext chain.
    pub unsafe fn copy(wrapper: &HandleWrapper, head: *const c_void) -> Self {
        let mut blocks = Vec::new();
        let mut tail = ptr::null();
        let mut node = head as *const vk::BaseInStructure<'static>;
        while !node.is_null() {
            match unsafe { copy_block(wrapper, node) } {
                Ok(block) => blocks.push(block),
                Err(e) => {
                    error!("{}; forwarding the rest of the chain unchanged", e);
                    tail = node.cast();
                    break;
                }
            }
            node = unsafe { (*node).p_next };
        }

        let mut chain = Self {
            blocks,
            head: tail,
            tail,
        };
        chain.link();
        chain
    }

    fn link(&mut self) {
        let mut next = self.tail as *mut vk::BaseOutStructure<'static>;
        for block in self.blocks.iter_mut().rev() {
            let header = block.header();
            unsafe { (*header).p_next = next };
            next = header;
        }
        self.head = next as *const c_void;
    }

    /// First block of the copy, to be stored in the local structure's `p_next`.
    pub fn head(&self) -> *const c_void {
        self.head
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Dynamic rendering formats, when the chain carries them.
    pub fn rendering_info(&self) -> Option<&vk::PipelineRenderingCreateInfo<'static>> {
        self.blocks.iter().find_map(|block| match block {
            Block::Rendering(info) => Some(&**info),
            _ => None,
        })
    }

    /// Copy outputs back into the application chain this copy was made from.
    ///
    /// # Safety
    /// `caller_head` must be the chain passed to [`LocalChain::copy`], still
    /// valid and writable where the API makes it an output.
    pub unsafe fn copy_back(&self, caller_head: *const c_void) {
        let mut node = caller_head as *const vk::BaseInStructure<'static>;
        for block in &self.blocks {
            if node.is_null() {
                break;
            }
            unsafe {
                block.copy_back(node as *mut c_void);
                node = (*node).p_next;
            }
        }
    }
}

impl Default for LocalChain {
    fn default() -> Self {
        Self::empty()
    }
}
