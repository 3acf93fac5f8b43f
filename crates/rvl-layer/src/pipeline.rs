use std::ptr;

use ash::vk;

use crate::chain::LocalChain;
use crate::deferred::{CompletionAction, PipelineOutput, PostCheckAction, RetainedInputs};
use crate::dispatch::DeviceDispatchObject;
use crate::renderpass::attachment_usage;
use crate::validation::{Command, ValidationChain};
use crate::wrap::{local_ptr, read_array, HandleWrapper};

/// Local copies behind a ray tracing pipeline creation. Kept alive until the
/// call, or its deferred operation, is done with them.
struct RayTracingCopies {
    infos: Vec<vk::RayTracingPipelineCreateInfoKHR<'static>>,
    _stages: Vec<Vec<vk::PipelineShaderStageCreateInfo<'static>>>,
    _library_infos: Vec<Box<vk::PipelineLibraryCreateInfoKHR<'static>>>,
    _libraries: Vec<Vec<vk::Pipeline>>,
    chains: Vec<LocalChain>,
    caller_infos: *const vk::RayTracingPipelineCreateInfoKHR<'static>,
}

// Everything but `caller_infos` is owned; the caller's create infos must stay
// valid until the operation completes.
unsafe impl Send for RayTracingCopies {}
unsafe impl Sync for RayTracingCopies {}

impl RayTracingCopies {
    unsafe fn new(
        wrapper: &HandleWrapper,
        p_create_infos: *const vk::RayTracingPipelineCreateInfoKHR<'_>,
        count: u32,
    ) -> Self {
        let caller_infos = p_create_infos.cast::<vk::RayTracingPipelineCreateInfoKHR<'static>>();
        let mut infos = unsafe { read_array(caller_infos, count) };
        let mut stages = Vec::with_capacity(infos.len());
        let mut library_infos = Vec::new();
        let mut libraries = Vec::new();
        let mut chains = Vec::with_capacity(infos.len());

        for info in &mut infos {
            let chain = unsafe { LocalChain::copy(wrapper, info.p_next) };
            info.p_next = chain.head();
            chains.push(chain);

            let mut local_stages = unsafe { read_array(info.p_stages, info.stage_count) };
            for stage in &mut local_stages {
                stage.module = wrapper.unwrap(stage.module);
            }
            info.p_stages = local_ptr(&local_stages, info.p_stages);
            stages.push(local_stages);

            if let Some(library_info) = unsafe { info.p_library_info.as_ref() } {
                let mut library_info = Box::new(*library_info);
                let local_libraries = unsafe {
                    wrapper.unwrap_array(library_info.p_libraries, library_info.library_count)
                };
                library_info.p_libraries = local_ptr(&local_libraries, library_info.p_libraries);
                info.p_library_info = &*library_info;
                library_infos.push(library_info);
                libraries.push(local_libraries);
            }

            info.layout = wrapper.unwrap(info.layout);
            info.base_pipeline_handle = wrapper.unwrap(info.base_pipeline_handle);
        }

        Self {
            infos,
            _stages: stages,
            _library_infos: library_infos,
            _libraries: libraries,
            chains,
            caller_infos,
        }
    }

    fn infos_ptr(&self) -> *const vk::RayTracingPipelineCreateInfoKHR<'static> {
        local_ptr(&self.infos, self.caller_infos)
    }

    unsafe fn copy_back(&self) {
        for (index, chain) in self.chains.iter().enumerate() {
            unsafe { chain.copy_back((*self.caller_infos.add(index)).p_next) };
        }
    }
}

impl RetainedInputs for RayTracingCopies {
    fn on_complete(&mut self) {
        unsafe { self.copy_back() };
    }
}

impl DeviceDispatchObject {
    /// Wrap every non-null pipeline the next layer wrote.
    unsafe fn wrap_pipelines(
        &self,
        chain: &ValidationChain,
        p_pipelines: *mut vk::Pipeline,
        count: u32,
    ) {
        if p_pipelines.is_null() {
            return;
        }
        for index in 0..count as usize {
            unsafe {
                let slot = p_pipelines.add(index);
                if *slot != vk::Pipeline::null() {
                    *slot = self.wrapper.wrap_new(*slot);
                    chain.object_created(*slot);
                }
            }
        }
    }

    /// # Safety
    /// Pointers must follow `vkCreatePipelineCache` validity rules.
    pub unsafe fn create_pipeline_cache(
        &self,
        p_create_info: *const vk::PipelineCacheCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipeline_cache: *mut vk::PipelineCache,
    ) -> vk::Result {
        self.create_object(Command::CreatePipelineCache, p_pipeline_cache, || unsafe {
            self.table.create_pipeline_cache(
                self.device(),
                p_create_info,
                p_allocator,
                p_pipeline_cache,
            )
        })
    }

    /// # Safety
    /// Pointers must follow `vkDestroyPipelineCache` validity rules.
    pub unsafe fn destroy_pipeline_cache(
        &self,
        pipeline_cache: vk::PipelineCache,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.destroy_object(Command::DestroyPipelineCache, pipeline_cache, |real| unsafe {
            self.table
                .destroy_pipeline_cache(self.device(), real, p_allocator)
        });
    }

    /// # Safety
    /// Pointers must follow `vkCreatePipelineLayout` validity rules.
    pub unsafe fn create_pipeline_layout(
        &self,
        p_create_info: *const vk::PipelineLayoutCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipeline_layout: *mut vk::PipelineLayout,
    ) -> vk::Result {
        self.create_object(Command::CreatePipelineLayout, p_pipeline_layout, || unsafe {
            let mut local = *p_create_info;
            let layouts = self
                .wrapper
                .unwrap_array(local.p_set_layouts, local.set_layout_count);
            local.p_set_layouts = local_ptr(&layouts, local.p_set_layouts);
            self.table
                .create_pipeline_layout(self.device(), &local, p_allocator, p_pipeline_layout)
        })
    }

    /// # Safety
    /// Pointers must follow `vkDestroyPipelineLayout` validity rules.
    pub unsafe fn destroy_pipeline_layout(
        &self,
        pipeline_layout: vk::PipelineLayout,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.destroy_object(Command::DestroyPipelineLayout, pipeline_layout, |real| unsafe {
            self.table
                .destroy_pipeline_layout(self.device(), real, p_allocator)
        });
    }

    /// Each create info is copied on its own. Color blend and depth/stencil
    /// state are dropped from the copy when the subpass (or the dynamic
    /// rendering formats) has no such attachment, since the application may
    /// leave those pointers dangling.
    ///
    /// # Safety
    /// Pointers must follow `vkCreateGraphicsPipelines` validity rules.
    pub unsafe fn create_graphics_pipelines(
        &self,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::GraphicsPipelineCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::CreateGraphicsPipelines, || unsafe {
            if !self.wrap_handles() {
                return self.table.create_graphics_pipelines(
                    self.device(),
                    pipeline_cache,
                    create_info_count,
                    p_create_infos,
                    p_allocator,
                    p_pipelines,
                );
            }

            let mut infos = read_array(p_create_infos, create_info_count);
            let mut chains = Vec::with_capacity(infos.len());
            let mut stages = Vec::with_capacity(infos.len());
            for info in &mut infos {
                let local_chain = LocalChain::copy(&self.wrapper, info.p_next);
                info.p_next = local_chain.head();

                let usage = self.state.read().render_passes.get(&info.render_pass).cloned();
                let (uses_color, uses_depth_stencil) =
                    attachment_usage(usage.as_ref(), info.subpass, local_chain.rendering_info());
                if !uses_color {
                    info.p_color_blend_state = ptr::null();
                }
                if !uses_depth_stencil {
                    info.p_depth_stencil_state = ptr::null();
                }

                let mut local_stages = read_array(info.p_stages, info.stage_count);
                for stage in &mut local_stages {
                    stage.module = self.wrapper.unwrap(stage.module);
                }
                info.p_stages = local_ptr(&local_stages, info.p_stages);
                info.layout = self.wrapper.unwrap(info.layout);
                info.render_pass = self.wrapper.unwrap(info.render_pass);
                info.base_pipeline_handle = self.wrapper.unwrap(info.base_pipeline_handle);

                chains.push(local_chain);
                stages.push(local_stages);
            }

            let result = self.table.create_graphics_pipelines(
                self.device(),
                self.wrapper.unwrap(pipeline_cache),
                create_info_count,
                local_ptr(&infos, p_create_infos),
                p_allocator,
                p_pipelines,
            );
            for (index, local_chain) in chains.iter().enumerate() {
                local_chain.copy_back((*p_create_infos.add(index)).p_next);
            }
            self.wrap_pipelines(&chain, p_pipelines, create_info_count);
            result
        })
    }

    /// # Safety
    /// Pointers must follow `vkCreateComputePipelines` validity rules.
    pub unsafe fn create_compute_pipelines(
        &self,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::ComputePipelineCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::CreateComputePipelines, || unsafe {
            if !self.wrap_handles() {
                return self.table.create_compute_pipelines(
                    self.device(),
                    pipeline_cache,
                    create_info_count,
                    p_create_infos,
                    p_allocator,
                    p_pipelines,
                );
            }

            let mut infos = read_array(p_create_infos, create_info_count);
            let mut chains = Vec::with_capacity(infos.len());
            for info in &mut infos {
                let local_chain = LocalChain::copy(&self.wrapper, info.p_next);
                info.p_next = local_chain.head();
                info.stage.module = self.wrapper.unwrap(info.stage.module);
                info.layout = self.wrapper.unwrap(info.layout);
                info.base_pipeline_handle = self.wrapper.unwrap(info.base_pipeline_handle);
                chains.push(local_chain);
            }

            let result = self.table.create_compute_pipelines(
                self.device(),
                self.wrapper.unwrap(pipeline_cache),
                create_info_count,
                local_ptr(&infos, p_create_infos),
                p_allocator,
                p_pipelines,
            );
            for (index, local_chain) in chains.iter().enumerate() {
                local_chain.copy_back((*p_create_infos.add(index)).p_next);
            }
            self.wrap_pipelines(&chain, p_pipelines, create_info_count);
            result
        })
    }

    /// When the next layer defers the work, the local copies and the
    /// driver's output array are handed to the deferred operation; pipelines
    /// are wrapped and written to `p_pipelines` once it completes.
    ///
    /// # Safety
    /// Pointers must follow `vkCreateRayTracingPipelinesKHR` validity rules,
    /// including staying valid until a deferred operation completes.
    pub unsafe fn create_ray_tracing_pipelines_khr(
        &self,
        deferred_operation: vk::DeferredOperationKHR,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::RayTracingPipelineCreateInfoKHR<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::CreateRayTracingPipelinesKHR, || unsafe {
            if !self.wrap_handles() {
                return self.table.create_ray_tracing_pipelines_khr(
                    self.device(),
                    deferred_operation,
                    pipeline_cache,
                    create_info_count,
                    p_create_infos,
                    p_allocator,
                    p_pipelines,
                );
            }

            let copies = RayTracingCopies::new(&self.wrapper, p_create_infos, create_info_count);
            let mut produced =
                vec![vk::Pipeline::null(); create_info_count as usize].into_boxed_slice();
            let result = self.table.create_ray_tracing_pipelines_khr(
                self.device(),
                self.wrapper.unwrap(deferred_operation),
                self.wrapper.unwrap(pipeline_cache),
                create_info_count,
                copies.infos_ptr(),
                p_allocator,
                produced.as_mut_ptr(),
            );

            if result == vk::Result::OPERATION_DEFERRED_KHR
                && deferred_operation != vk::DeferredOperationKHR::null()
            {
                let destination = PipelineOutput::new(p_pipelines, create_info_count as usize);
                self.deferred.add_completion(
                    deferred_operation,
                    CompletionAction::PublishPipelines {
                        produced,
                        destination,
                    },
                );
                self.deferred.add_completion(
                    deferred_operation,
                    CompletionAction::Release(Box::new(copies)),
                );
                for object in chain.intercepting(Command::CreateRayTracingPipelinesKHR) {
                    self.deferred.add_post_check(
                        deferred_operation,
                        PostCheckAction::NotifyPipelines(object.container_type()),
                    );
                }
                return result;
            }

            copies.copy_back();
            if !p_pipelines.is_null() {
                ptr::copy_nonoverlapping(produced.as_ptr(), p_pipelines, produced.len());
            }
            self.wrap_pipelines(&chain, p_pipelines, create_info_count);
            result
        })
    }

    /// # Safety
    /// Pointers must follow `vkDestroyPipeline` validity rules.
    pub unsafe fn destroy_pipeline(
        &self,
        pipeline: vk::Pipeline,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.destroy_object(Command::DestroyPipeline, pipeline, |real| unsafe {
            self.table.destroy_pipeline(self.device(), real, p_allocator)
        });
    }
}
