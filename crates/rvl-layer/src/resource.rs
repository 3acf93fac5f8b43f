use ash::vk;

use crate::chain::LocalChain;
use crate::dispatch::DeviceDispatchObject;
use crate::validation::Command;

/// Plain destroy entry points: pop the surrogate, destroy the real handle.
macro_rules! destroy_entry_points {
    ($($method:ident($handle:ident: $ty:ty) => $command:ident;)*) => {
        impl DeviceDispatchObject {
            $(
                #[doc = concat!("Destroys a `", stringify!($ty), "`.")]
                ///
                /// # Safety
                /// `p_allocator` must be null or valid allocation callbacks.
                pub unsafe fn $method(
                    &self,
                    $handle: $ty,
                    p_allocator: *const vk::AllocationCallbacks<'_>,
                ) {
                    self.destroy_object(Command::$command, $handle, |real| unsafe {
                        self.table.$method(self.device(), real, p_allocator)
                    });
                }
            )*
        }
    };
}

destroy_entry_points! {
    destroy_buffer(buffer: vk::Buffer) => DestroyBuffer;
    destroy_buffer_view(buffer_view: vk::BufferView) => DestroyBufferView;
    destroy_image(image: vk::Image) => DestroyImage;
    destroy_image_view(image_view: vk::ImageView) => DestroyImageView;
    destroy_sampler(sampler: vk::Sampler) => DestroySampler;
    destroy_shader_module(shader_module: vk::ShaderModule) => DestroyShaderModule;
    destroy_semaphore(semaphore: vk::Semaphore) => DestroySemaphore;
    destroy_fence(fence: vk::Fence) => DestroyFence;
    free_memory(memory: vk::DeviceMemory) => FreeMemory;
}

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkCreateBuffer` validity rules.
    pub unsafe fn create_buffer(
        &self,
        p_create_info: *const vk::BufferCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_buffer: *mut vk::Buffer,
    ) -> vk::Result {
        self.create_object(Command::CreateBuffer, p_buffer, || unsafe {
            self.table
                .create_buffer(self.device(), p_create_info, p_allocator, p_buffer)
        })
    }

    /// # Safety
    /// Pointers must follow `vkCreateBufferView` validity rules.
    pub unsafe fn create_buffer_view(
        &self,
        p_create_info: *const vk::BufferViewCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_view: *mut vk::BufferView,
    ) -> vk::Result {
        self.create_object(Command::CreateBufferView, p_view, || unsafe {
            let mut local = *p_create_info;
            local.buffer = self.wrapper.unwrap(local.buffer);
            self.table
                .create_buffer_view(self.device(), &local, p_allocator, p_view)
        })
    }

    /// Swapchain-backed images name their swapchain in the chain.
    ///
    /// # Safety
    /// Pointers must follow `vkCreateImage` validity rules.
    pub unsafe fn create_image(
        &self,
        p_create_info: *const vk::ImageCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_image: *mut vk::Image,
    ) -> vk::Result {
        self.create_object(Command::CreateImage, p_image, || unsafe {
            if !self.wrap_handles() {
                return self
                    .table
                    .create_image(self.device(), p_create_info, p_allocator, p_image);
            }
            let mut local = *p_create_info;
            let chain = LocalChain::copy(&self.wrapper, local.p_next);
            local.p_next = chain.head();
            self.table
                .create_image(self.device(), &local, p_allocator, p_image)
        })
    }

    /// # Safety
    /// Pointers must follow `vkCreateImageView` validity rules.
    pub unsafe fn create_image_view(
        &self,
        p_create_info: *const vk::ImageViewCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_view: *mut vk::ImageView,
    ) -> vk::Result {
        self.create_object(Command::CreateImageView, p_view, || unsafe {
            if !self.wrap_handles() {
                return self
                    .table
                    .create_image_view(self.device(), p_create_info, p_allocator, p_view);
            }
            let mut local = *p_create_info;
            let chain = LocalChain::copy(&self.wrapper, local.p_next);
            local.p_next = chain.head();
            local.image = self.wrapper.unwrap(local.image);
            self.table
                .create_image_view(self.device(), &local, p_allocator, p_view)
        })
    }

    /// # Safety
    /// Pointers must follow `vkCreateSampler` validity rules.
    pub unsafe fn create_sampler(
        &self,
        p_create_info: *const vk::SamplerCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_sampler: *mut vk::Sampler,
    ) -> vk::Result {
        self.create_object(Command::CreateSampler, p_sampler, || unsafe {
            if !self.wrap_handles() {
                return self
                    .table
                    .create_sampler(self.device(), p_create_info, p_allocator, p_sampler);
            }
            let mut local = *p_create_info;
            let chain = LocalChain::copy(&self.wrapper, local.p_next);
            local.p_next = chain.head();
            self.table
                .create_sampler(self.device(), &local, p_allocator, p_sampler)
        })
    }

    /// # Safety
    /// Pointers must follow `vkCreateShaderModule` validity rules.
    pub unsafe fn create_shader_module(
        &self,
        p_create_info: *const vk::ShaderModuleCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_shader_module: *mut vk::ShaderModule,
    ) -> vk::Result {
        self.create_object(Command::CreateShaderModule, p_shader_module, || unsafe {
            if !self.wrap_handles() {
                return self.table.create_shader_module(
                    self.device(),
                    p_create_info,
                    p_allocator,
                    p_shader_module,
                );
            }
            let mut local = *p_create_info;
            let chain = LocalChain::copy(&self.wrapper, local.p_next);
            local.p_next = chain.head();
            self.table
                .create_shader_module(self.device(), &local, p_allocator, p_shader_module)
        })
    }

    /// # Safety
    /// Pointers must follow `vkCreateSemaphore` validity rules.
    pub unsafe fn create_semaphore(
        &self,
        p_create_info: *const vk::SemaphoreCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_semaphore: *mut vk::Semaphore,
    ) -> vk::Result {
        self.create_object(Command::CreateSemaphore, p_semaphore, || unsafe {
            self.table
                .create_semaphore(self.device(), p_create_info, p_allocator, p_semaphore)
        })
    }

    /// # Safety
    /// Pointers must follow `vkCreateFence` validity rules.
    pub unsafe fn create_fence(
        &self,
        p_create_info: *const vk::FenceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_fence: *mut vk::Fence,
    ) -> vk::Result {
        self.create_object(Command::CreateFence, p_fence, || unsafe {
            self.table
                .create_fence(self.device(), p_create_info, p_allocator, p_fence)
        })
    }

    /// Dedicated allocations name their image or buffer in the chain; those
    /// are unwrapped in a local copy.
    ///
    /// # Safety
    /// Pointers must follow `vkAllocateMemory` validity rules.
    pub unsafe fn allocate_memory(
        &self,
        p_allocate_info: *const vk::MemoryAllocateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_memory: *mut vk::DeviceMemory,
    ) -> vk::Result {
        self.create_object(Command::AllocateMemory, p_memory, || unsafe {
            if !self.wrap_handles() {
                return self
                    .table
                    .allocate_memory(self.device(), p_allocate_info, p_allocator, p_memory);
            }
            let mut local = *p_allocate_info;
            let chain = LocalChain::copy(&self.wrapper, local.p_next);
            local.p_next = chain.head();
            self.table
                .allocate_memory(self.device(), &local, p_allocator, p_memory)
        })
    }

    /// # Safety
    /// Pointers must follow `vkAcquirePerformanceConfigurationINTEL`
    /// validity rules.
    pub unsafe fn acquire_performance_configuration_intel(
        &self,
        p_acquire_info: *const vk::PerformanceConfigurationAcquireInfoINTEL<'_>,
        p_configuration: *mut vk::PerformanceConfigurationINTEL,
    ) -> vk::Result {
        self.create_object(
            Command::AcquirePerformanceConfigurationINTEL,
            p_configuration,
            || unsafe {
                self.table.acquire_performance_configuration_intel(
                    self.device(),
                    p_acquire_info,
                    p_configuration,
                )
            },
        )
    }

    /// Releasing retires the surrogate only once the driver accepts it.
    ///
    /// # Safety
    /// Pointers must follow `vkReleasePerformanceConfigurationINTEL` validity
    /// rules.
    pub unsafe fn release_performance_configuration_intel(
        &self,
        configuration: vk::PerformanceConfigurationINTEL,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::ReleasePerformanceConfigurationINTEL, || unsafe {
            let result = self.table.release_performance_configuration_intel(
                self.device(),
                self.wrapper.unwrap(configuration),
            );
            if result == vk::Result::SUCCESS {
                self.wrapper.erase(configuration);
                chain.object_destroyed(configuration);
            }
            result
        })
    }
}
