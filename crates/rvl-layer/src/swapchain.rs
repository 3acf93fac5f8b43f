use ash::vk;

use crate::chain::LocalChain;
use crate::dispatch::DeviceDispatchObject;
use crate::validation::Command;
use crate::wrap::{local_ptr, read_array};

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkCreateSwapchainKHR` validity rules.
    pub unsafe fn create_swapchain_khr(
        &self,
        p_create_info: *const vk::SwapchainCreateInfoKHR<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_swapchain: *mut vk::SwapchainKHR,
    ) -> vk::Result {
        self.create_object(Command::CreateSwapchainKHR, p_swapchain, || unsafe {
            let mut local = *p_create_info;
            local.surface = self.wrapper.unwrap(local.surface);
            local.old_swapchain = self.wrapper.unwrap(local.old_swapchain);
            self.table
                .create_swapchain_khr(self.device(), &local, p_allocator, p_swapchain)
        })
    }

    /// Images belong to the swapchain: their surrogates go first.
    ///
    /// # Safety
    /// Pointers must follow `vkDestroySwapchainKHR` validity rules.
    pub unsafe fn destroy_swapchain_khr(
        &self,
        swapchain: vk::SwapchainKHR,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        let chain = self.chain();
        self.destroy_object(Command::DestroySwapchainKHR, swapchain, |real| unsafe {
            let images = self
                .state
                .write()
                .swapchain_images
                .remove(&swapchain)
                .unwrap_or_default();
            for &image in &images {
                self.wrapper.erase(image);
            }
            self.table.destroy_swapchain_khr(self.device(), real, p_allocator);
            for image in images {
                chain.object_destroyed(image);
            }
        });
    }

    /// Images are wrapped the first time they are reported and keep the same
    /// surrogate on every later query.
    ///
    /// # Safety
    /// Pointers must follow `vkGetSwapchainImagesKHR` validity rules.
    pub unsafe fn get_swapchain_images_khr(
        &self,
        swapchain: vk::SwapchainKHR,
        p_swapchain_image_count: *mut u32,
        p_swapchain_images: *mut vk::Image,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::GetSwapchainImagesKHR, || unsafe {
            let result = self.table.get_swapchain_images_khr(
                self.device(),
                self.wrapper.unwrap(swapchain),
                p_swapchain_image_count,
                p_swapchain_images,
            );
            let reported = matches!(result, vk::Result::SUCCESS | vk::Result::INCOMPLETE);
            if !self.wrap_handles() || !reported || p_swapchain_images.is_null() {
                return result;
            }

            let count = *p_swapchain_image_count as usize;
            let mut created = Vec::new();
            {
                let mut state = self.state.write();
                let images = state.swapchain_images.entry(swapchain).or_default();
                for index in images.len()..count {
                    let image = self.wrapper.wrap_new(*p_swapchain_images.add(index));
                    images.push(image);
                    created.push(image);
                }
                for (index, &image) in images.iter().take(count).enumerate() {
                    *p_swapchain_images.add(index) = image;
                }
            }
            for image in created {
                chain.object_created(image);
            }
            result
        })
    }

    /// # Safety
    /// Pointers must follow `vkAcquireNextImageKHR` validity rules.
    pub unsafe fn acquire_next_image_khr(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
        p_image_index: *mut u32,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::AcquireNextImageKHR, || unsafe {
                self.table.acquire_next_image_khr(
                    self.device(),
                    self.wrapper.unwrap(swapchain),
                    timeout,
                    self.wrapper.unwrap(semaphore),
                    self.wrapper.unwrap(fence),
                    p_image_index,
                )
            })
    }

    /// Per-swapchain results are collected in a local array and copied back
    /// to `pResults` after the call.
    ///
    /// # Safety
    /// Pointers must follow `vkQueuePresentKHR` validity rules.
    pub unsafe fn queue_present_khr(
        &self,
        queue: vk::Queue,
        p_present_info: *const vk::PresentInfoKHR<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::QueuePresentKHR, || unsafe {
                if !self.wrap_handles() {
                    return self.table.queue_present_khr(queue, p_present_info);
                }
                let info = &*p_present_info;
                let mut local = *info;
                let chain = LocalChain::copy(&self.wrapper, info.p_next);
                local.p_next = chain.head();

                let semaphores = self
                    .wrapper
                    .unwrap_array(info.p_wait_semaphores, info.wait_semaphore_count);
                local.p_wait_semaphores = local_ptr(&semaphores, info.p_wait_semaphores);
                let swapchains = self
                    .wrapper
                    .unwrap_array(info.p_swapchains, info.swapchain_count);
                local.p_swapchains = local_ptr(&swapchains, info.p_swapchains);
                let mut results = read_array(info.p_results, info.swapchain_count);
                if !info.p_results.is_null() {
                    local.p_results = results.as_mut_ptr();
                }

                let result = self.table.queue_present_khr(queue, &local);
                if !info.p_results.is_null() {
                    for (index, &swapchain_result) in results.iter().enumerate() {
                        *info.p_results.add(index) = swapchain_result;
                    }
                }
                result
            })
    }
}
