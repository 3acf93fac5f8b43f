use ash::vk;

use crate::dispatch::DeviceDispatchObject;
use crate::validation::Command;
use crate::wrap::read_array;

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkCreateCommandPool` validity rules.
    pub unsafe fn create_command_pool(
        &self,
        p_create_info: *const vk::CommandPoolCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_command_pool: *mut vk::CommandPool,
    ) -> vk::Result {
        self.create_object(Command::CreateCommandPool, p_command_pool, || unsafe {
            self.table
                .create_command_pool(self.device(), p_create_info, p_allocator, p_command_pool)
        })
    }

    /// Secondary command buffers allocated from the pool are forgotten with it.
    ///
    /// # Safety
    /// Pointers must follow `vkDestroyCommandPool` validity rules.
    pub unsafe fn destroy_command_pool(
        &self,
        command_pool: vk::CommandPool,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.secondary_command_buffers
            .write()
            .retain(|_, pool| *pool != command_pool);
        self.destroy_object(Command::DestroyCommandPool, command_pool, |real| unsafe {
            self.table.destroy_command_pool(self.device(), real, p_allocator)
        });
    }

    /// Command buffers are dispatchable and keep their handles; only the pool
    /// is unwrapped. Secondaries are remembered for `begin_command_buffer`.
    ///
    /// # Safety
    /// Pointers must follow `vkAllocateCommandBuffers` validity rules.
    pub unsafe fn allocate_command_buffers(
        &self,
        p_allocate_info: *const vk::CommandBufferAllocateInfo<'_>,
        p_command_buffers: *mut vk::CommandBuffer,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::AllocateCommandBuffers, || unsafe {
                let info = &*p_allocate_info;
                let mut local = *info;
                local.command_pool = self.wrapper.unwrap(info.command_pool);
                let result =
                    self.table
                        .allocate_command_buffers(self.device(), &local, p_command_buffers);
                if result == vk::Result::SUCCESS && info.level == vk::CommandBufferLevel::SECONDARY
                {
                    let buffers = read_array(p_command_buffers, info.command_buffer_count);
                    let mut secondaries = self.secondary_command_buffers.write();
                    for buffer in buffers {
                        secondaries.insert(buffer, info.command_pool);
                    }
                }
                result
            })
    }

    /// # Safety
    /// Pointers must follow `vkFreeCommandBuffers` validity rules.
    pub unsafe fn free_command_buffers(
        &self,
        command_pool: vk::CommandPool,
        command_buffer_count: u32,
        p_command_buffers: *const vk::CommandBuffer,
    ) {
        self.chain()
            .intercept_void(Command::FreeCommandBuffers, || unsafe {
                self.table.free_command_buffers(
                    self.device(),
                    self.wrapper.unwrap(command_pool),
                    command_buffer_count,
                    p_command_buffers,
                );
                let buffers = read_array(p_command_buffers, command_buffer_count);
                let mut secondaries = self.secondary_command_buffers.write();
                for buffer in buffers {
                    secondaries.remove(&buffer);
                }
            });
    }

    /// Inheritance info is only meaningful, and only rewritten, for
    /// secondary command buffers.
    ///
    /// # Safety
    /// Pointers must follow `vkBeginCommandBuffer` validity rules.
    pub unsafe fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        p_begin_info: *const vk::CommandBufferBeginInfo<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::BeginCommandBuffer, || unsafe {
                let secondary = self
                    .secondary_command_buffers
                    .read()
                    .contains_key(&command_buffer);
                let begin = &*p_begin_info;
                if !self.wrap_handles() || !secondary || begin.p_inheritance_info.is_null() {
                    return self.table.begin_command_buffer(command_buffer, p_begin_info);
                }
                let mut inheritance = *begin.p_inheritance_info;
                inheritance.render_pass = self.wrapper.unwrap(inheritance.render_pass);
                inheritance.framebuffer = self.wrapper.unwrap(inheritance.framebuffer);
                let mut local = *begin;
                local.p_inheritance_info = &inheritance;
                self.table.begin_command_buffer(command_buffer, &local)
            })
    }
}
