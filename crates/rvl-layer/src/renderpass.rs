use std::collections::HashSet;

use ash::vk;

use crate::chain::LocalChain;
use crate::dispatch::DeviceDispatchObject;
use crate::validation::Command;
use crate::wrap::read_array;

/// Which subpasses of a render pass write color or depth/stencil.
///
/// Graphics pipeline creation uses this to tell whether the color blend and
/// depth/stencil state pointers are meaningful; the API lets them be garbage
/// for subpasses without the matching attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPassUsage {
    color: HashSet<u32>,
    depth_stencil: HashSet<u32>,
}

impl RenderPassUsage {
    /// # Safety
    /// `info` must be a valid create info.
    pub unsafe fn from_create_info(info: &vk::RenderPassCreateInfo<'_>) -> Self {
        let mut usage = Self::default();
        let subpasses = unsafe { read_array(info.p_subpasses, info.subpass_count) };
        for (index, subpass) in subpasses.iter().enumerate() {
            let colors =
                unsafe { read_array(subpass.p_color_attachments, subpass.color_attachment_count) };
            let depth = unsafe { subpass.p_depth_stencil_attachment.as_ref() };
            usage.record(
                index as u32,
                colors.iter().any(|a| a.attachment != vk::ATTACHMENT_UNUSED),
                depth.is_some_and(|a| a.attachment != vk::ATTACHMENT_UNUSED),
            );
        }
        usage
    }

    /// # Safety
    /// `info` must be a valid create info.
    pub unsafe fn from_create_info2(info: &vk::RenderPassCreateInfo2<'_>) -> Self {
        let mut usage = Self::default();
        let subpasses = unsafe { read_array(info.p_subpasses, info.subpass_count) };
        for (index, subpass) in subpasses.iter().enumerate() {
            let colors =
                unsafe { read_array(subpass.p_color_attachments, subpass.color_attachment_count) };
            let depth = unsafe { subpass.p_depth_stencil_attachment.as_ref() };
            usage.record(
                index as u32,
                colors.iter().any(|a| a.attachment != vk::ATTACHMENT_UNUSED),
                depth.is_some_and(|a| a.attachment != vk::ATTACHMENT_UNUSED),
            );
        }
        usage
    }

    fn record(&mut self, subpass: u32, color: bool, depth_stencil: bool) {
        if color {
            self.color.insert(subpass);
        }
        if depth_stencil {
            self.depth_stencil.insert(subpass);
        }
    }

    pub fn uses_color(&self, subpass: u32) -> bool {
        self.color.contains(&subpass)
    }

    pub fn uses_depth_stencil(&self, subpass: u32) -> bool {
        self.depth_stencil.contains(&subpass)
    }
}

/// Attachment usage of one pipeline: dynamic rendering formats win over the
/// render pass record. Returns (color, depth/stencil).
pub(crate) fn attachment_usage(
    render_pass: Option<&RenderPassUsage>,
    subpass: u32,
    rendering: Option<&vk::PipelineRenderingCreateInfo<'_>>,
) -> (bool, bool) {
    if let Some(rendering) = rendering {
        return (
            rendering.color_attachment_count > 0,
            rendering.depth_attachment_format != vk::Format::UNDEFINED
                || rendering.stencil_attachment_format != vk::Format::UNDEFINED,
        );
    }
    match render_pass {
        Some(usage) => (usage.uses_color(subpass), usage.uses_depth_stencil(subpass)),
        None => (false, false),
    }
}

// ── Entry points ────────────────────────────────────────────

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkCreateRenderPass` validity rules.
    pub unsafe fn create_render_pass(
        &self,
        p_create_info: *const vk::RenderPassCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_render_pass: *mut vk::RenderPass,
    ) -> vk::Result {
        let result = self.create_object(Command::CreateRenderPass, p_render_pass, || unsafe {
            self.table
                .create_render_pass(self.device(), p_create_info, p_allocator, p_render_pass)
        });
        if result == vk::Result::SUCCESS && self.wrap_handles() {
            let usage = unsafe { RenderPassUsage::from_create_info(&*p_create_info) };
            self.state
                .write()
                .render_passes
                .insert(unsafe { *p_render_pass }, usage);
        }
        result
    }

    /// # Safety
    /// Pointers must follow `vkCreateRenderPass2` validity rules.
    pub unsafe fn create_render_pass2(
        &self,
        p_create_info: *const vk::RenderPassCreateInfo2<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_render_pass: *mut vk::RenderPass,
    ) -> vk::Result {
        let result = self.create_object(Command::CreateRenderPass2, p_render_pass, || unsafe {
            self.table
                .create_render_pass2(self.device(), p_create_info, p_allocator, p_render_pass)
        });
        if result == vk::Result::SUCCESS && self.wrap_handles() {
            let usage = unsafe { RenderPassUsage::from_create_info2(&*p_create_info) };
            self.state
                .write()
                .render_passes
                .insert(unsafe { *p_render_pass }, usage);
        }
        result
    }

    /// # Safety
    /// Pointers must follow `vkDestroyRenderPass` validity rules.
    pub unsafe fn destroy_render_pass(
        &self,
        render_pass: vk::RenderPass,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.state.write().render_passes.remove(&render_pass);
        self.destroy_object(Command::DestroyRenderPass, render_pass, |real| unsafe {
            self.table.destroy_render_pass(self.device(), real, p_allocator)
        });
    }

    /// # Safety
    /// Pointers must follow `vkCreateFramebuffer` validity rules.
    pub unsafe fn create_framebuffer(
        &self,
        p_create_info: *const vk::FramebufferCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_framebuffer: *mut vk::Framebuffer,
    ) -> vk::Result {
        self.create_object(Command::CreateFramebuffer, p_framebuffer, || unsafe {
            if !self.wrap_handles() {
                return self.table.create_framebuffer(
                    self.device(),
                    p_create_info,
                    p_allocator,
                    p_framebuffer,
                );
            }
            let mut local = *p_create_info;
            local.render_pass = self.wrapper.unwrap(local.render_pass);
            let imageless = local
                .flags
                .contains(vk::FramebufferCreateFlags::IMAGELESS);
            let attachments = if imageless {
                Vec::new()
            } else {
                self.wrapper
                    .unwrap_array(local.p_attachments, local.attachment_count)
            };
            if !imageless && !local.p_attachments.is_null() {
                local.p_attachments = attachments.as_ptr();
            }
            self.table
                .create_framebuffer(self.device(), &local, p_allocator, p_framebuffer)
        })
    }

    /// # Safety
    /// Pointers must follow `vkDestroyFramebuffer` validity rules.
    pub unsafe fn destroy_framebuffer(
        &self,
        framebuffer: vk::Framebuffer,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.destroy_object(Command::DestroyFramebuffer, framebuffer, |real| unsafe {
            self.table.destroy_framebuffer(self.device(), real, p_allocator)
        });
    }

    /// # Safety
    /// Pointers must follow `vkCmdBeginRenderPass` validity rules.
    pub unsafe fn cmd_begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        p_render_pass_begin: *const vk::RenderPassBeginInfo<'_>,
        contents: vk::SubpassContents,
    ) {
        self.chain().intercept_void(Command::CmdBeginRenderPass, || unsafe {
            if !self.wrap_handles() {
                return self
                    .table
                    .cmd_begin_render_pass(command_buffer, p_render_pass_begin, contents);
            }
            let mut local = *p_render_pass_begin;
            let chain = LocalChain::copy(&self.wrapper, local.p_next);
            local.p_next = chain.head();
            local.render_pass = self.wrapper.unwrap(local.render_pass);
            local.framebuffer = self.wrapper.unwrap(local.framebuffer);
            self.table
                .cmd_begin_render_pass(command_buffer, &local, contents)
        });
    }
}
