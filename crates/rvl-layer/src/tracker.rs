use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ash::vk;

use crate::dispatch::DeviceDispatchObject;
use crate::renderpass::RenderPassUsage;
use crate::template::TemplateState;

/// Objects whose lifetime hangs off a parent, plus shadows the layer keeps to
/// rewrite later calls. All keys and members are application handles.
#[derive(Default)]
pub(crate) struct TrackedState {
    pub(crate) pool_descriptor_sets: HashMap<vk::DescriptorPool, HashSet<vk::DescriptorSet>>,
    /// Images in the order the driver reported them
    pub(crate) swapchain_images: HashMap<vk::SwapchainKHR, Vec<vk::Image>>,
    pub(crate) render_passes: HashMap<vk::RenderPass, RenderPassUsage>,
    pub(crate) templates: HashMap<vk::DescriptorUpdateTemplate, Arc<TemplateState>>,
}

/// Read-only views of the tracked state. Everything is copied out so no lock
/// outlives the call.
impl DeviceDispatchObject {
    pub fn descriptor_sets_of(&self, pool: vk::DescriptorPool) -> Vec<vk::DescriptorSet> {
        self.state
            .read()
            .pool_descriptor_sets
            .get(&pool)
            .map(|sets| sets.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_tracked_pool(&self, pool: vk::DescriptorPool) -> bool {
        self.state.read().pool_descriptor_sets.contains_key(&pool)
    }

    pub fn swapchain_images_of(&self, swapchain: vk::SwapchainKHR) -> Vec<vk::Image> {
        self.state
            .read()
            .swapchain_images
            .get(&swapchain)
            .cloned()
            .unwrap_or_default()
    }

    pub fn render_pass_usage(&self, render_pass: vk::RenderPass) -> Option<RenderPassUsage> {
        self.state.read().render_passes.get(&render_pass).cloned()
    }

    pub fn template_state(
        &self,
        template: vk::DescriptorUpdateTemplate,
    ) -> Option<Arc<TemplateState>> {
        self.state.read().templates.get(&template).cloned()
    }

    /// Pool a secondary command buffer was allocated from.
    pub fn secondary_pool_of(&self, command_buffer: vk::CommandBuffer) -> Option<vk::CommandPool> {
        self.secondary_command_buffers
            .read()
            .get(&command_buffer)
            .copied()
    }
}
