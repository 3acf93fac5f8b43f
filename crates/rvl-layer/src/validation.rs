//! The validation object chain driven around every intercepted call.

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use parking_lot::{Mutex, RwLock};
use rvl_core::{LayerFeature, LayerSettings};
use tracing::{debug, info};

/// Kind of a validation object. At most one object of each kind lives in a
/// chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerObjectTypeId {
    Instance,
    Threading,
    ParameterValidation,
    ObjectTracker,
    CoreValidation,
    BestPractices,
    GpuAssisted,
    DebugPrintf,
    SyncValidation,
}

impl LayerObjectTypeId {
    /// Setting that switches this kind on or off. `None` for kinds that are
    /// always present.
    pub fn feature(&self) -> Option<LayerFeature> {
        match self {
            LayerObjectTypeId::Instance => None,
            LayerObjectTypeId::Threading => Some(LayerFeature::ThreadSafety),
            LayerObjectTypeId::ParameterValidation => Some(LayerFeature::StatelessChecks),
            LayerObjectTypeId::ObjectTracker => Some(LayerFeature::ObjectLifetimes),
            LayerObjectTypeId::CoreValidation => Some(LayerFeature::CoreChecks),
            LayerObjectTypeId::BestPractices => Some(LayerFeature::BestPractices),
            LayerObjectTypeId::GpuAssisted => Some(LayerFeature::GpuAssisted),
            LayerObjectTypeId::DebugPrintf => Some(LayerFeature::DebugPrintf),
            LayerObjectTypeId::SyncValidation => Some(LayerFeature::SyncValidation),
        }
    }
}

macro_rules! commands {
    ($($variant:ident => $name:literal,)*) => {
        /// Intercepted entry points, as seen by validation objects.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Command {
            $($variant,)*
        }

        impl Command {
            pub const ALL: &'static [Command] = &[$(Command::$variant,)*];

            /// Vulkan entry point name.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Command::$variant => $name,)*
                }
            }
        }
    };
}

commands! {
    DestroyInstance => "vkDestroyInstance",
    GetPhysicalDeviceProperties => "vkGetPhysicalDeviceProperties",
    DestroySurfaceKHR => "vkDestroySurfaceKHR",
    GetPhysicalDeviceDisplayPropertiesKHR => "vkGetPhysicalDeviceDisplayPropertiesKHR",
    GetPhysicalDeviceDisplayPlanePropertiesKHR => "vkGetPhysicalDeviceDisplayPlanePropertiesKHR",
    GetDisplayPlaneSupportedDisplaysKHR => "vkGetDisplayPlaneSupportedDisplaysKHR",
    GetDisplayModePropertiesKHR => "vkGetDisplayModePropertiesKHR",
    GetPhysicalDeviceDisplayProperties2KHR => "vkGetPhysicalDeviceDisplayProperties2KHR",
    GetPhysicalDeviceDisplayPlaneProperties2KHR => "vkGetPhysicalDeviceDisplayPlaneProperties2KHR",
    GetDisplayModeProperties2KHR => "vkGetDisplayModeProperties2KHR",
    GetPhysicalDeviceToolProperties => "vkGetPhysicalDeviceToolProperties",
    GetPhysicalDeviceToolPropertiesEXT => "vkGetPhysicalDeviceToolPropertiesEXT",
    DestroyDevice => "vkDestroyDevice",
    CreateBuffer => "vkCreateBuffer",
    DestroyBuffer => "vkDestroyBuffer",
    CreateBufferView => "vkCreateBufferView",
    DestroyBufferView => "vkDestroyBufferView",
    CreateImage => "vkCreateImage",
    DestroyImage => "vkDestroyImage",
    CreateImageView => "vkCreateImageView",
    DestroyImageView => "vkDestroyImageView",
    CreateSampler => "vkCreateSampler",
    DestroySampler => "vkDestroySampler",
    CreateShaderModule => "vkCreateShaderModule",
    DestroyShaderModule => "vkDestroyShaderModule",
    CreateSemaphore => "vkCreateSemaphore",
    DestroySemaphore => "vkDestroySemaphore",
    CreateFence => "vkCreateFence",
    DestroyFence => "vkDestroyFence",
    AllocateMemory => "vkAllocateMemory",
    FreeMemory => "vkFreeMemory",
    CreateDescriptorSetLayout => "vkCreateDescriptorSetLayout",
    DestroyDescriptorSetLayout => "vkDestroyDescriptorSetLayout",
    CreateDescriptorPool => "vkCreateDescriptorPool",
    DestroyDescriptorPool => "vkDestroyDescriptorPool",
    ResetDescriptorPool => "vkResetDescriptorPool",
    AllocateDescriptorSets => "vkAllocateDescriptorSets",
    FreeDescriptorSets => "vkFreeDescriptorSets",
    UpdateDescriptorSets => "vkUpdateDescriptorSets",
    CreateDescriptorUpdateTemplate => "vkCreateDescriptorUpdateTemplate",
    DestroyDescriptorUpdateTemplate => "vkDestroyDescriptorUpdateTemplate",
    UpdateDescriptorSetWithTemplate => "vkUpdateDescriptorSetWithTemplate",
    CmdPushDescriptorSetWithTemplateKHR => "vkCmdPushDescriptorSetWithTemplateKHR",
    CmdPushDescriptorSetWithTemplate2KHR => "vkCmdPushDescriptorSetWithTemplate2KHR",
    GetDescriptorEXT => "vkGetDescriptorEXT",
    CreateRenderPass => "vkCreateRenderPass",
    CreateRenderPass2 => "vkCreateRenderPass2",
    DestroyRenderPass => "vkDestroyRenderPass",
    CreateFramebuffer => "vkCreateFramebuffer",
    DestroyFramebuffer => "vkDestroyFramebuffer",
    CmdBeginRenderPass => "vkCmdBeginRenderPass",
    CreatePipelineCache => "vkCreatePipelineCache",
    DestroyPipelineCache => "vkDestroyPipelineCache",
    CreatePipelineLayout => "vkCreatePipelineLayout",
    DestroyPipelineLayout => "vkDestroyPipelineLayout",
    CreateGraphicsPipelines => "vkCreateGraphicsPipelines",
    CreateComputePipelines => "vkCreateComputePipelines",
    CreateRayTracingPipelinesKHR => "vkCreateRayTracingPipelinesKHR",
    DestroyPipeline => "vkDestroyPipeline",
    CreateCommandPool => "vkCreateCommandPool",
    DestroyCommandPool => "vkDestroyCommandPool",
    AllocateCommandBuffers => "vkAllocateCommandBuffers",
    FreeCommandBuffers => "vkFreeCommandBuffers",
    BeginCommandBuffer => "vkBeginCommandBuffer",
    CreateSwapchainKHR => "vkCreateSwapchainKHR",
    DestroySwapchainKHR => "vkDestroySwapchainKHR",
    GetSwapchainImagesKHR => "vkGetSwapchainImagesKHR",
    AcquireNextImageKHR => "vkAcquireNextImageKHR",
    QueuePresentKHR => "vkQueuePresentKHR",
    CreateDeferredOperationKHR => "vkCreateDeferredOperationKHR",
    DestroyDeferredOperationKHR => "vkDestroyDeferredOperationKHR",
    DeferredOperationJoinKHR => "vkDeferredOperationJoinKHR",
    GetDeferredOperationResultKHR => "vkGetDeferredOperationResultKHR",
    CreateAccelerationStructureKHR => "vkCreateAccelerationStructureKHR",
    DestroyAccelerationStructureKHR => "vkDestroyAccelerationStructureKHR",
    BuildAccelerationStructuresKHR => "vkBuildAccelerationStructuresKHR",
    CmdBuildAccelerationStructuresKHR => "vkCmdBuildAccelerationStructuresKHR",
    GetAccelerationStructureBuildSizesKHR => "vkGetAccelerationStructureBuildSizesKHR",
    SetDebugUtilsObjectNameEXT => "vkSetDebugUtilsObjectNameEXT",
    SetDebugUtilsObjectTagEXT => "vkSetDebugUtilsObjectTagEXT",
    DebugMarkerSetObjectNameEXT => "vkDebugMarkerSetObjectNameEXT",
    DebugMarkerSetObjectTagEXT => "vkDebugMarkerSetObjectTagEXT",
    AcquirePerformanceConfigurationINTEL => "vkAcquirePerformanceConfigurationINTEL",
    ReleasePerformanceConfigurationINTEL => "vkReleasePerformanceConfigurationINTEL",
    ExportMetalObjectsEXT => "vkExportMetalObjectsEXT",
}

/// A pluggable validation object. Every hook has an empty default so
/// implementations only override what they check.
///
/// Hooks run without any layer lock held and may be called from many threads
/// at once.
pub trait ValidationObject: Send + Sync {
    fn container_type(&self) -> LayerObjectTypeId;

    /// Whether this object hooks `command`. Objects that return false are
    /// left out of that command's intercept list.
    fn intercepts(&self, _command: Command) -> bool {
        true
    }

    /// Return true to skip the call.
    fn pre_call_validate(&self, _command: Command) -> bool {
        false
    }

    fn pre_call_record(&self, _command: Command) {}

    fn post_call_record(&self, _command: Command, _result: vk::Result) {}

    /// A new application-visible handle exists.
    fn object_created(&self, _object_type: vk::ObjectType, _handle: u64) {}

    /// An application-visible handle is gone.
    fn object_destroyed(&self, _object_type: vk::ObjectType, _handle: u64) {}

    /// Pipelines of a deferred creation became available.
    fn deferred_pipelines_ready(
        &self,
        _operation: vk::DeferredOperationKHR,
        _pipelines: &[vk::Pipeline],
    ) {
    }
}

/// Immutable snapshot of the validation objects and their intercept lists.
pub struct ValidationChain {
    objects: Vec<Arc<dyn ValidationObject>>,
    intercepts: HashMap<Command, Vec<Arc<dyn ValidationObject>>>,
}

impl ValidationChain {
    pub fn new(objects: Vec<Arc<dyn ValidationObject>>) -> Self {
        let mut intercepts: HashMap<Command, Vec<Arc<dyn ValidationObject>>> = HashMap::new();
        for &command in Command::ALL {
            let hooked: Vec<_> = objects
                .iter()
                .filter(|object| object.intercepts(command))
                .cloned()
                .collect();
            if !hooked.is_empty() {
                intercepts.insert(command, hooked);
            }
        }
        Self { objects, intercepts }
    }

    pub fn objects(&self) -> &[Arc<dyn ValidationObject>] {
        &self.objects
    }

    pub fn get(&self, object_type: LayerObjectTypeId) -> Option<Arc<dyn ValidationObject>> {
        self.objects
            .iter()
            .find(|object| object.container_type() == object_type)
            .cloned()
    }

    /// Objects hooking `command`, in chain order.
    pub fn intercepting(&self, command: Command) -> &[Arc<dyn ValidationObject>] {
        self.intercepts
            .get(&command)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Chain without the objects matching `remove`, plus the removed objects.
    fn without(
        &self,
        remove: impl Fn(&Arc<dyn ValidationObject>) -> bool,
    ) -> (Self, Vec<Arc<dyn ValidationObject>>) {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.objects.iter().cloned().partition(|object| remove(object));
        (Self::new(kept), removed)
    }

    /// Run every `pre_call_validate`; true when any of them asks to skip.
    pub fn pre_call_validate(&self, command: Command) -> bool {
        self.intercepting(command)
            .iter()
            .fold(false, |skip, object| object.pre_call_validate(command) | skip)
    }

    pub fn pre_call_record(&self, command: Command) {
        for object in self.intercepting(command) {
            object.pre_call_record(command);
        }
    }

    pub fn post_call_record(&self, command: Command, result: vk::Result) {
        for object in self.intercepting(command) {
            object.post_call_record(command, result);
        }
    }

    /// Validate, record, forward, record. A skipped call returns
    /// `ERROR_VALIDATION_FAILED_EXT` without reaching the next layer.
    pub fn intercept(&self, command: Command, call: impl FnOnce() -> vk::Result) -> vk::Result {
        if self.pre_call_validate(command) {
            debug!(command = command.name(), "call skipped by validation");
            return vk::Result::ERROR_VALIDATION_FAILED_EXT;
        }
        self.pre_call_record(command);
        let result = call();
        self.post_call_record(command, result);
        result
    }

    /// [`ValidationChain::intercept`] for entry points without a result.
    pub fn intercept_void(&self, command: Command, call: impl FnOnce()) {
        if self.pre_call_validate(command) {
            debug!(command = command.name(), "call skipped by validation");
            return;
        }
        self.pre_call_record(command);
        call();
        self.post_call_record(command, vk::Result::SUCCESS);
    }

    pub fn object_created<H: Handle + Copy>(&self, handle: H) {
        if handle.as_raw() == 0 {
            return;
        }
        for object in &self.objects {
            object.object_created(H::TYPE, handle.as_raw());
        }
    }

    pub fn object_destroyed<H: Handle + Copy>(&self, handle: H) {
        if handle.as_raw() == 0 {
            return;
        }
        for object in &self.objects {
            object.object_destroyed(H::TYPE, handle.as_raw());
        }
    }
}

/// Owner of the current chain snapshot.
///
/// Calls clone the `Arc` and run hooks without holding the lock. Releasing an
/// object swaps in a filtered snapshot; the released object stays alive until
/// the registry is dropped, so a call still running on an older snapshot is
/// never left with a dangling object.
pub struct ValidationRegistry {
    chain: RwLock<Arc<ValidationChain>>,
    released: Mutex<Vec<Arc<dyn ValidationObject>>>,
}

impl ValidationRegistry {
    /// Build the chain, dropping objects whose feature is switched off.
    pub fn new(objects: Vec<Arc<dyn ValidationObject>>, settings: &LayerSettings) -> Self {
        let objects: Vec<_> = objects
            .into_iter()
            .filter(|object| match object.container_type().feature() {
                Some(feature) => {
                    let active = settings.is_active(feature);
                    if !active {
                        info!("validation object {:?} disabled", object.container_type());
                    }
                    active
                }
                None => true,
            })
            .collect();
        Self {
            chain: RwLock::new(Arc::new(ValidationChain::new(objects))),
            released: Mutex::new(Vec::new()),
        }
    }

    /// Current snapshot.
    pub fn chain(&self) -> Arc<ValidationChain> {
        self.chain.read().clone()
    }

    pub fn get(&self, object_type: LayerObjectTypeId) -> Option<Arc<dyn ValidationObject>> {
        self.chain.read().get(object_type)
    }

    /// Remove the object of `object_type` from the chain.
    pub fn release(&self, object_type: LayerObjectTypeId) {
        self.release_matching(|object| object.container_type() == object_type);
    }

    /// Remove every object from the chain.
    pub fn release_all(&self) {
        self.release_matching(|_| true);
    }

    fn release_matching(&self, remove: impl Fn(&Arc<dyn ValidationObject>) -> bool) {
        let removed = {
            let mut chain = self.chain.write();
            let (filtered, removed) = chain.without(remove);
            *chain = Arc::new(filtered);
            removed
        };
        for object in &removed {
            debug!("released validation object {:?}", object.container_type());
        }
        self.released.lock().extend(removed);
    }
}
