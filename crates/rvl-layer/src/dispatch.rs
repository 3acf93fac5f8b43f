//! Per-instance and per-device dispatch objects.
//!
//! A dispatch object owns the next-layer table, the surrogate bookkeeping and
//! the validation chain for one instance or device. Entry points are split by
//! area across the sibling modules; this file holds construction and the
//! helpers they share.

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use parking_lot::RwLock;
use rvl_core::{LayerSettings, UniqueIdMap};
use tracing::info;

use crate::deferred::DeferredOperations;
use crate::table::{DeviceTable, InstanceTable};
use crate::tracker::TrackedState;
use crate::validation::{
    Command, LayerObjectTypeId, ValidationChain, ValidationObject, ValidationRegistry,
};
use crate::wrap::HandleWrapper;

// ── Instance ────────────────────────────────────────────────

pub struct InstanceDispatchObject {
    instance: vk::Instance,
    api_version: u32,
    settings: LayerSettings,
    pub(crate) wrapper: HandleWrapper,
    pub(crate) table: Box<dyn InstanceTable>,
    validation: ValidationRegistry,
}

impl InstanceDispatchObject {
    /// Set up the dispatch object of a freshly created instance.
    ///
    /// # Safety
    /// `p_create_info` must be null or the create info the instance was
    /// created with.
    pub unsafe fn new(
        instance: vk::Instance,
        p_create_info: *const vk::InstanceCreateInfo<'_>,
        settings: LayerSettings,
        table: Box<dyn InstanceTable>,
        validation_objects: Vec<Arc<dyn ValidationObject>>,
    ) -> Self {
        rvl_common::logging::init_logging(&settings.log_filter);

        let requested = unsafe {
            p_create_info
                .as_ref()
                .and_then(|info| info.p_application_info.as_ref())
                .map(|app| app.api_version)
                .unwrap_or(0)
        };
        let api_version = effective_instance_version(requested);
        let wrapper = HandleWrapper::new(settings.handle_wrapping(), Arc::new(UniqueIdMap::new()));
        info!(
            "{} on instance {:#x}: API {}.{}, handle wrapping {}",
            rvl_common::LAYER_NAME,
            instance.as_raw(),
            vk::api_version_major(api_version),
            vk::api_version_minor(api_version),
            if wrapper.enabled() { "on" } else { "off" }
        );
        let validation = ValidationRegistry::new(validation_objects, &settings);

        Self {
            instance,
            api_version,
            settings,
            wrapper,
            table,
            validation,
        }
    }

    pub fn instance(&self) -> vk::Instance {
        self.instance
    }

    /// Requested API version with the patch component cleared.
    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn settings(&self) -> &LayerSettings {
        &self.settings
    }

    pub fn wrap_handles(&self) -> bool {
        self.wrapper.enabled()
    }

    /// Surrogate table shared with every device of this instance.
    pub fn handles(&self) -> &Arc<UniqueIdMap> {
        self.wrapper.map()
    }

    pub fn chain(&self) -> Arc<ValidationChain> {
        self.validation.chain()
    }

    pub fn validation_object(
        &self,
        object_type: LayerObjectTypeId,
    ) -> Option<Arc<dyn ValidationObject>> {
        self.validation.get(object_type)
    }

    pub fn release_validation_object(&self, object_type: LayerObjectTypeId) {
        self.validation.release(object_type);
    }

    pub fn release_all_validation_objects(&self) {
        self.validation.release_all();
    }

    /// # Safety
    /// `p_allocator` must be null or valid allocation callbacks.
    pub unsafe fn destroy_instance(&self, p_allocator: *const vk::AllocationCallbacks<'_>) {
        self.chain().intercept_void(Command::DestroyInstance, || unsafe {
            self.table.destroy_instance(self.instance, p_allocator)
        });
    }

    /// # Safety
    /// `p_properties` must be writable.
    pub unsafe fn get_physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        p_properties: *mut vk::PhysicalDeviceProperties,
    ) {
        self.chain()
            .intercept_void(Command::GetPhysicalDeviceProperties, || unsafe {
                self.table
                    .get_physical_device_properties(physical_device, p_properties)
            });
    }
}

fn effective_instance_version(requested: u32) -> u32 {
    let requested = if requested == 0 {
        vk::API_VERSION_1_0
    } else {
        requested
    };
    vk::make_api_version(
        vk::api_version_variant(requested),
        vk::api_version_major(requested),
        vk::api_version_minor(requested),
        0,
    )
}

// ── Device ──────────────────────────────────────────────────

pub struct DeviceDispatchObject {
    device: vk::Device,
    physical_device: vk::PhysicalDevice,
    api_version: u32,
    pub(crate) wrapper: HandleWrapper,
    pub(crate) table: Box<dyn DeviceTable>,
    pub(crate) state: RwLock<TrackedState>,
    /// Secondary command buffer -> owning pool, as the application named it
    pub(crate) secondary_command_buffers: RwLock<HashMap<vk::CommandBuffer, vk::CommandPool>>,
    pub(crate) deferred: DeferredOperations,
    validation: ValidationRegistry,
}

impl DeviceDispatchObject {
    /// Set up the dispatch object of a freshly created device.
    ///
    /// # Safety
    /// `physical_device` must belong to `instance`.
    pub unsafe fn new(
        instance: &InstanceDispatchObject,
        physical_device: vk::PhysicalDevice,
        device: vk::Device,
        table: Box<dyn DeviceTable>,
        validation_objects: Vec<Arc<dyn ValidationObject>>,
    ) -> Self {
        let mut properties = vk::PhysicalDeviceProperties::default();
        unsafe {
            instance
                .table
                .get_physical_device_properties(physical_device, &mut properties);
        }
        let api_version = properties.api_version.min(instance.api_version());
        info!(
            "device {:#x}: effective API {}.{}",
            device.as_raw(),
            vk::api_version_major(api_version),
            vk::api_version_minor(api_version)
        );

        Self {
            device,
            physical_device,
            api_version,
            wrapper: instance.wrapper.clone(),
            table,
            state: RwLock::new(TrackedState::default()),
            secondary_command_buffers: RwLock::new(HashMap::new()),
            deferred: DeferredOperations::new(),
            validation: ValidationRegistry::new(validation_objects, instance.settings()),
        }
    }

    pub fn device(&self) -> vk::Device {
        self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Lower of the physical device version and the instance version.
    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn wrap_handles(&self) -> bool {
        self.wrapper.enabled()
    }

    pub fn handles(&self) -> &Arc<UniqueIdMap> {
        self.wrapper.map()
    }

    pub fn deferred_operations(&self) -> &DeferredOperations {
        &self.deferred
    }

    pub fn chain(&self) -> Arc<ValidationChain> {
        self.validation.chain()
    }

    pub fn validation_object(
        &self,
        object_type: LayerObjectTypeId,
    ) -> Option<Arc<dyn ValidationObject>> {
        self.validation.get(object_type)
    }

    pub fn release_validation_object(&self, object_type: LayerObjectTypeId) {
        self.validation.release(object_type);
    }

    pub fn release_all_validation_objects(&self) {
        self.validation.release_all();
    }

    /// # Safety
    /// `p_allocator` must be null or valid allocation callbacks.
    pub unsafe fn destroy_device(&self, p_allocator: *const vk::AllocationCallbacks<'_>) {
        self.chain().intercept_void(Command::DestroyDevice, || unsafe {
            self.table.destroy_device(self.device, p_allocator)
        });
    }

    // ── Shared helpers ──────────────────────────────────────

    /// Run a creation call and wrap the handle it wrote on success.
    pub(crate) fn create_object<H: Handle + Copy>(
        &self,
        command: Command,
        p_handle: *mut H,
        call: impl FnOnce() -> vk::Result,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(command, || {
            let result = call();
            if result == vk::Result::SUCCESS && !p_handle.is_null() {
                unsafe {
                    let handle = self.wrapper.wrap_new(*p_handle);
                    *p_handle = handle;
                    chain.object_created(handle);
                }
            }
            result
        })
    }

    /// Run a destruction call with the surrogate removed and the real handle
    /// passed down. An unknown handle reaches the next layer as null.
    pub(crate) fn destroy_object<H: Handle + Copy>(
        &self,
        command: Command,
        handle: H,
        call: impl FnOnce(H),
    ) {
        let chain = self.chain();
        chain.intercept_void(command, || {
            let real = self.wrapper.pop(handle);
            call(real);
            chain.object_destroyed(handle);
        });
    }
}
