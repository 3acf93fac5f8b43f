//! Surface and display entry points.
//!
//! The driver reports the same display on every query, so displays are
//! wrapped through the unique-wrap path and keep one surrogate for the life of
//! the instance. Display modes get a fresh surrogate per report.

use ash::vk;

use crate::dispatch::InstanceDispatchObject;
use crate::validation::Command;

/// Results for which the driver has written `*p_count` elements.
fn reported(result: vk::Result) -> bool {
    matches!(result, vk::Result::SUCCESS | vk::Result::INCOMPLETE)
}

impl InstanceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkDestroySurfaceKHR` validity rules.
    pub unsafe fn destroy_surface_khr(
        &self,
        surface: vk::SurfaceKHR,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        let chain = self.chain();
        chain.intercept_void(Command::DestroySurfaceKHR, || unsafe {
            let real = self.wrapper.pop(surface);
            self.table
                .destroy_surface_khr(self.instance(), real, p_allocator);
            chain.object_destroyed(surface);
        });
    }

    /// # Safety
    /// Pointers must follow `vkGetPhysicalDeviceDisplayPropertiesKHR`
    /// validity rules.
    pub unsafe fn get_physical_device_display_properties_khr(
        &self,
        physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayPropertiesKHR<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::GetPhysicalDeviceDisplayPropertiesKHR, || unsafe {
                let result = self.table.get_physical_device_display_properties_khr(
                    physical_device,
                    p_property_count,
                    p_properties,
                );
                if reported(result) && !p_properties.is_null() {
                    for index in 0..*p_property_count as usize {
                        let properties = &mut *p_properties.add(index);
                        properties.display = self.wrapper.wrap_display(properties.display);
                    }
                }
                result
            })
    }

    /// # Safety
    /// Pointers must follow `vkGetPhysicalDeviceDisplayPlanePropertiesKHR`
    /// validity rules.
    pub unsafe fn get_physical_device_display_plane_properties_khr(
        &self,
        physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayPlanePropertiesKHR,
    ) -> vk::Result {
        self.chain().intercept(
            Command::GetPhysicalDeviceDisplayPlanePropertiesKHR,
            || unsafe {
                let result = self.table.get_physical_device_display_plane_properties_khr(
                    physical_device,
                    p_property_count,
                    p_properties,
                );
                if reported(result) && !p_properties.is_null() {
                    for index in 0..*p_property_count as usize {
                        let properties = &mut *p_properties.add(index);
                        properties.current_display =
                            self.wrapper.wrap_display(properties.current_display);
                    }
                }
                result
            },
        )
    }

    /// # Safety
    /// Pointers must follow `vkGetDisplayPlaneSupportedDisplaysKHR` validity
    /// rules.
    pub unsafe fn get_display_plane_supported_displays_khr(
        &self,
        physical_device: vk::PhysicalDevice,
        plane_index: u32,
        p_display_count: *mut u32,
        p_displays: *mut vk::DisplayKHR,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::GetDisplayPlaneSupportedDisplaysKHR, || unsafe {
                let result = self.table.get_display_plane_supported_displays_khr(
                    physical_device,
                    plane_index,
                    p_display_count,
                    p_displays,
                );
                if reported(result) && !p_displays.is_null() {
                    for index in 0..*p_display_count as usize {
                        let display = p_displays.add(index);
                        *display = self.wrapper.wrap_display(*display);
                    }
                }
                result
            })
    }

    /// # Safety
    /// Pointers must follow `vkGetDisplayModePropertiesKHR` validity rules.
    pub unsafe fn get_display_mode_properties_khr(
        &self,
        physical_device: vk::PhysicalDevice,
        display: vk::DisplayKHR,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayModePropertiesKHR,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::GetDisplayModePropertiesKHR, || unsafe {
                let result = self.table.get_display_mode_properties_khr(
                    physical_device,
                    self.wrapper.unwrap(display),
                    p_property_count,
                    p_properties,
                );
                if reported(result) && !p_properties.is_null() {
                    for index in 0..*p_property_count as usize {
                        let properties = &mut *p_properties.add(index);
                        properties.display_mode = self.wrapper.wrap_new(properties.display_mode);
                    }
                }
                result
            })
    }

    /// # Safety
    /// Pointers must follow `vkGetPhysicalDeviceDisplayProperties2KHR`
    /// validity rules.
    pub unsafe fn get_physical_device_display_properties2_khr(
        &self,
        physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayProperties2KHR<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::GetPhysicalDeviceDisplayProperties2KHR, || unsafe {
                let result = self.table.get_physical_device_display_properties2_khr(
                    physical_device,
                    p_property_count,
                    p_properties,
                );
                if reported(result) && !p_properties.is_null() {
                    for index in 0..*p_property_count as usize {
                        let properties = &mut (*p_properties.add(index)).display_properties;
                        properties.display = self.wrapper.wrap_display(properties.display);
                    }
                }
                result
            })
    }

    /// # Safety
    /// Pointers must follow `vkGetPhysicalDeviceDisplayPlaneProperties2KHR`
    /// validity rules.
    pub unsafe fn get_physical_device_display_plane_properties2_khr(
        &self,
        physical_device: vk::PhysicalDevice,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayPlaneProperties2KHR<'_>,
    ) -> vk::Result {
        self.chain().intercept(
            Command::GetPhysicalDeviceDisplayPlaneProperties2KHR,
            || unsafe {
                let result = self.table.get_physical_device_display_plane_properties2_khr(
                    physical_device,
                    p_property_count,
                    p_properties,
                );
                if reported(result) && !p_properties.is_null() {
                    for index in 0..*p_property_count as usize {
                        let properties =
                            &mut (*p_properties.add(index)).display_plane_properties;
                        properties.current_display =
                            self.wrapper.wrap_display(properties.current_display);
                    }
                }
                result
            },
        )
    }

    /// # Safety
    /// Pointers must follow `vkGetDisplayModeProperties2KHR` validity rules.
    pub unsafe fn get_display_mode_properties2_khr(
        &self,
        physical_device: vk::PhysicalDevice,
        display: vk::DisplayKHR,
        p_property_count: *mut u32,
        p_properties: *mut vk::DisplayModeProperties2KHR<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::GetDisplayModeProperties2KHR, || unsafe {
                let result = self.table.get_display_mode_properties2_khr(
                    physical_device,
                    self.wrapper.unwrap(display),
                    p_property_count,
                    p_properties,
                );
                if reported(result) && !p_properties.is_null() {
                    for index in 0..*p_property_count as usize {
                        let properties = &mut (*p_properties.add(index)).display_mode_properties;
                        properties.display_mode = self.wrapper.wrap_new(properties.display_mode);
                    }
                }
                result
            })
    }
}
