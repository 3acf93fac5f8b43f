//! Object naming and tagging.
//!
//! The object is passed as a raw `u64` of any type, dispatchable ones
//! included, so a handle that is not a surrogate goes down unchanged.

use ash::vk;

use crate::dispatch::DeviceDispatchObject;
use crate::validation::Command;

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkSetDebugUtilsObjectNameEXT` validity rules.
    pub unsafe fn set_debug_utils_object_name_ext(
        &self,
        p_name_info: *const vk::DebugUtilsObjectNameInfoEXT<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::SetDebugUtilsObjectNameEXT, || unsafe {
                let mut local = *p_name_info;
                local.object_handle = self.wrapper.unwrap_or_keep(local.object_handle);
                self.table.set_debug_utils_object_name_ext(self.device(), &local)
            })
    }

    /// # Safety
    /// Pointers must follow `vkSetDebugUtilsObjectTagEXT` validity rules.
    pub unsafe fn set_debug_utils_object_tag_ext(
        &self,
        p_tag_info: *const vk::DebugUtilsObjectTagInfoEXT<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::SetDebugUtilsObjectTagEXT, || unsafe {
                let mut local = *p_tag_info;
                local.object_handle = self.wrapper.unwrap_or_keep(local.object_handle);
                self.table.set_debug_utils_object_tag_ext(self.device(), &local)
            })
    }

    /// # Safety
    /// Pointers must follow `vkDebugMarkerSetObjectNameEXT` validity rules.
    pub unsafe fn debug_marker_set_object_name_ext(
        &self,
        p_name_info: *const vk::DebugMarkerObjectNameInfoEXT<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::DebugMarkerSetObjectNameEXT, || unsafe {
                let mut local = *p_name_info;
                local.object = self.wrapper.unwrap_or_keep(local.object);
                self.table.debug_marker_set_object_name_ext(self.device(), &local)
            })
    }

    /// # Safety
    /// Pointers must follow `vkDebugMarkerSetObjectTagEXT` validity rules.
    pub unsafe fn debug_marker_set_object_tag_ext(
        &self,
        p_tag_info: *const vk::DebugMarkerObjectTagInfoEXT<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::DebugMarkerSetObjectTagEXT, || unsafe {
                let mut local = *p_tag_info;
                local.object = self.wrapper.unwrap_or_keep(local.object);
                self.table.debug_marker_set_object_tag_ext(self.device(), &local)
            })
    }
}
