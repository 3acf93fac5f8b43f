//! Tool reporting. The layer lists itself first, ahead of whatever the
//! layers below it report.

use ash::vk;
use rvl_common::{LAYER_DESCRIPTION, LAYER_NAME_C, LAYER_VERSION};

use crate::dispatch::InstanceDispatchObject;
use crate::validation::Command;

/// This layer's tool entry.
pub fn layer_tool() -> vk::PhysicalDeviceToolProperties<'static> {
    let tool =
        vk::PhysicalDeviceToolProperties::default().purposes(vk::ToolPurposeFlags::VALIDATION);
    // All three strings fit their arrays; on failure the field stays empty.
    let tool = tool.name(LAYER_NAME_C).unwrap_or(tool);
    let tool = tool.version(LAYER_VERSION).unwrap_or(tool);
    let tool = tool.description(LAYER_DESCRIPTION).unwrap_or(tool);
    tool.layer(LAYER_NAME_C).unwrap_or(tool)
}

impl InstanceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkGetPhysicalDeviceToolProperties` validity
    /// rules.
    pub unsafe fn get_physical_device_tool_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        p_tool_count: *mut u32,
        p_tool_properties: *mut vk::PhysicalDeviceToolProperties<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::GetPhysicalDeviceToolProperties, || unsafe {
                report_tools(p_tool_count, p_tool_properties, |count, properties| {
                    self.table
                        .get_physical_device_tool_properties(physical_device, count, properties)
                })
            })
    }

    /// # Safety
    /// Pointers must follow `vkGetPhysicalDeviceToolPropertiesEXT` validity
    /// rules.
    pub unsafe fn get_physical_device_tool_properties_ext(
        &self,
        physical_device: vk::PhysicalDevice,
        p_tool_count: *mut u32,
        p_tool_properties: *mut vk::PhysicalDeviceToolProperties<'_>,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::GetPhysicalDeviceToolPropertiesEXT, || unsafe {
                report_tools(p_tool_count, p_tool_properties, |count, properties| {
                    self.table
                        .get_physical_device_tool_properties_ext(physical_device, count, properties)
                })
            })
    }
}

/// Fill the two-call tool list with this layer at index 0 and the next
/// layer's tools after it. A next layer without the entry point reports none.
///
/// # Safety
/// `p_tool_count` must be valid; `p_tool_properties` must be null or hold
/// `*p_tool_count` writable elements.
unsafe fn report_tools<'a>(
    p_tool_count: *mut u32,
    p_tool_properties: *mut vk::PhysicalDeviceToolProperties<'a>,
    below: impl FnOnce(*mut u32, *mut vk::PhysicalDeviceToolProperties<'a>) -> vk::Result,
) -> vk::Result {
    unsafe {
        if p_tool_properties.is_null() {
            let mut count = 0;
            let result = match below(&mut count, p_tool_properties) {
                vk::Result::ERROR_EXTENSION_NOT_PRESENT => {
                    count = 0;
                    vk::Result::SUCCESS
                }
                result => result,
            };
            if result == vk::Result::SUCCESS {
                *p_tool_count = count + 1;
            }
            return result;
        }

        let capacity = *p_tool_count;
        if capacity == 0 {
            return vk::Result::INCOMPLETE;
        }
        let slot = &mut *p_tool_properties;
        let mut tool = layer_tool();
        tool.s_type = slot.s_type;
        tool.p_next = slot.p_next;
        *slot = tool;

        let mut count = capacity - 1;
        match below(&mut count, p_tool_properties.add(1)) {
            vk::Result::ERROR_EXTENSION_NOT_PRESENT => {
                *p_tool_count = 1;
                vk::Result::SUCCESS
            }
            result @ (vk::Result::SUCCESS | vk::Result::INCOMPLETE) => {
                *p_tool_count = count + 1;
                result
            }
            error => error,
        }
    }
}
