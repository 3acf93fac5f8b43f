//! Shared pieces used by every RVL crate: logging setup and the layer identity.

use std::ffi::CStr;

pub mod logging;

/// Name the layer registers under with the Vulkan loader.
pub const LAYER_NAME: &str = "VK_LAYER_RVL_validation";

/// [`LAYER_NAME`] as a C string, for fixed-size name arrays.
pub const LAYER_NAME_C: &CStr = c"VK_LAYER_RVL_validation";

pub const LAYER_DESCRIPTION: &CStr = c"RVL handle wrapping and validation dispatch";

/// Crate version as a C string.
pub const LAYER_VERSION: &CStr =
    match CStr::from_bytes_with_nul(concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes()) {
        Ok(version) => version,
        Err(_) => c"unknown",
    };
