//! Handle wrapping and dispatch core of the RVL Vulkan layer.
//!
//! Every non-dispatchable handle the driver returns is replaced by a
//! surrogate before the application sees it, and every surrogate the
//! application passes in is swapped back for the real handle before the call
//! goes down. Around each call the active validation objects get their
//! validate and record hooks.
//!
//! Entry points are `unsafe` methods on [`InstanceDispatchObject`] and
//! [`DeviceDispatchObject`] with the C signatures, minus the dispatchable
//! handle the object already stands for. They are grouped by area:
//!
//! - `resource`: buffers, images, views, samplers, shader modules, sync
//!   objects, memory and performance configurations
//! - `descriptor`: set layouts, pools, sets, descriptor writes and
//!   descriptor buffer reads
//! - `template`: descriptor update templates
//! - `renderpass`: render passes and framebuffers
//! - `pipeline`: caches, layouts and pipelines, including deferred ray tracing
//! - `command`: command pools and buffers
//! - `swapchain`, `display`: presentation
//! - `deferred`: deferred host operations
//! - `acceleration`: acceleration structures
//! - `debug_utils`, `metal`: object naming and Metal export
//! - `tool`: the layer's entry in the physical device tool list

pub mod acceleration;
pub mod chain;
pub mod command;
pub mod debug_utils;
pub mod deferred;
pub mod descriptor;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod metal;
pub mod pipeline;
pub mod renderpass;
pub mod resource;
pub mod swapchain;
pub mod table;
pub mod template;
pub mod tool;
mod tracker;
pub mod validation;
pub mod wrap;

pub use chain::LocalChain;
pub use deferred::{CompletionAction, DeferredOperations, PostCheckAction, RetainedInputs};
pub use dispatch::{DeviceDispatchObject, InstanceDispatchObject};
pub use error::LayerError;
pub use renderpass::RenderPassUsage;
pub use table::{DeviceTable, InstanceTable, LoadedDeviceTable, LoadedInstanceTable};
pub use template::{TemplateState, UnwrappedTemplateData};
pub use validation::{
    Command, LayerObjectTypeId, ValidationChain, ValidationObject, ValidationRegistry,
};
pub use wrap::HandleWrapper;
