//! Core building blocks of the RVL layer that do not depend on the Vulkan
//! bindings: the surrogate handle table and the layer settings.

pub mod config;
pub mod error;
pub mod handle_map;

pub use config::{LayerFeature, LayerSettings};
pub use error::CoreError;
pub use handle_map::UniqueIdMap;
