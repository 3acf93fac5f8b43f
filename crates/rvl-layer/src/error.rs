use ash::vk;

/// Invariant violations found while building layer-owned copies of
/// application input. Entry points log these and fall back; they never reach
/// the application.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("unsupported structure in pNext chain: {0:?}")]
    UnknownStructure(vk::StructureType),

    #[error("unsupported descriptor type in update template: {0:?}")]
    UnknownDescriptorType(vk::DescriptorType),

    #[error("update template {0:#x} is not tracked")]
    MissingTemplate(u64),
}
