use ash::vk;

use crate::chain::LocalChain;
use crate::dispatch::DeviceDispatchObject;
use crate::validation::Command;

impl DeviceDispatchObject {
    /// The whole request lives in the `pNext` chain: each export struct names
    /// an object to query and receives a Metal object back. The chain is
    /// copied with the objects unwrapped and the outputs are copied back
    /// afterwards.
    ///
    /// # Safety
    /// Pointers must follow `vkExportMetalObjectsEXT` validity rules.
    pub unsafe fn export_metal_objects_ext(
        &self,
        p_metal_objects_info: *mut vk::ExportMetalObjectsInfoEXT<'_>,
    ) {
        self.chain()
            .intercept_void(Command::ExportMetalObjectsEXT, || unsafe {
                if !self.wrap_handles() {
                    return self
                        .table
                        .export_metal_objects_ext(self.device(), p_metal_objects_info);
                }
                let mut local = *p_metal_objects_info;
                let chain = LocalChain::copy(&self.wrapper, local.p_next);
                local.p_next = chain.head();
                self.table.export_metal_objects_ext(self.device(), &mut local);
                chain.copy_back((*p_metal_objects_info).p_next);
            });
    }
}
