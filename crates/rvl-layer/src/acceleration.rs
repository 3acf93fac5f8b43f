//! Acceleration structure entry points.
//!
//! Build infos carry handles in three places: the source and destination
//! structures, micromaps in triangle geometry chains, and, for host builds,
//! the `accelerationStructureReference` of every instance. Instance data is
//! application memory, so host builds read it into layer-owned buffers with
//! the references unwrapped instead of patching it in place.

use std::mem::size_of;
use std::ptr;

use ash::vk;

use crate::chain::LocalChain;
use crate::deferred::{CompletionAction, RetainedInputs};
use crate::dispatch::DeviceDispatchObject;
use crate::validation::Command;
use crate::wrap::{local_ptr, read_array, HandleWrapper};

/// Instance array of one host build geometry, laid out like the
/// application's: `primitive_offset` bytes of padding, then either the
/// instances or an array of pointers to them.
struct HostInstances {
    storage: Vec<u64>,
    _instances: Vec<vk::AccelerationStructureInstanceKHR>,
}

fn unwrap_instance(wrapper: &HandleWrapper, instance: &mut vk::AccelerationStructureInstanceKHR) {
    let handle = unsafe { instance.acceleration_structure_reference.host_handle };
    instance.acceleration_structure_reference.host_handle = wrapper.unwrap(handle);
}

impl HostInstances {
    /// # Safety
    /// `base` must hold `range.primitive_count` instances (or instance
    /// pointers) starting `range.primitive_offset` bytes in.
    unsafe fn copy(
        wrapper: &HandleWrapper,
        base: *const u8,
        array_of_pointers: bool,
        range: &vk::AccelerationStructureBuildRangeInfoKHR,
    ) -> Self {
        let count = range.primitive_count as usize;
        let offset = range.primitive_offset as usize;
        let instance_size = size_of::<vk::AccelerationStructureInstanceKHR>();

        if array_of_pointers {
            let pointers = unsafe { base.add(offset) }
                .cast::<*const vk::AccelerationStructureInstanceKHR>();
            let mut instances: Vec<_> = (0..count)
                .map(|index| unsafe {
                    ptr::read_unaligned(ptr::read_unaligned(pointers.add(index)))
                })
                .collect();
            for instance in &mut instances {
                unwrap_instance(wrapper, instance);
            }
            let mut storage = vec![0u64; (offset + count * size_of::<usize>()).div_ceil(8)];
            let local_pointers = unsafe { storage.as_mut_ptr().cast::<u8>().add(offset) }
                .cast::<*const vk::AccelerationStructureInstanceKHR>();
            for (index, instance) in instances.iter().enumerate() {
                unsafe { ptr::write_unaligned(local_pointers.add(index), instance as *const _) };
            }
            Self {
                storage,
                _instances: instances,
            }
        } else {
            let len = offset + count * instance_size;
            let mut storage = vec![0u64; len.div_ceil(8)];
            let dst = storage.as_mut_ptr().cast::<u8>();
            unsafe {
                ptr::copy_nonoverlapping(base.add(offset), dst.add(offset), count * instance_size);
                for index in 0..count {
                    let slot = dst
                        .add(offset + index * instance_size)
                        .cast::<vk::AccelerationStructureInstanceKHR>();
                    let mut instance = ptr::read_unaligned(slot);
                    unwrap_instance(wrapper, &mut instance);
                    ptr::write_unaligned(slot, instance);
                }
            }
            Self {
                storage,
                _instances: Vec::new(),
            }
        }
    }

    fn address(&self) -> *const std::ffi::c_void {
        self.storage.as_ptr().cast()
    }
}

/// Local copies of a batch of build infos.
struct BuildCopies {
    infos: Vec<vk::AccelerationStructureBuildGeometryInfoKHR<'static>>,
    _geometries: Vec<Vec<vk::AccelerationStructureGeometryKHR<'static>>>,
    _chains: Vec<LocalChain>,
    _instances: Vec<HostInstances>,
    caller_infos: *const vk::AccelerationStructureBuildGeometryInfoKHR<'static>,
}

// All storage is owned; `caller_infos` is only compared against null.
unsafe impl Send for BuildCopies {}
unsafe impl Sync for BuildCopies {}

impl RetainedInputs for BuildCopies {}

impl BuildCopies {
    /// Copy `count` build infos. Instance references are unwrapped only when
    /// `host_ranges` is given, since device builds read instances from device
    /// memory.
    unsafe fn new(
        wrapper: &HandleWrapper,
        p_infos: *const vk::AccelerationStructureBuildGeometryInfoKHR<'_>,
        count: u32,
        host_ranges: Option<*const *const vk::AccelerationStructureBuildRangeInfoKHR>,
    ) -> Self {
        let caller_infos = p_infos.cast::<vk::AccelerationStructureBuildGeometryInfoKHR<'static>>();
        let mut infos = unsafe { read_array(caller_infos, count) };
        let mut all_geometries = Vec::with_capacity(infos.len());
        let mut chains = Vec::new();
        let mut instances = Vec::new();

        for (info_index, info) in infos.iter_mut().enumerate() {
            info.src_acceleration_structure = wrapper.unwrap(info.src_acceleration_structure);
            info.dst_acceleration_structure = wrapper.unwrap(info.dst_acceleration_structure);

            let mut geometries: Vec<vk::AccelerationStructureGeometryKHR<'static>> =
                if !info.p_geometries.is_null() {
                    unsafe { read_array(info.p_geometries, info.geometry_count) }
                } else {
                    unsafe { read_array(info.pp_geometries, info.geometry_count) }
                        .into_iter()
                        .filter(|geometry| !geometry.is_null())
                        .map(|geometry| unsafe { *geometry })
                        .collect()
                };

            for (geometry_index, geometry) in geometries.iter_mut().enumerate() {
                unsafe {
                    match geometry.geometry_type {
                        vk::GeometryTypeKHR::TRIANGLES => {
                            let chain =
                                LocalChain::copy(wrapper, geometry.geometry.triangles.p_next);
                            geometry.geometry.triangles.p_next = chain.head();
                            chains.push(chain);
                        }
                        vk::GeometryTypeKHR::INSTANCES => {
                            let Some(ranges) = host_ranges else { continue };
                            let base = geometry.geometry.instances.data.host_address.cast::<u8>();
                            if ranges.is_null() || base.is_null() {
                                continue;
                            }
                            let range = &*(*ranges.add(info_index)).add(geometry_index);
                            let copy = HostInstances::copy(
                                wrapper,
                                base,
                                geometry.geometry.instances.array_of_pointers == vk::TRUE,
                                range,
                            );
                            geometry.geometry.instances.data.host_address = copy.address();
                            instances.push(copy);
                        }
                        _ => {}
                    }
                }
            }

            if !geometries.is_empty() {
                info.p_geometries = geometries.as_ptr();
                info.pp_geometries = ptr::null();
            }
            all_geometries.push(geometries);
        }

        Self {
            infos,
            _geometries: all_geometries,
            _chains: chains,
            _instances: instances,
            caller_infos,
        }
    }

    fn infos_ptr(&self) -> *const vk::AccelerationStructureBuildGeometryInfoKHR<'static> {
        local_ptr(&self.infos, self.caller_infos)
    }
}

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkCreateAccelerationStructureKHR` validity rules.
    pub unsafe fn create_acceleration_structure_khr(
        &self,
        p_create_info: *const vk::AccelerationStructureCreateInfoKHR<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_acceleration_structure: *mut vk::AccelerationStructureKHR,
    ) -> vk::Result {
        self.create_object(
            Command::CreateAccelerationStructureKHR,
            p_acceleration_structure,
            || unsafe {
                let mut local = *p_create_info;
                local.buffer = self.wrapper.unwrap(local.buffer);
                self.table.create_acceleration_structure_khr(
                    self.device(),
                    &local,
                    p_allocator,
                    p_acceleration_structure,
                )
            },
        )
    }

    /// # Safety
    /// Pointers must follow `vkDestroyAccelerationStructureKHR` validity rules.
    pub unsafe fn destroy_acceleration_structure_khr(
        &self,
        acceleration_structure: vk::AccelerationStructureKHR,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.destroy_object(
            Command::DestroyAccelerationStructureKHR,
            acceleration_structure,
            |real| unsafe {
                self.table
                    .destroy_acceleration_structure_khr(self.device(), real, p_allocator)
            },
        );
    }

    /// Host build. A deferred build keeps its copies until the operation
    /// completes.
    ///
    /// # Safety
    /// Pointers must follow `vkBuildAccelerationStructuresKHR` validity rules.
    pub unsafe fn build_acceleration_structures_khr(
        &self,
        deferred_operation: vk::DeferredOperationKHR,
        info_count: u32,
        p_infos: *const vk::AccelerationStructureBuildGeometryInfoKHR<'_>,
        pp_build_range_infos: *const *const vk::AccelerationStructureBuildRangeInfoKHR,
    ) -> vk::Result {
        self.chain()
            .intercept(Command::BuildAccelerationStructuresKHR, || unsafe {
                if !self.wrap_handles() {
                    return self.table.build_acceleration_structures_khr(
                        self.device(),
                        deferred_operation,
                        info_count,
                        p_infos,
                        pp_build_range_infos,
                    );
                }
                let copies = BuildCopies::new(
                    &self.wrapper,
                    p_infos,
                    info_count,
                    Some(pp_build_range_infos),
                );
                let result = self.table.build_acceleration_structures_khr(
                    self.device(),
                    self.wrapper.unwrap(deferred_operation),
                    info_count,
                    copies.infos_ptr(),
                    pp_build_range_infos,
                );
                if result == vk::Result::OPERATION_DEFERRED_KHR
                    && deferred_operation != vk::DeferredOperationKHR::null()
                {
                    self.deferred.add_completion(
                        deferred_operation,
                        CompletionAction::Release(Box::new(copies)),
                    );
                }
                result
            })
    }

    /// # Safety
    /// Pointers must follow `vkCmdBuildAccelerationStructuresKHR` validity
    /// rules.
    pub unsafe fn cmd_build_acceleration_structures_khr(
        &self,
        command_buffer: vk::CommandBuffer,
        info_count: u32,
        p_infos: *const vk::AccelerationStructureBuildGeometryInfoKHR<'_>,
        pp_build_range_infos: *const *const vk::AccelerationStructureBuildRangeInfoKHR,
    ) {
        self.chain()
            .intercept_void(Command::CmdBuildAccelerationStructuresKHR, || unsafe {
                if !self.wrap_handles() {
                    return self.table.cmd_build_acceleration_structures_khr(
                        command_buffer,
                        info_count,
                        p_infos,
                        pp_build_range_infos,
                    );
                }
                let copies = BuildCopies::new(&self.wrapper, p_infos, info_count, None);
                self.table.cmd_build_acceleration_structures_khr(
                    command_buffer,
                    info_count,
                    copies.infos_ptr(),
                    pp_build_range_infos,
                );
            });
    }

    /// # Safety
    /// Pointers must follow `vkGetAccelerationStructureBuildSizesKHR` validity
    /// rules.
    pub unsafe fn get_acceleration_structure_build_sizes_khr(
        &self,
        build_type: vk::AccelerationStructureBuildTypeKHR,
        p_build_info: *const vk::AccelerationStructureBuildGeometryInfoKHR<'_>,
        p_max_primitive_counts: *const u32,
        p_size_info: *mut vk::AccelerationStructureBuildSizesInfoKHR<'_>,
    ) {
        self.chain()
            .intercept_void(Command::GetAccelerationStructureBuildSizesKHR, || unsafe {
                if !self.wrap_handles() {
                    return self.table.get_acceleration_structure_build_sizes_khr(
                        self.device(),
                        build_type,
                        p_build_info,
                        p_max_primitive_counts,
                        p_size_info,
                    );
                }
                let copies = BuildCopies::new(&self.wrapper, p_build_info, 1, None);
                self.table.get_acceleration_structure_build_sizes_khr(
                    self.device(),
                    build_type,
                    copies.infos_ptr(),
                    p_max_primitive_counts,
                    p_size_info,
                );
            });
    }
}
