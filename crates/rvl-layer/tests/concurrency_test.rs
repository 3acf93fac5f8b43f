//! Integration test: concurrent entry points
//!
//! Many threads creating, allocating and destroying through one device must
//! never share a surrogate or lose a tracked child.

mod common;

use std::collections::HashSet;
use std::ptr;
use std::thread;

use ash::vk;
use ash::vk::Handle;
use common::wrapping_device;

const THREADS: usize = 8;
const PER_THREAD: usize = 64;

#[test]
fn test_parallel_buffer_lifetimes() {
    let (driver, _instance, device) = wrapping_device();

    let survivors: Vec<vk::Buffer> = thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    let mut kept = Vec::new();
                    for index in 0..PER_THREAD {
                        let mut buffer = vk::Buffer::null();
                        let result = unsafe {
                            device.create_buffer(
                                &vk::BufferCreateInfo::default().size(256),
                                ptr::null(),
                                &mut buffer,
                            )
                        };
                        assert_eq!(result, vk::Result::SUCCESS);
                        if index % 2 == 0 {
                            unsafe { device.destroy_buffer(buffer, ptr::null()) };
                        } else {
                            kept.push(buffer);
                        }
                    }
                    kept
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| match worker.join() {
                Ok(kept) => kept,
                Err(e) => panic!("expected worker to finish, got {:?}", e),
            })
            .collect()
    });

    let unique: HashSet<u64> = survivors.iter().map(|buffer| buffer.as_raw()).collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD / 2);
    assert_eq!(device.handles().len(), THREADS * PER_THREAD / 2);

    // Every destroyed buffer reached the driver as a real handle, once
    let destroyed = driver.received("vkDestroyBuffer");
    assert_eq!(destroyed.len(), THREADS * PER_THREAD / 2);
    assert!(destroyed.iter().all(|&raw| driver.is_real(raw)));
    let distinct: HashSet<u64> = destroyed.into_iter().collect();
    assert_eq!(distinct.len(), THREADS * PER_THREAD / 2);

    for buffer in survivors {
        unsafe { device.destroy_buffer(buffer, ptr::null()) };
    }
    assert!(device.handles().is_empty());
}

#[test]
fn test_shared_pool_allocation_from_many_threads() {
    let (driver, _instance, device) = wrapping_device();

    let mut pool = vk::DescriptorPool::null();
    let sizes = [vk::DescriptorPoolSize::default()
        .ty(vk::DescriptorType::STORAGE_BUFFER)
        .descriptor_count((THREADS * PER_THREAD) as u32)];
    let info = vk::DescriptorPoolCreateInfo::default()
        .max_sets((THREADS * PER_THREAD) as u32)
        .pool_sizes(&sizes);
    unsafe { device.create_descriptor_pool(&info, ptr::null(), &mut pool) };

    let mut layout = vk::DescriptorSetLayout::null();
    unsafe {
        device.create_descriptor_set_layout(
            &vk::DescriptorSetLayoutCreateInfo::default(),
            ptr::null(),
            &mut layout,
        )
    };

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..PER_THREAD {
                    let layouts = [layout];
                    let allocate = vk::DescriptorSetAllocateInfo::default()
                        .descriptor_pool(pool)
                        .set_layouts(&layouts);
                    let mut set = vk::DescriptorSet::null();
                    let result = unsafe { device.allocate_descriptor_sets(&allocate, &mut set) };
                    assert_eq!(result, vk::Result::SUCCESS);
                    assert!(device.handles().contains(set.as_raw()));
                }
            });
        }
    });

    assert_eq!(device.descriptor_sets_of(pool).len(), THREADS * PER_THREAD);
    // Pool, layout and every set
    assert_eq!(device.handles().len(), THREADS * PER_THREAD + 2);

    unsafe { device.destroy_descriptor_pool(pool, ptr::null()) };
    assert!(!device.is_tracked_pool(pool));
    assert_eq!(device.handles().len(), 1);
    assert_eq!(driver.received("vkDestroyDescriptorPool").len(), 1);
}
