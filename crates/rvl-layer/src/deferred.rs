use ash::vk;
use ash::vk::Handle;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::dispatch::DeviceDispatchObject;
use crate::validation::{Command, LayerObjectTypeId, ValidationChain};
use crate::wrap::HandleWrapper;

/// Layer-owned copies of a deferred call's input, kept alive until the
/// operation completes.
pub trait RetainedInputs: Send + Sync {
    /// Runs once when the operation completes, right before the copies are
    /// dropped.
    fn on_complete(&mut self) {}
}

/// Application array receiving the pipelines of a deferred creation.
pub struct PipelineOutput {
    ptr: *mut vk::Pipeline,
    count: usize,
}

// The API requires the output array to stay valid and untouched by the
// application until the operation completes.
unsafe impl Send for PipelineOutput {}
unsafe impl Sync for PipelineOutput {}

impl PipelineOutput {
    /// # Safety
    /// `ptr` must point to `count` writable pipelines that stay valid until
    /// the operation completes.
    pub unsafe fn new(ptr: *mut vk::Pipeline, count: usize) -> Self {
        Self { ptr, count }
    }

    fn write(&self, index: usize, pipeline: vk::Pipeline) {
        if index < self.count && !self.ptr.is_null() {
            unsafe { *self.ptr.add(index) = pipeline };
        }
    }
}

/// Cleanup or patch-back run when a deferred operation completes.
pub enum CompletionAction {
    /// Drop the retained input copies.
    Release(Box<dyn RetainedInputs>),
    /// Wrap what the next layer wrote into `produced`, publish the result to
    /// the application array and record it as children of the operation.
    PublishPipelines {
        produced: Box<[vk::Pipeline]>,
        destination: PipelineOutput,
    },
}

/// Check run once the completion actions are done, given the child handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCheckAction {
    NotifyPipelines(LayerObjectTypeId),
}

#[derive(Default)]
struct PendingOperation {
    completions: Vec<CompletionAction>,
    children: Vec<vk::Pipeline>,
    post_checks: Vec<PostCheckAction>,
}

/// Registry of deferred operations that have not reported success yet.
///
/// One record per operation, keyed by the handle the application holds. The
/// record is removed in one step when the operation first reports `SUCCESS`,
/// so racing join and result queries fire the actions exactly once.
#[derive(Default)]
pub struct DeferredOperations {
    pending: DashMap<u64, PendingOperation>,
}

impl DeferredOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_completion(&self, operation: vk::DeferredOperationKHR, action: CompletionAction) {
        self.pending
            .entry(operation.as_raw())
            .or_default()
            .completions
            .push(action);
    }

    pub fn add_post_check(&self, operation: vk::DeferredOperationKHR, action: PostCheckAction) {
        self.pending
            .entry(operation.as_raw())
            .or_default()
            .post_checks
            .push(action);
    }

    pub fn is_pending(&self, operation: vk::DeferredOperationKHR) -> bool {
        self.pending.contains_key(&operation.as_raw())
    }

    /// Number of operations with outstanding actions.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop the record of an operation that is destroyed before completing.
    pub fn discard(&self, operation: vk::DeferredOperationKHR) {
        if self.pending.remove(&operation.as_raw()).is_some() {
            warn!(
                "deferred operation {:#x} destroyed before completion, dropping its pending actions",
                operation.as_raw()
            );
        }
    }

    /// Feed the result of a join or result query. Only `SUCCESS` completes
    /// the operation; anything else leaves the record in place.
    pub fn on_result(
        &self,
        operation: vk::DeferredOperationKHR,
        result: vk::Result,
        wrapper: &HandleWrapper,
        chain: &ValidationChain,
    ) {
        if result != vk::Result::SUCCESS {
            return;
        }
        let Some((_, record)) = self.pending.remove(&operation.as_raw()) else {
            return;
        };
        debug!(operation = operation.as_raw(), "deferred operation completed");

        let mut children = record.children;
        for action in record.completions {
            match action {
                CompletionAction::Release(mut inputs) => {
                    inputs.on_complete();
                    drop(inputs);
                }
                CompletionAction::PublishPipelines {
                    produced,
                    destination,
                } => {
                    for (index, &real) in produced.iter().enumerate() {
                        let pipeline = wrapper.wrap_new(real);
                        destination.write(index, pipeline);
                        if pipeline != vk::Pipeline::null() {
                            chain.object_created(pipeline);
                            children.push(pipeline);
                        }
                    }
                }
            }
        }

        for check in record.post_checks {
            match check {
                PostCheckAction::NotifyPipelines(object_type) => {
                    if let Some(object) = chain.get(object_type) {
                        object.deferred_pipelines_ready(operation, &children);
                    }
                }
            }
        }
    }
}

// ── Entry points ────────────────────────────────────────────

impl DeviceDispatchObject {
    /// # Safety
    /// Pointers must follow `vkCreateDeferredOperationKHR` validity rules.
    pub unsafe fn create_deferred_operation_khr(
        &self,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_deferred_operation: *mut vk::DeferredOperationKHR,
    ) -> vk::Result {
        self.create_object(
            Command::CreateDeferredOperationKHR,
            p_deferred_operation,
            || unsafe {
                self.table.create_deferred_operation_khr(
                    self.device(),
                    p_allocator,
                    p_deferred_operation,
                )
            },
        )
    }

    /// # Safety
    /// Pointers must follow `vkDestroyDeferredOperationKHR` validity rules.
    pub unsafe fn destroy_deferred_operation_khr(
        &self,
        operation: vk::DeferredOperationKHR,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        self.deferred.discard(operation);
        self.destroy_object(Command::DestroyDeferredOperationKHR, operation, |real| unsafe {
            self.table
                .destroy_deferred_operation_khr(self.device(), real, p_allocator)
        });
    }

    /// # Safety
    /// `operation` must be a deferred operation of this device.
    pub unsafe fn deferred_operation_join_khr(
        &self,
        operation: vk::DeferredOperationKHR,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::DeferredOperationJoinKHR, || {
            let result = unsafe {
                self.table
                    .deferred_operation_join_khr(self.device(), self.wrapper.unwrap(operation))
            };
            self.deferred
                .on_result(operation, result, &self.wrapper, &chain);
            result
        })
    }

    /// # Safety
    /// `operation` must be a deferred operation of this device.
    pub unsafe fn get_deferred_operation_result_khr(
        &self,
        operation: vk::DeferredOperationKHR,
    ) -> vk::Result {
        let chain = self.chain();
        chain.intercept(Command::GetDeferredOperationResultKHR, || {
            let result = unsafe {
                self.table
                    .get_deferred_operation_result_khr(self.device(), self.wrapper.unwrap(operation))
            };
            self.deferred
                .on_result(operation, result, &self.wrapper, &chain);
            result
        })
    }
}
