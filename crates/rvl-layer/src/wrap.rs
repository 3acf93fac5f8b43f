use std::sync::Arc;

use ash::vk::Handle;
use rvl_core::UniqueIdMap;
use tracing::trace;

/// Typed access to the surrogate table, gated on the wrap flag.
///
/// When wrapping is disabled every operation is the identity and nothing is
/// ever inserted. Null handles are passed through untouched in both
/// directions.
#[derive(Clone)]
pub struct HandleWrapper {
    enabled: bool,
    map: Arc<UniqueIdMap>,
}

impl HandleWrapper {
    pub fn new(enabled: bool, map: Arc<UniqueIdMap>) -> Self {
        Self { enabled, map }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn map(&self) -> &Arc<UniqueIdMap> {
        &self.map
    }

    /// Mint a surrogate for a freshly created object.
    pub fn wrap_new<H: Handle + Copy>(&self, real: H) -> H {
        if !self.enabled || real.as_raw() == 0 {
            return real;
        }
        let surrogate = self.map.wrap(real.as_raw());
        trace!(ty = ?H::TYPE, real = real.as_raw(), surrogate, "wrap");
        H::from_raw(surrogate)
    }

    /// Surrogate for a handle the driver reports again and again (displays).
    pub fn wrap_display<H: Handle + Copy>(&self, real: H) -> H {
        if !self.enabled || real.as_raw() == 0 {
            return real;
        }
        H::from_raw(self.map.wrap_unique(real.as_raw()))
    }

    /// Real handle behind `handle`; unknown handles become null.
    pub fn unwrap<H: Handle + Copy>(&self, handle: H) -> H {
        H::from_raw(self.unwrap_raw(handle.as_raw()))
    }

    pub fn unwrap_raw(&self, raw: u64) -> u64 {
        if !self.enabled || raw == 0 {
            return raw;
        }
        self.map.unwrap(raw).unwrap_or(0)
    }

    /// Real handle behind `raw`, or `raw` itself when it is not a surrogate.
    /// Object naming calls take both dispatchable and non-dispatchable handles.
    pub fn unwrap_or_keep(&self, raw: u64) -> u64 {
        if !self.enabled || raw == 0 {
            return raw;
        }
        self.map.unwrap(raw).unwrap_or(raw)
    }

    /// Remove `handle` and return the real one. Of several racing destroys of
    /// the same surrogate only one gets a non-null result.
    pub fn pop<H: Handle + Copy>(&self, handle: H) -> H {
        if !self.enabled || handle.as_raw() == 0 {
            return handle;
        }
        match self.map.pop(handle.as_raw()) {
            Some(real) => {
                trace!(ty = ?H::TYPE, surrogate = handle.as_raw(), "pop");
                H::from_raw(real)
            }
            None => H::from_raw(0),
        }
    }

    pub fn erase<H: Handle + Copy>(&self, handle: H) {
        if self.enabled && handle.as_raw() != 0 {
            self.map.erase(handle.as_raw());
        }
    }

    /// Unwrapped copy of an application handle array.
    ///
    /// # Safety
    /// `ptr` must be null or point to `count` readable handles.
    pub unsafe fn unwrap_array<H: Handle + Copy>(&self, ptr: *const H, count: u32) -> Vec<H> {
        unsafe { read_array(ptr, count) }
            .into_iter()
            .map(|h| self.unwrap(h))
            .collect()
    }
}

/// Copy `count` elements out of an application array. Null or empty reads
/// yield an empty vector.
///
/// # Safety
/// `ptr` must be null or point to `count` readable elements.
pub(crate) unsafe fn read_array<T: Copy>(ptr: *const T, count: u32) -> Vec<T> {
    if ptr.is_null() || count == 0 {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(ptr, count as usize) }.to_vec()
}

/// Pointer to a local replacement array, keeping a null application pointer
/// null.
pub(crate) fn local_ptr<T>(local: &[T], original: *const T) -> *const T {
    if original.is_null() {
        std::ptr::null()
    } else {
        local.as_ptr()
    }
}
