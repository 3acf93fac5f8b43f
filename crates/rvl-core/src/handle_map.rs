use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Bidirectional table between layer-minted surrogate handles and the real
/// handles returned by the next layer or driver.
///
/// The application only ever sees surrogates. Every lookup, insert and removal
/// is internally synchronized, so `unwrap` on one thread never waits behind an
/// unrelated `wrap` or `pop` on another unless both land in the same shard.
///
/// The reverse direction (real -> surrogate) is only kept for handles wrapped
/// through [`UniqueIdMap::wrap_unique`]. Non-dispatchable handles are not
/// guaranteed unique by drivers, so plain [`UniqueIdMap::wrap`] always mints.
pub struct UniqueIdMap {
    /// Surrogate -> real handle
    surrogate_to_real: DashMap<u64, u64>,
    /// Real -> surrogate, for idempotently wrapped handles (displays)
    real_to_surrogate: DashMap<u64, u64>,
    /// Counter feeding surrogate generation
    next_id: AtomicU64,
}

/// Spreads sequential counter values across the 64-bit space so surrogates do
/// not look like small driver handles or heap pointers. Bijective on `u64`.
fn scramble(counter: u64) -> u64 {
    counter.rotate_left(40) ^ 0x5256_4c00_0000_0000
}

impl UniqueIdMap {
    pub fn new() -> Self {
        Self {
            surrogate_to_real: DashMap::new(),
            real_to_surrogate: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn mint(&self, real: u64) -> u64 {
        loop {
            let id = scramble(self.next_id.fetch_add(1, Ordering::Relaxed));
            if id != 0 && id != real {
                return id;
            }
        }
    }

    /// Mint a fresh surrogate for `real` and record the pair.
    pub fn wrap(&self, real: u64) -> u64 {
        let surrogate = self.mint(real);
        self.surrogate_to_real.insert(surrogate, real);
        surrogate
    }

    /// Return the live surrogate for `real`, minting one on first sight.
    pub fn wrap_unique(&self, real: u64) -> u64 {
        match self.real_to_surrogate.entry(real) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let surrogate = self.mint(real);
                self.surrogate_to_real.insert(surrogate, real);
                entry.insert(surrogate);
                surrogate
            }
        }
    }

    /// Look up the real handle behind `surrogate` without removing it.
    pub fn unwrap(&self, surrogate: u64) -> Option<u64> {
        self.surrogate_to_real.get(&surrogate).map(|v| *v)
    }

    /// Atomically look up and remove `surrogate`. Used on destroy paths: of
    /// several racing destroys exactly one observes `Some`.
    pub fn pop(&self, surrogate: u64) -> Option<u64> {
        let (_, real) = self.surrogate_to_real.remove(&surrogate)?;
        self.real_to_surrogate
            .remove_if(&real, |_, mapped| *mapped == surrogate);
        Some(real)
    }

    /// Remove `surrogate` when the real handle is no longer needed.
    /// Returns whether an entry was present.
    pub fn erase(&self, surrogate: u64) -> bool {
        self.pop(surrogate).is_some()
    }

    pub fn contains(&self, surrogate: u64) -> bool {
        self.surrogate_to_real.contains_key(&surrogate)
    }

    /// Return number of live surrogates.
    pub fn len(&self) -> usize {
        self.surrogate_to_real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surrogate_to_real.is_empty()
    }

    /// Drop every mapping. Only valid once no handle of this context can be
    /// used again (context teardown).
    pub fn clear(&self) {
        self.surrogate_to_real.clear();
        self.real_to_surrogate.clear();
    }
}

impl Default for UniqueIdMap {
    fn default() -> Self {
        Self::new()
    }
}
