//! Per-context memo of previously successful OSR entry points

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::function::{OsrCodeCacheState, SfiId, SharedFunctionInfo};

/// Bytecode size a function may have for OSR with zero ticks observed
pub const OSR_BYTECODE_SIZE_ALLOWANCE_BASE: usize = 119;
/// Additional allowed bytecode size per observed tick
pub const OSR_BYTECODE_SIZE_ALLOWANCE_PER_TICK: usize = 44;

/// Maps a shared function info to the `JumpLoop` offsets of loops that have
/// previously been OSR'd in this native context.
///
/// Only loop back-edge offsets are recorded; the decision path re-derives
/// each loop's header from the bytecode.
#[derive(Debug, Default)]
pub struct OsrCodeCache {
    offsets: RwLock<FxHashMap<SfiId, Vec<usize>>>,
}

impl OsrCodeCache {
    /// Empty cache for a fresh native context
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful OSR at the `JumpLoop` at `jump_offset` and flip
    /// the shared info's cache state.
    pub fn insert(&self, shared: &SharedFunctionInfo, jump_offset: usize) {
        let mut offsets = self.offsets.write();
        let entries = offsets.entry(shared.id()).or_default();
        if let Err(position) = entries.binary_search(&jump_offset) {
            entries.insert(position, jump_offset);
        }
        shared.set_osr_code_cache_state(OsrCodeCacheState::CachedWithEntries);
    }

    /// The recorded `JumpLoop` offsets for `shared`, in ascending order
    pub fn bytecode_offsets_for(&self, shared: &SharedFunctionInfo) -> Vec<usize> {
        self.offsets
            .read()
            .get(&shared.id())
            .cloned()
            .unwrap_or_default()
    }
}
