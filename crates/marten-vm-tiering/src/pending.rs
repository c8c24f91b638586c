//! Deterministic-test allowlist for heuristic tiering

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::function::{JsFunction, SfiId};

/// Allowlist consulted when the deterministic test harness is active: with
/// `testing_test_runner` set, heuristic tiering only acts on functions
/// explicitly placed here, so tests control tier-up through manual markers.
///
/// Keyed by shared function info; single-threaded use.
#[derive(Debug, Default)]
pub struct PendingOptimizationTable {
    allowed: RwLock<FxHashSet<SfiId>>,
}

impl PendingOptimizationTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `function` on the allowlist
    pub fn allow_heuristic_optimization(&self, function: &JsFunction) {
        self.allowed.write().insert(function.shared().id());
    }

    /// Whether heuristic tiering may act on `function`
    pub fn is_heuristic_optimization_allowed(&self, function: &JsFunction) -> bool {
        self.allowed.read().contains(&function.shared().id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::SharedFunctionInfo;
    use marten_vm_bytecode::BytecodeArray;
    use std::sync::Arc;

    #[test]
    fn test_allowlist_membership() {
        let bytecode = Arc::new(BytecodeArray::builder().ret().build());
        let allowed = JsFunction::new(SharedFunctionInfo::new("a", Arc::clone(&bytecode)));
        let other = JsFunction::new(SharedFunctionInfo::new("b", bytecode));

        let table = PendingOptimizationTable::new();
        table.allow_heuristic_optimization(&allowed);

        assert!(table.is_heuristic_optimization_allowed(&allowed));
        assert!(!table.is_heuristic_optimization_allowed(&other));
    }
}
