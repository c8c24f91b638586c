//! Builtin identifiers

use crate::metadata::{self, BuiltinKind};

/// Base added to a builtin's index to form its continuation bytecode offset.
///
/// Well above any real bytecode offset, so continuation offsets and ordinary
/// offsets never collide.
pub const CONTINUATION_OFFSET_BASE: u32 = 1 << 30;

/// Identifier of a pre-compiled code stub.
///
/// Ids are dense: the tier-0 builtins occupy the prefix
/// `[FIRST, LAST_TIER0]`, bytecode handlers the tail
/// `[FIRST_BYTECODE_HANDLER, LAST]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum Builtin {
    // -------- Tier 0: installed before anything else runs --------
    InterpreterEntryTrampoline = 0,
    InterpreterEnterAtBytecode,
    CompileLazy,
    RecordWrite,
    AdaptorWithBuiltinExitFrame,

    // -------- Call family (receiver-coercion variants) --------
    CallFunctionReceiverIsNullOrUndefined,
    CallFunctionReceiverIsNotNullOrUndefined,
    CallFunctionReceiverIsAny,
    CallReceiverIsNullOrUndefined,
    CallReceiverIsNotNullOrUndefined,
    CallReceiverIsAny,

    // -------- ToPrimitive family --------
    NonPrimitiveToPrimitiveDefault,
    NonPrimitiveToPrimitiveNumber,
    NonPrimitiveToPrimitiveString,
    OrdinaryToPrimitiveNumber,
    OrdinaryToPrimitiveString,

    // -------- Conversion stubs carrying frame state --------
    ToNumber,
    ToString,

    // -------- Inline-cache handlers --------
    LoadIC,
    StoreIC,
    KeyedLoadIC,

    // -------- JS-linkage builtins --------
    ArrayPrototypePush,
    StringPrototypeIndexOf,
    StringPrototypeCharCodeAt,
    StringPrototypeToLowerCase,
    NumberPrototypeToString,
    DataViewPrototypeGetInt8,
    DataViewPrototypeGetUint8,
    DataViewPrototypeGetInt16,
    DataViewPrototypeGetUint16,
    DataViewPrototypeGetInt32,
    DataViewPrototypeGetUint32,
    DataViewPrototypeGetFloat32,
    DataViewPrototypeGetFloat64,
    DataViewPrototypeGetBigInt64,
    DataViewPrototypeGetBigUint64,
    DataViewPrototypeSetInt8,
    DataViewPrototypeSetUint8,
    DataViewPrototypeSetInt16,
    DataViewPrototypeSetUint16,
    DataViewPrototypeSetInt32,
    DataViewPrototypeSetUint32,
    DataViewPrototypeSetFloat32,
    DataViewPrototypeSetFloat64,
    DataViewPrototypeSetBigInt64,
    DataViewPrototypeSetBigUint64,

    // -------- Native runtime entries --------
    MathPow,
    MathFround,
    MathCbrt,

    // -------- Bytecode handlers (dense tail) --------
    AddHandler,
    CallHandler,
    JumpHandler,
    JumpLoopHandler,
    AddWideHandler,
    AddExtraWideHandler,
}

impl Builtin {
    /// First builtin id
    pub const FIRST: Builtin = Builtin::InterpreterEntryTrampoline;
    /// Last tier-0 builtin; tier-0 ids form the dense prefix `[FIRST, LAST_TIER0]`
    pub const LAST_TIER0: Builtin = Builtin::AdaptorWithBuiltinExitFrame;
    /// First bytecode handler; handlers form the dense tail up to `LAST`
    pub const FIRST_BYTECODE_HANDLER: Builtin = Builtin::AddHandler;
    /// Last builtin id
    pub const LAST: Builtin = Builtin::AddExtraWideHandler;

    /// Total number of builtins
    pub const COUNT: usize = Self::LAST.to_index() + 1;

    /// Number of tier-0 builtins
    pub const TIER0_COUNT: usize = Self::LAST_TIER0.to_index() + 1;

    /// Dense index of this builtin
    #[inline]
    pub const fn to_index(self) -> usize {
        self as u16 as usize
    }

    /// Builtin for a dense index, or `None` if out of range
    pub fn from_index(index: usize) -> Option<Builtin> {
        metadata::ALL_BUILTINS.get(index).copied()
    }

    /// Iterate over all builtins in id order
    pub fn all() -> impl Iterator<Item = Builtin> {
        metadata::ALL_BUILTINS.iter().copied()
    }

    /// Display name of this builtin
    pub fn name(self) -> &'static str {
        metadata::metadata(self).name
    }

    /// Kind of this builtin
    pub fn kind(self) -> BuiltinKind {
        metadata::metadata(self).kind
    }

    /// Short display string for this builtin's kind
    pub fn kind_name(self) -> &'static str {
        // Kept separate from BuiltinKind so dumps read like the linkage
        // shorthand used elsewhere in diagnostics.
        match metadata::metadata(self).kind {
            BuiltinKind::Native => "CPP",
            BuiltinKind::OptimizedJs => "TFJ",
            BuiltinKind::OptimizedStub => "TFC",
            BuiltinKind::OptimizedStubWithState => "TFS",
            BuiltinKind::Handler => "TFH",
            BuiltinKind::BytecodeHandler => "BCH",
            BuiltinKind::Assembly => "ASM",
        }
    }

    /// Whether this builtin belongs to the tier-0 prefix
    #[inline]
    pub fn is_tier0(self) -> bool {
        self <= Self::LAST_TIER0
    }

    /// Whether this builtin is a native-C entry
    #[inline]
    pub fn is_native(self) -> bool {
        self.kind() == BuiltinKind::Native
    }

    /// Whether this builtin is called with JS linkage
    #[inline]
    pub fn has_js_linkage(self) -> bool {
        self.kind() == BuiltinKind::OptimizedJs
    }

    /// Whether mid-tier continuations can resume into this builtin
    pub fn has_continuation(self) -> bool {
        matches!(
            self.kind(),
            BuiltinKind::OptimizedJs
                | BuiltinKind::OptimizedStub
                | BuiltinKind::OptimizedStubWithState
        )
    }

    /// Continuation bytecode offset for this builtin.
    ///
    /// # Panics
    ///
    /// Panics unless [`Builtin::has_continuation`] holds.
    pub fn continuation_bytecode_offset(self) -> u32 {
        assert!(
            self.has_continuation(),
            "{} ({}) has no continuation",
            self.name(),
            self.kind_name()
        );
        CONTINUATION_OFFSET_BASE + self.to_index() as u32
    }

    /// Inverse of [`Builtin::continuation_bytecode_offset`].
    ///
    /// # Panics
    ///
    /// Panics if `offset` does not denote a continuation builtin.
    pub fn from_continuation_offset(offset: u32) -> Builtin {
        let index = offset
            .checked_sub(CONTINUATION_OFFSET_BASE)
            .unwrap_or_else(|| panic!("offset {offset:#x} below the continuation base"));
        let builtin = Builtin::from_index(index as usize)
            .unwrap_or_else(|| panic!("offset {offset:#x} past the last builtin"));
        assert!(
            builtin.has_continuation(),
            "{} ({}) has no continuation",
            builtin.name(),
            builtin.kind_name()
        );
        builtin
    }

    /// Human-readable name for the small allowlist of internal builtins that
    /// may appear in stack traces; `None` for everything else.
    pub fn name_for_stack_trace(self) -> Option<&'static str> {
        // Builtins exposed to user code get their name from the object
        // referring to them; these internal ones would otherwise print
        // nothing useful.
        match self {
            Builtin::StringPrototypeIndexOf => Some("String.indexOf"),
            Builtin::StringPrototypeCharCodeAt => Some("String.charCodeAt"),
            Builtin::StringPrototypeToLowerCase => Some("String.toLowerCase"),
            Builtin::NumberPrototypeToString => Some("Number.toString"),
            Builtin::DataViewPrototypeGetInt8 => Some("DataView.getInt8"),
            Builtin::DataViewPrototypeGetUint8 => Some("DataView.getUint8"),
            Builtin::DataViewPrototypeGetInt16 => Some("DataView.getInt16"),
            Builtin::DataViewPrototypeGetUint16 => Some("DataView.getUint16"),
            Builtin::DataViewPrototypeGetInt32 => Some("DataView.getInt32"),
            Builtin::DataViewPrototypeGetUint32 => Some("DataView.getUint32"),
            Builtin::DataViewPrototypeGetFloat32 => Some("DataView.getFloat32"),
            Builtin::DataViewPrototypeGetFloat64 => Some("DataView.getFloat64"),
            Builtin::DataViewPrototypeGetBigInt64 => Some("DataView.getBigInt64"),
            Builtin::DataViewPrototypeGetBigUint64 => Some("DataView.getBigUint64"),
            Builtin::DataViewPrototypeSetInt8 => Some("DataView.setInt8"),
            Builtin::DataViewPrototypeSetUint8 => Some("DataView.setUint8"),
            Builtin::DataViewPrototypeSetInt16 => Some("DataView.setInt16"),
            Builtin::DataViewPrototypeSetUint16 => Some("DataView.setUint16"),
            Builtin::DataViewPrototypeSetInt32 => Some("DataView.setInt32"),
            Builtin::DataViewPrototypeSetUint32 => Some("DataView.setUint32"),
            Builtin::DataViewPrototypeSetFloat32 => Some("DataView.setFloat32"),
            Builtin::DataViewPrototypeSetFloat64 => Some("DataView.setFloat64"),
            Builtin::DataViewPrototypeSetBigInt64 => Some("DataView.setBigInt64"),
            Builtin::DataViewPrototypeSetBigUint64 => Some("DataView.setBigUint64"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for builtin in Builtin::all() {
            assert_eq!(Builtin::from_index(builtin.to_index()), Some(builtin));
        }
        assert_eq!(Builtin::from_index(Builtin::COUNT), None);
    }

    #[test]
    fn test_tier0_is_dense_prefix() {
        let tier0: Vec<_> = Builtin::all().filter(|b| b.is_tier0()).collect();
        assert_eq!(tier0.len(), Builtin::TIER0_COUNT);
        for (index, builtin) in tier0.iter().enumerate() {
            assert_eq!(builtin.to_index(), index);
        }
    }

    #[test]
    fn test_bytecode_handlers_are_dense_tail() {
        for builtin in Builtin::all() {
            let in_tail = builtin >= Builtin::FIRST_BYTECODE_HANDLER;
            assert_eq!(
                builtin.kind() == BuiltinKind::BytecodeHandler,
                in_tail,
                "{} must be a bytecode handler iff it sits in the tail",
                builtin.name()
            );
        }
    }

    #[test]
    fn test_continuation_offset_bijection() {
        for builtin in Builtin::all().filter(|b| b.has_continuation()) {
            let offset = builtin.continuation_bytecode_offset();
            assert_eq!(Builtin::from_continuation_offset(offset), builtin);
        }
    }

    #[test]
    #[should_panic(expected = "has no continuation")]
    fn test_continuation_offset_rejects_handlers() {
        let _ = Builtin::LoadIC.continuation_bytecode_offset();
    }

    #[test]
    fn test_stack_trace_allowlist() {
        assert_eq!(
            Builtin::DataViewPrototypeGetFloat64.name_for_stack_trace(),
            Some("DataView.getFloat64")
        );
        assert_eq!(
            Builtin::StringPrototypeIndexOf.name_for_stack_trace(),
            Some("String.indexOf")
        );
        assert_eq!(Builtin::CallReceiverIsAny.name_for_stack_trace(), None);
        assert_eq!(Builtin::MathPow.name_for_stack_trace(), None);
    }
}
