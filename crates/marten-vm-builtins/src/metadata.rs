//! The static builtin catalog

use marten_vm_bytecode::{Opcode, OperandScale};

use crate::builtin::Builtin;
use crate::native::{self, NativeFunction};

/// Kind of a builtin, determining its linkage and kind-specific data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    /// Native-C runtime entry; kind data is the entry function
    Native,
    /// Optimized stub called with JS linkage; kind data is the stack
    /// parameter count
    OptimizedJs,
    /// Optimized stub with plain stub linkage
    OptimizedStub,
    /// Optimized stub whose linkage carries frame state
    OptimizedStubWithState,
    /// Inline-cache handler
    Handler,
    /// Interpreter dispatch-table entry; kind data is the (bytecode,
    /// operand-scale) pair it handles
    BytecodeHandler,
    /// Hand-written assembly
    Assembly,
}

/// Kind-specific payload of a builtin record.
///
/// The variant always corresponds to the record's [`BuiltinKind`].
#[derive(Debug, Clone, Copy)]
pub enum KindData {
    /// No payload (stubs, handlers, assembly)
    None,
    /// Entry function of a native-C builtin
    NativeEntry(NativeFunction),
    /// Stack parameter count of a JS-linkage builtin
    ParameterCount(u16),
    /// The (bytecode, operand-scale) pair of a bytecode handler
    BytecodeAndScale(Opcode, OperandScale),
}

/// One record of the catalog; immutable after program start
#[derive(Debug, Clone, Copy)]
pub struct BuiltinMetadata {
    /// Display name
    pub name: &'static str,
    /// Builtin kind
    pub kind: BuiltinKind,
    /// Kind-specific payload
    pub data: KindData,
}

const fn asm(name: &'static str) -> BuiltinMetadata {
    BuiltinMetadata {
        name,
        kind: BuiltinKind::Assembly,
        data: KindData::None,
    }
}

const fn stub(name: &'static str) -> BuiltinMetadata {
    BuiltinMetadata {
        name,
        kind: BuiltinKind::OptimizedStub,
        data: KindData::None,
    }
}

const fn stub_with_state(name: &'static str) -> BuiltinMetadata {
    BuiltinMetadata {
        name,
        kind: BuiltinKind::OptimizedStubWithState,
        data: KindData::None,
    }
}

const fn handler(name: &'static str) -> BuiltinMetadata {
    BuiltinMetadata {
        name,
        kind: BuiltinKind::Handler,
        data: KindData::None,
    }
}

const fn js(name: &'static str, parameter_count: u16) -> BuiltinMetadata {
    BuiltinMetadata {
        name,
        kind: BuiltinKind::OptimizedJs,
        data: KindData::ParameterCount(parameter_count),
    }
}

const fn cpp(name: &'static str, entry: NativeFunction) -> BuiltinMetadata {
    BuiltinMetadata {
        name,
        kind: BuiltinKind::Native,
        data: KindData::NativeEntry(entry),
    }
}

const fn bch(name: &'static str, bytecode: Opcode, scale: OperandScale) -> BuiltinMetadata {
    BuiltinMetadata {
        name,
        kind: BuiltinKind::BytecodeHandler,
        data: KindData::BytecodeAndScale(bytecode, scale),
    }
}

/// The catalog, indexed by builtin id. Table order must equal id order;
/// [`metadata`] checks this in debug builds and the test suite checks it
/// exhaustively.
pub static METADATA: [BuiltinMetadata; Builtin::COUNT] = [
    // Tier 0
    asm("InterpreterEntryTrampoline"),
    asm("InterpreterEnterAtBytecode"),
    stub("CompileLazy"),
    stub("RecordWrite"),
    asm("AdaptorWithBuiltinExitFrame"),
    // Call family
    asm("CallFunction_ReceiverIsNullOrUndefined"),
    asm("CallFunction_ReceiverIsNotNullOrUndefined"),
    asm("CallFunction_ReceiverIsAny"),
    asm("Call_ReceiverIsNullOrUndefined"),
    asm("Call_ReceiverIsNotNullOrUndefined"),
    asm("Call_ReceiverIsAny"),
    // ToPrimitive family
    stub("NonPrimitiveToPrimitive_Default"),
    stub("NonPrimitiveToPrimitive_Number"),
    stub("NonPrimitiveToPrimitive_String"),
    stub("OrdinaryToPrimitive_Number"),
    stub("OrdinaryToPrimitive_String"),
    // Conversion stubs carrying frame state
    stub_with_state("ToNumber"),
    stub_with_state("ToString"),
    // Inline-cache handlers
    handler("LoadIC"),
    handler("StoreIC"),
    handler("KeyedLoadIC"),
    // JS linkage
    js("ArrayPrototypePush", 1),
    js("StringPrototypeIndexOf", 1),
    js("StringPrototypeCharCodeAt", 1),
    js("StringPrototypeToLowerCase", 0),
    js("NumberPrototypeToString", 1),
    js("DataViewPrototypeGetInt8", 1),
    js("DataViewPrototypeGetUint8", 1),
    js("DataViewPrototypeGetInt16", 1),
    js("DataViewPrototypeGetUint16", 1),
    js("DataViewPrototypeGetInt32", 1),
    js("DataViewPrototypeGetUint32", 1),
    js("DataViewPrototypeGetFloat32", 1),
    js("DataViewPrototypeGetFloat64", 1),
    js("DataViewPrototypeGetBigInt64", 1),
    js("DataViewPrototypeGetBigUint64", 1),
    js("DataViewPrototypeSetInt8", 2),
    js("DataViewPrototypeSetUint8", 2),
    js("DataViewPrototypeSetInt16", 2),
    js("DataViewPrototypeSetUint16", 2),
    js("DataViewPrototypeSetInt32", 2),
    js("DataViewPrototypeSetUint32", 2),
    js("DataViewPrototypeSetFloat32", 2),
    js("DataViewPrototypeSetFloat64", 2),
    js("DataViewPrototypeSetBigInt64", 2),
    js("DataViewPrototypeSetBigUint64", 2),
    // Native runtime entries
    cpp("MathPow", native::math_pow),
    cpp("MathFround", native::math_fround),
    cpp("MathCbrt", native::math_cbrt),
    // Bytecode handlers
    bch("AddHandler", Opcode::Add, OperandScale::Single),
    bch("CallHandler", Opcode::Call, OperandScale::Single),
    bch("JumpHandler", Opcode::Jump, OperandScale::Single),
    bch("JumpLoopHandler", Opcode::JumpLoop, OperandScale::Single),
    bch("AddWideHandler", Opcode::Add, OperandScale::Double),
    bch("AddExtraWideHandler", Opcode::Add, OperandScale::Quadruple),
];

/// All builtins in id order
pub static ALL_BUILTINS: [Builtin; Builtin::COUNT] = [
    Builtin::InterpreterEntryTrampoline,
    Builtin::InterpreterEnterAtBytecode,
    Builtin::CompileLazy,
    Builtin::RecordWrite,
    Builtin::AdaptorWithBuiltinExitFrame,
    Builtin::CallFunctionReceiverIsNullOrUndefined,
    Builtin::CallFunctionReceiverIsNotNullOrUndefined,
    Builtin::CallFunctionReceiverIsAny,
    Builtin::CallReceiverIsNullOrUndefined,
    Builtin::CallReceiverIsNotNullOrUndefined,
    Builtin::CallReceiverIsAny,
    Builtin::NonPrimitiveToPrimitiveDefault,
    Builtin::NonPrimitiveToPrimitiveNumber,
    Builtin::NonPrimitiveToPrimitiveString,
    Builtin::OrdinaryToPrimitiveNumber,
    Builtin::OrdinaryToPrimitiveString,
    Builtin::ToNumber,
    Builtin::ToString,
    Builtin::LoadIC,
    Builtin::StoreIC,
    Builtin::KeyedLoadIC,
    Builtin::ArrayPrototypePush,
    Builtin::StringPrototypeIndexOf,
    Builtin::StringPrototypeCharCodeAt,
    Builtin::StringPrototypeToLowerCase,
    Builtin::NumberPrototypeToString,
    Builtin::DataViewPrototypeGetInt8,
    Builtin::DataViewPrototypeGetUint8,
    Builtin::DataViewPrototypeGetInt16,
    Builtin::DataViewPrototypeGetUint16,
    Builtin::DataViewPrototypeGetInt32,
    Builtin::DataViewPrototypeGetUint32,
    Builtin::DataViewPrototypeGetFloat32,
    Builtin::DataViewPrototypeGetFloat64,
    Builtin::DataViewPrototypeGetBigInt64,
    Builtin::DataViewPrototypeGetBigUint64,
    Builtin::DataViewPrototypeSetInt8,
    Builtin::DataViewPrototypeSetUint8,
    Builtin::DataViewPrototypeSetInt16,
    Builtin::DataViewPrototypeSetUint16,
    Builtin::DataViewPrototypeSetInt32,
    Builtin::DataViewPrototypeSetUint32,
    Builtin::DataViewPrototypeSetFloat32,
    Builtin::DataViewPrototypeSetFloat64,
    Builtin::DataViewPrototypeSetBigInt64,
    Builtin::DataViewPrototypeSetBigUint64,
    Builtin::MathPow,
    Builtin::MathFround,
    Builtin::MathCbrt,
    Builtin::AddHandler,
    Builtin::CallHandler,
    Builtin::JumpHandler,
    Builtin::JumpLoopHandler,
    Builtin::AddWideHandler,
    Builtin::AddExtraWideHandler,
];

/// Catalog record for a builtin
pub fn metadata(builtin: Builtin) -> &'static BuiltinMetadata {
    debug_assert_eq!(ALL_BUILTINS[builtin.to_index()], builtin);
    &METADATA[builtin.to_index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_id_order() {
        for (index, builtin) in ALL_BUILTINS.iter().enumerate() {
            assert_eq!(builtin.to_index(), index, "{} out of order", builtin.name());
        }
    }

    #[test]
    fn test_kind_data_matches_kind() {
        for builtin in Builtin::all() {
            let record = metadata(builtin);
            let consistent = match (record.kind, record.data) {
                (BuiltinKind::Native, KindData::NativeEntry(_)) => true,
                (BuiltinKind::OptimizedJs, KindData::ParameterCount(_)) => true,
                (BuiltinKind::BytecodeHandler, KindData::BytecodeAndScale(..)) => true,
                (
                    BuiltinKind::OptimizedStub
                    | BuiltinKind::OptimizedStubWithState
                    | BuiltinKind::Handler
                    | BuiltinKind::Assembly,
                    KindData::None,
                ) => true,
                _ => false,
            };
            assert!(consistent, "{} has mismatched kind data", record.name);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = METADATA.iter().map(|record| record.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Builtin::COUNT);
    }
}
