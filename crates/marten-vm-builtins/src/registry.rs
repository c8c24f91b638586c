//! Per-isolate builtin tables and lookups

use std::io::{self, Write};

use crate::builtin::Builtin;
use crate::code::Code;
use crate::embedded::EmbeddedBlob;
use crate::events::{CodeEventLogger, CodeTag};
use crate::metadata::{self, BuiltinKind, KindData};
use crate::native::NativeFunction;

/// Identifier of a native context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ContextId(pub u64);

/// Receiver-coercion variant of the call builtins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertReceiverMode {
    /// Receiver is statically known to be null or undefined
    NullOrUndefined,
    /// Receiver is statically known to be neither null nor undefined
    NotNullOrUndefined,
    /// Receiver may be anything
    Any,
}

/// Hint passed to `ToPrimitive` on a non-primitive receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToPrimitiveHint {
    /// No preference
    Default,
    /// Prefer a number
    Number,
    /// Prefer a string
    String,
}

/// Hint passed to `OrdinaryToPrimitive`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdinaryToPrimitiveHint {
    /// valueOf before toString
    Number,
    /// toString before valueOf
    String,
}

/// The per-isolate builtins object.
///
/// Owns the builtin table (a contiguous array of [`Code`] descriptors indexed
/// by builtin id, whose address range doubles as the identity test behind
/// [`Builtins::is_builtin_handle`]), the entry tables consulted by generated
/// code, and the tier-0 mirrors of both over the dense prefix.
///
/// The tables are written during isolate initialization and read-only
/// afterwards; there are no concurrent writers.
pub struct Builtins {
    embedded: EmbeddedBlob,
    table: Box<[Code]>,
    entry_table: Box<[usize]>,
    tier0_table: Box<[Code]>,
    tier0_entry_table: Box<[usize]>,
    initialized: bool,
}

impl Builtins {
    /// Create the tables for a fresh isolate. Slots hold placeholder
    /// descriptors until code is installed with [`Builtins::set_code`].
    pub fn new(embedded: EmbeddedBlob) -> Self {
        debug_assert!(
            Builtin::all()
                .enumerate()
                .all(|(index, builtin)| builtin.to_index() == index),
            "catalog order must equal id order"
        );
        let table: Box<[Code]> = Builtin::all().map(Code::uninstalled).collect();
        let tier0_table: Box<[Code]> = Builtin::all()
            .take(Builtin::TIER0_COUNT)
            .map(Code::uninstalled)
            .collect();
        Self {
            embedded,
            table,
            entry_table: vec![0; Builtin::COUNT].into_boxed_slice(),
            tier0_table,
            tier0_entry_table: vec![0; Builtin::TIER0_COUNT].into_boxed_slice(),
            initialized: false,
        }
    }

    /// Display name of `builtin`
    pub fn name(builtin: Builtin) -> &'static str {
        builtin.name()
    }

    /// Kind of `builtin`
    pub fn kind(builtin: Builtin) -> BuiltinKind {
        builtin.kind()
    }

    /// Install the compiled code object for `builtin`.
    ///
    /// The slot may be uninitialized or hold a previous installation.
    ///
    /// # Panics
    ///
    /// Panics unless `code.builtin_id == builtin`.
    pub fn set_code(&mut self, builtin: Builtin, code: Code) {
        assert_eq!(
            code.builtin_id,
            builtin,
            "installing code for {} into the {} slot",
            code.builtin_id.name(),
            builtin.name()
        );
        self.table[builtin.to_index()] = code;
        if builtin.is_tier0() {
            self.tier0_table[builtin.to_index()] = code;
        }
    }

    /// The installed code descriptor of `builtin`
    pub fn code(&self, builtin: Builtin) -> Code {
        self.table[builtin.to_index()]
    }

    /// Handle to the table slot of `builtin`.
    ///
    /// The handle's address identifies the slot; see
    /// [`Builtins::is_builtin_handle`].
    pub fn code_handle(&self, builtin: Builtin) -> &Code {
        &self.table[builtin.to_index()]
    }

    /// Instruction-start entry of `builtin`, as consulted by generated code.
    /// Zero until [`Builtins::initialize_isolate_tables`] has run.
    pub fn entry(&self, builtin: Builtin) -> usize {
        self.entry_table[builtin.to_index()]
    }

    /// Entry function of a native-C builtin.
    ///
    /// # Panics
    ///
    /// Panics unless `builtin.kind() == BuiltinKind::Native`.
    pub fn cpp_entry(builtin: Builtin) -> NativeFunction {
        match metadata::metadata(builtin).data {
            KindData::NativeEntry(entry) => entry,
            _ => panic!("{} is not a native-C builtin", builtin.name()),
        }
    }

    /// Stack parameter count of a JS-linkage builtin.
    ///
    /// # Panics
    ///
    /// Panics unless `builtin.kind() == BuiltinKind::OptimizedJs`.
    pub fn stack_parameter_count(builtin: Builtin) -> u16 {
        match metadata::metadata(builtin).data {
            KindData::ParameterCount(count) => count,
            _ => panic!("{} is not called with JS linkage", builtin.name()),
        }
    }

    /// Map a program counter to the builtin whose instruction range contains
    /// it.
    ///
    /// Consults the embedded blob's binary-searchable layout first; if that
    /// misses and the isolate tables are fully initialized, falls back to a
    /// linear scan over the installed code ranges.
    pub fn lookup(&self, pc: usize) -> Option<Builtin> {
        if let Some(builtin) = self.embedded.try_lookup(pc) {
            return Some(builtin);
        }
        // May be called during initialization (disassembler).
        if !self.initialized {
            return None;
        }
        self.table
            .iter()
            .find(|code| code.contains(pc))
            .map(|code| code.builtin_id)
    }

    /// Whether `handle` addresses a slot inside the builtin table, and which.
    ///
    /// A pure address-range check: the table is contiguous, so slot identity
    /// is pointer identity.
    pub fn is_builtin_handle(&self, handle: &Code) -> Option<Builtin> {
        let base = self.table.as_ptr() as usize;
        let end = base + self.table.len() * std::mem::size_of::<Code>();
        let address = handle as *const Code as usize;
        if address < base || address >= end {
            return None;
        }
        let index = (address - base) / std::mem::size_of::<Code>();
        Builtin::from_index(index)
    }

    /// Whether `code` is the currently installed descriptor of its builtin
    pub fn is_builtin_code(&self, code: &Code) -> bool {
        self.code(code.builtin_id) == *code
    }

    /// Populate the entry table with instruction-start addresses from the
    /// embedded blob and mirror the dense tier-0 prefix into its own tables.
    ///
    /// Call after all builtin code has been installed; marks the registry
    /// fully initialized, enabling the linear-scan fallback in
    /// [`Builtins::lookup`].
    pub fn initialize_isolate_tables(&mut self) {
        for builtin in Builtin::all() {
            debug_assert_eq!(self.code(builtin).builtin_id, builtin);
            self.entry_table[builtin.to_index()] = self.embedded.instruction_start_of(builtin);
        }
        for index in 0..Builtin::TIER0_COUNT {
            self.tier0_entry_table[index] = self.entry_table[index];
            self.tier0_table[index] = self.table[index];
        }
        self.initialized = true;
    }

    /// Drop the initialized flag; [`Builtins::lookup`] then answers from the
    /// embedded blob only.
    pub fn teardown(&mut self) {
        self.initialized = false;
    }

    /// Whether [`Builtins::initialize_isolate_tables`] has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// One-shot traversal at logger-enable time: emit a creation event for
    /// every builtin. Bytecode handlers are named after the (bytecode, scale)
    /// pair they dispatch.
    pub fn emit_code_create_events(&self, logger: &mut dyn CodeEventLogger) {
        for builtin in Builtin::all().take(Builtin::FIRST_BYTECODE_HANDLER.to_index()) {
            logger.code_create_event(
                CodeTag::Builtin,
                &self.table[builtin.to_index()],
                builtin.name(),
            );
        }
        for builtin in Builtin::all().skip(Builtin::FIRST_BYTECODE_HANDLER.to_index()) {
            let KindData::BytecodeAndScale(bytecode, scale) = metadata::metadata(builtin).data
            else {
                unreachable!("the builtin tail holds only bytecode handlers");
            };
            let name = format!("{}{}", bytecode.name(), scale.name_suffix());
            logger.code_create_event(
                CodeTag::BytecodeHandler,
                &self.table[builtin.to_index()],
                &name,
            );
        }
    }

    /// `CallFunction` variant for a receiver mode
    pub fn call_function(&self, mode: ConvertReceiverMode) -> &Code {
        match mode {
            ConvertReceiverMode::NullOrUndefined => {
                self.code_handle(Builtin::CallFunctionReceiverIsNullOrUndefined)
            }
            ConvertReceiverMode::NotNullOrUndefined => {
                self.code_handle(Builtin::CallFunctionReceiverIsNotNullOrUndefined)
            }
            ConvertReceiverMode::Any => self.code_handle(Builtin::CallFunctionReceiverIsAny),
        }
    }

    /// `Call` variant for a receiver mode
    pub fn call(&self, mode: ConvertReceiverMode) -> &Code {
        match mode {
            ConvertReceiverMode::NullOrUndefined => {
                self.code_handle(Builtin::CallReceiverIsNullOrUndefined)
            }
            ConvertReceiverMode::NotNullOrUndefined => {
                self.code_handle(Builtin::CallReceiverIsNotNullOrUndefined)
            }
            ConvertReceiverMode::Any => self.code_handle(Builtin::CallReceiverIsAny),
        }
    }

    /// `NonPrimitiveToPrimitive` variant for a hint
    pub fn non_primitive_to_primitive(&self, hint: ToPrimitiveHint) -> &Code {
        match hint {
            ToPrimitiveHint::Default => self.code_handle(Builtin::NonPrimitiveToPrimitiveDefault),
            ToPrimitiveHint::Number => self.code_handle(Builtin::NonPrimitiveToPrimitiveNumber),
            ToPrimitiveHint::String => self.code_handle(Builtin::NonPrimitiveToPrimitiveString),
        }
    }

    /// `OrdinaryToPrimitive` variant for a hint
    pub fn ordinary_to_primitive(&self, hint: OrdinaryToPrimitiveHint) -> &Code {
        match hint {
            OrdinaryToPrimitiveHint::Number => self.code_handle(Builtin::OrdinaryToPrimitiveNumber),
            OrdinaryToPrimitiveHint::String => self.code_handle(Builtin::OrdinaryToPrimitiveString),
        }
    }

    /// Dump one line per builtin: kind, name, installed instruction size.
    pub fn print_builtin_size(&self, sink: &mut dyn Write) -> io::Result<()> {
        for builtin in Builtin::all() {
            writeln!(
                sink,
                "{} Builtin, {}, {}",
                builtin.kind_name(),
                builtin.name(),
                self.code(builtin).instruction_size
            )?;
        }
        Ok(())
    }
}

/// Whether dynamic function construction (the `Function` constructor) is
/// permitted for a target in `target_context`, given the context responsible
/// for the call.
pub fn allow_dynamic_function(
    allow_unsafe_function_constructor: bool,
    responsible_context: Option<ContextId>,
    target_context: ContextId,
) -> bool {
    if allow_unsafe_function_constructor {
        return true;
    }
    match responsible_context {
        None => true,
        Some(context) => context == target_context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_blob() -> EmbeddedBlob {
        EmbeddedBlob::from_sizes(0x4_0000, &[0x40; Builtin::COUNT])
    }

    fn installed_builtins() -> Builtins {
        let blob = test_blob();
        let mut builtins = Builtins::new(blob.clone());
        for builtin in Builtin::all() {
            builtins.set_code(
                builtin,
                Code::new(
                    builtin,
                    blob.instruction_start_of(builtin),
                    blob.instruction_size_of(builtin),
                ),
            );
        }
        builtins.initialize_isolate_tables();
        builtins
    }

    #[test]
    fn test_set_code_updates_tier0_mirror() {
        let mut builtins = Builtins::new(test_blob());
        let code = Code::new(Builtin::CompileLazy, 0x9000, 0x10);
        builtins.set_code(Builtin::CompileLazy, code);
        assert_eq!(builtins.tier0_table[Builtin::CompileLazy.to_index()], code);
    }

    #[test]
    #[should_panic(expected = "installing code for")]
    fn test_set_code_rejects_mismatched_id() {
        let mut builtins = Builtins::new(test_blob());
        builtins.set_code(Builtin::LoadIC, Code::new(Builtin::StoreIC, 0x9000, 0x10));
    }

    #[test]
    fn test_is_builtin_handle_identifies_slots() {
        let builtins = installed_builtins();
        for builtin in Builtin::all() {
            let handle = builtins.code_handle(builtin);
            assert_eq!(builtins.is_builtin_handle(handle), Some(builtin));
        }
        let foreign = Code::new(Builtin::LoadIC, 0x1234, 0x10);
        assert_eq!(builtins.is_builtin_handle(&foreign), None);
    }

    #[test]
    fn test_selector_dispatch() {
        let builtins = installed_builtins();
        assert_eq!(
            builtins.call_function(ConvertReceiverMode::Any).builtin_id,
            Builtin::CallFunctionReceiverIsAny
        );
        assert_eq!(
            builtins.call(ConvertReceiverMode::NullOrUndefined).builtin_id,
            Builtin::CallReceiverIsNullOrUndefined
        );
        assert_eq!(
            builtins
                .non_primitive_to_primitive(ToPrimitiveHint::Number)
                .builtin_id,
            Builtin::NonPrimitiveToPrimitiveNumber
        );
        assert_eq!(
            builtins
                .ordinary_to_primitive(OrdinaryToPrimitiveHint::String)
                .builtin_id,
            Builtin::OrdinaryToPrimitiveString
        );
    }

    #[test]
    fn test_cpp_entry_is_callable() {
        let entry = Builtins::cpp_entry(Builtin::MathPow);
        let result = entry(&[2.0f64.to_bits(), 10.0f64.to_bits()]);
        assert_eq!(f64::from_bits(result), 1024.0);
    }

    #[test]
    #[should_panic(expected = "is not a native-C builtin")]
    fn test_cpp_entry_rejects_non_native() {
        let _ = Builtins::cpp_entry(Builtin::ToNumber);
    }

    #[test]
    fn test_stack_parameter_count() {
        assert_eq!(
            Builtins::stack_parameter_count(Builtin::DataViewPrototypeSetFloat64),
            2
        );
    }

    #[test]
    fn test_allow_dynamic_function() {
        let a = ContextId(1);
        let b = ContextId(2);
        assert!(allow_dynamic_function(true, Some(a), b));
        assert!(allow_dynamic_function(false, None, b));
        assert!(allow_dynamic_function(false, Some(a), a));
        assert!(!allow_dynamic_function(false, Some(a), b));
    }
}
