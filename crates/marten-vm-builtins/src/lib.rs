//! # Marten VM Builtins
//!
//! Static catalog of the VM's pre-compiled code stubs ("builtins") and the
//! per-isolate tables that hold their installed code.
//!
//! Every builtin has a stable integer id. The catalog maps each id to its
//! kind, its kind-specific linkage data and its display name; the per-isolate
//! [`Builtins`] object adds the installed [`Code`] descriptors, the entry
//! tables consulted by generated code, and reverse lookup from a program
//! counter back to a builtin id.
//!
//! All lookups on invalid ids are programming errors and panic; the registry
//! has no I/O failure paths.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod builtin;
pub mod code;
pub mod embedded;
pub mod events;
pub mod metadata;
pub mod native;
pub mod registry;

pub use builtin::{Builtin, CONTINUATION_OFFSET_BASE};
pub use code::Code;
pub use embedded::EmbeddedBlob;
pub use events::{CodeEventLogger, CodeTag};
pub use metadata::{BuiltinKind, KindData};
pub use native::NativeFunction;
pub use registry::{
    Builtins, ContextId, ConvertReceiverMode, OrdinaryToPrimitiveHint, ToPrimitiveHint,
    allow_dynamic_function,
};
