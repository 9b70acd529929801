//! FasterBASIC Runtime ABI
//!
//! The C runtime library itself (string descriptors, array descriptors,
//! math intrinsics, PRINT/INPUT, DATA/READ, RNG, file I/O) is explicitly
//! out of scope for this crate (spec §1, §6): it is a collaborator,
//! specified only at its interface. This crate *is* that interface: the
//! binary layouts of §3.6/§3.7 as `#[repr(C)]` structs, the exception
//! context of §4.7, and the typed call-signature table that
//! `fbasic-compiler`'s `RuntimeLibrary` codegen component emits calls
//! against (spec §4.5.4).
//!
//! Nothing here is linked against a real runtime; the `extern "C"` blocks
//! declare signatures only, the same way the teacher's `codegen/runtime.rs`
//! emits `declare` lines for a library it never implements.

pub mod abi_type;
pub mod descriptors;
pub mod signatures;

pub use abi_type::AbiType;
pub use descriptors::{ArrayDescriptor, ExceptionContext, StringDescriptor};
pub use signatures::{RuntimeFunction, RUNTIME_FUNCTIONS};
