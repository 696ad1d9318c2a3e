//! Sable compiler backend (sablec)
//!
//! Lowers checked Sable programs to class files for a stack-based virtual
//! machine. The front-end hands this crate a typed tree; everything after
//! that point lives here.
//!
//! ## Architecture
//!
//! - **ast**: the typed program tree consumed by the backend
//! - **types**: interned type catalog mapping source types to descriptors
//! - **codegen**: slot allocation, expression/statement lowering, and the
//!   class and method assembler
//! - **classfile**: constant pool, member structures, attributes and the
//!   binary serializer
//! - **common**: configuration, diagnostics and error types
//!
//! ## Lowering Flow
//!
//! ```text
//! Typed Tree → Slot/Scope Allocation → Lowering → Assembly → .class bytes
//!                                         ↓
//!                     expressions, control flow, ctor/<clinit> synthesis
//! ```

pub mod ast;
pub mod classfile;
pub mod codegen;
pub mod common;
pub mod types;

pub use codegen::{lower_unit, lower_unit_to_classfiles, EmittedClass};
pub use common::{Config, Diagnostic, DiagnosticKind, Error, Result};

/// Lower a checked program to serialized class files.
///
/// One [`EmittedClass`] comes back per class in the unit: the module class
/// holding the top-level functions first, then every declared class in
/// source order. User-facing problems are collected across declarations and
/// returned together as [`Error::Compile`].
pub fn lower(program: &ast::Program, config: &Config) -> Result<Vec<EmittedClass>> {
    tracing::debug!(unit = %program.name, "lowering program");
    codegen::lower_unit(program, config)
}
