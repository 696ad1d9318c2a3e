//! The class-file constructor library: constant pool, member structures,
//! attributes and the binary serializer.
//!
//! This layer knows nothing about the Sable language; it only exposes the
//! "emit class / emit member / emit attribute" primitives the assembler in
//! [`crate::codegen`] builds on.

pub mod attribute;
pub mod class;
pub mod constpool;
pub mod defs;
pub mod flags;
pub mod opcodes;
pub mod writer;

pub use class::{ClassFile, FieldInfo, MethodInfo};
pub use constpool::{Constant, ConstantPool};
pub use writer::class_file_to_bytes;
