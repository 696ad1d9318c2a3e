use crate::ast::Span;
use thiserror::Error;

/// Result type for sablec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Compile diagnostics that the source author can act on.
///
/// These are collected during lowering; one bad declaration does not stop
/// the remaining declarations from being lowered, so a single run can
/// surface several of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Reassignment of an immutable binding outside its initializer
    ImmutableAssignment,
    /// Second declaration of a name in the same scope
    DuplicateBinding,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "error at line {}, column {}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

/// Error types for the sablec backend
#[derive(Error, Debug)]
pub enum Error {
    /// One or more user-facing compile errors; no class files were emitted.
    #[error("compilation failed with {} error(s)", .0.len())]
    Compile(Vec<Diagnostic>),

    /// A single diagnostic unwinding out of the declaration being lowered.
    /// Callers at the declaration boundary convert this into a `Compile`
    /// entry and move on to the next declaration.
    #[error("{0}")]
    Diagnostic(Diagnostic),

    #[error("code generation error: {message}")]
    CodeGen { message: String },

    /// A defect in this backend or in the front-end that fed it; the unit
    /// is abandoned with no partial output.
    #[error("internal compiler error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn immutable_assignment(name: &str, span: Span) -> Self {
        Self::Diagnostic(Diagnostic {
            kind: DiagnosticKind::ImmutableAssignment,
            span,
            message: format!("cannot assign to immutable binding `{}`", name),
        })
    }

    pub fn duplicate_binding(name: &str, span: Span) -> Self {
        Self::Diagnostic(Diagnostic {
            kind: DiagnosticKind::DuplicateBinding,
            span,
            message: format!("`{}` is already declared in this scope", name),
        })
    }

    /// Create a code generation error
    pub fn codegen_error(message: impl Into<String>) -> Self {
        Self::CodeGen { message: message.into() }
    }

    /// Create an internal consistency error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}
