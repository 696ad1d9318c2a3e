//! Shared definitions used across the backend: errors, configuration and
//! fixed names.

pub mod config;
pub mod consts;
pub mod error;

pub use config::Config;
pub use error::{Diagnostic, DiagnosticKind, Error, Result};
