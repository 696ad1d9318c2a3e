//! Backend configuration

use crate::classfile::defs::major_versions;

/// Options controlling emitted class files.
///
/// Built with the usual chain:
/// `Config::default().with_target_version(61).with_line_numbers(false)`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Class file major version to stamp on every emitted class
    pub target_version: u16,
    /// Emit LineNumberTable attributes for method bodies
    pub emit_line_numbers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_version: major_versions::JAVA_17,
            emit_line_numbers: true,
        }
    }
}

impl Config {
    pub fn with_target_version(mut self, version: u16) -> Self {
        self.target_version = version;
        self
    }

    pub fn with_line_numbers(mut self, emit: bool) -> Self {
        self.emit_line_numbers = emit;
        self
    }
}
