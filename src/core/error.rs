// This module defines the recoverable error types of the lowering core using thiserror, and
// the diagnostic sink that collects them. Only data-dependent problems are errors here: a
// range-checked fixup whose value does not fit its field, or an unknown bank selection mode
// string. Such fixup errors are reported against the source location of the fixup into a
// DiagnosticEngine and processing continues, so that one pass over a unit surfaces every bad
// fixup. Contract violations by callers (bad fixup kind index, relaxation requests, registers
// without a width) are not represented here; they abort with a panic at the point of misuse.

//! Error and diagnostic types.

use super::fixup::SourceLoc;
use thiserror::Error;

/// Problems found while resolving a fixup value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixupError {
    #[error("fixup out of range: {value} does not fit in {bits} signed bits ({kind})")]
    OutOfRange {
        kind: &'static str,
        value: i64,
        bits: u32,
    },
}

/// Unknown register bank selection mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown register bank selection mode '{0}' (expected 'fast' or 'greedy')")]
pub struct SelectModeError(pub String);

/// A reported error tied to the location of the fixup that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub loc: SourceLoc,
    pub error: FixupError,
}

/// Collects diagnostics without interrupting the caller.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_error(&mut self, loc: SourceLoc, error: FixupError) {
        log::error!("{loc}: {error}");
        self.diagnostics.push(Diagnostic { loc, error });
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain all collected diagnostics.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
