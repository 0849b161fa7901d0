/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Diagnostics collected while compiling.
//!
//! Anything the compiler drops or ignores is reported here rather than
//! only logged, so callers can decide whether a lossy compilation is
//! acceptable. In strict mode the same conditions become [`CompileError`]s.
//!
//! [`CompileError`]: crate::error::CompileError

use crate::error::CompileError;
use crate::template::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic codes.
pub mod codes {
    /// A construct was dropped from the output (partial, decorator, sub-expression, ...).
    pub const UNSUPPORTED_CONSTRUCT: &str = "H-1-1";
    /// Positional parameters were ignored.
    pub const IGNORED_PARAMS: &str = "H-1-2";
    /// A hash pair was omitted from a helper's options object.
    pub const DROPPED_HASH_PAIR: &str = "H-1-3";
    /// The template AST is structurally invalid (bad root, scope out of range, ...).
    pub const INVALID_TEMPLATE: &str = "H-2-1";
    /// The helper resolver failed.
    pub const RESOLVER_FAILED: &str = "H-3-1";
    /// The input could not be read.
    pub const INVALID_INPUT: &str = "H-4-1";
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Error,
    Warning,
}

/// A single compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
        };
        write!(f, "{}[{}]: {}", label, self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

impl Diagnostic {
    /// Error diagnostic describing a failed compilation.
    pub fn from_error(error: &CompileError) -> Self {
        let (code, location) = match error {
            CompileError::Unsupported { location, .. } => {
                (codes::UNSUPPORTED_CONSTRUCT, location.clone())
            }
            CompileError::NotAProgram { .. } => (codes::INVALID_TEMPLATE, None),
            CompileError::ScopeOutOfRange { location, .. }
            | CompileError::InvalidHelperCall { location, .. } => {
                (codes::INVALID_TEMPLATE, location.clone())
            }
            CompileError::HelperResolution { .. } => (codes::RESOLVER_FAILED, None),
            CompileError::InvalidAst(_) | CompileError::Io(_) => (codes::INVALID_INPUT, None),
        };
        Self {
            kind: DiagnosticKind::Error,
            code: code.to_string(),
            message: error.to_string(),
            location,
        }
    }
}

/// Collector for diagnostic messages during compilation.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add a warning with error code and optional source location.
    pub fn warn_with_code(
        &mut self,
        code: &str,
        message: impl Into<String>,
        location: Option<&SourceLocation>,
    ) {
        let message = message.into();
        tracing::warn!(code, location = ?location, "{}", message);
        self.add(Diagnostic {
            kind: DiagnosticKind::Warning,
            code: code.to_string(),
            message,
            location: location.cloned(),
        });
    }

    /// Check if any errors were collected (warnings don't count).
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Consume the collector, returning diagnostics in emission order.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
