/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation.

use crate::template::SourceLocation;
use thiserror::Error;

/// Boxed error returned by a failing helper resolver.
pub type BoxedResolveError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while compiling a template AST.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The root node handed to the compiler is not a `Program`.
    #[error("Expected a Program node at the root, found {found}")]
    NotAProgram { found: &'static str },

    /// A path reference climbs above the root scope (e.g. `../x` at the top level).
    #[error(
        "Path '{path}' reaches {depth} scope(s) up from nesting depth {current}{}",
        format_location(.location)
    )]
    ScopeOutOfRange {
        path: String,
        depth: usize,
        current: usize,
        location: Option<SourceLocation>,
    },

    /// A built-in helper was invoked with the wrong shape (e.g. `{{#if}}` without a condition).
    #[error("Invalid call to '{helper}': {message}{}", format_location(.location))]
    InvalidHelperCall {
        helper: String,
        message: String,
        location: Option<SourceLocation>,
    },

    /// A construct the compiler does not translate (partials, decorators, sub-expressions, ...).
    ///
    /// Only raised in strict mode; legacy mode records a warning instead.
    #[error("Unsupported construct: {construct}{}", format_location(.location))]
    Unsupported {
        construct: String,
        location: Option<SourceLocation>,
    },

    /// The configured helper resolver failed.
    #[error("Helper resolver failed for '{helper}': {source}")]
    HelperResolution {
        helper: String,
        #[source]
        source: BoxedResolveError,
    },

    /// The input could not be read as a template AST.
    #[error("Invalid template AST: {0}")]
    InvalidAst(#[from] serde_json::Error),

    /// I/O error (e.g., reading an AST file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_location(location: &Option<SourceLocation>) -> String {
    match location {
        Some(loc) => format!(" at {}", loc),
        None => String::new(),
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
