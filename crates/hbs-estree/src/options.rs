/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compiler configuration.

use serde::{Deserialize, Serialize};

/// Options for a single compilation.
///
/// All fields are optional when deserialized; missing keys take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Function called on escaped (`{{x}}`) interpolations.
    pub escape_fn: String,

    /// Function called on raw (`{{{x}}}`) interpolations.
    pub stringify_fn: String,

    /// Wrap the render function in `export`.
    pub export: bool,

    /// Name of the top-level render function.
    pub render_name: String,

    /// Fail on constructs the compiler cannot translate.
    ///
    /// When `false`, such constructs produce no output and a warning
    /// diagnostic instead.
    pub strict: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            escape_fn: "escape".to_string(),
            stringify_fn: "String".to_string(),
            export: false,
            render_name: "render".to_string(),
            strict: true,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_escape_fn(mut self, name: impl Into<String>) -> Self {
        self.escape_fn = name.into();
        self
    }

    pub fn with_stringify_fn(mut self, name: impl Into<String>) -> Self {
        self.stringify_fn = name.into();
        self
    }

    pub fn with_export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    pub fn with_render_name(mut self, name: impl Into<String>) -> Self {
        self.render_name = name.into();
        self
    }

    /// Enable or disable strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompileOptions::new();
        assert_eq!(options.escape_fn, "escape");
        assert_eq!(options.stringify_fn, "String");
        assert_eq!(options.render_name, "render");
        assert!(!options.export);
        assert!(options.strict);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: CompileOptions =
            serde_json::from_str(r#"{ "escapeFn": "esc", "export": true }"#).unwrap();
        assert_eq!(options.escape_fn, "esc");
        assert!(options.export);
        assert_eq!(options.stringify_fn, "String");
        assert!(options.strict);
    }

    #[test]
    fn test_builder() {
        let options = CompileOptions::new()
            .with_escape_fn("html")
            .with_export(true)
            .with_strict(false);
        assert_eq!(options.escape_fn, "html");
        assert!(options.export);
        assert!(!options.strict);
    }
}
