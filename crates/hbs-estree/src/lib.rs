/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Handlebars template to ESTree compiler.
//!
//! This crate takes the AST produced by the Handlebars parser and compiles
//! it into an [ESTree](https://github.com/estree/estree) program: a module
//! holding one `render(data1)` function that returns the rendered string.
//! Any ESTree code generator can print the result as JavaScript.
//!
//! Supported template constructs:
//!
//! - Text content
//! - Comments: `{{! ... }}` (produce no output)
//! - Interpolation: `{{value}}` (escaped) and `{{{value}}}` (raw)
//! - Parent scope access: `{{../value}}`, `{{../../a.b}}`
//! - Conditionals: `{{#if x}}...{{else}}...{{/if}}`, `{{#unless x}}...{{/unless}}`
//! - Helper calls: `{{helper key=value}}`, `{{#helper}}...{{else}}...{{/helper}}`
//!
//! Partials, decorators, sub-expressions and `@data` variables are rejected
//! in strict mode (the default) and dropped with a warning otherwise.
//!
//! # Architecture
//!
//! Compilation is a single pass over the template AST. Scope depth is an
//! explicit value threaded through the pass; the helpers a template calls
//! are collected in a [`HelperTable`] and turned into `import` declarations
//! at the top of the module. Nothing is shared between compilations.
//!
//! # Example
//!
//! ```ignore
//! use hbs_estree::{CompileOptions, MapResolver, Node, compile_with_resolver};
//!
//! let ast = Node::from_json(&parser_output)?;
//! let resolver = MapResolver::with_helpers([("helper", "demo/helper")]);
//! let options = CompileOptions::default().with_export(true);
//!
//! let compilation = compile_with_resolver(&ast, &options, &resolver)?;
//! let estree = serde_json::to_string(&compilation.program)?;
//! ```

pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod estree;
pub mod options;
pub mod resolver;
pub mod runtime;
pub mod template;

// Re-export main types at crate root
pub use compiler::{Compilation, compile, compile_with_resolver};
pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind};
pub use error::{CompileError, CompileResult};
pub use options::CompileOptions;
pub use resolver::{HelperResolver, HelperTable, MapResolver, NullResolver};
pub use template::{Node, SourceLocation};
