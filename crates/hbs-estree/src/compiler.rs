/*
 * compiler.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST to ESTree compilation.
//!
//! A template compiles to a single render function:
//!
//! ```text
//! Hello {{#helper x=name}}{{{../title}}}{{/helper}}
//! ```
//!
//! becomes
//!
//! ```js
//! function render(data1) {
//!     return 'Hello ' + helper({ x: data1.name }, {
//!         fn: function (data2) { return String(data1.title); }
//!     });
//! }
//! ```
//!
//! Every block body is its own function whose single parameter is the
//! context of that scope. `dataN` is the context `N - 1` blocks below the
//! root, so a path with `depth` hops (`../`) resolves against
//! `data{current - depth}`.

use crate::diagnostics::{Diagnostic, DiagnosticCollector, codes};
use crate::error::{CompileError, CompileResult};
use crate::estree::{
    self, Expression, Function, Literal, Property, Statement, call, concat, conditional, ident,
    is_reserved_word, member_chain, object, string_literal,
};
use crate::options::CompileOptions;
use crate::resolver::{HelperResolver, HelperTable, NullResolver};
use crate::template::{
    BlockStatement, Expression as TemplateExpression, Hash, MustacheStatement, Node,
    PathExpression, Program, SourceLocation,
};

/// Prefix of the generated scope parameters (`data1`, `data2`, ...).
pub const SCOPE_PREFIX: &str = "data";

/// Result of compiling one template.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    /// The generated module: helper imports followed by the render function.
    pub program: estree::Program,
    /// Every helper the template calls, with its resolved import source.
    pub helpers: HelperTable,
    /// Warnings for content that was dropped (legacy mode only).
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile a template AST without helper imports.
pub fn compile(ast: &Node, options: &CompileOptions) -> CompileResult<Compilation> {
    compile_with_resolver(ast, options, &NullResolver)
}

/// Compile a template AST, resolving helper imports with `resolver`.
pub fn compile_with_resolver(
    ast: &Node,
    options: &CompileOptions,
    resolver: &dyn HelperResolver,
) -> CompileResult<Compilation> {
    let Node::Program(program) = ast else {
        return Err(CompileError::NotAProgram { found: ast.kind() });
    };

    tracing::debug!(
        strict = options.strict,
        export = options.export,
        statements = program.body.len(),
        "compiling template"
    );

    let mut compiler = Compiler {
        options,
        resolver,
        helpers: HelperTable::new(),
        diagnostics: DiagnosticCollector::new(),
    };

    let root = Scope::root();
    compiler.check_block_params(program)?;
    let returned = compiler.compile_body(&program.body, root)?;
    let render = Function::returning(Some(&options.render_name), &root.variable(), returned);

    let mut declaration = Statement::FunctionDeclaration(render);
    if options.export {
        declaration = Statement::export(declaration);
    }

    let Compiler {
        helpers,
        diagnostics,
        ..
    } = compiler;

    let mut body: Vec<Statement> = helpers
        .imports()
        .map(|(name, source)| Statement::import_named(name, source))
        .collect();
    body.push(declaration);

    tracing::debug!(
        helpers = helpers.len(),
        imports = body.len() - 1,
        diagnostics = diagnostics.diagnostics().len(),
        "compiled template"
    );

    Ok(Compilation {
        program: estree::Program::module(body),
        helpers,
        diagnostics: diagnostics.into_diagnostics(),
    })
}

/// Nesting level of the body being compiled. The root program is level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scope {
    depth: usize,
}

impl Scope {
    fn root() -> Self {
        Scope { depth: 1 }
    }

    fn nested(self) -> Self {
        Scope {
            depth: self.depth + 1,
        }
    }

    fn variable(self) -> String {
        variable_name(self.depth)
    }

    /// Member access for `path`, rooted at the scope variable it refers to.
    fn resolve(self, path: &PathExpression) -> CompileResult<Expression> {
        if path.data {
            return Err(CompileError::Unsupported {
                construct: format!("data variable `{}`", path.original),
                location: path.loc.clone(),
            });
        }
        match self.depth.checked_sub(path.depth) {
            Some(index) if index >= 1 => Ok(member_chain(&variable_name(index), &path.parts)),
            _ => Err(CompileError::ScopeOutOfRange {
                path: path.original.clone(),
                depth: path.depth,
                current: self.depth,
                location: path.loc.clone(),
            }),
        }
    }
}

fn variable_name(index: usize) -> String {
    format!("{}{}", SCOPE_PREFIX, index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conditional {
    If,
    Unless,
}

/// Per-call compilation state. Nothing here outlives one `compile` call.
struct Compiler<'a> {
    options: &'a CompileOptions,
    resolver: &'a dyn HelperResolver,
    helpers: HelperTable,
    diagnostics: DiagnosticCollector,
}

impl Compiler<'_> {
    /// Concatenation of every statement in `body`; `''` when nothing is emitted.
    fn compile_body(&mut self, body: &[Node], scope: Scope) -> CompileResult<Expression> {
        let mut parts = Vec::with_capacity(body.len());
        for node in body {
            let compiled = self.compile_node(node, scope);
            if let Some(Some(expression)) = self.tolerate(compiled, codes::UNSUPPORTED_CONSTRUCT)? {
                parts.push(expression);
            }
        }
        Ok(concat(parts).unwrap_or_else(|| string_literal("")))
    }

    /// Compile one statement. `Ok(None)` means the node has no output.
    fn compile_node(&mut self, node: &Node, scope: Scope) -> CompileResult<Option<Expression>> {
        match node {
            Node::ContentStatement(content) => Ok(Some(string_literal(content.value.as_str()))),

            Node::CommentStatement(_) => Ok(None),

            Node::MustacheStatement(mustache) => match &mustache.hash {
                Some(hash) if !hash.is_empty() => self.compile_mustache_call(mustache, scope),
                _ => self.compile_interpolation(mustache, scope),
            },

            Node::BlockStatement(block) => self.compile_block(block, scope),

            Node::PartialStatement(_) | Node::PartialBlockStatement(_) => {
                Err(unsupported(format!("partial ({})", node.kind()), node.loc()))
            }

            Node::Decorator(_) | Node::DecoratorBlock(_) => {
                Err(unsupported(format!("decorator ({})", node.kind()), node.loc()))
            }

            Node::Program(_) => Err(unsupported("nested Program node", node.loc())),
        }
    }

    /// `{{value}}` / `{{{value}}}`
    fn compile_interpolation(
        &mut self,
        mustache: &MustacheStatement,
        scope: Scope,
    ) -> CompileResult<Option<Expression>> {
        let TemplateExpression::PathExpression(path) = &mustache.path else {
            return Err(unsupported(
                format!("{} in mustache position", mustache.path.kind()),
                mustache.loc.as_ref(),
            ));
        };

        self.check_params(&path.original, &mustache.params, mustache.loc.as_ref())?;

        let callee = if mustache.escaped {
            &self.options.escape_fn
        } else {
            &self.options.stringify_fn
        };
        Ok(Some(call(callee, vec![scope.resolve(path)?])))
    }

    /// `{{helper key=value}}`
    fn compile_mustache_call(
        &mut self,
        mustache: &MustacheStatement,
        scope: Scope,
    ) -> CompileResult<Option<Expression>> {
        let name = helper_name(&mustache.path, mustache.loc.as_ref())?;
        if is_conditional(name) {
            return Err(CompileError::InvalidHelperCall {
                helper: name.to_string(),
                message: "must be used as a block (`{{#if}}...{{/if}}`)".to_string(),
                location: mustache.loc.clone(),
            });
        }
        let call = self.compile_helper_call(
            name,
            &mustache.params,
            mustache.hash.as_ref(),
            None,
            None,
            mustache.loc.as_ref(),
            scope,
        )?;
        Ok(Some(call))
    }

    /// `{{#name}}...{{/name}}`
    fn compile_block(
        &mut self,
        block: &BlockStatement,
        scope: Scope,
    ) -> CompileResult<Option<Expression>> {
        let name = helper_name(&block.path, block.loc.as_ref())?;
        let expression = match name {
            "if" => self.compile_conditional(Conditional::If, block, scope)?,
            "unless" => self.compile_conditional(Conditional::Unless, block, scope)?,
            _ => Some(self.compile_helper_call(
                name,
                &block.params,
                block.hash.as_ref(),
                block.program.as_ref(),
                block.inverse.as_ref(),
                block.loc.as_ref(),
                scope,
            )?),
        };
        Ok(expression)
    }

    /// `{{#if x}}a{{else}}b{{/if}}` becomes `x ? a : b`; `unless` swaps the branches.
    ///
    /// `{{else if y}}` arrives as a nested `if` inside the inverse body and
    /// needs no special handling: it compiles to a nested ternary.
    fn compile_conditional(
        &mut self,
        kind: Conditional,
        block: &BlockStatement,
        scope: Scope,
    ) -> CompileResult<Option<Expression>> {
        let name = match kind {
            Conditional::If => "if",
            Conditional::Unless => "unless",
        };
        let Some((condition, extra)) = block.params.split_first() else {
            return Err(CompileError::InvalidHelperCall {
                helper: name.to_string(),
                message: "expects exactly one parameter".to_string(),
                location: block.loc.clone(),
            });
        };
        self.check_params(name, extra, block.loc.as_ref())?;
        if let Some(hash) = &block.hash {
            self.check_hash_ignored(name, hash)?;
        }

        let test = self.compile_value(condition, scope);
        let Some(test) = self.tolerate(test, codes::UNSUPPORTED_CONSTRUCT)? else {
            return Ok(None);
        };

        let body = self.compile_branch(block.program.as_ref(), scope)?;
        let inverse = self.compile_branch(block.inverse.as_ref(), scope)?;

        let expression = match kind {
            Conditional::If => conditional(test, body, inverse),
            Conditional::Unless => conditional(test, inverse, body),
        };
        Ok(Some(expression))
    }

    fn compile_branch(&mut self, program: Option<&Program>, scope: Scope) -> CompileResult<Expression> {
        match program {
            Some(program) => {
                self.check_block_params(program)?;
                self.compile_body(&program.body, scope)
            }
            None => Ok(string_literal("")),
        }
    }

    /// `name({ hash... }, { fn: function (dataN) {...}, inverse: ... })`
    fn compile_helper_call(
        &mut self,
        name: &str,
        params: &[TemplateExpression],
        hash: Option<&Hash>,
        program: Option<&Program>,
        inverse: Option<&Program>,
        loc: Option<&SourceLocation>,
        scope: Scope,
    ) -> CompileResult<Expression> {
        if is_reserved_word(name) {
            return Err(unsupported(
                format!("helper `{}` (reserved word in JavaScript)", name),
                loc,
            ));
        }
        if name == self.options.render_name || is_scope_variable(name) {
            return Err(unsupported(
                format!("helper `{}` (clashes with a generated binding)", name),
                loc,
            ));
        }
        self.helpers
            .record(name, self.resolver)
            .map_err(|source| CompileError::HelperResolution {
                helper: name.to_string(),
                source,
            })?;

        self.check_params(name, params, loc)?;

        let mut properties = Vec::new();
        for pair in hash.map_or(&[][..], |h| h.pairs.as_slice()) {
            let value = self.compile_value(&pair.value, scope);
            if let Some(value) = self.tolerate(value, codes::DROPPED_HASH_PAIR)? {
                properties.push(Property::init(&pair.key, value));
            }
        }
        let mut arguments = vec![object(properties)];

        let mut bodies = Vec::new();
        if let Some(program) = program.filter(|p| !p.body.is_empty()) {
            bodies.push(Property::init("fn", self.render_function(program, scope)?));
        }
        if let Some(inverse) = inverse.filter(|p| !p.body.is_empty()) {
            bodies.push(Property::init("inverse", self.render_function(inverse, scope)?));
        }
        if !bodies.is_empty() {
            arguments.push(object(bodies));
        }

        Ok(call(name, arguments))
    }

    /// `function (dataN) { return ...; }` for a block body one level down.
    fn render_function(&mut self, program: &Program, scope: Scope) -> CompileResult<Expression> {
        let inner = scope.nested();
        self.check_block_params(program)?;
        let returned = self.compile_body(&program.body, inner)?;
        Ok(Expression::FunctionExpression(Function::returning(
            None,
            &inner.variable(),
            returned,
        )))
    }

    /// A parameter or hash value: a path lookup or a literal.
    fn compile_value(
        &self,
        value: &TemplateExpression,
        scope: Scope,
    ) -> CompileResult<Expression> {
        match value {
            TemplateExpression::PathExpression(path) => scope.resolve(path),
            TemplateExpression::StringLiteral(s) => {
                Ok(Expression::from(Literal::string(s.value.as_str())))
            }
            TemplateExpression::NumberLiteral(n) => {
                Ok(Expression::from(Literal::number(n.value.clone())))
            }
            TemplateExpression::BooleanLiteral(b) => Ok(Expression::from(Literal::boolean(b.value))),
            TemplateExpression::NullLiteral(_) => Ok(Expression::from(Literal::null())),
            TemplateExpression::UndefinedLiteral(_) => Ok(ident("undefined")),
            TemplateExpression::SubExpression(_) => {
                Err(unsupported("sub-expression", value.loc()))
            }
        }
    }

    fn check_params(
        &mut self,
        name: &str,
        params: &[TemplateExpression],
        loc: Option<&SourceLocation>,
    ) -> CompileResult<()> {
        if params.is_empty() {
            return Ok(());
        }
        let err = unsupported(
            format!("{} positional parameter(s) to `{}`", params.len(), name),
            params.first().and_then(|p| p.loc()).or(loc),
        );
        self.tolerate::<()>(Err(err), codes::IGNORED_PARAMS)?;
        Ok(())
    }

    fn check_hash_ignored(&mut self, name: &str, hash: &Hash) -> CompileResult<()> {
        if hash.is_empty() {
            return Ok(());
        }
        let keys: Vec<&str> = hash.pairs.iter().map(|p| p.key.as_str()).collect();
        let err = unsupported(
            format!("hash argument(s) {} to `{}`", keys.join(", "), name),
            hash.loc.as_ref(),
        );
        self.tolerate::<()>(Err(err), codes::IGNORED_PARAMS)?;
        Ok(())
    }

    fn check_block_params(&mut self, program: &Program) -> CompileResult<()> {
        if program.block_params.is_empty() {
            return Ok(());
        }
        let err = unsupported(
            format!("block parameters `as |{}|`", program.block_params.join(" ")),
            program.loc.as_ref(),
        );
        self.tolerate::<()>(Err(err), codes::IGNORED_PARAMS)?;
        Ok(())
    }

    /// In legacy mode, demote an unsupported-construct error to a warning.
    ///
    /// Returns `Ok(None)` when the construct was dropped. Structural errors
    /// and resolver failures always propagate.
    fn tolerate<T>(&mut self, result: CompileResult<T>, code: &str) -> CompileResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(CompileError::Unsupported {
                construct,
                location,
            }) if !self.options.strict => {
                self.diagnostics.warn_with_code(
                    code,
                    format!("dropped unsupported construct: {}", construct),
                    location.as_ref(),
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn unsupported(construct: impl Into<String>, location: Option<&SourceLocation>) -> CompileError {
    CompileError::Unsupported {
        construct: construct.into(),
        location: location.cloned(),
    }
}

/// `data1`, `data2`, ...: names taken by render function parameters.
fn is_scope_variable(name: &str) -> bool {
    name.strip_prefix(SCOPE_PREFIX)
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn is_conditional(name: &str) -> bool {
    matches!(name, "if" | "unless")
}

/// The helper a block or mustache invokes. Only plain names are callable.
fn helper_name<'a>(
    path: &'a TemplateExpression,
    loc: Option<&SourceLocation>,
) -> CompileResult<&'a str> {
    match path {
        TemplateExpression::PathExpression(p) if !p.data && p.depth == 0 && p.parts.len() == 1 => {
            Ok(p.head().unwrap_or_default())
        }
        TemplateExpression::PathExpression(p) => Err(unsupported(
            format!("helper call through path `{}`", p.original),
            p.loc.as_ref().or(loc),
        )),
        other => Err(unsupported(
            format!("{} as helper name", other.kind()),
            other.loc().or(loc),
        )),
    }
}
