/*
 * runtime.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Reference evaluator for compiled templates.
//!
//! Executes the ESTree subset produced by [`crate::compiler`] with
//! JavaScript semantics for the handful of operations that subset uses:
//! truthiness, `+`, member access, calls and function expressions. It
//! exists so compiled output can be checked end to end without a
//! JavaScript engine; it is not a general JavaScript interpreter.
//!
//! ```ignore
//! let mut runtime = Runtime::new();
//! runtime.register_helper("helper", |call| call.render(Value::object()));
//! let html = runtime.render(&compilation.program, json!({ "world": "Earth" }))?;
//! ```

use crate::estree::{self, Expression, Function, LiteralValue, Statement};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised while evaluating a compiled template.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An identifier that is neither a parameter, an import, nor a global.
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    /// Member access on `undefined`/`null`, or calling a non-function.
    #[error("TypeError: {0}")]
    Type(String),

    /// An import names a helper the runtime has no implementation for.
    #[error("No helper registered for import '{name}' from '{module}'")]
    UnresolvedImport { name: String, module: String },

    /// The program has no render function declaration.
    #[error("Program does not declare a render function")]
    MissingRenderFunction,

    /// A node outside the subset the compiler emits.
    #[error("Cannot evaluate {0}")]
    Unsupported(&'static str),

    /// A host helper reported a failure.
    #[error("Helper '{helper}' failed: {message}")]
    Helper { helper: String, message: String },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A JavaScript value.
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
    Function(Callable),
}

impl Value {
    /// An empty object, `{}`.
    pub fn object() -> Self {
        Value::Object(HashMap::new())
    }

    /// JavaScript truthiness: `undefined`, `null`, `false`, `""`, `0` and `NaN` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// `String(value)`
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) => "function () { [native code] }".to_string(),
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// Property lookup, `undefined` when absent.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Undefined),
            Value::Array(items) if key == "length" => Value::Number(items.len() as f64),
            Value::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Undefined),
            Value::String(s) if key == "length" => Value::Number(s.encode_utf16().count() as f64),
            _ => Value::Undefined,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n < 0.0 { "-" } else { "" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        // Covers -0
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// Handlebars' `escapeExpression`: `null`/`undefined` render as `''`,
/// everything else is stringified and HTML-escaped.
pub fn escape_expression(value: &Value) -> String {
    if value.is_nullish() {
        return String::new();
    }
    let text = value.to_js_string();
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '`' => escaped.push_str("&#x60;"),
            '=' => escaped.push_str("&#x3D;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

type HostFn = dyn Fn(&Invocation<'_>) -> RuntimeResult<Value>;

/// Something that can be called: a compiled function expression or a host helper.
#[derive(Clone)]
pub enum Callable {
    Template(Rc<Closure>),
    Host { name: String, function: Rc<HostFn> },
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Template(closure) => {
                write!(f, "Template({})", closure.function.params.len())
            }
            Callable::Host { name, .. } => write!(f, "Host({})", name),
        }
    }
}

/// A function expression together with the bindings it closed over.
pub struct Closure {
    function: Function,
    env: Env,
}

/// Arguments of one helper call, plus access to its block bodies.
pub struct Invocation<'a> {
    runtime: &'a Runtime,
    args: Vec<Value>,
}

impl Invocation<'_> {
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Value of `key` in the hash argument.
    pub fn hash(&self, key: &str) -> Value {
        self.args.first().map_or(Value::Undefined, |h| h.get(key))
    }

    fn block(&self, name: &str) -> Value {
        self.args.get(1).map_or(Value::Undefined, |o| o.get(name))
    }

    /// Whether the helper was called with a `fn` body.
    pub fn has_block(&self) -> bool {
        matches!(self.block("fn"), Value::Function(_))
    }

    /// Render the block body against `context`; `''` when there is none.
    pub fn render(&self, context: Value) -> RuntimeResult<Value> {
        self.call_block("fn", context)
    }

    /// Render the `{{else}}` body against `context`; `''` when there is none.
    pub fn inverse(&self, context: Value) -> RuntimeResult<Value> {
        self.call_block("inverse", context)
    }

    fn call_block(&self, name: &str, context: Value) -> RuntimeResult<Value> {
        match self.block(name) {
            Value::Undefined => Ok(Value::String(String::new())),
            body => self.runtime.call(&body, vec![context]),
        }
    }
}

/// Immutable chain of variable bindings.
#[derive(Clone, Default)]
struct Env(Option<Rc<Binding>>);

struct Binding {
    name: String,
    value: Value,
    parent: Env,
}

impl Env {
    fn bind(&self, name: &str, value: Value) -> Env {
        Env(Some(Rc::new(Binding {
            name: name.to_string(),
            value,
            parent: self.clone(),
        })))
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        let mut current = self.0.as_ref();
        while let Some(binding) = current {
            if binding.name == name {
                return Some(&binding.value);
            }
            current = binding.parent.0.as_ref();
        }
        None
    }
}

/// Evaluator with a set of globals (`escape`, `String`, registered helpers).
pub struct Runtime {
    globals: HashMap<String, Value>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// A runtime with the default `escape` and `String` globals.
    pub fn new() -> Self {
        let mut runtime = Self {
            globals: HashMap::new(),
        };
        runtime.register_helper("escape", |call| {
            let value = call.args().first().cloned().unwrap_or(Value::Undefined);
            Ok(Value::String(escape_expression(&value)))
        });
        runtime.register_helper("String", |call| {
            let value = call.args().first().cloned().unwrap_or(Value::Undefined);
            Ok(Value::String(value.to_js_string()))
        });
        runtime
    }

    /// Register a global function. Also used to satisfy imports by name.
    pub fn register_helper<F>(&mut self, name: &str, helper: F) -> &mut Self
    where
        F: Fn(&Invocation<'_>) -> RuntimeResult<Value> + 'static,
    {
        self.globals.insert(
            name.to_string(),
            Value::Function(Callable::Host {
                name: name.to_string(),
                function: Rc::new(helper),
            }),
        );
        self
    }

    /// Bind an existing global under another name (e.g. a custom escape function).
    pub fn alias(&mut self, name: &str, existing: &str) -> RuntimeResult<&mut Self> {
        let value = self
            .globals
            .get(existing)
            .cloned()
            .ok_or_else(|| RuntimeError::Reference(existing.to_string()))?;
        self.globals.insert(name.to_string(), value);
        Ok(self)
    }

    /// Run the program's render function on `data` and stringify the result.
    pub fn render(
        &self,
        program: &estree::Program,
        data: impl Into<Value>,
    ) -> RuntimeResult<String> {
        let mut env = Env::default();
        for statement in &program.body {
            match statement {
                Statement::ImportDeclaration { specifiers, source } => {
                    let module = match &source.value {
                        LiteralValue::String(s) => s.clone(),
                        _ => String::new(),
                    };
                    for specifier in specifiers {
                        let value = self.globals.get(&specifier.imported.name).cloned().ok_or_else(
                            || RuntimeError::UnresolvedImport {
                                name: specifier.imported.name.clone(),
                                module: module.clone(),
                            },
                        )?;
                        env = env.bind(&specifier.local.name, value);
                    }
                }
                Statement::FunctionDeclaration(_) | Statement::ExportNamedDeclaration { .. } => {}
                Statement::ReturnStatement { .. } => {
                    return Err(RuntimeError::Unsupported("top-level return"));
                }
            }
        }

        let render = program
            .render_function()
            .ok_or(RuntimeError::MissingRenderFunction)?;
        let closure = Value::Function(Callable::Template(Rc::new(Closure {
            function: render.clone(),
            env,
        })));
        let result = self.call(&closure, vec![data.into()])?;
        Ok(result.to_js_string())
    }

    /// Call `callee` with `args`.
    pub fn call(&self, callee: &Value, args: Vec<Value>) -> RuntimeResult<Value> {
        let Value::Function(callable) = callee else {
            return Err(RuntimeError::Type(format!(
                "{} is not a function",
                callee.type_name()
            )));
        };
        match callable {
            Callable::Host { function, .. } => function(&Invocation {
                runtime: self,
                args,
            }),
            Callable::Template(closure) => {
                let mut env = closure.env.clone();
                let mut args = args.into_iter();
                for param in &closure.function.params {
                    env = env.bind(&param.name, args.next().unwrap_or(Value::Undefined));
                }
                self.run_body(&closure.function, &env)
            }
        }
    }

    fn run_body(&self, function: &Function, env: &Env) -> RuntimeResult<Value> {
        for statement in &function.body.body {
            match statement {
                Statement::ReturnStatement { argument } => {
                    return match argument {
                        Some(expression) => self.evaluate(expression, env),
                        None => Ok(Value::Undefined),
                    };
                }
                _ => return Err(RuntimeError::Unsupported("statement in function body")),
            }
        }
        Ok(Value::Undefined)
    }

    fn evaluate(&self, expression: &Expression, env: &Env) -> RuntimeResult<Value> {
        match expression {
            Expression::Identifier { name } => match env.lookup(name) {
                Some(value) => Ok(value.clone()),
                None => match self.globals.get(name) {
                    Some(value) => Ok(value.clone()),
                    None if name == "undefined" => Ok(Value::Undefined),
                    None => Err(RuntimeError::Reference(name.clone())),
                },
            },

            Expression::Literal { value, .. } => Ok(match value {
                LiteralValue::String(s) => Value::String(s.clone()),
                LiteralValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
                LiteralValue::Boolean(b) => Value::Bool(*b),
                LiteralValue::Null => Value::Null,
            }),

            Expression::BinaryExpression { left, right, .. } => {
                let left = self.evaluate(left, env)?;
                let right = self.evaluate(right, env)?;
                Ok(add(&left, &right))
            }

            Expression::CallExpression { callee, arguments } => {
                let function = self.evaluate(callee, env)?;
                let args = arguments
                    .iter()
                    .map(|arg| self.evaluate(arg, env))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                self.call(&function, args)
            }

            Expression::MemberExpression {
                object,
                property,
                computed,
            } => {
                let target = self.evaluate(object, env)?;
                let key = match (computed, property.as_ref()) {
                    (false, Expression::Identifier { name }) => name.clone(),
                    _ => self.evaluate(property, env)?.to_js_string(),
                };
                if target.is_nullish() {
                    return Err(RuntimeError::Type(format!(
                        "Cannot read properties of {} (reading '{}')",
                        target.type_name(),
                        key
                    )));
                }
                Ok(target.get(&key))
            }

            Expression::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test, env)?.is_truthy() {
                    self.evaluate(consequent, env)
                } else {
                    self.evaluate(alternate, env)
                }
            }

            Expression::ObjectExpression { properties } => {
                let mut map = HashMap::with_capacity(properties.len());
                for property in properties {
                    let key = property
                        .key_name()
                        .ok_or(RuntimeError::Unsupported("computed object key"))?;
                    map.insert(key.to_string(), self.evaluate(&property.value, env)?);
                }
                Ok(Value::Object(map))
            }

            Expression::FunctionExpression(function) => {
                Ok(Value::Function(Callable::Template(Rc::new(Closure {
                    function: function.clone(),
                    env: env.clone(),
                }))))
            }
        }
    }
}

/// The `+` operator.
fn add(left: &Value, right: &Value) -> Value {
    let is_primitive = |v: &Value| {
        !matches!(v, Value::Array(_) | Value::Object(_) | Value::Function(_))
    };
    let is_string = |v: &Value| matches!(v, Value::String(_)) || !is_primitive(v);
    if is_string(left) || is_string(right) {
        Value::String(left.to_js_string() + &right.to_js_string())
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}
