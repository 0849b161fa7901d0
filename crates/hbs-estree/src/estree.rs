/*
 * estree.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! ESTree output types.
//!
//! A small, owned subset of the [ESTree](https://github.com/estree/estree)
//! node set: exactly what compiled templates need. Serializing these with
//! `serde_json` produces the standard ESTree JSON shape, so any ESTree
//! printer (escodegen, astring, ...) can turn the result into source text.

use serde::{Deserialize, Serialize};

/// Root of a compiled module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub struct Program {
    pub body: Vec<Statement>,
    pub source_type: SourceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Script,
    Module,
}

impl Program {
    pub fn module(body: Vec<Statement>) -> Self {
        Self {
            body,
            source_type: SourceType::Module,
        }
    }

    /// The `render` function declaration, looking through an export wrapper.
    pub fn render_function(&self) -> Option<&Function> {
        self.body.iter().find_map(|stmt| match stmt {
            Statement::FunctionDeclaration(f) => Some(f),
            Statement::ExportNamedDeclaration { declaration, .. } => match declaration.as_ref() {
                Statement::FunctionDeclaration(f) => Some(f),
                _ => None,
            },
            _ => None,
        })
    }

    /// All import declarations, in order.
    pub fn imports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.body.iter().filter_map(|stmt| match stmt {
            Statement::ImportDeclaration { specifiers, source } => {
                let local = specifiers.first()?.local.name.as_str();
                match &source.value {
                    LiteralValue::String(s) => Some((local, s.as_str())),
                    _ => None,
                }
            }
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Statement {
    FunctionDeclaration(Function),
    ReturnStatement {
        argument: Option<Expression>,
    },
    ImportDeclaration {
        specifiers: Vec<ImportSpecifier>,
        source: Literal,
    },
    ExportNamedDeclaration {
        declaration: Box<Statement>,
        specifiers: Vec<ExportSpecifier>,
        source: Option<Literal>,
    },
}

impl Statement {
    pub fn export(declaration: Statement) -> Self {
        Statement::ExportNamedDeclaration {
            declaration: Box::new(declaration),
            specifiers: Vec::new(),
            source: None,
        }
    }

    /// `import { name } from 'source';`
    pub fn import_named(name: &str, source: &str) -> Self {
        Statement::ImportDeclaration {
            specifiers: vec![ImportSpecifier {
                kind: ImportSpecifierKind::ImportSpecifier,
                local: Identifier::new(name),
                imported: Identifier::new(name),
            }],
            source: Literal::string(source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportSpecifierKind {
    ExportSpecifier,
}

/// `export { local as exported }`. Compiled modules export a declaration,
/// so this list is always empty in compiler output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSpecifier {
    #[serde(rename = "type")]
    pub kind: ExportSpecifierKind,
    pub local: Identifier,
    pub exported: Identifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportSpecifierKind {
    ImportSpecifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    #[serde(rename = "type")]
    pub kind: ImportSpecifierKind,
    pub local: Identifier,
    pub imported: Identifier,
}

/// Shared shape of function declarations and function expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: Option<Identifier>,
    pub params: Vec<Identifier>,
    pub body: BlockStatement,
    #[serde(default)]
    pub generator: bool,
    #[serde(default, rename = "async")]
    pub is_async: bool,
}

impl Function {
    /// `function name(param) { return argument; }`
    pub fn returning(id: Option<&str>, param: &str, argument: Expression) -> Self {
        Self {
            id: id.map(Identifier::new),
            params: vec![Identifier::new(param)],
            body: BlockStatement {
                kind: BlockStatementKind::BlockStatement,
                body: vec![Statement::ReturnStatement {
                    argument: Some(argument),
                }],
            },
            generator: false,
            is_async: false,
        }
    }

    /// The expression of the first `return` in the body.
    pub fn returned(&self) -> Option<&Expression> {
        self.body.body.iter().find_map(|stmt| match stmt {
            Statement::ReturnStatement { argument } => argument.as_ref(),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatementKind {
    BlockStatement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStatement {
    #[serde(rename = "type")]
    pub kind: BlockStatementKind,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    Identifier {
        name: String,
    },
    Literal {
        value: LiteralValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
    },
    BinaryExpression {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    CallExpression {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    MemberExpression {
        object: Box<Expression>,
        property: Box<Expression>,
        computed: bool,
    },
    ConditionalExpression {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    ObjectExpression {
        properties: Vec<Property>,
    },
    FunctionExpression(Function),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Plus,
}

/// An identifier outside expression position (function names, params, import specifiers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Identifier {
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A literal outside expression position (import sources). Converts into
/// [`Expression::Literal`] for use inside expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Literal {
    pub value: LiteralValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Literal {
    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        let raw = serde_json::to_string(&value).ok();
        Self {
            value: LiteralValue::String(value),
            raw,
        }
    }

    pub fn number(value: serde_json::Number) -> Self {
        Self {
            raw: Some(value.to_string()),
            value: LiteralValue::Number(value),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            value: LiteralValue::Boolean(value),
            raw: Some(value.to_string()),
        }
    }

    pub fn null() -> Self {
        Self {
            value: LiteralValue::Null,
            raw: Some("null".to_string()),
        }
    }
}

impl From<Identifier> for Expression {
    fn from(id: Identifier) -> Self {
        Expression::Identifier { name: id.name }
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal {
            value: literal.value,
            raw: literal.raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKindTag {
    Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Init,
}

/// `key: value` inside an object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub tag: PropertyKindTag,
    pub key: Expression,
    pub value: Expression,
    pub kind: PropertyKind,
    pub computed: bool,
    pub method: bool,
    pub shorthand: bool,
}

impl Property {
    /// `key: value`, quoting the key when it is not a valid identifier.
    pub fn init(key: &str, value: Expression) -> Self {
        let key = if is_identifier(key) {
            ident(key)
        } else {
            Literal::string(key).into()
        };
        Self {
            tag: PropertyKindTag::Property,
            key,
            value,
            kind: PropertyKind::Init,
            computed: false,
            method: false,
            shorthand: false,
        }
    }

    /// The key as written, for identifier or string keys.
    pub fn key_name(&self) -> Option<&str> {
        match &self.key {
            Expression::Identifier { name } => Some(name),
            Expression::Literal {
                value: LiteralValue::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }
}

// Constructors for expressions used by the compiler.

pub fn ident(name: &str) -> Expression {
    Expression::Identifier {
        name: name.to_string(),
    }
}

pub fn string_literal(value: impl Into<String>) -> Expression {
    Literal::string(value).into()
}

pub fn call(callee: &str, arguments: Vec<Expression>) -> Expression {
    Expression::CallExpression {
        callee: Box::new(ident(callee)),
        arguments,
    }
}

pub fn object(properties: Vec<Property>) -> Expression {
    Expression::ObjectExpression { properties }
}

pub fn conditional(test: Expression, consequent: Expression, alternate: Expression) -> Expression {
    Expression::ConditionalExpression {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
    }
}

/// `object.property`, or `object["property"]` when `property` is not an identifier.
pub fn member(object: Expression, property: &str) -> Expression {
    if is_identifier(property) {
        Expression::MemberExpression {
            object: Box::new(object),
            property: Box::new(ident(property)),
            computed: false,
        }
    } else {
        Expression::MemberExpression {
            object: Box::new(object),
            property: Box::new(string_literal(property)),
            computed: true,
        }
    }
}

/// `root.a.b.c` for `parts = ["a", "b", "c"]`.
pub fn member_chain<S: AsRef<str>>(root: &str, parts: &[S]) -> Expression {
    parts
        .iter()
        .fold(ident(root), |object, part| member(object, part.as_ref()))
}

/// Left-associated `+` chain: `((a + b) + c)`.
///
/// Returns `None` for an empty list and the sole element for a single one.
pub fn concat(expressions: Vec<Expression>) -> Option<Expression> {
    expressions
        .into_iter()
        .reduce(|left, right| Expression::BinaryExpression {
            operator: BinaryOperator::Plus,
            left: Box::new(left),
            right: Box::new(right),
        })
}

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield", "let", "static",
    "implements", "interface", "package", "private", "protected", "public", "await",
];

/// Whether `name` can be used as a bare identifier in dotted member access.
///
/// Reserved words are allowed as property names in ES5+, but they are not
/// valid binding names, so callers that bind identifiers check separately.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c == '$' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}

/// Whether `name` is a reserved word that cannot be bound as a variable.
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_concat_is_left_associated() {
        let expr = concat(vec![
            string_literal("a"),
            string_literal("b"),
            string_literal("c"),
        ])
        .unwrap();

        let Expression::BinaryExpression { left, right, .. } = expr else {
            panic!("expected a binary expression");
        };
        assert_eq!(*right, string_literal("c"));
        assert!(matches!(*left, Expression::BinaryExpression { .. }));
    }

    #[test]
    fn test_concat_edge_sizes() {
        assert_eq!(concat(vec![]), None);
        assert_eq!(concat(vec![ident("x")]), Some(ident("x")));
    }

    #[test]
    fn test_member_chain_serializes_as_estree() {
        let expr = member_chain("data1", &["world", "name"]);
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({
                "type": "MemberExpression",
                "object": {
                    "type": "MemberExpression",
                    "object": { "type": "Identifier", "name": "data1" },
                    "property": { "type": "Identifier", "name": "world" },
                    "computed": false
                },
                "property": { "type": "Identifier", "name": "name" },
                "computed": false
            })
        );
    }

    #[test]
    fn test_member_with_non_identifier_segment() {
        let expr = member(ident("data1"), "first-name");
        let Expression::MemberExpression {
            property, computed, ..
        } = expr
        else {
            panic!("expected member expression");
        };
        assert!(computed);
        assert_eq!(*property, string_literal("first-name"));
    }

    #[test]
    fn test_import_and_export_shape() {
        let program = Program::module(vec![
            Statement::import_named("helper", "demo/helper"),
            Statement::export(Statement::FunctionDeclaration(Function::returning(
                Some("render"),
                "data1",
                string_literal(""),
            ))),
        ]);

        let value = serde_json::to_value(&program).unwrap();
        assert_eq!(value["type"], "Program");
        assert_eq!(value["sourceType"], "module");
        assert_eq!(value["body"][0]["type"], "ImportDeclaration");
        assert_eq!(value["body"][0]["specifiers"][0]["type"], "ImportSpecifier");
        assert_eq!(
            value["body"][0]["specifiers"][0]["local"],
            json!({ "type": "Identifier", "name": "helper" })
        );
        assert_eq!(value["body"][0]["source"]["type"], "Literal");
        assert_eq!(value["body"][0]["source"]["value"], "demo/helper");
        assert_eq!(value["body"][1]["type"], "ExportNamedDeclaration");
        assert_eq!(value["body"][1]["declaration"]["type"], "FunctionDeclaration");
        assert_eq!(value["body"][1]["specifiers"], json!([]));
        assert_eq!(value["body"][1]["source"], json!(null));
        assert_eq!(value["body"][1]["declaration"]["id"]["name"], "render");
        assert_eq!(value["body"][1]["declaration"]["params"][0]["type"], "Identifier");
        assert_eq!(
            value["body"][1]["declaration"]["body"]["body"][0]["type"],
            "ReturnStatement"
        );

        assert_eq!(program.imports().collect::<Vec<_>>(), vec![("helper", "demo/helper")]);
        assert!(program.render_function().is_some());
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            serde_json::to_value(Literal::string("it's")).unwrap(),
            json!({ "type": "Literal", "value": "it's", "raw": "\"it's\"" })
        );
        assert_eq!(
            serde_json::to_value(Expression::from(Literal::null())).unwrap(),
            json!({ "type": "Literal", "value": null, "raw": "null" })
        );
        assert_eq!(
            serde_json::to_value(Expression::from(Literal::number(1.into()))).unwrap(),
            json!({ "type": "Literal", "value": 1, "raw": "1" })
        );
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("world"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("$el"));
        assert!(!is_identifier("first-name"));
        assert!(!is_identifier("0"));
        assert!(!is_identifier(""));
        assert!(is_reserved_word("class"));
        assert!(!is_reserved_word("helper"));
    }

    #[test]
    fn test_export_specifier_shape() {
        let specifier = ExportSpecifier {
            kind: ExportSpecifierKind::ExportSpecifier,
            local: Identifier::new("render"),
            exported: Identifier::new("default"),
        };
        assert_eq!(
            serde_json::to_value(&specifier).unwrap(),
            json!({
                "type": "ExportSpecifier",
                "local": { "type": "Identifier", "name": "render" },
                "exported": { "type": "Identifier", "name": "default" }
            })
        );
    }

    #[test]
    fn test_quoted_property_key() {
        let prop = Property::init("data-id", ident("x"));
        assert_eq!(prop.key, string_literal("data-id"));
        assert_eq!(prop.key_name(), Some("data-id"));
    }
}
