/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Handlebars template AST types.
//!
//! These types mirror the JSON shape emitted by the Handlebars parser
//! (`Handlebars.parse(source)`): every node is an object tagged by its
//! `type` field. Parsing template text is not this crate's job; callers
//! hand us the parser's output, either as JSON or built in code with the
//! constructors below.
//!
//! Fields the compiler does not use (whitespace `strip` flags, `indent`,
//! ...) are ignored during deserialization.

use crate::error::CompileResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A line/column position as reported by the parser (1-based line, 0-based column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Source span of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub source: Option<String>,
    pub start: Position,
    pub end: Position,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}:{}:{}", source, self.start.line, self.start.column),
            None => write!(f, "{}:{}", self.start.line, self.start.column),
        }
    }
}

/// A statement-level node of the template AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    /// The template body, or the body of a block.
    Program(Program),

    /// Literal text.
    ContentStatement(ContentStatement),

    /// `{{! comment }}` or `{{!-- comment --}}`
    CommentStatement(CommentStatement),

    /// `{{value}}`, `{{{value}}}` or `{{helper key=value}}`
    MustacheStatement(MustacheStatement),

    /// `{{#helper}}...{{else}}...{{/helper}}`
    BlockStatement(BlockStatement),

    /// `{{> partial}}`
    PartialStatement(PartialStatement),

    /// `{{#> partial}}...{{/partial}}`
    PartialBlockStatement(PartialBlockStatement),

    /// `{{* decorator}}`
    Decorator(MustacheStatement),

    /// `{{#* decorator}}...{{/decorator}}`
    DecoratorBlock(BlockStatement),
}

impl Node {
    /// The node's `type` tag, as the parser spells it.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Program(_) => "Program",
            Node::ContentStatement(_) => "ContentStatement",
            Node::CommentStatement(_) => "CommentStatement",
            Node::MustacheStatement(_) => "MustacheStatement",
            Node::BlockStatement(_) => "BlockStatement",
            Node::PartialStatement(_) => "PartialStatement",
            Node::PartialBlockStatement(_) => "PartialBlockStatement",
            Node::Decorator(_) => "Decorator",
            Node::DecoratorBlock(_) => "DecoratorBlock",
        }
    }

    /// Source location of this node, when the parser recorded one.
    pub fn loc(&self) -> Option<&SourceLocation> {
        match self {
            Node::Program(p) => p.loc.as_ref(),
            Node::ContentStatement(c) => c.loc.as_ref(),
            Node::CommentStatement(c) => c.loc.as_ref(),
            Node::MustacheStatement(m) | Node::Decorator(m) => m.loc.as_ref(),
            Node::BlockStatement(b) | Node::DecoratorBlock(b) => b.loc.as_ref(),
            Node::PartialStatement(p) => p.loc.as_ref(),
            Node::PartialBlockStatement(p) => p.loc.as_ref(),
        }
    }

    /// Parse a node from the parser's JSON output.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert an already-parsed JSON value into a node.
    pub fn from_value(value: serde_json::Value) -> CompileResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Literal text node.
    pub fn content(text: impl Into<String>) -> Self {
        let value = text.into();
        Node::ContentStatement(ContentStatement {
            original: value.clone(),
            value,
            loc: None,
        })
    }

    /// Comment node.
    pub fn comment(text: impl Into<String>) -> Self {
        Node::CommentStatement(CommentStatement {
            value: text.into(),
            loc: None,
        })
    }
}

/// A sequence of statements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default)]
    pub body: Vec<Node>,
    /// `as |x y|` names. The parser writes `null` when there are none.
    #[serde(default, deserialize_with = "null_as_default")]
    pub block_params: Vec<String>,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Program {
    pub fn new(body: Vec<Node>) -> Self {
        Self {
            body,
            block_params: Vec::new(),
            loc: None,
        }
    }

    /// Wrap this program as a root node.
    pub fn into_node(self) -> Node {
        Node::Program(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStatement {
    pub value: String,
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentStatement {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

/// `{{path params... key=value}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MustacheStatement {
    pub path: Expression,
    #[serde(default)]
    pub params: Vec<Expression>,
    #[serde(default)]
    pub hash: Option<Hash>,
    /// `false` for triple-stash `{{{raw}}}` and `{{& raw}}`.
    #[serde(default = "default_escaped")]
    pub escaped: bool,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

fn default_escaped() -> bool {
    true
}

impl MustacheStatement {
    /// Escaped interpolation of a path.
    pub fn new(path: PathExpression) -> Self {
        Self {
            path: Expression::PathExpression(path),
            params: Vec::new(),
            hash: None,
            escaped: true,
            loc: None,
        }
    }

    /// Raw (unescaped) interpolation of a path.
    pub fn raw(path: PathExpression) -> Self {
        Self {
            escaped: false,
            ..Self::new(path)
        }
    }

    pub fn with_params(mut self, params: Vec<Expression>) -> Self {
        self.params = params;
        self
    }

    pub fn with_hash(mut self, hash: Hash) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn into_node(self) -> Node {
        Node::MustacheStatement(self)
    }
}

/// `{{#path params... key=value}}program{{else}}inverse{{/path}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStatement {
    pub path: Expression,
    #[serde(default)]
    pub params: Vec<Expression>,
    #[serde(default)]
    pub hash: Option<Hash>,
    /// Absent for inverted sections (`{{^x}}...{{/x}}`).
    #[serde(default)]
    pub program: Option<Program>,
    #[serde(default)]
    pub inverse: Option<Program>,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

impl BlockStatement {
    /// Block invoking the helper `name` with the given body.
    pub fn new(name: &str, body: Vec<Node>) -> Self {
        Self {
            path: Expression::PathExpression(PathExpression::new(0, &[name])),
            params: Vec::new(),
            hash: None,
            program: Some(Program::new(body)),
            inverse: None,
            loc: None,
        }
    }

    pub fn with_params(mut self, params: Vec<Expression>) -> Self {
        self.params = params;
        self
    }

    pub fn with_hash(mut self, hash: Hash) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn with_inverse(mut self, body: Vec<Node>) -> Self {
        self.inverse = Some(Program::new(body));
        self
    }

    pub fn into_node(self) -> Node {
        Node::BlockStatement(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialStatement {
    pub name: Expression,
    #[serde(default)]
    pub params: Vec<Expression>,
    #[serde(default)]
    pub hash: Option<Hash>,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialBlockStatement {
    pub name: Expression,
    #[serde(default)]
    pub params: Vec<Expression>,
    #[serde(default)]
    pub hash: Option<Hash>,
    #[serde(default)]
    pub program: Option<Program>,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

/// Named arguments: `key=value key2=value2`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hash {
    #[serde(default)]
    pub pairs: Vec<HashPair>,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

impl Hash {
    pub fn new(pairs: Vec<HashPair>) -> Self {
        Self { pairs, loc: None }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashPair {
    pub key: String,
    pub value: Expression,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

impl HashPair {
    pub fn new(key: impl Into<String>, value: Expression) -> Self {
        Self {
            key: key.into(),
            value,
            loc: None,
        }
    }
}

/// An expression in a mustache, block or hash position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    PathExpression(PathExpression),
    SubExpression(SubExpression),
    StringLiteral(StringLiteral),
    NumberLiteral(NumberLiteral),
    BooleanLiteral(BooleanLiteral),
    UndefinedLiteral(UndefinedLiteral),
    NullLiteral(NullLiteral),
}

impl Expression {
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::PathExpression(_) => "PathExpression",
            Expression::SubExpression(_) => "SubExpression",
            Expression::StringLiteral(_) => "StringLiteral",
            Expression::NumberLiteral(_) => "NumberLiteral",
            Expression::BooleanLiteral(_) => "BooleanLiteral",
            Expression::UndefinedLiteral(_) => "UndefinedLiteral",
            Expression::NullLiteral(_) => "NullLiteral",
        }
    }

    pub fn loc(&self) -> Option<&SourceLocation> {
        match self {
            Expression::PathExpression(e) => e.loc.as_ref(),
            Expression::SubExpression(e) => e.loc.as_ref(),
            Expression::StringLiteral(e) => e.loc.as_ref(),
            Expression::NumberLiteral(e) => e.loc.as_ref(),
            Expression::BooleanLiteral(e) => e.loc.as_ref(),
            Expression::UndefinedLiteral(e) => e.loc.as_ref(),
            Expression::NullLiteral(e) => e.loc.as_ref(),
        }
    }

    /// Path reference `depth` scopes up, e.g. `path(1, &["a", "b"])` is `../a.b`.
    pub fn path(depth: usize, parts: &[&str]) -> Self {
        Expression::PathExpression(PathExpression::new(depth, parts))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::StringLiteral(StringLiteral {
            value: value.into(),
            loc: None,
        })
    }

    pub fn number(value: impl Into<serde_json::Number>) -> Self {
        Expression::NumberLiteral(NumberLiteral {
            value: value.into(),
            loc: None,
        })
    }

    pub fn boolean(value: bool) -> Self {
        Expression::BooleanLiteral(BooleanLiteral { value, loc: None })
    }

    pub fn null() -> Self {
        Expression::NullLiteral(NullLiteral { loc: None })
    }

    pub fn undefined() -> Self {
        Expression::UndefinedLiteral(UndefinedLiteral { loc: None })
    }
}

/// A variable reference: `name`, `a.b.c`, `../a`, `this`, `@index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathExpression {
    /// `true` for `@data` variables.
    #[serde(default)]
    pub data: bool,
    /// Number of `../` hops.
    #[serde(default)]
    pub depth: usize,
    /// Dotted segments, with `this` and `.` already removed.
    #[serde(default)]
    pub parts: Vec<String>,
    /// The path as written in the template.
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

impl PathExpression {
    pub fn new(depth: usize, parts: &[&str]) -> Self {
        let dotted = parts.join(".");
        let original = format!("{}{}", "../".repeat(depth), dotted);
        Self {
            data: false,
            depth,
            parts: parts.iter().map(|p| p.to_string()).collect(),
            original,
            loc: None,
        }
    }

    /// Helper name for a path in callee position (its first segment).
    pub fn head(&self) -> Option<&str> {
        self.parts.first().map(|s| s.as_str())
    }
}

/// `(helper args...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubExpression {
    pub path: Box<Expression>,
    #[serde(default)]
    pub params: Vec<Expression>,
    #[serde(default)]
    pub hash: Option<Hash>,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringLiteral {
    pub value: String,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberLiteral {
    pub value: serde_json::Number,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanLiteral {
    pub value: bool,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndefinedLiteral {
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullLiteral {
    #[serde(default)]
    pub loc: Option<SourceLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_parser_output() {
        // Output of Handlebars.parse("Hello {{world}}"), trimmed of strip flags
        let ast = Node::from_value(json!({
            "type": "Program",
            "body": [
                {
                    "type": "ContentStatement",
                    "original": "Hello ",
                    "value": "Hello "
                },
                {
                    "type": "MustacheStatement",
                    "path": {
                        "type": "PathExpression",
                        "data": false,
                        "depth": 0,
                        "parts": ["world"],
                        "original": "world"
                    },
                    "params": [],
                    "escaped": true,
                    "strip": { "open": false, "close": false },
                    "loc": { "source": null, "start": { "line": 1, "column": 6 }, "end": { "line": 1, "column": 15 } }
                }
            ],
            "strip": {}
        }))
        .unwrap();

        let Node::Program(program) = ast else {
            panic!("expected a program");
        };
        assert_eq!(program.body.len(), 2);
        assert_eq!(program.body[0], Node::content("Hello "));
        match &program.body[1] {
            Node::MustacheStatement(m) => {
                assert!(m.escaped);
                assert!(m.hash.is_none());
                assert_eq!(m.path, Expression::path(0, &["world"]));
                assert_eq!(m.loc.as_ref().map(|l| l.to_string()), Some("1:6".to_string()));
            }
            other => panic!("unexpected node {}", other.kind()),
        }
    }

    #[test]
    fn test_parse_block_with_hash() {
        let ast = Node::from_value(json!({
            "type": "BlockStatement",
            "path": { "type": "PathExpression", "depth": 0, "parts": ["helper"], "original": "helper" },
            "params": [],
            "hash": {
                "type": "Hash",
                "pairs": [
                    { "type": "HashPair", "key": "x", "value": { "type": "NumberLiteral", "value": 1, "original": 1 } },
                    { "type": "HashPair", "key": "y", "value": { "type": "NullLiteral", "value": null, "original": null } }
                ]
            },
            "program": { "type": "Program", "body": [], "blockParams": null },
            "inverse": null
        }))
        .unwrap();

        let Node::BlockStatement(block) = ast else {
            panic!("expected a block");
        };
        let hash = block.hash.unwrap();
        assert_eq!(hash.pairs[0].key, "x");
        assert_eq!(hash.pairs[0].value, Expression::number(1));
        assert_eq!(hash.pairs[1].value, Expression::null());
        assert!(block.inverse.is_none());
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let err = Node::from_json(r#"{ "type": "Mystery" }"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid template AST"));
    }

    #[test]
    fn test_path_original() {
        let path = PathExpression::new(2, &["world", "name"]);
        assert_eq!(path.original, "../../world.name");
        assert_eq!(path.head(), Some("world"));
    }

    #[test]
    fn test_location_display() {
        let loc = SourceLocation {
            source: Some("page.hbs".to_string()),
            start: Position { line: 3, column: 4 },
            end: Position { line: 3, column: 9 },
        };
        assert_eq!(loc.to_string(), "page.hbs:3:4");
    }
}
