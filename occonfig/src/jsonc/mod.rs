//! JSON-with-comments parsing that keeps source positions.
//!
//! The parser accepts `//` line comments, `/* */` block comments and trailing
//! commas. Instead of producing only a [`Value`], it builds a positional
//! [`Node`] tree where every value and property records its byte offset and
//! length in the source text. The [`edit`] module uses those positions to
//! compute minimal text edits, so comments and formatting outside the edited
//! range survive a save untouched.
//!
//! [`parse_tree_tolerant`] keeps going past malformed input and reports what
//! it skipped, so a single typo in a hand-edited file does not hide the rest
//! of the document. [`parse`] and [`parse_tree`] are the strict variants.

use serde_json::{Map, Value};
use thiserror::Error;

/// Structural text edits computed against a parsed document.
pub mod edit;

pub use edit::{Edit, FormattingOptions, apply_edits, compute_edits};

/// Errors raised while parsing or editing JSONC text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsoncError {
    /// The text is not valid JSONC.
    #[error("invalid JSONC at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
    /// The requested edit cannot be expressed on this document.
    #[error("{0}")]
    Unsupported(String),
    /// A value could not be serialized.
    #[error("failed to serialize value: {0}")]
    Serialize(String),
}

/// Kind of a positional node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
    Property,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeKind {
    /// Human readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::Property => "property",
            NodeKind::String => "string",
            NodeKind::Number => "number",
            NodeKind::Boolean => "boolean",
            NodeKind::Null => "null",
        }
    }
}

/// A value or property in the source text.
///
/// `Property` nodes span from the opening quote of the key to the end of the
/// value and hold the value as their only child. Containers hold their
/// entries in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub offset: usize,
    pub length: usize,
    pub children: Vec<Node>,
    /// Decoded key, set on `Property` nodes.
    pub key: Option<String>,
    /// Decoded literal, set on scalar nodes.
    pub literal: Option<Value>,
}

impl Node {
    /// Byte offset just past the node.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Value of a `Property` node.
    pub fn property_value(&self) -> Option<&Node> {
        match self.kind {
            NodeKind::Property => self.children.first(),
            _ => None,
        }
    }

    /// Index of the property named `key` in an object node.
    ///
    /// Duplicate keys resolve to the last occurrence, matching how
    /// [`Node::to_value`] collapses them.
    pub fn property_index(&self, key: &str) -> Option<usize> {
        if self.kind != NodeKind::Object {
            return None;
        }
        self.children
            .iter()
            .rposition(|p| p.key.as_deref() == Some(key))
    }

    /// Child node addressed by a single path segment.
    pub fn child(&self, segment: &str) -> Option<&Node> {
        match self.kind {
            NodeKind::Object => self
                .property_index(segment)
                .and_then(|i| self.children[i].property_value()),
            NodeKind::Array => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| self.children.get(i)),
            _ => None,
        }
    }

    /// Node found by walking `path` from this node.
    pub fn find(&self, path: &[String]) -> Option<&Node> {
        let mut current = self;
        for segment in path {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Convert the node into a plain JSON value.
    pub fn to_value(&self) -> Value {
        match self.kind {
            NodeKind::Object => {
                let mut map = Map::new();
                for property in &self.children {
                    if let (Some(key), Some(value)) = (&property.key, property.property_value()) {
                        map.insert(key.clone(), value.to_value());
                    }
                }
                Value::Object(map)
            }
            NodeKind::Array => Value::Array(self.children.iter().map(Node::to_value).collect()),
            NodeKind::Property => self
                .property_value()
                .map(Node::to_value)
                .unwrap_or(Value::Null),
            _ => self.literal.clone().unwrap_or(Value::Null),
        }
    }
}

/// Deepest container nesting the parser accepts.
///
/// Recursion is bounded by this limit, so hostile input is reported as an
/// error instead of exhausting the stack.
pub const MAX_NESTING: usize = 128;

/// Result of a recovering parse.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseOutput {
    /// `None` for an empty document or when nothing could be recovered.
    pub root: Option<Node>,
    /// Problems in source order; empty for a well-formed document.
    pub errors: Vec<JsoncError>,
}

impl ParseOutput {
    pub fn value(&self) -> Option<Value> {
        self.root.as_ref().map(Node::to_value)
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Colon,
    Comma,
    String,
    Number,
    True,
    False,
    Null,
    Eof,
}

impl Token {
    fn starts_value(self) -> bool {
        matches!(
            self,
            Token::OpenBrace
                | Token::OpenBracket
                | Token::String
                | Token::Number
                | Token::True
                | Token::False
                | Token::Null
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Lexeme {
    token: Token,
    start: usize,
    end: usize,
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    errors: Vec<JsoncError>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> JsoncError {
        JsoncError::Parse {
            offset,
            message: message.into(),
        }
    }

    fn record(&mut self, offset: usize, message: impl Into<String>) {
        let error = self.error(offset, message);
        self.errors.push(error);
    }

    fn skip_trivia(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    let start = self.pos;
                    let text = self.text;
                    match text[self.pos + 2..].find("*/") {
                        Some(rel) => self.pos += rel + 4,
                        None => {
                            self.record(start, "unterminated block comment");
                            self.pos = self.bytes.len();
                        }
                    }
                }
                // byte order mark
                0xEF if self.bytes[self.pos..].starts_with(&[0xEF, 0xBB, 0xBF]) => self.pos += 3,
                _ => break,
            }
        }
    }

    /// Next token. Malformed input is recorded and skipped.
    fn next(&mut self) -> Lexeme {
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(&byte) = self.bytes.get(self.pos) else {
                return Lexeme {
                    token: Token::Eof,
                    start,
                    end: start,
                };
            };

            let token = match byte {
                b'{' => Token::OpenBrace,
                b'}' => Token::CloseBrace,
                b'[' => Token::OpenBracket,
                b']' => Token::CloseBracket,
                b':' => Token::Colon,
                b',' => Token::Comma,
                b'"' => {
                    if self.scan_string() {
                        return Lexeme {
                            token: Token::String,
                            start,
                            end: self.pos,
                        };
                    }
                    continue;
                }
                b'-' | b'0'..=b'9' => {
                    while self.pos < self.bytes.len()
                        && matches!(self.bytes[self.pos], b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')
                    {
                        self.pos += 1;
                    }
                    return Lexeme {
                        token: Token::Number,
                        start,
                        end: self.pos,
                    };
                }
                b'a'..=b'z' | b'A'..=b'Z' => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_alphanumeric() {
                        self.pos += 1;
                    }
                    let text = self.text;
                    let token = match &text[start..self.pos] {
                        "true" => Token::True,
                        "false" => Token::False,
                        "null" => Token::Null,
                        word => {
                            let message = format!("unexpected identifier `{word}`");
                            self.record(start, message);
                            continue;
                        }
                    };
                    return Lexeme {
                        token,
                        start,
                        end: self.pos,
                    };
                }
                _ => {
                    let ch = self.text[start..].chars().next().unwrap_or('\u{FFFD}');
                    self.record(start, format!("unexpected character `{ch}`"));
                    self.pos += ch.len_utf8();
                    continue;
                }
            };
            self.pos += 1;
            return Lexeme {
                token,
                start,
                end: self.pos,
            };
        }
    }

    /// Scan a string literal; `false` (with the error recorded) when it is
    /// not closed on its line.
    fn scan_string(&mut self) -> bool {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return true;
                }
                b'\n' => {
                    self.record(self.pos, "line break inside string");
                    return false;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.bytes.len();
        self.record(start, "unterminated string");
        false
    }
}

/// Recursive descent over the scanner's tokens.
///
/// Recoverable problems are recorded and parsing continues: a missing
/// separator is assumed, stray tokens are skipped and a value that cannot be
/// decoded is dropped. Only [`MAX_NESTING`] aborts the parse.
struct Parser<'a> {
    scanner: Scanner<'a>,
    peeked: Option<Lexeme>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            scanner: Scanner::new(text),
            peeked: None,
        }
    }

    fn next(&mut self) -> Lexeme {
        match self.peeked.take() {
            Some(lexeme) => lexeme,
            None => self.scanner.next(),
        }
    }

    fn peek(&mut self) -> Lexeme {
        if let Some(lexeme) = self.peeked {
            return lexeme;
        }
        let lexeme = self.scanner.next();
        self.peeked = Some(lexeme);
        lexeme
    }

    fn record(&mut self, offset: usize, message: impl Into<String>) {
        self.scanner.record(offset, message);
    }

    fn decode<T: serde::de::DeserializeOwned>(&mut self, lexeme: Lexeme) -> Option<T> {
        let text = self.scanner.text;
        match serde_json::from_str(&text[lexeme.start..lexeme.end]) {
            Ok(value) => Some(value),
            Err(e) => {
                self.record(lexeme.start, e.to_string());
                None
            }
        }
    }

    fn scalar(kind: NodeKind, lexeme: Lexeme, literal: Value) -> Node {
        Node {
            kind,
            offset: lexeme.start,
            length: lexeme.end - lexeme.start,
            children: Vec::new(),
            key: None,
            literal: Some(literal),
        }
    }

    fn container(kind: NodeKind, start: usize, end: usize, children: Vec<Node>) -> Node {
        Node {
            kind,
            offset: start,
            length: end - start,
            children,
            key: None,
            literal: None,
        }
    }

    /// Parse one value nested inside `depth` containers.
    ///
    /// `Ok(None)` means no value could be read here; the problem is recorded
    /// and a token that cannot start a value is left unconsumed. `Err` is
    /// returned only when the nesting limit is exceeded.
    fn parse_value(&mut self, depth: usize) -> Result<Option<Node>, JsoncError> {
        let lexeme = self.peek();
        match lexeme.token {
            Token::OpenBrace | Token::OpenBracket if depth >= MAX_NESTING => Err(self
                .scanner
                .error(lexeme.start, format!("nesting deeper than {MAX_NESTING} levels"))),
            Token::OpenBrace => {
                self.next();
                self.parse_object(lexeme.start, depth + 1).map(Some)
            }
            Token::OpenBracket => {
                self.next();
                self.parse_array(lexeme.start, depth + 1).map(Some)
            }
            Token::String => {
                self.next();
                Ok(self
                    .decode::<String>(lexeme)
                    .map(|s| Self::scalar(NodeKind::String, lexeme, Value::String(s))))
            }
            Token::Number => {
                self.next();
                Ok(self
                    .decode::<serde_json::Number>(lexeme)
                    .map(|n| Self::scalar(NodeKind::Number, lexeme, Value::Number(n))))
            }
            Token::True => {
                self.next();
                Ok(Some(Self::scalar(NodeKind::Boolean, lexeme, Value::Bool(true))))
            }
            Token::False => {
                self.next();
                Ok(Some(Self::scalar(NodeKind::Boolean, lexeme, Value::Bool(false))))
            }
            Token::Null => {
                self.next();
                Ok(Some(Self::scalar(NodeKind::Null, lexeme, Value::Null)))
            }
            Token::Eof => {
                self.record(lexeme.start, "unexpected end of input");
                Ok(None)
            }
            _ => {
                self.record(lexeme.start, "expected a value");
                Ok(None)
            }
        }
    }

    fn parse_object(&mut self, start: usize, depth: usize) -> Result<Node, JsoncError> {
        let mut children = Vec::new();
        loop {
            let lexeme = self.peek();
            match lexeme.token {
                Token::CloseBrace => {
                    self.next();
                    return Ok(Self::container(NodeKind::Object, start, lexeme.end, children));
                }
                Token::Eof => {
                    self.record(lexeme.start, "expected `}`");
                    return Ok(Self::container(NodeKind::Object, start, lexeme.start, children));
                }
                Token::String => {
                    self.next();
                    let key = self.decode::<String>(lexeme);

                    let colon = self.peek();
                    if colon.token == Token::Colon {
                        self.next();
                    } else {
                        self.record(colon.start, "expected `:`");
                    }

                    let value = self.parse_value(depth)?;
                    if let (Some(key), Some(value)) = (key, value) {
                        children.push(Node {
                            kind: NodeKind::Property,
                            offset: lexeme.start,
                            length: value.end() - lexeme.start,
                            children: vec![value],
                            key: Some(key),
                            literal: None,
                        });
                    }

                    let separator = self.peek();
                    match separator.token {
                        Token::Comma => {
                            self.next();
                        }
                        Token::CloseBrace | Token::Eof => {}
                        _ => self.record(separator.start, "expected `,` or `}`"),
                    }
                }
                _ => {
                    self.next();
                    self.record(lexeme.start, "expected a property name");
                }
            }
        }
    }

    fn parse_array(&mut self, start: usize, depth: usize) -> Result<Node, JsoncError> {
        let mut children = Vec::new();
        loop {
            let lexeme = self.peek();
            match lexeme.token {
                Token::CloseBracket => {
                    self.next();
                    return Ok(Self::container(NodeKind::Array, start, lexeme.end, children));
                }
                Token::Eof => {
                    self.record(lexeme.start, "expected `]`");
                    return Ok(Self::container(NodeKind::Array, start, lexeme.start, children));
                }
                token if token.starts_value() => {
                    if let Some(value) = self.parse_value(depth)? {
                        children.push(value);
                    }

                    let separator = self.peek();
                    match separator.token {
                        Token::Comma => {
                            self.next();
                        }
                        Token::CloseBracket | Token::Eof => {}
                        _ => self.record(separator.start, "expected `,` or `]`"),
                    }
                }
                _ => {
                    self.next();
                    self.record(lexeme.start, "expected a value");
                }
            }
        }
    }

    fn finish(self, root: Option<Node>) -> ParseOutput {
        ParseOutput {
            root,
            errors: self.scanner.errors,
        }
    }
}

/// Parse `text`, recovering from errors.
///
/// The returned tree holds every value that could be read; the problems met
/// on the way are listed in [`ParseOutput::errors`]. Exceeding
/// [`MAX_NESTING`] discards the whole document.
pub fn parse_tree_tolerant(text: &str) -> ParseOutput {
    let mut parser = Parser::new(text);
    if parser.peek().token == Token::Eof {
        return parser.finish(None);
    }

    let root = match parser.parse_value(0) {
        Ok(root) => root,
        Err(fatal) => {
            parser.scanner.errors.push(fatal);
            return parser.finish(None);
        }
    };

    let rest = parser.next();
    if rest.token != Token::Eof {
        parser.record(rest.start, "unexpected content after the document");
    }
    parser.finish(root)
}

/// Parse `text` into a positional tree.
///
/// Returns `Ok(None)` when the document holds no value (empty or comments
/// only).
///
/// # Errors
///
/// Fails with the first problem [`parse_tree_tolerant`] reports.
pub fn parse_tree(text: &str) -> Result<Option<Node>, JsoncError> {
    let output = parse_tree_tolerant(text);
    match output.errors.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(output.root),
    }
}

/// Parse `text` into a plain JSON value.
pub fn parse(text: &str) -> Result<Option<Value>, JsoncError> {
    Ok(parse_tree(text)?.map(|node| node.to_value()))
}
