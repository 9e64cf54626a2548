//! EDN literal reader and printer
//!
//! Document ids, attribute values and queries all travel as EDN text.
//! This module reads the subset the inspector needs:
//!
//! - `nil`, `true`, `false`
//! - integers and floats (plus `##Inf`, `##-Inf`, `##NaN`)
//! - strings with `\"`, `\\`, `\n`, `\t`, `\r` and `\uXXXX` escapes
//! - keywords (`:name`, `:ns/name`) and symbols
//! - vectors, lists, maps and sets (`#{...}`)
//! - `#uuid "..."` tagged literals and `#_` discard
//!
//! Commas are whitespace and `;` starts a line comment. `Display` prints
//! canonical text that reads back to an equal value.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Errors produced while reading EDN text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("invalid number '{token}' at offset {offset}")]
    InvalidNumber { token: String, offset: usize },

    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),

    #[error("invalid keyword at offset {0}")]
    InvalidKeyword(usize),

    #[error("unsupported tag '#{tag}' at offset {offset}")]
    UnsupportedTag { tag: String, offset: usize },

    #[error("invalid uuid literal at offset {0}")]
    InvalidUuid(usize),

    #[error("map literal at offset {0} has an odd number of forms")]
    OddMapForms(usize),

    #[error("trailing input at offset {0}")]
    TrailingInput(usize),

    #[error("forms nested too deeply at offset {0}")]
    TooDeep(usize),

    #[error("no form found in input")]
    Empty,
}

/// Deepest nesting the reader accepts before giving up
pub const MAX_DEPTH: usize = 256;

/// A keyword name without its leading colon, e.g. `xt/id`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyword(String);

impl Keyword {
    /// Build a keyword from its name (no leading colon)
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parse keyword text such as `:greeting`
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        match parse(text)? {
            Value::Keyword(kw) => Ok(kw),
            _ => Err(ParseError::InvalidKeyword(0)),
        }
    }

    /// The keyword name without the colon
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

/// An EDN value
///
/// Equality is structural; map and set entries compare in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(Keyword),
    Symbol(String),
    Uuid(Uuid),
    Vector(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Shorthand for a keyword value
    pub fn keyword(name: impl Into<String>) -> Self {
        Value::Keyword(Keyword::new(name))
    }

    /// Shorthand for a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn as_keyword(&self) -> Option<&Keyword> {
        match self {
            Value::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Scalars are everything except collections
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Value::Vector(_) | Value::List(_) | Value::Set(_) | Value::Map(_)
        )
    }

    /// Human-readable type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Symbol(_) => "symbol",
            Value::Uuid(_) => "uuid",
            Value::Vector(_) => "vector",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    /// Look up a keyword key in a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find_map(|(k, v)| match k {
                Value::Keyword(kw) if kw.name() == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Compare two values of comparable types
    ///
    /// Integers and floats compare numerically with each other. Returns
    /// `None` for mixed or non-comparable types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Keyword(a), Value::Keyword(b)) => Some(a.cmp(b)),
            (Value::Symbol(a), Value::Symbol(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Nil, Value::Nil) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Total order used for sorting result rows
    ///
    /// Comparable values use [`Value::compare`]; everything else falls back
    /// to type rank, then canonical text.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        if let Some(ord) = self.compare(other) {
            return ord;
        }
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Keyword(_) => 4,
            Value::Symbol(_) => 5,
            Value::Uuid(_) => 6,
            Value::Vector(_) => 7,
            Value::List(_) => 8,
            Value::Set(_) => 9,
            Value::Map(_) => 10,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write_float(f, *x),
            Value::Str(s) => write_string(f, s),
            Value::Keyword(kw) => write!(f, "{}", kw),
            Value::Symbol(s) => f.write_str(s),
            Value::Uuid(u) => write!(f, "#uuid \"{}\"", u),
            Value::Vector(items) => write_seq(f, "[", items, "]"),
            Value::List(items) => write_seq(f, "(", items, ")"),
            Value::Set(items) => write_seq(f, "#{", items, "}"),
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("##NaN")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "##Inf" } else { "##-Inf" })
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{:.1}", x)
    } else {
        // Debug output always keeps a '.' or an exponent, so it reads back as a float
        write!(f, "{:?}", x)
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}

/// Read exactly one form from `text`
pub fn parse(text: &str) -> Result<Value, ParseError> {
    let mut reader = Reader::new(text);
    let value = reader.read_next()?.ok_or(ParseError::Empty)?;
    reader.skip_ws();
    if reader.pos < reader.src.len() {
        return Err(ParseError::TrailingInput(reader.pos));
    }
    Ok(value)
}

/// Read every top-level form in `text`
pub fn parse_all(text: &str) -> Result<Vec<Value>, ParseError> {
    let mut reader = Reader::new(text);
    let mut forms = Vec::new();
    while let Some(value) = reader.read_next()? {
        forms.push(value);
    }
    Ok(forms)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    /// Forms currently open on the call stack
    depth: usize,
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, ',' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';')
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == ',' {
                self.bump();
            } else if ch == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Read the next form, or `None` at end of input
    fn read_next(&mut self) -> Result<Option<Value>, ParseError> {
        loop {
            self.skip_ws();
            let Some(ch) = self.peek() else {
                return Ok(None);
            };
            if ch == '#' && self.src[self.pos..].starts_with("#_") {
                self.pos += 2;
                self.read_form()?;
                continue;
            }
            return self.read_form().map(Some);
        }
    }

    fn read_form(&mut self) -> Result<Value, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep(self.pos));
        }
        self.depth += 1;
        let result = self.read_one();
        self.depth -= 1;
        result
    }

    fn read_one(&mut self) -> Result<Value, ParseError> {
        self.skip_ws();
        let start = self.pos;
        let ch = self.peek().ok_or(ParseError::UnexpectedEof(start))?;
        match ch {
            '"' => self.read_string().map(Value::Str),
            '[' => {
                self.bump();
                self.read_until(']').map(Value::Vector)
            }
            '(' => {
                self.bump();
                self.read_until(')').map(Value::List)
            }
            '{' => {
                self.bump();
                let forms = self.read_until('}')?;
                pair_up(forms, start).map(Value::Map)
            }
            '#' => self.read_dispatch(),
            ':' => {
                self.bump();
                let token = self.read_token();
                if token.is_empty() || token.starts_with(':') || token.ends_with('/') {
                    return Err(ParseError::InvalidKeyword(start));
                }
                Ok(Value::keyword(token))
            }
            ')' | ']' | '}' => Err(ParseError::UnexpectedChar { ch, offset: start }),
            _ => {
                let token = self.read_token();
                if token.is_empty() {
                    return Err(ParseError::UnexpectedChar { ch, offset: start });
                }
                atom_from_token(token, start)
            }
        }
    }

    fn read_dispatch(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        self.bump();
        match self.peek() {
            Some('{') => {
                self.bump();
                self.read_until('}').map(Value::Set)
            }
            Some('#') => {
                self.bump();
                match self.read_token() {
                    "Inf" => Ok(Value::Float(f64::INFINITY)),
                    "-Inf" => Ok(Value::Float(f64::NEG_INFINITY)),
                    "NaN" => Ok(Value::Float(f64::NAN)),
                    other => Err(ParseError::UnsupportedTag {
                        tag: format!("#{}", other),
                        offset: start,
                    }),
                }
            }
            Some(_) => {
                let tag = self.read_token().to_string();
                match tag.as_str() {
                    "uuid" => match self.read_form()? {
                        Value::Str(s) => Uuid::parse_str(&s)
                            .map(Value::Uuid)
                            .map_err(|_| ParseError::InvalidUuid(start)),
                        _ => Err(ParseError::InvalidUuid(start)),
                    },
                    _ => Err(ParseError::UnsupportedTag { tag, offset: start }),
                }
            }
            None => Err(ParseError::UnexpectedEof(self.pos)),
        }
    }

    fn read_until(&mut self, close: char) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof(self.pos)),
                Some(ch) if ch == close => {
                    self.bump();
                    return Ok(items);
                }
                Some('#') if self.src[self.pos..].starts_with("#_") => {
                    self.pos += 2;
                    self.read_form()?;
                }
                Some(_) => items.push(self.read_form()?),
            }
        }
    }

    fn read_token(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if is_delimiter(ch) {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn read_string(&mut self) -> Result<String, ParseError> {
        self.bump();
        let mut out = String::new();
        loop {
            let offset = self.pos;
            match self.bump() {
                None => return Err(ParseError::UnexpectedEof(offset)),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u') => {
                        let hex = self
                            .src
                            .get(self.pos..self.pos + 4)
                            .ok_or(ParseError::InvalidEscape(offset))?;
                        let code = u32::from_str_radix(hex, 16)
                            .map_err(|_| ParseError::InvalidEscape(offset))?;
                        out.push(char::from_u32(code).ok_or(ParseError::InvalidEscape(offset))?);
                        self.pos += 4;
                    }
                    _ => return Err(ParseError::InvalidEscape(offset)),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

fn pair_up(forms: Vec<Value>, offset: usize) -> Result<Vec<(Value, Value)>, ParseError> {
    if forms.len() % 2 != 0 {
        return Err(ParseError::OddMapForms(offset));
    }
    let mut entries = Vec::with_capacity(forms.len() / 2);
    let mut iter = forms.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        entries.push((k, v));
    }
    Ok(entries)
}

fn atom_from_token(token: &str, offset: usize) -> Result<Value, ParseError> {
    match token {
        "nil" => return Ok(Value::Nil),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }

    let bytes = token.as_bytes();
    let numeric = bytes[0].is_ascii_digit()
        || (matches!(bytes[0], b'+' | b'-') && bytes.len() > 1 && bytes[1].is_ascii_digit());
    if !numeric {
        return Ok(Value::Symbol(token.to_string()));
    }

    let invalid = || ParseError::InvalidNumber {
        token: token.to_string(),
        offset,
    };
    if token.contains(['.', 'e', 'E']) || token.ends_with('M') {
        token
            .trim_end_matches('M')
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid())
    } else {
        token
            .trim_end_matches('N')
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| invalid())
    }
}
