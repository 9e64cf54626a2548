//! Document identifiers and their URL path encoding
//!
//! A [`DocumentId`] is either an atom (keyword, string, integer or uuid) or a
//! composite map of keyword fields to atoms, e.g. `{:person-id 1}`.
//!
//! ## Path tokens
//!
//! - Atoms encode as their canonical EDN text, percent-encoded:
//!   `:hello` → `%3Ahello`
//! - Composites get a literal `_` prefix before the percent-encoded text:
//!   `{:person-id 1}` → `_%7B%3Aperson-id%201%7D`
//!
//! `_` is always escaped inside the encoded text, so a leading `_` only ever
//! marks a composite.

use std::fmt;
use std::hash::{Hash, Hasher};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::edn::{self, Keyword, Value};

/// Marks a composite identifier in a path token
pub const COMPOSITE_PREFIX: char = '_';

/// Path prefix for document pages
pub const DOC_PATH_PREFIX: &str = "/doc/";

/// Bytes left unescaped in path tokens
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'~');

/// An identifier or path token that cannot be turned into a [`DocumentId`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedIdentifier {
    #[error("Empty document identifier")]
    Empty,

    #[error("Identifier token '{0}' is not valid UTF-8 after percent-decoding")]
    InvalidEncoding(String),

    #[error("Identifier '{text}' is not valid EDN: {source}")]
    Syntax {
        text: String,
        #[source]
        source: edn::ParseError,
    },

    #[error("A {0} cannot be used as a document identifier")]
    UnsupportedValue(&'static str),

    #[error("Composite identifier field {0} must be a keyword")]
    NonKeywordField(String),

    #[error("Composite identifier repeats field {0}")]
    DuplicateField(Keyword),

    #[error("Composite identifier has no fields")]
    EmptyComposite,

    #[error("Token '{0}' is marked composite but does not hold a map")]
    NotComposite(String),

    #[error("Token '{0}' holds a map but lacks the composite prefix")]
    MissingCompositePrefix(String),
}

#[derive(Debug, Clone)]
enum Shape {
    Atom(Value),
    /// Fields sorted by name
    Composite(Vec<(Keyword, Value)>),
}

/// Opaque, value-equal identifier of a document across all its versions
///
/// Equality and hashing use the canonical EDN text.
#[derive(Debug, Clone)]
pub struct DocumentId {
    shape: Shape,
    canonical: String,
}

impl DocumentId {
    /// Build an atom identifier
    pub fn atom(value: Value) -> Result<Self, MalformedIdentifier> {
        check_atom(&value)?;
        let canonical = value.to_string();
        Ok(Self {
            shape: Shape::Atom(value),
            canonical,
        })
    }

    /// Keyword atom, e.g. `DocumentId::keyword("hello")` for `:hello`
    pub fn keyword(name: impl Into<String>) -> Self {
        let value = Value::keyword(name);
        let canonical = value.to_string();
        Self {
            shape: Shape::Atom(value),
            canonical,
        }
    }

    /// Build a composite identifier; fields are sorted by name
    pub fn composite<I>(fields: I) -> Result<Self, MalformedIdentifier>
    where
        I: IntoIterator<Item = (Keyword, Value)>,
    {
        let mut fields: Vec<(Keyword, Value)> = fields.into_iter().collect();
        if fields.is_empty() {
            return Err(MalformedIdentifier::EmptyComposite);
        }
        for (_, value) in &fields {
            check_atom(value)?;
        }
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = fields.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(MalformedIdentifier::DuplicateField(pair[0].0.clone()));
        }

        let canonical = Value::Map(
            fields
                .iter()
                .map(|(k, v)| (Value::Keyword(k.clone()), v.clone()))
                .collect(),
        )
        .to_string();

        Ok(Self {
            shape: Shape::Composite(fields),
            canonical,
        })
    }

    /// Interpret an EDN value as an identifier (maps become composites)
    pub fn from_value(value: Value) -> Result<Self, MalformedIdentifier> {
        match value {
            Value::Map(entries) => {
                let fields = entries
                    .into_iter()
                    .map(|(k, v)| match k {
                        Value::Keyword(kw) => Ok((kw, v)),
                        other => Err(MalformedIdentifier::NonKeywordField(other.to_string())),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::composite(fields)
            }
            other => Self::atom(other),
        }
    }

    /// Parse identifier text as typed by a user, e.g. `:hello` or `{:person-id 1}`
    pub fn from_edn_text(text: &str) -> Result<Self, MalformedIdentifier> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MalformedIdentifier::Empty);
        }
        let value = edn::parse(text).map_err(|source| MalformedIdentifier::Syntax {
            text: text.to_string(),
            source,
        })?;
        Self::from_value(value)
    }

    /// The identifier as an EDN value
    pub fn to_value(&self) -> Value {
        match &self.shape {
            Shape::Atom(value) => value.clone(),
            Shape::Composite(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(k, v)| (Value::Keyword(k.clone()), v.clone()))
                    .collect(),
            ),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.shape, Shape::Composite(_))
    }

    /// Canonical EDN text, also used as the storage key
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Encode as a single URL path segment
    pub fn encode(&self) -> String {
        let escaped = utf8_percent_encode(&self.canonical, PATH_SAFE).to_string();
        if self.is_composite() {
            format!("{}{}", COMPOSITE_PREFIX, escaped)
        } else {
            escaped
        }
    }

    /// Decode a path segment produced by [`DocumentId::encode`]
    pub fn decode(token: &str) -> Result<Self, MalformedIdentifier> {
        if token.is_empty() {
            return Err(MalformedIdentifier::Empty);
        }
        let (composite, body) = match token.strip_prefix(COMPOSITE_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        let text = percent_decode_str(body)
            .decode_utf8()
            .map_err(|_| MalformedIdentifier::InvalidEncoding(token.to_string()))?;
        let id = Self::from_edn_text(&text)?;

        match (composite, id.is_composite()) {
            (true, false) => Err(MalformedIdentifier::NotComposite(token.to_string())),
            (false, true) => Err(MalformedIdentifier::MissingCompositePrefix(token.to_string())),
            _ => Ok(id),
        }
    }

    /// Link to the document page for this identifier
    pub fn href(&self) -> String {
        format!("{}{}", DOC_PATH_PREFIX, self.encode())
    }
}

fn check_atom(value: &Value) -> Result<(), MalformedIdentifier> {
    match value {
        Value::Keyword(_) | Value::Str(_) | Value::Int(_) | Value::Uuid(_) => Ok(()),
        other => Err(MalformedIdentifier::UnsupportedValue(other.type_name())),
    }
}

impl PartialEq for DocumentId {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for DocumentId {}

impl Hash for DocumentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical)
    }
}
