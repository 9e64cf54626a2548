//! Attribute values and their parsing from raw user input
//!
//! Raw text from the attribute editor is parsed according to a declared
//! [`ValueKind`] into exactly one [`AttributeValue`] tag. Input that does not
//! parse is rejected with a [`ValidationError`]; nothing is coerced.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::edn::{self, Keyword, Value};

/// Attribute reserved for the document identifier
pub const ID_ATTRIBUTE: &str = "xt/id";

/// Errors for user-supplied values and names that fail validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("'{0}' is not a boolean (expected true or false)")]
    InvalidBoolean(String),

    #[error("'{raw}' is not valid EDN: {source}")]
    InvalidEdn {
        raw: String,
        #[source]
        source: edn::ParseError,
    },

    #[error("'{0}' is not an attribute keyword (expected e.g. :my-attr)")]
    InvalidAttributeName(String),

    #[error("Attribute {0} is reserved and cannot be written")]
    ReservedAttribute(Keyword),

    #[error("Unknown value kind '{0}' (expected string, number, boolean or edn)")]
    UnknownKind(String),

    #[error("Saved query name must not be empty")]
    EmptyQueryName,

    #[error("Document body must be a map with keyword keys, got {0}")]
    InvalidDocument(String),
}

/// How raw attribute text should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Raw text taken verbatim as a string
    #[default]
    String,
    Number,
    Boolean,
    /// Raw text read as an EDN literal
    Edn,
}

impl FromStr for ValueKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(ValueKind::String),
            "number" => Ok(ValueKind::Number),
            "boolean" | "bool" => Ok(ValueKind::Boolean),
            "edn" => Ok(ValueKind::Edn),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Edn => "edn",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Number(Number),
    Boolean(bool),
    /// Any other structured literal (keyword, collection, uuid, nil)
    Literal(Value),
}

impl AttributeValue {
    /// Parse raw editor input according to `kind`
    pub fn parse(raw: &str, kind: ValueKind) -> Result<Self, ValidationError> {
        match kind {
            ValueKind::String => Ok(AttributeValue::String(raw.to_string())),
            ValueKind::Number => parse_number(raw.trim())
                .map(AttributeValue::Number)
                .ok_or_else(|| ValidationError::InvalidNumber(raw.to_string())),
            ValueKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(AttributeValue::Boolean(true)),
                "false" => Ok(AttributeValue::Boolean(false)),
                _ => Err(ValidationError::InvalidBoolean(raw.to_string())),
            },
            ValueKind::Edn => edn::parse(raw)
                .map(AttributeValue::from_value)
                .map_err(|source| ValidationError::InvalidEdn {
                    raw: raw.to_string(),
                    source,
                }),
        }
    }

    /// Classify an EDN value into its attribute tag
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Str(s) => AttributeValue::String(s),
            Value::Int(i) => AttributeValue::Number(Number::Int(i)),
            Value::Float(x) => AttributeValue::Number(Number::Float(x)),
            Value::Bool(b) => AttributeValue::Boolean(b),
            other => AttributeValue::Literal(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            AttributeValue::String(s) => Value::Str(s.clone()),
            AttributeValue::Number(Number::Int(i)) => Value::Int(*i),
            AttributeValue::Number(Number::Float(x)) => Value::Float(*x),
            AttributeValue::Boolean(b) => Value::Bool(*b),
            AttributeValue::Literal(v) => v.clone(),
        }
    }

    /// The kind this value would round-trip through
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::String(_) => ValueKind::String,
            AttributeValue::Number(_) => ValueKind::Number,
            AttributeValue::Boolean(_) => ValueKind::Boolean,
            AttributeValue::Literal(_) => ValueKind::Edn,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Number::Int(i));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .map(Number::Float)
}

/// Parse an attribute name such as `:test-attr`
pub fn parse_attribute_name(raw: &str) -> Result<Keyword, ValidationError> {
    Keyword::parse(raw.trim())
        .map_err(|_| ValidationError::InvalidAttributeName(raw.to_string()))
}

/// Parse an attribute name that callers may write to
pub fn writable_attribute(raw: &str) -> Result<Keyword, ValidationError> {
    let name = parse_attribute_name(raw)?;
    if name.name() == ID_ATTRIBUTE {
        return Err(ValidationError::ReservedAttribute(name));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edn_string_is_normalized() {
        let value = AttributeValue::parse("\"hello cypress\"", ValueKind::Edn).unwrap();
        assert_eq!(value, AttributeValue::String("hello cypress".to_string()));
        assert_eq!(value.to_string(), "\"hello cypress\"");
    }

    #[test]
    fn test_edn_structured_literal() {
        let value = AttributeValue::parse("#{\"thing1\" \"thing2\"}", ValueKind::Edn).unwrap();
        assert!(matches!(value, AttributeValue::Literal(Value::Set(_))));
        assert_eq!(value.kind(), ValueKind::Edn);
    }

    #[test]
    fn test_plain_string_is_verbatim() {
        let value = AttributeValue::parse("  not \"edn\" ", ValueKind::String).unwrap();
        assert_eq!(value, AttributeValue::String("  not \"edn\" ".to_string()));
    }

    #[test]
    fn test_number_and_boolean() {
        assert_eq!(
            AttributeValue::parse(" 42 ", ValueKind::Number).unwrap(),
            AttributeValue::Number(Number::Int(42))
        );
        assert_eq!(
            AttributeValue::parse("1.5", ValueKind::Number).unwrap(),
            AttributeValue::Number(Number::Float(1.5))
        );
        assert_eq!(
            AttributeValue::parse("TRUE", ValueKind::Boolean).unwrap(),
            AttributeValue::Boolean(true)
        );
    }

    #[test]
    fn test_parse_failures_are_errors() {
        assert!(matches!(
            AttributeValue::parse("forty", ValueKind::Number),
            Err(ValidationError::InvalidNumber(_))
        ));
        assert!(matches!(
            AttributeValue::parse("inf", ValueKind::Number),
            Err(ValidationError::InvalidNumber(_))
        ));
        assert!(matches!(
            AttributeValue::parse("yes", ValueKind::Boolean),
            Err(ValidationError::InvalidBoolean(_))
        ));
        assert!(matches!(
            AttributeValue::parse("\"unterminated", ValueKind::Edn),
            Err(ValidationError::InvalidEdn { .. })
        ));
    }

    #[test]
    fn test_value_kind_from_str() {
        assert_eq!("EDN".parse::<ValueKind>().unwrap(), ValueKind::Edn);
        assert_eq!("bool".parse::<ValueKind>().unwrap(), ValueKind::Boolean);
        assert!("json".parse::<ValueKind>().is_err());
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(
            writable_attribute(":test-attr").unwrap(),
            Keyword::new("test-attr")
        );
        assert!(matches!(
            writable_attribute("test-attr"),
            Err(ValidationError::InvalidAttributeName(_))
        ));
        assert!(matches!(
            writable_attribute(":xt/id"),
            Err(ValidationError::ReservedAttribute(_))
        ));
    }
}
