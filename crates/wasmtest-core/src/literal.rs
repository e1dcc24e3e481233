//! Typed literal codec — `type:value` tokens to runtime values and back
//!
//! # Grammar
//!
//! ```text
//! list    := ""  |  literal ("," literal)*
//! literal := tag ":" text  |  "[" list "]"
//! tag     := "int" | "string" | "address" | "bool" | "bytearray"
//! ```
//!
//! Inside `string:` text a backslash escapes the next character, so `\,`
//! is a comma that does not split the list and `\\` is a backslash.
//! Tokens are trimmed of surrounding whitespace before decoding, except
//! whitespace that is escaped: `string:a\ ` decodes to `"a "`.

use crate::address::Address;
use crate::parser::tokenizer::{self, SpannedToken};
use crate::{Error, Result};

// ── Core Types ────────────────────────────────────────────

/// A decoded literal value
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Signed 128-bit integer
    Int(i128),
    /// UTF-8 string
    String(String),
    /// 20-byte address, base58check in text
    Address(Address),
    /// Boolean
    Bool(bool),
    /// Raw bytes, hex in text
    #[serde(rename = "bytearray")]
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    /// Ordered list of values
    Array(Vec<Value>),
}

/// Declared type of a method parameter or return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    String,
    Address,
    Bool,
    #[serde(rename = "bytearray")]
    Bytes,
    Array,
}

impl ParamType {
    /// The literal tag for this type
    pub fn tag(&self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::String => "string",
            ParamType::Address => "address",
            ParamType::Bool => "bool",
            ParamType::Bytes => "bytearray",
            ParamType::Array => "array",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl Value {
    pub fn param_type(&self) -> ParamType {
        match self {
            Value::Int(_) => ParamType::Int,
            Value::String(_) => ParamType::String,
            Value::Address(_) => ParamType::Address,
            Value::Bool(_) => ParamType::Bool,
            Value::Bytes(_) => ParamType::Bytes,
            Value::Array(_) => ParamType::Array,
        }
    }

    /// Encode as a canonical `type:value` literal
    pub fn encode(&self) -> String {
        match self {
            Value::Int(i) => format!("int:{}", i),
            Value::String(s) => format!("string:{}", escape(s)),
            Value::Address(a) => format!("address:{}", a.to_base58()),
            Value::Bool(b) => format!("bool:{}", b),
            Value::Bytes(b) => format!("bytearray:{}", hex::encode(b)),
            Value::Array(items) => format!("[{}]", encode_list(items)),
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

// ── Decoding ──────────────────────────────────────────────

/// Decode a comma-joined literal list into values, in order
pub fn decode_list(text: &str) -> Result<Vec<Value>> {
    tokenizer::tokenize(text)?
        .iter()
        .map(decode_token)
        .collect()
}

/// Decode a single literal; empty input means "no value"
pub fn decode_optional(text: &str) -> Result<Option<Value>> {
    let mut values = decode_list(text)?;
    match values.len() {
        0 => Ok(None),
        1 => Ok(values.pop()),
        n => Err(Error::LiteralDecode {
            token: text.trim().to_string(),
            position: 1,
            reason: format!("expected a single literal, found {}", n),
        }),
    }
}

/// Decode one spanned token
pub fn decode_token(token: &SpannedToken) -> Result<Value> {
    decode_at(&token.text, token.span.position)
}

fn decode_at(text: &str, position: usize) -> Result<Value> {
    let fail = |reason: String| Error::LiteralDecode {
        token: text.to_string(),
        position,
        reason,
    };

    if text.is_empty() {
        return Err(fail("empty literal".into()));
    }

    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| fail("array literal must end with ']'".into()))?;
        let items = tokenizer::tokenize(inner).map_err(|e| fail(e.to_string()))?;
        let values = items
            .iter()
            .map(|item| decode_at(&item.text, position))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Value::Array(values));
    }

    let (tag, raw) = text
        .split_once(':')
        .ok_or_else(|| fail("missing 'type:' prefix".into()))?;

    match tag.trim() {
        "int" => raw
            .trim()
            .parse::<i128>()
            .map(Value::Int)
            .map_err(|e| fail(format!("invalid integer: {}", e))),
        "string" => unescape(raw).map(Value::String).map_err(fail),
        "address" => Address::from_base58(raw.trim())
            .map(Value::Address)
            .map_err(fail),
        "bool" => match raw.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(fail(format!("invalid bool '{}'", other))),
        },
        "bytearray" => hex::decode(raw.trim())
            .map(Value::Bytes)
            .map_err(|e| fail(format!("invalid hex: {}", e))),
        other => Err(Error::UnsupportedLiteralType {
            tag: other.to_string(),
            token: text.to_string(),
        }),
    }
}

// ── Encoding ──────────────────────────────────────────────

/// Encode values as a comma-joined literal list
pub fn encode_list(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::encode)
        .collect::<Vec<_>>()
        .join(",")
}

/// Escape separators, and whitespace at either end so token trimming keeps it
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let last = s.chars().count().saturating_sub(1);
    for (i, c) in s.chars().enumerate() {
        let edge_space = (i == 0 || i == last) && c.is_whitespace();
        if edge_space || matches!(c, '\\' | ',' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unescape(s: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => return Err("dangling escape".into()),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

mod hex_bytes {
    pub fn serialize<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text: String = serde::Deserialize::deserialize(d)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

// ── Tests ─────────────────────────────────────────────────
