//! Common Platform Enumeration identifiers.
//!
//! Accepts the CPE 2.3 formatted-string binding and the older 2.2 URI
//! binding. Both are normalised to the eleven 2.3 attributes; attributes the
//! input leaves out are `*` (ANY).

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const FORMATTED_PREFIX: &str = "cpe:2.3:";
const URI_PREFIX: &str = "cpe:/";
const ATTRIBUTE_COUNT: usize = 11;
const ANY: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpeError {
    #[error("missing cpe:2.3: or cpe:/ prefix in {0:?}")]
    Prefix(String),
    #[error("invalid part {0:?}, expected a, o or h")]
    Part(String),
    #[error("{0} attributes, at most {ATTRIBUTE_COUNT} allowed")]
    TooManyAttributes(usize),
    #[error("empty attribute at position {0}")]
    EmptyAttribute(usize),
    #[error("whitespace is not allowed in a CPE")]
    Whitespace,
}

/// A parsed CPE name. Attributes are stored in 2.3 order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cpe {
    attributes: [String; ATTRIBUTE_COUNT],
}

impl Cpe {
    pub fn part(&self) -> &str {
        &self.attributes[0]
    }

    pub fn vendor(&self) -> &str {
        &self.attributes[1]
    }

    pub fn product(&self) -> &str {
        &self.attributes[2]
    }

    pub fn version(&self) -> &str {
        &self.attributes[3]
    }

    fn from_fields(fields: Vec<String>) -> Result<Self, CpeError> {
        if fields.len() > ATTRIBUTE_COUNT {
            return Err(CpeError::TooManyAttributes(fields.len()));
        }
        if !matches!(fields.first().map(String::as_str), Some("a" | "o" | "h")) {
            return Err(CpeError::Part(fields.first().cloned().unwrap_or_default()));
        }

        let mut attributes: [String; ATTRIBUTE_COUNT] = Default::default();
        for (index, slot) in attributes.iter_mut().enumerate() {
            *slot = fields.get(index).cloned().unwrap_or_else(|| ANY.to_string());
        }
        Ok(Self { attributes })
    }

    fn parse_formatted(body: &str) -> Result<Self, CpeError> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut chars = body.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    current.push(c);
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                ':' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        fields.push(current);

        if let Some(position) = fields.iter().position(String::is_empty) {
            return Err(CpeError::EmptyAttribute(position));
        }
        Self::from_fields(fields)
    }

    fn parse_uri(body: &str) -> Result<Self, CpeError> {
        let mut fields: Vec<String> = body
            .split(':')
            .map(|field| {
                if field.is_empty() {
                    ANY.to_string()
                } else {
                    decode_percent(field)
                }
            })
            .collect();

        // Packed edition: ~edition~sw_edition~target_sw~target_hw~other
        if fields.len() >= 6 && fields[5].starts_with('~') {
            let packed: Vec<String> = fields[5][1..]
                .split('~')
                .map(|v| if v.is_empty() { ANY.to_string() } else { v.to_string() })
                .collect();
            let language = fields.get(6).cloned();
            fields.truncate(5);
            let mut packed = packed.into_iter();
            fields.push(packed.next().unwrap_or_else(|| ANY.to_string()));
            fields.push(language.unwrap_or_else(|| ANY.to_string()));
            fields.extend(packed);
        }

        Self::from_fields(fields)
    }
}

fn decode_percent(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;
    while let Some(c) = rest.chars().next() {
        if c == '%' {
            if let Some(decoded) = rest
                .get(1..3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                let decoded = decoded as char;
                if !decoded.is_ascii_alphanumeric() && decoded != '_' {
                    out.push('\\');
                }
                out.push(decoded);
                rest = &rest[3..];
                continue;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

impl FromStr for Cpe {
    type Err = CpeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().any(char::is_whitespace) {
            return Err(CpeError::Whitespace);
        }
        if let Some(body) = s.strip_prefix(FORMATTED_PREFIX) {
            Self::parse_formatted(body)
        } else if let Some(body) = s.strip_prefix(URI_PREFIX) {
            Self::parse_uri(body)
        } else {
            Err(CpeError::Prefix(s.to_string()))
        }
    }
}

impl fmt::Display for Cpe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpe:2.3:{}", self.attributes.join(":"))
    }
}

impl Serialize for Cpe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
