//! Type-tagged attribute values as carried by change-feed images.
//!
//! Every value is an object with a single tag: `{"S": "101"}`, `{"N": "2"}`,
//! `{"BOOL": true}`, `{"NULL": true}` or `{"M": {...}}`. Maps are decoded one level deep.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::Error;

/// How many `M` levels below the item itself are decoded.
const MAX_MAP_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    S(String),
    N(f64),
    Bool(bool),
    Null,
    M(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn decode(value: &Value) -> Result<Self, Error> {
        Self::decode_at(value, 0)
    }

    /// Decode a whole item. Fields that fail to decode are dropped with a warning so one odd
    /// attribute does not make the rest of the image unreadable.
    pub fn decode_item(image: &Map<String, Value>) -> BTreeMap<String, AttributeValue> {
        image
            .iter()
            .filter_map(|(name, raw)| match Self::decode_at(raw, 0) {
                Ok(value) => Some((name.clone(), value)),
                Err(e) => {
                    warn!(attribute = %name, error = %e, "dropping undecodable attribute");
                    None
                }
            })
            .collect()
    }

    fn decode_at(value: &Value, depth: usize) -> Result<Self, Error> {
        let Value::Object(tagged) = value else {
            return Err(Error::InvalidAttribute(format!(
                "expected a type-tagged object, got {value}"
            )));
        };
        let mut entries = tagged.iter();
        let (tag, inner) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(Error::InvalidAttribute(format!(
                    "expected exactly one type tag in {value}"
                )))
            }
        };

        match (tag.as_str(), inner) {
            ("S", Value::String(s)) => Ok(Self::S(s.clone())),
            ("N", Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Self::N)
                .map_err(|_| Error::InvalidAttribute(format!("{s:?} is not a number"))),
            ("N", Value::Number(n)) => n
                .as_f64()
                .map(Self::N)
                .ok_or_else(|| Error::InvalidAttribute(format!("{n} is not representable"))),
            ("BOOL", Value::Bool(b)) => Ok(Self::Bool(*b)),
            ("NULL", _) => Ok(Self::Null),
            ("M", Value::Object(map)) if depth < MAX_MAP_DEPTH => {
                let mut decoded = BTreeMap::new();
                for (name, raw) in map {
                    decoded.insert(name.clone(), Self::decode_at(raw, depth + 1)?);
                }
                Ok(Self::M(decoded))
            }
            ("M", Value::Object(_)) => Err(Error::InvalidAttribute(
                "maps nested more than one level deep are not supported".to_string(),
            )),
            (tag, inner) => Err(Error::InvalidAttribute(format!(
                "unsupported attribute {tag}: {inner}"
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar rendered as text. Integral numbers drop the fractional part so a numeric
    /// room `101` reads as `"101"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::S(s) => Some(s.clone()),
            Self::N(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Self::N(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
