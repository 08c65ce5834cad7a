//! Lenient deserializers for node attributes
//!
//! Stored documents come from several editor versions, so attributes show up as
//! `null`, as numbers where strings are expected and the other way round.
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Treat an explicit `null` like a missing field
pub fn deserialize_or_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    let opt: Option<T> = Deserialize::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// A non-empty string, or `None` for anything else
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Booleans, plus the strings `"true"` and `"false"`
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Unsigned integers, also when written as a string
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A width or height as the editor stores it
#[derive(Debug, Clone, PartialEq)]
pub enum Dimension {
    /// A bare number, meaning CSS pixels
    Pixels(f64),
    /// Any CSS length (`50%`, `320px`, `auto`)
    Css(String),
}

impl Dimension {
    /// The value for a `style` declaration
    pub fn css(&self) -> String {
        match self {
            Self::Pixels(px) => format!("{}px", px),
            Self::Css(s) => s.clone(),
        }
    }

    /// The value for a `width`/`height` HTML attribute
    pub fn attr(&self) -> String {
        match self {
            Self::Pixels(px) => px.to_string(),
            Self::Css(s) => s.strip_suffix("px").unwrap_or(s).to_owned(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

impl serde::Serialize for Dimension {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pixels(px) => serializer.serialize_f64(*px),
            Self::Css(s) => serializer.serialize_str(s),
        }
    }
}

pub fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<Dimension>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().map(Dimension::Pixels),
        Value::String(s) => match s.trim() {
            "" => None,
            trimmed => match trimmed.parse::<f64>() {
                Ok(px) => Some(Dimension::Pixels(px)),
                Err(_) => Some(Dimension::Css(trimmed.to_owned())),
            },
        },
        _ => None,
    })
}
