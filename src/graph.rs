//! Typed view over BloodHound graph exports.
//!
//! Exports from different collector versions disagree on which fields exist,
//! so every field is optional and falls back to a documented default:
//!
//! - missing, null or wrongly typed `nodes`, `properties`, `sessions`, `user`
//!   are empty; a bad element of `nodes` or `sessions` is an empty record
//! - `properties.name` falls back to [`UNKNOWN_NAME`]
//! - flag properties are evaluated by JSON truthiness
//! - a key repeated inside a node keeps its last value
//!
//! Only text that is not JSON at all, or a document that is not an object, is
//! reported as a parse error by the caller.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Display name used for nodes without a `properties.name`.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Read the field as raw JSON first, then convert; any mismatch is `T::default()`.
/// Going through `Value` also collapses repeated keys to the last one.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Like [`lenient`] for sequences, but per element: a malformed element
/// becomes `T::default()` without discarding its neighbours.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|v| T::deserialize(v).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

/// One parsed export file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl std::str::FromStr for Document {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Node {
    #[serde(default, deserialize_with = "lenient")]
    pub properties: Properties,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub sessions: Vec<Session>,
}

impl Node {
    pub fn display_name(&self) -> String {
        self.properties.display_name()
    }
}

/// The subset of node properties the triage report looks at. Values are kept
/// raw so that exporter quirks (`null`, `0`/`1` instead of booleans) never
/// fail a whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub highvalue: Option<Value>,
    #[serde(default)]
    pub admincount: Option<Value>,
    #[serde(default)]
    pub hasspn: Option<Value>,
    #[serde(default)]
    pub unconstraineddelegation: Option<Value>,
    #[serde(default)]
    pub allowedtodelegate: Option<Value>,
}

impl Properties {
    pub fn display_name(&self) -> String {
        match &self.name {
            None | Some(Value::Null) => UNKNOWN_NAME.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn is_high_value(&self) -> bool {
        truthy(self.highvalue.as_ref())
    }

    /// `admincount` must equal 1; `true` counts since it compares equal to 1.
    pub fn is_admin_count(&self) -> bool {
        match &self.admincount {
            Some(Value::Number(n)) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }

    pub fn has_spn(&self) -> bool {
        truthy(self.hasspn.as_ref())
    }

    pub fn is_unconstrained_delegation(&self) -> bool {
        truthy(self.unconstraineddelegation.as_ref())
    }

    pub fn is_allowed_to_delegate(&self) -> bool {
        truthy(self.allowedtodelegate.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    #[serde(default, deserialize_with = "lenient")]
    pub user: SessionUser,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUser {
    #[serde(default)]
    pub name: Option<Value>,
}

impl Session {
    /// Logged-in username, or `""` when absent or not a string.
    pub fn username(&self) -> &str {
        match &self.user.name {
            Some(Value::String(s)) => s.as_str(),
            _ => "",
        }
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
