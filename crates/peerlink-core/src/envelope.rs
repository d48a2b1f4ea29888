//! The wire envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The only valid wire shape: a kind name plus a kind-specific payload.
///
/// Serializes as `{ "id": "<kind>", "data": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Name of a registered packet kind.
    pub id: String,
    /// Kind-specific payload.
    pub data: Value,
}

impl Envelope {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Shape-only check: `id` is a string and `data` is present. Whether the
    /// id names a known kind is the registry's business.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("id")?.as_str()?;
        let data = value.get("data")?;
        Some(Self::new(id, data.clone()))
    }

    pub fn to_value(&self) -> Value {
        json!({ "id": self.id, "data": self.data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_value_accepts_wire_shape() {
        let value = json!({ "id": "packet_element", "data": { "internalId": "x1" } });
        let env = Envelope::from_value(&value).unwrap();
        assert_eq!(env.id, "packet_element");
        assert_eq!(env.data, json!({ "internalId": "x1" }));
        assert_eq!(env.to_value(), value);
    }

    #[test]
    fn from_value_rejects_missing_fields() {
        assert!(Envelope::from_value(&json!({ "id": "packet_element" })).is_none());
        assert!(Envelope::from_value(&json!({ "data": {} })).is_none());
        assert!(Envelope::from_value(&json!({ "id": 7, "data": {} })).is_none());
        assert!(Envelope::from_value(&json!("not an object")).is_none());
    }
}
