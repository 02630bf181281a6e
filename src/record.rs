//! # Records
//!
//! A record is a bag of typed values stored against one directory. Values only
//! enter a record through the typing engine, which turns untyped input into the
//! closed [`FieldValue`] variant; nothing downstream of it sees raw JSON.
//!
//! Stored value bags are self-describing so that records keep their meaning
//! after the owning directory's field list changes:
//!
//! ```text
//! {"title": {"kind": "text", "value": "Invoice A"},
//!  "amount": {"kind": "number", "value": "120.50"},
//!  "customer": {"kind": "reference", "value": 7}}
//! ```

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::DirectoryId;

/// Store-assigned identity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Wraps a raw record identifier.
    pub const fn new(id: i64) -> Self {
        RecordId(id)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// A normalized, strongly typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Trimmed, non-empty text.
    Text(String),
    /// An exact decimal.
    Number(Decimal),
    /// The id of a referenced record.
    Reference(RecordId),
}

impl FieldValue {
    /// Returns the value's textual projection, the form free-text search matches on.
    ///
    /// Numbers keep their scale (`120.50` stays `120.50`) and references are
    /// their decimal id.
    pub fn projection(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(d) => d.to_string(),
            FieldValue::Reference(id) => id.to_string(),
        }
    }

    /// Renders the value in its plain, untagged JSON form.
    ///
    /// Numbers are rendered as decimal strings so no precision is lost; feeding
    /// the plain form back through the typing engine yields the same value.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(d) => Value::String(d.to_string()),
            FieldValue::Reference(id) => Value::from(id.get()),
        }
    }
}

/// Typed values keyed by field name.
pub type Values = BTreeMap<String, FieldValue>;

/// Untyped input keyed by field name, as received from a caller.
pub type RawValues = Map<String, Value>;

/// Renders typed values in their plain JSON form.
pub fn to_raw(values: &Values) -> RawValues {
    values
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

/// A persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identity.
    pub id: RecordId,
    /// The directory the record was created against.
    pub directory_id: DirectoryId,
    /// Typed values keyed by field name.
    pub values: Values,
}

impl Record {
    /// Projects one field as text; a missing field projects to the empty string.
    pub fn project(&self, field: &str) -> String {
        self.values
            .get(field)
            .map(FieldValue::projection)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn invoice() -> Record {
        let mut values = Values::new();
        values.insert("title".to_string(), FieldValue::Text("Invoice A".to_string()));
        values.insert(
            "amount".to_string(),
            FieldValue::Number(Decimal::from_str("120.50").unwrap()),
        );
        values.insert("customer".to_string(), FieldValue::Reference(RecordId::new(7)));
        Record {
            id: RecordId::new(1),
            directory_id: DirectoryId::new(2),
            values,
        }
    }

    #[test]
    fn projection_keeps_scale() {
        let record = invoice();
        assert_eq!(record.project("title"), "Invoice A");
        assert_eq!(record.project("amount"), "120.50");
        assert_eq!(record.project("customer"), "7");
        assert_eq!(record.project("missing"), "");
    }

    #[test]
    fn stored_form_is_tagged() {
        let record = invoice();
        let stored = serde_json::to_value(&record.values).unwrap();
        assert_eq!(
            stored,
            json!({
                "amount": {"kind": "number", "value": "120.50"},
                "customer": {"kind": "reference", "value": 7},
                "title": {"kind": "text", "value": "Invoice A"}
            })
        );
        let back: Values = serde_json::from_value(stored).unwrap();
        assert_eq!(back, record.values);
    }

    #[test]
    fn plain_form_is_untagged() {
        let raw = to_raw(&invoice().values);
        assert_eq!(raw.get("title"), Some(&json!("Invoice A")));
        assert_eq!(raw.get("amount"), Some(&json!("120.50")));
        assert_eq!(raw.get("customer"), Some(&json!(7)));
    }
}
