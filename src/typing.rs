//! # Value Typing Engine
//!
//! Turns an untyped value bag into typed [`Values`] according to a directory's
//! field list. Fields are visited in declaration order and the first failure
//! aborts the whole operation; later fields are not inspected.
//!
//! | Type      | Accepts                                 | Rejects                                   |
//! |-----------|-----------------------------------------|-------------------------------------------|
//! | TEXT      | any non-null value, stringified, trimmed | null or blank: `FieldRequired`           |
//! | NUMBER    | JSON numbers, decimal literals           | null, blank, unparsable, inexact: `FieldMustBeNumber` |
//! | REFERENCE | JSON numbers (truncated), integer strings | null: `FieldRequired`; blank, other: `FieldMustBeReference` |
//!
//! Keys that the directory does not declare are dropped. Absent keys are null.
//!
//! ```rust
//! use serde_json::json;
//! use unidir::{FieldDefinition, FieldValue, DirectoryId, RecordId, type_and_normalize};
//!
//! let fields = vec![
//!     FieldDefinition::text("title"),
//!     FieldDefinition::reference("customer", DirectoryId::new(1)),
//! ];
//! let raw = json!({"title": "  Invoice A ", "customer": "42", "extra": true});
//! let values = type_and_normalize(&fields, raw.as_object().unwrap()).unwrap();
//! assert_eq!(values["title"], FieldValue::Text("Invoice A".to_string()));
//! assert_eq!(values["customer"], FieldValue::Reference(RecordId::new(42)));
//! assert!(!values.contains_key("extra"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

use crate::{FieldDefinition, FieldType, FieldValue, RawValues, RecordId, ValidationError, Values};

/// Type-checks and normalizes `raw` against `fields`.
///
/// Returns a value for every declared field or the first failure encountered.
/// A REFERENCE field without a target directory is reported as
/// [`ValidationError::FieldMisconfigured`] before its value is looked at.
pub fn type_and_normalize(
    fields: &[FieldDefinition],
    raw: &RawValues,
) -> Result<Values, ValidationError> {
    let mut values = Values::new();
    for field in fields {
        let input = raw.get(&field.name).filter(|v| !v.is_null());
        let typed = match field.field_type {
            FieldType::Text => text_value(&field.name, input)?,
            FieldType::Number => number_value(&field.name, input)?,
            FieldType::Reference => {
                if field.directory_id.is_none() {
                    return Err(ValidationError::FieldMisconfigured {
                        field: field.name.clone(),
                    });
                }
                reference_value(&field.name, input)?
            }
        };
        values.insert(field.name.clone(), typed);
    }
    Ok(values)
}

fn text_value(field: &str, input: Option<&Value>) -> Result<FieldValue, ValidationError> {
    let required = || ValidationError::FieldRequired {
        field: field.to_string(),
    };
    let text = match input.ok_or_else(required)? {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty() {
        return Err(required());
    }
    Ok(FieldValue::Text(text))
}

fn number_value(field: &str, input: Option<&Value>) -> Result<FieldValue, ValidationError> {
    let not_a_number = || ValidationError::FieldMustBeNumber {
        field: field.to_string(),
    };
    let decimal = match input.ok_or_else(not_a_number)? {
        Value::Number(n) => number_to_decimal(n),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };
    decimal.map(FieldValue::Number).ok_or_else(not_a_number)
}

fn reference_value(field: &str, input: Option<&Value>) -> Result<FieldValue, ValidationError> {
    let required = || ValidationError::FieldRequired {
        field: field.to_string(),
    };
    let not_a_reference = || ValidationError::FieldMustBeReference {
        field: field.to_string(),
    };
    let id = match input.ok_or_else(required)? {
        Value::Number(n) => truncate_to_id(n).ok_or_else(not_a_reference)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_a_reference())?,
        _ => return Err(not_a_reference()),
    };
    Ok(FieldValue::Reference(RecordId::new(id)))
}

static DECIMAL_LITERAL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<sign>[+-])?(?:(?P<int>[0-9]+)(?:\.(?P<frac>[0-9]*))?|\.(?P<bare>[0-9]+))(?:[eE](?P<exp>[+-]?[0-9]+))?$",
    )
    .ok()
});

/// Largest scale a [`Decimal`] can carry.
const MAX_SCALE: i64 = 28;

/// Parses a decimal literal, accepting plain (`-12.50`) and scientific (`1.2e3`) forms.
///
/// The result is exact: literals that need more than 28 fractional digits or
/// more than 96 bits of mantissa are rejected rather than rounded.
pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    let caps = DECIMAL_LITERAL.as_ref()?.captures(s)?;
    let group = |name: &str| caps.name(name).map_or("", |m| m.as_str());
    let frac = match caps.name("bare") {
        Some(m) => m.as_str(),
        None => group("frac"),
    };
    let exponent: i64 = match caps.name("exp") {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let mut digits = format!("{}{frac}", group("int"))
        .trim_start_matches('0')
        .to_string();
    if digits.is_empty() {
        return Some(Decimal::ZERO);
    }
    let mut scale = (frac.len() as i64).checked_sub(exponent)?;
    while scale > MAX_SCALE && digits.ends_with('0') {
        digits.pop();
        scale -= 1;
    }
    if scale > MAX_SCALE {
        return None;
    }
    if scale < 0 {
        // A 96-bit mantissa has at most 29 digits.
        if digits.len() as i64 - scale > 29 {
            return None;
        }
        digits.push_str(&"0".repeat(scale.unsigned_abs() as usize));
        scale = 0;
    }
    if digits.len() > 29 {
        return None;
    }
    let mut mantissa: i128 = digits.parse().ok()?;
    if group("sign") == "-" {
        mantissa = -mantissa;
    }
    Decimal::try_from_i128_with_scale(mantissa, scale as u32).ok()
}

fn number_to_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    // Go through the shortest round-trip text so 3.5 becomes exactly 3.5.
    parse_decimal(&n.to_string())
}

fn truncate_to_id(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    let truncated = f.trunc();
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}
