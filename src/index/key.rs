//! Typed index keys
//!
//! Ordering is total and deterministic: Bool < Number < Date < String.
//! Within a type: false < true, numeric for NUMBER, chronological for DATE,
//! lexicographic for STRING (so zero-padded numeric strings sort correctly).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{IndexError, IndexResult};
use crate::schema::{date_millis, json_type_name, FieldType};

/// A single typed key component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "lowercase")]
pub enum IndexKey {
    Bool(bool),
    /// f64 stored as order-preserving bits
    Number(u64),
    /// Epoch milliseconds
    Date(i64),
    String(String),
}

impl IndexKey {
    /// Create a key from a float
    ///
    /// Uses bit representation for total ordering.
    pub fn from_f64(v: f64) -> Self {
        // -0.0 and 0.0 must be the same key
        let v = if v == 0.0 { 0.0 } else { v };
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Number(ordered)
    }

    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::String(v.into())
    }

    /// Returns the numeric value of a NUMBER key
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            IndexKey::Number(ordered) => {
                let bits = if (ordered >> 63) == 1 {
                    ordered ^ (1 << 63)
                } else {
                    !ordered
                };
                Some(f64::from_bits(bits))
            }
            _ => None,
        }
    }

    /// Builds a key from a JSON value.
    ///
    /// With a declared type the value must match it; otherwise the type is
    /// inferred from the JSON value. Null yields `Ok(None)` (not indexed).
    pub fn from_value(field: &str, value: &Value, declared: Option<FieldType>) -> IndexResult<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }
        let key = match declared {
            Some(FieldType::String) => value.as_str().map(IndexKey::from_string),
            Some(FieldType::Number) => value.as_f64().map(IndexKey::from_f64),
            Some(FieldType::Date) => date_millis(value).map(IndexKey::Date),
            Some(FieldType::Object) => {
                return Err(IndexError::key_extraction(field, "OBJECT fields are not indexable"))
            }
            None => match value {
                Value::Bool(b) => Some(IndexKey::Bool(*b)),
                Value::Number(n) => n.as_f64().map(IndexKey::from_f64),
                Value::String(s) => Some(IndexKey::from_string(s.as_str())),
                _ => None,
            },
        };
        key.map(Some).ok_or_else(|| {
            let expected = declared.map_or("a scalar", |t| t.type_name());
            IndexError::key_extraction(
                field,
                format!("expected {}, got {}", expected, json_type_name(value)),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: f64) -> IndexKey {
        IndexKey::from_f64(v)
    }

    #[test]
    fn test_number_ordering() {
        let keys = [num(-100.5), num(-1.0), num(0.0), num(0.5), num(2.0), num(1e9)];
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(num(-0.0), num(0.0));
    }

    #[test]
    fn test_number_roundtrip_value() {
        assert_eq!(num(-3.25).as_f64(), Some(-3.25));
        assert_eq!(num(42.0).as_f64(), Some(42.0));
    }

    #[test]
    fn test_zero_padded_strings() {
        assert!(IndexKey::from_string("07") < IndexKey::from_string("08"));
        assert!(IndexKey::from_string("09") < IndexKey::from_string("10"));
    }

    #[test]
    fn test_type_order() {
        assert!(IndexKey::Bool(true) < num(-5.0));
        assert!(num(5.0) < IndexKey::Date(0));
        assert!(IndexKey::Date(i64::MAX) < IndexKey::from_string(""));
    }

    #[test]
    fn test_declared_types() {
        let date = IndexKey::from_value("d", &json!("1970-01-01T00:00:02Z"), Some(FieldType::Date))
            .unwrap();
        assert_eq!(date, Some(IndexKey::Date(2000)));

        let n = IndexKey::from_value("n", &json!(3), Some(FieldType::Number)).unwrap();
        assert_eq!(n, Some(num(3.0)));

        assert!(IndexKey::from_value("n", &json!("3"), Some(FieldType::Number)).is_err());
        assert!(IndexKey::from_value("d", &json!("soon"), Some(FieldType::Date)).is_err());
        assert!(IndexKey::from_value("o", &json!({}), Some(FieldType::Object)).is_err());
    }

    #[test]
    fn test_inferred_types() {
        assert_eq!(
            IndexKey::from_value("a", &json!("Chuck"), None).unwrap(),
            Some(IndexKey::from_string("Chuck"))
        );
        assert_eq!(IndexKey::from_value("a", &json!(false), None).unwrap(), Some(IndexKey::Bool(false)));
        assert_eq!(IndexKey::from_value("a", &json!(null), None).unwrap(), None);
        assert!(IndexKey::from_value("a", &json!([1]), None).is_err());
    }
}
