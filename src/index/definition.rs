//! Index definitions

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{IndexError, IndexResult};
use crate::schema::{path, Collection, FieldType, PathResolution};

/// Hint carried with an index definition. It does not change query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexConfiguration {
    OptimizeRead,
    #[default]
    OptimizeWrite,
}

/// Secondary index over a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub uid: Uuid,
    pub name: String,
    pub collection: String,
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering_key: Option<String>,
    #[serde(default)]
    pub configuration: IndexConfiguration,
}

/// Derives `<collection>__<cond1>__<cond2>...`
pub fn index_name(collection: &str, conditions: &[String]) -> String {
    let mut name = collection.to_string();
    for condition in conditions {
        name.push_str("__");
        name.push_str(condition);
    }
    name
}

impl Index {
    pub fn new(
        collection: impl Into<String>,
        conditions: Vec<String>,
        ordering_key: Option<String>,
        configuration: IndexConfiguration,
    ) -> Self {
        let collection = collection.into();
        Self {
            uid: Uuid::new_v4(),
            name: index_name(&collection, &conditions),
            collection,
            conditions,
            ordering_key,
            configuration,
        }
    }

    /// All field paths the index reads
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .chain(self.ordering_key.iter())
            .map(String::as_str)
    }

    /// Checks conditions and ordering key against the collection.
    ///
    /// A path is accepted when it resolves to a declared scalar field, falls
    /// under an open collection or object, or was observed on a stored
    /// document. Declared OBJECT fields have no key and are refused.
    pub fn validate(&self, collection: &Collection, observed: &BTreeSet<String>) -> IndexResult<()> {
        if self.conditions.is_empty() {
            return Err(IndexError::invalid_index("index conditions must not be empty"));
        }
        let mut seen = BTreeSet::new();
        for condition in &self.conditions {
            if !seen.insert(condition.as_str()) {
                return Err(IndexError::invalid_index(format!(
                    "condition '{}' is listed twice",
                    condition
                )));
            }
        }
        for field in self.fields() {
            if !path::is_valid_path(field) {
                return Err(IndexError::invalid_index(format!(
                    "'{}' is not a valid field path",
                    field
                )));
            }
            let resolves = match collection.resolve_path(field) {
                PathResolution::Declared(def) if def.field_type == FieldType::Object => {
                    return Err(IndexError::invalid_index(format!(
                        "field '{}' is OBJECT and cannot be indexed",
                        field
                    )));
                }
                PathResolution::Declared(_) | PathResolution::Open => true,
                PathResolution::Unresolved => observed.contains(field),
            };
            if !resolves {
                return Err(IndexError::invalid_index(format!(
                    "field '{}' does not resolve on collection '{}'",
                    field, collection.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use serde_json::json;

    fn conditions(c: &[&str]) -> Vec<String> {
        c.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_name_derivation() {
        assert_eq!(index_name("book", &conditions(&["author"])), "book__author");
        assert_eq!(
            index_name("book", &conditions(&["category.name", "rating"])),
            "book__category.name__rating"
        );
    }

    #[test]
    fn test_default_configuration() {
        let index: Index = serde_json::from_value(json!({
            "uid": Uuid::new_v4(),
            "name": "book__author",
            "collection": "book",
            "conditions": ["author"]
        }))
        .unwrap();
        assert_eq!(index.configuration, IndexConfiguration::OptimizeWrite);
        assert_eq!(json!(IndexConfiguration::OptimizeRead), json!("OPTIMIZE_READ"));
    }

    #[test]
    fn test_validate_open_collection() {
        let book = Collection::new("book", "isbn");
        let index = Index::new("book", conditions(&["category.name"]), None, Default::default());
        assert!(index.validate(&book, &BTreeSet::new()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_and_bad_paths() {
        let book = Collection::new("book", "isbn");
        let empty = Index::new("book", vec![], None, Default::default());
        assert!(empty.validate(&book, &BTreeSet::new()).is_err());

        let bad = Index::new("book", conditions(&["a..b"]), None, Default::default());
        assert!(bad.validate(&book, &BTreeSet::new()).is_err());

        let dup = Index::new("book", conditions(&["a", "a"]), None, Default::default());
        assert!(dup.validate(&book, &BTreeSet::new()).is_err());
    }

    #[test]
    fn test_validate_declared_and_observed() {
        let review = Collection::new("review", "id").with_fields(vec![FieldDef::number("rate")]);
        let on_rate = Index::new("review", conditions(&["rate"]), None, Default::default());
        assert!(on_rate.validate(&review, &BTreeSet::new()).is_ok());

        let on_author = Index::new("review", conditions(&["author"]), Some("rate".into()), Default::default());
        assert!(on_author.validate(&review, &BTreeSet::new()).is_err());

        let observed: BTreeSet<String> = ["author".to_string()].into_iter().collect();
        assert!(on_author.validate(&review, &observed).is_ok());
    }

    #[test]
    fn test_validate_rejects_declared_object() {
        let restaurant = Collection::new("restaurant", "id").with_fields(vec![
            FieldDef::string("id"),
            FieldDef::object("address", vec![FieldDef::string("city")]),
            FieldDef::open_object("extra"),
        ]);
        let none = BTreeSet::new();

        let on_address = Index::new("restaurant", conditions(&["address"]), None, Default::default());
        let err = on_address.validate(&restaurant, &none).unwrap_err();
        assert_eq!(err.code(), crate::index::IndexErrorCode::PlusInvalidIndex);

        let ordered_by_object = Index::new(
            "restaurant",
            conditions(&["address.city"]),
            Some("extra".into()),
            Default::default(),
        );
        assert!(ordered_by_object.validate(&restaurant, &none).is_err());

        let on_city = Index::new("restaurant", conditions(&["address.city"]), None, Default::default());
        assert!(on_city.validate(&restaurant, &none).is_ok());
    }
}
