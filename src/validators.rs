//! Cross-cutting validation shared by `Field`, `Row`, and `Table` (spec §3,
//! §4.8).
//!
//! Grounded on `baserowapi.validators.filter_validator.FilterValidator` and
//! `baserowapi.validators.field_validator.FieldValidator`
//! (`original_source/baserowapi/validators/`).

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::table::Table;

/// Keys accepted on a mutation payload beyond the schema's field names
/// (spec §4.6, §4.8).
const METADATA_FIELDS: &[&str] = &["order"];

pub struct FilterValidator;

impl FilterValidator {
    /// `validate_filters_against_table` (spec §4.8): every filter's field
    /// must exist, and its operator must be in that field's compatible set —
    /// except for `formula`/`lookup`, whose whitelist is advisory
    /// (SPEC_FULL.md §C).
    pub fn validate(filters: &[Filter], table: &Table) -> Result<()> {
        for filter in filters {
            let field = table
                .field_by_name(filter.field_name())?
                .ok_or_else(|| Error::InvalidFieldName(filter.field_name().to_string()))?;
            if field.has_advisory_whitelist() {
                continue;
            }
            if !field.compatible_operators().contains(&filter.operator()) {
                return Err(Error::InvalidOperator {
                    field: filter.field_name().to_string(),
                    field_type: field.type_tag().to_string(),
                    operator: filter.operator().to_string(),
                });
            }
        }
        Ok(())
    }
}

pub struct FieldValidator;

impl FieldValidator {
    /// `validate_fields_against_table` (spec §4.8): every key is a known
    /// writable field or a reserved key (`order` always; `id` only when
    /// `is_update`); no value may target a read-only field.
    pub fn validate_against_table(dict: &BTreeMap<String, Value>, table: &Table, is_update: bool) -> Result<()> {
        if is_update && !dict.contains_key("id") {
            return Err(Error::InvalidParameter("update entry is missing 'id'".to_string()));
        }
        for (key, value) in dict {
            if METADATA_FIELDS.contains(&key.as_str()) {
                if key == "order" {
                    validate_order_value(value)?;
                }
                continue;
            }
            if is_update && key == "id" {
                continue;
            }
            let field = table.field_by_name(key)?.ok_or_else(|| Error::FieldNotFound(key.clone()))?;
            if field.is_read_only() {
                return Err(Error::ReadOnlyValue(key.clone()));
            }
        }
        Ok(())
    }
}

/// `order` (spec §4.6): "the reserved key `order`, which must be a positive
/// number" — reject non-numeric or non-positive values before any request.
fn validate_order_value(value: &Value) -> Result<()> {
    let as_number = value.as_f64().ok_or_else(|| Error::InvalidParameter(format!("'order' must be a positive number, found {value}")))?;
    if as_number <= 0.0 {
        return Err(Error::InvalidParameter(format!("'order' must be a positive number, found {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::executor::ResponseBody;
    use crate::test_support::FakeExecutor;
    use serde_json::json;
    use url::Url;

    fn table_with_schema() -> Table {
        let fake = FakeExecutor::new(vec![ResponseBody::Json(json!([
            {"id": 1, "table_id": 1, "name": "Name", "order": 1, "primary": true, "type": "text", "read_only": false},
            {"id": 2, "table_id": 1, "name": "Updated", "order": 2, "primary": false, "type": "last_modified", "read_only": true},
        ]))]);
        let client = Client::builder(Url::parse("https://example.com").unwrap(), "t")
            .executor(Box::new(fake))
            .build();
        client.get_table(1)
    }

    #[test]
    fn rejects_unknown_filter_field() {
        let table = table_with_schema();
        let filters = vec![Filter::new("Ghost", "x")];
        assert!(matches!(FilterValidator::validate(&filters, &table), Err(Error::InvalidFieldName(_))));
    }

    #[test]
    fn rejects_incompatible_operator() {
        let table = table_with_schema();
        let filters = vec![Filter::with_operator("Name", "higher_than", 1)];
        assert!(matches!(FilterValidator::validate(&filters, &table), Err(Error::InvalidOperator { .. })));
    }

    #[test]
    fn field_validator_rejects_read_only_target() {
        let table = table_with_schema();
        let mut dict = BTreeMap::new();
        dict.insert("Updated".to_string(), json!("x"));
        assert!(matches!(
            FieldValidator::validate_against_table(&dict, &table, false),
            Err(Error::ReadOnlyValue(_))
        ));
    }

    #[test]
    fn field_validator_requires_id_on_update() {
        let table = table_with_schema();
        let mut dict = BTreeMap::new();
        dict.insert("Name".to_string(), json!("x"));
        assert!(FieldValidator::validate_against_table(&dict, &table, true).is_err());
    }

    #[test]
    fn field_validator_accepts_positive_order() {
        let table = table_with_schema();
        let mut dict = BTreeMap::new();
        dict.insert("id".to_string(), json!(1));
        dict.insert("order".to_string(), json!(2.5));
        assert!(FieldValidator::validate_against_table(&dict, &table, true).is_ok());
    }

    #[test]
    fn field_validator_rejects_non_positive_order() {
        let table = table_with_schema();
        let mut dict = BTreeMap::new();
        dict.insert("id".to_string(), json!(1));
        dict.insert("order".to_string(), json!(-3));
        assert!(matches!(
            FieldValidator::validate_against_table(&dict, &table, true),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn field_validator_rejects_non_numeric_order() {
        let table = table_with_schema();
        let mut dict = BTreeMap::new();
        dict.insert("id".to_string(), json!(1));
        dict.insert("order".to_string(), json!("x"));
        assert!(matches!(
            FieldValidator::validate_against_table(&dict, &table, true),
            Err(Error::InvalidParameter(_))
        ));
    }
}
