//! Select-option domain shared by `single_select` and `multiple_select`
//! (spec §3, §4.3).
//!
//! Grounded on `baserowapi.models.fields.single_select_field.SingleSelectField`
//! and `multiple_select_field.MultipleSelectField`
//! (`original_source/baserowapi/models/fields/`): both resolve a user-supplied
//! id or value string against a closed `select_options` list declared on the
//! field.

use serde_json::Value;

use crate::error::{Error, Result};

/// One entry of a select field's closed option domain.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub id: i64,
    pub value: String,
    pub color: Option<String>,
}

impl SelectOption {
    pub fn to_json(&self) -> Value {
        serde_json::json!({ "id": self.id, "value": self.value, "color": self.color })
    }
}

/// Resolve a user-supplied id (`Value::Number`) or value (`Value::String`)
/// against the field's declared options, failing with `FieldValidation` if
/// no option matches (spec scenario 4: `"green"` against `{red, blue}` fails).
pub fn resolve_option<'a>(
    options: &'a [SelectOption],
    value: &Value,
    field: &str,
) -> Result<&'a SelectOption> {
    let found = match value {
        Value::Number(n) => {
            let id = n.as_i64().ok_or_else(|| Error::FieldValidation {
                field: field.to_string(),
                message: format!("'{n}' is not a valid option id"),
            })?;
            options.iter().find(|o| o.id == id)
        }
        Value::String(s) => options.iter().find(|o| &o.value == s),
        other => {
            return Err(Error::FieldValidation {
                field: field.to_string(),
                message: format!("expected an option id or value, found {other}"),
            })
        }
    };
    found.ok_or_else(|| Error::FieldValidation {
        field: field.to_string(),
        message: format!("{value} does not match any declared option"),
    })
}
