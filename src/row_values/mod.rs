//! Per-type nuances of the row-value layer that don't fit the generic
//! `RowValue` wrapper in `src/row_value.rs`.
//!
//! Grounded on `baserowapi.models.row_values.*` (`original_source/baserowapi/models/row_values/`):
//! the original gives every field type its own `RowValue` subclass; this
//! crate instead keeps one `RowValue` struct and folds the handful of
//! genuinely type-specific behaviors (here: `password`'s read ambiguity) into
//! small free-standing helpers, per spec.md §9's tagged-variant-over-class-hierarchy
//! guidance already applied to `Field` in `src/field.rs`.

use serde_json::Value;

use crate::error::{Error, Result};

/// `password`'s read shape is ambiguous in the source API (spec §9,
/// SPEC_FULL.md §C): some responses surface the literal boolean `true`
/// meaning "a password is set", others a string. Writes only ever clear
/// (`None`) or set (`Some`) — never echo what was read.
#[derive(Debug, Clone, PartialEq)]
pub enum PasswordState {
    Unset,
    /// Set, but the server didn't disclose the value (`true` on the wire).
    SetOpaque,
    /// Set, with the server disclosing the literal value.
    SetValue(String),
}

impl PasswordState {
    pub fn from_raw(value: &Value, field: &str) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Unset),
            Value::Bool(true) => Ok(Self::SetOpaque),
            Value::Bool(false) => Ok(Self::Unset),
            Value::String(s) => Ok(Self::SetValue(s.clone())),
            other => Err(Error::FieldValidation {
                field: field.to_string(),
                message: format!("expected a password read-shape (null, bool, or string), found {other}"),
            }),
        }
    }

    /// Wire shape for a write: clearing emits `null`, setting emits the string.
    pub fn to_write(write: Option<&str>) -> Value {
        match write {
            None => Value::Null,
            Some(s) => Value::String(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn opaque_true_means_set_without_disclosure() {
        assert_eq!(PasswordState::from_raw(&json!(true), "Pw").unwrap(), PasswordState::SetOpaque);
    }

    #[test]
    fn disclosed_string_is_preserved() {
        assert_eq!(
            PasswordState::from_raw(&json!("hunter2"), "Pw").unwrap(),
            PasswordState::SetValue("hunter2".into())
        );
    }

    #[test]
    fn write_never_echoes_read_shape() {
        assert_eq!(PasswordState::to_write(None), json!(null));
        assert_eq!(PasswordState::to_write(Some("new")), json!("new"));
    }
}
