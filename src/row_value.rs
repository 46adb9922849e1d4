//! `RowValue` — one cell (spec §3, §4.5).
//!
//! Grounded on `baserowapi.models.row_values.row_value.RowValue`
//! (`original_source/baserowapi/models/row_values/row_value.py`): holds the
//! raw server-wire value alongside its `Field`, exposes a typed `value` view
//! and a validated setter, and knows its own `format_for_api()`.

use std::rc::Rc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::field::Field;

/// One cell: a raw wire value plus a non-owning reference to the `Field`
/// that describes how to validate and format it (spec §3: "RowValue holds a
/// non-owning reference to its Field").
#[derive(Debug, Clone)]
pub struct RowValue {
    field: Rc<Field>,
    raw: Value,
}

impl RowValue {
    /// Construct from a server-supplied or freshly-validated raw value.
    /// Doesn't itself validate: callers constructing from a server echo
    /// trust the server; callers constructing from user input should go
    /// through [`RowValue::set`] instead.
    pub fn new(field: Rc<Field>, raw: Value) -> Self {
        Self { field, raw }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// The typed `value` view (spec §4.5): the server's raw wire shape,
    /// unconverted. Field-specific typed accessors live in `src/row_values`.
    pub fn value(&self) -> &Value {
        &self.raw
    }

    pub fn is_read_only(&self) -> bool {
        self.field.is_read_only()
    }

    /// Validated setter (spec §4.5): read-only cells always fail; other
    /// values are validated via the Field before replacing the raw value.
    pub fn set(&mut self, value: Value) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::ReadOnlyValue(self.field.name.clone()));
        }
        self.field.validate(&value)?;
        self.raw = value;
        Ok(())
    }

    /// The JSON shape the server expects on write (spec §3, §4.5).
    pub fn format_for_api(&self) -> Result<Value> {
        self.field.format_for_api(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use serde_json::json;

    fn text_field() -> Rc<Field> {
        Rc::new(Field::new("Name", 1, 1, None, false, false, FieldType::Text))
    }

    fn read_only_field() -> Rc<Field> {
        Rc::new(Field::new("Created", 2, 1, None, false, true, FieldType::Text))
    }

    #[test]
    fn set_validates_through_the_field() {
        let mut rv = RowValue::new(text_field(), json!(null));
        assert!(rv.set(json!(42)).is_err());
        assert!(rv.set(json!("Ada")).is_ok());
        assert_eq!(rv.value(), &json!("Ada"));
    }

    #[test]
    fn read_only_cell_always_rejects_set() {
        let mut rv = RowValue::new(read_only_field(), json!("x"));
        let before = rv.value().clone();
        assert!(matches!(rv.set(json!("y")), Err(Error::ReadOnlyValue(_))));
        assert_eq!(rv.value(), &before);
    }

    #[test]
    fn format_for_api_round_trips_a_valid_value() {
        let mut rv = RowValue::new(text_field(), json!(null));
        rv.set(json!("Ada")).unwrap();
        let formatted = rv.format_for_api().unwrap();
        assert!(rv.field().validate(&formatted).is_ok());
    }
}
