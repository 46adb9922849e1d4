//! `Row` — one record (spec §3, §4.5).
//!
//! Grounded on `baserowapi.models.row.Row`
//! (`original_source/baserowapi/models/row.py`): dict-style get/set by field
//! name backed by a `RowValueList`, plus `update`/`delete`/`move`, each
//! translated from the original's `requests`-session calls to the injected
//! `RequestExecutor` (spec §4.1).

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::executor::Method;
use crate::row_value::RowValue;
use crate::table::Table;

/// One record: server-assigned identity plus a field-name-keyed set of
/// typed cells (spec §3). Holds a non-owning handle to its `Table` (for
/// schema and mutation requests) rather than owning it.
#[derive(Debug, Clone)]
pub struct Row {
    pub id: Option<i64>,
    pub order: Option<String>,
    values: BTreeMap<String, RowValue>,
    table: Table,
}

impl PartialEq for Row {
    /// Two Rows compare equal iff `(table_id, id)` match (spec §3).
    fn eq(&self, other: &Self) -> bool {
        self.table.table_id() == other.table.table_id() && self.id == other.id
    }
}

impl Row {
    pub(crate) fn new(table: Table, id: Option<i64>, order: Option<String>, values: BTreeMap<String, RowValue>) -> Self {
        Self { id, order, values, table }
    }

    /// Parse one server record into a Row. Keys other than `id`/`order` are
    /// matched against the table's schema; unknown keys are dropped rather
    /// than failing, since `include`/`exclude` legitimately narrow the set
    /// (spec §3: "with include/exclude, the key set is a subset").
    pub(crate) fn from_json(table: &Table, record: &Value) -> Result<Row> {
        let id = record.get("id").and_then(Value::as_i64);
        let order = record.get("order").and_then(Value::as_str).map(String::from);
        let mut values = BTreeMap::new();
        if let Value::Object(map) = record {
            for (key, raw) in map {
                if key == "id" || key == "order" {
                    continue;
                }
                if let Some(field) = table.field_by_name(key)? {
                    values.insert(key.clone(), RowValue::new(field, raw.clone()));
                }
            }
        }
        Ok(Row::new(table.clone(), id, order, values))
    }

    pub fn table_id(&self) -> i64 {
        self.table.table_id()
    }

    /// `get` by field name (spec §4.5): unknown fields raise `FieldNotFound`.
    pub fn get(&self, field_name: &str) -> Result<&Value> {
        self.values
            .get(field_name)
            .map(RowValue::value)
            .ok_or_else(|| Error::FieldNotFound(field_name.to_string()))
    }

    /// `set` by field name (spec §4.5): delegates to the cell's typed
    /// setter, which always fails for read-only cells.
    pub fn set(&mut self, field_name: &str, value: Value) -> Result<()> {
        let cell = self
            .values
            .get_mut(field_name)
            .ok_or_else(|| Error::FieldNotFound(field_name.to_string()))?;
        cell.set(value)
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.values.contains_key(field_name)
    }

    /// Snapshot of every currently-held cell (read-only included), spec §3
    /// "content" / SPEC_FULL.md §B `Row::to_dict()`.
    pub fn to_dict(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.value().clone()))
            .collect()
    }

    /// `update(values?, memory_only=false)` (spec §4.5). Validates every key
    /// before any mutation or network call, so a rejected update leaves the
    /// row unchanged.
    #[tracing::instrument(skip(self, values), fields(table_id = self.table_id(), row_id = ?self.id))]
    pub fn update(&mut self, values: Option<BTreeMap<String, Value>>, memory_only: bool) -> Result<()> {
        let mut draft = self.values.clone();
        let touched_keys: Vec<String> = match &values {
            Some(map) => map.keys().cloned().collect(),
            None => self.values.iter().filter(|(_, v)| !v.is_read_only()).map(|(k, _)| k.clone()).collect(),
        };

        if let Some(map) = &values {
            for (key, value) in map {
                let cell = draft.get_mut(key).ok_or_else(|| Error::FieldNotFound(key.clone()))?;
                cell.set(value.clone())?;
            }
        }

        let payload: BTreeMap<String, Value> = touched_keys
            .iter()
            .map(|k| draft.get(k).map(|c| c.format_for_api().map(|v| (k.clone(), v))))
            .collect::<Option<Result<BTreeMap<_, _>>>>()
            .ok_or_else(|| Error::FieldNotFound("update payload".to_string()))??;

        if memory_only {
            self.values = draft;
            return Ok(());
        }

        let id = self.id.ok_or_else(|| Error::RowUpdate {
            table_id: self.table_id() as u64,
            row_id: None,
            message: "row has no id to update".to_string(),
        })?;
        let endpoint = self.table.row_endpoint(id);
        let response = self
            .table
            .client()
            .execute(Method::Patch, &endpoint, Some(Value::Object(payload.into_iter().collect())))
            .map_err(|e| Error::RowUpdate {
                table_id: self.table_id() as u64,
                row_id: Some(id),
                message: e.to_string(),
            })?;
        let updated = Row::from_json(&self.table, &response)?;
        self.id = updated.id;
        self.order = updated.order;
        self.values = updated.values;
        Ok(())
    }

    /// `delete` (spec §4.5): success is 204, anything else raises `RowDelete`.
    #[tracing::instrument(skip(self), fields(table_id = self.table_id(), row_id = ?self.id))]
    pub fn delete(&self) -> Result<()> {
        let id = self.id.ok_or_else(|| Error::RowDelete {
            table_id: self.table_id() as u64,
            row_id: 0,
            message: "row has no id to delete".to_string(),
        })?;
        let endpoint = self.table.row_endpoint(id);
        let response = self
            .table
            .client()
            .execute_no_body(Method::Delete, &endpoint)
            .map_err(|e| Error::RowDelete {
                table_id: self.table_id() as u64,
                row_id: id,
                message: e.to_string(),
            })?;
        match response {
            crate::executor::ResponseBody::Status(204) | crate::executor::ResponseBody::Empty => Ok(()),
            other => Err(Error::RowDelete {
                table_id: self.table_id() as u64,
                row_id: id,
                message: format!("expected 204, got {other:?}"),
            }),
        }
    }

    /// `move(before_id?)` (spec §4.5): returns the server's echo as a new Row.
    #[tracing::instrument(skip(self), fields(table_id = self.table_id(), row_id = ?self.id))]
    pub fn move_row(&self, before_id: Option<i64>) -> Result<Row> {
        let id = self.id.ok_or_else(|| Error::RowMove {
            table_id: self.table_id() as u64,
            row_id: 0,
            message: "row has no id to move".to_string(),
        })?;
        let endpoint = self.table.row_move_endpoint(id, before_id);
        let response = self
            .table
            .client()
            .execute(Method::Patch, &endpoint, None)
            .map_err(|e| Error::RowMove {
                table_id: self.table_id() as u64,
                row_id: id,
                message: e.to_string(),
            })?;
        Row::from_json(&self.table, &response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::executor::ResponseBody;
    use crate::table::Table;
    use crate::test_support::FakeExecutor;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use url::Url;

    fn table_with(responses: Vec<ResponseBody>) -> Table {
        let fake = FakeExecutor::new(responses);
        let client = Client::builder(Url::parse("https://example.com").unwrap(), "t")
            .executor(Box::new(fake))
            .build();
        client.get_table(1)
    }

    fn schema_response() -> ResponseBody {
        ResponseBody::Json(json!([
            {"id": 1, "table_id": 1, "name": "Name", "order": 1, "primary": true, "type": "text", "read_only": false},
            {"id": 2, "table_id": 1, "name": "Active", "order": 2, "primary": false, "type": "boolean", "read_only": false},
            {"id": 3, "table_id": 1, "name": "Updated", "order": 3, "primary": false, "type": "last_modified", "read_only": true},
        ]))
    }

    fn row_record() -> Value {
        json!({"id": 7, "order": "1.00", "Name": "Ringo", "Active": true, "Updated": "2024-01-01T00:00:00Z"})
    }

    fn row_with(responses: Vec<ResponseBody>) -> Row {
        let mut all = vec![schema_response()];
        all.extend(responses);
        let table = table_with(all);
        table.fields().unwrap();
        Row::from_json(&table, &row_record()).unwrap()
    }

    #[test]
    fn get_returns_the_current_value() {
        let row = row_with(vec![]);
        assert_eq!(row.get("Name").unwrap(), &json!("Ringo"));
    }

    #[test]
    fn get_unknown_field_fails() {
        let row = row_with(vec![]);
        assert!(matches!(row.get("Ghost"), Err(Error::FieldNotFound(_))));
    }

    #[test]
    fn set_validates_and_updates_the_cell() {
        let mut row = row_with(vec![]);
        row.set("Name", json!("George")).unwrap();
        assert_eq!(row.get("Name").unwrap(), &json!("George"));
        assert!(row.set("Name", json!(42)).is_err());
    }

    #[test]
    fn set_rejects_read_only_field() {
        let mut row = row_with(vec![]);
        assert!(matches!(row.set("Updated", json!("x")), Err(Error::ReadOnlyValue(_))));
    }

    #[test]
    fn contains_reflects_the_held_cells() {
        let row = row_with(vec![]);
        assert!(row.contains("Name"));
        assert!(!row.contains("Ghost"));
    }

    #[test]
    fn to_dict_snapshots_every_cell_including_read_only() {
        let row = row_with(vec![]);
        let dict = row.to_dict();
        assert_eq!(dict.get("Name"), Some(&json!("Ringo")));
        assert_eq!(dict.get("Active"), Some(&json!(true)));
        assert_eq!(dict.get("Updated"), Some(&json!("2024-01-01T00:00:00Z")));
    }

    #[test]
    fn update_with_values_sends_only_touched_keys_and_applies_server_echo() {
        let server_echo = ResponseBody::Json(json!({
            "id": 7, "order": "1.00", "Name": "George", "Active": true, "Updated": "2024-02-02T00:00:00Z",
        }));
        let mut row = row_with(vec![server_echo]);
        row.update(Some(BTreeMap::from([("Name".to_string(), json!("George"))])), false).unwrap();
        assert_eq!(row.get("Name").unwrap(), &json!("George"));
        assert_eq!(row.get("Updated").unwrap(), &json!("2024-02-02T00:00:00Z"));
    }

    #[test]
    fn update_rejects_unknown_key_and_leaves_row_unchanged() {
        let mut row = row_with(vec![]);
        let before = row.to_dict();
        let result = row.update(Some(BTreeMap::from([("Ghost".to_string(), json!("x"))])), false);
        assert!(matches!(result, Err(Error::FieldNotFound(_))));
        assert_eq!(row.to_dict(), before);
    }

    #[test]
    fn update_rejects_invalid_value_and_leaves_row_unchanged() {
        let mut row = row_with(vec![]);
        let before = row.to_dict();
        let result = row.update(Some(BTreeMap::from([("Name".to_string(), json!(42))])), false);
        assert!(result.is_err());
        assert_eq!(row.to_dict(), before);
    }

    #[test]
    fn update_memory_only_skips_the_network_call() {
        let mut row = row_with(vec![]);
        row.update(Some(BTreeMap::from([("Name".to_string(), json!("George"))])), true).unwrap();
        assert_eq!(row.get("Name").unwrap(), &json!("George"));
    }

    #[test]
    fn update_without_values_writes_back_every_non_read_only_cell() {
        let server_echo = ResponseBody::Json(json!({
            "id": 7, "order": "1.00", "Name": "Ringo", "Active": true, "Updated": "2024-01-01T00:00:00Z",
        }));
        let mut row = row_with(vec![server_echo]);
        row.update(None, false).unwrap();
        assert_eq!(row.get("Name").unwrap(), &json!("Ringo"));
    }

    #[test]
    fn delete_succeeds_on_204() {
        let row = row_with(vec![ResponseBody::Status(204)]);
        row.delete().unwrap();
    }

    #[test]
    fn delete_fails_on_unexpected_body() {
        let row = row_with(vec![ResponseBody::Json(json!({"detail": "nope"}))]);
        assert!(matches!(row.delete(), Err(Error::RowDelete { .. })));
    }

    #[test]
    fn delete_without_id_fails() {
        let table = table_with(vec![schema_response()]);
        table.fields().unwrap();
        let row = Row::new(table, None, None, BTreeMap::new());
        assert!(matches!(row.delete(), Err(Error::RowDelete { .. })));
    }

    #[test]
    fn move_row_returns_the_server_echo() {
        let server_echo = ResponseBody::Json(json!({
            "id": 7, "order": "0.50", "Name": "Ringo", "Active": true, "Updated": "2024-01-01T00:00:00Z",
        }));
        let row = row_with(vec![server_echo]);
        let moved = row.move_row(Some(3)).unwrap();
        assert_eq!(moved.order, Some("0.50".to_string()));
    }
}
