//! `Table` — schema fetch + cache, URL builder, paginated row iterator,
//! batched mutations (spec §3, §4.6).
//!
//! Grounded on `baserowapi.models.table.Table`
//! (`original_source/baserowapi/models/table.py`): `fields` is a lazily
//! loaded, request-once cache; `_build_request_url` composes the
//! include/exclude/search/order_by/filter/view/size query; `row_generator`
//! is the original's Python generator, reimplemented here as an
//! `Iterator<Item = Result<Row>>` with the same bounded empty-page guard.

use std::cell::OnceCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::executor::Method;
use crate::field::{Field, FieldType};
use crate::filter::{build_filter_tree, Filter, FilterType};
use crate::row::Row;
use crate::validators::{FieldValidator, FilterValidator};
use crate::Client;

const MAX_CONSECUTIVE_EMPTY_PAGES: u32 = 5;

/// Query parameters accepted by the rows URL builder (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct RowQuery {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub search: Option<String>,
    /// Each entry optionally prefixed with `+`/`-` for direction.
    pub order_by: Vec<String>,
    pub filter_type: FilterType,
    pub filters: Vec<Filter>,
    pub view_id: Option<i64>,
    pub size: Option<i64>,
}

/// Schema fetch + cache, URL builder, row iteration, and batched mutation
/// (spec §3). Cheap to `Clone`: the schema cache is shared via `Rc` across
/// clones, so every `Row` minted from a `Table` sees the same cache. Not
/// `Send`/`Sync` (spec §5: "Tables and Rows are not thread-safe").
#[derive(Clone)]
pub struct Table {
    client: Client,
    table_id: i64,
    fields: Rc<OnceCell<Vec<Rc<Field>>>>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("table_id", &self.table_id).finish()
    }
}

impl Table {
    pub(crate) fn new(client: Client, table_id: i64) -> Self {
        Self { client, table_id, fields: Rc::new(OnceCell::new()) }
    }

    pub fn table_id(&self) -> i64 {
        self.table_id
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    fn schema_endpoint(&self) -> String {
        format!("/api/database/fields/table/{}/", self.table_id)
    }

    fn rows_base(&self) -> String {
        format!("/api/database/rows/table/{}/", self.table_id)
    }

    pub(crate) fn row_endpoint(&self, row_id: i64) -> String {
        format!("{}{row_id}/?user_field_names=true", self.rows_base())
    }

    pub(crate) fn row_move_endpoint(&self, row_id: i64, before_id: Option<i64>) -> String {
        let mut endpoint = format!("{}{row_id}/move/?user_field_names=true", self.rows_base());
        if let Some(before) = before_id {
            endpoint.push_str(&format!("&before_id={before}"));
        }
        endpoint
    }

    /// `fields` (spec §4.6): fetch the schema once, on first access, and
    /// cache it for the Table's lifetime.
    pub fn fields(&self) -> Result<&Vec<Rc<Field>>> {
        if let Some(fields) = self.fields.get() {
            return Ok(fields);
        }
        let loaded = self.load_fields()?;
        Ok(self.fields.get_or_init(|| loaded))
    }

    #[tracing::instrument(skip(self), fields(table_id = self.table_id))]
    fn load_fields(&self) -> Result<Vec<Rc<Field>>> {
        let response = self
            .client
            .execute(Method::Get, &self.schema_endpoint(), None)
            .map_err(|e| Error::SchemaFetch { table_id: self.table_id as u64, message: e.to_string() })?;
        let records = response.as_array().ok_or_else(|| Error::SchemaFetch {
            table_id: self.table_id as u64,
            message: format!("expected a list of field records, got {response}"),
        })?;
        records
            .iter()
            .map(|r| Field::from_schema_json(r, self.table_id).map(Rc::new))
            .collect()
    }

    pub fn field_by_name(&self, name: &str) -> Result<Option<Rc<Field>>> {
        Ok(self.fields()?.iter().find(|f| f.name == name).cloned())
    }

    /// `field_names` (spec §4.6): sorted by `order`, nulls last.
    pub fn field_names(&self) -> Result<Vec<String>> {
        let mut fields: Vec<&Rc<Field>> = self.fields()?.iter().collect();
        fields.sort_by_key(|f| (f.order.is_none(), f.order));
        Ok(fields.into_iter().map(|f| f.name.clone()).collect())
    }

    /// `primary_field` (spec §4.6): fails if no field is marked primary.
    pub fn primary_field(&self) -> Result<Rc<Field>> {
        self.fields()?
            .iter()
            .find(|f| f.is_primary)
            .cloned()
            .ok_or(Error::NoPrimaryField(self.table_id as u64))
    }

    /// URL builder (spec §4.6): validates filter compatibility up front so
    /// invalid parameters fail before any request.
    pub fn build_rows_url(&self, query: &RowQuery) -> Result<String> {
        if let Some(size) = query.size {
            if size <= 0 {
                return Err(Error::InvalidParameter(format!("size must be positive, got {size}")));
            }
        }
        if let Some(view_id) = query.view_id {
            if view_id <= 0 {
                return Err(Error::InvalidParameter(format!("view_id must be positive, got {view_id}")));
            }
        }
        if !query.filters.is_empty() {
            FilterValidator::validate(&query.filters, self)?;
        }

        let mut url = Url::parse("placeholder:///").unwrap();
        url.set_path(&self.rows_base());
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("user_field_names", "true");
            if !query.include.is_empty() {
                pairs.append_pair("include", &query.include.join(","));
            }
            if !query.exclude.is_empty() {
                pairs.append_pair("exclude", &query.exclude.join(","));
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            if !query.order_by.is_empty() {
                pairs.append_pair("order_by", &query.order_by.join(","));
            }
            if let Some(view_id) = query.view_id {
                pairs.append_pair("view_id", &view_id.to_string());
            }
            if let Some(size) = query.size {
                pairs.append_pair("size", &size.to_string());
            }
            if !query.filters.is_empty() {
                let tree = build_filter_tree(&query.filters, query.filter_type);
                pairs.append_pair("filters", &tree.to_string());
            }
        }
        // Strip the placeholder scheme/host: we only want path + query, the
        // executor resolves relative endpoints against the client's base URL.
        Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
    }

    /// `get_rows` (spec §4.6): a lazy, restartable sequence of Rows, pages
    /// fetched on demand.
    pub fn get_rows(&self, query: &RowQuery) -> Result<RowIterator> {
        let url = self.build_rows_url(query)?;
        Ok(RowIterator {
            table: self.clone(),
            state: IterState::NotStarted(url),
            buffer: VecDeque::new(),
            empty_streak: 0,
        })
    }

    /// `get_rows(return_single=true)` (spec §4.6): at most one Row.
    pub fn get_single_row(&self, query: &RowQuery) -> Result<Option<Row>> {
        self.get_rows(query)?.next().transpose()
    }

    /// `get_row(id)` (spec §4.6).
    #[tracing::instrument(skip(self), fields(table_id = self.table_id))]
    pub fn get_row(&self, row_id: i64) -> Result<Row> {
        let response = self
            .client
            .execute(Method::Get, &self.row_endpoint(row_id), None)
            .map_err(|e| Error::RowFetch { table_id: self.table_id as u64, row_id, message: e.to_string() })?;
        Row::from_json(self, &response)
    }

    fn validate_writable_dict(&self, dict: &std::collections::BTreeMap<String, Value>, is_update: bool) -> Result<()> {
        FieldValidator::validate_against_table(dict, self, is_update)
    }

    fn format_payload(&self, dict: &std::collections::BTreeMap<String, Value>) -> Result<Value> {
        let mut out = serde_json::Map::new();
        for (key, value) in dict {
            if key == "id" || key == "order" {
                out.insert(key.clone(), value.clone());
                continue;
            }
            let field = self.field_by_name(key)?.expect("validated above");
            out.insert(key.clone(), field.format_for_api(value)?);
        }
        Ok(Value::Object(out))
    }

    /// `add_row` (spec §4.6), single-record path.
    #[tracing::instrument(skip(self, values), fields(table_id = self.table_id))]
    pub fn add_row(&self, values: std::collections::BTreeMap<String, Value>) -> Result<Row> {
        self.validate_writable_dict(&values, false)?;
        let payload = self.format_payload(&values)?;
        let endpoint = format!("{}?user_field_names=true", self.rows_base());
        let response = self
            .client
            .execute(Method::Post, &endpoint, Some(payload))
            .map_err(|e| Error::RowAdd { table_id: self.table_id as u64, message: e.to_string() })?;
        Row::from_json(self, &response)
    }

    /// `add_row` (spec §4.6), bulk path: chunked into `batch_size` POSTs,
    /// preserving input order across chunks (spec scenario 6).
    #[tracing::instrument(skip(self, rows), fields(table_id = self.table_id, count = rows.len()))]
    pub fn add_rows(&self, rows: Vec<std::collections::BTreeMap<String, Value>>) -> Result<Vec<Row>> {
        for row in &rows {
            self.validate_writable_dict(row, false)?;
        }
        let endpoint = format!("{}batch/?user_field_names=true", self.rows_base());
        let mut out = Vec::with_capacity(rows.len());
        for chunk in rows.chunks(self.client.batch_size().max(1)) {
            let items: Result<Vec<Value>> = chunk.iter().map(|r| self.format_payload(r)).collect();
            let body = serde_json::json!({ "items": items? });
            let response = self
                .client
                .execute(Method::Post, &endpoint, Some(body))
                .map_err(|e| Error::RowAdd { table_id: self.table_id as u64, message: e.to_string() })?;
            let items = response.get("items").and_then(Value::as_array).ok_or_else(|| Error::RowAdd {
                table_id: self.table_id as u64,
                message: format!("expected an 'items' array in batch response, got {response}"),
            })?;
            for item in items {
                out.push(Row::from_json(self, item)?);
            }
        }
        Ok(out)
    }

    /// `update_rows` (spec §4.6): dicts must contain `id`; Row inputs
    /// contribute only their writable cells.
    #[tracing::instrument(skip(self, rows), fields(table_id = self.table_id, count = rows.len()))]
    pub fn update_rows(&self, rows: Vec<std::collections::BTreeMap<String, Value>>) -> Result<Vec<Row>> {
        for row in &rows {
            if !row.contains_key("id") {
                return Err(Error::InvalidParameter("update_rows entry is missing 'id'".to_string()));
            }
            self.validate_writable_dict(row, true)?;
        }
        let endpoint = format!("{}batch/?user_field_names=true", self.rows_base());
        let mut out = Vec::with_capacity(rows.len());
        for chunk in rows.chunks(self.client.batch_size().max(1)) {
            let items: Result<Vec<Value>> = chunk.iter().map(|r| self.format_payload(r)).collect();
            let body = serde_json::json!({ "items": items? });
            let response = self
                .client
                .execute(Method::Patch, &endpoint, Some(body))
                .map_err(|e| Error::RowUpdate { table_id: self.table_id as u64, row_id: None, message: e.to_string() })?;
            let items = response.get("items").and_then(Value::as_array).ok_or_else(|| Error::RowUpdate {
                table_id: self.table_id as u64,
                row_id: None,
                message: format!("expected an 'items' array in batch response, got {response}"),
            })?;
            for item in items {
                out.push(Row::from_json(self, item)?);
            }
        }
        Ok(out)
    }

    /// `delete_rows` (spec §4.6): ids must be positive.
    #[tracing::instrument(skip(self, row_ids), fields(table_id = self.table_id, count = row_ids.len()))]
    pub fn delete_rows(&self, row_ids: Vec<i64>) -> Result<()> {
        for id in &row_ids {
            if *id <= 0 {
                return Err(Error::InvalidParameter(format!("row id must be positive, got {id}")));
            }
        }
        let endpoint = format!("{}batch-delete/", self.rows_base());
        for chunk in row_ids.chunks(self.client.batch_size().max(1)) {
            let body = serde_json::json!({ "items": chunk });
            self.client
                .execute(Method::Post, &endpoint, Some(body))
                .map_err(|e| Error::RowDelete {
                    table_id: self.table_id as u64,
                    row_id: chunk.first().copied().unwrap_or_default(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// `Table::get_options()` for table-link fields (SPEC_FULL.md §B): the
    /// related table's primary-field values, keyed by row id, so a caller
    /// can validate or present candidate link targets.
    pub fn link_row_options(&self, field_name: &str) -> Result<Vec<(i64, String)>> {
        let field = self
            .field_by_name(field_name)?
            .ok_or_else(|| Error::FieldNotFound(field_name.to_string()))?;
        let target_table_id = match &field.field_type {
            FieldType::LinkRow { link_row_table_id: Some(id), .. } => *id,
            _ => {
                return Err(Error::FieldValidation {
                    field: field_name.to_string(),
                    message: "not a link_row field with a known target table".to_string(),
                })
            }
        };
        let target = self.client.get_table(target_table_id);
        let primary = target.primary_field()?;
        let query = RowQuery { include: vec![primary.name.clone()], ..RowQuery::default() };
        let mut out = Vec::new();
        for row in target.get_rows(&query)? {
            let row = row?;
            if let Some(id) = row.id {
                let value = row.get(&primary.name)?.as_str().unwrap_or_default().to_string();
                out.push((id, value));
            }
        }
        Ok(out)
    }
}

enum IterState {
    NotStarted(String),
    Next(String),
    Done,
}

/// Lazy, restartable sequence of Rows across server pages (spec §4.6,
/// spec.md §9 "lazy sequence"). Stops deterministically on `next=null`, or
/// after [`MAX_CONSECUTIVE_EMPTY_PAGES`] consecutive empty pages as a guard
/// against a misbehaving server (spec §4.6, §9).
pub struct RowIterator {
    table: Table,
    state: IterState,
    buffer: VecDeque<Row>,
    empty_streak: u32,
}

impl Iterator for RowIterator {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Some(Ok(row));
            }
            let url = match std::mem::replace(&mut self.state, IterState::Done) {
                IterState::NotStarted(u) | IterState::Next(u) => u,
                IterState::Done => return None,
            };

            let page = match self.table.client().execute(Method::Get, &url, None) {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            let results = page.get("results").and_then(Value::as_array).cloned().unwrap_or_default();
            let next = page.get("next").and_then(Value::as_str).map(String::from);

            if results.is_empty() {
                self.empty_streak += 1;
                if self.empty_streak >= MAX_CONSECUTIVE_EMPTY_PAGES || next.is_none() {
                    if self.empty_streak >= MAX_CONSECUTIVE_EMPTY_PAGES {
                        tracing::warn!(table_id = self.table.table_id, "stopping row iteration after {} consecutive empty pages", self.empty_streak);
                    }
                    self.state = IterState::Done;
                    continue;
                }
                self.state = IterState::Next(next.unwrap());
                continue;
            }

            self.empty_streak = 0;
            for record in &results {
                match Row::from_json(&self.table, record) {
                    Ok(row) => self.buffer.push_back(row),
                    Err(e) => return Some(Err(e)),
                }
            }
            self.state = match next {
                Some(n) => IterState::Next(n),
                None => IterState::Done,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ResponseBody;
    use crate::test_support::FakeExecutor;
    use pretty_assertions::assert_eq;
    use serde_json::json;

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
        ]))
    }

    #[test]
    fn fields_are_fetched_once_and_cached() {
        let table = table_with(vec![schema_response()]);
        let first = table.fields().unwrap().len();
        let second = table.fields().unwrap().len();
        assert_eq!(first, 2);
        assert_eq!(second, 2);
    }

    #[test]
    fn primary_field_is_the_unique_primary() {
        let table = table_with(vec![schema_response()]);
        assert_eq!(table.primary_field().unwrap().name, "Name");
    }

    #[test]
    fn build_rows_url_includes_user_field_names_constant() {
        let table = table_with(vec![]);
        let url = table.build_rows_url(&RowQuery::default()).unwrap();
        assert!(url.contains("user_field_names=true"));
    }

    #[test]
    fn build_rows_url_rejects_non_positive_size() {
        let table = table_with(vec![]);
        let query = RowQuery { size: Some(0), ..Default::default() };
        assert!(table.build_rows_url(&query).is_err());
    }

    #[test]
    fn iteration_stops_on_next_null() {
        let table = table_with(vec![
            schema_response(),
            ResponseBody::Json(json!({
                "results": [{"id": 1, "Name": "Grace", "Active": true}],
                "next": null,
            })),
        ]);
        table.fields().unwrap();
        let rows: Vec<Row> = table.get_rows(&RowQuery::default()).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Name").unwrap(), &json!("Grace"));
    }

    #[test]
    fn iteration_follows_next_link_across_pages() {
        let table = table_with(vec![
            schema_response(),
            ResponseBody::Json(json!({
                "results": [{"id": 1, "Name": "Ada", "Active": true}],
                "next": "https://example.com/api/database/rows/table/1/?page=2",
            })),
            ResponseBody::Json(json!({
                "results": [{"id": 2, "Name": "Alan", "Active": false}],
                "next": null,
            })),
        ]);
        table.fields().unwrap();
        let rows: Vec<Row> = table.get_rows(&RowQuery::default()).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn iteration_stops_after_bounded_empty_pages() {
        let mut responses = vec![schema_response()];
        for i in 0..6 {
            responses.push(ResponseBody::Json(json!({
                "results": [],
                "next": format!("https://example.com/api/database/rows/table/1/?page={i}"),
            })));
        }
        let table = table_with(responses);
        table.fields().unwrap();
        let rows: Vec<Row> = table.get_rows(&RowQuery::default()).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 0);
    }
}
