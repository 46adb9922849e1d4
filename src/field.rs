//! Field registry — per-column schema descriptors (spec §3, §4.3).
//!
//! Grounded on `baserowapi.models.field.Field` and the `FIELD_TYPE_CLASS_MAP`
//! dispatch table in `baserowapi.models.table.Table`
//! (`original_source/baserowapi/models/field.py`,
//! `original_source/baserowapi/models/table.py`): per-type dispatch is a
//! tagged enum with a descriptor table rather than a class hierarchy per
//! spec.md §9 ("tagged variants with a descriptor table...rather than a deep
//! class hierarchy"), folding each `models/fields/*.py` subclass's
//! `validate`/`format_for_api`/`compatible_filters`/`is_read_only` into one
//! `match` per method.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::fields::date::{self, DateAttrs};
use crate::fields::file;
use crate::fields::select::{self, SelectOption};

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9 Nx,._+*()#=;/-]{1,100}$").unwrap())
}

/// The closed set of field type tags (spec §4.3), each carrying its
/// type-specific attributes (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Text,
    LongText,
    Url,
    Email,
    PhoneNumber,
    Boolean,
    Number { decimal_places: u32, allow_negative: bool },
    Rating { max_value: i64, color: String, style: String },
    Date(DateAttrs),
    LastModified(DateAttrs),
    CreatedOn(DateAttrs),
    File,
    SingleSelect { options: Vec<SelectOption> },
    MultipleSelect { options: Vec<SelectOption> },
    MultipleCollaborators { notify_user_when_added: bool },
    LinkRow { link_row_table_id: Option<i64>, link_row_related_field_id: Option<i64> },
    Formula { formula: Option<String>, formula_type: Option<String>, error: Option<String>, array_formula_type: Option<String> },
    Count { through_field_id: Option<i64> },
    Lookup { through_field_id: Option<i64>, through_field_name: Option<String>, target_field_id: Option<i64>, target_field_name: Option<String> },
    Password,
    AutoNumber,
    Uuid,
    /// Degraded, unvalidated passthrough for any type tag this registry
    /// doesn't recognize (spec §3: "must match a known descriptor or degrade
    /// to Generic").
    Generic { type_tag: String },
}

impl FieldType {
    /// The wire `type` tag the server uses (and that `Table` dispatches on
    /// when building Fields from the schema response).
    pub fn type_tag(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::LongText => "long_text",
            FieldType::Url => "url",
            FieldType::Email => "email",
            FieldType::PhoneNumber => "phone_number",
            FieldType::Boolean => "boolean",
            FieldType::Number { .. } => "number",
            FieldType::Rating { .. } => "rating",
            FieldType::Date(_) => "date",
            FieldType::LastModified(_) => "last_modified",
            FieldType::CreatedOn(_) => "created_on",
            FieldType::File => "file",
            FieldType::SingleSelect { .. } => "single_select",
            FieldType::MultipleSelect { .. } => "multiple_select",
            FieldType::MultipleCollaborators { .. } => "multiple_collaborators",
            FieldType::LinkRow { .. } => "link_row",
            FieldType::Formula { .. } => "formula",
            FieldType::Count { .. } => "count",
            FieldType::Lookup { .. } => "lookup",
            FieldType::Password => "password",
            FieldType::AutoNumber => "autonumber",
            FieldType::Uuid => "uuid",
            FieldType::Generic { type_tag } => type_tag,
        }
    }

    /// Types the server alone assigns, regardless of the schema's `read_only`
    /// flag (spec §3).
    fn intrinsically_read_only(&self) -> bool {
        matches!(
            self,
            FieldType::LastModified(_)
                | FieldType::CreatedOn(_)
                | FieldType::Formula { .. }
                | FieldType::Count { .. }
                | FieldType::Lookup { .. }
                | FieldType::AutoNumber
                | FieldType::Uuid
        )
    }
}

/// Schema descriptor for one column (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub id: i64,
    pub table_id: i64,
    pub order: Option<i64>,
    pub is_primary: bool,
    server_read_only: bool,
    pub field_type: FieldType,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        id: i64,
        table_id: i64,
        order: Option<i64>,
        is_primary: bool,
        server_read_only: bool,
        field_type: FieldType,
    ) -> Self {
        Self {
            name: name.into(),
            id,
            table_id,
            order,
            is_primary,
            server_read_only,
            field_type,
        }
    }

    /// A field is read-only if the server says so, or if its type is one the
    /// server alone ever assigns (spec §3).
    pub fn is_read_only(&self) -> bool {
        self.server_read_only || self.field_type.intrinsically_read_only()
    }

    pub fn type_tag(&self) -> &str {
        self.field_type.type_tag()
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::FieldValidation {
            field: self.name.clone(),
            message: message.into(),
        }
    }

    /// Validate a user-supplied value against this field's rules (spec §4.3).
    /// The default for untyped/degraded variants is pass-through.
    pub fn validate(&self, value: &Value) -> Result<()> {
        match &self.field_type {
            FieldType::Text | FieldType::LongText | FieldType::Url | FieldType::Email => {
                match value {
                    Value::String(_) | Value::Null => Ok(()),
                    other => Err(self.err(format!("expected a string or null, found {other}"))),
                }
            }
            FieldType::PhoneNumber => match value {
                Value::Null => Ok(()),
                Value::String(s) if s.is_empty() => Ok(()),
                Value::String(s) if phone_regex().is_match(s) => Ok(()),
                other => Err(self.err(format!("'{other}' is not a valid phone number"))),
            },
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(()),
                other => Err(self.err(format!("expected a boolean, found {other}"))),
            },
            FieldType::Number { decimal_places, allow_negative } => {
                let n = self.parse_number(value)?;
                if !allow_negative && n < 0.0 {
                    return Err(self.err(format!("{n} is negative but this field disallows negatives")));
                }
                let scaled = n * 10f64.powi(*decimal_places as i32);
                if (scaled.round() - scaled).abs() > 1e-6 {
                    return Err(self.err(format!(
                        "{n} has more than {decimal_places} decimal place(s)"
                    )));
                }
                Ok(())
            }
            FieldType::Rating { max_value, .. } => {
                let n = value.as_i64().ok_or_else(|| self.err(format!("expected an integer, found {value}")))?;
                if !(0..=*max_value).contains(&n) {
                    return Err(self.err(format!("{n} is outside [0, {max_value}]")));
                }
                Ok(())
            }
            FieldType::Date(attrs) | FieldType::LastModified(attrs) | FieldType::CreatedOn(attrs) => {
                let s = value.as_str().ok_or_else(|| self.err(format!("expected a date string, found {value}")))?;
                date::normalize_date_input(s, attrs, &self.name).map(|_| ())
            }
            FieldType::File => file::validate_file_list(value, &self.name),
            FieldType::SingleSelect { options } => match value {
                Value::Null => Ok(()),
                other => select::resolve_option(options, other, &self.name).map(|_| ()),
            },
            FieldType::MultipleSelect { options } => {
                let items = value.as_array().ok_or_else(|| self.err(format!("expected a list, found {value}")))?;
                for item in items {
                    select::resolve_option(options, item, &self.name)?;
                }
                Ok(())
            }
            FieldType::MultipleCollaborators { .. } => {
                let items = value.as_array().ok_or_else(|| self.err(format!("expected a list, found {value}")))?;
                for item in items {
                    if item.get("id").is_none() {
                        return Err(self.err(format!("{item} is missing an 'id'")));
                    }
                }
                Ok(())
            }
            FieldType::LinkRow { .. } => {
                self.normalize_link_row(value)?;
                Ok(())
            }
            FieldType::Password => match value {
                Value::Null | Value::String(_) => Ok(()),
                other => Err(self.err(format!("expected a string or null, found {other}"))),
            },
            FieldType::Formula { .. }
            | FieldType::Count { .. }
            | FieldType::Lookup { .. }
            | FieldType::AutoNumber
            | FieldType::Uuid => Err(Error::ReadOnlyValue(self.name.clone())),
            FieldType::Generic { .. } => Ok(()),
        }
    }

    fn parse_number(&self, value: &Value) -> Result<f64> {
        match value {
            Value::Number(n) => n.as_f64().ok_or_else(|| self.err(format!("{n} is not representable as a number"))),
            Value::String(s) => s.parse::<f64>().map_err(|_| self.err(format!("'{s}' is not a numeric string"))),
            other => Err(self.err(format!("expected a number, found {other}"))),
        }
    }

    /// Normalize a `link_row` value: int, string, comma-separated string, or
    /// list thereof, into a list of id-or-value entries (spec §4.3).
    fn normalize_link_row(&self, value: &Value) -> Result<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items.clone()),
            Value::String(s) => Ok(s.split(',').map(|p| Value::String(p.trim().to_string())).collect()),
            Value::Number(_) => Ok(vec![value.clone()]),
            other => Err(self.err(format!("expected an id, string, or list for a link-row field, found {other}"))),
        }
    }

    /// Convert a validated value to the shape the server expects on write
    /// (spec §4.3). Default is validate-then-passthrough; `single_select`,
    /// `multiple_select`, and `link_row` normalize to ids.
    pub fn format_for_api(&self, value: &Value) -> Result<Value> {
        self.validate(value)?;
        match &self.field_type {
            FieldType::SingleSelect { options } => match value {
                Value::Null => Ok(Value::Null),
                other => Ok(Value::from(select::resolve_option(options, other, &self.name)?.id)),
            },
            FieldType::MultipleSelect { options } => {
                let items = value.as_array().expect("validated above");
                let ids: Result<Vec<Value>> = items
                    .iter()
                    .map(|item| select::resolve_option(options, item, &self.name).map(|o| Value::from(o.id)))
                    .collect();
                Ok(Value::Array(ids?))
            }
            FieldType::LinkRow { .. } => Ok(Value::Array(self.normalize_link_row(value)?)),
            FieldType::Date(attrs) | FieldType::LastModified(attrs) | FieldType::CreatedOn(attrs) => {
                let s = value.as_str().expect("validated above");
                Ok(Value::String(date::normalize_date_input(s, attrs, &self.name)?))
            }
            _ => Ok(value.clone()),
        }
    }

    /// Render a value for human display (spec §4.4: "Formatting for display
    /// applies US/EU/ISO date pattern..."). Non-date types display their
    /// plain JSON form; date-family types apply `date_format`/`date_time_format`.
    pub fn display(&self, value: &Value) -> Result<String> {
        match &self.field_type {
            FieldType::Date(attrs) | FieldType::LastModified(attrs) | FieldType::CreatedOn(attrs) => {
                let s = value.as_str().ok_or_else(|| self.err(format!("expected a date string, found {value}")))?;
                date::validate_normalized(s, attrs, &self.name)?;
                date::format_display(s, attrs, &self.name)
            }
            _ => Ok(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }

    /// Operators this field's type accepts in a `Filter` (spec §4.3). The
    /// `formula`/`lookup` whitelist is advisory (SPEC_FULL.md §C): an empty
    /// list here doesn't reject unknown operators at the `FilterValidator`
    /// layer, it just means "ask the server".
    pub fn compatible_operators(&self) -> &'static [&'static str] {
        match &self.field_type {
            FieldType::Text | FieldType::LongText | FieldType::Url | FieldType::Email => &[
                "equal", "not_equal", "contains", "contains_not", "contains_word",
                "doesnt_contain_word", "length_is_lower_than", "empty", "not_empty",
            ],
            FieldType::PhoneNumber => &[
                "equal", "not_equal", "contains", "contains_not", "length_is_lower_than",
                "empty", "not_empty",
            ],
            FieldType::Boolean => &["boolean", "empty", "not_empty"],
            FieldType::Number { .. } => &[
                "equal", "not_equal", "contains", "contains_not", "higher_than",
                "higher_than_or_equal", "lower_than", "lower_than_or_equal",
                "is_even_and_whole", "empty", "not_empty",
            ],
            FieldType::Rating { .. } => &["equal", "not_equal", "higher_than", "lower_than"],
            FieldType::Date(_) | FieldType::LastModified(_) | FieldType::CreatedOn(_) => &[
                "date_equal", "date_not_equal", "date_equals_today", "date_before_today",
                "date_after_today", "date_within_days", "date_within_weeks",
                "date_within_months", "date_equals_days_ago", "date_equals_months_ago",
                "date_equals_years_ago", "date_equals_week", "date_equals_month",
                "date_equals_year", "date_equals_day_of_month", "date_before",
                "date_before_or_equal", "date_after", "date_after_or_equal",
                "date_after_days_ago", "contains", "contains_not", "empty", "not_empty",
            ],
            FieldType::File => &["filename_contains", "has_file_type", "empty", "not_empty"],
            FieldType::SingleSelect { .. } => &[
                "contains", "contains_not", "contains_word", "doesnt_contain_word",
                "single_select_equal", "single_select_not_equal", "empty", "not_empty",
            ],
            FieldType::MultipleSelect { .. } => &[
                "contains", "contains_not", "contains_word", "doesnt_contain_word",
                "multiple_select_has", "multiple_select_has_not", "empty", "not_empty",
            ],
            FieldType::MultipleCollaborators { .. } => &[
                "multiple_collaborators_has", "multiple_collaborators_has_not", "empty", "not_empty",
            ],
            FieldType::LinkRow { .. } => &[
                "link_row_has", "link_row_has_not", "link_row_contains",
                "link_row_not_contains", "empty", "not_empty",
            ],
            FieldType::Count { .. } => &[
                "equal", "not_equal", "contains", "contains_not", "higher_than",
                "lower_than", "is_even_and_whole", "empty", "not_empty",
            ],
            FieldType::Lookup { .. } => &[
                "has_empty_value", "has_not_empty_value", "has_value_equal",
                "has_not_value_equal", "has_value_contains", "has_not_value_contains",
                "has_value_contains_word", "has_not_value_contains_word",
                "has_value_length_is_lower_than",
            ],
            FieldType::Formula { .. } => &[],
            FieldType::Password | FieldType::AutoNumber | FieldType::Uuid | FieldType::Generic { .. } => &[],
        }
    }

    /// `formula` and `lookup` carry an advisory, not enforced, whitelist
    /// (SPEC_FULL.md §C).
    pub fn has_advisory_whitelist(&self) -> bool {
        matches!(self.field_type, FieldType::Formula { .. } | FieldType::Lookup { .. })
    }

    /// Build a `Field` from one record of `GET /api/database/fields/table/{id}/`
    /// (spec §4.6). An unrecognized `type` degrades to `Generic` rather than
    /// failing the whole schema fetch (spec §3).
    pub fn from_schema_json(record: &Value, table_id: i64) -> Result<Field> {
        let name = record
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::SchemaFetch {
                table_id: table_id as u64,
                message: format!("field record is missing a 'name': {record}"),
            })?
            .to_string();
        let id = record.get("id").and_then(Value::as_i64).unwrap_or_default();
        let order = record.get("order").and_then(Value::as_i64);
        let is_primary = record.get("primary").and_then(Value::as_bool).unwrap_or(false);
        let read_only = record.get("read_only").and_then(Value::as_bool).unwrap_or(false);
        let type_tag = record.get("type").and_then(Value::as_str).unwrap_or("");

        let field_type = match type_tag {
            "text" => FieldType::Text,
            "long_text" => FieldType::LongText,
            "url" => FieldType::Url,
            "email" => FieldType::Email,
            "phone_number" => FieldType::PhoneNumber,
            "boolean" => FieldType::Boolean,
            "number" => FieldType::Number {
                decimal_places: record.get("number_decimal_places").and_then(Value::as_u64).unwrap_or(0) as u32,
                allow_negative: record.get("number_negative").and_then(Value::as_bool).unwrap_or(true),
            },
            "rating" => FieldType::Rating {
                max_value: record.get("max_value").and_then(Value::as_i64).unwrap_or(5),
                color: record.get("color").and_then(Value::as_str).unwrap_or("dark-orange").to_string(),
                style: record.get("style").and_then(Value::as_str).unwrap_or("star").to_string(),
            },
            "date" => FieldType::Date(parse_date_attrs(record)),
            "last_modified" => FieldType::LastModified(parse_date_attrs(record)),
            "created_on" => FieldType::CreatedOn(parse_date_attrs(record)),
            "file" => FieldType::File,
            "single_select" => FieldType::SingleSelect { options: parse_select_options(record) },
            "multiple_select" => FieldType::MultipleSelect { options: parse_select_options(record) },
            "multiple_collaborators" => FieldType::MultipleCollaborators {
                notify_user_when_added: record
                    .get("notify_user_when_added")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            "link_row" => FieldType::LinkRow {
                link_row_table_id: record.get("link_row_table_id").and_then(Value::as_i64),
                link_row_related_field_id: record.get("link_row_related_field_id").and_then(Value::as_i64),
            },
            "formula" => FieldType::Formula {
                formula: record.get("formula").and_then(Value::as_str).map(String::from),
                formula_type: record.get("formula_type").and_then(Value::as_str).map(String::from),
                error: record.get("error").and_then(Value::as_str).map(String::from),
                array_formula_type: record.get("array_formula_type").and_then(Value::as_str).map(String::from),
            },
            "count" => FieldType::Count {
                through_field_id: record.get("through_field_id").and_then(Value::as_i64),
            },
            "lookup" => FieldType::Lookup {
                through_field_id: record.get("through_field_id").and_then(Value::as_i64),
                through_field_name: record.get("through_field_name").and_then(Value::as_str).map(String::from),
                target_field_id: record.get("target_field_id").and_then(Value::as_i64),
                target_field_name: record.get("target_field_name").and_then(Value::as_str).map(String::from),
            },
            "password" => FieldType::Password,
            "autonumber" => FieldType::AutoNumber,
            "uuid" => FieldType::Uuid,
            other => {
                tracing::warn!(field = %name, type_tag = %other, "unrecognized field type, degrading to generic");
                FieldType::Generic { type_tag: other.to_string() }
            }
        };

        Ok(Field::new(name, id, table_id, order, is_primary, read_only, field_type))
    }
}

fn parse_date_attrs(record: &Value) -> DateAttrs {
    use crate::fields::date::{DateFormat, TimeFormat};
    let format = match record.get("date_format").and_then(Value::as_str) {
        Some("US") => DateFormat::Us,
        Some("ISO") => DateFormat::Iso,
        _ => DateFormat::Eu,
    };
    let time_format = match record.get("date_time_format").and_then(Value::as_str) {
        Some("12") => TimeFormat::Twelve,
        _ => TimeFormat::TwentyFour,
    };
    DateAttrs {
        format,
        include_time: record.get("date_include_time").and_then(Value::as_bool).unwrap_or(false),
        time_format,
        show_tzinfo: record.get("date_show_tzinfo").and_then(Value::as_bool).unwrap_or(false),
        force_timezone: record.get("date_force_timezone").and_then(Value::as_str).map(String::from),
    }
}

fn parse_select_options(record: &Value) -> Vec<SelectOption> {
    record
        .get("select_options")
        .and_then(Value::as_array)
        .map(|opts| {
            opts.iter()
                .filter_map(|o| {
                    Some(SelectOption {
                        id: o.get("id")?.as_i64()?,
                        value: o.get("value")?.as_str()?.to_string(),
                        color: o.get("color").and_then(Value::as_str).map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn number_field() -> Field {
        Field::new(
            "Number",
            1,
            1,
            None,
            false,
            false,
            FieldType::Number { decimal_places: 2, allow_negative: false },
        )
    }

    #[test]
    fn number_rejects_extra_decimals() {
        assert!(number_field().validate(&json!(1.005)).is_err());
    }

    #[test]
    fn number_rejects_negative_when_disallowed() {
        assert!(number_field().validate(&json!(-5)).is_err());
    }

    #[test]
    fn number_accepts_numeric_string() {
        assert!(number_field().validate(&json!("42.00")).is_ok());
    }

    #[test]
    fn single_select_format_for_api_yields_id() {
        let field = Field::new(
            "Color",
            2,
            1,
            None,
            false,
            false,
            FieldType::SingleSelect {
                options: vec![
                    SelectOption { id: 1, value: "red".into(), color: None },
                    SelectOption { id: 2, value: "blue".into(), color: None },
                ],
            },
        );
        assert!(field.validate(&json!("green")).is_err());
        assert!(field.validate(&json!("red")).is_ok());
        assert_eq!(field.format_for_api(&json!("red")).unwrap(), json!(1));
    }

    #[test]
    fn last_modified_is_always_read_only() {
        let field = Field::new(
            "Updated",
            3,
            1,
            None,
            false,
            false,
            FieldType::LastModified(DateAttrs::default()),
        );
        assert!(field.is_read_only());
    }

    #[test]
    fn date_display_applies_eu_pattern() {
        let field = Field::new(
            "Created",
            5,
            1,
            None,
            false,
            false,
            FieldType::Date(DateAttrs { include_time: false, ..Default::default() }),
        );
        assert_eq!(field.display(&json!("2024-08-15")).unwrap(), "15/08/2024");
    }

    #[test]
    fn formula_and_lookup_are_advisory() {
        let field = Field::new(
            "Total",
            4,
            1,
            None,
            false,
            true,
            FieldType::Formula { formula: None, formula_type: None, error: None, array_formula_type: None },
        );
        assert!(field.has_advisory_whitelist());
        assert!(field.compatible_operators().is_empty());
    }
}
