//! `Filter` — `(field_name, operator, value)` predicate (spec §3, §4.2).
//!
//! Grounded on `baserowapi.models.filter.Filter` (`original_source/baserowapi/models/filter.py`)
//! for the value object itself, generalized from a single `filter__field__op=value`
//! query parameter to the `filters=<json>` tree `Table::_construct_filter_tree`
//! builds (`original_source/baserowapi/models/table.py`), which is what the
//! hosted API actually expects for anything beyond a single equality filter.

use serde_json::{json, Value};

/// `AND`/`OR` combination of a filter group (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    And,
    Or,
}

impl FilterType {
    fn as_str(self) -> &'static str {
        match self {
            FilterType::And => "AND",
            FilterType::Or => "OR",
        }
    }
}

impl Default for FilterType {
    /// `filter_type` defaults to `AND` when filters are supplied (spec §4.2).
    fn default() -> Self {
        FilterType::And
    }
}

/// An immutable `(field_name, operator, value)` predicate.
///
/// `field_name` and `operator` must be non-empty; `operator` defaults to
/// `"equal"` (spec §4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field_name: String,
    operator: String,
    value: Value,
}

impl Filter {
    pub fn new(field_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_operator(field_name, "equal", value)
    }

    pub fn with_operator(
        field_name: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let field_name = field_name.into();
        let operator = operator.into();
        assert!(!field_name.is_empty(), "field_name must be non-empty");
        assert!(!operator.is_empty(), "operator must be non-empty");
        Self {
            field_name,
            operator,
            value: value.into(),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn to_json(&self) -> Value {
        json!({
            "field": self.field_name,
            "type": self.operator,
            "value": self.value,
        })
    }
}

/// Build the `{filter_type, filters, groups}` tree the server expects in a
/// single URL-JSON-encoded `filters=` query parameter (spec §4.2).
pub fn build_filter_tree(filters: &[Filter], filter_type: FilterType) -> Value {
    json!({
        "filter_type": filter_type.as_str(),
        "filters": filters.iter().map(Filter::to_json).collect::<Vec<_>>(),
        "groups": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_filter_defaults_to_equal_and_and() {
        let f = Filter::new("Name", "Grace");
        assert_eq!(f.operator(), "equal");
        let tree = build_filter_tree(&[f], FilterType::default());
        assert_eq!(
            tree,
            json!({
                "filter_type": "AND",
                "filters": [{"field": "Name", "type": "equal", "value": "Grace"}],
                "groups": [],
            })
        );
    }

    #[test]
    fn compound_or_filter_tree() {
        let filters = vec![
            Filter::new("Name", "Ada"),
            Filter::new("Last name", "Pascal"),
        ];
        let tree = build_filter_tree(&filters, FilterType::Or);
        assert_eq!(
            tree,
            json!({
                "filter_type": "OR",
                "filters": [
                    {"field": "Name", "type": "equal", "value": "Ada"},
                    {"field": "Last name", "type": "equal", "value": "Pascal"},
                ],
                "groups": [],
            })
        );
    }
}
