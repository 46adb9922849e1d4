//! Wire shapes crossing the `file` field boundary (spec §6 "File upload",
//! SPEC_FULL.md §B). The library models these shapes but performs no upload
//! or download I/O itself — that stays an external collaborator (spec §1).
//!
//! Grounded on `baserowapi.models.fields.file_field.FileField`
//! (`original_source/baserowapi/models/fields/file_field.py`), which requires
//! each item in the list to at least carry a non-empty `name`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Response shape of `POST /api/user-files/upload-file/` and
/// `.../upload-via-url/`: the descriptor a caller attaches to a `file` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFile {
    pub name: String,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub is_image: Option<bool>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub uploaded_at: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<Value>,
}

impl UserFile {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).expect("UserFile always serializes")
    }
}

/// Validate a `file` cell's list-of-descriptors shape: every item must be a
/// JSON object carrying a non-empty `name`.
pub fn validate_file_list(value: &Value, field: &str) -> Result<()> {
    let items = value.as_array().ok_or_else(|| Error::FieldValidation {
        field: field.to_string(),
        message: format!("expected a list of file descriptors, found {value}"),
    })?;
    for item in items {
        let name = item.get("name").and_then(Value::as_str);
        if !matches!(name, Some(n) if !n.is_empty()) {
            return Err(Error::FieldValidation {
                field: field.to_string(),
                message: format!("file descriptor {item} is missing a non-empty 'name'"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_descriptor_without_name() {
        let v = json!([{"size": 10}]);
        assert!(validate_file_list(&v, "Attachments").is_err());
    }

    #[test]
    fn accepts_descriptor_with_name() {
        let v = json!([{"name": "report.pdf"}]);
        assert!(validate_file_list(&v, "Attachments").is_ok());
    }
}
