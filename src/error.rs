//! Structured, kind-tagged failures surfaced at every layer of the client.
//!
//! Grounded on `gazette::Error` (`examples/estuary-flow/crates/gazette/src/lib.rs`):
//! a flat `thiserror` enum with one variant per failure kind, carrying enough
//! context (field name, row id, URL) for a caller to act without parsing a
//! message string.

/// HTTP status codes the server is documented to return, mapped to a [`Error`] kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    BadRequest,
    Unauthorized,
    NotFound,
    PayloadTooLarge,
    UnsupportedMediaType,
    ServerUnavailable,
}

impl StatusKind {
    pub fn from_status(status: u16) -> Option<Self> {
        Some(match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            404 => Self::NotFound,
            413 => Self::PayloadTooLarge,
            415 => Self::UnsupportedMediaType,
            500 | 502 | 503 => Self::ServerUnavailable,
            _ => return None,
        })
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not found",
            Self::PayloadTooLarge => "payload too large",
            Self::UnsupportedMediaType => "unsupported media type",
            Self::ServerUnavailable => "server unavailable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network I/O, timeout, or a non-2xx response the status table doesn't
    /// specially classify.
    #[error("transport error calling {url} (status {status:?}): {message}")]
    Transport {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// A status-table-classified non-2xx response (§4.1).
    #[error("{kind} calling {url}: {message}")]
    Status {
        kind: StatusKind,
        url: String,
        message: String,
    },

    #[error("failed to fetch schema for table {table_id}: {message}")]
    SchemaFetch { table_id: u64, message: String },

    #[error("failed to fetch row {row_id} from table {table_id}: {message}")]
    RowFetch {
        table_id: u64,
        row_id: i64,
        message: String,
    },

    #[error("failed to add row(s) to table {table_id}: {message}")]
    RowAdd { table_id: u64, message: String },

    #[error("failed to update row {row_id:?} in table {table_id}: {message}")]
    RowUpdate {
        table_id: u64,
        row_id: Option<i64>,
        message: String,
    },

    #[error("failed to delete row {row_id} from table {table_id}: {message}")]
    RowDelete {
        table_id: u64,
        row_id: i64,
        message: String,
    },

    #[error("failed to move row {row_id} in table {table_id}: {message}")]
    RowMove {
        table_id: u64,
        row_id: i64,
        message: String,
    },

    /// A value rejected by a field's validator: bad type, out-of-range
    /// number, non-matching select option, malformed date, read-only target.
    #[error("invalid value for field '{field}': {message}")]
    FieldValidation { field: String, message: String },

    #[error("invalid field name in filter: '{0}'")]
    InvalidFieldName(String),

    #[error("operator '{operator}' is not compatible with field '{field}' of type '{field_type}'")]
    InvalidOperator {
        field: String,
        field_type: String,
        operator: String,
    },

    /// Constructing a `RowValue` with a `Field` of the wrong type.
    #[error("row value for field '{field}' expected a {expected} field, found {found}")]
    InvalidRowValue {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// Attempt to set a read-only cell.
    #[error("field '{0}' is read-only and cannot be set")]
    ReadOnlyValue(String),

    #[error("field '{0}' not found")]
    FieldNotFound(String),

    #[error("table {0} has no primary field")]
    NoPrimaryField(u64),

    #[error("invalid request parameters: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
