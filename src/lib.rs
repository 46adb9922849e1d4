//! Synchronous client library for the Baserow hosted relational-table REST
//! API.
//!
//! The core is the field-polymorphic row value system and the query/mutation
//! pipeline built over it: fetch a table's schema once, translate raw JSON
//! rows into validated per-field cells and back, compose query URLs with
//! filter/include/exclude/search/order/view/size parameters, stream rows
//! across pages with a bounded empty-page guard, and batch adds/updates/
//! deletes in chunks.
//!
//! ```no_run
//! use baserow_client::{Client, RowQuery};
//! use url::Url;
//!
//! let client = Client::new(Url::parse("https://api.baserow.io").unwrap(), "token", 10);
//! let table = client.get_table(1234);
//! for row in table.get_rows(&RowQuery::default()).unwrap() {
//!     let row = row.unwrap();
//!     println!("{:?}", row.to_dict());
//! }
//! ```

mod client;
mod error;
mod executor;
mod field;
mod fields;
mod filter;
mod row;
mod row_value;
mod row_values;
mod table;
mod validators;

#[cfg(test)]
mod test_support;

pub use client::{Client, ClientBuilder};
pub use error::{Error, Result, StatusKind};
pub use executor::{FilePart, Method, RequestExecutor, ReqwestExecutor, ResponseBody};
pub use field::{Field, FieldType};
pub use fields::{DateAttrs, DateFormat, SelectOption, TimeFormat, UserFile};
pub use filter::{build_filter_tree, Filter, FilterType};
pub use row::Row;
pub use row_value::RowValue;
pub use row_values::PasswordState;
pub use table::{RowIterator, RowQuery, Table};
