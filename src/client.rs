//! `Client` — owns base URL, token, batch size; composes the executor
//! (spec §3, §4.7).
//!
//! Grounded on `baserowapi.baserow.Baserow.__init__` / `make_api_request`
//! (`original_source/baserowapi/baserow.py`) for the construction and
//! request-composition shape, and on `flow_client::Client`
//! (`examples/estuary-flow/crates/flow-client/src/client.rs`) for the
//! cheap-`Clone`-over-`Arc` shape so a `Client` can be handed to every
//! `Table`/`Row` it mints without lifetime plumbing.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::Result;
use crate::executor::{FilePart, Method, RequestExecutor, ReqwestExecutor, ResponseBody};
use crate::table::Table;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_BATCH_SIZE: usize = 10;

struct ClientInner {
    base_url: Url,
    batch_size: usize,
    timeout: Duration,
    executor: Box<dyn RequestExecutor>,
    name: Option<String>,
}

/// Entry point (spec §3): owns the base URL, auth token (held inside the
/// default executor), default batch size, and the injected
/// [`RequestExecutor`]. Cheap to `Clone` — every `Table`/`Row` it mints holds
/// a clone rather than a borrow (spec §3: "relation, not ownership").
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

/// Builder for [`Client`], for overriding the timeout, batch size, or
/// substituting a test [`RequestExecutor`] (SPEC_FULL.md §A "Configuration").
pub struct ClientBuilder {
    base_url: Url,
    token: String,
    batch_size: usize,
    timeout: Duration,
    executor: Option<Box<dyn RequestExecutor>>,
    name: Option<String>,
}

impl ClientBuilder {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executor(mut self, executor: Box<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Client {
        let executor = self
            .executor
            .unwrap_or_else(|| Box::new(ReqwestExecutor::new(self.base_url.clone(), self.token)));
        Client {
            inner: Arc::new(ClientInner {
                base_url: self.base_url,
                batch_size: self.batch_size,
                timeout: self.timeout,
                executor,
                name: self.name,
            }),
        }
    }
}

impl Client {
    /// `Client::new(base_url, token, batch_size=10)` (spec §4.7).
    pub fn new(base_url: Url, token: impl Into<String>, batch_size: usize) -> Client {
        Client::builder(base_url, token).batch_size(batch_size).build()
    }

    pub fn builder(base_url: Url, token: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url,
            token: token.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT,
            executor: None,
            name: None,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn batch_size(&self) -> usize {
        self.inner.batch_size
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// `get_table(id)` (spec §4.7): binds a [`Table`] to this client. Schema
    /// is not fetched until the table's fields are first accessed.
    pub fn get_table(&self, table_id: i64) -> Table {
        Table::new(self.clone(), table_id)
    }

    /// `make_api_request` (spec §4.7): execute a request and return the
    /// parsed JSON body (or an error if the body wasn't JSON).
    #[tracing::instrument(skip(self, body), fields(client = self.name()))]
    pub(crate) fn execute(&self, method: Method, endpoint: &str, body: Option<serde_json::Value>) -> Result<serde_json::Value> {
        let response = self.inner.executor.request(method, endpoint, body, None, None, self.inner.timeout)?;
        response.into_json(endpoint)
    }

    /// Like [`Client::execute`], but tolerates an empty/absent body (used by
    /// `DELETE`, which succeeds with a bare 204 and carries nothing to parse).
    pub(crate) fn execute_no_body(&self, method: Method, endpoint: &str) -> Result<ResponseBody> {
        self.inner.executor.request(method, endpoint, None, None, None, self.inner.timeout)
    }

    /// Same as [`Client::execute`], but with caller-supplied headers that
    /// override the executor's defaults (spec §4.7).
    #[allow(dead_code)]
    pub(crate) fn execute_with_headers(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
        headers: Vec<(String, String)>,
    ) -> Result<serde_json::Value> {
        let response = self
            .inner
            .executor
            .request(method, endpoint, body, None, Some(headers), self.inner.timeout)?;
        response.into_json(endpoint)
    }

    /// File upload (spec §6 "File upload (local)"): multipart POST carrying
    /// one file part. The library only models the wire contract; it does no
    /// file-system I/O of its own (spec §1 Non-goals).
    pub fn upload_file(&self, part: FilePart) -> Result<serde_json::Value> {
        let response = self.inner.executor.request(
            Method::Post,
            "/api/user-files/upload-file/",
            None,
            Some(vec![part]),
            None,
            self.inner.timeout,
        )?;
        response.into_json("/api/user-files/upload-file/")
    }

    /// File upload by URL (spec §6 "File upload (by URL)").
    pub fn upload_file_via_url(&self, url: &str) -> Result<serde_json::Value> {
        self.execute(
            Method::Post,
            "/api/user-files/upload-via-url/",
            Some(serde_json::json!({ "url": url })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeExecutor;

    #[test]
    fn execute_parses_json_body() {
        let fake = FakeExecutor::new(vec![ResponseBody::Json(serde_json::json!({"ok": true}))]);
        let client = Client::builder(Url::parse("https://example.com").unwrap(), "t")
            .executor(Box::new(fake))
            .build();
        let value = client.execute(Method::Get, "/x", None).unwrap();
        assert_eq!(value, serde_json::json!({"ok": true}));
    }

    #[test]
    fn get_table_binds_table_id() {
        let fake = FakeExecutor::new(vec![]);
        let client = Client::builder(Url::parse("https://example.com").unwrap(), "t")
            .executor(Box::new(fake))
            .build();
        let table = client.get_table(42);
        assert_eq!(table.table_id(), 42);
    }
}
