//! Shared test-only fake executor (SPEC_FULL.md §A "Test tooling"): the
//! hand-rolled scripted `RequestExecutor` design note referenced in spec.md
//! §9 ("a capability interface...enabling deterministic tests via a scripted
//! fake"), shared across `client`, `table`, and `row` unit tests rather than
//! duplicated per module.

use std::sync::Mutex;
use std::time::Duration;

use crate::error::Result;
use crate::executor::{FilePart, Method, RequestExecutor, ResponseBody};

/// Replays a fixed script of responses in order, recording every
/// `(method, endpoint)` pair it was asked to execute.
pub struct FakeExecutor {
    pub responses: Mutex<Vec<ResponseBody>>,
    pub seen: Mutex<Vec<(Method, String)>>,
}

impl FakeExecutor {
    pub fn new(responses: Vec<ResponseBody>) -> Self {
        Self {
            responses: Mutex::new(responses),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl RequestExecutor for FakeExecutor {
    fn request(
        &self,
        method: Method,
        endpoint: &str,
        _body: Option<serde_json::Value>,
        _files: Option<Vec<FilePart>>,
        _headers: Option<Vec<(String, String)>>,
        _timeout: Duration,
    ) -> Result<ResponseBody> {
        self.seen.lock().unwrap().push((method, endpoint.to_string()));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("FakeExecutor ran out of scripted responses");
        }
        Ok(responses.remove(0))
    }
}
