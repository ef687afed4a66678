//! In-memory [`SecretStoreAccessor`] for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::accessor::SecretStoreAccessor;
use super::error::{AccessorError, Result};

/// Accessor with canned responses and recorded writes.
///
/// Reads answer from a `(path, field)` table; writes answer from a per-path
/// response table and are recorded for later inspection, so tests can assert
/// on the exact payload a provider submitted. `fail_next` forces the next
/// operation to fail with a connection error, for transport-failure paths.
#[derive(Debug, Default)]
pub struct MockAccessor {
    reads: Mutex<HashMap<(String, String), String>>,
    write_responses: Mutex<HashMap<String, HashMap<String, String>>>,
    recorded_writes: Mutex<Vec<(String, HashMap<String, String>)>>,
    fail_next: AtomicBool,
}

impl MockAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read(
        self,
        path: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.reads.lock().unwrap().insert((path.into(), field.into()), value.into());
        self
    }

    pub fn with_write_response(
        self,
        path: impl Into<String>,
        response: HashMap<String, String>,
    ) -> Self {
        self.write_responses.lock().unwrap().insert(path.into(), response);
        self
    }

    /// Fail the next read or write with a connection error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Every `(path, payload)` pair submitted through [`SecretStoreAccessor::write`].
    pub fn recorded_writes(&self) -> Vec<(String, HashMap<String, String>)> {
        self.recorded_writes.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(AccessorError::connection_failed("mock accessor: injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SecretStoreAccessor for MockAccessor {
    async fn read_field(&self, path: &str, field: &str) -> Result<String> {
        self.take_failure()?;
        self.reads
            .lock()
            .unwrap()
            .get(&(path.to_string(), field.to_string()))
            .cloned()
            .ok_or_else(|| AccessorError::missing_field(path, field))
    }

    async fn write(
        &self,
        path: &str,
        data: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        self.take_failure()?;
        self.recorded_writes.lock().unwrap().push((path.to_string(), data.clone()));
        self.write_responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| AccessorError::http(path, 404, "no mock response configured"))
    }
}
