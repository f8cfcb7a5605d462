//! Store double shared by the integration tests.

use std::sync::Mutex;

use async_trait::async_trait;
use learnhub_course_sync::store::{CollectionPath, Document, DocumentPath, StoredDocument};
use learnhub_course_sync::{DocumentStore, Error, MemoryStore, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Get(String),
    List(String),
    Update(String),
    Delete(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Get(_) | Call::List(_))
    }
}

/// Wraps a [`MemoryStore`], records every call and optionally fails the
/// first call matching a predicate.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    fail_on: Mutex<Option<Box<dyn Fn(&Call) -> bool + Send>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_when(&self, predicate: impl Fn(&Call) -> bool + Send + 'static) {
        *self.fail_on.lock().unwrap() = Some(Box::new(predicate));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut fail_on = self.fail_on.lock().unwrap();
        let fails = fail_on.as_ref().map_or(false, |predicate| predicate(&call));
        self.calls.lock().unwrap().push(call.clone());

        if fails {
            *fail_on = None;
            return Err(Error::store(format!("injected failure on {call:?}")));
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn create(&self, parent: &CollectionPath, data: Document) -> Result<String> {
        self.record(Call::Create(parent.to_string()))?;
        self.inner.create(parent, data).await
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        self.record(Call::Get(path.to_string()))?;
        self.inner.get(path).await
    }

    async fn list(&self, parent: &CollectionPath) -> Result<Vec<StoredDocument>> {
        self.record(Call::List(parent.to_string()))?;
        self.inner.list(parent).await
    }

    async fn update(&self, path: &DocumentPath, data: Document) -> Result<()> {
        self.record(Call::Update(path.to_string()))?;
        self.inner.update(path, data).await
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        self.record(Call::Delete(path.to_string()))?;
        self.inner.delete(path).await
    }
}
