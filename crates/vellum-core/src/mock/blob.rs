use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;

use super::lock;
use crate::{BlobStore, Error, ObjectInfo, ObjectKey, PutObject, Result, TRACING_TARGET_BLOB};

/// Blob store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobOp {
    /// `put_object` and `probe`.
    Put,
    /// `get_object`.
    Get,
    /// `stat_object`.
    Stat,
    /// `delete_object`.
    Delete,
}

/// An object held by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object content.
    pub data: Bytes,
    /// User metadata supplied on write.
    pub metadata: HashMap<String, String>,
    /// Tags supplied on write.
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct BlobState {
    objects: BTreeMap<ObjectKey, StoredObject>,
    failures: HashSet<BlobOp>,
    calls: HashMap<BlobOp, usize>,
    short_writes: bool,
    delay: Option<Duration>,
}

impl BlobState {
    fn enter(&mut self, op: BlobOp) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        if self.failures.contains(&op) {
            return Err(Error::transport().with_message(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

/// In-memory [`BlobStore`] keeping objects in an ordered map.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    state: Mutex<BlobState>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call of `op` fail with a transport error.
    pub fn fail(&self, op: BlobOp) {
        lock(&self.state).failures.insert(op);
    }

    /// Clears an injected failure.
    pub fn heal(&self, op: BlobOp) {
        lock(&self.state).failures.remove(&op);
    }

    /// Stores one byte less than written, so confirmation sees a mismatch.
    pub fn set_short_writes(&self, enabled: bool) {
        lock(&self.state).short_writes = enabled;
    }

    /// Delays every call by `delay` before it touches any state.
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    /// Places an object directly, bypassing fault injection.
    pub fn insert(&self, key: ObjectKey, data: impl Into<Bytes>) {
        lock(&self.state).objects.insert(
            key,
            StoredObject {
                data: data.into(),
                metadata: HashMap::new(),
                tags: HashMap::new(),
            },
        );
    }

    /// Removes an object directly, bypassing fault injection.
    pub fn remove(&self, key: &ObjectKey) -> Option<StoredObject> {
        lock(&self.state).objects.remove(key)
    }

    /// Returns a stored object.
    pub fn object(&self, key: &ObjectKey) -> Option<StoredObject> {
        lock(&self.state).objects.get(key).cloned()
    }

    /// Returns whether an object exists.
    pub fn contains(&self, key: &ObjectKey) -> bool {
        lock(&self.state).objects.contains_key(key)
    }

    /// Returns every stored key in order.
    pub fn keys(&self) -> Vec<ObjectKey> {
        lock(&self.state).objects.keys().cloned().collect()
    }

    /// Returns how many times `op` was invoked.
    pub fn calls(&self, op: BlobOp) -> usize {
        lock(&self.state).calls.get(&op).copied().unwrap_or_default()
    }

    async fn pause(&self) {
        let delay = lock(&self.state).delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(&self, object: PutObject) -> Result<()> {
        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(BlobOp::Put)?;
        object.check_declared_size()?;

        let mut data = object.data;
        if state.short_writes && !data.is_empty() {
            data.truncate(data.len() - 1);
        }

        tracing::trace!(
            target: TRACING_TARGET_BLOB,
            key = %object.key,
            size = data.len(),
            "stored object in memory"
        );

        state.objects.insert(
            object.key,
            StoredObject {
                data,
                metadata: object.metadata,
                tags: object.tags,
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &ObjectKey) -> Result<Bytes> {
        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(BlobOp::Get)?;
        state
            .objects
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| missing(key))
    }

    async fn stat_object(&self, key: &ObjectKey) -> Result<ObjectInfo> {
        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(BlobOp::Stat)?;
        state
            .objects
            .get(key)
            .map(|object| ObjectInfo {
                size: object.data.len() as u64,
            })
            .ok_or_else(|| missing(key))
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<()> {
        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(BlobOp::Delete)?;
        state.objects.remove(key).map(|_| ()).ok_or_else(|| missing(key))
    }
}

fn missing(key: &ObjectKey) -> Error {
    Error::new(crate::ErrorKind::NotFound).with_message(format!("object `{key}` does not exist"))
}
