use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use jiff::Timestamp;

use super::lock;
use crate::{Error, MediaId, MediaLedger, MediaRecord, NewMedia, Result};

/// Ledger operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    /// `create_media` and `create_medias`.
    Create,
    /// `find_media`.
    Find,
    /// `mark_media_verified`.
    MarkVerified,
    /// `delete_media` and `delete_medias`.
    Delete,
    /// `ping`.
    Ping,
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: i64,
    records: BTreeMap<MediaId, MediaRecord>,
    failures: HashSet<LedgerOp>,
    fail_create_at: Option<usize>,
    calls: HashMap<LedgerOp, usize>,
    delay: Option<Duration>,
}

impl LedgerState {
    fn enter(&mut self, op: LedgerOp) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        if self.failures.contains(&op) {
            return Err(Error::storage().with_message(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn build(&mut self, media: NewMedia) -> MediaRecord {
        self.next_id += 1;
        MediaRecord {
            id: MediaId::new(self.next_id),
            created_at: Timestamp::now(),
            filename: media.filename,
            size: media.size,
            base_path: media.base_path,
            verified: false,
        }
    }
}

/// In-memory [`MediaLedger`] with all-or-nothing batch semantics.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call of `op` fail with a storage error.
    pub fn fail(&self, op: LedgerOp) {
        lock(&self.state).failures.insert(op);
    }

    /// Clears an injected failure.
    pub fn heal(&self, op: LedgerOp) {
        lock(&self.state).failures.remove(&op);
    }

    /// Makes the insert at `index` of the next batch create fail.
    pub fn fail_create_at(&self, index: usize) {
        lock(&self.state).fail_create_at = Some(index);
    }

    /// Delays every call by `delay` before it touches any state.
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    /// Returns how many times `op` was invoked.
    pub fn calls(&self, op: LedgerOp) -> usize {
        lock(&self.state).calls.get(&op).copied().unwrap_or_default()
    }

    /// Returns a stored record.
    pub fn record(&self, id: MediaId) -> Option<MediaRecord> {
        lock(&self.state).records.get(&id).cloned()
    }

    /// Returns every stored record ordered by id.
    pub fn records(&self) -> Vec<MediaRecord> {
        lock(&self.state).records.values().cloned().collect()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        lock(&self.state).records.len()
    }

    /// Returns whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn pause(&self) {
        let delay = lock(&self.state).delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl MediaLedger for MemoryLedger {
    async fn create_media(&self, media: NewMedia) -> Result<MediaRecord> {
        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(LedgerOp::Create)?;
        let record = state.build(media);
        state.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn create_medias(&self, medias: Vec<NewMedia>) -> Result<Vec<MediaRecord>> {
        if medias.is_empty() {
            return Ok(Vec::new());
        }

        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(LedgerOp::Create)?;

        let fail_at = state.fail_create_at.take();
        let next_id = state.next_id;
        let mut created = Vec::with_capacity(medias.len());
        for (index, media) in medias.into_iter().enumerate() {
            if fail_at == Some(index) {
                state.next_id = next_id;
                return Err(Error::storage()
                    .with_message(format!("injected insert failure at index {index}")));
            }
            created.push(state.build(media));
        }

        for record in &created {
            state.records.insert(record.id, record.clone());
        }
        Ok(created)
    }

    async fn find_media(&self, id: MediaId) -> Result<Option<MediaRecord>> {
        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(LedgerOp::Find)?;
        Ok(state.records.get(&id).cloned())
    }

    async fn mark_media_verified(&self, id: MediaId) -> Result<MediaRecord> {
        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(LedgerOp::MarkVerified)?;
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(id))?;
        record.verified = true;
        Ok(record.clone())
    }

    async fn delete_medias(&self, ids: &[MediaId]) -> Result<Vec<MediaRecord>> {
        self.pause().await;
        let mut state = lock(&self.state);
        state.enter(LedgerOp::Delete)?;

        if let Some(missing) = ids.iter().find(|id| !state.records.contains_key(*id)) {
            return Err(Error::not_found(*missing));
        }

        Ok(ids
            .iter()
            .filter_map(|id| state.records.remove(id))
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.pause().await;
        lock(&self.state).enter(LedgerOp::Ping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn create_assigns_increasing_ids() -> Result<()> {
        let ledger = MemoryLedger::new();
        let a = ledger.create_media(NewMedia::new("a.txt", 1)).await?;
        let b = ledger.create_media(NewMedia::new("b.txt", 2)).await?;
        assert!(a.id < b.id);
        assert!(!a.verified);
        Ok(())
    }

    #[tokio::test]
    async fn batch_create_is_all_or_nothing() -> Result<()> {
        let ledger = MemoryLedger::new();
        ledger.fail_create_at(2);

        let batch = (0..4)
            .map(|i| NewMedia::new(format!("{i}.bin"), i))
            .collect::<Vec<_>>();
        let err = ledger.create_medias(batch.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(ledger.is_empty());

        let created = ledger.create_medias(batch).await?;
        let names: Vec<_> = created.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, ["0.bin", "1.bin", "2.bin", "3.bin"]);
        assert_eq!(ledger.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn empty_batch_create_does_nothing() -> Result<()> {
        let ledger = MemoryLedger::new();
        assert!(ledger.create_medias(Vec::new()).await?.is_empty());
        assert_eq!(ledger.calls(LedgerOp::Create), 0);
        Ok(())
    }

    #[tokio::test]
    async fn batch_delete_with_missing_id_deletes_nothing() -> Result<()> {
        let ledger = MemoryLedger::new();
        let a = ledger.create_media(NewMedia::new("a", 1)).await?;

        let err = ledger
            .delete_medias(&[a.id, MediaId::new(999)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.media_id, Some(MediaId::new(999)));
        assert!(ledger.record(a.id).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn delete_media_delegates_to_batch() -> Result<()> {
        let ledger = MemoryLedger::new();
        let a = ledger.create_media(NewMedia::new("a", 1)).await?;
        let deleted = ledger.delete_media(a.id).await?;
        assert_eq!(deleted.id, a.id);
        assert!(ledger.delete_media(a.id).await.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn mark_verified_missing_is_not_found() {
        let ledger = MemoryLedger::new();
        let err = ledger
            .mark_media_verified(MediaId::new(5))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn injected_failures_can_be_healed() -> Result<()> {
        let ledger = MemoryLedger::new();
        ledger.fail(LedgerOp::Ping);
        assert!(ledger.ping().await.is_err());
        ledger.heal(LedgerOp::Ping);
        ledger.ping().await?;
        assert_eq!(ledger.calls(LedgerOp::Ping), 2);
        Ok(())
    }
}
