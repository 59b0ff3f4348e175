//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence. Each operation
//! holds the write lock for its whole duration, which makes it atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use tollgate_core::{Event, EventId, Identity, InvoiceRef, Kind, Replacement};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, RegistrationRecord, Store, UpsertOutcome};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    /// When set, every operation fails with `StoreError::Unavailable`.
    failing: AtomicBool,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Registrations indexed by identity.
    registrations: HashMap<Identity, RegistrationRecord>,

    /// Events indexed by id.
    events: HashMap<EventId, Event>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("failure injected".into()));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.check_available()?;
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.check_available()?;
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `stored` falls in the replacement scope of `incoming`.
fn superseded_by(stored: &Event, incoming: &Event) -> bool {
    if stored.identity != incoming.identity || stored.kind != incoming.kind {
        return false;
    }
    match incoming.kind.replacement() {
        Replacement::None => false,
        Replacement::Kind => true,
        Replacement::KindAndContent => stored.content == incoming.content,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_invoice(
        &self,
        identity: &Identity,
        invoice: &InvoiceRef,
    ) -> Result<UpsertOutcome> {
        let mut inner = self.write()?;

        let record = inner
            .registrations
            .entry(*identity)
            .or_insert_with(|| RegistrationRecord {
                identity: *identity,
                invoice: invoice.clone(),
                registered_at: None,
            });

        if record.registered_at.is_none() {
            record.invoice = invoice.clone();
        }

        Ok(UpsertOutcome {
            stored: record.invoice.clone(),
            registered_at: record.registered_at,
        })
    }

    async fn mark_paid(&self, invoice: &InvoiceRef, at: i64) -> Result<Option<Identity>> {
        let mut inner = self.write()?;

        let promoted = inner
            .registrations
            .values_mut()
            .find(|r| &r.invoice == invoice && r.registered_at.is_none())
            .map(|record| {
                record.registered_at = Some(at);
                record.identity
            });

        Ok(promoted)
    }

    async fn get_registration(&self, identity: &Identity) -> Result<Option<RegistrationRecord>> {
        let inner = self.read()?;
        Ok(inner.registrations.get(identity).cloned())
    }

    async fn save_event(&self, event: &Event) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.events.contains_key(&event.id) {
            return Ok(InsertResult::AlreadyExists);
        }

        let before = inner.events.len();
        inner.events.retain(|_, stored| !superseded_by(stored, event));
        let pruned = before - inner.events.len();

        inner.events.insert(event.id, event.clone());

        Ok(InsertResult::Inserted { pruned })
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        let inner = self.read()?;
        Ok(inner.events.get(id).cloned())
    }

    async fn has_event(&self, id: &EventId) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.events.contains_key(id))
    }

    async fn events_by_author(
        &self,
        identity: &Identity,
        kind: Option<Kind>,
    ) -> Result<Vec<Event>> {
        let inner = self.read()?;

        let mut events: Vec<Event> = inner
            .events
            .values()
            .filter(|e| &e.identity == identity && kind.map_or(true, |k| e.kind == k))
            .cloned()
            .collect();

        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn count_events(&self) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::{EventBuilder, Keypair};

    fn make_event(keypair: &Keypair, kind: Kind, created_at: i64, content: &str) -> Event {
        EventBuilder::new(kind)
            .created_at(created_at)
            .content(content)
            .sign(keypair)
    }

    #[tokio::test]
    async fn test_memory_store_registration_lifecycle() {
        let store = MemoryStore::new();
        let who = Identity::from_bytes([0xaa; 32]);

        let outcome = store.upsert_invoice(&who, &"a".into()).await.unwrap();
        assert!(outcome.accepted(&"a".into()));

        let outcome = store.upsert_invoice(&who, &"b".into()).await.unwrap();
        assert!(outcome.accepted(&"b".into()));

        assert_eq!(store.mark_paid(&"b".into(), 7).await.unwrap(), Some(who));
        assert_eq!(store.mark_paid(&"b".into(), 8).await.unwrap(), None);

        let outcome = store.upsert_invoice(&who, &"c".into()).await.unwrap();
        assert_eq!(outcome.stored, InvoiceRef::from("b"));
        assert_eq!(outcome.registered_at, Some(7));
    }

    #[tokio::test]
    async fn test_memory_store_pruning_matches_sqlite() {
        let store = MemoryStore::new();
        let keypair = Keypair::from_seed(&[5; 32]);

        store
            .save_event(&make_event(&keypair, Kind::SET_METADATA, 1, "a"))
            .await
            .unwrap();
        let newest = make_event(&keypair, Kind::SET_METADATA, 2, "b");
        assert_eq!(
            store.save_event(&newest).await.unwrap(),
            InsertResult::Inserted { pruned: 1 }
        );

        store
            .save_event(&make_event(&keypair, Kind::RECOMMEND_SERVER, 1, "wss://x"))
            .await
            .unwrap();
        store
            .save_event(&make_event(&keypair, Kind::RECOMMEND_SERVER, 2, "wss://y"))
            .await
            .unwrap();

        assert_eq!(store.count_events().await.unwrap(), 3);
        assert_eq!(
            store
                .events_by_author(&keypair.identity(), Some(Kind::SET_METADATA))
                .await
                .unwrap(),
            vec![newest]
        );
    }

    #[tokio::test]
    async fn test_memory_store_replaces_by_arrival() {
        let store = MemoryStore::new();
        let keypair = Keypair::from_seed(&[6; 32]);

        store
            .save_event(&make_event(&keypair, Kind::SET_METADATA, 200, "newer"))
            .await
            .unwrap();
        let late = make_event(&keypair, Kind::SET_METADATA, 100, "older");
        store.save_event(&late).await.unwrap();

        assert_eq!(
            store
                .events_by_author(&keypair.identity(), Some(Kind::SET_METADATA))
                .await
                .unwrap(),
            vec![late]
        );
    }

    #[tokio::test]
    async fn test_memory_store_idempotent() {
        let store = MemoryStore::new();
        let keypair = Keypair::from_seed(&[5; 32]);
        let event = make_event(&keypair, Kind::CONTACT_LIST, 1, "");

        assert_eq!(
            store.save_event(&event).await.unwrap(),
            InsertResult::Inserted { pruned: 0 }
        );
        assert_eq!(
            store.save_event(&event).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.count_events().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(matches!(
            store.count_events().await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_failing(false);
        assert_eq!(store.count_events().await.unwrap(), 0);
    }
}
