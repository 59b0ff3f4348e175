//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a keypair plus a relay wired
//! over the in-memory store and payment backend.

use std::sync::Arc;

use tollgate::{Relay, RelayConfig};
use tollgate_core::{Event, EventBuilder, Identity, Keypair, Kind};
use tollgate_lightning::MemoryBackend;
use tollgate_store::{MemoryStore, Store};

/// A keypair and a relay over in-memory components.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: Arc<MemoryStore>,
    pub backend: Arc<MemoryBackend>,
    pub relay: Relay<MemoryStore, MemoryBackend>,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::build(Keypair::generate())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::build(Keypair::from_seed(&seed))
    }

    fn build(keypair: Keypair) -> Self {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(MemoryBackend::new());
        let config = Arc::new(RelayConfig::default());
        let relay = Relay::from_shared(config, Arc::clone(&store), Arc::clone(&backend))
            .unwrap_or_else(|e| panic!("fixture config rejected: {e}"));
        Self {
            keypair,
            store,
            backend,
            relay,
        }
    }

    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    pub fn identity_hex(&self) -> String {
        self.keypair.identity().to_hex()
    }

    /// The exact amount query the registrar accepts.
    pub fn price_query(&self) -> String {
        self.relay.config().price_msat().to_string()
    }

    /// Sign an event of any kind.
    pub fn make_event(&self, kind: Kind, created_at: i64, content: &str) -> Event {
        EventBuilder::new(kind)
            .created_at(created_at)
            .content(content)
            .sign(&self.keypair)
    }

    /// Sign a text note.
    pub fn make_note(&self, content: &str) -> Event {
        self.make_event(Kind::TEXT_NOTE, 1_700_000_000, content)
    }

    /// Sign a metadata event.
    pub fn make_metadata(&self, created_at: i64, name: &str) -> Event {
        self.make_event(Kind::SET_METADATA, created_at, &format!(r#"{{"name":"{name}"}}"#))
    }

    /// Request an invoice and return the reference the store holds.
    pub async fn request_invoice(&self) -> tollgate_core::InvoiceRef {
        self.relay
            .registrar()
            .request_invoice(&self.identity_hex(), Some(&self.price_query()))
            .await
            .unwrap_or_else(|e| panic!("invoice request failed: {e}"));
        self.store
            .get_registration(&self.identity())
            .await
            .ok()
            .flatten()
            .map(|record| record.invoice)
            .unwrap_or_else(|| panic!("no registration recorded for {}", self.identity()))
    }

    /// Request an invoice and mark it paid in the store, skipping the
    /// payment feed.
    pub async fn register(&self, at: i64) {
        let invoice = self.request_invoice().await;
        let promoted = self
            .store
            .mark_paid(&invoice, at)
            .await
            .unwrap_or_else(|e| panic!("mark_paid failed: {e}"));
        assert_eq!(promoted, Some(self.identity()));
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
