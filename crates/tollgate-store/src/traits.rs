//! Store trait: the abstract interface for registration and event persistence.
//!
//! Every multi-step transition is a single call on this trait, and every
//! implementation must make each call atomic. The relay holds no locks of
//! its own; the store is the only synchronization point between the
//! registrar, the payment listener, and the admission gate.

use async_trait::async_trait;
use tollgate_core::{Event, EventId, Identity, InvoiceRef, Kind};

use crate::error::Result;

/// One row of the registration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    /// The registering identity (unique key).
    pub identity: Identity,
    /// The latest invoice issued while unpaid, frozen once paid.
    pub invoice: InvoiceRef,
    /// When payment was confirmed (Unix seconds). Set at most once.
    pub registered_at: Option<i64>,
}

impl RegistrationRecord {
    /// Whether the identity may publish.
    pub fn is_registered(&self) -> bool {
        self.registered_at.is_some()
    }
}

/// What the invoice upsert left in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// The canonical invoice reference after the upsert.
    pub stored: InvoiceRef,
    /// Payment time of the record, if it was already paid.
    pub registered_at: Option<i64>,
}

impl UpsertOutcome {
    /// Whether the stored reference is the one just offered.
    pub fn accepted(&self, offered: &InvoiceRef) -> bool {
        &self.stored == offered
    }
}

/// Result of saving an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Event was inserted after pruning `pruned` superseded rows.
    Inserted { pruned: usize },
    /// An event with the same id is already stored (idempotent, not an error).
    AlreadyExists,
}

/// The Store trait: async interface for relay persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Registration Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Record an invoice for an identity in one atomic upsert.
    ///
    /// - No record: insert one with `invoice`.
    /// - Unpaid record: overwrite its invoice with `invoice`.
    /// - Paid record: leave it untouched.
    ///
    /// Returns the invoice reference that ends up stored.
    async fn upsert_invoice(&self, identity: &Identity, invoice: &InvoiceRef)
        -> Result<UpsertOutcome>;

    /// Mark the record holding `invoice` as paid at `at`, only if unpaid.
    ///
    /// Returns the promoted identity, or `None` when no unpaid record holds
    /// that invoice (unknown invoice or replayed notification).
    async fn mark_paid(&self, invoice: &InvoiceRef, at: i64) -> Result<Option<Identity>>;

    /// Get the registration record for an identity.
    async fn get_registration(&self, identity: &Identity) -> Result<Option<RegistrationRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Event Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Prune superseded events and insert `event` in one transaction.
    ///
    /// If the id is already stored nothing is pruned and `AlreadyExists` is
    /// returned. Otherwise rows in the event's replacement scope (see
    /// [`Kind::replacement`]) are deleted before the insert.
    async fn save_event(&self, event: &Event) -> Result<InsertResult>;

    /// Get an event by id.
    async fn get_event(&self, id: &EventId) -> Result<Option<Event>>;

    /// Check if an event exists by id.
    async fn has_event(&self, id: &EventId) -> Result<bool>;

    /// Events by an author, optionally of one kind, newest first.
    async fn events_by_author(&self, identity: &Identity, kind: Option<Kind>)
        -> Result<Vec<Event>>;

    /// Count of stored events.
    async fn count_events(&self) -> Result<usize>;
}
