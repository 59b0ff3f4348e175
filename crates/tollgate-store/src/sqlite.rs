//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for the relay. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.
//!
//! The registration transitions are single statements (`INSERT .. ON
//! CONFLICT .. RETURNING`, `UPDATE .. RETURNING`). Prune-then-insert runs in
//! an `IMMEDIATE` transaction so the write lock is held from the duplicate
//! check to the commit.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use tollgate_core::{Event, EventId, Identity, InvoiceRef, Kind, Replacement, Signature};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, RegistrationRecord, Store, UpsertOutcome};

/// How long a writer waits on another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

// Helper to convert a row to Event
fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let id: String = row.get("id")?;
    let identity: String = row.get("identity")?;
    let tags: String = row.get("tags")?;
    let sig: String = row.get("sig")?;

    Ok(Event {
        id: EventId::from_hex(&id).map_err(|e| conversion_error(0, e))?,
        identity: Identity::from_hex(&identity).map_err(|e| conversion_error(1, e))?,
        created_at: row.get("created_at")?,
        kind: Kind(row.get("kind")?),
        tags: serde_json::from_str(&tags).map_err(|e| conversion_error(4, e))?,
        content: row.get("content")?,
        signature: Signature::from_hex(&sig).map_err(|e| conversion_error(6, e))?,
    })
}

// Helper to convert a row to RegistrationRecord
fn row_to_registration(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegistrationRecord> {
    let identity: String = row.get("identity")?;

    Ok(RegistrationRecord {
        identity: Identity::from_hex(&identity).map_err(|e| conversion_error(0, e))?,
        invoice: InvoiceRef(row.get("invoice")?),
        registered_at: row.get("registered_at")?,
    })
}

const EVENT_COLUMNS: &str = "id, identity, created_at, kind, tags, content, sig";

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_invoice(
        &self,
        identity: &Identity,
        invoice: &InvoiceRef,
    ) -> Result<UpsertOutcome> {
        let identity = identity.to_hex();
        let invoice = invoice.clone();

        self.run(move |conn| {
            let outcome = conn.query_row(
                "INSERT INTO registered_users (identity, invoice) VALUES (?1, ?2)
                 ON CONFLICT (identity) DO UPDATE SET invoice = CASE
                     WHEN registered_users.registered_at IS NULL THEN excluded.invoice
                     ELSE registered_users.invoice
                 END
                 RETURNING invoice, registered_at",
                params![identity, invoice.as_str()],
                |row| {
                    Ok(UpsertOutcome {
                        stored: InvoiceRef(row.get(0)?),
                        registered_at: row.get(1)?,
                    })
                },
            )?;
            Ok(outcome)
        })
        .await
    }

    async fn mark_paid(&self, invoice: &InvoiceRef, at: i64) -> Result<Option<Identity>> {
        let invoice = invoice.clone();

        let promoted: Option<String> = self
            .run(move |conn| {
                conn.query_row(
                    "UPDATE registered_users SET registered_at = ?2
                     WHERE invoice = ?1 AND registered_at IS NULL
                     RETURNING identity",
                    params![invoice.as_str(), at],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;

        promoted
            .map(|hex| Identity::from_hex(&hex).map_err(|e| StoreError::InvalidData(e.to_string())))
            .transpose()
    }

    async fn get_registration(&self, identity: &Identity) -> Result<Option<RegistrationRecord>> {
        let identity = identity.to_hex();

        self.run(move |conn| {
            conn.query_row(
                "SELECT identity, invoice, registered_at FROM registered_users
                 WHERE identity = ?1",
                params![identity],
                row_to_registration,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn save_event(&self, event: &Event) -> Result<InsertResult> {
        let event = event.clone();
        let tags = serde_json::to_string(&event.tags)?;

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let id = event.id.to_hex();
            let identity = event.identity.to_hex();
            let kind = event.kind.as_u32();

            let exists = tx
                .query_row("SELECT 1 FROM event WHERE id = ?1", params![id], |_| Ok(()))
                .optional()?
                .is_some();
            if exists {
                return Ok(InsertResult::AlreadyExists);
            }

            let pruned = match event.kind.replacement() {
                Replacement::None => 0,
                Replacement::Kind => tx.execute(
                    "DELETE FROM event WHERE identity = ?1 AND kind = ?2",
                    params![identity, kind],
                )?,
                Replacement::KindAndContent => tx.execute(
                    "DELETE FROM event WHERE identity = ?1 AND kind = ?2 AND content = ?3",
                    params![identity, kind, event.content],
                )?,
            };

            let inserted = tx.execute(
                "INSERT INTO event (id, identity, created_at, kind, tags, content, sig)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (id) DO NOTHING",
                params![
                    id,
                    identity,
                    event.created_at,
                    kind,
                    tags,
                    event.content,
                    event.signature.to_hex(),
                ],
            )?;

            tx.commit()?;

            if inserted == 0 {
                Ok(InsertResult::AlreadyExists)
            } else {
                Ok(InsertResult::Inserted { pruned })
            }
        })
        .await
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        let id = id.to_hex();

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM event WHERE id = ?1"),
                params![id],
                row_to_event,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn has_event(&self, id: &EventId) -> Result<bool> {
        let id = id.to_hex();

        self.run(move |conn| {
            let found = conn
                .query_row("SELECT 1 FROM event WHERE id = ?1", params![id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn events_by_author(
        &self,
        identity: &Identity,
        kind: Option<Kind>,
    ) -> Result<Vec<Event>> {
        let identity = identity.to_hex();

        self.run(move |conn| {
            let events = match kind {
                Some(kind) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM event
                         WHERE identity = ?1 AND kind = ?2
                         ORDER BY created_at DESC, id"
                    ))?;
                    let rows = stmt.query_map(params![identity, kind.as_u32()], row_to_event)?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM event
                         WHERE identity = ?1
                         ORDER BY created_at DESC, id"
                    ))?;
                    let rows = stmt.query_map(params![identity], row_to_event)?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(events)
        })
        .await
    }

    async fn count_events(&self) -> Result<usize> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM event", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}
