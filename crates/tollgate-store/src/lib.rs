//! # Tollgate Store
//!
//! Storage abstraction for the Tollgate relay. Provides a trait-based
//! interface for registration records and admitted events, with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`UpsertOutcome`] - Canonical invoice after an invoice upsert
//! - [`InsertResult`] - Result of saving an event
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tollgate_store::{SqliteStore, Store};
//! use tollgate_core::{Identity, InvoiceRef};
//!
//! async fn example() {
//!     let store = SqliteStore::open("relay.db").unwrap();
//!
//!     let who = Identity::from_bytes([0xaa; 32]);
//!     let outcome = store.upsert_invoice(&who, &InvoiceRef::from("inv")).await.unwrap();
//!     assert!(outcome.accepted(&InvoiceRef::from("inv")));
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic transitions**: invoice upsert, payment promotion, and
//!   prune-then-insert are each one call and one atomic unit
//! - **Frozen invoices**: a paid record's invoice is never overwritten
//! - **Idempotent inserts**: saving an already-stored event id returns `AlreadyExists`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, RegistrationRecord, Store, UpsertOutcome};
