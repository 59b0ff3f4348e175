//! # Tollgate
//!
//! Pay-to-publish gating for an event relay: anyone may read, but only
//! identities that paid a one-time Lightning registration fee may publish.
//!
//! ## Overview
//!
//! - **Registrar**: LNURL-pay flow turning a public key into an invoice
//!   whose description hash commits to "registration for pubkey X"
//! - **Payment Listener**: one worker consuming the backend's payment feed
//!   and promoting invoiced identities to registered
//! - **Admission Gate**: size, signature, and registration checks, then
//!   replaceable-event pruning and insert as one atomic store call
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tollgate::{Relay, RelayConfig};
//! use tollgate::lightning::MemoryBackend;
//! use tollgate::store::SqliteStore;
//!
//! async fn example() -> tollgate::Result<()> {
//!     let store = SqliteStore::open("relay.db")?;
//!     let relay = Relay::new(RelayConfig::default(), store, MemoryBackend::new())?;
//!
//!     // Confirm registrations in the background.
//!     let listener = relay.start_payment_listener().await?;
//!
//!     // Serve `relay.router()` with axum, hand `relay.gate()` to the transport.
//!     let _routes = relay.router();
//!     let _gate = relay.gate();
//!
//!     listener.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `tollgate::core` - Identities, events, and validation
//! - `tollgate::store` - Storage abstraction, SQLite and in-memory
//! - `tollgate::lightning` - Payment backend seam

pub mod admission;
pub mod config;
pub mod error;
pub mod http;
pub mod listener;
pub mod lnurl;
pub mod registrar;
pub mod relay;

// Re-export component crates
pub use tollgate_core as core;
pub use tollgate_lightning as lightning;
pub use tollgate_store as store;

// Re-export main types for convenience
pub use admission::{Admission, AdmissionGate};
pub use config::RelayConfig;
pub use error::{AdmissionError, ConfigError, RegistrarError, RelayError, Result};
pub use listener::{handle_status, ListenerHandle, ListenerOutcome, ListenerReport, PaymentListener};
pub use lnurl::{LnurlResponse, PayParams, PayValues, RegistrationStatus};
pub use registrar::Registrar;
pub use relay::Relay;

// Re-export commonly used core types
pub use tollgate_core::{Event, EventBuilder, EventId, Identity, InvoiceRef, Keypair, Kind};
