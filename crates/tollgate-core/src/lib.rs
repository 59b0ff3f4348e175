//! # Tollgate Core
//!
//! Pure primitives for the Tollgate relay: identities, events, and
//! content-derived event ids.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Identity`] - A 32-byte author public key, hex at the boundary
//! - [`Event`] - A signed, immutable unit of publication
//! - [`EventId`] - Content-addressed identifier (Blake3 hash)
//! - [`Kind`] - Event kind, which also decides replacement scope
//!
//! ## Canonicalization
//!
//! Event ids hash a deterministic CBOR encoding. See [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod types;
pub mod validation;

pub use canonical::{canonical_bytes, compute_event_id, ID_DOMAIN};
pub use crypto::{Keypair, Signature};
pub use error::{CoreError, ValidationError};
pub use event::{Event, EventBuilder, Kind, Replacement, MAX_CONTENT_BYTES};
pub use types::{EventId, Identity, InvoiceRef};
pub use validation::{validate_event, validate_event_structure, verify_event_signature};
