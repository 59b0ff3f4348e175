//! # Tollgate Lightning
//!
//! The payment backend seam for the Tollgate relay.
//!
//! ## Overview
//!
//! A backend issues invoices committed to a description hash and reports
//! payments on a feed. The relay never talks to a node directly; it only
//! sees the [`PaymentBackend`] trait.
//!
//! ## Message Flow
//!
//! ```text
//! Registrar              Backend                Payment Listener
//!   |-- create_invoice -->|                          |
//!   |<-- Invoice ---------|                          |
//!   |                     |  (client pays)           |
//!   |                     |-- InvoiceStatus -------->|
//! ```
//!
//! [`MemoryBackend`] is an in-process implementation for tests.

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::{Invoice, InvoiceFeed, InvoiceParams, InvoiceStatus, PaymentBackend};
pub use error::{BackendError, Result};
pub use memory::{IssuedInvoice, MemoryBackend};
