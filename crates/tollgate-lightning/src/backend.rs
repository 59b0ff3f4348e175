//! Payment backend abstraction.
//!
//! The relay needs exactly two things from a Lightning wallet or node:
//! an invoice bound to a description hash, and a feed of payment
//! notifications. How a concrete backend talks to its node is its own
//! business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tollgate_core::InvoiceRef;

use crate::error::Result;

/// Parameters for a new invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceParams {
    /// Exact amount in millisatoshis.
    pub amount_msat: u64,
    /// SHA-256 of the metadata the payer commits to (BOLT 11 `h` field).
    pub description_hash: [u8; 32],
}

/// An invoice issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// The payable BOLT 11 string handed to the client.
    pub payment_request: String,
    /// The backend's reference for later status notifications.
    pub checking_id: InvoiceRef,
}

/// One payment notification from the backend feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStatus {
    /// Which invoice this is about.
    pub checking_id: InvoiceRef,
    /// Whether the backend knows the invoice at all.
    pub exists: bool,
    /// Whether it has been paid.
    pub paid: bool,
}

impl InvoiceStatus {
    /// A confirmed payment for an invoice the backend knows.
    pub fn settled(checking_id: InvoiceRef) -> Self {
        Self {
            checking_id,
            exists: true,
            paid: true,
        }
    }

    /// Whether this notification confirms a payment.
    pub fn is_settled(&self) -> bool {
        self.exists && self.paid
    }
}

/// Receiving half of a payment notification feed.
///
/// Delivery is at-least-once and ordered by arrival only.
pub type InvoiceFeed = mpsc::Receiver<InvoiceStatus>;

/// Payment backend trait.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Create an invoice for exactly `params.amount_msat`, committing to
    /// `params.description_hash`.
    async fn create_invoice(&self, params: InvoiceParams) -> Result<Invoice>;

    /// Open the payment notification feed.
    ///
    /// The relay consumes it from a single task for the process lifetime.
    async fn paid_invoices_stream(&self) -> Result<InvoiceFeed>;
}
