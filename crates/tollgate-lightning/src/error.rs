//! Error types for payment backends.

use thiserror::Error;

/// Errors that can occur talking to a payment backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend refused or failed to create an invoice.
    #[error("failed to create invoice: {0}")]
    InvoiceCreation(String),

    /// The backend cannot provide a payment notification feed.
    #[error("payment stream unavailable: {0}")]
    StreamUnavailable(String),

    /// Invoices must be for a positive amount.
    #[error("invalid invoice amount: {0} msat")]
    InvalidAmount(u64),

    /// The notification feed has been closed.
    #[error("payment feed closed")]
    FeedClosed,
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
