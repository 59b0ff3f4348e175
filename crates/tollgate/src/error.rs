//! Error types for the relay services.

use thiserror::Error;
use tollgate_core::{Identity, ValidationError};
use tollgate_lightning::BackendError;
use tollgate_store::StoreError;

/// Errors rejecting a relay configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Registration must cost something.
    #[error("price must be at least 1 sat")]
    ZeroPrice,

    /// Callbacks need a host to point at.
    #[error("domain must not be empty")]
    EmptyDomain,

    /// The price in millisatoshis does not fit in a u64.
    #[error("price of {0} sats overflows millisatoshis")]
    PriceOverflow(u64),
}

/// Errors from the registration (invoice issuance) path.
///
/// The display text is the `reason` returned to LNURL clients.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// The identity is not 32 bytes of hex.
    #[error("invalid pubkey {0}")]
    InvalidIdentity(String),

    /// The amount is unparseable or not exactly the price.
    #[error("invalid amount {0}")]
    InvalidAmount(String),

    /// The payment backend could not issue an invoice.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The invoice could not be recorded.
    #[error("failed to save invoice: {0}")]
    Persistence(#[from] StoreError),

    /// The identity already paid; its invoice is frozen.
    #[error("user is already registered")]
    AlreadyRegistered,

    /// Another unpaid request for the same identity won the upsert.
    #[error("concurrent invoice request, retry")]
    ConcurrentRequest,
}

impl RegistrarError {
    /// Whether calling again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistrarError::Backend(_)
                | RegistrarError::Persistence(_)
                | RegistrarError::ConcurrentRequest
        )
    }
}

/// Errors rejecting an inbound event.
///
/// The display text is what the transport relays to the publisher.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Content over the size bound.
    #[error("event content too large")]
    ContentTooLarge { len: usize, max: usize },

    /// The id or signature does not check out.
    #[error("invalid event: {0}")]
    Invalid(ValidationError),

    /// The author never requested an invoice.
    #[error("{0} not registered")]
    NotRegistered(Identity),

    /// The author requested an invoice but has not paid it.
    #[error("{0}'s invoice was not paid")]
    Unpaid(Identity),

    /// The store failed while checking or saving. The store error stays
    /// out of the display text.
    #[error("failed to save event from {identity}")]
    Persistence {
        identity: Identity,
        #[source]
        source: StoreError,
    },
}

impl From<ValidationError> for AdmissionError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::ContentTooLarge { len, max } => {
                AdmissionError::ContentTooLarge { len, max }
            }
            other => AdmissionError::Invalid(other),
        }
    }
}

impl AdmissionError {
    /// Only store failures are worth retrying; everything else is a verdict.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdmissionError::Persistence { .. })
    }

    /// Whether the author lacks a confirmed registration.
    pub fn is_unregistered(&self) -> bool {
        matches!(
            self,
            AdmissionError::NotRegistered(_) | AdmissionError::Unpaid(_)
        )
    }
}

/// Top-level errors for relay wiring.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Registration error.
    #[error("registration error: {0}")]
    Registrar(#[from] RegistrarError),

    /// Admission error.
    #[error("admission error: {0}")]
    Admission(#[from] AdmissionError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Payment backend error.
    #[error("payment backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_texts() {
        let who = Identity::from_bytes([0xaa; 32]);
        let hex = who.to_hex();

        assert_eq!(
            AdmissionError::NotRegistered(who).to_string(),
            format!("{hex} not registered")
        );
        assert_eq!(
            AdmissionError::Unpaid(who).to_string(),
            format!("{hex}'s invoice was not paid")
        );
        assert_eq!(
            RegistrarError::AlreadyRegistered.to_string(),
            "user is already registered"
        );
        assert_eq!(
            RegistrarError::InvalidAmount("12".into()).to_string(),
            "invalid amount 12"
        );
    }

    #[test]
    fn test_only_persistence_is_retryable() {
        let who = Identity::from_bytes([0xaa; 32]);

        assert!(AdmissionError::Persistence {
            identity: who,
            source: StoreError::Unavailable("down".into()),
        }
        .is_retryable());
        assert!(!AdmissionError::NotRegistered(who).is_retryable());
        assert!(!AdmissionError::Unpaid(who).is_retryable());
        assert!(!AdmissionError::ContentTooLarge { len: 10_001, max: 10_000 }.is_retryable());
        assert!(!AdmissionError::Invalid(ValidationError::SignatureFailed).is_retryable());
    }

    #[test]
    fn test_persistence_reason_hides_store_error() {
        use std::error::Error as _;

        let who = Identity::from_bytes([0xaa; 32]);
        let err = AdmissionError::Persistence {
            identity: who,
            source: StoreError::InvalidData("no such column: sig".into()),
        };

        assert_eq!(err.to_string(), format!("failed to save event from {}", who.to_hex()));
        assert!(err
            .source()
            .is_some_and(|source| source.to_string().contains("no such column")));
    }

    #[test]
    fn test_validation_errors_map_to_admission() {
        assert!(matches!(
            AdmissionError::from(ValidationError::ContentTooLarge { len: 10_001, max: 10_000 }),
            AdmissionError::ContentTooLarge { len: 10_001, max: 10_000 }
        ));
        assert!(matches!(
            AdmissionError::from(ValidationError::SignatureFailed),
            AdmissionError::Invalid(ValidationError::SignatureFailed)
        ));
    }
}
