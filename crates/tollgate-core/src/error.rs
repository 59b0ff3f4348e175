//! Error types for the Tollgate core.

use thiserror::Error;

use crate::types::EventId;

/// Core errors raised while decoding or signing primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid identity {0:?}: must be 32 hex-encoded bytes")]
    InvalidIdentity(String),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Validation errors for inbound events.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("event content too large: {len} bytes exceeds {max}")]
    ContentTooLarge { len: usize, max: usize },

    #[error("event id mismatch: claimed {claimed}, computed {computed}")]
    IdMismatch { claimed: EventId, computed: EventId },

    #[error("signature verification failed")]
    SignatureFailed,
}
