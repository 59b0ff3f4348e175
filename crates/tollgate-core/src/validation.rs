//! Event validation: size bound, id integrity, and signature checks.

use crate::error::ValidationError;
use crate::event::{Event, MAX_CONTENT_BYTES};

/// Validate an event fully.
///
/// This performs:
/// - Content size check
/// - Id recomputation
/// - Signature verification over the id
pub fn validate_event(event: &Event) -> Result<(), ValidationError> {
    validate_event_structure(event)?;
    verify_event_signature(event)
}

/// Validate the content bound only.
///
/// Content of exactly [`MAX_CONTENT_BYTES`] is accepted.
pub fn validate_event_structure(event: &Event) -> Result<(), ValidationError> {
    let len = event.content_len();
    if len > MAX_CONTENT_BYTES {
        return Err(ValidationError::ContentTooLarge {
            len,
            max: MAX_CONTENT_BYTES,
        });
    }
    Ok(())
}

/// Check that the id matches the signed fields and the author signed it.
pub fn verify_event_signature(event: &Event) -> Result<(), ValidationError> {
    let computed = event.compute_id();
    if computed != event.id {
        return Err(ValidationError::IdMismatch {
            claimed: event.id,
            computed,
        });
    }

    event
        .identity
        .verify(event.id.as_bytes(), &event.signature)
        .map_err(|_| ValidationError::SignatureFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Keypair, Signature};
    use crate::event::{EventBuilder, Kind};

    fn make_test_keypair() -> Keypair {
        Keypair::from_seed(&[0x42; 32])
    }

    fn note(content: String) -> Event {
        EventBuilder::new(Kind::TEXT_NOTE)
            .created_at(1_736_870_400)
            .content(content)
            .sign(&make_test_keypair())
    }

    #[test]
    fn test_valid_event() {
        assert!(validate_event(&note("hello".into())).is_ok());
    }

    #[test]
    fn test_content_at_limit_is_accepted() {
        let event = note("x".repeat(MAX_CONTENT_BYTES));
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn test_content_over_limit_is_rejected() {
        let event = note("x".repeat(MAX_CONTENT_BYTES + 1));
        let result = validate_event_structure(&event);
        assert!(matches!(
            result,
            Err(ValidationError::ContentTooLarge { len: 10_001, max: 10_000 })
        ));
    }

    #[test]
    fn test_content_limit_counts_bytes_not_chars() {
        // 'é' is two bytes in UTF-8.
        let event = note("é".repeat(5_001));
        assert!(matches!(
            validate_event_structure(&event),
            Err(ValidationError::ContentTooLarge { len: 10_002, .. })
        ));
    }

    #[test]
    fn test_tampered_content_fails_id_check() {
        let mut event = note("hello".into());
        event.content = "tampered".into();

        assert!(matches!(
            validate_event(&event),
            Err(ValidationError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_signature() {
        let mut event = note("hello".into());
        event.signature = Signature::from_bytes([0xff; 64]);

        assert!(matches!(
            validate_event(&event),
            Err(ValidationError::SignatureFailed)
        ));
    }

    #[test]
    fn test_signature_from_other_key() {
        let mut event = note("hello".into());
        event.signature = Keypair::from_seed(&[0x01; 32]).sign(event.id.as_bytes());

        assert!(matches!(
            validate_event(&event),
            Err(ValidationError::SignatureFailed)
        ));
    }
}
