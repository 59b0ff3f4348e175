//! Canonical CBOR encoding for deterministic event ids.
//!
//! The signed fields of an event are encoded as a CBOR map with small
//! integer keys in ascending order. ciborium already emits the shortest
//! integer form and definite lengths, so inserting entries in key order is
//! all that deterministic encoding requires here.
//!
//! The event id is `Blake3(ID_DOMAIN || canonical_bytes)`.

use ciborium::value::Value;

use crate::event::Kind;
use crate::types::{EventId, Identity};

/// Domain separation prefix for event id hashing.
pub const ID_DOMAIN: &[u8] = b"tollgate/event/v1\0";

/// Field keys (integer keys for compact encoding).
mod keys {
    pub const IDENTITY: u64 = 0;
    pub const CREATED_AT: u64 = 1;
    pub const KIND: u64 = 2;
    pub const TAGS: u64 = 3;
    pub const CONTENT: u64 = 4;
}

/// Encode the signed fields of an event to canonical CBOR bytes.
pub fn canonical_bytes(
    identity: &Identity,
    created_at: i64,
    kind: Kind,
    tags: &[Vec<String>],
    content: &str,
) -> Vec<u8> {
    let tags = tags
        .iter()
        .map(|tag| Value::Array(tag.iter().cloned().map(Value::Text).collect()))
        .collect();

    let value = Value::Map(vec![
        (
            Value::Integer(keys::IDENTITY.into()),
            Value::Bytes(identity.0.to_vec()),
        ),
        (
            Value::Integer(keys::CREATED_AT.into()),
            Value::Integer(created_at.into()),
        ),
        (
            Value::Integer(keys::KIND.into()),
            Value::Integer(kind.as_u32().into()),
        ),
        (Value::Integer(keys::TAGS.into()), Value::Array(tags)),
        (
            Value::Integer(keys::CONTENT.into()),
            Value::Text(content.to_string()),
        ),
    ]);

    let mut buf = Vec::new();
    // Writing a plain Value into a Vec cannot fail.
    ciborium::into_writer(&value, &mut buf).unwrap_or_default();
    buf
}

/// Compute the content-derived id of an event.
pub fn compute_event_id(
    identity: &Identity,
    created_at: i64,
    kind: Kind,
    tags: &[Vec<String>],
    content: &str,
) -> EventId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ID_DOMAIN);
    hasher.update(&canonical_bytes(identity, created_at, kind, tags, content));
    EventId(*hasher.finalize().as_bytes())
}
