//! Event: the unit a publisher asks the relay to store.
//!
//! Events are immutable once signed. A newer event of a replaceable kind
//! supersedes older ones instead of editing them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::compute_event_id;
use crate::crypto::{Keypair, Signature};
use crate::types::{EventId, Identity};

/// Maximum content length accepted by the relay, in bytes.
pub const MAX_CONTENT_BYTES: usize = 10_000;

/// Event kind discriminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(pub u32);

impl Kind {
    /// Profile metadata. Only the latest per identity is kept.
    pub const SET_METADATA: Self = Self(0);
    /// Plain text note.
    pub const TEXT_NOTE: Self = Self(1);
    /// Relay recommendation. Deduplicated by content per identity.
    pub const RECOMMEND_SERVER: Self = Self(2);
    /// Contact list. Only the latest per identity is kept.
    pub const CONTACT_LIST: Self = Self(3);

    /// Get the numeric value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Which stored events a new event of this kind supersedes.
    pub const fn replacement(self) -> Replacement {
        match self.0 {
            0 | 3 => Replacement::Kind,
            2 => Replacement::KindAndContent,
            _ => Replacement::None,
        }
    }

    /// Check if this kind prunes anything on insert.
    pub const fn is_replaceable(self) -> bool {
        !matches!(self.replacement(), Replacement::None)
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.0)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Kind {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Scope of stored events deleted when a new event is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// Nothing is pruned.
    None,
    /// Every event by the same identity with the same kind.
    ///
    /// The last event to arrive wins, whatever its `created_at`: an older
    /// event admitted after a newer one replaces it.
    Kind,
    /// Events by the same identity with the same kind and identical content.
    KindAndContent,
}

/// A complete signed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Content-derived identifier.
    pub id: EventId,

    /// The author.
    #[serde(rename = "pubkey")]
    pub identity: Identity,

    /// Author-claimed creation time (Unix seconds). Untrusted.
    pub created_at: i64,

    /// The kind of event.
    pub kind: Kind,

    /// Ordered tag arrays.
    pub tags: Vec<Vec<String>>,

    /// Free-form content.
    pub content: String,

    /// Ed25519 signature over the id bytes.
    #[serde(rename = "sig")]
    pub signature: Signature,
}

impl Event {
    /// Recompute the id from the signed fields.
    pub fn compute_id(&self) -> EventId {
        compute_event_id(
            &self.identity,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    /// Content length in bytes.
    pub fn content_len(&self) -> usize {
        self.content.len()
    }
}

/// Builder for creating events.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    kind: Kind,
    created_at: i64,
    tags: Vec<Vec<String>>,
    content: String,
}

impl EventBuilder {
    /// Start building an event of the given kind.
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            created_at: 0,
            tags: Vec::new(),
            content: String::new(),
        }
    }

    /// Set the creation timestamp (Unix seconds).
    pub fn created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Append a tag.
    pub fn tag<I, T>(mut self, tag: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.push(tag.into_iter().map(Into::into).collect());
        self
    }

    /// Set the content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Compute the id and sign it.
    pub fn sign(self, keypair: &Keypair) -> Event {
        let identity = keypair.identity();
        let id = compute_event_id(
            &identity,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        );
        let signature = keypair.sign(id.as_bytes());

        Event {
            id,
            identity,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            signature,
        }
    }
}
