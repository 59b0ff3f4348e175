//! The admission gate: decides whether an inbound event is stored.
//!
//! Checks run cheapest first: size, then id and signature, then the
//! author's registration. Pruning of replaceable kinds and the insert
//! itself are a single store call, so concurrent publishes of the same
//! replaceable kind cannot both survive.

use std::sync::Arc;

use tollgate_core::{validate_event, validate_event_structure, Event};
use tollgate_store::{InsertResult, Store, StoreError};
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::AdmissionError;

/// An accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Newly stored, after pruning `pruned` superseded events.
    Stored { pruned: usize },
    /// Already stored under the same id; nothing written.
    Duplicate,
}

impl Admission {
    /// Whether this call wrote the event.
    pub fn is_new(&self) -> bool {
        matches!(self, Admission::Stored { .. })
    }
}

/// Validation-and-persist pipeline for inbound events.
pub struct AdmissionGate<S> {
    config: Arc<RelayConfig>,
    store: Arc<S>,
}

impl<S> Clone for AdmissionGate<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> AdmissionGate<S> {
    pub fn new(config: Arc<RelayConfig>, store: Arc<S>) -> Self {
        Self { config, store }
    }

    /// Validate `event` and persist it.
    ///
    /// `Ok` means the transport may broadcast the event; `Err` means it
    /// must not, and the error text can be relayed to the publisher.
    pub async fn save_event(&self, event: &Event) -> Result<Admission, AdmissionError> {
        let result = self.admit(event).await;
        match &result {
            Ok(admission) => debug!(id = %event.id, identity = %event.identity, ?admission, "admitted event"),
            Err(AdmissionError::Persistence { source, .. }) => {
                warn!(id = %event.id, identity = %event.identity, error = %source, "event persistence failed")
            }
            Err(e) => debug!(id = %event.id, identity = %event.identity, reason = %e, "rejected event"),
        }
        result
    }

    async fn admit(&self, event: &Event) -> Result<Admission, AdmissionError> {
        if self.config.verify_signatures {
            validate_event(event)?;
        } else {
            validate_event_structure(event)?;
        }

        let persistence = |source: StoreError| AdmissionError::Persistence {
            identity: event.identity,
            source,
        };

        match self
            .store
            .get_registration(&event.identity)
            .await
            .map_err(persistence)?
        {
            None => return Err(AdmissionError::NotRegistered(event.identity)),
            Some(record) if !record.is_registered() => {
                return Err(AdmissionError::Unpaid(event.identity))
            }
            Some(_) => {}
        }

        match self.store.save_event(event).await.map_err(persistence)? {
            InsertResult::Inserted { pruned } => Ok(Admission::Stored { pruned }),
            InsertResult::AlreadyExists => Ok(Admission::Duplicate),
        }
    }
}
