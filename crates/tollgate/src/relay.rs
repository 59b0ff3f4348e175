//! The Relay: wires configuration, store, and payment backend together.
//!
//! Components share nothing but these three values. The store is the only
//! synchronization point between them.

use std::sync::Arc;

use tollgate_lightning::PaymentBackend;
use tollgate_store::Store;
use tracing::info;

use crate::admission::AdmissionGate;
use crate::config::RelayConfig;
use crate::error::Result;
use crate::listener::{ListenerHandle, PaymentListener};
use crate::registrar::Registrar;

/// The relay's registration and admission core.
pub struct Relay<S, B> {
    config: Arc<RelayConfig>,
    store: Arc<S>,
    backend: Arc<B>,
}

impl<S, B> Clone for Relay<S, B> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<S, B> Relay<S, B>
where
    S: Store + 'static,
    B: PaymentBackend + 'static,
{
    /// Validate `config` and build a relay that owns its components.
    pub fn new(config: RelayConfig, store: S, backend: B) -> Result<Self> {
        Self::from_shared(Arc::new(config), Arc::new(store), Arc::new(backend))
    }

    /// Build a relay over components the caller also holds.
    pub fn from_shared(config: Arc<RelayConfig>, store: Arc<S>, backend: Arc<B>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            backend,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Invoice issuance and status queries.
    pub fn registrar(&self) -> Registrar<S, B> {
        Registrar::new(
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            Arc::clone(&self.backend),
        )
    }

    /// Event admission for the surrounding transport.
    pub fn gate(&self) -> AdmissionGate<S> {
        AdmissionGate::new(Arc::clone(&self.config), Arc::clone(&self.store))
    }

    /// Subscribe to the backend's payment feed and start confirming
    /// registrations.
    ///
    /// Call once per process; the feed has a single consumer.
    pub async fn start_payment_listener(&self) -> Result<ListenerHandle> {
        let feed = self.backend.paid_invoices_stream().await?;
        info!(backend = self.backend.name(), "subscribed to payment feed");
        Ok(PaymentListener::spawn(Arc::clone(&self.store), feed))
    }

    /// HTTP routes for the registration endpoints.
    pub fn router(&self) -> axum::Router {
        crate::http::router(self.registrar())
    }
}
