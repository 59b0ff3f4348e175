//! The registrar: turns an identity into a payable registration invoice.
//!
//! A request without an amount gets the fixed LNURL pay parameters and
//! touches nothing. A request with the exact price gets a fresh invoice,
//! recorded with one atomic upsert so a paid identity keeps its invoice.

use std::sync::Arc;

use tollgate_core::Identity;
use tollgate_lightning::{InvoiceParams, PaymentBackend};
use tollgate_store::Store;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::RegistrarError;
use crate::lnurl::{
    description_hash, registration_metadata, LnurlResponse, PayParams, PayValues,
    RegistrationStatus,
};

/// Result type for registrar operations.
pub type Result<T> = std::result::Result<T, RegistrarError>;

/// Invoice issuance and registration status queries.
pub struct Registrar<S, B> {
    config: Arc<RelayConfig>,
    store: Arc<S>,
    backend: Arc<B>,
}

impl<S, B> Clone for Registrar<S, B> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<S: Store, B: PaymentBackend> Registrar<S, B> {
    /// Create a registrar over shared components.
    pub fn new(config: Arc<RelayConfig>, store: Arc<S>, backend: Arc<B>) -> Self {
        Self {
            config,
            store,
            backend,
        }
    }

    /// Handle an LNURL-pay request for `identity_hex`.
    ///
    /// `amount` is the raw `amount` query value in millisatoshis; an empty
    /// value counts as absent.
    pub async fn request_invoice(
        &self,
        identity_hex: &str,
        amount: Option<&str>,
    ) -> Result<LnurlResponse> {
        let identity = Identity::from_hex(identity_hex)
            .map_err(|_| RegistrarError::InvalidIdentity(identity_hex.to_string()))?;
        let price_msat = self.config.price_msat();

        let amount = match amount.filter(|a| !a.is_empty()) {
            None => {
                return Ok(LnurlResponse::Params(PayParams::for_registration(
                    &self.config.domain,
                    &identity,
                    price_msat,
                )))
            }
            Some(amount) => amount,
        };

        match amount.parse::<u64>() {
            Ok(msat) if msat == price_msat => {}
            _ => {
                debug!(identity = %identity, amount, "rejected registration amount");
                return Err(RegistrarError::InvalidAmount(amount.to_string()));
            }
        }

        let metadata = registration_metadata(&identity);
        let invoice = self
            .backend
            .create_invoice(InvoiceParams {
                amount_msat: price_msat,
                description_hash: description_hash(&metadata),
            })
            .await
            .map_err(|e| {
                warn!(identity = %identity, backend = self.backend.name(), error = %e, "invoice creation failed");
                RegistrarError::Backend(e)
            })?;

        let outcome = self
            .store
            .upsert_invoice(&identity, &invoice.checking_id)
            .await
            .map_err(|e| {
                warn!(identity = %identity, invoice = %invoice.checking_id, error = %e, "failed to save invoice");
                RegistrarError::Persistence(e)
            })?;

        if !outcome.accepted(&invoice.checking_id) {
            return Err(match outcome.registered_at {
                Some(_) => RegistrarError::AlreadyRegistered,
                None => RegistrarError::ConcurrentRequest,
            });
        }

        info!(identity = %identity, invoice = %invoice.checking_id, "issued registration invoice");
        Ok(LnurlResponse::Invoice(PayValues::for_registration(
            &identity,
            invoice.payment_request,
        )))
    }

    /// Whether `identity_hex` has a confirmed registration.
    ///
    /// A malformed identity is answered, not rejected; only store failures
    /// are errors.
    pub async fn registration_status(&self, identity_hex: &str) -> Result<RegistrationStatus> {
        let identity = match Identity::from_hex(identity_hex) {
            Ok(identity) => identity,
            Err(_) => return Ok(RegistrationStatus::invalid_pubkey()),
        };

        let status = match self.store.get_registration(&identity).await? {
            Some(record) => match record.registered_at {
                Some(at) => RegistrationStatus::registered(at),
                None => RegistrationStatus::not_registered(),
            },
            None => RegistrationStatus::not_registered(),
        };
        Ok(status)
    }

    /// The configuration this registrar prices with.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tollgate_core::{Event, EventId, InvoiceRef, Kind};
    use tollgate_lightning::MemoryBackend;
    use tollgate_store::{InsertResult, MemoryStore, RegistrationRecord, UpsertOutcome};

    const AA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn registrar() -> (Registrar<MemoryStore, MemoryBackend>, Arc<MemoryStore>, Arc<MemoryBackend>) {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(MemoryBackend::new());
        let registrar = Registrar::new(
            Arc::new(RelayConfig::default()),
            Arc::clone(&store),
            Arc::clone(&backend),
        );
        (registrar, store, backend)
    }

    fn identity() -> Identity {
        Identity::from_hex(AA).unwrap()
    }

    #[tokio::test]
    async fn test_params_without_amount() {
        let (registrar, store, backend) = registrar();

        let response = registrar.request_invoice(AA, None).await.unwrap();
        let LnurlResponse::Params(params) = response else {
            panic!("expected pay params");
        };
        assert_eq!(params.min_sendable, 500_000);
        assert_eq!(params.max_sendable, 500_000);
        assert_eq!(params.tag, "payRequest");
        assert!(params.callback.ends_with(AA));

        // No mutation on the parameters step.
        assert_eq!(backend.issued_count(), 0);
        assert!(store.get_registration(&identity()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_amount_counts_as_absent() {
        let (registrar, _, _) = registrar();
        assert!(matches!(
            registrar.request_invoice(AA, Some("")).await.unwrap(),
            LnurlResponse::Params(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_identity() {
        let (registrar, _, _) = registrar();
        let too_long = "aa".repeat(33);

        for bad in ["", "zz", "aabb", too_long.as_str()] {
            assert!(matches!(
                registrar.request_invoice(bad, None).await,
                Err(RegistrarError::InvalidIdentity(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_wrong_amounts_rejected() {
        let (registrar, _, backend) = registrar();

        for bad in ["499999", "500001", "500", "abc", "-500000", "500000.0"] {
            assert!(matches!(
                registrar.request_invoice(AA, Some(bad)).await,
                Err(RegistrarError::InvalidAmount(_))
            ));
        }
        assert_eq!(backend.issued_count(), 0);
    }

    #[tokio::test]
    async fn test_invoice_is_recorded_and_bound_to_metadata() {
        let (registrar, store, backend) = registrar();

        let response = registrar.request_invoice(AA, Some("500000")).await.unwrap();
        let LnurlResponse::Invoice(values) = response else {
            panic!("expected invoice");
        };
        assert!(values.disposable);
        assert!(values.routes.is_empty());

        let record = store.get_registration(&identity()).await.unwrap().unwrap();
        let issued = backend.issued(&record.invoice).unwrap();
        assert_eq!(issued.invoice.payment_request, values.pr);
        assert_eq!(issued.params.amount_msat, 500_000);
        assert_eq!(
            issued.params.description_hash,
            description_hash(&registration_metadata(&identity()))
        );
        assert_eq!(record.registered_at, None);
    }

    #[tokio::test]
    async fn test_unpaid_rerequest_replaces_invoice() {
        let (registrar, store, _) = registrar();

        registrar.request_invoice(AA, Some("500000")).await.unwrap();
        let first = store.get_registration(&identity()).await.unwrap().unwrap();

        registrar.request_invoice(AA, Some("500000")).await.unwrap();
        let second = store.get_registration(&identity()).await.unwrap().unwrap();

        assert_ne!(first.invoice, second.invoice);
    }

    #[tokio::test]
    async fn test_paid_identity_is_already_registered() {
        let (registrar, store, _) = registrar();

        registrar.request_invoice(AA, Some("500000")).await.unwrap();
        let record = store.get_registration(&identity()).await.unwrap().unwrap();
        store.mark_paid(&record.invoice, 42).await.unwrap();

        assert!(matches!(
            registrar.request_invoice(AA, Some("500000")).await,
            Err(RegistrarError::AlreadyRegistered)
        ));

        // Wrong amounts still fail on amount, whatever the state.
        assert!(matches!(
            registrar.request_invoice(AA, Some("1")).await,
            Err(RegistrarError::InvalidAmount(_))
        ));

        let after = store.get_registration(&identity()).await.unwrap().unwrap();
        assert_eq!(after.invoice, record.invoice);
        assert_eq!(after.registered_at, Some(42));
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_no_record() {
        let (registrar, store, backend) = registrar();
        backend.fail_next_invoice("node offline");

        let err = registrar.request_invoice(AA, Some("500000")).await.unwrap_err();
        assert!(matches!(err, RegistrarError::Backend(_)));
        assert!(err.is_retryable());
        assert!(store.get_registration(&identity()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence() {
        let (registrar, store, _) = registrar();
        store.set_failing(true);

        assert!(matches!(
            registrar.request_invoice(AA, Some("500000")).await,
            Err(RegistrarError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_registration_status() {
        let (registrar, store, _) = registrar();

        let status = registrar.registration_status("nope").await.unwrap();
        assert_eq!(status, RegistrationStatus::invalid_pubkey());

        let status = registrar.registration_status(AA).await.unwrap();
        assert_eq!(status, RegistrationStatus::not_registered());

        store
            .upsert_invoice(&identity(), &InvoiceRef::from("inv"))
            .await
            .unwrap();
        let status = registrar.registration_status(AA).await.unwrap();
        assert!(!status.success);

        store.mark_paid(&"inv".into(), 1_700_000_000).await.unwrap();
        let status = registrar.registration_status(AA).await.unwrap();
        assert!(status.success);
        assert_eq!(status.message, "pubkey registered at timestamp 1700000000");
    }

    /// A store whose upsert always loses to another unpaid request.
    struct LosingUpsertStore(MemoryStore);

    #[async_trait]
    impl Store for LosingUpsertStore {
        async fn upsert_invoice(
            &self,
            _identity: &Identity,
            _invoice: &InvoiceRef,
        ) -> tollgate_store::Result<UpsertOutcome> {
            Ok(UpsertOutcome {
                stored: "other".into(),
                registered_at: None,
            })
        }

        async fn mark_paid(
            &self,
            invoice: &InvoiceRef,
            at: i64,
        ) -> tollgate_store::Result<Option<Identity>> {
            self.0.mark_paid(invoice, at).await
        }

        async fn get_registration(
            &self,
            identity: &Identity,
        ) -> tollgate_store::Result<Option<RegistrationRecord>> {
            self.0.get_registration(identity).await
        }

        async fn save_event(&self, event: &Event) -> tollgate_store::Result<InsertResult> {
            self.0.save_event(event).await
        }

        async fn get_event(&self, id: &EventId) -> tollgate_store::Result<Option<Event>> {
            self.0.get_event(id).await
        }

        async fn has_event(&self, id: &EventId) -> tollgate_store::Result<bool> {
            self.0.has_event(id).await
        }

        async fn events_by_author(
            &self,
            identity: &Identity,
            kind: Option<Kind>,
        ) -> tollgate_store::Result<Vec<Event>> {
            self.0.events_by_author(identity, kind).await
        }

        async fn count_events(&self) -> tollgate_store::Result<usize> {
            self.0.count_events().await
        }
    }

    #[tokio::test]
    async fn test_lost_unpaid_upsert_is_concurrent_request() {
        let registrar = Registrar::new(
            Arc::new(RelayConfig::default()),
            Arc::new(LosingUpsertStore(MemoryStore::new())),
            Arc::new(MemoryBackend::new()),
        );

        let err = registrar.request_invoice(AA, Some("500000")).await.unwrap_err();
        assert!(matches!(err, RegistrarError::ConcurrentRequest));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "concurrent invoice request, retry");
    }
}
