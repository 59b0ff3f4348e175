//! A simple in-memory payment backend for testing.
//!
//! Issues fake invoices and lets the test decide when (and how often) they
//! are reported paid, using a channel as the notification feed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tollgate_core::InvoiceRef;

use crate::backend::{Invoice, InvoiceFeed, InvoiceParams, InvoiceStatus, PaymentBackend};
use crate::error::{BackendError, Result};

/// Capacity of the notification channel.
const FEED_CAPACITY: usize = 1024;

/// An invoice together with the parameters it was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedInvoice {
    pub invoice: Invoice,
    pub params: InvoiceParams,
    pub paid: bool,
}

#[derive(Default)]
struct BackendState {
    issued: HashMap<InvoiceRef, IssuedInvoice>,
    counter: u64,
    feed: Option<mpsc::Sender<InvoiceStatus>>,
    subscribed: bool,
    fail_next: Option<String>,
}

/// In-memory payment backend.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<BackendState>,
}

impl MemoryBackend {
    /// Create a new backend with no invoices and no subscriber.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        // A poisoned test double is still usable; keep going with its state.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `create_invoice` call fail with `reason`.
    pub fn fail_next_invoice(&self, reason: impl Into<String>) {
        self.lock().fail_next = Some(reason.into());
    }

    /// Look up an issued invoice.
    pub fn issued(&self, checking_id: &InvoiceRef) -> Option<IssuedInvoice> {
        self.lock().issued.get(checking_id).cloned()
    }

    /// Number of invoices issued so far.
    pub fn issued_count(&self) -> usize {
        self.lock().issued.len()
    }

    /// Mark an invoice paid and notify the feed.
    pub async fn settle(&self, checking_id: &InvoiceRef) -> Result<()> {
        {
            let mut state = self.lock();
            let issued = state.issued.get_mut(checking_id).ok_or_else(|| {
                BackendError::InvoiceCreation(format!("unknown invoice {checking_id}"))
            })?;
            issued.paid = true;
        }
        self.emit(InvoiceStatus::settled(checking_id.clone())).await
    }

    /// Deliver the settled notification for `checking_id` again, as an
    /// at-least-once feed may.
    pub async fn replay(&self, checking_id: &InvoiceRef) -> Result<()> {
        self.emit(InvoiceStatus::settled(checking_id.clone())).await
    }

    /// Push an arbitrary notification onto the feed (unknown ids, unpaid).
    pub async fn emit(&self, status: InvoiceStatus) -> Result<()> {
        let sender = self.lock().feed.clone().ok_or(BackendError::FeedClosed)?;
        sender.send(status).await.map_err(|_| BackendError::FeedClosed)
    }

    /// Drop the sending side so the consumer sees the feed end.
    pub fn close_feed(&self) {
        self.lock().feed = None;
    }
}

#[async_trait]
impl PaymentBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_invoice(&self, params: InvoiceParams) -> Result<Invoice> {
        if params.amount_msat == 0 {
            return Err(BackendError::InvalidAmount(params.amount_msat));
        }

        let mut state = self.lock();
        if let Some(reason) = state.fail_next.take() {
            return Err(BackendError::InvoiceCreation(reason));
        }

        state.counter += 1;
        let hash_hex = hex::encode(params.description_hash);
        let checking_id = InvoiceRef(format!("{:016x}{}", state.counter, &hash_hex[..16]));
        let invoice = Invoice {
            payment_request: format!(
                "lnbcrt{}n1p{}{}",
                params.amount_msat / 1000,
                checking_id,
                hash_hex
            ),
            checking_id: checking_id.clone(),
        };

        state.issued.insert(
            checking_id,
            IssuedInvoice {
                invoice: invoice.clone(),
                params,
                paid: false,
            },
        );
        tracing::trace!(checking_id = %invoice.checking_id, "issued invoice");

        Ok(invoice)
    }

    async fn paid_invoices_stream(&self) -> Result<InvoiceFeed> {
        let mut state = self.lock();
        if state.subscribed {
            return Err(BackendError::StreamUnavailable(
                "feed already has a consumer".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        state.feed = Some(tx);
        state.subscribed = true;
        Ok(rx)
    }
}
