//! The payment listener: promotes identities when their invoice is paid.
//!
//! One worker task owns the backend's notification feed for the life of the
//! process. Each notification goes through [`handle_status`], which issues
//! a single conditional update; a replayed or unknown invoice changes
//! nothing. Store failures are logged and the notification is dropped so
//! the feed never backs up behind a struggling database.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tollgate_core::Identity;
use tollgate_lightning::{InvoiceFeed, InvoiceStatus};
use tollgate_store::Store;
use tracing::{debug, info, warn};

/// What one notification did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// The identity holding the invoice is now registered.
    Registered(Identity),
    /// No unpaid record holds the invoice (unknown, superseded, or replayed).
    Ignored,
    /// The notification does not confirm a payment.
    NotPaid,
    /// The store failed; the notification was dropped.
    Failed,
}

/// Counts of outcomes over a worker's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerReport {
    pub registered: u64,
    pub ignored: u64,
    pub not_paid: u64,
    pub failed: u64,
}

impl ListenerReport {
    fn record(&mut self, outcome: &ListenerOutcome) {
        match outcome {
            ListenerOutcome::Registered(_) => self.registered += 1,
            ListenerOutcome::Ignored => self.ignored += 1,
            ListenerOutcome::NotPaid => self.not_paid += 1,
            ListenerOutcome::Failed => self.failed += 1,
        }
    }

    /// Total notifications consumed.
    pub fn processed(&self) -> u64 {
        self.registered + self.ignored + self.not_paid + self.failed
    }
}

/// Apply one payment notification to the store.
///
/// `now` is the registration timestamp in Unix seconds.
pub async fn handle_status<S>(store: &S, status: &InvoiceStatus, now: i64) -> ListenerOutcome
where
    S: Store + ?Sized,
{
    if !status.is_settled() {
        debug!(
            invoice = %status.checking_id,
            exists = status.exists,
            paid = status.paid,
            "ignoring unsettled invoice status"
        );
        return ListenerOutcome::NotPaid;
    }

    match store.mark_paid(&status.checking_id, now).await {
        Ok(Some(identity)) => {
            info!(identity = %identity, invoice = %status.checking_id, "user registered");
            ListenerOutcome::Registered(identity)
        }
        Ok(None) => {
            debug!(invoice = %status.checking_id, "no unpaid registration for invoice");
            ListenerOutcome::Ignored
        }
        Err(e) => {
            warn!(invoice = %status.checking_id, error = %e, "failed to register user, dropping notification");
            ListenerOutcome::Failed
        }
    }
}

/// Spawns the worker that drains a payment feed.
pub struct PaymentListener;

impl PaymentListener {
    /// Start consuming `feed` on a dedicated task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S>(store: Arc<S>, feed: InvoiceFeed) -> ListenerHandle
    where
        S: Store + 'static,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(run(store, feed, shutdown_rx));
        ListenerHandle { shutdown_tx, task }
    }
}

async fn run<S>(
    store: Arc<S>,
    mut feed: InvoiceFeed,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> ListenerReport
where
    S: Store + 'static,
{
    let mut report = ListenerReport::default();
    info!("payment listener started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => {
                info!(processed = report.processed(), "payment listener shutting down");
                break;
            }

            next = feed.recv() => match next {
                Some(status) => {
                    let outcome = handle_status(store.as_ref(), &status, now_secs()).await;
                    report.record(&outcome);
                }
                None => {
                    warn!(
                        processed = report.processed(),
                        "payment feed closed, no further registrations will be confirmed"
                    );
                    break;
                }
            }
        }
    }

    report
}

/// Handle to a running payment listener.
///
/// Dropping the handle also stops the worker.
pub struct ListenerHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<ListenerReport>,
}

impl ListenerHandle {
    /// Signal the worker to stop and wait for it.
    ///
    /// Notifications still queued in the feed are left unconsumed.
    pub async fn shutdown(self) -> ListenerReport {
        // Err only means the worker already exited.
        let _ = self.shutdown_tx.send(());
        Self::collect(self.task).await
    }

    /// Wait for the worker to end on its own, i.e. for the feed to close.
    pub async fn join(self) -> ListenerReport {
        let ListenerHandle { shutdown_tx, task } = self;
        let report = Self::collect(task).await;
        drop(shutdown_tx);
        report
    }

    /// Whether the worker has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    async fn collect(task: JoinHandle<ListenerReport>) -> ListenerReport {
        match task.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "payment listener task failed");
                ListenerReport::default()
            }
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
