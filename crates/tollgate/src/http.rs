//! HTTP endpoints for registration.
//!
//! LNURL answers are always `200 OK`; failures travel in the body as
//! `{"status":"ERROR","reason":...}`, which is what LNURL wallets expect.
//!
//! # Endpoints
//!
//! ```text
//! GET /.well-known/lnurlp/:pubkey[?amount=<msat>]
//! GET /registration/:pubkey
//! GET /health
//! ```

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tollgate_core::Identity;
use tollgate_lightning::PaymentBackend;
use tollgate_store::Store;
use tracing::error;

use crate::lnurl::{ErrorResponse, RegistrationStatus};
use crate::registrar::Registrar;

/// Query string of the LNURL endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LnurlQuery {
    /// Amount in millisatoshis; absent on the first LNURL step.
    pub amount: Option<String>,
    /// Fallback identity for clients that pass it as a parameter.
    pub pubkey: Option<String>,
}

/// Build the registration router.
pub fn router<S, B>(registrar: Registrar<S, B>) -> Router
where
    S: Store + 'static,
    B: PaymentBackend + 'static,
{
    Router::new()
        .route("/.well-known/lnurlp/:pubkey", get(lnurlp::<S, B>))
        .route("/registration/:pubkey", get(registration::<S, B>))
        .route("/health", get(health))
        .with_state(registrar)
}

async fn lnurlp<S, B>(
    State(registrar): State<Registrar<S, B>>,
    Path(pubkey): Path<String>,
    Query(query): Query<LnurlQuery>,
) -> Response
where
    S: Store + 'static,
    B: PaymentBackend + 'static,
{
    let pubkey = select_pubkey(pubkey, query.pubkey);
    match registrar
        .request_invoice(&pubkey, query.amount.as_deref())
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => Json(ErrorResponse::new(e.to_string())).into_response(),
    }
}

async fn registration<S, B>(
    State(registrar): State<Registrar<S, B>>,
    Path(pubkey): Path<String>,
) -> Result<Json<RegistrationStatus>, HttpError>
where
    S: Store + 'static,
    B: PaymentBackend + 'static,
{
    let status = registrar
        .registration_status(&pubkey)
        .await
        .context("reading registration status")?;
    Ok(Json(status))
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Use the path identity unless it is malformed and a query one was given.
fn select_pubkey(path: String, query: Option<String>) -> String {
    match query {
        Some(query) if Identity::from_hex(&path).is_err() => query,
        _ => path,
    }
}

/// Internal failure behind an endpoint; details go to the log only.
#[derive(Debug)]
pub struct HttpError(anyhow::Error);

impl<E> From<E> for HttpError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        error!(error = %format!("{:#}", self.0), "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("internal error")),
        )
            .into_response()
    }
}
