//! LNURL-pay wire types (LUD-06) and the registration metadata they carry.
//!
//! The metadata blob is what binds an invoice to one identity: its SHA-256
//! becomes the invoice's description hash, so a paid invoice cannot be
//! replayed as proof of payment for someone else.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tollgate_core::Identity;

/// LNURL `tag` for pay requests.
pub const PAY_REQUEST_TAG: &str = "payRequest";

const STATUS_OK: &str = "OK";
const STATUS_ERROR: &str = "ERROR";

/// First LNURL step: what the wallet may pay and where to ask for the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayParams {
    pub status: String,
    pub callback: String,
    pub min_sendable: u64,
    pub max_sendable: u64,
    /// JSON-encoded metadata array, as a string.
    pub metadata: String,
    pub tag: String,
}

/// Second LNURL step: the payable invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayValues {
    pub status: String,
    /// BOLT 11 payment request.
    pub pr: String,
    pub routes: Vec<serde_json::Value>,
    pub disposable: bool,
    pub success_action: SuccessAction,
}

/// Message shown by the wallet after paying (LUD-09 `message` action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessAction {
    pub tag: String,
    pub message: String,
}

impl SuccessAction {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            tag: "message".to_string(),
            message: message.into(),
        }
    }
}

/// Either LNURL step, serialized without a wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LnurlResponse {
    Params(PayParams),
    Invoice(PayValues),
}

/// LNURL error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub reason: String,
}

impl ErrorResponse {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            reason: reason.into(),
        }
    }
}

/// Answer to a registration status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStatus {
    pub success: bool,
    pub message: String,
}

impl RegistrationStatus {
    pub(crate) fn registered(at: i64) -> Self {
        Self {
            success: true,
            message: format!("pubkey registered at timestamp {at}"),
        }
    }

    pub(crate) fn not_registered() -> Self {
        Self {
            success: false,
            message: "pubkey is not registered".to_string(),
        }
    }

    pub(crate) fn invalid_pubkey() -> Self {
        Self {
            success: false,
            message: "invalid pubkey".to_string(),
        }
    }
}

/// The metadata blob for registering `identity`.
pub fn registration_metadata(identity: &Identity) -> String {
    let entries = [["text/plain".to_string(), format!("registration for pubkey {identity}")]];
    serde_json::to_string(&entries).unwrap_or_default()
}

/// SHA-256 of the exact metadata bytes.
pub fn description_hash(metadata: &str) -> [u8; 32] {
    Sha256::digest(metadata.as_bytes()).into()
}

/// Where the wallet fetches the invoice for `identity`.
pub fn callback_url(domain: &str, identity: &Identity) -> String {
    format!("https://{domain}/.well-known/lnurlp/{identity}")
}

impl PayParams {
    /// Fixed-amount pay parameters for registering `identity`.
    pub fn for_registration(domain: &str, identity: &Identity, price_msat: u64) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            callback: callback_url(domain, identity),
            min_sendable: price_msat,
            max_sendable: price_msat,
            metadata: registration_metadata(identity),
            tag: PAY_REQUEST_TAG.to_string(),
        }
    }
}

impl PayValues {
    /// A single-use invoice response for `identity`.
    pub fn for_registration(identity: &Identity, payment_request: String) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            pr: payment_request,
            routes: Vec::new(),
            disposable: true,
            success_action: SuccessAction::message(format!("identity {identity} registered!")),
        }
    }
}
