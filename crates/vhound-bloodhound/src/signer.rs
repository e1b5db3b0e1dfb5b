//! Chained-HMAC request signing.
//!
//! Every API request carries three headers derived from the token secret:
//! an `Authorization` header naming the token id, the request timestamp,
//! and a signature computed by a three-link HMAC-SHA256 chain where each
//! link keys the next:
//!
//! 1. operation key: HMAC over `METHOD` + request path, keyed by the secret;
//! 2. date key: HMAC over the timestamp truncated to hour precision (first
//!    13 characters of RFC 3339), keyed by link 1 — a signature stays valid
//!    within the clock hour without embedding the exact second;
//! 3. body digest: HMAC over the raw body bytes (empty for bodyless
//!    requests), keyed by link 2.
//!
//! The final digest is base64-encoded into the `Signature` header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{BloodHoundError, BloodHoundResult};

type HmacSha256 = Hmac<Sha256>;

/// Scheme name carried in the `Authorization` header.
const AUTH_SCHEME: &str = "bhesignature";

/// Length of the hour-precision timestamp prefix, `YYYY-MM-DDTHH`.
const DATE_KEY_LEN: usize = 13;

/// The three headers attached to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `bhesignature {token_id}`.
    pub authorization: String,
    /// Full RFC 3339 request timestamp.
    pub request_date: String,
    /// Base64 of the final chain digest.
    pub signature: String,
}

/// Signs API requests with a token id / token secret pair.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    token_id: String,
    token_secret: String,
}

impl RequestSigner {
    pub fn new(token_id: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            token_secret: token_secret.into(),
        }
    }

    /// Sign a request happening now.
    pub fn sign(&self, method: &str, uri: &str, body: &[u8]) -> BloodHoundResult<SignedHeaders> {
        self.sign_at(Utc::now(), method, uri, body)
    }

    /// Sign a request with an explicit timestamp. `uri` is the request path
    /// including any query string, exactly as sent on the wire.
    pub fn sign_at(
        &self,
        at: DateTime<Utc>,
        method: &str,
        uri: &str,
        body: &[u8],
    ) -> BloodHoundResult<SignedHeaders> {
        let request_date = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        if request_date.len() < DATE_KEY_LEN {
            return Err(BloodHoundError::signing(format!(
                "timestamp '{request_date}' shorter than the {DATE_KEY_LEN}-character date key"
            )));
        }

        let operation_key = digest(
            self.token_secret.as_bytes(),
            format!("{method}{uri}").as_bytes(),
        )?;
        let date_key = digest(&operation_key, request_date[..DATE_KEY_LEN].as_bytes())?;
        let body_digest = digest(&date_key, body)?;

        Ok(SignedHeaders {
            authorization: format!("{AUTH_SCHEME} {}", self.token_id),
            request_date,
            signature: STANDARD.encode(body_digest),
        })
    }
}

fn digest(key: &[u8], message: &[u8]) -> BloodHoundResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| BloodHoundError::signing(err.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
