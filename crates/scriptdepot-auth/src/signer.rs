//! Signature construction.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Keyed MAC over `body || timestamp_suffix`.
pub(crate) fn mac_over(secret: &[u8], body: &[u8], timestamp_suffix: &str) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(body);
    mac.update(timestamp_suffix.as_bytes());
    mac
}

/// Sign `body` at `timestamp` (epoch milliseconds).
///
/// Returns `HMAC-SHA256(secret, body || decimal(timestamp))` as lowercase hex.
/// The caller must send exactly these `body` bytes.
pub fn sign(secret: &[u8], body: &[u8], timestamp: i64) -> String {
    let mac = mac_over(secret, body, &timestamp.to_string());
    hex::encode(mac.finalize().into_bytes())
}

/// Client-side signer holding the shared secret.
#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign `body` at an explicit timestamp.
    pub fn sign_at(&self, body: &[u8], timestamp: i64) -> String {
        sign(&self.secret, body, timestamp)
    }

    /// Sign `body` at the current wall-clock time.
    ///
    /// Returns `(timestamp, signature)`; both go on the wire.
    pub fn sign_now(&self, body: &[u8]) -> (i64, String) {
        let ts = now_millis();
        (ts, self.sign_at(body, ts))
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
