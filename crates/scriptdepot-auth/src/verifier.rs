//! Signature verification and replay protection.

use std::fmt;
use std::ops::Deref;

use hmac::Mac;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::AuthError;
use crate::policy::Access;
use crate::signer::{mac_over, now_millis};

/// Default replay window: five minutes.
pub const DEFAULT_REPLAY_WINDOW_MS: u64 = 300_000;

/// Verifier configuration, injected at construction.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Vec<u8>,
    /// Maximum tolerated `|now - timestamp|` in milliseconds.
    pub replay_window_ms: u64,
}

impl AuthConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            replay_window_ms: DEFAULT_REPLAY_WINDOW_MS,
        }
    }

    #[must_use]
    pub const fn with_replay_window_ms(mut self, window: u64) -> Self {
        self.replay_window_ms = window;
        self
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("replay_window_ms", &self.replay_window_ms)
            .finish()
    }
}

/// Proof that a request passed the access check for its operation.
///
/// Only [`Verifier::authorize`] can construct one, so any function taking
/// `&Verified` cannot be reached without going through the verifier. It may
/// have been minted under [`Access::Open`]; writes take [`Fresh`] instead.
#[derive(Debug, Clone, Copy)]
pub struct Verified {
    access: Access,
}

impl Verified {
    /// The policy this proof was minted under.
    pub const fn access(&self) -> Access {
        self.access
    }
}

/// Proof that a request carried a valid signature and an in-window timestamp.
///
/// Minted only by [`Verifier::authorize_fresh`]. Derefs to [`Verified`] so a
/// fresh proof also satisfies every read.
#[derive(Debug, Clone, Copy)]
pub struct Fresh {
    verified: Verified,
}

impl Deref for Fresh {
    type Target = Verified;

    fn deref(&self) -> &Verified {
        &self.verified
    }
}

/// Stateless request verifier. Safe to share across tasks.
#[derive(Debug, Clone)]
pub struct Verifier {
    config: AuthConfig,
}

impl Verifier {
    pub const fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub const fn replay_window_ms(&self) -> u64 {
        self.config.replay_window_ms
    }

    /// Check `signature` over `body` and the optional `timestamp` header.
    ///
    /// With no timestamp the freshness check is skipped and the MAC covers
    /// the body alone. Only [`Access::Signed`] endpoints accept that.
    pub fn verify(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now_ms: i64,
    ) -> Result<(), AuthError> {
        let signature = match signature.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Err(AuthError::MissingSignature),
        };

        let suffix = match timestamp.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => {
                let ts: i64 = raw.parse().map_err(|_| AuthError::TimestampExpired)?;
                if now_ms.abs_diff(ts) > self.config.replay_window_ms {
                    debug!(ts, now_ms, "Timestamp outside replay window");
                    return Err(AuthError::TimestampExpired);
                }
                // Only the canonical decimal spelling is signed, so `+1`, `01`
                // and `1` cannot share one signature.
                let canonical = ts.to_string();
                if canonical != raw {
                    debug!(raw, "Timestamp not in canonical decimal form");
                    return Err(AuthError::TimestampExpired);
                }
                canonical
            }
            None => String::new(),
        };

        let provided = hex::decode(signature).map_err(|_| AuthError::InvalidSignature)?;
        let expected = mac_over(&self.config.secret, body, &suffix)
            .finalize()
            .into_bytes();

        // ct_eq on slices of different length returns false without comparing.
        if bool::from(expected.as_slice().ct_eq(&provided)) {
            Ok(())
        } else {
            Err(AuthError::InvalidSignature)
        }
    }

    /// Like [`verify`](Self::verify) but a timestamp is mandatory.
    pub fn verify_fresh(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now_ms: i64,
    ) -> Result<(), AuthError> {
        if signature.is_none_or(|s| s.trim().is_empty()) {
            return Err(AuthError::MissingSignature);
        }
        if timestamp.is_none_or(|t| t.trim().is_empty()) {
            return Err(AuthError::MissingTimestamp);
        }
        self.verify(body, timestamp, signature, now_ms)
    }

    /// Apply `access` to a request and mint a [`Verified`] proof.
    pub fn authorize(
        &self,
        access: Access,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> Result<Verified, AuthError> {
        self.authorize_at(access, body, timestamp, signature, now_millis())
    }

    /// [`authorize`](Self::authorize) with an explicit clock.
    pub fn authorize_at(
        &self,
        access: Access,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now_ms: i64,
    ) -> Result<Verified, AuthError> {
        match access {
            Access::Open => {}
            Access::Signed => self.verify(body, timestamp, signature, now_ms)?,
            Access::SignedFresh => self.verify_fresh(body, timestamp, signature, now_ms)?,
        }
        Ok(Verified { access })
    }

    /// Require a signature and a fresh timestamp, and mint a [`Fresh`] proof.
    pub fn authorize_fresh(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> Result<Fresh, AuthError> {
        self.authorize_fresh_at(body, timestamp, signature, now_millis())
    }

    /// [`authorize_fresh`](Self::authorize_fresh) with an explicit clock.
    pub fn authorize_fresh_at(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now_ms: i64,
    ) -> Result<Fresh, AuthError> {
        let verified =
            self.authorize_at(Access::SignedFresh, body, timestamp, signature, now_ms)?;
        Ok(Fresh { verified })
    }
}


#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use super::*;
    use crate::signer::sign;

    const WINDOW: u64 = DEFAULT_REPLAY_WINDOW_MS;

    fn secret_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..64)
    }

    fn body_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..512)
    }

    // Keeps `ts +/- offset` clear of overflow.
    fn timestamp_strategy() -> impl Strategy<Value = i64> {
        -(1_i64 << 50)..(1_i64 << 50)
    }

    proptest! {
        #[test]
        fn signature_verifies_at_signing_time(
            secret in secret_strategy(),
            body in body_strategy(),
            ts in timestamp_strategy(),
        ) {
            let v = Verifier::new(AuthConfig::new(secret.clone()));
            let sig = sign(&secret, &body, ts);
            let raw = ts.to_string();
            prop_assert_eq!(v.verify(&body, Some(&raw), Some(&sig), ts), Ok(()));
        }

        #[test]
        fn any_other_signature_is_invalid(
            secret in secret_strategy(),
            body in body_strategy(),
            ts in timestamp_strategy(),
            forged in prop::collection::vec(any::<u8>(), 0..48),
        ) {
            let v = Verifier::new(AuthConfig::new(secret.clone()));
            let genuine = sign(&secret, &body, ts);
            let forged = hex::encode(forged);
            prop_assume!(forged != genuine && !forged.is_empty());
            let raw = ts.to_string();
            prop_assert_eq!(
                v.verify(&body, Some(&raw), Some(&forged), ts),
                Err(AuthError::InvalidSignature)
            );
        }

        #[test]
        fn single_flipped_bit_is_invalid(
            secret in secret_strategy(),
            body in body_strategy(),
            ts in timestamp_strategy(),
            bit in 0_usize..256,
        ) {
            let v = Verifier::new(AuthConfig::new(secret.clone()));
            let mut mac = hex::decode(sign(&secret, &body, ts)).unwrap();
            mac[bit / 8] ^= 1 << (bit % 8);
            let raw = ts.to_string();
            prop_assert_eq!(
                v.verify(&body, Some(&raw), Some(&hex::encode(mac)), ts),
                Err(AuthError::InvalidSignature)
            );
        }

        #[test]
        fn outside_window_is_expired(
            secret in secret_strategy(),
            body in body_strategy(),
            ts in timestamp_strategy(),
            excess in 1_u64..(1_u64 << 40),
            later in any::<bool>(),
        ) {
            let v = Verifier::new(AuthConfig::new(secret.clone()));
            let sig = sign(&secret, &body, ts);
            #[allow(clippy::cast_possible_wrap)]
            let offset = (WINDOW + excess) as i64;
            let now = if later { ts + offset } else { ts - offset };
            let raw = ts.to_string();
            prop_assert_eq!(
                v.verify(&body, Some(&raw), Some(&sig), now),
                Err(AuthError::TimestampExpired)
            );
        }

        #[test]
        fn inside_window_is_accepted(
            body in body_strategy(),
            ts in timestamp_strategy(),
            drift in -300_000_i64..=300_000,
        ) {
            let secret = b"0123456789abcdef";
            let v = Verifier::new(AuthConfig::new(&secret[..]));
            let sig = sign(secret, &body, ts);
            let raw = ts.to_string();
            prop_assert_eq!(v.verify(&body, Some(&raw), Some(&sig), ts + drift), Ok(()));
        }
    }
}
