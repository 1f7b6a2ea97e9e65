//! `scriptdepot` request authentication.
//!
//! Every mutating request carries an HMAC-SHA256 signature over
//! `body || decimal(timestamp)` made with a shared secret, plus the
//! timestamp itself. The server re-derives the MAC, compares it in
//! constant time and rejects requests outside the replay window.
//!
//! ## Pieces
//!
//! - [`sign`] / [`Signer`]: pure signature construction (client side)
//! - [`Verifier`]: signature and freshness checks (server side)
//! - [`Access`]: per-operation policy, enumerable and testable
//! - [`Verified`] / [`Fresh`]: proof tokens that only the verifier can mint;
//!   writes require [`Fresh`]

pub mod error;
pub mod policy;
pub mod signer;
pub mod verifier;

pub use error::AuthError;
pub use policy::Access;
pub use signer::{Signer, sign};
pub use verifier::{AuthConfig, DEFAULT_REPLAY_WINDOW_MS, Fresh, Verified, Verifier};
