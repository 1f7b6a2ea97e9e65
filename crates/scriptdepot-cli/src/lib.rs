//! `scriptdepot` client library.
//!
//! [`DepotClient`] talks to a running `scriptdepot-server`, signing each
//! request with the shared secret.

pub mod client;

pub use client::{ClientError, DepotClient};
