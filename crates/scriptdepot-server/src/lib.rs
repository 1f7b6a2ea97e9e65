//! scriptdepot server library.
//!
//! Signed script-management API over a `SQLite` store, with point-in-time
//! project snapshots and additive restore.
//!
//! Layers, leaves first:
//! - [`storage`]: `SQLite` persistence, implementing [`store::ScriptStore`]
//! - [`backup`]: snapshot and restore engines, written against the trait
//! - [`service`]: the eight tools; reads take a [`scriptdepot_auth::Verified`] proof, writes a [`scriptdepot_auth::Fresh`] one
//! - [`http`]: axum routes and tower layers

pub mod backup;
pub mod error;
pub mod http;
pub mod locks;
pub mod model;
pub mod service;
pub mod storage;
pub mod store;
pub mod validate;


pub use error::{DepotError, DepotResult};
pub use http::{AppState, RouterConfig, build_router};
pub use service::ToolService;
pub use storage::DepotDatabase;
