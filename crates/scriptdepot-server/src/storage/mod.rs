//! `SQLite` storage for scriptdepot.
//!
//! Provides persistence for scripts, project metadata and the snapshot index.

mod db;
mod models;
mod queries;
mod store_impl;

#[cfg(test)]
mod tests;

pub use db::{DatabaseError, DepotDatabase};
