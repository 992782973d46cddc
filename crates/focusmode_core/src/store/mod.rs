//! On-device persistence.
//!
//! # Responsibility
//! - Keep named collections of JSON documents that survive restarts.
//! - Keep small settings values (the persisted auth session).
//!
//! # Invariants
//! - The store is schemaless; typed mapping lives in `repo::local_repo`.
//! - Documents created without an id receive a local UUID and `created_at`.

pub mod local_store;

pub use local_store::{Document, LocalStore, StoreError, StoreResult};
