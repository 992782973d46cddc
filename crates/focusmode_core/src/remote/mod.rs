//! Remote FocusMode API access.
//!
//! # Responsibility
//! - Wrap authenticated JSON requests to the remote service.
//! - Translate HTTP failures into `RemoteError` values callers can classify.
//!
//! # Invariants
//! - Resource calls without a valid session fail with `AuthRequired` before
//!   any request is sent.
//! - Non-2xx answers never decode as success.

pub mod client;

pub use client::{ApiErrorBody, RemoteClient, RemoteError, RemoteResult};
