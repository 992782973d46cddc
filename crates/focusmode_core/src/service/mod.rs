//! Use-case services that sit beside the entity controllers.
//!
//! # Responsibility
//! - Aggregate figures across collections without owning any of them.

pub mod stats;
