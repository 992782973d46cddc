//! Domain model for tracked study resources.
//!
//! # Responsibility
//! - Define the entity records shared by local and remote persistence.
//! - Define submitted-field drafts and their validation rules.
//!
//! # Invariants
//! - Every persisted record is identified by a stable `EntityId`.
//! - Session lifecycle only moves forward: `planned -> inprogress -> completed`.

pub mod book;
pub mod entity;
pub mod note;
pub mod session;
pub mod timer;
