//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Structural writes (reparent, both delete policies) run inside one
//!   immediate transaction; no partial tree state is ever committed.
//! - Repository APIs return semantic errors (`TopicNotFound`,
//!   `InvalidMove`) in addition to DB transport errors.

pub mod tag_repo;
pub mod topic_repo;
