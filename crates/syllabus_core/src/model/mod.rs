//! Domain model for the topic hierarchy.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one topic-centric shape shared by all content-type projections.
//!
//! # Invariants
//! - Every topic is identified by a stable external `TopicId`.
//! - Deletion is represented by soft-delete flags, not hard delete.

pub mod topic;

pub use topic::{ContentType, Topic};
