//! Read-path query engine for the topic hierarchy.
//!
//! # Responsibility
//! - Compute descendant closures and descendant-aware content filters.
//! - Aggregate per-subtree content counts.
//!
//! # Invariants
//! - Closures are recomputed from current state on every call; there is
//!   no engine-level cache, so reads always observe committed edits.
//! - Traversal is capped at 64 levels as a safety net against a corrupted
//!   parent graph; hitting the cap is a data-integrity error, never a
//!   silent truncation.

pub mod closure;
pub mod counts;
