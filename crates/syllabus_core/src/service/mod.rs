//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep admin-API layers decoupled from storage details.

pub mod tagging_service;
pub mod topic_service;
