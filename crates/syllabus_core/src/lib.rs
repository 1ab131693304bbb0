//! Core domain logic for the syllabus topic hierarchy.
//! This crate is the single source of truth for tree invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::topic::{
    normalize_topic_name, ContentId, ContentType, SubtreeCounts, Topic, TopicId,
    TopicValidationError,
};
pub use query::closure::{
    content_under_topic, content_under_topics, descendant_ids, MAX_SUBTREE_DEPTH,
};
pub use query::counts::subtree_counts;
pub use repo::tag_repo::{SqliteTagRepository, TagRepository};
pub use repo::topic_repo::{
    normalize_page_size, ParentFilter, SqliteTopicRepository, TopicListQuery, TopicRepoError,
    TopicRepoResult, TopicRepository,
};
pub use service::tagging_service::{normalize_topic_ids, TaggingService, TaggingServiceError};
pub use service::topic_service::{
    TopicDeleteMode, TopicListResult, TopicService, TopicServiceError, TopicUpdate,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
