//! Content tagging use-case service.
//!
//! # Responsibility
//! - Normalize tag input (deduplication) before wholesale replacement.
//! - Provide the inverse topic lookup used for content tag chips.
//!
//! # Invariants
//! - `set_topics` is idempotent; replaying the same set changes nothing.
//! - Read-back returns active topics only, ordered by name.

use crate::model::topic::{ContentId, ContentType, TopicId};
use crate::model::Topic;
use crate::repo::tag_repo::TagRepository;
use crate::repo::topic_repo::TopicRepoError;
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from tagging service operations.
#[derive(Debug)]
pub enum TaggingServiceError {
    /// Supplied topic id does not exist.
    TopicNotFound(TopicId),
    /// Persistence-layer failure.
    Repo(TopicRepoError),
}

impl Display for TaggingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TopicNotFound(id) => write!(f, "topic not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaggingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::TopicNotFound(_) => None,
        }
    }
}

impl From<TopicRepoError> for TaggingServiceError {
    fn from(value: TopicRepoError) -> Self {
        match value {
            TopicRepoError::TopicNotFound(id) => Self::TopicNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Deduplicates topic ids, returning them sorted.
pub fn normalize_topic_ids(topic_ids: &[TopicId]) -> Vec<TopicId> {
    let unique: BTreeSet<TopicId> = topic_ids.iter().copied().collect();
    unique.into_iter().collect()
}

/// Tagging service facade over repository implementations.
pub struct TaggingService<R: TagRepository> {
    repo: R,
}

impl<R: TagRepository> TaggingService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Replaces the topic set of one content item and returns the
    /// resulting active tag chips.
    pub fn set_topics(
        &mut self,
        content_type: ContentType,
        content_id: ContentId,
        topic_ids: &[TopicId],
    ) -> Result<Vec<Topic>, TaggingServiceError> {
        let normalized = normalize_topic_ids(topic_ids);
        self.repo
            .set_topics(content_type, content_id, &normalized)?;
        info!(
            "event=content_set_topics module=service status=ok content_type={} content_id={} topic_count={}",
            content_type.as_str(),
            content_id,
            normalized.len()
        );
        self.repo
            .topics_for_content(content_type, content_id)
            .map_err(Into::into)
    }

    /// Returns the active topics tagged on one content item.
    pub fn topics_for_content(
        &self,
        content_type: ContentType,
        content_id: ContentId,
    ) -> Result<Vec<Topic>, TaggingServiceError> {
        self.repo
            .topics_for_content(content_type, content_id)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_topic_ids;
    use uuid::Uuid;

    #[test]
    fn normalize_topic_ids_sorts_and_deduplicates() {
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);

        let normalized = normalize_topic_ids(&[high, low, high, low]);
        assert_eq!(normalized, vec![low, high]);
    }
}
