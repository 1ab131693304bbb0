//! Topic hierarchy use-case service.
//!
//! # Responsibility
//! - Validate tree invariants above the repository layer.
//! - Provide create, rename, partial update, reparent, list, and
//!   policy-based delete operations.
//!
//! # Invariants
//! - A parent reference must point at an active topic.
//! - Reparent operations must not create parent-child cycles.
//! - Deleting a topic with active children requires an explicit policy
//!   choice by the caller.

use crate::model::topic::{normalize_topic_name, TopicId, TopicValidationError};
use crate::model::Topic;
use crate::repo::topic_repo::{
    normalize_page_size, TopicListQuery, TopicRepoError, TopicRepository,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Delete policy for topics with children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicDeleteMode {
    /// Soft-delete the topic and its entire subtree.
    Cascade,
    /// Soft-delete only the topic; splice children up to its own parent.
    ReparentChildren,
}

/// Errors from topic service operations.
#[derive(Debug)]
pub enum TopicServiceError {
    /// Topic name is blank after trim.
    InvalidName,
    /// Target topic does not exist or is inactive.
    NotFound(TopicId),
    /// Referenced parent does not exist or is inactive.
    ParentNotFound(TopicId),
    /// Reparent target is the topic itself or one of its descendants.
    InvalidMove {
        topic_id: TopicId,
        parent_id: TopicId,
    },
    /// Delete attempted without a policy while active children exist.
    ChildrenExist(TopicId),
    /// Repository-level failure.
    Repo(TopicRepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for TopicServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "topic name must not be blank"),
            Self::NotFound(id) => write!(f, "topic not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent topic not found: {id}"),
            Self::InvalidMove {
                topic_id,
                parent_id,
            } => write!(
                f,
                "move would create cycle: topic {topic_id} under parent {parent_id}"
            ),
            Self::ChildrenExist(id) => write!(
                f,
                "topic {id} has children; delete requires an explicit policy"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent topic state: {details}"),
        }
    }
}

impl Error for TopicServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TopicRepoError> for TopicServiceError {
    fn from(value: TopicRepoError) -> Self {
        match value {
            TopicRepoError::TopicNotFound(id) => Self::NotFound(id),
            TopicRepoError::ParentNotFound(id) => Self::ParentNotFound(id),
            TopicRepoError::InvalidMove {
                topic_id,
                parent_id,
            } => Self::InvalidMove {
                topic_id,
                parent_id,
            },
            other => Self::Repo(other),
        }
    }
}

impl From<TopicValidationError> for TopicServiceError {
    fn from(_: TopicValidationError) -> Self {
        Self::InvalidName
    }
}

/// Partial update payload. Outer `None` leaves the field unchanged;
/// `description: Some(None)` clears it; `parent_id: Some(None)` moves the
/// topic to root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<TopicId>>,
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicListResult {
    /// List items sorted by `name COLLATE NOCASE ASC, external_id ASC`.
    pub items: Vec<Topic>,
    /// Effective normalized page size used by the query.
    pub applied_page_size: u32,
}

/// Topic service facade over repository implementations.
pub struct TopicService<R: TopicRepository> {
    repo: R,
}

impl<R: TopicRepository> TopicService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one topic under an optional parent.
    pub fn create_topic(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        parent_id: Option<TopicId>,
    ) -> Result<Topic, TopicServiceError> {
        let normalized = normalize_topic_name(&name.into())?;
        let topic = self
            .repo
            .create_topic(normalized.as_str(), description.as_deref(), parent_id)?;
        info!(
            "event=topic_create module=service status=ok topic_id={} parent_id={}",
            topic.external_id,
            parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
        );
        Ok(topic)
    }

    /// Loads one active topic by external id.
    pub fn get_topic(&self, topic_id: TopicId) -> Result<Topic, TopicServiceError> {
        self.repo
            .get_topic(topic_id, false)?
            .ok_or(TopicServiceError::NotFound(topic_id))
    }

    /// Lists topics by filter + pagination.
    pub fn list_topics(
        &self,
        query: &TopicListQuery,
    ) -> Result<TopicListResult, TopicServiceError> {
        let items = self.repo.list_topics(query)?;
        Ok(TopicListResult {
            items,
            applied_page_size: normalize_page_size(query.page_size),
        })
    }

    /// Renames one topic; re-validates the name.
    pub fn rename_topic(
        &self,
        topic_id: TopicId,
        name: impl Into<String>,
    ) -> Result<Topic, TopicServiceError> {
        let normalized = normalize_topic_name(&name.into())?;
        self.repo
            .update_topic_fields(topic_id, Some(normalized.as_str()), None)?;
        self.read_back(topic_id)
    }

    /// Applies a partial update. A parent change routes through the
    /// reparent path, never a raw field write.
    ///
    /// The reparent leg runs first: it validates the cycle invariant
    /// inside its own transaction, so a rejected move aborts the whole
    /// update before any field write is committed.
    pub fn update_topic(
        &self,
        topic_id: TopicId,
        update: TopicUpdate,
    ) -> Result<Topic, TopicServiceError> {
        let normalized = match update.name {
            Some(name) => Some(normalize_topic_name(&name)?),
            None => None,
        };

        if let Some(new_parent_id) = update.parent_id {
            self.reparent_topic(topic_id, new_parent_id)?;
        }

        self.repo.update_topic_fields(
            topic_id,
            normalized.as_deref(),
            update
                .description
                .as_ref()
                .map(|description| description.as_deref()),
        )?;

        self.read_back(topic_id)
    }

    /// Moves one topic under a new parent, or to root with `None`.
    pub fn reparent_topic(
        &self,
        topic_id: TopicId,
        new_parent_id: Option<TopicId>,
    ) -> Result<(), TopicServiceError> {
        if new_parent_id == Some(topic_id) {
            return Err(TopicServiceError::InvalidMove {
                topic_id,
                parent_id: topic_id,
            });
        }

        self.repo.reparent_topic(topic_id, new_parent_id)?;
        info!(
            "event=topic_reparent module=service status=ok topic_id={} parent_id={}",
            topic_id,
            new_parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
        );
        Ok(())
    }

    /// Returns whether the topic has any active children. Callers should
    /// probe this before delete to decide whether a policy prompt is
    /// needed.
    pub fn children_exist(&self, topic_id: TopicId) -> Result<bool, TopicServiceError> {
        self.repo.children_exist(topic_id).map_err(Into::into)
    }

    /// Soft-deletes one topic.
    ///
    /// When the topic has active children, `mode` is mandatory and picks
    /// between cascade and splice semantics. A childless topic needs no
    /// mode; both policies degenerate to a single-row soft delete.
    pub fn delete_topic(
        &self,
        topic_id: TopicId,
        mode: Option<TopicDeleteMode>,
    ) -> Result<(), TopicServiceError> {
        self.repo
            .get_topic(topic_id, false)?
            .ok_or(TopicServiceError::NotFound(topic_id))?;

        let has_children = self.repo.children_exist(topic_id)?;
        let mode = match (mode, has_children) {
            (None, true) => return Err(TopicServiceError::ChildrenExist(topic_id)),
            (None, false) => TopicDeleteMode::Cascade,
            (Some(mode), _) => mode,
        };

        match mode {
            TopicDeleteMode::Cascade => self.repo.delete_cascade(topic_id)?,
            TopicDeleteMode::ReparentChildren => self.repo.delete_reparent_children(topic_id)?,
        }
        info!(
            "event=topic_delete module=service status=ok topic_id={} mode={}",
            topic_id,
            match mode {
                TopicDeleteMode::Cascade => "cascade",
                TopicDeleteMode::ReparentChildren => "reparent",
            }
        );
        Ok(())
    }

    fn read_back(&self, topic_id: TopicId) -> Result<Topic, TopicServiceError> {
        self.repo
            .get_topic(topic_id, false)?
            .ok_or(TopicServiceError::InconsistentState(
                "updated topic not found in read-back",
            ))
    }
}
