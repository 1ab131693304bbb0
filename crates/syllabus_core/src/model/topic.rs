//! Topic domain model.
//!
//! # Responsibility
//! - Define the canonical topic record and content-type projections.
//! - Provide name validation shared by every write path.
//!
//! # Invariants
//! - `external_id` is stable and never reused for another topic.
//! - The internal storage key is never exposed outside the repository layer.
//! - `is_active` is the source of truth for soft-delete state.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable externally-exposed topic identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
/// Internal integer keys stay private to the repository layer, so their
/// representation can change without breaking external clients.
pub type TopicId = Uuid;

/// Opaque identifier of a content item owned by an external content
/// repository (question, handout, video lesson, exercise list).
pub type ContentId = Uuid;

/// Content-type projection sharing the topic tagging mechanism.
///
/// Each variant maps to its own junction table; the tables are independent
/// so content ids only need to be unique within one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Exam/exercise question bank item.
    Question,
    /// Downloadable handout document.
    Handout,
    /// Recorded video lesson.
    VideoLesson,
    /// Curated exercise list.
    ExerciseList,
}

impl ContentType {
    /// All content types, in stable declaration order.
    pub const ALL: [ContentType; 4] = [
        ContentType::Question,
        ContentType::Handout,
        ContentType::VideoLesson,
        ContentType::ExerciseList,
    ];

    /// Stable lowercase name used in logs and external parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Question => "question",
            ContentType::Handout => "handout",
            ContentType::VideoLesson => "video_lesson",
            ContentType::ExerciseList => "exercise_list",
        }
    }

    /// Junction table backing this content type.
    pub(crate) fn junction_table(self) -> &'static str {
        match self {
            ContentType::Question => "question_topics",
            ContentType::Handout => "handout_topics",
            ContentType::VideoLesson => "video_lesson_topics",
            ContentType::ExerciseList => "exercise_list_topics",
        }
    }
}

/// Topic read model.
///
/// The parent reference is resolved to the parent's external id so callers
/// never see internal storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Stable external id used for linking and auditing.
    pub external_id: TopicId,
    /// User-facing category name. Required, non-blank.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// External id of the parent topic. `None` means root.
    pub parent_id: Option<TopicId>,
    /// Soft delete flag; inactive topics are invisible to read paths.
    pub is_active: bool,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Topic {
    /// Returns whether this topic is visible to read paths.
    pub fn is_visible(&self) -> bool {
        self.is_active
    }
}

/// Per-content-type counts over one topic's full subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeCounts {
    /// Distinct questions tagged anywhere in the subtree.
    pub questions: u64,
    /// Distinct handouts tagged anywhere in the subtree.
    pub handouts: u64,
    /// Distinct video lessons tagged anywhere in the subtree.
    pub video_lessons: u64,
    /// Distinct exercise lists tagged anywhere in the subtree.
    pub exercise_lists: u64,
}

impl SubtreeCounts {
    /// Total tagged content items across all four types.
    pub fn total(&self) -> u64 {
        self.questions + self.handouts + self.video_lessons + self.exercise_lists
    }
}

/// Validation error for topic input fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicValidationError {
    /// Name is blank after trimming.
    EmptyName,
}

impl Display for TopicValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "topic name must not be blank"),
        }
    }
}

impl Error for TopicValidationError {}

/// Normalizes a topic name according to the write-path contract.
///
/// Returns the trimmed name, or `EmptyName` when nothing remains.
pub fn normalize_topic_name(value: &str) -> Result<String, TopicValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TopicValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
