//! Per-subtree content aggregation.
//!
//! # Responsibility
//! - Count distinct tagged content per content type over one topic's full
//!   active subtree.
//!
//! Counts back the admin "delete or move?" decision screen, so they must
//! reflect committed state at call time; nothing here is cached.

use crate::model::topic::{SubtreeCounts, TopicId};
use crate::model::ContentType;
use crate::query::closure::{active_subtree, SubtreeNode};
use crate::repo::topic_repo::{resolve_key, TopicRepoError, TopicRepoResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// Computes per-content-type distinct counts over the subtree of
/// `topic_id`.
///
/// Fails with `TopicNotFound` when the topic is missing or inactive.
pub fn subtree_counts(conn: &Connection, topic_id: TopicId) -> TopicRepoResult<SubtreeCounts> {
    let key = resolve_key(conn, topic_id, false)?
        .ok_or(TopicRepoError::TopicNotFound(topic_id))?;
    let subtree = active_subtree(conn, key, topic_id)?;

    Ok(SubtreeCounts {
        questions: count_for_type(conn, ContentType::Question, &subtree)?,
        handouts: count_for_type(conn, ContentType::Handout, &subtree)?,
        video_lessons: count_for_type(conn, ContentType::VideoLesson, &subtree)?,
        exercise_lists: count_for_type(conn, ContentType::ExerciseList, &subtree)?,
    })
}

fn count_for_type(
    conn: &Connection,
    content_type: ContentType,
    subtree: &[SubtreeNode],
) -> TopicRepoResult<u64> {
    if subtree.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; subtree.len()].join(", ");
    let bind_values: Vec<Value> = subtree
        .iter()
        .map(|node| Value::Integer(node.key))
        .collect();
    let count: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(DISTINCT content_id)
             FROM {}
             WHERE topic_id IN ({placeholders});",
            content_type.junction_table()
        ),
        params_from_iter(bind_values),
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}
