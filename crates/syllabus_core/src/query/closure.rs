//! Descendant-closure computation and content filtering.
//!
//! # Responsibility
//! - Expand one topic into its inclusive set of active descendants.
//! - Resolve "content under topic X" for every content type through one
//!   shared algorithm.
//!
//! # Invariants
//! - Closures traverse active topics only; soft-deleted subtrees are
//!   invisible to every caller.
//! - The closure always contains the starting topic itself.
//! - Traversal depth is capped at [`MAX_SUBTREE_DEPTH`]; exceeding it
//!   fails with `DepthCapExceeded` instead of looping forever.

use crate::model::topic::{ContentId, ContentType, TopicId};
use crate::repo::topic_repo::{
    parse_uuid, resolve_key, TopicKey, TopicRepoError, TopicRepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::BTreeSet;

/// Defensive traversal cap. Write-time cycle prevention keeps the tree
/// acyclic; this bound only guards reads against corrupted data.
pub const MAX_SUBTREE_DEPTH: u32 = 64;

/// One member of a topic's active subtree.
pub(crate) struct SubtreeNode {
    pub key: TopicKey,
    pub external_id: TopicId,
}

/// Computes the inclusive active subtree of `root_key`.
///
/// `root_id` is only used for error context. Returns an empty set when the
/// root itself is inactive or missing.
pub(crate) fn active_subtree(
    conn: &Connection,
    root_key: TopicKey,
    root_id: TopicId,
) -> TopicRepoResult<Vec<SubtreeNode>> {
    let mut stmt = conn.prepare(
        "WITH RECURSIVE subtree(id, external_id, depth) AS (
            SELECT id, external_id, 0
            FROM topics
            WHERE id = ?1
              AND is_active = 1
            UNION ALL
            SELECT child.id, child.external_id, parent.depth + 1
            FROM topics child
            INNER JOIN subtree parent ON child.parent_id = parent.id
            WHERE child.is_active = 1
              AND parent.depth < ?2
        )
        SELECT id, external_id, depth FROM subtree;",
    )?;

    let mut rows = stmt.query(params![root_key, MAX_SUBTREE_DEPTH])?;
    let mut nodes = Vec::new();
    while let Some(row) = rows.next()? {
        let depth: u32 = row.get(2)?;
        if depth >= MAX_SUBTREE_DEPTH {
            return Err(TopicRepoError::DepthCapExceeded {
                topic_id: root_id,
                max_depth: MAX_SUBTREE_DEPTH,
            });
        }
        let external_id_text: String = row.get(1)?;
        nodes.push(SubtreeNode {
            key: row.get(0)?,
            external_id: parse_uuid(&external_id_text, "topics.external_id")?,
        });
    }
    Ok(nodes)
}

/// Returns the external ids of `topic_id` and all its active descendants.
///
/// Fails with `TopicNotFound` when the topic is missing or inactive.
pub fn descendant_ids(conn: &Connection, topic_id: TopicId) -> TopicRepoResult<Vec<TopicId>> {
    let key = resolve_key(conn, topic_id, false)?
        .ok_or(TopicRepoError::TopicNotFound(topic_id))?;
    let subtree = active_subtree(conn, key, topic_id)?;
    Ok(subtree.into_iter().map(|node| node.external_id).collect())
}

/// Returns all content of one type tagged at `topic_id` or any active
/// descendant, deduplicated and sorted by content id.
///
/// This is the single shared filter algorithm for all four content types;
/// content listing callers must not re-implement descendant expansion.
pub fn content_under_topic(
    conn: &Connection,
    content_type: ContentType,
    topic_id: TopicId,
) -> TopicRepoResult<Vec<ContentId>> {
    let key = resolve_key(conn, topic_id, false)?
        .ok_or(TopicRepoError::TopicNotFound(topic_id))?;
    let subtree = active_subtree(conn, key, topic_id)?;
    content_for_keys(conn, content_type, &subtree)
}

/// Union of [`content_under_topic`] over several filter ids.
///
/// Unresolved (missing or inactive) ids contribute an empty set instead of
/// failing the whole listing; stale filter selections degrade gracefully.
pub fn content_under_topics(
    conn: &Connection,
    content_type: ContentType,
    topic_ids: &[TopicId],
) -> TopicRepoResult<Vec<ContentId>> {
    let mut union = BTreeSet::new();
    for topic_id in topic_ids {
        let Some(key) = resolve_key(conn, *topic_id, false)? else {
            continue;
        };
        let subtree = active_subtree(conn, key, *topic_id)?;
        union.extend(content_for_keys(conn, content_type, &subtree)?);
    }
    Ok(union.into_iter().collect())
}

fn content_for_keys(
    conn: &Connection,
    content_type: ContentType,
    subtree: &[SubtreeNode],
) -> TopicRepoResult<Vec<ContentId>> {
    if subtree.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; subtree.len()].join(", ");
    let bind_values: Vec<Value> = subtree
        .iter()
        .map(|node| Value::Integer(node.key))
        .collect();
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT content_id
         FROM {}
         WHERE topic_id IN ({placeholders})
         ORDER BY content_id ASC;",
        content_type.junction_table()
    ))?;

    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut content = Vec::new();
    while let Some(row) = rows.next()? {
        let content_id_text: String = row.get(0)?;
        content.push(parse_uuid(&content_id_text, "content_id")?);
    }
    Ok(content)
}
