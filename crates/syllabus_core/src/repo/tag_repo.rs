//! Content/topic tagging repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Own the many-to-many association between content items and topics.
//! - Provide wholesale tag replacement (`set_topics`) with atomic
//!   semantics, one junction table per content type.
//!
//! # Invariants
//! - `set_topics` replaces the whole topic set in a single transaction;
//!   calling it twice with the same set is a no-op.
//! - Tags bind a content item to one topic node directly; descendant
//!   expansion happens only in the query engine.
//! - Inverse lookups return active topics only, ordered by name.

use crate::model::topic::{ContentId, ContentType, TopicId};
use crate::model::Topic;
use crate::repo::topic_repo::{
    parse_uuid, resolve_key, table_exists, table_has_column, SqliteTopicRepository,
    TopicRepoError, TopicRepoResult, TopicRepository,
};
use rusqlite::{params, Connection, TransactionBehavior};

/// Repository interface for content tagging operations.
pub trait TagRepository {
    /// Replaces all topics associated with one content item in one
    /// transaction. Topic resolution accepts inactive topics (the
    /// foreign-key analog); unknown ids fail with `TopicNotFound`.
    fn set_topics(
        &mut self,
        content_type: ContentType,
        content_id: ContentId,
        topic_ids: &[TopicId],
    ) -> TopicRepoResult<()>;
    /// Returns the active topics tagged on one content item, ordered by
    /// `name COLLATE NOCASE ASC`.
    fn topics_for_content(
        &self,
        content_type: ContentType,
        content_id: ContentId,
    ) -> TopicRepoResult<Vec<Topic>>;
}

/// SQLite-backed content tagging repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> TopicRepoResult<Self> {
        let _ = SqliteTopicRepository::try_new(conn)?;
        ensure_tag_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn set_topics(
        &mut self,
        content_type: ContentType,
        content_id: ContentId,
        topic_ids: &[TopicId],
    ) -> TopicRepoResult<()> {
        let table = content_type.junction_table();
        let content_id_text = content_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut topic_keys = Vec::with_capacity(topic_ids.len());
        for topic_id in topic_ids {
            let key = resolve_key(&tx, *topic_id, true)?
                .ok_or(TopicRepoError::TopicNotFound(*topic_id))?;
            topic_keys.push(key);
        }

        tx.execute(
            &format!("DELETE FROM {table} WHERE content_id = ?1;"),
            [content_id_text.as_str()],
        )?;

        for key in topic_keys {
            tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO {table} (content_id, topic_id)
                     VALUES (?1, ?2);"
                ),
                params![content_id_text.as_str(), key],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn topics_for_content(
        &self,
        content_type: ContentType,
        content_id: ContentId,
    ) -> TopicRepoResult<Vec<Topic>> {
        let repo = SqliteTopicRepository::try_new(self.conn)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT t.external_id
             FROM {} links
             INNER JOIN topics t ON t.id = links.topic_id
             WHERE links.content_id = ?1
               AND t.is_active = 1
             ORDER BY t.name COLLATE NOCASE ASC, t.external_id ASC;",
            content_type.junction_table()
        ))?;

        let mut rows = stmt.query([content_id.to_string()])?;
        let mut topics = Vec::new();
        while let Some(row) = rows.next()? {
            let external_id_text: String = row.get(0)?;
            let external_id = parse_uuid(&external_id_text, "topics.external_id")?;
            let topic = repo
                .get_topic(external_id, false)?
                .ok_or(TopicRepoError::TopicNotFound(external_id))?;
            topics.push(topic);
        }
        Ok(topics)
    }
}

fn ensure_tag_connection_ready(conn: &Connection) -> TopicRepoResult<()> {
    for content_type in ContentType::ALL {
        let table = content_type.junction_table();
        if !table_exists(conn, table)? {
            return Err(TopicRepoError::MissingRequiredTable(table));
        }
        for column in ["content_id", "topic_id"] {
            if !table_has_column(conn, table, column)? {
                return Err(TopicRepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}
