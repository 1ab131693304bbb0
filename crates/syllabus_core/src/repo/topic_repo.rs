//! Topic store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for the topic hierarchy (CRUD + listing).
//! - Own the transactional structural writes: reparent and both delete
//!   policies.
//! - Keep SQL details and ordering behavior inside the repository boundary.
//!
//! # Invariants
//! - Only active (`is_active=1`) topics are returned by default.
//! - Listing is deterministic: `name COLLATE NOCASE ASC, external_id ASC`.
//! - Parent references are resolved to the parent's external id for output;
//!   internal integer keys never leave this module.
//! - Reparent re-checks descendant membership inside the write transaction,
//!   so a concurrent structural edit cannot slip a cycle in.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::topic::TopicId;
use crate::model::Topic;
use crate::query::closure::active_subtree;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use uuid::Uuid;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Internal storage key for a topic row. Never exposed to callers.
pub(crate) type TopicKey = i64;

pub(crate) const TOPICS_DEFAULT_PAGE_SIZE: u32 = 20;
pub(crate) const TOPICS_PAGE_SIZE_MAX: u32 = 100;

const TOPIC_SELECT_SQL: &str = "SELECT
    t.external_id AS external_id,
    t.name AS name,
    t.description AS description,
    p.external_id AS parent_external_id,
    t.is_active AS is_active,
    t.created_at AS created_at,
    t.updated_at AS updated_at
FROM topics t
LEFT JOIN topics p ON p.id = t.parent_id";

/// Result type used by topic repository operations.
pub type TopicRepoResult<T> = Result<T, TopicRepoError>;

/// Errors from topic repository operations.
#[derive(Debug)]
pub enum TopicRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target topic does not exist or is soft-deleted.
    TopicNotFound(TopicId),
    /// Referenced parent topic does not exist or is soft-deleted.
    ParentNotFound(TopicId),
    /// Reparent target sits inside the topic's own subtree.
    InvalidMove {
        topic_id: TopicId,
        parent_id: TopicId,
    },
    /// Subtree traversal exceeded the defensive depth cap; the parent
    /// graph is presumed corrupted and operators must be alerted.
    DepthCapExceeded { topic_id: TopicId, max_depth: u32 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to valid read model.
    InvalidData(String),
}

impl Display for TopicRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::TopicNotFound(id) => write!(f, "topic not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent topic not found: {id}"),
            Self::InvalidMove {
                topic_id,
                parent_id,
            } => write!(
                f,
                "move would create cycle: topic {topic_id} under parent {parent_id}"
            ),
            Self::DepthCapExceeded {
                topic_id,
                max_depth,
            } => write!(
                f,
                "subtree of topic {topic_id} exceeds depth cap {max_depth}; parent graph may be cyclic"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "topic repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "topic repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "topic repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid topic data: {message}"),
        }
    }
}

impl Error for TopicRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for TopicRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TopicRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Parent constraint for topic listing.
///
/// The admin API exposes a three-way sentinel that must be preserved
/// exactly: an absent parameter means "no parent filter", an empty string
/// means "root topics only", and a concrete id means "direct children of
/// that topic". The enum makes the distinction impossible to lose inside
/// the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParentFilter {
    /// No parent constraint.
    #[default]
    Any,
    /// Root topics only (`parent_id IS NULL`).
    Root,
    /// Direct children of one topic.
    Of(TopicId),
}

impl ParentFilter {
    /// Parses the wire-level sentinel: `None` = no filter, `Some("")` =
    /// roots only, anything else must be a valid external id.
    pub fn from_param(value: Option<&str>) -> TopicRepoResult<Self> {
        match value {
            None => Ok(Self::Any),
            Some("") => Ok(Self::Root),
            Some(raw) => {
                let id = Uuid::parse_str(raw).map_err(|_| {
                    TopicRepoError::InvalidData(format!(
                        "invalid topic external id `{raw}` in parent filter"
                    ))
                })?;
                Ok(Self::Of(id))
            }
        }
    }
}

/// Query options for topic listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicListQuery {
    /// Optional case-insensitive name substring filter.
    pub name: Option<String>,
    /// Parent constraint; see [`ParentFilter`].
    pub parent: ParentFilter,
    /// 1-based page number. Zero is treated as the first page.
    pub page_number: u32,
    /// Rows per page. Defaults to 20 and clamps to 100.
    pub page_size: Option<u32>,
}

/// Normalizes page size according to the listing contract.
pub fn normalize_page_size(page_size: Option<u32>) -> u32 {
    match page_size {
        Some(0) => TOPICS_DEFAULT_PAGE_SIZE,
        Some(value) if value > TOPICS_PAGE_SIZE_MAX => TOPICS_PAGE_SIZE_MAX,
        Some(value) => value,
        None => TOPICS_DEFAULT_PAGE_SIZE,
    }
}

/// Repository interface for topic hierarchy operations.
pub trait TopicRepository {
    /// Creates one topic under an optional parent.
    fn create_topic(
        &self,
        name: &str,
        description: Option<&str>,
        parent_id: Option<TopicId>,
    ) -> TopicRepoResult<Topic>;
    /// Loads one topic by external id.
    fn get_topic(&self, external_id: TopicId, include_inactive: bool)
        -> TopicRepoResult<Option<Topic>>;
    /// Lists topics by filter + pagination.
    fn list_topics(&self, query: &TopicListQuery) -> TopicRepoResult<Vec<Topic>>;
    /// Partially updates name/description. Outer `None` leaves a field
    /// unchanged; `Some(None)` clears the description.
    fn update_topic_fields(
        &self,
        external_id: TopicId,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> TopicRepoResult<()>;
    /// Moves one topic under a new parent (or to root) after re-checking
    /// the cycle invariant inside the write transaction.
    fn reparent_topic(
        &self,
        external_id: TopicId,
        new_parent_id: Option<TopicId>,
    ) -> TopicRepoResult<()>;
    /// Returns whether the topic has any active children.
    fn children_exist(&self, external_id: TopicId) -> TopicRepoResult<bool>;
    /// Soft-deletes the topic and its entire active subtree.
    fn delete_cascade(&self, external_id: TopicId) -> TopicRepoResult<()>;
    /// Soft-deletes only the topic; active children are spliced up to the
    /// topic's own parent (or root).
    fn delete_reparent_children(&self, external_id: TopicId) -> TopicRepoResult<()>;
}

/// SQLite-backed topic repository.
pub struct SqliteTopicRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTopicRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TopicRepoResult<Self> {
        ensure_topic_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TopicRepository for SqliteTopicRepository<'_> {
    fn create_topic(
        &self,
        name: &str,
        description: Option<&str>,
        parent_id: Option<TopicId>,
    ) -> TopicRepoResult<Topic> {
        let parent_key = match parent_id {
            Some(parent_id) => Some(
                resolve_key(self.conn, parent_id, false)?
                    .ok_or(TopicRepoError::ParentNotFound(parent_id))?,
            ),
            None => None,
        };

        let external_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO topics (external_id, name, description, parent_id, is_active)
             VALUES (?1, ?2, ?3, ?4, 1);",
            params![external_id.to_string(), name, description, parent_key],
        )?;

        self.get_topic(external_id, false)?
            .ok_or(TopicRepoError::TopicNotFound(external_id))
    }

    fn get_topic(
        &self,
        external_id: TopicId,
        include_inactive: bool,
    ) -> TopicRepoResult<Option<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOPIC_SELECT_SQL}
             WHERE t.external_id = ?1
               AND (?2 = 1 OR t.is_active = 1);"
        ))?;

        let mut rows = stmt.query(params![
            external_id.to_string(),
            bool_to_int(include_inactive)
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_topic_row(row)?));
        }
        Ok(None)
    }

    fn list_topics(&self, query: &TopicListQuery) -> TopicRepoResult<Vec<Topic>> {
        let mut sql = format!("{TOPIC_SELECT_SQL} WHERE t.is_active = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = query.name.as_ref() {
            sql.push_str(" AND t.name LIKE '%' || ? || '%' ESCAPE '\\'");
            bind_values.push(Value::Text(escape_like_pattern(name)));
        }

        match &query.parent {
            ParentFilter::Any => {}
            ParentFilter::Root => sql.push_str(" AND t.parent_id IS NULL"),
            ParentFilter::Of(parent_id) => {
                sql.push_str(" AND p.external_id = ?");
                bind_values.push(Value::Text(parent_id.to_string()));
            }
        }

        sql.push_str(" ORDER BY t.name COLLATE NOCASE ASC, t.external_id ASC");

        let page_size = normalize_page_size(query.page_size);
        let page_number = query.page_number.max(1);
        let offset = i64::from(page_number - 1) * i64::from(page_size);
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(page_size)));
        if offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(offset));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut topics = Vec::new();
        while let Some(row) = rows.next()? {
            topics.push(parse_topic_row(row)?);
        }
        Ok(topics)
    }

    fn update_topic_fields(
        &self,
        external_id: TopicId,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> TopicRepoResult<()> {
        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = name {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.to_string()));
        }
        if let Some(description) = description {
            assignments.push("description = ?");
            bind_values.push(match description {
                Some(value) => Value::Text(value.to_string()),
                None => Value::Null,
            });
        }
        if assignments.is_empty() {
            // Nothing to write; still verify the target exists.
            return match resolve_key(self.conn, external_id, false)? {
                Some(_) => Ok(()),
                None => Err(TopicRepoError::TopicNotFound(external_id)),
            };
        }

        let sql = format!(
            "UPDATE topics
             SET {}, updated_at = (strftime('%s', 'now') * 1000)
             WHERE external_id = ? AND is_active = 1;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(external_id.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(TopicRepoError::TopicNotFound(external_id));
        }
        Ok(())
    }

    fn reparent_topic(
        &self,
        external_id: TopicId,
        new_parent_id: Option<TopicId>,
    ) -> TopicRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let key = resolve_key(&tx, external_id, false)?
            .ok_or(TopicRepoError::TopicNotFound(external_id))?;
        let parent_key = match new_parent_id {
            Some(parent_id) => Some(
                resolve_key(&tx, parent_id, false)?
                    .ok_or(TopicRepoError::ParentNotFound(parent_id))?,
            ),
            None => None,
        };

        if let (Some(parent_key), Some(parent_id)) = (parent_key, new_parent_id) {
            // The closure includes the topic itself, so self-parenting and
            // descendant targets are both rejected here.
            let subtree = active_subtree(&tx, key, external_id)?;
            if subtree.iter().any(|node| node.key == parent_key) {
                return Err(TopicRepoError::InvalidMove {
                    topic_id: external_id,
                    parent_id,
                });
            }
        }

        tx.execute(
            "UPDATE topics
             SET parent_id = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND is_active = 1;",
            params![key, parent_key],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn children_exist(&self, external_id: TopicId) -> TopicRepoResult<bool> {
        let key = resolve_key(self.conn, external_id, false)?
            .ok_or(TopicRepoError::TopicNotFound(external_id))?;
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM topics
                WHERE parent_id = ?1
                  AND is_active = 1
            );",
            [key],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn delete_cascade(&self, external_id: TopicId) -> TopicRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let key = resolve_key(&tx, external_id, false)?
            .ok_or(TopicRepoError::TopicNotFound(external_id))?;

        // Closure is read inside the same write transaction, so a child
        // created concurrently cannot escape the cascade.
        let subtree = active_subtree(&tx, key, external_id)?;
        let placeholders = vec!["?"; subtree.len()].join(", ");
        let bind_values: Vec<Value> = subtree
            .iter()
            .map(|node| Value::Integer(node.key))
            .collect();
        tx.execute(
            &format!(
                "UPDATE topics
                 SET is_active = 0,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id IN ({placeholders})
                   AND is_active = 1;"
            ),
            params_from_iter(bind_values),
        )?;

        tx.commit()?;
        Ok(())
    }

    fn delete_reparent_children(&self, external_id: TopicId) -> TopicRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let row: Option<(TopicKey, Option<TopicKey>)> = tx
            .query_row(
                "SELECT id, parent_id
                 FROM topics
                 WHERE external_id = ?1
                   AND is_active = 1;",
                [external_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (key, grandparent_key) =
            row.ok_or(TopicRepoError::TopicNotFound(external_id))?;

        tx.execute(
            "UPDATE topics
             SET parent_id = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE parent_id = ?1
               AND is_active = 1;",
            params![key, grandparent_key],
        )?;

        tx.execute(
            "UPDATE topics
             SET is_active = 0,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND is_active = 1;",
            [key],
        )?;

        tx.commit()?;
        Ok(())
    }
}

/// Resolves an external id to its internal storage key.
pub(crate) fn resolve_key(
    conn: &Connection,
    external_id: TopicId,
    include_inactive: bool,
) -> TopicRepoResult<Option<TopicKey>> {
    let key: Option<TopicKey> = conn
        .query_row(
            "SELECT id
             FROM topics
             WHERE external_id = ?1
               AND (?2 = 1 OR is_active = 1);",
            params![external_id.to_string(), bool_to_int(include_inactive)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(key)
}

fn parse_topic_row(row: &Row<'_>) -> TopicRepoResult<Topic> {
    let external_id_text: String = row.get("external_id")?;
    let external_id = parse_uuid(&external_id_text, "topics.external_id")?;

    let parent_id = row
        .get::<_, Option<String>>("parent_external_id")?
        .map(|value| parse_uuid(&value, "topics.parent_id"))
        .transpose()?;

    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(TopicRepoError::InvalidData(format!(
                "invalid is_active value `{other}` in topics.is_active"
            )));
        }
    };

    Ok(Topic {
        external_id,
        name: row.get("name")?,
        description: row.get("description")?,
        parent_id,
        is_active,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Escapes LIKE wildcards so a name filter matches `%` and `_` literally.
fn escape_like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> TopicRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| TopicRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_topic_connection_ready(conn: &Connection) -> TopicRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(TopicRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "topics")? {
        return Err(TopicRepoError::MissingRequiredTable("topics"));
    }

    for column in [
        "id",
        "external_id",
        "name",
        "description",
        "parent_id",
        "is_active",
        "created_at",
        "updated_at",
    ] {
        if !table_has_column(conn, "topics", column)? {
            return Err(TopicRepoError::MissingRequiredColumn {
                table: "topics",
                column,
            });
        }
    }

    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> TopicRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn table_has_column(
    conn: &Connection,
    table: &str,
    column: &str,
) -> TopicRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
