use rusqlite::Connection;
use syllabus_core::db::open_db_in_memory;
use syllabus_core::{
    descendant_ids, ParentFilter, SqliteTopicRepository, TopicDeleteMode, TopicListQuery,
    TopicRepoError, TopicService, TopicServiceError,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn service(conn: &Connection) -> TopicService<SqliteTopicRepository<'_>> {
    TopicService::new(SqliteTopicRepository::try_new(conn).unwrap())
}

fn children_of(conn: &Connection, parent: Uuid) -> Vec<Uuid> {
    let listed = service(conn)
        .list_topics(&TopicListQuery {
            parent: ParentFilter::Of(parent),
            ..TopicListQuery::default()
        })
        .unwrap();
    listed.items.iter().map(|item| item.external_id).collect()
}

#[test]
fn create_and_list_children_keeps_name_order() {
    let conn = setup();
    let service = service(&conn);

    let root = service.create_topic("Sciences", None, None).unwrap();
    let beta = service
        .create_topic("Physics", None, Some(root.external_id))
        .unwrap();
    let alpha = service
        .create_topic("Chemistry", None, Some(root.external_id))
        .unwrap();

    let children = children_of(&conn, root.external_id);
    assert_eq!(children, vec![alpha.external_id, beta.external_id]);
}

#[test]
fn create_rejects_blank_name() {
    let conn = setup();
    let err = service(&conn).create_topic("   ", None, None).unwrap_err();
    assert!(matches!(err, TopicServiceError::InvalidName));
}

#[test]
fn create_rejects_unknown_parent() {
    let conn = setup();
    let unknown_parent = Uuid::new_v4();

    let err = service(&conn)
        .create_topic("Orphan", None, Some(unknown_parent))
        .unwrap_err();
    assert!(matches!(
        err,
        TopicServiceError::ParentNotFound(parent_id) if parent_id == unknown_parent
    ));
}

#[test]
fn create_rejects_inactive_parent() {
    let conn = setup();
    let service = service(&conn);

    let parent = service.create_topic("Doomed", None, None).unwrap();
    service.delete_topic(parent.external_id, None).unwrap();

    let err = service
        .create_topic("Child", None, Some(parent.external_id))
        .unwrap_err();
    assert!(matches!(
        err,
        TopicServiceError::ParentNotFound(parent_id) if parent_id == parent.external_id
    ));
}

#[test]
fn reparent_rejects_self_parenting() {
    let conn = setup();
    let service = service(&conn);
    let topic = service.create_topic("Lonely", None, None).unwrap();

    let err = service
        .reparent_topic(topic.external_id, Some(topic.external_id))
        .unwrap_err();
    assert!(matches!(
        err,
        TopicServiceError::InvalidMove { topic_id, parent_id }
            if topic_id == topic.external_id && parent_id == topic.external_id
    ));
}

#[test]
fn reparent_rejects_descendant_target() {
    let conn = setup();
    let service = service(&conn);

    let a = service.create_topic("A", None, None).unwrap();
    let b = service
        .create_topic("B", None, Some(a.external_id))
        .unwrap();
    let c = service
        .create_topic("C", None, Some(b.external_id))
        .unwrap();

    let err = service
        .reparent_topic(a.external_id, Some(c.external_id))
        .unwrap_err();
    assert!(matches!(
        err,
        TopicServiceError::InvalidMove { topic_id, parent_id }
            if topic_id == a.external_id && parent_id == c.external_id
    ));

    // The rejected move is a no-op: the tree keeps its prior shape.
    assert_eq!(children_of(&conn, a.external_id), vec![b.external_id]);
}

#[test]
fn reparent_carries_subtree_implicitly() {
    let conn = setup();
    let service = service(&conn);

    let old_root = service.create_topic("Old", None, None).unwrap();
    let new_root = service.create_topic("New", None, None).unwrap();
    let moved = service
        .create_topic("Moved", None, Some(old_root.external_id))
        .unwrap();
    let grandchild = service
        .create_topic("Grandchild", None, Some(moved.external_id))
        .unwrap();

    service
        .reparent_topic(moved.external_id, Some(new_root.external_id))
        .unwrap();

    let closure = descendant_ids(&conn, new_root.external_id).unwrap();
    assert!(closure.contains(&moved.external_id));
    assert!(closure.contains(&grandchild.external_id));
    assert_eq!(
        service.get_topic(grandchild.external_id).unwrap().parent_id,
        Some(moved.external_id)
    );
}

#[test]
fn delete_with_children_requires_explicit_policy() {
    let conn = setup();
    let service = service(&conn);

    let parent = service.create_topic("Parent", None, None).unwrap();
    let _child = service
        .create_topic("Child", None, Some(parent.external_id))
        .unwrap();

    let err = service.delete_topic(parent.external_id, None).unwrap_err();
    assert!(matches!(
        err,
        TopicServiceError::ChildrenExist(id) if id == parent.external_id
    ));

    // Still fully visible after the rejected delete.
    assert!(service.get_topic(parent.external_id).is_ok());
}

#[test]
fn delete_childless_topic_needs_no_policy() {
    let conn = setup();
    let service = service(&conn);

    let topic = service.create_topic("Leaf", None, None).unwrap();
    service.delete_topic(topic.external_id, None).unwrap();

    let err = service.get_topic(topic.external_id).unwrap_err();
    assert!(matches!(
        err,
        TopicServiceError::NotFound(id) if id == topic.external_id
    ));
}

#[test]
fn delete_cascade_marks_whole_subtree_inactive_but_keeps_rows() {
    let conn = setup();
    let service = service(&conn);

    let a = service.create_topic("A", None, None).unwrap();
    let b = service
        .create_topic("B", None, Some(a.external_id))
        .unwrap();
    let c = service
        .create_topic("C", None, Some(b.external_id))
        .unwrap();

    service
        .delete_topic(a.external_id, Some(TopicDeleteMode::Cascade))
        .unwrap();

    for id in [a.external_id, b.external_id, c.external_id] {
        assert!(matches!(
            service.get_topic(id).unwrap_err(),
            TopicServiceError::NotFound(missing) if missing == id
        ));
    }

    let listed = service.list_topics(&TopicListQuery::default()).unwrap();
    assert!(listed.items.is_empty());

    // Rows are retained for audit, only flagged inactive.
    let inactive_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM topics WHERE is_active = 0;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(inactive_rows, 3);
}

#[test]
fn delete_reparent_children_splices_out_single_node() {
    let conn = setup();
    let service = service(&conn);

    let p = service.create_topic("P", None, None).unwrap();
    let t = service
        .create_topic("T", None, Some(p.external_id))
        .unwrap();
    let c1 = service
        .create_topic("C1", None, Some(t.external_id))
        .unwrap();
    let c2 = service
        .create_topic("C2", None, Some(t.external_id))
        .unwrap();

    service
        .delete_topic(t.external_id, Some(TopicDeleteMode::ReparentChildren))
        .unwrap();

    assert!(matches!(
        service.get_topic(t.external_id).unwrap_err(),
        TopicServiceError::NotFound(id) if id == t.external_id
    ));
    assert_eq!(
        service.get_topic(c1.external_id).unwrap().parent_id,
        Some(p.external_id)
    );
    assert_eq!(
        service.get_topic(c2.external_id).unwrap().parent_id,
        Some(p.external_id)
    );
}

#[test]
fn delete_reparent_children_of_root_promotes_children_to_root() {
    let conn = setup();
    let service = service(&conn);

    let t = service.create_topic("Root", None, None).unwrap();
    let child = service
        .create_topic("Child", None, Some(t.external_id))
        .unwrap();

    service
        .delete_topic(t.external_id, Some(TopicDeleteMode::ReparentChildren))
        .unwrap();

    assert_eq!(service.get_topic(child.external_id).unwrap().parent_id, None);

    let roots = service
        .list_topics(&TopicListQuery {
            parent: ParentFilter::Root,
            ..TopicListQuery::default()
        })
        .unwrap();
    let root_ids: Vec<_> = roots.items.iter().map(|item| item.external_id).collect();
    assert_eq!(root_ids, vec![child.external_id]);
}

#[test]
fn descendant_traversal_fails_closed_on_corrupted_parent_graph() {
    let conn = setup();
    let service = service(&conn);

    let a = service.create_topic("A", None, None).unwrap();
    let b = service
        .create_topic("B", None, Some(a.external_id))
        .unwrap();

    // Bypass the mutation engine to corrupt the parent graph directly.
    conn.execute(
        "UPDATE topics
         SET parent_id = (SELECT id FROM topics WHERE external_id = ?1)
         WHERE external_id = ?2;",
        [b.external_id.to_string(), a.external_id.to_string()],
    )
    .unwrap();

    let err = descendant_ids(&conn, a.external_id).unwrap_err();
    assert!(matches!(
        err,
        TopicRepoError::DepthCapExceeded { topic_id, .. } if topic_id == a.external_id
    ));
}

#[test]
fn delete_cascade_rolls_back_when_subtree_update_fails() {
    let conn = setup();
    let service = service(&conn);

    let a = service.create_topic("A", None, None).unwrap();
    let b = service
        .create_topic("B", None, Some(a.external_id))
        .unwrap();

    conn.execute_batch(&format!(
        "CREATE TRIGGER topics_fail_cascade_test
         BEFORE UPDATE OF is_active ON topics
         WHEN NEW.external_id = '{}'
         BEGIN
             SELECT RAISE(ABORT, 'forced cascade failure');
         END;",
        b.external_id
    ))
    .unwrap();

    let result = service.delete_topic(a.external_id, Some(TopicDeleteMode::Cascade));
    assert!(result.is_err());

    // Nothing was committed: both topics stay active.
    assert!(service.get_topic(a.external_id).is_ok());
    assert!(service.get_topic(b.external_id).is_ok());
}
