//! End-to-end walk through a realistic curriculum lifecycle: build a
//! three-level tree, tag content at the leaf, filter from the root,
//! splice out the middle level, and verify the tree rejects a cycle.

use rusqlite::Connection;
use syllabus_core::db::open_db_in_memory;
use syllabus_core::{
    content_under_topic, subtree_counts, ContentType, SqliteTagRepository, SqliteTopicRepository,
    TaggingService, TopicDeleteMode, TopicService, TopicServiceError,
};
use uuid::Uuid;

fn topic_service(conn: &Connection) -> TopicService<SqliteTopicRepository<'_>> {
    TopicService::new(SqliteTopicRepository::try_new(conn).unwrap())
}

#[test]
fn curriculum_lifecycle() {
    let mut conn = open_db_in_memory().unwrap();

    // Mathematics > Algebra > Linear Equations.
    let (mathematics, algebra, linear_equations) = {
        let service = topic_service(&conn);
        let mathematics = service.create_topic("Mathematics", None, None).unwrap();
        let algebra = service
            .create_topic("Algebra", None, Some(mathematics.external_id))
            .unwrap();
        let linear_equations = service
            .create_topic(
                "Linear Equations",
                Some("First-degree equations".to_string()),
                Some(algebra.external_id),
            )
            .unwrap();
        (mathematics, algebra, linear_equations)
    };

    // Tag one question at the leaf only.
    let question = Uuid::new_v4();
    {
        let mut tagging = TaggingService::new(SqliteTagRepository::try_new(&mut conn).unwrap());
        let chips = tagging
            .set_topics(
                ContentType::Question,
                question,
                &[linear_equations.external_id],
            )
            .unwrap();
        assert_eq!(chips.len(), 1);
        assert_eq!(chips[0].name, "Linear Equations");
    }

    // The leaf tag is visible from every ancestor.
    for topic_id in [
        mathematics.external_id,
        algebra.external_id,
        linear_equations.external_id,
    ] {
        let found = content_under_topic(&conn, ContentType::Question, topic_id).unwrap();
        assert_eq!(found, vec![question]);
    }

    let counts = subtree_counts(&conn, mathematics.external_id).unwrap();
    assert_eq!(counts.questions, 1);
    assert_eq!(counts.total(), 1);

    // Splice out the middle level; the leaf hangs off the root directly.
    {
        let service = topic_service(&conn);
        service
            .delete_topic(algebra.external_id, Some(TopicDeleteMode::ReparentChildren))
            .unwrap();

        let leaf = service.get_topic(linear_equations.external_id).unwrap();
        assert_eq!(leaf.parent_id, Some(mathematics.external_id));
        assert!(matches!(
            service.get_topic(algebra.external_id).unwrap_err(),
            TopicServiceError::NotFound(id) if id == algebra.external_id
        ));
    }

    // Tagged content survives the splice and still filters from the root.
    let found = content_under_topic(&conn, ContentType::Question, mathematics.external_id).unwrap();
    assert_eq!(found, vec![question]);

    // Moving the root under its own descendant is still impossible.
    {
        let service = topic_service(&conn);
        let err = service
            .reparent_topic(
                mathematics.external_id,
                Some(linear_equations.external_id),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TopicServiceError::InvalidMove { topic_id, parent_id }
                if topic_id == mathematics.external_id
                    && parent_id == linear_equations.external_id
        ));
    }
}
