//! Relational navigation through record views: foreign keys, reverse
//! relations, write-through, and the shared view-shape cache.

use std::sync::Arc;

use ntest::timeout;
use serde_json::json;

use relstate_core::{
    DbError, FieldValue, Session, TableSchema, TopState, ViewFactory,
};

use crate::helpers::{blog_schemas, blog_session, TestSchema};

fn seeded_session() -> Session {
    let session = blog_session();
    session
        .table("Author")
        .unwrap()
        .insert(&json!({ "id": "1", "name": "Ada" }))
        .unwrap();
    session
        .table("Post")
        .unwrap()
        .insert(&json!({ "id": "10", "title": "Hi", "authorId": "1" }))
        .unwrap();
    session
}

#[timeout(1000)]
#[test]
fn forward_fk_resolves_referenced_record() {
    let session = seeded_session();
    let post = session.table("Post").unwrap().get("10").unwrap();

    let author = post.field("author").unwrap();
    let author = author.as_record().expect("author should resolve");
    assert_eq!(author.id(), "1");
    assert_eq!(author.scalar("name"), Some(json!("Ada")));
}

#[timeout(1000)]
#[test]
fn forward_fk_with_dangling_target_is_none() {
    let session = blog_session();
    session
        .table("Post")
        .unwrap()
        .insert(&json!({ "id": "10", "title": "Hi", "authorId": "99" }))
        .unwrap();

    let post = session.table("Post").unwrap().get("10").unwrap();
    assert!(matches!(post.field("author").unwrap(), FieldValue::Record(None)));
}

#[timeout(1000)]
#[test]
fn forward_fk_without_value_is_none() {
    let session = blog_session();
    session
        .table("Post")
        .unwrap()
        .insert(&json!({ "id": "10", "title": "Hi" }))
        .unwrap();

    let post = session.table("Post").unwrap().get("10").unwrap();
    assert!(matches!(post.field("author").unwrap(), FieldValue::Record(None)));
}

#[timeout(1000)]
#[test]
fn reverse_relation_collects_exactly_the_referencing_records() {
    let session = seeded_session();
    let posts = session.table("Post").unwrap();
    posts
        .insert(&json!({ "id": "11", "title": "Again", "authorId": "1" }))
        .unwrap();
    posts
        .insert(&json!({ "id": "12", "title": "Other", "authorId": "2" }))
        .unwrap();

    let ada = session.table("Author").unwrap().get("1").unwrap();
    let set = ada.field("posts").unwrap();
    let set = set.as_set().expect("posts should resolve to a set");

    assert_eq!(set.ids(), vec!["10", "11"]);
    assert_eq!(set.len(), 2);
    assert_eq!(set.table_name(), "Post");
    assert_eq!(set.referenced_from().name(), "posts");
}

#[timeout(1000)]
#[test]
fn reverse_relation_membership_is_string_compared() {
    let session = blog_session();
    session
        .table("Author")
        .unwrap()
        .insert(&json!({ "id": "1", "name": "Ada" }))
        .unwrap();
    // Numeric foreign-key value; membership compares ids stringwise.
    session
        .table("Post")
        .unwrap()
        .insert(&json!({ "id": "10", "title": "Hi", "authorId": 1 }))
        .unwrap();

    let ada = session.table("Author").unwrap().get("1").unwrap();
    let set = ada.field("posts").unwrap();
    assert_eq!(set.as_set().unwrap().ids(), vec!["10"]);
}

#[timeout(1000)]
#[test]
fn undeclared_accessor_is_a_live_scalar_field() {
    let session = seeded_session();
    let post = session.table("Post").unwrap().get("10").unwrap();

    let title = post.field("title").unwrap();
    assert_eq!(title.as_scalar(), Some(json!("Hi")));

    // The wrapper re-reads the live snapshot: an update shows through it.
    let FieldValue::Field(field) = title else {
        panic!("title should resolve as a plain field");
    };
    session
        .table("Post")
        .unwrap()
        .update(&json!({ "id": "10", "title": "Hello" }))
        .unwrap();
    assert_eq!(field.value(), Some(json!("Hello")));
}

#[timeout(1000)]
#[test]
fn view_reads_are_never_stale() {
    let session = seeded_session();
    let post = session.table("Post").unwrap().get("10").unwrap();

    session
        .table("Post")
        .unwrap()
        .update(&json!({ "id": "10", "title": "Hello" }))
        .unwrap();

    assert_eq!(post.scalar("title"), Some(json!("Hello")));

    session.table("Post").unwrap().delete("10");
    assert!(post.value().is_none());
}

#[timeout(1000)]
#[test]
fn writing_through_fk_accessor_updates_the_record() {
    let session = seeded_session();
    session
        .table("Author")
        .unwrap()
        .insert(&json!({ "id": "2", "name": "Grace" }))
        .unwrap();

    let post = session.table("Post").unwrap().get("10").unwrap();
    post.set("author", json!("2")).unwrap();

    assert_eq!(post.scalar("authorId"), Some(json!("2")));
    let author = post.field("author").unwrap();
    assert_eq!(author.as_record().unwrap().scalar("name"), Some(json!("Grace")));
}

#[timeout(1000)]
#[test]
fn writing_through_reverse_relation_fails() {
    let session = seeded_session();
    let ada = session.table("Author").unwrap().get("1").unwrap();

    let result = ada.set("posts", json!([]));
    assert!(matches!(result, Err(DbError::InvalidOperation(_))));
    // Nothing changed.
    assert_eq!(session.table("Post").unwrap().snapshot().ids, vec!["10"]);
}

#[timeout(1000)]
#[test]
fn scalar_set_goes_through_the_update_path() {
    let session = seeded_session();
    let post = session.table("Post").unwrap().get("10").unwrap();

    post.set("title", json!("Hello")).unwrap();
    assert_eq!(post.scalar("title"), Some(json!("Hello")));
    // Untouched fields survive the merge.
    assert_eq!(post.scalar("authorId"), Some(json!("1")));
}

#[timeout(1000)]
#[test]
fn view_update_fills_in_the_primary_key() {
    let session = seeded_session();
    let post = session.table("Post").unwrap().get("10").unwrap();

    let mut fields = serde_json::Map::new();
    fields.insert("title".to_string(), json!("Merged"));
    post.update(fields).unwrap();

    assert_eq!(post.scalar("title"), Some(json!("Merged")));
    assert_eq!(post.id(), "10");
}

#[timeout(1000)]
#[test]
fn delete_through_view_removes_the_record() {
    let session = seeded_session();
    let post = session.table("Post").unwrap().get("10").unwrap();

    assert!(post.delete());
    assert!(!session.table("Post").unwrap().exists("10"));
    assert!(post.value().is_none());
    // A second delete through the same view is a no-op.
    assert!(!post.delete());
}

#[timeout(1000)]
#[test]
fn fk_into_unregistered_table_fails() {
    let schemas: Vec<Arc<dyn TableSchema>> = vec![Arc::new(
        TestSchema::new("Orphan", "id")
            .foreign_key("ghostId", "ghost", "Ghost")
            .relation("items", "Missing", "orphanId"),
    )];
    let session = Session::new(TopState::new(), schemas, Arc::new(ViewFactory::new()));
    let orphans = session.table("Orphan").unwrap();
    orphans.insert(&json!({ "id": "1", "ghostId": "7" })).unwrap();

    let orphan = orphans.get("1").unwrap();
    assert!(matches!(
        orphan.field("ghost"),
        Err(DbError::UnregisteredTable { ref table, .. }) if table == "Ghost"
    ));
    assert!(matches!(
        orphan.field("items"),
        Err(DbError::UnregisteredTable { ref table, .. }) if table == "Missing"
    ));
}

#[timeout(1000)]
#[test]
fn view_shapes_are_cached_per_table_name() {
    let views = ViewFactory::new();
    let schemas = blog_schemas();

    let first = views.shape_for(schemas[0].as_ref());
    let second = views.shape_for(schemas[0].as_ref());
    assert!(Arc::ptr_eq(&first, &second));

    // A different schema instance with the same table name hits the same
    // cache entry; shapes are keyed by name for the factory's lifetime.
    let rebuilt = blog_schemas();
    let third = views.shape_for(rebuilt[0].as_ref());
    assert!(Arc::ptr_eq(&first, &third));
}
