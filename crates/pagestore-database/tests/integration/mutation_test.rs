//! Integration tests for insert, update, upsert and delete.

use std::collections::BTreeMap;

use pagestore_core::error::ErrorKind;
use pagestore_core::types::{ListOptions, SqlValue};
use pagestore_database::UpsertOutcome;
use pagestore_database::sql::Predicate;

use crate::helpers::{Author, Post, TestDb, author_store, date, post_store, seed_authors};

#[tokio::test]
async fn test_insert_assigns_id() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = author_store(&db);

    let mut author = Author::new("Ann", Some(5));
    store.insert(&mut author).await.unwrap();
    assert!(author.id > 0);
    assert_eq!(author.created_at, author.updated_at);

    let loaded = store.get(author.id).await.unwrap();
    assert_eq!(loaded, author);

    let err = store.get(author.id + 100).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.kind.http_status(), 404);

    let by_email = store
        .get_by(Predicate::eq("email", "ann@example.com"))
        .await
        .unwrap();
    assert_eq!(by_email.id, author.id);
}

#[tokio::test]
async fn test_duplicate_insert() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = author_store(&db);
    seed_authors(&store, &["Ann"]).await;

    let mut twin = Author::new("Ann", None);
    let err = store.insert(&mut twin).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Duplicated);
    assert_eq!(err.kind.http_status(), 409);
    assert!(err.message.contains("pagestore_authors_email_key"), "{}", err.message);
    assert_eq!(twin.id, 0);
}

#[tokio::test]
async fn test_upsert_reports_outcome() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = author_store(&db);
    let ann = seed_authors(&store, &["Ann"]).await.remove(0);

    let mut again = Author::new("Ann", Some(9));
    let outcome = store.upsert(&mut again, &["email"]).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);
    assert_eq!(again.id, ann.id);
    assert_eq!(again.created_at, ann.created_at);

    let loaded = store.get(ann.id).await.unwrap();
    assert_eq!(loaded.score, Some(9));
    assert!(loaded.updated_at >= loaded.created_at);

    let mut bea = Author::new("Bea", None);
    let outcome = store.upsert(&mut bea, &["email"]).await.unwrap();
    assert!(outcome.is_inserted());
    assert!(bea.id > ann.id);

    // no email conflict, but the handle is taken
    let mut impostor = Author::new("Bea", None);
    impostor.email = "someone-else@example.com".to_string();
    let err = store.upsert(&mut impostor, &["email"]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Duplicated);
    assert!(err.message.contains("pagestore_authors_handle_key"), "{}", err.message);
}

#[tokio::test]
async fn test_update() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = author_store(&db);
    let mut authors = seed_authors(&store, &["Ann", "Bea"]).await;
    let mut ann = authors.remove(0);
    let bea = authors.remove(0);

    ann.name = "Ann B".to_string();
    ann.score = None;
    ann.handle = "ignored".to_string();
    store.update(&mut ann).await.unwrap();
    assert!(ann.updated_at >= ann.created_at);

    let loaded = store.get(ann.id).await.unwrap();
    assert_eq!(loaded.name, "Ann B");
    assert_eq!(loaded.score, None);
    assert_eq!(loaded.handle, "ann");
    assert_eq!(loaded.created_at, ann.created_at);

    let mut ghost = Author::new("Ghost", None);
    ghost.id = bea.id + 100;
    let err = store.update(&mut ghost).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    ann.email = bea.email.clone();
    let err = store.update(&mut ann).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Duplicated);
}

#[tokio::test]
async fn test_update_map() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = author_store(&db);
    let ann = seed_authors(&store, &["Ann"]).await.remove(0);

    let mut fields = BTreeMap::new();
    fields.insert("score".to_string(), SqlValue::from(42_i64));
    store.update_map(ann.id, fields.clone()).await.unwrap();

    let loaded = store.get(ann.id).await.unwrap();
    assert_eq!(loaded.score, Some(42));
    assert_eq!(loaded.name, "Ann");
    assert!(loaded.updated_at >= ann.updated_at);

    let err = store.update_map(ann.id + 100, fields).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let mut fixed = BTreeMap::new();
    fixed.insert("handle".to_string(), SqlValue::from("new"));
    let err = store.update_map(ann.id, fixed).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidModel);
}

#[tokio::test]
async fn test_hard_delete() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = author_store(&db);
    let authors = seed_authors(&store, &["A", "B", "C"]).await;

    store.delete(authors[0].id).await.unwrap();
    assert_eq!(db.raw_count("pagestore_authors").await, 2);
    assert_eq!(
        store.get(authors[0].id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
    assert_eq!(
        store.delete(authors[0].id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );

    let deleted = store.delete_by(Predicate::gt("score", 2_i64)).await.unwrap();
    assert_eq!(deleted, 1);
    let none = store.delete_by(Predicate::gt("score", 99_i64)).await.unwrap();
    assert_eq!(none, 0);

    let left = store.list(ListOptions::new()).await.unwrap();
    assert_eq!(left.items.len(), 1);
    assert_eq!(left.items[0].name, "B");
}

#[tokio::test]
async fn test_soft_delete() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let author = seed_authors(&author_store(&db), &["A"]).await.remove(0);
    let posts = post_store(&db);

    let mut first = Post::new(author.id, "first", Some(date(2024, 1, 1)));
    let mut second = Post::new(author.id, "second", None);
    posts.insert(&mut first).await.unwrap();
    posts.insert(&mut second).await.unwrap();
    assert!(!first.id.is_nil());

    posts.delete(first.id).await.unwrap();
    assert_eq!(db.raw_count("pagestore_posts").await, 2);
    assert_eq!(posts.get(first.id).await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(posts.delete(first.id).await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(posts.update(&mut first).await.unwrap_err().kind, ErrorKind::NotFound);

    let visible = posts.list(ListOptions::new()).await.unwrap();
    assert_eq!(visible.items.len(), 1);
    assert_eq!(visible.items[0].id, second.id);

    assert_eq!(posts.delete_by(Predicate::all()).await.unwrap(), 1);
    assert_eq!(db.raw_count("pagestore_posts").await, 2);
    assert!(posts.list(ListOptions::new()).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn test_health_check() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    assert!(db.pool.health_check().await.unwrap());
}
