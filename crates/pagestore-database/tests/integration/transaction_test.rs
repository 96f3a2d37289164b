//! Integration tests for units of work and savepoint nesting.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use pagestore_core::error::{AppError, ErrorKind};
use pagestore_core::types::ListOptions;
use pagestore_database::Store;

use crate::helpers::{Author, TestDb, author_store};

async fn names(store: &Store<Author>) -> Vec<String> {
    store
        .list(ListOptions::new())
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|a| a.name)
        .collect()
}

#[tokio::test]
async fn test_run_commits() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let authors = author_store(&db);
    let uow = db.pool.unit_of_work();

    let store = authors.clone();
    let id = uow
        .run(move |tx| {
            Box::pin(async move {
                let authors = tx.store(&store);
                let mut ann = Author::new("Ann", None);
                authors.insert(&mut ann).await?;
                Ok(ann.id)
            })
        })
        .await
        .unwrap();

    assert_eq!(authors.get(id).await.unwrap().name, "Ann");
}

#[tokio::test]
async fn test_uncommitted_rows_are_invisible_outside() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let authors = author_store(&db);
    let uow = db.pool.unit_of_work();

    let store = authors.clone();
    uow.run(move |tx| {
        Box::pin(async move {
            let scoped = tx.store(&store);
            let mut ann = Author::new("Ann", None);
            scoped.insert(&mut ann).await?;

            assert_eq!(names(&scoped).await, vec!["Ann"]);
            assert!(names(&store).await.is_empty());
            Ok(())
        })
    })
    .await
    .unwrap();

    assert_eq!(names(&authors).await, vec!["Ann"]);
}

#[tokio::test]
async fn test_consumed_inner_failure_keeps_outer_work() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let authors = author_store(&db);
    let uow = db.pool.unit_of_work();

    let store = authors.clone();
    uow.run(move |tx| {
        Box::pin(async move {
            let outer = tx.store(&store);
            let mut ann = Author::new("Ann", None);
            outer.insert(&mut ann).await?;

            let inner_store = store.clone();
            let inner = tx
                .run(move |tx| {
                    Box::pin(async move {
                        let inner = tx.store(&inner_store);
                        let mut bea = Author::new("Bea", None);
                        inner.insert(&mut bea).await?;
                        Err::<(), _>(AppError::validation("abort inner"))
                    })
                })
                .await;
            assert_eq!(inner.unwrap_err().message, "abort inner");

            // a failed statement inside the savepoint must not poison the
            // enclosing transaction
            let inner_store = store.clone();
            let duplicate = tx
                .run(move |tx| {
                    Box::pin(async move {
                        let mut twin = Author::new("Ann", None);
                        tx.store(&inner_store).insert(&mut twin).await
                    })
                })
                .await;
            assert_eq!(duplicate.unwrap_err().kind, ErrorKind::Duplicated);

            let mut cal = Author::new("Cal", None);
            outer.insert(&mut cal).await?;
            Ok(())
        })
    })
    .await
    .unwrap();

    assert_eq!(names(&authors).await, vec!["Ann", "Cal"]);
}

#[tokio::test]
async fn test_propagated_inner_failure_rolls_back_everything() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let authors = author_store(&db);
    let uow = db.pool.unit_of_work();

    let store = authors.clone();
    let err = uow
        .run(move |tx| {
            Box::pin(async move {
                let mut ann = Author::new("Ann", None);
                tx.store(&store).insert(&mut ann).await?;

                let inner_store = store.clone();
                tx.run(move |tx| {
                    Box::pin(async move {
                        let mut bea = Author::new("Bea", None);
                        tx.store(&inner_store).insert(&mut bea).await?;
                        Err::<(), _>(AppError::validation("abort"))
                    })
                })
                .await
            })
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(names(&authors).await.is_empty());
}

#[tokio::test]
async fn test_panic_rolls_back() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let authors = author_store(&db);
    let uow = db.pool.unit_of_work();

    let store = authors.clone();
    let result = AssertUnwindSafe(uow.run(move |tx| {
        Box::pin(async move {
            let mut ann = Author::new("Ann", None);
            tx.store(&store).insert(&mut ann).await?;
            let fail = true;
            if fail {
                panic!("boom");
            }
            Ok::<(), AppError>(())
        })
    }))
    .catch_unwind()
    .await;

    assert!(result.is_err());
    assert!(names(&authors).await.is_empty());
}

#[tokio::test]
async fn test_manual_scopes() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let authors = author_store(&db);
    let uow = db.pool.unit_of_work();
    assert!(!uow.in_transaction());

    let tx = uow.begin().await.unwrap();
    assert!(tx.in_transaction());
    let scoped = tx.store(&authors);
    let mut ann = Author::new("Ann", None);
    scoped.insert(&mut ann).await.unwrap();

    let savepoint = tx.begin().await.unwrap();
    let mut bea = Author::new("Bea", None);
    savepoint.store(&authors).insert(&mut bea).await.unwrap();
    savepoint.rollback().await.unwrap();

    tx.commit().await.unwrap();
    assert_eq!(names(&authors).await, vec!["Ann"]);

    // the scope's executor is finished once committed
    let err = scoped.list(ListOptions::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transaction);

    let err = db.pool.unit_of_work().commit().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transaction);
}
