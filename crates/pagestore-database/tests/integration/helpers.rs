//! Shared test helpers for integration tests.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use pagestore_core::config::{DatabaseConfig, ListingConfig};
use pagestore_core::result::AppResult;
use pagestore_core::schema::{Field, Schema};
use pagestore_core::traits::Record;
use pagestore_core::types::{FilterOp, FilterRule, ListOptions, PaginationRule, SqlValue, ValueType};
use pagestore_database::sql::Statement;
use pagestore_database::{DatabasePool, Executor, Relation, Store, collect_keys};
use sqlx::postgres::PgRow;

/// Tests share one database, so they run one at a time.
static SERIAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

const SCHEMA_SQL: &str = r#"
DROP TABLE IF EXISTS pagestore_posts;
DROP TABLE IF EXISTS pagestore_authors;

CREATE TABLE pagestore_authors (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    handle TEXT NOT NULL,
    score BIGINT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT pagestore_authors_email_key UNIQUE (email),
    CONSTRAINT pagestore_authors_handle_key UNIQUE (handle)
);

CREATE TABLE pagestore_posts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    author_id BIGINT NOT NULL REFERENCES pagestore_authors (id),
    title TEXT NOT NULL,
    published BOOLEAN NOT NULL DEFAULT FALSE,
    published_on DATE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ
);
"#;

/// Test database context
pub struct TestDb {
    /// Connection pool
    pub pool: DatabasePool,
    _serial: MutexGuard<'static, ()>,
}

impl TestDb {
    /// Connect and recreate the test tables, or `None` when
    /// `PAGESTORE_TEST_DATABASE_URL` is unset.
    pub async fn new() -> Option<Self> {
        let url = std::env::var("PAGESTORE_TEST_DATABASE_URL").ok()?;
        let serial = SERIAL.lock().await;

        let pool = DatabasePool::connect(&DatabaseConfig::with_url(url))
            .await
            .expect("Failed to connect to test database");
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(pool.pool())
            .await
            .expect("Failed to create test tables");

        Some(Self {
            pool,
            _serial: serial,
        })
    }

    /// A fresh pool executor.
    pub fn executor(&self) -> Arc<dyn Executor> {
        self.pool.executor()
    }

    /// Count rows of `table` directly, bypassing every store filter.
    pub async fn raw_count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.pool.pool())
            .await
            .expect("Failed to count rows")
    }
}

static AUTHOR_FIELDS: [Field; 7] = [
    Field::new("id", "id", ValueType::Integer),
    Field::new("name", "name", ValueType::String),
    Field::new("email", "email", ValueType::String),
    Field::new("handle", "handle", ValueType::String).skip_update(),
    Field::new("score", "score", ValueType::Integer),
    Field::new("created_at", "created_at", ValueType::Timestamp),
    Field::new("updated_at", "updated_at", ValueType::Timestamp),
];

static AUTHOR_SCHEMA: Schema = Schema {
    table: "pagestore_authors",
    fields: &AUTHOR_FIELDS,
    id: "id",
    created_at: "created_at",
    updated_at: "updated_at",
    deleted_at: None,
};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub handle: String,
    pub score: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Author {
    pub fn new(name: &str, score: Option<i64>) -> Self {
        let slug = name.to_lowercase();
        Self {
            id: 0,
            name: name.to_string(),
            email: format!("{slug}@example.com"),
            handle: slug,
            score,
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }
}

impl Record for Author {
    type Id = i64;

    fn schema() -> &'static Schema {
        &AUTHOR_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn value(&self, field: &str) -> Option<SqlValue> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "email" => Some(self.email.as_str().into()),
            "handle" => Some(self.handle.as_str().into()),
            "score" => Some(self.score.into()),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            _ => None,
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

static POST_FIELDS: [Field; 8] = [
    Field::new("id", "id", ValueType::Uuid),
    Field::new("author_id", "author_id", ValueType::Integer),
    Field::new("title", "title", ValueType::String),
    Field::new("published", "published", ValueType::Boolean),
    Field::new("published_on", "published_on", ValueType::Date),
    Field::new("created_at", "created_at", ValueType::Timestamp),
    Field::new("updated_at", "updated_at", ValueType::Timestamp),
    Field::new("deleted_at", "deleted_at", ValueType::Timestamp),
];

static POST_SCHEMA: Schema = Schema {
    table: "pagestore_posts",
    fields: &POST_FIELDS,
    id: "id",
    created_at: "created_at",
    updated_at: "updated_at",
    deleted_at: Some("deleted_at"),
};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: i64,
    pub title: String,
    pub published: bool,
    pub published_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub author: Option<Author>,
}

impl Post {
    pub fn new(author_id: i64, title: &str, published_on: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::nil(),
            author_id,
            title: title.to_string(),
            published: published_on.is_some(),
            published_on,
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
            deleted_at: None,
            author: None,
        }
    }
}

impl Record for Post {
    type Id = Uuid;

    fn schema() -> &'static Schema {
        &POST_SCHEMA
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn value(&self, field: &str) -> Option<SqlValue> {
        match field {
            "id" => Some(self.id.into()),
            "author_id" => Some(self.author_id.into()),
            "title" => Some(self.title.as_str().into()),
            "published" => Some(self.published.into()),
            "published_on" => Some(self.published_on.into()),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            "deleted_at" => Some(self.deleted_at.into()),
            _ => None,
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Executor that logs the SQL of every statement before delegating.
pub struct LoggingExecutor {
    inner: Arc<dyn Executor>,
    log: Arc<std::sync::Mutex<Vec<String>>>,
}

impl LoggingExecutor {
    pub fn new(inner: Arc<dyn Executor>) -> Self {
        Self {
            inner,
            log: Arc::default(),
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().expect("log lock").clone()
    }

    fn record(&self, statement: &Statement) {
        self.log.lock().expect("log lock").push(statement.sql.clone());
    }
}

#[async_trait]
impl Executor for LoggingExecutor {
    async fn execute(&self, statement: Statement) -> AppResult<u64> {
        self.record(&statement);
        self.inner.execute(statement).await
    }

    async fn fetch_all(&self, statement: Statement) -> AppResult<Vec<PgRow>> {
        self.record(&statement);
        self.inner.fetch_all(statement).await
    }

    async fn fetch_optional(&self, statement: Statement) -> AppResult<Option<PgRow>> {
        self.record(&statement);
        self.inner.fetch_optional(statement).await
    }

    async fn begin(&self) -> AppResult<Arc<dyn Executor>> {
        self.inner.begin().await
    }

    async fn commit(&self) -> AppResult<()> {
        self.inner.commit().await
    }

    async fn rollback(&self) -> AppResult<()> {
        self.inner.rollback().await
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}

/// Attaches each post's author with one batched query.
pub struct PostAuthor {
    pub authors: Store<Author>,
}

#[async_trait]
impl Relation<Post> for PostAuthor {
    async fn attach(&self, executor: &Arc<dyn Executor>, posts: &mut [Post]) -> AppResult<()> {
        let ids = collect_keys(posts, |p| Some(p.author_id));
        let authors = self
            .authors
            .with_executor(Arc::clone(executor))
            .list_by_ids(&ids, ListOptions::new())
            .await?;
        let by_id: HashMap<i64, Author> =
            authors.items.into_iter().map(|a| (a.id, a)).collect();
        for post in posts.iter_mut() {
            post.author = by_id.get(&post.author_id).cloned();
        }
        Ok(())
    }
}

/// Authors paginated by `(name, id)` with filters on name and score.
pub fn author_store(db: &TestDb) -> Store<Author> {
    author_store_with(db, ListingConfig::default())
}

pub fn author_store_with(db: &TestDb, listing: ListingConfig) -> Store<Author> {
    Store::builder()
        .filter_rule(FilterRule::new(
            "name",
            ValueType::String,
            &[FilterOp::Eq, FilterOp::Like, FilterOp::In],
        ))
        .filter_rule(
            FilterRule::new(
                "score",
                ValueType::Integer,
                &[FilterOp::Eq, FilterOp::Gt, FilterOp::Lt, FilterOp::IsNull],
            )
            .nullable(),
        )
        .pagination_rule(PaginationRule::new("name"))
        .pagination_rule(PaginationRule::new("id"))
        .listing(listing)
        .build(db.executor())
        .expect("author store configuration is valid")
}

/// Posts paginated by `(published_on, id)` with an `author` relation.
pub fn post_store(db: &TestDb) -> Store<Post> {
    Store::builder()
        .filter_rule(FilterRule::new(
            "published",
            ValueType::Boolean,
            &[FilterOp::IsTrue, FilterOp::IsFalse],
        ))
        .filter_rule(FilterRule::new(
            "published_on",
            ValueType::Date,
            &[FilterOp::Gte, FilterOp::Lt],
        ))
        .pagination_rule(
            PaginationRule::new("published_on")
                .null_replacement(NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date")),
        )
        .pagination_rule(PaginationRule::new("id"))
        .relation("author", PostAuthor {
            authors: author_store(db),
        })
        .build(db.executor())
        .expect("post store configuration is valid")
}

/// Insert authors named `names`, scored by position.
pub async fn seed_authors(store: &Store<Author>, names: &[&str]) -> Vec<Author> {
    let mut authors = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let mut author = Author::new(name, Some(i as i64 + 1));
        store.insert(&mut author).await.expect("Failed to seed author");
        authors.push(author);
    }
    authors
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
