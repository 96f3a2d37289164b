//! The generic record store.
//!
//! A [`Store`] gives any [`Record`] the same get/list/insert/update/upsert/
//! delete contract. It composes the store's default filters, the caller's
//! predicate, the compiled filter conditions and the [`Paginator`] into one
//! query per page, and runs everything through an injected [`Executor`].
//!
//! Stores are cheap to clone. [`Store::with_executor`] rebinds the same
//! configuration to another executor, which is how a unit of work hands out
//! transaction-scoped stores.

pub mod builder;
pub mod relation;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use tracing::debug;

use pagestore_core::config::ListingConfig;
use pagestore_core::error::AppError;
use pagestore_core::result::AppResult;
use pagestore_core::schema::{Field, Schema};
use pagestore_core::traits::Record;
use pagestore_core::types::{
    Cursor, FilterRule, ListOptions, ListResult, PageMode, PaginationRule, SqlValue,
};

use crate::error::map_sqlx_error;
use crate::executor::Executor;
use crate::filter::FilterCompiler;
use crate::paginator::Paginator;
use crate::sql::{Delete, Insert, Predicate, Select, Statement, Update};

pub use builder::StoreBuilder;
pub use relation::{Relation, collect_keys};

/// A [`Record`] that can be decoded from a Postgres row.
pub trait StoredRecord: Record + for<'r> FromRow<'r, PgRow> + Unpin {}

impl<T> StoredRecord for T where T: Record + for<'r> FromRow<'r, PgRow> + Unpin {}

/// Whether an upsert created a row or overwrote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row matched the conflict target.
    Inserted,
    /// The conflicting row was updated.
    Updated,
}

impl UpsertOutcome {
    /// Shorthand for `self == UpsertOutcome::Inserted`.
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

pub(crate) struct StoreInner<T: StoredRecord> {
    pub(crate) schema: &'static Schema,
    pub(crate) compiler: FilterCompiler,
    pub(crate) filter_rules: Vec<FilterRule>,
    pub(crate) pagination_rules: Vec<PaginationRule>,
    pub(crate) default_filters: Vec<Predicate>,
    pub(crate) relations: HashMap<String, Arc<dyn Relation<T>>>,
    pub(crate) listing: ListingConfig,
}

/// CRUD and list operations for records of type `T`.
pub struct Store<T: StoredRecord> {
    executor: Arc<dyn Executor>,
    inner: Arc<StoreInner<T>>,
}

impl<T: StoredRecord> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: StoredRecord> Store<T> {
    /// Start configuring a store.
    pub fn builder() -> StoreBuilder<T> {
        StoreBuilder::new()
    }

    /// The same store running its statements on `executor`.
    pub fn with_executor(&self, executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            inner: Arc::clone(&self.inner),
        }
    }

    /// The executor statements run on.
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// The record schema.
    pub fn schema(&self) -> &'static Schema {
        self.inner.schema
    }

    /// Fetch one record by identifier.
    pub async fn get(&self, id: T::Id) -> AppResult<T> {
        let schema = self.inner.schema;
        self.get_by(Predicate::eq(schema.id_column(), id)).await
    }

    /// Fetch the first record matching `predicate`. Zero rows is `NotFound`.
    pub async fn get_by(&self, predicate: Predicate) -> AppResult<T> {
        let schema = self.inner.schema;
        let mut select = Select::new(schema.table);
        select.filter(self.scoped(predicate)).limit(1);
        let row = self
            .executor
            .fetch_optional(select.statement())
            .await?
            .ok_or_else(|| AppError::not_found(format!("{} not found", schema.table)))?;
        decode_row(&row)
    }

    /// List one page of records.
    pub async fn list(&self, options: ListOptions) -> AppResult<ListResult<T>> {
        self.list_by(Predicate::all(), options).await
    }

    /// List one page of records matching `predicate`.
    pub async fn list_by(
        &self,
        predicate: Predicate,
        options: ListOptions,
    ) -> AppResult<ListResult<T>> {
        let limit = self.resolve_limit(options.limit, self.inner.listing.default_limit)?;
        self.list_page(predicate, options, limit).await
    }

    /// List the records with the given identifiers in one page.
    pub async fn list_by_ids(
        &self,
        ids: &[T::Id],
        options: ListOptions,
    ) -> AppResult<ListResult<T>> {
        let schema = self.inner.schema;
        let predicate = Predicate::in_list(schema.id_column(), ids.iter().cloned());
        let limit = u64::try_from(ids.len()).unwrap_or(u64::MAX).max(1);
        self.list_page(predicate, options, limit).await
    }

    /// Feed every record to `f`, page by page. Returns the number of records
    /// visited.
    pub async fn list_each<F>(&self, options: ListOptions, f: F) -> AppResult<u64>
    where
        F: FnMut(Vec<T>) -> AppResult<()> + Send,
    {
        self.list_by_each(Predicate::all(), options, f).await
    }

    /// Feed every record matching `predicate` to `f`, page by page.
    ///
    /// The request's mode picks how pages advance: cursor requests carry the
    /// returned `next_cursor` forward, offset requests increment the page.
    /// Without a limit the configured `each_page_size` is used.
    ///
    /// The walk only moves forward, so a `before` cursor is rejected as
    /// `Validation`.
    pub async fn list_by_each<F>(
        &self,
        predicate: Predicate,
        mut options: ListOptions,
        mut f: F,
    ) -> AppResult<u64>
    where
        F: FnMut(Vec<T>) -> AppResult<()> + Send,
    {
        if let PageMode::Cursor(Cursor::Before(_)) = options.mode {
            return Err(AppError::validation(
                "list_each walks forward and cannot start from a before cursor",
            ));
        }
        let limit = self.resolve_limit(options.limit, self.inner.listing.each_page_size)?;
        let mut visited = 0_u64;
        let mut pages = 0_u64;
        loop {
            let page = self
                .list_page(predicate.clone(), options.clone(), limit)
                .await?;
            let next = page.next();
            let items = page.items;
            pages += 1;
            visited += items.len() as u64;
            if !items.is_empty() {
                f(items)?;
            }
            match next {
                Some(mode) => options.mode = mode,
                None => break,
            }
        }
        debug!(table = self.inner.schema.table, pages, visited, "Listed every page");
        Ok(visited)
    }

    /// Insert `record` and write the generated identifier back into it.
    ///
    /// A unique violation is `Duplicated`.
    pub async fn insert(&self, record: &mut T) -> AppResult<()> {
        let schema = self.inner.schema;
        let now = now();
        record.set_created_at(now);
        record.set_updated_at(now);

        let mut insert = Insert::new(schema.table);
        for field in schema.insert_fields() {
            insert = insert.value(field.column, value_of(record, field)?);
        }
        let row = self
            .executor
            .fetch_one(insert.returning("*").statement())
            .await
            .map_err(|e| e.context(format!("insert into {}", schema.table)))?;
        let stored: T = decode_row(&row)?;
        record.set_id(stored.id());
        Ok(())
    }

    /// Overwrite every updatable column of `record` by identifier.
    ///
    /// Zero affected rows is `NotFound`.
    pub async fn update(&self, record: &mut T) -> AppResult<()> {
        let schema = self.inner.schema;
        record.set_updated_at(now().max(record.created_at()));

        let filter = self.scoped(Predicate::eq(schema.id_column(), record.id()));
        let mut update = Update::new(schema.table, filter);
        for field in schema.update_fields() {
            update = update.set(field.column, value_of(record, field)?);
        }
        self.execute_one(update.statement(), record.id()).await
    }

    /// Set the given columns of the record with identifier `id`.
    ///
    /// Keys are column names and must be updatable columns of the schema. The
    /// update timestamp is set unless `fields` already carries it.
    pub async fn update_map(&self, id: T::Id, fields: BTreeMap<String, SqlValue>) -> AppResult<()> {
        let schema = self.inner.schema;
        let updated_at = schema.updated_at_column();
        let stamped = fields.contains_key(updated_at);

        let filter = self.scoped(Predicate::eq(schema.id_column(), id.clone()));
        let mut update = Update::new(schema.table, filter);
        for (column, value) in fields {
            if !schema.update_fields().any(|f| f.column == column) {
                return Err(AppError::invalid_model(format!(
                    "'{column}' is not an updatable column of '{}'",
                    schema.table
                )));
            }
            update = update.set(column, value);
        }
        if !stamped {
            update = update.set(updated_at, SqlValue::from(now()));
        }
        self.execute_one(update.statement(), id).await
    }

    /// Insert `record`, or update the row that conflicts with it on the
    /// `conflict_target` columns.
    ///
    /// A unique violation on any other constraint is still `Duplicated`.
    pub async fn upsert(&self, record: &mut T, conflict_target: &[&str]) -> AppResult<UpsertOutcome> {
        let schema = self.inner.schema;
        if conflict_target.is_empty() {
            return Err(AppError::invalid_model("upsert needs a conflict target"));
        }
        if let Some(column) = conflict_target
            .iter()
            .find(|c| schema.field_by_column(c).is_none())
        {
            return Err(AppError::invalid_model(format!(
                "conflict target '{column}' is not a column of '{}'",
                schema.table
            )));
        }

        let now = now();
        record.set_created_at(now);
        record.set_updated_at(now);

        let mut insert = Insert::new(schema.table);
        for field in schema.insert_fields() {
            insert = insert.value(field.column, value_of(record, field)?);
        }
        let updates: Vec<String> = schema
            .update_fields()
            .map(|f| f.column)
            .chain(schema.deleted_at_column())
            .filter(|c| !conflict_target.contains(c))
            .map(str::to_string)
            .collect();
        let statement = insert
            .on_conflict_update(conflict_target.iter().map(|c| c.to_string()).collect(), updates)
            .returning("*")
            .returning("(xmax = 0) AS inserted")
            .statement();

        let row = self
            .executor
            .fetch_one(statement)
            .await
            .map_err(|e| e.context(format!("upsert into {}", schema.table)))?;
        let stored: T = decode_row(&row)?;
        let inserted: bool = row
            .try_get("inserted")
            .map_err(|e| map_sqlx_error(e, "Failed to read upsert outcome"))?;

        record.set_id(stored.id());
        record.set_created_at(stored.created_at());
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    /// Delete the record with identifier `id`; soft-deleting tables only set
    /// the marker. Zero affected rows is `NotFound`.
    pub async fn delete(&self, id: T::Id) -> AppResult<()> {
        let schema = self.inner.schema;
        let statement = self.delete_statement(Predicate::eq(schema.id_column(), id.clone()));
        self.execute_one(statement, id).await
    }

    /// Delete every record matching `predicate` and return how many went.
    pub async fn delete_by(&self, predicate: Predicate) -> AppResult<u64> {
        let affected = self.executor.execute(self.delete_statement(predicate)).await?;
        debug!(table = self.inner.schema.table, affected, "Deleted records");
        Ok(affected)
    }

    async fn list_page(
        &self,
        predicate: Predicate,
        options: ListOptions,
        limit: u64,
    ) -> AppResult<ListResult<T>> {
        let inner = &*self.inner;
        let compiled = inner.compiler.compile(&options.conditions, &inner.filter_rules)?;
        let relations = self.relations_for(&options.includes)?;
        let paginator = Paginator::new(
            inner.schema,
            &inner.pagination_rules,
            options.mode,
            limit,
            options.order,
        )?;

        let mut select = Select::new(inner.schema.table);
        select.filter(self.scoped(predicate)).filter(compiled);
        let count = paginator.count_query(&select);
        paginator.apply(&mut select)?;

        let total = match count {
            Some(statement) => Some(self.count(statement).await?),
            None => None,
        };
        let rows = self.executor.fetch_all(select.statement()).await?;
        let records = rows.iter().map(decode_row).collect::<AppResult<Vec<T>>>()?;
        let mut page = paginator.finish(records, total)?;

        for relation in relations {
            relation.attach(&self.executor, &mut page.items).await?;
        }
        Ok(page)
    }

    async fn count(&self, statement: Statement) -> AppResult<u64> {
        let row = self.executor.fetch_one(statement).await?;
        let total: i64 = row
            .try_get(0)
            .map_err(|e| map_sqlx_error(e, "Failed to read row count"))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn execute_one(&self, statement: Statement, id: T::Id) -> AppResult<()> {
        if self.executor.execute(statement).await? == 0 {
            return Err(AppError::not_found(format!(
                "{} {id:?} not found",
                self.inner.schema.table
            )));
        }
        Ok(())
    }

    fn delete_statement(&self, predicate: Predicate) -> Statement {
        let schema = self.inner.schema;
        let filter = self.scoped(predicate);
        match schema.deleted_at_column() {
            Some(column) => Update::new(schema.table, filter)
                .set(column, SqlValue::from(now()))
                .statement(),
            None => Delete::new(schema.table, filter).statement(),
        }
    }

    /// `predicate` ANDed with the default filters and, for soft-deleting
    /// tables, `deleted_at IS NULL`.
    fn scoped(&self, predicate: Predicate) -> Predicate {
        let mut all = self.inner.default_filters.clone();
        if let Some(column) = self.inner.schema.deleted_at_column() {
            all.push(Predicate::is_null(column));
        }
        all.push(predicate);
        Predicate::and(all)
    }

    fn resolve_limit(&self, requested: Option<u64>, fallback: u64) -> AppResult<u64> {
        match requested.unwrap_or(fallback) {
            0 => Err(AppError::invalid_limit("limit must be greater than zero")),
            limit => Ok(limit.min(self.inner.listing.max_limit)),
        }
    }

    fn relations_for(&self, includes: &[String]) -> AppResult<Vec<Arc<dyn Relation<T>>>> {
        includes
            .iter()
            .map(|name| {
                self.inner
                    .relations
                    .get(name)
                    .cloned()
                    .ok_or_else(|| AppError::validation(format!("unknown relation '{name}'")))
            })
            .collect()
    }
}

fn decode_row<T: StoredRecord>(row: &PgRow) -> AppResult<T> {
    T::from_row(row).map_err(|e| map_sqlx_error(e, "Failed to decode row"))
}

fn value_of<T: Record>(record: &T, field: &Field) -> AppResult<SqlValue> {
    record
        .value(field.name)
        .ok_or_else(|| AppError::invalid_model(format!("record has no value for '{}'", field.name)))
}

/// Current time at the precision Postgres stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
