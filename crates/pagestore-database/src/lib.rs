//! # pagestore-database
//!
//! PostgreSQL access for Pagestore: the connection pool, the [`Executor`]
//! seam, a small statement builder, the filter compiler, the paginator, the
//! generic [`Store`] and the nested-transaction [`UnitOfWork`].

pub mod connection;
pub mod error;
pub mod executor;
pub mod filter;
pub mod paginator;
pub mod sql;
pub mod store;
pub mod uow;


pub use connection::DatabasePool;
pub use executor::{Executor, PgExecutor, TxExecutor};
pub use filter::FilterCompiler;
pub use paginator::Paginator;
pub use store::{Relation, Store, StoreBuilder, StoredRecord, UpsertOutcome, collect_keys};
pub use uow::UnitOfWork;
