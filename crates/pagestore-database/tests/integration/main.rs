//! End-to-end store tests against a real PostgreSQL.
//!
//! Set `PAGESTORE_TEST_DATABASE_URL` to run them; without it every test
//! returns early.

mod helpers;
mod mutation_test;
mod transaction_test;
