//! Content storage backends.
//!
//! [`Database`] is a local SQLite store used by the CLI and the test suite;
//! [`RestClient`] talks to the hosted PostgREST API. Both implement
//! [`ContentStore`], which is all the scoring services depend on.
#[cfg(test)]
pub(crate) mod mock;
mod posts;
mod related;
mod rest;
mod schema;
mod search;
mod store;
mod taxonomy;
mod types;

pub use rest::RestClient;
pub use schema::Database;
pub use store::ContentStore;
pub use types::StoreError;
