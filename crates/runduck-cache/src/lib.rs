//! `runduck-cache`: cache-or-fetch access to orchestrator data.
//!
//! Every kind of data runduck reads is registered once in [`descriptor`]
//! with its upstream path, fixture file and cache location. A
//! [`DataAccessor`] resolves those against one environment and serves reads
//! from the shared [`CacheStore`] first, falling back to a [`LiveSource`]
//! (the HTTP API or sample files) and writing the answer through.

pub mod accessor;
pub mod api;
pub mod descriptor;
pub mod error;
pub mod fixture;
pub mod source;
pub mod store;
pub mod template;

pub use accessor::{DataAccessor, Fetched};
pub use api::ApiSource;
pub use descriptor::{validate_registry, DataKind, Descriptor, Format};
pub use error::{CacheError, Result};
pub use fixture::FixtureSource;
pub use source::LiveSource;
pub use store::{CacheStore, MemoryStore, RedisStore};
pub use template::{render, Params};
