//! # storage-adapters
//!
//! Implementations of the `domains` repository and cache ports.
//!
//! * [`memory::MemoryStore`] keeps every table behind one lock; used by tests,
//!   the seed tool and database-less runs.
//! * [`cache::MemoryListingCache`] is the in-process listing cache.
//! * `postgres` (feature `db-postgres`) is the production store.
//! * `redis_cache` (feature `redis`) shares the listing cache between instances.

pub mod cache;
pub mod error;
pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis_cache;

pub use cache::MemoryListingCache;
pub use error::StorageError;
pub use memory::MemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgForumStore;

#[cfg(feature = "redis")]
pub use redis_cache::RedisListingCache;
