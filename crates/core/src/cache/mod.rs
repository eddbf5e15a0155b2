//! Edge cache for rendered preview pages.
//!
//! Entries are keyed by the canonical identity of the inbound request and
//! expire after a fixed TTL. Two stores implement the same gateway:
//!
//! - SQLite via tokio-rusqlite (WAL mode, migrations, periodic purge)
//! - In-process moka cache

pub mod connection;
pub mod entries;
pub mod gateway;
pub mod key;
pub mod memory;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, HTML_CONTENT_TYPE};
pub use gateway::{CacheGateway, open_gateway};
pub use key::{BYPASS_PARAM, CacheKey};
pub use memory::MemoryCache;
