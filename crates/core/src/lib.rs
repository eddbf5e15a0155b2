//! Core types and shared functionality for srcview.
//!
//! This crate provides:
//! - Edge cache gateway with SQLite and in-memory stores
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheGateway, CacheKey, MemoryCache, open_gateway};
pub use config::{AppConfig, CacheBackend, ConfigError, Delivery};
pub use error::Error;
