//! Core types and shared functionality for intercache.
//!
//! This crate provides:
//! - Versioned cache stores (in-memory and SQLite backends)
//! - The request/response model shared across the workspace
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod http;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use http::{CacheKey, Request, RequestMode, Response};
pub use store::{CacheStorage, MemoryStorage, SqliteStorage, Store};
