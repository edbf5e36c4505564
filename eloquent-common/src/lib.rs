//! # Eloquent Common Library
//!
//! Shared code for the Eloquent services:
//! - Error type and `Result` alias
//! - TOML bootstrap configuration helpers
//! - Object storage abstraction (filesystem and in-memory backends)

pub mod config;
pub mod error;
pub mod storage;

pub use error::{Error, Result};
pub use storage::{FsObjectStore, MemoryObjectStore, ObjectStore};
