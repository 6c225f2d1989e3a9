//! mongowrap database — driver implementations for the document store
//! wrapper.
//!
//! This crate provides:
//! - A MongoDB-backed driver ([`MongoConnector`], [`MongoDriver`])
//! - An in-process driver for development and tests ([`MemoryServer`],
//!   [`MemoryDriver`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod memory;

pub use connection::{MongoConnector, MongoDriver};
pub use error::DbError;
pub use memory::{MemoryDriver, MemoryServer};
