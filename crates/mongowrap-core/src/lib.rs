//! mongowrap core — shared types for the document store wrapper.
//!
//! This crate provides:
//! - The error type returned by every operation ([`StoreError`])
//! - Identifier translation between the storage `_id` field and the
//!   public `id` field ([`document`])
//! - The driver seam implemented by database backends
//!   ([`Connector`], [`DocumentDriver`])

pub mod document;
pub mod driver;
pub mod error;

pub use bson;
pub use document::{INTERNAL_ID, PUBLIC_ID, Payload};
pub use driver::{Connector, DatabaseInfo, DocumentDriver, QueryOptions};
pub use error::{StoreError, StoreResult};
