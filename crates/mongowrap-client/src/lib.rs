//! mongowrap client — CRUD over a document database with a public `id`
//! field, plus first-connect bootstrap of the unauthenticated user.

pub mod bootstrap;
pub mod client;
pub mod config;

pub use bootstrap::BootstrapOutcome;
pub use client::DocumentStoreClient;
pub use config::{Credentials, StoreConfig};
