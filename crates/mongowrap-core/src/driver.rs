//! Driver trait definitions for document database access.
//!
//! The wrapper never talks to a database directly. A [`Connector`] opens
//! a connection from a URI and hands back a [`DocumentDriver`], which
//! exposes the handful of collection primitives the wrapper needs. All
//! writes are acknowledged before the returned future resolves.
//!
//! Documents passed to and returned from a driver use storage naming
//! (`_id`); translation to the public `id` happens above this layer.

use bson::{Bson, Document};

use crate::error::StoreResult;

/// Pass-through options for count and find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    /// Ignored by count.
    pub projection: Option<Document>,
}

/// A database as reported by the server's database listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub name: String,
    pub empty: bool,
}

/// Opens connections for a particular backend.
pub trait Connector: Send + Sync {
    type Driver: DocumentDriver;

    /// Connect using a `mongodb://` URI. The URI path names the database
    /// that every collection operation targets.
    fn connect(&self, uri: &str) -> impl Future<Output = StoreResult<Self::Driver>> + Send;
}

/// Collection-level primitives of a connected document database.
pub trait DocumentDriver: Send + Sync {
    fn list_databases(&self) -> impl Future<Output = StoreResult<Vec<DatabaseInfo>>> + Send;

    fn count(
        &self,
        collection: &str,
        filter: Document,
        options: QueryOptions,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Materialize every matching document.
    fn find(
        &self,
        collection: &str,
        filter: Document,
        options: QueryOptions,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Replace the first document matching `filter`. Does not insert when
    /// nothing matches. Returns the number of matched documents.
    fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Insert documents in order. Every document must carry `_id`.
    /// Returns the inserted ids in insertion order.
    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> impl Future<Output = StoreResult<Vec<Bson>>> + Send;

    /// Returns the number of deleted documents.
    fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> impl Future<Output = StoreResult<u64>> + Send;
}
