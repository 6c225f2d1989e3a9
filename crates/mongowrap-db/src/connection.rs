//! MongoDB connection management and collection primitives.

use mongodb::bson::{Bson, Document, doc};
use mongodb::options::{
    Acknowledgment, ClientOptions, CollectionOptions, CountOptions, FindOptions, WriteConcern,
};
use mongodb::{Client, Collection, Database};
use mongowrap_core::driver::{Connector, DatabaseInfo, DocumentDriver, QueryOptions};
use mongowrap_core::error::{StoreError, StoreResult};
use tracing::{debug, info, warn};

use crate::error::DbError;

/// Opens [`MongoDriver`] connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

impl Connector for MongoConnector {
    type Driver = MongoDriver;

    async fn connect(&self, uri: &str) -> StoreResult<MongoDriver> {
        MongoDriver::connect(uri).await.map_err(|e| {
            warn!(error = %e, "Failed to connect to MongoDB");
            StoreError::Connection(e.to_string())
        })
    }
}

/// A connected MongoDB client bound to the URI's database.
#[derive(Debug, Clone)]
pub struct MongoDriver {
    client: Client,
    db: Database,
}

impl MongoDriver {
    /// Connect to MongoDB using a `mongodb://` URI.
    ///
    /// The URI must name a database. The server is pinged before
    /// returning, so an unreachable server fails here rather than on the
    /// first collection operation.
    pub async fn connect(uri: &str) -> Result<Self, DbError> {
        let options = ClientOptions::parse(uri).await?;
        let db_name = options
            .default_database
            .clone()
            .ok_or_else(|| DbError::InvalidUri("missing database name".into()))?;

        debug!(hosts = options.hosts.len(), "Resolved MongoDB hosts");

        let client = Client::with_options(options)?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!(database = %db_name, "Successfully connected to MongoDB");

        let db = client.database(&db_name);
        Ok(Self { client, db })
    }

    /// Returns a reference to the underlying MongoDB client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the database every collection operation targets.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Collection handle whose writes wait for acknowledgment.
    fn collection(&self, name: &str) -> Collection<Document> {
        let mut write_concern = WriteConcern::default();
        write_concern.w = Some(Acknowledgment::Nodes(1));

        let mut options = CollectionOptions::default();
        options.write_concern = Some(write_concern);

        self.db.collection_with_options(name, options)
    }
}

impl DocumentDriver for MongoDriver {
    async fn list_databases(&self) -> StoreResult<Vec<DatabaseInfo>> {
        let specs = self.client.list_databases().await.map_err(DbError::from)?;
        Ok(specs
            .into_iter()
            .map(|spec| DatabaseInfo {
                name: spec.name,
                empty: spec.empty,
            })
            .collect())
    }

    async fn count(
        &self,
        collection: &str,
        filter: Document,
        options: QueryOptions,
    ) -> StoreResult<u64> {
        let mut count_options = CountOptions::default();
        count_options.skip = options.skip;
        count_options.limit = options.limit.map(i64::unsigned_abs).filter(|&n| n > 0);

        let count = self
            .collection(collection)
            .count_documents(filter)
            .with_options(count_options)
            .await
            .map_err(DbError::from)?;
        Ok(count)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: QueryOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut find_options = FindOptions::default();
        find_options.sort = options.sort;
        find_options.skip = options.skip;
        find_options.limit = options.limit;
        find_options.projection = options.projection;

        let mut cursor = self
            .collection(collection)
            .find(filter)
            .with_options(find_options)
            .await
            .map_err(DbError::from)?;

        let mut docs = Vec::new();
        while cursor.advance().await.map_err(DbError::from)? {
            docs.push(cursor.deserialize_current().map_err(DbError::from)?);
        }
        Ok(docs)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        let doc = self
            .collection(collection)
            .find_one(filter)
            .await
            .map_err(DbError::from)?;
        Ok(doc)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .replace_one(filter, replacement)
            .await
            .map_err(|e| DbError::from_write(collection, e))?;
        Ok(result.matched_count)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> StoreResult<Vec<Bson>> {
        let result = self
            .collection(collection)
            .insert_many(docs)
            .await
            .map_err(|e| DbError::from_write(collection, e))?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .delete_one(filter)
            .await
            .map_err(|e| DbError::from_write(collection, e))?;
        Ok(result.deleted_count)
    }
}
