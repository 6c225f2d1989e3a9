//! Document store client.
//!
//! Wraps a [`DocumentDriver`] behind a small CRUD surface. Every document
//! crossing the API carries its identifier as `id`; the driver only ever
//! sees `_id`.

use std::sync::OnceLock;

use mongowrap_core::bson::{Bson, Document};
use mongowrap_core::document::{
    INTERNAL_ID, Payload, document_to_public, insert_to_storage, query_to_storage,
    replacement_to_storage,
};
use mongowrap_core::driver::{Connector, DocumentDriver, QueryOptions};
use mongowrap_core::error::{StoreError, StoreResult};
use tracing::{debug, info};

use crate::bootstrap::{self, BootstrapOutcome};
use crate::config::{Credentials, StoreConfig};

/// Client for one document database.
///
/// Generic over the connector so that the client has no dependency on a
/// particular database backend. The connection is opened once by
/// [`connect`](Self::connect) and shared by every operation afterwards;
/// wrap the client in an `Arc` to use it from several tasks.
pub struct DocumentStoreClient<C: Connector> {
    config: StoreConfig,
    unauthenticated_user: Credentials,
    connection_uri: String,
    connector: C,
    driver: OnceLock<C::Driver>,
}

impl<C: Connector> DocumentStoreClient<C> {
    /// Validate `config` and prepare a client. No connection is made.
    pub fn new(config: StoreConfig, connector: C) -> StoreResult<Self> {
        let unauthenticated_user = config.unauthenticated_user()?.clone();
        let connection_uri = config.connection_uri();

        info!(
            host = %config.host(),
            port = config.port(),
            database = %config.db_name(),
            "Initializing MongoDB"
        );

        Ok(Self {
            config,
            unauthenticated_user,
            connection_uri,
            connector,
            driver: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn connection_uri(&self) -> &str {
        &self.connection_uri
    }

    pub fn database_name(&self) -> &str {
        self.config.db_name()
    }

    pub fn is_connected(&self) -> bool {
        self.driver.get().is_some()
    }

    /// Open the connection and bootstrap the unauthenticated user.
    ///
    /// A failure to reach the database is returned as
    /// [`StoreError::Connection`] and nothing else is attempted. The client
    /// only counts as connected once the bootstrap has succeeded, so a
    /// failed connect can be retried.
    pub async fn connect(&self) -> StoreResult<BootstrapOutcome> {
        if self.is_connected() {
            return Err(StoreError::AlreadyConnected);
        }

        info!(database = %self.database_name(), "Connecting to MongoDB");
        let driver = self.connector.connect(&self.connection_uri).await?;
        let outcome = bootstrap::ensure_unauthenticated_user(
            &driver,
            self.database_name(),
            &self.unauthenticated_user,
        )
        .await?;

        if self.driver.set(driver).is_err() {
            return Err(StoreError::AlreadyConnected);
        }
        Ok(outcome)
    }

    /// Count documents matching `query` (all documents when `None`).
    pub async fn count(
        &self,
        collection: &str,
        query: Option<Document>,
        options: Option<QueryOptions>,
    ) -> StoreResult<u64> {
        let driver = self.driver_for(collection)?;
        let mut query = query.unwrap_or_default();
        query_to_storage(&mut query);

        debug!(collection, "count");
        driver
            .count(collection, query, options.unwrap_or_default())
            .await
    }

    /// Fetch every document matching `query`.
    pub async fn find(
        &self,
        collection: &str,
        mut query: Document,
        options: Option<QueryOptions>,
    ) -> StoreResult<Vec<Document>> {
        let driver = self.driver_for(collection)?;
        query_to_storage(&mut query);

        debug!(collection, "find");
        let docs = driver
            .find(collection, query, options.unwrap_or_default())
            .await?;
        Ok(docs.into_iter().map(document_to_public).collect())
    }

    /// Fetch the document with the given id, if any.
    pub async fn get(
        &self,
        collection: &str,
        id: impl Into<Bson>,
    ) -> StoreResult<Option<Document>> {
        let driver = self.driver_for(collection)?;
        let filter = id_filter(id.into());

        debug!(collection, "get");
        let doc = driver.find_one(collection, filter).await?;
        Ok(doc.map(document_to_public))
    }

    /// Replace the document with the given id by `data`.
    ///
    /// Any id carried by `data` is ignored. Nothing is written when no
    /// document has that id.
    pub async fn put(
        &self,
        collection: &str,
        id: impl Into<Bson>,
        data: Document,
    ) -> StoreResult<()> {
        let driver = self.driver_for(collection)?;
        let id = id.into();
        let filter = id_filter(id.clone());
        let replacement = replacement_to_storage(data, id);

        debug!(collection, "put");
        let matched = driver.replace_one(collection, filter, replacement).await?;
        if matched == 0 {
            debug!(collection, "put matched no document");
        }
        Ok(())
    }

    /// Insert one document or a batch, returning what was stored.
    ///
    /// Documents without an `id` get a generated one. The result has the
    /// same shape as the input.
    pub async fn post(
        &self,
        collection: &str,
        data: impl Into<Payload>,
    ) -> StoreResult<Payload> {
        let driver = self.driver_for(collection)?;
        let stored = data.into().map(insert_to_storage);
        if stored.is_empty() {
            return Ok(stored);
        }

        debug!(collection, count = stored.len(), "post");
        driver
            .insert_many(collection, stored.clone().into_documents())
            .await?;
        Ok(stored.map(document_to_public))
    }

    /// Remove the document with the given id.
    pub async fn del(&self, collection: &str, id: impl Into<Bson>) -> StoreResult<()> {
        let driver = self.driver_for(collection)?;
        let filter = id_filter(id.into());

        debug!(collection, "del");
        driver.delete_one(collection, filter).await?;
        Ok(())
    }

    fn driver(&self) -> StoreResult<&C::Driver> {
        self.driver.get().ok_or(StoreError::NotConnected)
    }

    /// Validate the collection name, then require a connection.
    fn driver_for(&self, collection: &str) -> StoreResult<&C::Driver> {
        if collection.is_empty() {
            return Err(StoreError::InvalidArgument {
                message: "collection name must not be empty".into(),
            });
        }
        self.driver()
    }
}

fn id_filter(id: Bson) -> Document {
    let mut filter = Document::new();
    filter.insert(INTERNAL_ID, id);
    filter
}
