//! In-process document store implementing the driver traits.
//!
//! Useful for development and tests where no MongoDB server is
//! available. Supports the subset of MongoDB behavior the wrapper relies
//! on: equality filters on top-level fields, sort on numeric and string
//! fields, skip/limit, projection, and `_id` uniqueness per collection.
//!
//! A [`MemoryServer`] is a cheap handle; clones share the same data.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use mongowrap_core::bson::oid::ObjectId;
use mongowrap_core::bson::{Bson, Document};
use mongowrap_core::document::INTERNAL_ID;
use mongowrap_core::driver::{Connector, DatabaseInfo, DocumentDriver, QueryOptions};
use mongowrap_core::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use tracing::debug;

const URI_SCHEME: &str = "mongodb://";

type Collections = BTreeMap<String, Vec<Document>>;

#[derive(Debug, Default)]
struct ServerState {
    databases: BTreeMap<String, Collections>,
    operations: u64,
}

/// Shared in-memory "server" that hands out [`MemoryDriver`] connections.
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
    unreachable: bool,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A server whose every connection attempt fails.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Number of driver operations executed against this server.
    ///
    /// Connecting is not counted.
    pub fn operation_count(&self) -> u64 {
        self.state.lock().operations
    }

    /// Register a database with no documents, if it does not exist yet.
    pub fn create_database(&self, name: &str) {
        self.state
            .lock()
            .databases
            .entry(name.to_string())
            .or_default();
    }

    /// Snapshot of a collection in storage form.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.state
            .lock()
            .databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default()
    }
}

impl Connector for MemoryServer {
    type Driver = MemoryDriver;

    async fn connect(&self, uri: &str) -> StoreResult<MemoryDriver> {
        if self.unreachable {
            return Err(StoreError::Connection(
                "memory server is unreachable".into(),
            ));
        }
        let database = database_from_uri(uri)?;
        debug!(database = %database, "Connected to memory server");
        Ok(MemoryDriver {
            state: Arc::clone(&self.state),
            database,
        })
    }
}

/// Extract the database name from the path of a `mongodb://` URI.
fn database_from_uri(uri: &str) -> StoreResult<String> {
    let rest = uri
        .strip_prefix(URI_SCHEME)
        .ok_or_else(|| StoreError::Connection("unsupported URI scheme".into()))?;
    let name = rest
        .split_once('/')
        .map(|(_, path)| path.split('?').next().unwrap_or_default())
        .unwrap_or_default();
    if name.is_empty() {
        return Err(StoreError::Connection("missing database name".into()));
    }
    Ok(name.to_string())
}

/// A connection to one database of a [`MemoryServer`].
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    state: Arc<Mutex<ServerState>>,
    database: String,
}

impl MemoryDriver {
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Run `f` against this database's collections, counting the call.
    fn with_collections<T>(&self, f: impl FnOnce(&mut Collections) -> T) -> T {
        let mut state = self.state.lock();
        state.operations += 1;
        let collections = state.databases.entry(self.database.clone()).or_default();
        f(collections)
    }

    /// Like [`with_collections`](Self::with_collections) but never creates
    /// the database.
    fn read_collection<T>(&self, collection: &str, f: impl FnOnce(&[Document]) -> T) -> T {
        let mut state = self.state.lock();
        state.operations += 1;
        let docs = state
            .databases
            .get(&self.database)
            .and_then(|collections| collections.get(collection))
            .map(Vec::as_slice)
            .unwrap_or_default();
        f(docs)
    }
}

impl DocumentDriver for MemoryDriver {
    async fn list_databases(&self) -> StoreResult<Vec<DatabaseInfo>> {
        let mut state = self.state.lock();
        state.operations += 1;
        Ok(state
            .databases
            .iter()
            .map(|(name, collections)| DatabaseInfo {
                name: name.clone(),
                empty: collections.values().all(Vec::is_empty),
            })
            .collect())
    }

    async fn count(
        &self,
        collection: &str,
        filter: Document,
        options: QueryOptions,
    ) -> StoreResult<u64> {
        let count = self.read_collection(collection, |docs| {
            let matched = docs.iter().filter(|doc| matches(doc, &filter));
            window(matched, options.skip, options.limit).count()
        });
        Ok(count as u64)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: QueryOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut matched: Vec<Document> = self.read_collection(collection, |docs| {
            docs.iter()
                .filter(|doc| matches(doc, &filter))
                .cloned()
                .collect()
        });

        if let Some(sort) = &options.sort {
            matched.sort_by(|a, b| compare_by(a, b, sort));
        }

        Ok(window(matched.into_iter(), options.skip, options.limit)
            .map(|doc| match &options.projection {
                Some(projection) => project(doc, projection),
                None => doc,
            })
            .collect())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        Ok(self.read_collection(collection, |docs| {
            docs.iter().find(|doc| matches(doc, &filter)).cloned()
        }))
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> StoreResult<u64> {
        self.with_collections(|collections| {
            let Some(docs) = collections.get_mut(collection) else {
                return Ok(0);
            };
            let Some(existing) = docs.iter_mut().find(|doc| matches(doc, &filter)) else {
                return Ok(0);
            };
            let current_id = existing.get(INTERNAL_ID).cloned().unwrap_or(Bson::Null);
            let replacement = match replacement.get(INTERNAL_ID).cloned() {
                Some(id) if id != current_id => {
                    return Err(StoreError::Driver(format!(
                        "replacement would change immutable field '{INTERNAL_ID}'"
                    )));
                }
                Some(_) => replacement,
                None => with_leading_id(replacement, current_id),
            };
            *existing = replacement;
            Ok(1)
        })
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> StoreResult<Vec<Bson>> {
        self.with_collections(|collections| {
            let stored = collections.entry(collection.to_string()).or_default();
            let mut ids = Vec::with_capacity(docs.len());
            for doc in docs {
                let doc = if doc.contains_key(INTERNAL_ID) {
                    doc
                } else {
                    with_leading_id(doc, Bson::ObjectId(ObjectId::new()))
                };
                let id = doc.get(INTERNAL_ID).cloned().unwrap_or(Bson::Null);
                if stored.iter().any(|existing| existing.get(INTERNAL_ID) == Some(&id)) {
                    return Err(StoreError::DuplicateKey {
                        collection: collection.to_string(),
                        detail: format!("{INTERNAL_ID}: {id}"),
                    });
                }
                stored.push(doc);
                ids.push(id);
            }
            Ok(ids)
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        self.with_collections(|collections| {
            let Some(docs) = collections.get_mut(collection) else {
                return Ok(0);
            };
            match docs.iter().position(|doc| matches(doc, &filter)) {
                Some(index) => {
                    docs.remove(index);
                    Ok(1)
                }
                None => Ok(0),
            }
        })
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| doc.get(key) == Some(expected))
}

/// Apply skip and limit. A limit of zero means no limit; a negative limit
/// behaves like its absolute value.
fn window<I: Iterator>(
    iter: I,
    skip: Option<u64>,
    limit: Option<i64>,
) -> std::iter::Take<std::iter::Skip<I>> {
    let skip = usize::try_from(skip.unwrap_or(0)).unwrap_or(usize::MAX);
    let limit = match limit.map(i64::unsigned_abs) {
        None | Some(0) => usize::MAX,
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
    };
    iter.skip(skip).take(limit)
}

fn with_leading_id(doc: Document, id: Bson) -> Document {
    let mut out = Document::new();
    out.insert(INTERNAL_ID, id);
    for (key, value) in doc {
        out.insert(key, value);
    }
    out
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        other => as_number(other).is_some_and(|n| n != 0.0),
    }
}

/// Missing fields sort first; mixed or unsupported types compare equal.
fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => match (as_number(x), as_number(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn compare_by(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (key, direction) in sort {
        let ordering = compare_values(a.get(key), b.get(key));
        let ordering = if as_number(direction).is_some_and(|d| d < 0.0) {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Apply an inclusion or exclusion projection. `_id` is kept unless
/// excluded explicitly.
fn project(doc: Document, projection: &Document) -> Document {
    let inclusion = projection
        .iter()
        .any(|(key, value)| key != INTERNAL_ID && is_truthy(value));
    let keep_id = projection.get(INTERNAL_ID).is_none_or(is_truthy);

    doc.into_iter()
        .filter(|(key, _)| {
            if key == INTERNAL_ID {
                return keep_id;
            }
            match projection.get(key) {
                Some(value) => is_truthy(value),
                None => !inclusion,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongowrap_core::bson::doc;

    #[test]
    fn database_name_is_taken_from_uri_path() {
        assert_eq!(
            database_from_uri("mongodb://localhost:27017/app").unwrap(),
            "app"
        );
        assert_eq!(
            database_from_uri("mongodb://u:p@host:1/app?authSource=admin").unwrap(),
            "app"
        );
    }

    #[test]
    fn uri_without_database_is_rejected() {
        assert!(database_from_uri("mongodb://localhost:27017").is_err());
        assert!(database_from_uri("mongodb://localhost:27017/").is_err());
        assert!(database_from_uri("http://localhost/app").is_err());
    }

    #[test]
    fn equality_filter_matches_top_level_fields() {
        let doc = doc! { "_id": "a", "n": 1, "tag": "x" };
        assert!(matches(&doc, &doc! {}));
        assert!(matches(&doc, &doc! { "n": 1, "tag": "x" }));
        assert!(!matches(&doc, &doc! { "n": 2 }));
        assert!(!matches(&doc, &doc! { "missing": 1 }));
    }

    #[test]
    fn sort_handles_mixed_numeric_types_and_direction() {
        let mut docs = vec![
            doc! { "n": 2.5 },
            doc! { "n": 1_i64 },
            doc! {},
            doc! { "n": 3 },
        ];
        docs.sort_by(|a, b| compare_by(a, b, &doc! { "n": -1 }));
        let values: Vec<Option<f64>> = docs
            .iter()
            .map(|d| d.get("n").and_then(as_number))
            .collect();
        assert_eq!(values, vec![Some(3.0), Some(2.5), Some(1.0), None]);
    }

    #[test]
    fn projection_inclusion_keeps_id() {
        let doc = doc! { "_id": "a", "name": "x", "secret": "y" };
        assert_eq!(
            project(doc.clone(), &doc! { "name": 1 }),
            doc! { "_id": "a", "name": "x" }
        );
        assert_eq!(
            project(doc.clone(), &doc! { "name": 1, "_id": 0 }),
            doc! { "name": "x" }
        );
        assert_eq!(
            project(doc, &doc! { "secret": 0 }),
            doc! { "_id": "a", "name": "x" }
        );
    }

    #[test]
    fn window_treats_zero_limit_as_unbounded() {
        let all: Vec<i32> = window(1..=5, None, Some(0)).collect();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
        let some: Vec<i32> = window(1..=5, Some(1), Some(-2)).collect();
        assert_eq!(some, vec![2, 3]);
    }
}
