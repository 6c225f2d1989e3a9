//! Identifier translation between the storage layer and the public API.
//!
//! MongoDB keys every document by `_id`. Callers of the wrapper only ever
//! see `id`. The functions here are applied at each boundary:
//!
//! | boundary                  | function                    |
//! |---------------------------|-----------------------------|
//! | query in (count/find)     | [`query_to_storage`]        |
//! | document in (put)         | [`replacement_to_storage`]  |
//! | document in (post)        | [`insert_to_storage`]       |
//! | document out (find/get/post) | [`document_to_public`]   |

use bson::{Bson, Document};
use uuid::Uuid;

/// Storage-layer primary key field.
pub const INTERNAL_ID: &str = "_id";

/// API-facing identifier field.
pub const PUBLIC_ID: &str = "id";

/// Generate a new document identifier (UUID v4 string).
pub fn generate_id() -> Bson {
    Bson::String(Uuid::new_v4().to_string())
}

/// Rename a public `id` filter to `_id`, in place.
pub fn query_to_storage(query: &mut Document) {
    if let Some(id) = query.remove(PUBLIC_ID) {
        query.insert(INTERNAL_ID, id);
    }
}

/// Rename `_id` to `id` on a document leaving the storage layer.
///
/// The field keeps its position. A document without `_id` is returned
/// unchanged.
pub fn document_to_public(doc: Document) -> Document {
    if !doc.contains_key(INTERNAL_ID) {
        return doc;
    }
    doc.into_iter()
        .filter(|(key, _)| key != PUBLIC_ID)
        .map(|(key, value)| {
            if key == INTERNAL_ID {
                (PUBLIC_ID.to_string(), value)
            } else {
                (key, value)
            }
        })
        .collect()
}

/// Build the stored form of a replacement document.
///
/// Any identifier carried by `data` is dropped; `id` always wins.
pub fn replacement_to_storage(data: Document, id: Bson) -> Document {
    let mut stored = Document::new();
    stored.insert(INTERNAL_ID, id);
    for (key, value) in data {
        if key != PUBLIC_ID && key != INTERNAL_ID {
            stored.insert(key, value);
        }
    }
    stored
}

/// Build the stored form of a new document.
///
/// A non-null public `id` becomes `_id`; otherwise a fresh id is
/// generated.
pub fn insert_to_storage(mut data: Document) -> Document {
    let id = match data.remove(PUBLIC_ID) {
        None | Some(Bson::Null) => generate_id(),
        Some(id) => id,
    };
    replacement_to_storage(data, id)
}

/// One document or an ordered batch of documents.
///
/// Inserts return the same shape they were given.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    One(Document),
    Many(Vec<Document>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::One(_) => 1,
            Payload::Many(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into an ordered list of documents.
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            Payload::One(doc) => vec![doc],
            Payload::Many(docs) => docs,
        }
    }

    /// Apply `f` to every document, keeping the shape.
    pub fn map<F>(self, mut f: F) -> Payload
    where
        F: FnMut(Document) -> Document,
    {
        match self {
            Payload::One(doc) => Payload::One(f(doc)),
            Payload::Many(docs) => Payload::Many(docs.into_iter().map(f).collect()),
        }
    }

    pub fn into_one(self) -> Option<Document> {
        match self {
            Payload::One(doc) => Some(doc),
            Payload::Many(_) => None,
        }
    }
}

impl From<Document> for Payload {
    fn from(doc: Document) -> Self {
        Payload::One(doc)
    }
}

impl From<Vec<Document>> for Payload {
    fn from(docs: Vec<Document>) -> Self {
        Payload::Many(docs)
    }
}
