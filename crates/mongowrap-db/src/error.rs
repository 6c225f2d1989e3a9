//! Database-specific error types and conversions.

use mongodb::error::{ErrorKind, WriteFailure};
use mongowrap_core::error::StoreError;

/// MongoDB server code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Invalid connection URI: {0}")]
    InvalidUri(String),

    #[error("Duplicate key in {collection}: {detail}")]
    DuplicateKey { collection: String, detail: String },
}

impl DbError {
    /// Classify a write error, surfacing unique index violations.
    ///
    /// Server code 11000 from a single write or from any entry of an
    /// `insertMany` batch becomes [`DbError::DuplicateKey`].
    pub(crate) fn from_write(collection: &str, err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            DbError::DuplicateKey {
                collection: collection.to_string(),
                detail: err.to_string(),
            }
        } else {
            DbError::Mongo(err)
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::InsertMany(insert_error) => insert_error
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY_CODE)),
        _ => false,
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DuplicateKey { collection, detail } => {
                StoreError::DuplicateKey { collection, detail }
            }
            other => StoreError::Driver(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, from_document};
    use mongodb::error::WriteError;

    fn write_error(code: i32) -> mongodb::error::Error {
        let write_error: WriteError =
            from_document(doc! { "code": code, "errmsg": "E11000 duplicate key error" }).unwrap();
        mongodb::error::Error::from(ErrorKind::Write(WriteFailure::WriteError(write_error)))
    }

    #[test]
    fn duplicate_key_code_maps_to_store_duplicate_key() {
        let err = DbError::from_write("notes", write_error(DUPLICATE_KEY_CODE));
        assert!(matches!(err, DbError::DuplicateKey { ref collection, .. } if collection == "notes"));

        match StoreError::from(err) {
            StoreError::DuplicateKey { collection, detail } => {
                assert_eq!(collection, "notes");
                assert!(detail.contains("E11000"));
            }
            other => panic!("expected duplicate key, got {other:?}"),
        }
    }

    #[test]
    fn other_write_errors_stay_driver_errors() {
        let err = DbError::from_write("notes", write_error(121));
        assert!(matches!(err, DbError::Mongo(_)));
        assert!(matches!(StoreError::from(err), StoreError::Driver(_)));
    }
}
