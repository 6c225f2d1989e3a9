//! First-connect bootstrap of the unauthenticated user.
//!
//! When the configured database does not exist yet, or exists but holds
//! no data, a user record is written to the `users` collection so that
//! unauthenticated API calls have an account to act as. An existing,
//! non-empty database is left alone, which makes the bootstrap safe to
//! run on every connect.

use mongowrap_core::bson::{Bson, Document};
use mongowrap_core::document::{INTERNAL_ID, generate_id};
use mongowrap_core::driver::{DatabaseInfo, DocumentDriver};
use mongowrap_core::error::StoreResult;
use tracing::info;

use crate::config::Credentials;

/// Collection holding the bootstrap user record.
pub const USERS_COLLECTION: &str = "users";

/// What a connect did about the unauthenticated user.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// A user record was inserted with this `_id`.
    Created { id: Bson },
    /// The database already held data.
    Skipped,
}

/// Whether `db_name` is absent from `databases` or reported empty.
///
/// Emptiness is read from the matching entry only.
pub fn needs_bootstrap(databases: &[DatabaseInfo], db_name: &str) -> bool {
    databases
        .iter()
        .find(|db| db.name == db_name)
        .is_none_or(|db| db.empty)
}

fn user_record(user: &Credentials) -> Document {
    let mut record = Document::new();
    record.insert(INTERNAL_ID, generate_id());
    record.insert("username", user.username.as_str());
    record.insert("password", user.password.as_str());
    record
}

/// Insert the unauthenticated user if the database is new or empty.
pub async fn ensure_unauthenticated_user<D: DocumentDriver>(
    driver: &D,
    db_name: &str,
    user: &Credentials,
) -> StoreResult<BootstrapOutcome> {
    let databases = driver.list_databases().await?;

    if !needs_bootstrap(&databases, db_name) {
        info!(database = %db_name, "Database already populated, skipping bootstrap");
        return Ok(BootstrapOutcome::Skipped);
    }

    let record = user_record(user);
    let id = record.get(INTERNAL_ID).cloned().unwrap_or(Bson::Null);
    driver.insert_many(USERS_COLLECTION, vec![record]).await?;

    info!(
        database = %db_name,
        username = %user.username,
        "Created unauthenticated user"
    );

    Ok(BootstrapOutcome::Created { id })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(name: &str, empty: bool) -> DatabaseInfo {
        DatabaseInfo {
            name: name.into(),
            empty,
        }
    }

    #[test]
    fn bootstrap_when_database_absent() {
        assert!(needs_bootstrap(&[], "app"));
        assert!(needs_bootstrap(&[db("admin", false), db("local", false)], "app"));
    }

    #[test]
    fn bootstrap_when_database_empty() {
        assert!(needs_bootstrap(&[db("app", true), db("zzz", false)], "app"));
    }

    #[test]
    fn skip_when_database_populated() {
        assert!(!needs_bootstrap(&[db("app", false)], "app"));
    }

    #[test]
    fn emptiness_comes_from_the_matching_entry() {
        // The last entry is empty but the matching one is not.
        let dbs = [db("admin", false), db("app", false), db("scratch", true)];
        assert!(!needs_bootstrap(&dbs, "app"));
    }

    #[test]
    fn user_record_copies_credentials() {
        let record = user_record(&Credentials::new("anon", "anonpw"));
        assert_eq!(record.get_str("username").unwrap(), "anon");
        assert_eq!(record.get_str("password").unwrap(), "anonpw");
        assert!(!record.get_str(INTERNAL_ID).unwrap().is_empty());
        assert_eq!(record.keys().next().map(String::as_str), Some(INTERNAL_ID));
    }
}
