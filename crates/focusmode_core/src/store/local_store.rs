//! SQLite-backed document store with named collections.
//!
//! # Responsibility
//! - Provide get-all/get/set/delete per collection over JSON documents.
//! - Assign local identity and timestamps on write.
//!
//! # Invariants
//! - `(collection, id)` is unique; `set` with a known id overwrites in place.
//! - `created_at` of an existing document is never changed by `set`.
//! - `updated_at` is stamped on every write.
//! - `get_all` returns documents newest first.

use crate::db::{open_db, open_db_in_memory, DbError};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

const ID_FIELD: &str = "id";
const CREATED_AT_FIELD: &str = "created_at";
const UPDATED_AT_FIELD: &str = "updated_at";
const COLLECTION_NAME_MAX_CHARS: usize = 32;

/// One stored entity object.
pub type Document = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Local store failure.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying storage medium failed (open, I/O, SQL).
    Db(DbError),
    /// Document could not be encoded or decoded.
    Serde(serde_json::Error),
    NotFound {
        collection: String,
        id: String,
    },
    InvalidCollection(String),
    InvalidData(String),
}

impl StoreError {
    /// Returns whether this error is a plain missing-document answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "local store failure: {err}"),
            Self::Serde(err) => write!(f, "local document encoding failure: {err}"),
            Self::NotFound { collection, id } => {
                write!(f, "document `{id}` not found in `{collection}`")
            }
            Self::InvalidCollection(name) => write!(f, "invalid collection name `{name}`"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serde(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Persistent collection store.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    /// Opens the store file at `path`, creating and migrating it if needed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a throwaway in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Returns every document of `collection`, newest first.
    pub fn get_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        validate_collection(collection)?;
        let mut stmt = self.conn.prepare(
            "SELECT doc_id, body
             FROM documents
             WHERE collection = ?1
             ORDER BY created_at DESC, seq DESC;",
        )?;
        let mut rows = stmt.query([collection])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let doc_id: String = row.get("doc_id")?;
            let body: String = row.get("body")?;
            documents.push(parse_body(collection, &doc_id, &body)?);
        }
        Ok(documents)
    }

    /// Returns one document by id text.
    pub fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        validate_collection(collection)?;
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|body| parse_body(collection, id, &body))
            .transpose()
    }

    /// Inserts `document` when it has no id, else overwrites the matching id.
    ///
    /// Returns the stored document including assigned id and timestamps.
    pub fn set(&self, collection: &str, mut document: Document) -> StoreResult<Document> {
        validate_collection(collection)?;
        let doc_id = match document.get(ID_FIELD) {
            None | Some(Value::Null) => {
                let generated = Uuid::new_v4().to_string();
                document.insert(ID_FIELD.to_string(), Value::String(generated.clone()));
                generated
            }
            Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Some(Value::Number(number)) => number.to_string(),
            Some(other) => {
                return Err(StoreError::InvalidData(format!(
                    "unsupported id value `{other}` for `{collection}`"
                )));
            }
        };

        let now = Utc::now();
        let created_at = match self.get(collection, &doc_id)? {
            Some(existing) => read_timestamp(&existing, CREATED_AT_FIELD)?.unwrap_or(now),
            None => read_timestamp(&document, CREATED_AT_FIELD)?.unwrap_or(now),
        };
        document.insert(
            CREATED_AT_FIELD.to_string(),
            Value::String(format_timestamp(created_at)),
        );
        document.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(format_timestamp(now)),
        );

        let body = serde_json::to_string(&document)?;
        let result = self.conn.execute(
            "INSERT INTO documents (collection, doc_id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (collection, doc_id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at;",
            params![
                collection,
                doc_id.as_str(),
                body,
                created_at.timestamp_millis(),
                now.timestamp_millis(),
            ],
        );
        if let Err(err) = result {
            error!(
                "event=store_set module=store status=error collection={collection} error={err}"
            );
            return Err(err.into());
        }

        debug!("event=store_set module=store status=ok collection={collection} id={doc_id}");
        Ok(document)
    }

    /// Deletes one document; a missing id is reported as `NotFound`.
    pub fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        validate_collection(collection)?;
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
            params![collection, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        debug!("event=store_delete module=store status=ok collection={collection} id={id}");
        Ok(())
    }

    /// Writes one settings value, replacing any previous value.
    pub fn save_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    pub fn load_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Removes one settings value; removing a missing key is a no-op.
    pub fn clear_setting(&self, key: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Formats a timestamp the way documents store it (RFC 3339, millis, `Z`).
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn read_timestamp(document: &Document, field: &str) -> StoreResult<Option<DateTime<Utc>>> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(text)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|err| StoreError::InvalidData(format!("invalid `{field}` value `{text}`: {err}"))),
        Some(other) => Err(StoreError::InvalidData(format!(
            "invalid `{field}` value `{other}`"
        ))),
    }
}

fn parse_body(collection: &str, doc_id: &str, body: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(document) => Ok(document),
        _ => Err(StoreError::InvalidData(format!(
            "document `{doc_id}` in `{collection}` is not a JSON object"
        ))),
    }
}

fn validate_collection(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && name.chars().count() <= COLLECTION_NAME_MAX_CHARS
        && name.chars().all(|c| c.is_ascii_lowercase() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}
