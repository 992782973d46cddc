use focusmode_core::db::migrations::schema_version as supported_version;
use focusmode_core::db::{open_db, open_db_in_memory, DbError};
use focusmode_core::{LocalStore, StoreError};
use rusqlite::Connection;

#[test]
fn in_memory_store_has_documents_and_settings_tables() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), supported_version());
    assert_table_exists(&conn, "documents");
    assert_table_exists(&conn, "settings");
}

#[test]
fn reopening_store_file_keeps_schema_and_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("focusmode.sqlite3");

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), supported_version());
    conn.execute(
        "INSERT INTO documents (collection, doc_id, body, created_at, updated_at)
         VALUES ('notes', 'n-1', '{}', 0, 0);",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn version_one_database_is_upgraded_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            doc_id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (collection, doc_id)
        );
        PRAGMA user_version = 1;",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), supported_version());
    assert_table_exists(&conn, "settings");
}

#[test]
fn newer_schema_file_is_refused_and_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, supported_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    let store_err = LocalStore::open(&path).err().expect("store open should fail");
    assert!(matches!(store_err, StoreError::Db(ref err) if err.is_schema_too_new()));

    // The newer file is left as it was.
    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 999);
}

#[test]
fn store_directory_blocked_by_a_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("data");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let err = open_db(blocker.join("focusmode.sqlite3")).unwrap_err();
    match err {
        DbError::Io { path, .. } => assert_eq!(path, blocker),
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
