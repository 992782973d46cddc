//! Ordered schema steps for the store file.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};

/// `(version, sql)`; versions start at 1 and grow by one.
const STEPS: &[(u32, &str)] = &[
    (1, include_str!("0001_documents.sql")),
    (2, include_str!("0002_settings.sql")),
];

/// Newest schema version this build can read and write.
pub fn schema_version() -> u32 {
    STEPS.len() as u32
}

/// Brings `conn` up to [`schema_version`]; all pending steps share one transaction.
pub fn migrate(conn: &mut Connection) -> DbResult<()> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let supported = schema_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<_> = STEPS.iter().filter(|(version, _)| *version > found).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in pending {
        run_step(&tx, *version, sql)?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={found} to_version={supported}");
    Ok(())
}

fn run_step(tx: &Transaction<'_>, version: u32, sql: &str) -> DbResult<()> {
    tx.execute_batch(sql)?;
    // PRAGMA does not accept bound parameters.
    tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    debug!("event=db_migrate_step module=db status=ok version={version}");
    Ok(())
}
