use rusqlite::Connection;

use crate::notes::PersistenceError;

pub fn apply(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            written_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}
