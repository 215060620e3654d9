//! SQLite-backed KvStore
//!
//! All rows live in one `kv` table keyed by BLOB. SQLite compares blobs with
//! memcmp, which gives the same ordering as the in-memory backend.

use super::{increment_prefix, BatchOp, KvPair, KvStore, WriteBatch};
use crate::core_store::store::errors::StoreResult;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};
use std::path::Path;
use tracing::debug;

/// Pool size for file-backed databases
const FILE_POOL_SIZE: u32 = 8;

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS kv (
        key BLOB PRIMARY KEY NOT NULL,
        value BLOB NOT NULL
    ) WITHOUT ROWID;
"#;

pub struct SqliteKv {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteKv {
    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA journal_mode = WAL;"));
        let pool = Pool::builder().max_size(FILE_POOL_SIZE).build(manager)?;
        debug!(path = %path.display(), "opened sqlite kv store");
        Self::with_pool(pool)
    }

    /// Private in-memory database.
    ///
    /// Every SQLite memory connection is its own database, so the pool holds
    /// exactly one connection.
    pub fn in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::with_pool(pool)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>) -> StoreResult<Self> {
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        Ok(Self { pool })
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut put = tx.prepare_cached("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")?;
            let mut delete = tx.prepare_cached("DELETE FROM kv WHERE key = ?1")?;
            for op in batch.ops() {
                match op {
                    BatchOp::Put { key, value } => {
                        put.execute(params![key, value])?;
                    }
                    BatchOp::Delete { key } => {
                        delete.execute(params![key])?;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn scan(
        &self,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        reverse: bool,
        limit: usize,
    ) -> StoreResult<Vec<KvPair>> {
        let mut sql = String::from("SELECT key, value FROM kv WHERE key >= ?");
        let mut args: Vec<Value> = vec![Value::Blob(prefix.to_vec())];

        if let Some(end) = increment_prefix(prefix) {
            sql.push_str(" AND key < ?");
            args.push(Value::Blob(end));
        }
        if let Some(cursor) = start_after {
            sql.push_str(if reverse { " AND key < ?" } else { " AND key > ?" });
            args.push(Value::Blob(cursor.to_vec()));
        }
        sql.push_str(if reverse { " ORDER BY key DESC" } else { " ORDER BY key ASC" });
        sql.push_str(" LIMIT ?");
        args.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hub.db");
        {
            let kv = SqliteKv::open(&path).unwrap();
            kv.put(b"alpha".to_vec(), b"1".to_vec()).unwrap();
        }
        let kv = SqliteKv::open(&path).unwrap();
        assert_eq!(kv.get(b"alpha").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let kv = SqliteKv::in_memory().unwrap();
        kv.commit(WriteBatch::new()).unwrap();
        assert!(kv.scan(&[], None, false, 10).unwrap().is_empty());
    }
}
