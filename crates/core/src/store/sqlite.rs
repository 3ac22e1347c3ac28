//! SQLite-backed store with WAL mode and schema migrations.
//!
//! One database file holds every generation: a `stores` table names the
//! generations and an `entries` table holds the cached responses, cascading
//! on generation delete. Database operations run on a background thread
//! via tokio-rusqlite.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::{Connection, params, rusqlite};

use super::{CacheStorage, Store, key, migrations};
use crate::Error;
use crate::http::{CacheKey, Response};

/// Durable [`CacheStorage`] implementation.
#[derive(Clone, Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn connect_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStorage for SqliteStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Store>, Error> {
        let store_name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO stores (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![store_name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Arc::new(SqliteStore { conn: self.conn.clone(), name: name.to_string() }))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let store_name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                // foreign_keys=ON cascades the entry rows.
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![store_name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }
}

/// One named store inside a [`SqliteStorage`].
struct SqliteStore {
    conn: Connection,
    name: String,
}

#[async_trait]
impl Store for SqliteStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, Error> {
        let store_name = self.name.clone();
        let key_hash = key::entry_hash(key);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(i64, String, Vec<u8>)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body FROM entries
                     WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store_name, key_hash], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        match row {
            Some((status, headers_json, body)) => {
                let headers: HashMap<String, String> = serde_json::from_str(&headers_json)?;
                Ok(Some(Response { status: status as u16, headers, body: Bytes::from(body) }))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let store_name = self.name.clone();
        let key_hash = key::entry_hash(key);
        let method = key.method.clone();
        let url = key.url.clone();
        let status = response.status as i64;
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        store_name, key_hash, method, url, status,
                        headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(store_name, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![store_name, key_hash, method, url, status, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
