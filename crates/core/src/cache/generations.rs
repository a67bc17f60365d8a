//! Generation and entry operations for the SQLite store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{CacheStorage, lookup_key, storable_key};
use crate::Error;
use crate::http::{Request, Response, ResponseSource};

const OPEN_GENERATION: &str = "INSERT OR IGNORE INTO generations (name, created_at, seq)
     VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM generations))";

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(OPEN_GENERATION, params![generation, now])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, generation: &str, request: &Request, response: Response) -> Result<(), Error> {
        let key = storable_key(request)?;
        let generation = generation.to_string();
        let url = request.url.clone();
        let now = chrono::Utc::now().to_rfc3339();
        let headers_json = serde_json::to_string(&response.headers)?;
        let status = response.status;
        let response_url = response.url.clone();
        let body = response.into_body().to_vec();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(OPEN_GENERATION, params![&generation, &now])?;
                tx.execute(
                    "INSERT INTO entries (generation, key, url, status, response_url, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(generation, key) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        response_url = excluded.response_url,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![&generation, &key, &url, status, &response_url, &headers_json, &body, &now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        let Some(key) = lookup_key(request) else {
            return Ok(None);
        };
        let generation = generation.to_string();

        let row = self
            .conn
            .call(move |conn| -> Result<Option<(u16, String, String, Vec<u8>)>, Error> {
                let result = conn.query_row(
                    "SELECT status, response_url, headers_json, body
                     FROM entries WHERE generation = ?1 AND key = ?2",
                    params![generation, key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((status, response_url, headers_json, body)) = row else {
            return Ok(None);
        };

        let mut response = Response::new(status, response_url, body, ResponseSource::Cache);
        response.headers = serde_json::from_str::<BTreeMap<String, String>>(&headers_json)?;
        Ok(Some(response))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
