//! Live-config row operations.
//!
//! A single mutable row (id = 1), latest write wins. History of live-link
//! changes is deliberately not kept.

use super::connection::SqliteStore;
use crate::Error;
use crate::model::LiveConfigRecord;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl SqliteStore {
    /// Insert or overwrite the single live-config row.
    pub async fn put_live(&self, record: &LiveConfigRecord) -> Result<(), Error> {
        let record = record.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO live_config (id, current_live_url, updated_by, updated_at)
                     VALUES (1, ?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET
                        current_live_url = excluded.current_live_url,
                        updated_by = excluded.updated_by,
                        updated_at = excluded.updated_at",
                    params![&record.current_live_url, &record.updated_by, &record.updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The authoritative live config, if one has ever been set.
    pub async fn get_live(&self) -> Result<Option<LiveConfigRecord>, Error> {
        self.conn
            .call(|conn| -> Result<Option<LiveConfigRecord>, Error> {
                let result = conn.query_row(
                    "SELECT current_live_url, updated_by, updated_at FROM live_config WHERE id = 1",
                    [],
                    |row| {
                        Ok(LiveConfigRecord {
                            current_live_url: row.get(0)?,
                            updated_by: row.get(1)?,
                            updated_at: row.get(2)?,
                        })
                    },
                );

                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}
