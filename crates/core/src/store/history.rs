//! Daily scan-history snapshots.
//!
//! Records are append-only and keyed by `(qr_number, date)`, so archiving
//! the same day twice (a retried request, a dinner scan followed by
//! rollover) is a harmless no-op.

use super::connection::SqliteStore;
use crate::Error;
use crate::model::{HistoryRecord, ScanHistory};
use tokio_rusqlite::params;

impl SqliteStore {
    /// Append one frozen snapshot. `INSERT OR IGNORE` keeps this idempotent.
    pub async fn insert_history(&self, record: &HistoryRecord) -> Result<(), Error> {
        let record = record.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO scan_history (qr_number, date, breakfast, lunch, dinner)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        &record.qr_number,
                        &record.date,
                        record.scan_history.breakfast as i32,
                        record.scan_history.lunch as i32,
                        record.scan_history.dinner as i32,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All archived days for one QR number, oldest first.
    pub async fn list_history(&self, qr_number: &str) -> Result<Vec<HistoryRecord>, Error> {
        let qr_number = qr_number.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<HistoryRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT qr_number, date, breakfast, lunch, dinner
                     FROM scan_history WHERE qr_number = ?1 ORDER BY date ASC",
                )?;
                let rows = stmt.query_map(params![qr_number], |row| {
                    Ok(HistoryRecord {
                        qr_number: row.get(0)?,
                        date: row.get(1)?,
                        scan_history: ScanHistory {
                            breakfast: row.get::<_, i32>(2)? == 1,
                            lunch: row.get::<_, i32>(3)? == 1,
                            dinner: row.get::<_, i32>(4)? == 1,
                        },
                    })
                })?;
                let mut records = Vec::new();
                for row in rows {
                    records.push(row.map_err(Error::from)?);
                }
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete all history for one QR number. Returns the removed count.
    pub async fn remove_history(&self, qr_number: &str) -> Result<u64, Error> {
        let qr_number = qr_number.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted =
                    conn.execute("DELETE FROM scan_history WHERE qr_number = ?1", params![qr_number])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
