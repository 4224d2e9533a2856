//! QR code row operations.

use super::connection::SqliteStore;
use crate::Error;
use crate::mealtime::MealSlot;
use crate::model::{QrCode, ScanHistory};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Row};

const QR_COLUMNS: &str = "qr_number, image_url, blob_path, breakfast, lunch, dinner, scan_date, is_blocked, created_at";

fn slot_column(slot: MealSlot) -> &'static str {
    match slot {
        MealSlot::Breakfast => "breakfast",
        MealSlot::Lunch => "lunch",
        MealSlot::Dinner => "dinner",
    }
}

fn row_to_qr(row: &Row<'_>) -> Result<QrCode, rusqlite::Error> {
    Ok(QrCode {
        qr_number: row.get(0)?,
        image_url: row.get(1)?,
        blob_path: row.get(2)?,
        scan_history: ScanHistory {
            breakfast: row.get::<_, i32>(3)? == 1,
            lunch: row.get::<_, i32>(4)? == 1,
            dinner: row.get::<_, i32>(5)? == 1,
        },
        scan_date: row.get(6)?,
        is_blocked: row.get::<_, i32>(7)? == 1,
        created_at: row.get(8)?,
    })
}

impl SqliteStore {
    /// Get one QR code by number. Returns None if it doesn't exist.
    pub async fn get_qr(&self, qr_number: &str) -> Result<Option<QrCode>, Error> {
        let qr_number = qr_number.to_string();
        self.conn
            .call(move |conn| -> Result<Option<QrCode>, Error> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {QR_COLUMNS} FROM qr_codes WHERE qr_number = ?1"))?;

                let result = stmt.query_row(params![qr_number], row_to_qr);

                match result {
                    Ok(qr) => Ok(Some(qr)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Numerically highest assigned number, ignoring zero padding.
    pub async fn max_qr_number(&self) -> Result<Option<u64>, Error> {
        self.conn
            .call(|conn| -> Result<Option<u64>, Error> {
                let max: Option<i64> = conn
                    .query_row(
                        "SELECT MAX(CAST(qr_number AS INTEGER)) FROM qr_codes",
                        [],
                        |row| row.get(0),
                    )
                    .map_err(Error::from)?;
                Ok(max.map(|n| n as u64))
            })
            .await
            .map_err(Error::from)
    }

    pub async fn insert_qr(&self, qr: &QrCode) -> Result<(), Error> {
        let qr = qr.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO qr_codes (
                        qr_number, image_url, blob_path, breakfast, lunch, dinner,
                        scan_date, is_blocked, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        &qr.qr_number,
                        &qr.image_url,
                        &qr.blob_path,
                        qr.scan_history.breakfast as i32,
                        qr.scan_history.lunch as i32,
                        qr.scan_history.dinner as i32,
                        &qr.scan_date,
                        qr.is_blocked as i32,
                        &qr.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Overwrite the mutable fields of an existing QR code.
    ///
    /// `qr_number` and `created_at` are immutable and never rewritten.
    pub async fn overwrite_qr(&self, qr: &QrCode) -> Result<(), Error> {
        let qr = qr.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE qr_codes SET
                        image_url = ?2,
                        blob_path = ?3,
                        breakfast = ?4,
                        lunch = ?5,
                        dinner = ?6,
                        scan_date = ?7,
                        is_blocked = ?8
                    WHERE qr_number = ?1",
                    params![
                        &qr.qr_number,
                        &qr.image_url,
                        &qr.blob_path,
                        qr.scan_history.breakfast as i32,
                        qr.scan_history.lunch as i32,
                        qr.scan_history.dinner as i32,
                        &qr.scan_date,
                        qr.is_blocked as i32,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Conditional flag write: the update only lands if the entity is still
    /// on `date` and the slot flag is still false, so the store itself
    /// rejects a concurrent duplicate scan.
    pub async fn mark_slot_if_unset(&self, qr_number: &str, date: &str, slot: MealSlot) -> Result<bool, Error> {
        let qr_number = qr_number.to_string();
        let date = date.to_string();
        let column = slot_column(slot);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let updated = conn.execute(
                    &format!(
                        "UPDATE qr_codes SET {column} = 1
                         WHERE qr_number = ?1 AND scan_date = ?2 AND {column} = 0"
                    ),
                    params![qr_number, date],
                )?;
                Ok(updated > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one QR code. Returns whether a row existed.
    pub async fn remove_qr(&self, qr_number: &str) -> Result<bool, Error> {
        let qr_number = qr_number.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM qr_codes WHERE qr_number = ?1", params![qr_number])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All QR codes in assignment order.
    pub async fn list_qr(&self) -> Result<Vec<QrCode>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<QrCode>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {QR_COLUMNS} FROM qr_codes ORDER BY CAST(qr_number AS INTEGER) ASC"
                ))?;
                let rows = stmt.query_map([], row_to_qr)?;
                let mut codes = Vec::new();
                for row in rows {
                    codes.push(row.map_err(Error::from)?);
                }
                Ok(codes)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_qr(number: &str) -> QrCode {
        QrCode {
            qr_number: number.to_string(),
            image_url: format!("https://blobs.example/qr-codes/qr-code-{number}.png"),
            blob_path: format!("qr-codes/qr-code-{number}.png"),
            scan_history: ScanHistory::default(),
            scan_date: None,
            is_blocked: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let qr = make_qr("001");

        store.insert_qr(&qr).await.unwrap();

        let found = store.get_qr("001").await.unwrap().unwrap();
        assert_eq!(found, qr);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert!(store.get_qr("404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_max_number_ignores_padding() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert_eq!(store.max_qr_number().await.unwrap(), None);

        store.insert_qr(&make_qr("009")).await.unwrap();
        store.insert_qr(&make_qr("010")).await.unwrap();

        assert_eq!(store.max_qr_number().await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_overwrite_updates_flags() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let mut qr = make_qr("001");
        store.insert_qr(&qr).await.unwrap();

        qr.scan_history.lunch = true;
        qr.scan_date = Some("2024-01-15".into());
        qr.is_blocked = true;
        store.overwrite_qr(&qr).await.unwrap();

        let found = store.get_qr("001").await.unwrap().unwrap();
        assert!(found.scan_history.lunch);
        assert!(found.is_blocked);
        assert_eq!(found.scan_date.as_deref(), Some("2024-01-15"));
    }

    #[tokio::test]
    async fn test_mark_slot_rejects_duplicate() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let mut qr = make_qr("001");
        qr.scan_date = Some("2024-01-15".into());
        store.insert_qr(&qr).await.unwrap();

        assert!(store.mark_slot_if_unset("001", "2024-01-15", MealSlot::Lunch).await.unwrap());
        // Second writer loses: flag is already set.
        assert!(!store.mark_slot_if_unset("001", "2024-01-15", MealSlot::Lunch).await.unwrap());

        let found = store.get_qr("001").await.unwrap().unwrap();
        assert!(found.scan_history.lunch);
    }

    #[tokio::test]
    async fn test_mark_slot_requires_matching_date() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let mut qr = make_qr("001");
        qr.scan_date = Some("2024-01-14".into());
        store.insert_qr(&qr).await.unwrap();

        assert!(!store.mark_slot_if_unset("001", "2024-01-15", MealSlot::Breakfast).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_reports_existence() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.insert_qr(&make_qr("001")).await.unwrap();

        assert!(store.remove_qr("001").await.unwrap());
        assert!(!store.remove_qr("001").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_in_numeric_order() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.insert_qr(&make_qr("010")).await.unwrap();
        store.insert_qr(&make_qr("002")).await.unwrap();

        let all = store.list_qr().await.unwrap();
        let numbers: Vec<_> = all.iter().map(|qr| qr.qr_number.as_str()).collect();
        assert_eq!(numbers, vec!["002", "010"]);
    }
}
