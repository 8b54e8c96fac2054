use anyhow::Result;
use chrono::NaiveDate;

use crate::DuckDbBackend;

pub(crate) fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

impl DuckDbBackend {
    /// Add one to the `(email, day)` counter in a single upsert statement.
    pub async fn record_usage(&self, email: &str, day: NaiveDate) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO usage_daily (email, day, scan_count) \
             VALUES (?1, CAST(?2 AS DATE), 1) \
             ON CONFLICT (email, day) DO UPDATE SET scan_count = scan_count + 1",
            duckdb::params![email, format_day(day)],
        )?;
        Ok(())
    }

    /// Scans counted for `(email, day)`; 0 if none.
    pub async fn get_usage(&self, email: &str, day: NaiveDate) -> Result<u32> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT scan_count FROM usage_daily WHERE email = ?1 AND day = CAST(?2 AS DATE)",
        )?;
        match stmt.query_row(duckdb::params![email, format_day(day)], |row| {
            row.get::<_, i32>(0)
        }) {
            Ok(count) => Ok(u32::try_from(count).unwrap_or(0)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(anyhow::anyhow!(e)),
        }
    }
}
