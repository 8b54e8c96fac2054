use anyhow::Result;
use chrono::NaiveDate;

use checkmoyan_core::scan::{CategoryCount, DailyStats, NewScan, Totals};

use crate::usage::format_day;
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Append a scan row and return its sequence id.
    pub async fn insert_scan(&self, scan: &NewScan) -> Result<i64> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO scans (email, day, verdict, confidence, category, signals, content_fingerprint, created_at) \
             VALUES (?1, CAST(?2 AS DATE), ?3, ?4, ?5, ?6, ?7, CURRENT_TIMESTAMP) \
             RETURNING id",
        )?;
        let id = stmt.query_row(
            duckdb::params![
                scan.email,
                format_day(scan.day),
                scan.verdict,
                scan.confidence,
                scan.category,
                scan.signals,
                scan.content_fingerprint,
            ],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(id)
    }

    pub async fn get_stats(&self, day: NaiveDate) -> Result<DailyStats> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT COUNT(*), COUNT(DISTINCT email) FROM scans WHERE day = CAST(?1 AS DATE)",
        )?;
        let (scans, unique_users) = stmt.query_row(duckdb::params![format_day(day)], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        Ok(DailyStats {
            day: format_day(day),
            scans,
            unique_users,
        })
    }

    /// Ties are broken alphabetically so the order is stable.
    pub async fn get_trending_categories(
        &self,
        day: NaiveDate,
        limit: i64,
    ) -> Result<Vec<CategoryCount>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) AS n FROM scans \
             WHERE day = CAST(?1 AS DATE) AND category <> '' \
             GROUP BY category ORDER BY n DESC, category ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(duckdb::params![format_day(day), limit], |row| {
            Ok(CategoryCount {
                category: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn get_totals(&self) -> Result<Totals> {
        let conn = self.conn.lock().await;
        let total_scans: i64 = conn.query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))?;
        let total_users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(Totals {
            total_scans,
            total_users,
        })
    }
}
