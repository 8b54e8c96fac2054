use anyhow::{Context, Result};
use duckdb::Connection;

use checkmoyan_core::plan::Plan;
use checkmoyan_core::upgrade::{NewUpgradeRequest, UpgradeDecision, UpgradeRequest, UpgradeStatus};

use crate::users::{ensure_user_sync, update_plan_sync};
use crate::DuckDbBackend;

const SELECT_COLUMNS: &str = "SELECT id, email, plan, method, payment_ref, receipt_path, status, \
     admin_notes, approved_until, CAST(created_at AS VARCHAR) FROM upgrade_requests";

/// Raw row; `status` is validated after the query so a corrupt value is an
/// error instead of silently reading as pending.
struct UpgradeRow {
    id: i64,
    email: String,
    plan: String,
    method: String,
    payment_ref: Option<String>,
    receipt_path: Option<String>,
    status: String,
    admin_notes: Option<String>,
    approved_until: Option<String>,
    created_at: String,
}

impl UpgradeRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            plan: row.get(2)?,
            method: row.get(3)?,
            payment_ref: row.get(4)?,
            receipt_path: row.get(5)?,
            status: row.get(6)?,
            admin_notes: row.get(7)?,
            approved_until: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_request(self) -> Result<UpgradeRequest> {
        let status = self
            .status
            .parse::<UpgradeStatus>()
            .with_context(|| format!("upgrade request {} has invalid status", self.id))?;
        Ok(UpgradeRequest {
            id: self.id,
            email: self.email,
            plan: Plan::from_stored(&self.plan),
            method: self.method,
            payment_ref: self.payment_ref,
            receipt_path: self.receipt_path,
            status,
            admin_notes: self.admin_notes,
            approved_until: self.approved_until,
            created_at: self.created_at,
        })
    }
}

fn update_request_sync(conn: &Connection, id: i64, decision: &UpgradeDecision) -> Result<()> {
    conn.execute(
        "UPDATE upgrade_requests SET status = ?1, admin_notes = ?2, approved_until = ?3 \
         WHERE id = ?4",
        duckdb::params![
            decision.status.as_str(),
            decision.admin_notes,
            decision.approved_until,
            id
        ],
    )?;
    Ok(())
}

impl DuckDbBackend {
    pub async fn insert_upgrade_request(&self, request: &NewUpgradeRequest) -> Result<i64> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO upgrade_requests (email, plan, method, payment_ref, receipt_path, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', CURRENT_TIMESTAMP) \
             RETURNING id",
        )?;
        let id = stmt.query_row(
            duckdb::params![
                request.email,
                request.plan.as_str(),
                request.method,
                request.payment_ref,
                request.receipt_path,
            ],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(id)
    }

    /// Most recent first; ids break ties between requests created in the
    /// same timestamp tick.
    pub async fn list_upgrade_requests(
        &self,
        status: Option<UpgradeStatus>,
    ) -> Result<Vec<UpgradeRequest>> {
        let conn = self.conn.lock().await;
        let rows: Vec<UpgradeRow> = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE status = ?1 ORDER BY created_at DESC, id DESC"
                ))?;
                let mapped = stmt.query_map(duckdb::params![status.as_str()], UpgradeRow::from_row)?;
                mapped.collect::<duckdb::Result<_>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))?;
                let mapped = stmt.query_map([], UpgradeRow::from_row)?;
                mapped.collect::<duckdb::Result<_>>()?
            }
        };
        rows.into_iter().map(UpgradeRow::into_request).collect()
    }

    pub async fn get_upgrade_request(&self, id: i64) -> Result<Option<UpgradeRequest>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        match stmt.query_row(duckdb::params![id], UpgradeRow::from_row) {
            Ok(row) => row.into_request().map(Some),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow::anyhow!(e)),
        }
    }

    pub async fn update_upgrade_request(&self, id: i64, decision: &UpgradeDecision) -> Result<()> {
        let conn = self.conn.lock().await;
        update_request_sync(&conn, id, decision)
    }

    /// Approve and grant in one transaction: ensure the user, mark the request
    /// approved, set the plan. Either all three writes land or none do.
    pub async fn approve_upgrade_request(
        &self,
        request: &UpgradeRequest,
        approved_until: Option<&str>,
        admin_notes: Option<&str>,
    ) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        ensure_user_sync(&tx, &request.email)?;
        update_request_sync(
            &tx,
            request.id,
            &UpgradeDecision {
                status: UpgradeStatus::Approved,
                admin_notes: admin_notes.map(str::to_string),
                approved_until: approved_until.map(str::to_string),
            },
        )?;
        update_plan_sync(&tx, &request.email, request.plan, approved_until)?;
        tx.commit()?;
        Ok(())
    }
}
