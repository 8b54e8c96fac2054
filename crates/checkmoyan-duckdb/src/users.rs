use anyhow::Result;
use duckdb::Connection;

use checkmoyan_core::plan::{Plan, User, UserPlan};

use crate::DuckDbBackend;

/// Insert the user with the default plan unless the row already exists.
pub(crate) fn ensure_user_sync(conn: &Connection, email: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (email, plan, premium_until, created_at) \
         VALUES (?1, 'free', NULL, CURRENT_TIMESTAMP)",
        duckdb::params![email],
    )?;
    Ok(())
}

/// Overwrite plan and expiry. The row must exist (see [`ensure_user_sync`]).
pub(crate) fn update_plan_sync(
    conn: &Connection,
    email: &str,
    plan: Plan,
    premium_until: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE users SET plan = ?1, premium_until = ?2 WHERE email = ?3",
        duckdb::params![plan.as_str(), premium_until, email],
    )?;
    Ok(())
}

impl DuckDbBackend {
    pub async fn ensure_user(&self, email: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        ensure_user_sync(&conn, email)
    }

    /// Stored plan fields; the default free plan when the user is unknown.
    pub async fn get_user_plan(&self, email: &str) -> Result<UserPlan> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT plan, premium_until FROM users WHERE email = ?1")?;
        match stmt.query_row(duckdb::params![email], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        }) {
            Ok((plan, premium_until)) => Ok(UserPlan {
                plan: Plan::from_stored(&plan),
                premium_until,
            }),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(UserPlan::default()),
            Err(e) => Err(anyhow::anyhow!(e)),
        }
    }

    /// Upsert-style overwrite: creates the user if needed, then sets both fields.
    pub async fn set_user_plan(
        &self,
        email: &str,
        plan: Plan,
        premium_until: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        ensure_user_sync(&conn, email)?;
        update_plan_sync(&conn, email, plan, premium_until)
    }

    /// Newest users first.
    pub async fn list_users(&self, limit: i64) -> Result<Vec<User>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT email, plan, premium_until, CAST(created_at AS VARCHAR) \
             FROM users ORDER BY created_at DESC, email ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(duckdb::params![limit], |row| {
            Ok(User {
                email: row.get(0)?,
                plan: Plan::from_stored(&row.get::<_, String>(1)?),
                premium_until: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
