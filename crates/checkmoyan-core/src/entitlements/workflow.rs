use tracing::{error, info};

use super::Entitlements;
use crate::error::CoreError;
use crate::upgrade::{NewUpgradeRequest, UpgradeDecision, UpgradeRequest, UpgradeStatus};

/// Blank strings from admin forms mean "not provided".
fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

impl Entitlements {
    /// File a `pending` upgrade request and return its id.
    pub async fn submit_upgrade(&self, request: &NewUpgradeRequest) -> Result<i64, CoreError> {
        let request = NewUpgradeRequest {
            email: request.email.clone(),
            plan: request.plan,
            method: request.method.clone(),
            payment_ref: non_blank(request.payment_ref.as_deref()).map(str::to_string),
            receipt_path: non_blank(request.receipt_path.as_deref()).map(str::to_string),
        };
        let id = self.store.insert_upgrade_request(&request).await?;
        info!(
            id,
            email = %request.email,
            plan = %request.plan,
            method = %request.method,
            "Upgrade request submitted"
        );
        Ok(id)
    }

    /// Most recent first, optionally restricted to one status.
    pub async fn list_upgrades(
        &self,
        status: Option<UpgradeStatus>,
    ) -> Result<Vec<UpgradeRequest>, CoreError> {
        Ok(self.store.list_upgrade_requests(status).await?)
    }

    pub async fn get_upgrade(&self, id: i64) -> Result<UpgradeRequest, CoreError> {
        self.store
            .get_upgrade_request(id)
            .await?
            .ok_or(CoreError::UpgradeRequestNotFound(id))
    }

    /// Approve a request and grant its plan until `approved_until`.
    ///
    /// Does not check that the request is still pending; the caller only
    /// offers approval for pending requests. A storage failure is returned
    /// as-is; with a non-transactional store it may leave the request marked
    /// approved without the plan grant, which the error log makes visible.
    pub async fn approve_upgrade(
        &self,
        id: i64,
        approved_until: Option<&str>,
        admin_notes: Option<&str>,
    ) -> Result<(), CoreError> {
        let request = self.get_upgrade(id).await?;
        let approved_until = non_blank(approved_until);
        if let Err(e) = self
            .store
            .approve_upgrade_request(&request, approved_until, non_blank(admin_notes))
            .await
        {
            error!(
                id,
                email = %request.email,
                error = %e,
                "Upgrade approval failed; check request status against the user's plan"
            );
            return Err(e.into());
        }
        info!(
            id,
            email = %request.email,
            plan = %request.plan,
            approved_until,
            "Upgrade request approved"
        );
        Ok(())
    }

    /// Reject a request. The user's plan is untouched.
    pub async fn reject_upgrade(&self, id: i64, admin_notes: Option<&str>) -> Result<(), CoreError> {
        let request = self.get_upgrade(id).await?;
        self.store
            .update_upgrade_request(
                request.id,
                &UpgradeDecision {
                    status: UpgradeStatus::Rejected,
                    admin_notes: non_blank(admin_notes).map(str::to_string),
                    approved_until: None,
                },
            )
            .await?;
        info!(id, email = %request.email, "Upgrade request rejected");
        Ok(())
    }
}
