//! Verification requests
//!
//! Users ask for a verified badge; administrators (`auth.admin_user_ids`)
//! approve or reject. A user holds at most one non-rejected request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AuthConfig;
use crate::data::{
    ActiveVerification, Direction, DocumentStore, EntityId, Patch, Query, VerificationRequest,
    VerificationStatus, WriteBatch, collections, encode, timestamp,
};
use crate::error::AppError;

/// Profile fields submitted for review
#[derive(Debug, Clone, Default)]
pub struct VerificationSubmission {
    pub username: String,
    pub full_name: String,
    pub bio: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatusView {
    pub status: VerificationStatus,
    #[serde(with = "timestamp")]
    pub requested_at: DateTime<Utc>,
    pub is_verified: bool,
}

/// Verification service
pub struct VerificationService {
    store: Arc<dyn DocumentStore>,
    auth: AuthConfig,
}

impl VerificationService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: AuthConfig) -> Self {
        Self { store, auth }
    }

    fn ensure_admin(&self, actor_id: &str) -> Result<(), AppError> {
        if self.auth.is_admin(actor_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("administrator access required"))
        }
    }

    async fn requests_of(&self, user_id: &str) -> Result<Vec<VerificationRequest>, AppError> {
        self.store
            .query(
                &Query::collection(collections::VERIFICATION_REQUESTS)
                    .where_eq("userId", user_id)
                    .order_by("requestedAt", Direction::Descending),
            )
            .await?
            .into_iter()
            .map(|document| document.decode())
            .collect()
    }

    async fn active_marker(&self, user_id: &str) -> Result<Option<ActiveVerification>, AppError> {
        self.store
            .get(collections::VERIFICATION_ACTIVE, user_id)
            .await?
            .map(|document| document.decode())
            .transpose()
    }

    /// # Errors
    /// `Conflict` while a pending or approved request exists
    pub async fn submit(
        &self,
        user_id: &str,
        submission: VerificationSubmission,
    ) -> Result<VerificationRequest, AppError> {
        let already_submitted =
            || AppError::conflict("a verification request has already been submitted");

        if self
            .requests_of(user_id)
            .await?
            .iter()
            .any(|request| request.status.is_active())
        {
            return Err(already_submitted());
        }

        let request = VerificationRequest {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            username: submission.username,
            full_name: submission.full_name,
            bio: submission.bio,
            status: VerificationStatus::Pending,
            is_verified: false,
            requested_at: timestamp::now(),
        };
        let marker = ActiveVerification {
            request_id: request.id.clone(),
        };
        let mut batch = WriteBatch::new();
        batch
            .create(
                collections::VERIFICATION_REQUESTS,
                &request.id,
                encode(&request)?,
            )
            .create(collections::VERIFICATION_ACTIVE, user_id, encode(&marker)?);

        // A concurrent submit that won the race holds the marker.
        self.store.commit(batch).await.map_err(|error| match error {
            AppError::Conflict(_) => already_submitted(),
            other => other,
        })?;

        tracing::info!(request_id = %request.id, user_id, "Verification requested");
        Ok(request)
    }

    /// All requests, newest first (administrators only)
    pub async fn list_all(&self, actor_id: &str) -> Result<Vec<VerificationRequest>, AppError> {
        self.ensure_admin(actor_id)?;
        self.store
            .query(
                &Query::collection(collections::VERIFICATION_REQUESTS)
                    .order_by("requestedAt", Direction::Descending),
            )
            .await?
            .into_iter()
            .map(|document| document.decode())
            .collect()
    }

    /// State of the user's latest request
    pub async fn status(&self, user_id: &str) -> Result<VerificationStatusView, AppError> {
        let latest = self
            .requests_of(user_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("no verification request submitted"))?;

        Ok(VerificationStatusView {
            status: latest.status,
            requested_at: latest.requested_at,
            is_verified: latest.is_verified,
        })
    }

    /// Approve or reject a request (administrators only)
    ///
    /// Approval also marks the user's profile verified, in the same batch.
    /// Rejection releases the user's active marker so they can resubmit.
    ///
    /// # Errors
    /// `Conflict` when approving an old request while another one is active
    pub async fn review(
        &self,
        actor_id: &str,
        request_id: &str,
        status: &str,
    ) -> Result<VerificationRequest, AppError> {
        self.ensure_admin(actor_id)?;
        let status = match status {
            "approved" => VerificationStatus::Approved,
            "rejected" => VerificationStatus::Rejected,
            _ => return Err(AppError::validation("status must be approved or rejected")),
        };

        let mut request: VerificationRequest = self
            .store
            .get(collections::VERIFICATION_REQUESTS, request_id)
            .await?
            .ok_or_else(|| AppError::not_found("verification request not found"))?
            .decode()?;
        let approved = status == VerificationStatus::Approved;

        let mut batch = WriteBatch::new();
        batch.update(
            collections::VERIFICATION_REQUESTS,
            request_id,
            Patch::new()
                .set("status", status.as_str())
                .set("isVerified", approved),
        );
        let marker = self.active_marker(&request.user_id).await?;
        let holds_marker = marker
            .as_ref()
            .is_some_and(|marker| marker.request_id == request_id);
        if approved {
            match marker {
                None => {
                    let marker = ActiveVerification {
                        request_id: request_id.to_string(),
                    };
                    batch.create(
                        collections::VERIFICATION_ACTIVE,
                        &request.user_id,
                        encode(&marker)?,
                    );
                }
                Some(_) if holds_marker => {}
                Some(_) => {
                    return Err(AppError::conflict(
                        "another verification request is active for this user",
                    ));
                }
            }
        } else if holds_marker {
            batch.delete(collections::VERIFICATION_ACTIVE, &request.user_id);
        }
        if approved
            && self
                .store
                .get(collections::USERS, &request.user_id)
                .await?
                .is_some()
        {
            batch.update(
                collections::USERS,
                &request.user_id,
                Patch::new().set("isVerified", true),
            );
        }
        self.store.commit(batch).await?;

        tracing::info!(request_id, actor_id, status = status.as_str(), "Verification reviewed");
        request.status = status;
        request.is_verified = approved;
        Ok(request)
    }
}
