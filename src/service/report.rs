//! Content reports

use std::sync::Arc;

use crate::data::{
    Direction, DocumentStore, EntityId, Query, Report, WriteBatch, collections, encode, timestamp,
};
use crate::error::AppError;

const TARGET_TYPES: [&str; 4] = ["post", "video", "user", "comment"];

#[derive(Debug, Clone, Default)]
pub struct NewReport {
    pub target_id: String,
    pub target_type: String,
    pub reason: String,
    pub description: Option<String>,
}

/// Report service
pub struct ReportService {
    store: Arc<dyn DocumentStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// File a report; returns its id
    pub async fn create(&self, reporter_id: &str, new: NewReport) -> Result<String, AppError> {
        if new.target_id.trim().is_empty()
            || new.target_type.trim().is_empty()
            || new.reason.trim().is_empty()
        {
            return Err(AppError::validation(
                "targetId, targetType and reason are required",
            ));
        }
        if !TARGET_TYPES.contains(&new.target_type.as_str()) {
            return Err(AppError::validation(
                "targetType must be post, video, user or comment",
            ));
        }

        let report = Report {
            id: EntityId::new().0,
            reporter_id: reporter_id.to_string(),
            target_id: new.target_id,
            target_type: new.target_type,
            reason: new.reason,
            description: new.description.unwrap_or_default(),
            status: "pending".to_string(),
            created_at: timestamp::now(),
        };
        let mut batch = WriteBatch::new();
        batch.create(collections::REPORTS, &report.id, encode(&report)?);
        self.store.commit(batch).await?;

        tracing::info!(
            report_id = %report.id,
            target_type = %report.target_type,
            "Report filed"
        );
        Ok(report.id)
    }

    /// Reports filed by `reporter_id`, newest first
    pub async fn mine(&self, reporter_id: &str) -> Result<Vec<Report>, AppError> {
        self.store
            .query(
                &Query::collection(collections::REPORTS)
                    .where_eq("reporterId", reporter_id)
                    .order_by("createdAt", Direction::Descending),
            )
            .await?
            .into_iter()
            .map(|document| document.decode())
            .collect()
    }
}
