//! Verification request and report endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::dto::{
    ReportCreatedResponse, ReportRequest, ReportResponse, ReviewRequest,
    VerificationRequestResponse, VerificationSubmitRequest,
};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{
    NewReport, ReportService, VerificationService, VerificationStatusView, VerificationSubmission,
};

fn verification(state: &AppState) -> VerificationService {
    VerificationService::new(state.store.clone(), state.config.auth.clone())
}

/// POST /api/verify-request
pub async fn submit_verification(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<VerificationSubmitRequest>,
) -> Result<(StatusCode, Json<VerificationRequestResponse>), AppError> {
    let request = verification(&state)
        .submit(
            &user.user_id,
            VerificationSubmission {
                username: body.username,
                full_name: body.full_name,
                bio: body.bio,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// GET /api/verify-request (administrators only)
pub async fn list_verifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<VerificationRequestResponse>>, AppError> {
    let requests = verification(&state).list_all(&user.user_id).await?;
    Ok(Json(
        requests
            .into_iter()
            .map(VerificationRequestResponse::from)
            .collect(),
    ))
}

/// GET /api/verify-request/status/:userId
pub async fn verification_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<VerificationStatusView>, AppError> {
    Ok(Json(verification(&state).status(&user_id).await?))
}

/// PUT /api/verify-request/:requestId (administrators only)
pub async fn review_verification(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(request_id): Path<String>,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> Result<Json<VerificationRequestResponse>, AppError> {
    let request = verification(&state)
        .review(&user.user_id, &request_id, &body.status)
        .await?;
    Ok(Json(request.into()))
}

/// POST /api/report
pub async fn create_report(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<ReportRequest>,
) -> Result<(StatusCode, Json<ReportCreatedResponse>), AppError> {
    let report_id = ReportService::new(state.store.clone())
        .create(
            &user.user_id,
            NewReport {
                target_id: body.target_id,
                target_type: body.target_type,
                reason: body.reason,
                description: body.description,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ReportCreatedResponse {
            success: true,
            report_id,
        }),
    ))
}

/// GET /api/report/my-reports
pub async fn my_reports(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ReportResponse>>, AppError> {
    let reports = ReportService::new(state.store.clone())
        .mine(&user.user_id)
        .await?;
    Ok(Json(reports.into_iter().map(ReportResponse::from).collect()))
}
