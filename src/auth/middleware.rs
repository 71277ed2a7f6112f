//! Authentication extractor
//!
//! Resolves the caller from the `Authorization: Bearer` header.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};

use super::token::Subject;
use crate::AppState;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for the current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(user: CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
}

impl CurrentUser {
    /// `Forbidden` unless the caller is `user_id`
    pub fn ensure_is(&self, user_id: &str, message: &str) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::forbidden(message))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(subject) = parts.extensions.get::<Subject>() {
            return Ok(CurrentUser {
                user_id: subject.user_id.clone(),
            });
        }

        let state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let subject = state.identity.verify(token).await?;
        parts.extensions.insert(subject.clone());

        Ok(CurrentUser {
            user_id: subject.user_id,
        })
    }
}
