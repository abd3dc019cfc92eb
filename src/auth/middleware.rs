use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::services::session::{GateDecision, SessionState};
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Maps the bearer token to a session state and lets the session gate
/// decide. Anything other than `Proceed` sends the caller to the login page.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| verify_token(token, &state.config).ok());

    let session = SessionState::from_user(claims.as_ref().map(|c| c.sub));
    match session.decision() {
        GateDecision::Proceed(user_id) => {
            let email = claims.map(|c| c.email).unwrap_or_default();
            req.extensions_mut().insert(AuthUser { id: user_id, email });
            Ok(next.run(req).await)
        }
        GateDecision::Redirect(_) | GateDecision::Wait => {
            tracing::debug!(path = %req.uri().path(), "Unauthenticated request redirected");
            Err(AppError::Unauthorized)
        }
    }
}
