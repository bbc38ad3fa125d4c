//! services/api/src/web/middleware.rs
//!
//! Request middleware that scopes every protected route to one user.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use life_engine_core::domain::{UserContext, UserId};
use tracing::warn;

pub const USER_HEADER: &str = "x-user-id";

/// Reads the `x-user-id` header and inserts the `UserContext` into the
/// request extensions for handlers to use. There is no authentication step;
/// a missing or blank id is rejected with 400.
pub async fn require_user(
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let raw = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("{} header is required", USER_HEADER),
            )
        })?;

    let user_id = UserId::parse(raw).map_err(|_| {
        warn!("Rejected request with an invalid {} header", USER_HEADER);
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid {} header", USER_HEADER),
        )
    })?;

    req.extensions_mut().insert(UserContext::new(user_id));
    Ok(next.run(req).await)
}
