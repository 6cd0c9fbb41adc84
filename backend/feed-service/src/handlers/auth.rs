use actix_web::{post, web, HttpRequest, HttpResponse};
use tracing::info;

use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::security::{bearer_token, TokenBlacklist};

pub struct AuthHandlerState {
    pub blacklist: TokenBlacklist,
}

/// Revoke the caller's bearer token. Later requests carrying it get 401.
#[post("/auth/logout")]
pub async fn logout(
    user: UserId,
    req: HttpRequest,
    state: web::Data<AuthHandlerState>,
) -> Result<HttpResponse> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::InvalidInput("missing bearer token".to_string()))?;

    state.blacklist.revoke(token).await;
    info!(user_id = %user.0, "User logged out");
    Ok(HttpResponse::NoContent().finish())
}
