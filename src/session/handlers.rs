use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument};

use super::middleware::session_cookie;
use super::types::{LoginRequest, LoginResponse};
use crate::shared::{json_body, AppError, AppState};
use crate::user::service::UserService;

/// HTTP handler for logging in
///
/// POST /api/login
/// Checks credentials, sets the session cookie and reports whether the user is an admin
#[instrument(name = "login", skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let request = json_body(payload)?;
    let service = UserService::new(state.user_repository.clone(), state.password_policy.clone());
    let user = service.authenticate(&request.login, &request.password).await?;

    let token = state.session_signer.issue_session(user.id, &user.login)?;

    info!(
        user_id = user.id,
        login = %user.login,
        "Session issued"
    );

    Ok((
        jar.add(session_cookie(token)),
        Json(LoginResponse {
            status: "ok".to_string(),
            is_admin: user.is_admin,
        }),
    ))
}
