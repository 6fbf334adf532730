use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{debug, info, instrument, warn};

use super::token::SessionSigner;
use super::types::{Identity, SecurityContext};
use crate::shared::{AppError, AppState};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "jwt";

/// Builds the cookie that transports a freshly issued session token
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(false)
        .same_site(SameSite::Lax)
        .build()
}

/// Reads the session cookie and verifies it. Shared by both gates.
pub fn identity_from_jar(signer: &SessionSigner, jar: &CookieJar) -> Result<Identity, AppError> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value()).ok_or_else(|| {
        warn!("Missing session cookie in request");
        AppError::Unauthorized("Unauthorized".to_string())
    })?;

    signer.verify_session(token).map_err(|e| {
        warn!(reason = %e, "Session verification failed");
        AppError::from(e)
    })
}

/// Identity for routes that are public but show more to the owner.
/// Any cookie problem is treated as an anonymous request.
pub fn optional_identity(signer: &SessionSigner, jar: &CookieJar) -> Option<Identity> {
    let token = jar.get(SESSION_COOKIE)?;
    match signer.verify_session(token.value()) {
        Ok(identity) => Some(identity),
        Err(e) => {
            debug!(reason = %e, "Ignoring invalid session cookie on public route");
            None
        }
    }
}

/// Basic auth gate - verifies the session cookie and adds `Identity` to the request.
/// Usage: .route_layer(middleware::from_fn_with_state(app_state.clone(), session::require_session))
/// Handlers can then extract Extension(identity): Extension<Identity>.
#[instrument(skip(state, jar, req, next))]
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    debug!("Session gate triggered for request {}", req.uri());

    let identity = identity_from_jar(&state.session_signer, &jar)?;

    info!(
        user_id = identity.user_id,
        login = %identity.login,
        "Authentication successful, adding identity to request"
    );

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Administrative gate - the basic gate plus a user store lookup.
///
/// Role and ban state come from the store on every request, never from the
/// token, so a demotion takes effect immediately. Adds both `Identity` and
/// `SecurityContext` to the request.
#[instrument(skip(state, jar, req, next))]
pub async fn require_security_context(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    debug!("Administrative gate triggered for request {}", req.uri());

    let identity = identity_from_jar(&state.session_signer, &jar)?;

    let user = match state.user_repository.find_by_login(&identity.login).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(login = %identity.login, "Session login no longer resolves in user store");
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        }
        Err(e) => {
            warn!(login = %identity.login, error = %e, "User lookup failed in administrative gate");
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        }
    };

    let context = SecurityContext {
        identity: Identity {
            user_id: user.id,
            login: user.login,
        },
        is_admin: user.is_admin,
        is_banned: user.is_banned,
    };

    info!(
        user_id = context.identity.user_id,
        login = %context.identity.login,
        is_admin = context.is_admin,
        is_banned = context.is_banned,
        "Security context resolved"
    );

    req.extensions_mut().insert(context.identity.clone());
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}
