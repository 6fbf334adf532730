use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use super::{
    service::UserService,
    types::{ManageBanRequest, ManageBanResponse, RegisterRequest, StatusResponse, UserResponse},
};
use crate::session::SecurityContext;
use crate::shared::{json_body, AppError, AppState};

fn user_service(state: &AppState) -> UserService {
    UserService::new(state.user_repository.clone(), state.password_policy.clone())
}

/// HTTP handler for creating an account
///
/// POST /api/register
#[instrument(name = "register", skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StatusResponse>), AppError> {
    let request = json_body(payload)?;

    let id = user_service(&state)
        .register(&request.login, &request.password)
        .await?;
    info!(user_id = id, "Registration complete");

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            status: "ok".to_string(),
        }),
    ))
}

/// HTTP handler for the admin user listing
///
/// GET /api/users (administrative gate)
#[instrument(name = "list_users", skip(state, ctx))]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = user_service(&state).list_users(&ctx).await?;

    info!(user_count = users.len(), "Users listed");
    Ok(Json(users))
}

/// HTTP handler for banning or unbanning an account
///
/// POST /api/manage-ban (administrative gate)
#[instrument(name = "manage_ban", skip(state, ctx, payload))]
pub async fn manage_ban(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    payload: Result<Json<ManageBanRequest>, JsonRejection>,
) -> Result<Json<ManageBanResponse>, AppError> {
    let request = json_body(payload)?;
    let banned = match request.banned {
        0 => false,
        1 => true,
        _ => return Err(AppError::BadRequest("banned must be 0 or 1".to_string())),
    };

    user_service(&state)
        .set_ban_status(&ctx, &request.login, banned)
        .await?;

    Ok(Json(ManageBanResponse {
        login: request.login,
        banned: request.banned,
        message: "Ban status updated".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordPolicy;
    use crate::session::{require_security_context, SESSION_COOKIE};
    use crate::shared::test_utils::AppStateBuilder;
    use crate::user::models::NewUser;
    use crate::user::repository::{InMemoryUserRepository, UserRepository};
    use axum::{
        body::Body,
        http::{header, Request},
        middleware,
        routing::{get, post},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn app(state: AppState) -> Router {
        let admin = Router::new()
            .route("/api/users", get(list_users))
            .route("/api/manage-ban", post(manage_ban))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_security_context,
            ));

        Router::new()
            .route("/api/register", post(register))
            .merge(admin)
            .with_state(state)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn seeded_state() -> (AppState, Arc<InMemoryUserRepository>, String, String) {
        let users = Arc::new(InMemoryUserRepository::new());
        let root_id = users.insert(&NewUser::admin("root", "h")).await.unwrap();
        let bob_id = users.insert(&NewUser::regular("bob", "h")).await.unwrap();
        let state = AppStateBuilder::new()
            .with_user_repository(users.clone())
            .with_password_policy(PasswordPolicy::Easy)
            .build();
        let root = state.session_signer.issue_session(root_id, "root").unwrap();
        let bob = state.session_signer.issue_session(bob_id, "bob").unwrap();
        (state, users, root, bob)
    }

    #[tokio::test]
    async fn test_register_handler() {
        let (state, users, _, _) = seeded_state().await;

        let response = app(state)
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                r#"{"login":"carol","password":"abc"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(users.find_by_login("carol").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_handler_policy_violation() {
        let (state, _, _, _) = seeded_state().await;

        let response = app(state)
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                r#"{"login":"carol","password":"ab"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["reasons"][0], "at least 3 characters");
    }

    #[tokio::test]
    async fn test_register_handler_missing_field_is_bad_request() {
        let (state, _, _, _) = seeded_state().await;

        let response = app(state)
            .oneshot(json_request("POST", "/api/register", None, r#"{"login":"x"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_users_for_admin() {
        let (state, _, root, _) = seeded_state().await;

        let response = app(state)
            .oneshot(json_request("GET", "/api/users", Some(&root), ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let users: Vec<UserResponse> = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            users,
            vec![UserResponse {
                login: "bob".to_string(),
                is_banned: false
            }]
        );
    }

    #[tokio::test]
    async fn test_list_users_forbidden_for_regular_user() {
        let (state, _, _, bob) = seeded_state().await;

        let response = app(state)
            .oneshot(json_request("GET", "/api/users", Some(&bob), ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_manage_ban_flow() {
        let (state, users, root, bob) = seeded_state().await;
        let app = app(state);

        let banned = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/manage-ban",
                Some(&root),
                r#"{"login":"bob","banned":1}"#,
            ))
            .await
            .unwrap();
        assert_eq!(banned.status(), StatusCode::OK);
        assert!(users.find_by_login("bob").await.unwrap().unwrap().is_banned);

        let self_ban = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/manage-ban",
                Some(&root),
                r#"{"login":"root","banned":1}"#,
            ))
            .await
            .unwrap();
        assert_eq!(self_ban.status(), StatusCode::FORBIDDEN);

        let by_regular_user = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/manage-ban",
                Some(&bob),
                r#"{"login":"root","banned":1}"#,
            ))
            .await
            .unwrap();
        assert_eq!(by_regular_user.status(), StatusCode::FORBIDDEN);

        let bad_flag = app
            .oneshot(json_request(
                "POST",
                "/api/manage-ban",
                Some(&root),
                r#"{"login":"bob","banned":7}"#,
            ))
            .await
            .unwrap();
        assert_eq!(bad_flag.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_routes_require_session() {
        let (state, _, _, _) = seeded_state().await;

        let response = app(state)
            .oneshot(json_request("GET", "/api/users", None, ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
