use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{error, info};

use crate::models::user::UserRole;
use crate::responses::JsonResponse;
use crate::routes::auth::{identity::ensure_user, session::AuthSession};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretCodePayload {
    pub secret_code: Option<String>,
}

/// Constant-time match against the configured elevation secret.
pub fn verify_secret(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn check_secret(state: &AppState, payload: &SecretCodePayload) -> Result<(), Response> {
    let Some(provided) = payload
        .secret_code
        .as_deref()
        .filter(|code| !code.is_empty())
    else {
        return Err(JsonResponse::bad_request("Secret code is required").into_response());
    };

    let Some(expected) = state.config.authority_secret_code.as_deref() else {
        return Err(
            JsonResponse::server_error("Server is missing AUTHORITY_SECRET_CODE").into_response(),
        );
    };

    if !verify_secret(provided, expected) {
        return Err(JsonResponse::forbidden("Invalid authority code").into_response());
    }

    Ok(())
}

/// Stateless pre-check used by the authority sign-up flow before an account
/// exists. Proves the secret without touching any user record.
pub async fn verify_authority_code(
    State(state): State<AppState>,
    Json(payload): Json<SecretCodePayload>,
) -> Response {
    match check_secret(&state, &payload) {
        Ok(()) => (axum::http::StatusCode::OK, axum::Json(json!({ "ok": true }))).into_response(),
        Err(response) => response,
    }
}

/// Elevates the authenticated user to the authority role.
///
/// Three distinct steps: validate the shared secret, flip the role on the
/// durable record, then clear the auth cookie so the client has to
/// re-authenticate and no cached credential from the citizen era survives.
pub async fn elevate_to_authority(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    jar: CookieJar,
    Json(payload): Json<SecretCodePayload>,
) -> Response {
    if let Err(response) = check_secret(&state, &payload) {
        return response;
    }

    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    if user.role == UserRole::Authority {
        return (
            axum::http::StatusCode::OK,
            axum::Json(json!({ "ok": true, "role": UserRole::Authority })),
        )
            .into_response();
    }

    if let Err(err) = state.users.set_role(user.id, UserRole::Authority).await {
        error!(?err, user_id = %user.id, "failed to set authority role");
        return JsonResponse::server_error("Failed to set authority role").into_response();
    }

    info!(user_id = %user.id, "user elevated to authority");

    // Drop the session cookie: the old credential predates the elevation.
    let jar = jar.remove(Cookie::from("auth_token"));
    (
        jar,
        axum::Json(json!({
            "ok": true,
            "role": UserRole::Authority,
            "reauthenticate": true
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::mock_db::MockDb;
    use crate::models::user::User;
    use crate::routes::auth::claims::Claims;
    use crate::services::media_storage::MockMediaStorage;
    use crate::utils::jwt::TokenKeys;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn test_state(db: Arc<MockDb>, secret: Option<&str>) -> AppState {
        AppState {
            users: db.clone(),
            issues: db,
            media: Arc::new(MockMediaStorage::default()),
            config: Arc::new(Config {
                database_url: String::new(),
                frontend_origin: "http://localhost".into(),
                jwt_issuer: "test-issuer".into(),
                jwt_audience: "test-audience".into(),
                authority_secret_code: secret.map(|s| s.to_string()),
                media: None,
            }),
            token_keys: Arc::new(
                TokenKeys::new(
                    b"0123456789abcdef0123456789abcdef",
                    "test-issuer",
                    "test-audience",
                )
                .unwrap(),
            ),
        }
    }

    fn sample_user(subject: &str) -> User {
        User {
            id: Uuid::new_v4(),
            subject: subject.into(),
            name: "Test User".into(),
            email: "user@example.com".into(),
            avatar: String::new(),
            role: UserRole::Citizen,
            points: 0,
            badges: vec![],
            issues_raised: 0,
            issues_solved: 0,
            volunteer_count: 0,
            rating: 5.0,
            total_resolved: 0,
            total_ignored: 0,
            area_districts: vec![],
            area_categories: vec![],
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn test_claims(subject: &str) -> Claims {
        Claims {
            sub: subject.into(),
            email: "user@example.com".into(),
            name: "Test User".into(),
            avatar: None,
            exp: 0,
            iss: "test-issuer".into(),
            aud: "test-audience".into(),
        }
    }

    #[test]
    fn secret_comparison_matches_exact_values_only() {
        assert!(verify_secret("nagarpalika", "nagarpalika"));
        assert!(!verify_secret("nagarpalika", "nagarpalikaa"));
        assert!(!verify_secret("", "nagarpalika"));
    }

    #[tokio::test]
    async fn missing_code_is_a_bad_request() {
        let state = test_state(Arc::new(MockDb::default()), Some("right-code"));
        let response = verify_authority_code(
            State(state),
            Json(SecretCodePayload { secret_code: None }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_secret_is_a_server_error() {
        let state = test_state(Arc::new(MockDb::default()), None);
        let response = verify_authority_code(
            State(state),
            Json(SecretCodePayload {
                secret_code: Some("anything".into()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn wrong_code_is_forbidden() {
        let state = test_state(Arc::new(MockDb::default()), Some("right-code"));
        let response = verify_authority_code(
            State(state),
            Json(SecretCodePayload {
                secret_code: Some("wrong-code".into()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn elevation_sets_role_and_clears_cookie() {
        let db = Arc::new(MockDb::default());
        let user = sample_user("user_upgrade");
        let user_id = user.id;
        db.insert_user(user);
        let state = test_state(db.clone(), Some("right-code"));

        let response = elevate_to_authority(
            State(state),
            AuthSession(test_claims("user_upgrade")),
            CookieJar::new(),
            Json(SecretCodePayload {
                secret_code: Some("right-code".into()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(db.user(user_id).unwrap().role, UserRole::Authority);

        // Removal cookie instructs the client to drop the stale credential.
        let set_cookie = response
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .expect("response should clear the auth cookie")
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("auth_token="));
    }

    #[tokio::test]
    async fn elevation_with_wrong_code_leaves_role_untouched() {
        let db = Arc::new(MockDb::default());
        let user = sample_user("user_upgrade");
        let user_id = user.id;
        db.insert_user(user);
        let state = test_state(db.clone(), Some("right-code"));

        let response = elevate_to_authority(
            State(state),
            AuthSession(test_claims("user_upgrade")),
            CookieJar::new(),
            Json(SecretCodePayload {
                secret_code: Some("wrong".into()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(db.user(user_id).unwrap().role, UserRole::Citizen);
    }
}
