use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::responses::JsonResponse;
use crate::routes::auth::claims::Claims;
use crate::state::AppState;

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Cookie is the normal path; the Authorization header covers flows
        // where the client holds the provider token directly (e.g. the
        // authority sign-up upgrade step).
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get("auth_token")
            .map(|cookie| cookie.value().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(|value| value.to_string())
            })
            .ok_or_else(|| {
                JsonResponse::unauthorized("Authentication required").into_response()
            })?;

        let claims = state.token_keys.verify(&token).map_err(|_| {
            JsonResponse::unauthorized("Invalid or expired session").into_response()
        })?;

        Ok(AuthSession(claims))
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::FromRequestParts,
        http::{header, Method, Request, StatusCode},
    };
    use axum_extra::extract::cookie::Cookie;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::config::Config;
    use crate::db::mock_db::MockDb;
    use crate::routes::auth::claims::Claims;
    use crate::routes::auth::session::AuthSession;
    use crate::services::media_storage::MockMediaStorage;
    use crate::state::AppState;
    use crate::utils::jwt::TokenKeys;

    fn test_state() -> AppState {
        AppState {
            users: Arc::new(MockDb::default()),
            issues: Arc::new(MockDb::default()),
            media: Arc::new(MockMediaStorage::default()),
            config: Arc::new(Config {
                database_url: String::new(),
                frontend_origin: "http://localhost".into(),
                jwt_issuer: "test-issuer".into(),
                jwt_audience: "test-audience".into(),
                authority_secret_code: None,
                media: None,
            }),
            token_keys: Arc::new(
                TokenKeys::new(
                    b"0123456789abcdef0123456789abcdef",
                    "test-issuer",
                    "test-audience",
                )
                .expect("test JWT secret should be valid"),
            ),
        }
    }

    fn make_valid_jwt(state: &AppState) -> String {
        let claims = Claims {
            sub: "user_2x7f".into(),
            email: "test@example.com".into(),
            name: "Test User".into(),
            avatar: None,
            exp: (SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + 3600) as usize,
            iss: String::new(),
            aud: String::new(),
        };
        state
            .token_keys
            .sign(claims)
            .expect("JWT should create successfully")
    }

    #[tokio::test]
    async fn test_valid_cookie_token_extracted() {
        let state = test_state();
        let jwt = make_valid_jwt(&state);
        let cookie = Cookie::new("auth_token", jwt);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;

        let session = result.expect("extraction should succeed");
        assert_eq!(session.0.email, "test@example.com");
        assert_eq!(session.0.sub, "user_2x7f");
    }

    #[tokio::test]
    async fn test_bearer_header_fallback() {
        let state = test_state();
        let jwt = make_valid_jwt(&state);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::AUTHORIZATION, format!("Bearer {jwt}"))
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_token_returns_unauthorized() {
        let state = test_state();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;

        let response = result.expect_err("extraction should fail");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_returns_unauthorized() {
        let state = test_state();
        let cookie = Cookie::new("auth_token", "invalid.token.here");

        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;

        let response = result.expect_err("extraction should fail");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
