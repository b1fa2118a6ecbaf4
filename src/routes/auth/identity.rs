use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::db::is_unique_violation;
use crate::models::user::{NewUser, User, UserRole};
use crate::responses::JsonResponse;
use crate::routes::auth::claims::Claims;
use crate::state::AppState;

/// Resolves the durable user record for an authenticated request, lazily
/// provisioning a citizen-role row on first contact.
///
/// Concurrent first requests for the same subject race on the insert; the
/// unique index on `subject` rejects the loser with 23505 and we retry as a
/// fetch, so one identity can never produce two records.
pub async fn ensure_user(state: &AppState, claims: &Claims) -> Result<User, Response> {
    match state.users.find_user_by_subject(&claims.sub).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            let new_user = provision_from_claims(claims);
            match state.users.create_user(&new_user).await {
                Ok(user) => Ok(user),
                Err(err) if is_unique_violation(&err) => {
                    match state.users.find_user_by_subject(&claims.sub).await {
                        Ok(Some(user)) => Ok(user),
                        Ok(None) => {
                            error!(subject = %claims.sub, "user vanished after unique violation");
                            Err(JsonResponse::server_error("Failed to resolve user")
                                .into_response())
                        }
                        Err(err) => {
                            error!(?err, subject = %claims.sub, "failed to re-fetch user");
                            Err(JsonResponse::server_error("Failed to resolve user")
                                .into_response())
                        }
                    }
                }
                Err(err) => {
                    error!(?err, subject = %claims.sub, "failed to provision user");
                    Err(JsonResponse::server_error("Failed to resolve user").into_response())
                }
            }
        }
        Err(err) => {
            error!(?err, subject = %claims.sub, "failed to look up user");
            Err(JsonResponse::server_error("Failed to resolve user").into_response())
        }
    }
}

fn provision_from_claims(claims: &Claims) -> NewUser {
    let name = claims.name.trim();
    NewUser {
        subject: claims.sub.clone(),
        name: if name.is_empty() {
            "User".to_string()
        } else {
            name.to_string()
        },
        email: claims.email.clone(),
        avatar: claims.avatar.clone().unwrap_or_default(),
        role: UserRole::Citizen,
    }
}
