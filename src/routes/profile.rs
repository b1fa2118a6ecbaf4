use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::models::user::UserRole;
use crate::responses::JsonResponse;
use crate::routes::auth::{identity::ensure_user, session::AuthSession};
use crate::scoring::badges;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AreaPayload {
    pub districts: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
}

/// GET /api/user/profile — the caller's record, badge board and recent
/// issues. Badge evaluation runs opportunistically here, so counters bumped
/// elsewhere eventually surface as earned badges.
pub async fn get_profile(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    let mut user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let earned = badges::compute_new_badges(&user);
    if !earned.is_empty() {
        match state.users.grant_badges(user.id, &earned).await {
            Ok(()) => user
                .badges
                .extend(earned.iter().map(|id| id.to_string())),
            Err(err) => {
                // The next profile fetch retries; show the stored set for now.
                error!(?err, user_id = %user.id, "failed to persist earned badges");
            }
        }
    }

    let recent_issues = match state.issues.list_recent_issues_by_author(user.id, 10).await {
        Ok(recent) => recent,
        Err(err) => {
            error!(?err, user_id = %user.id, "failed to load recent issues");
            return JsonResponse::server_error("Failed to load profile").into_response();
        }
    };

    let all_badges = badges::badge_statuses(&user);

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "user": user,
            "allBadges": all_badges,
            "recentIssues": recent_issues
        })),
    )
        .into_response()
}

/// PATCH /api/user/area — an authority redefines its coverage filter.
pub async fn update_area(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<AreaPayload>,
) -> Response {
    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    if user.role != UserRole::Authority {
        return JsonResponse::forbidden("Authority access only").into_response();
    }

    let districts = payload.districts.unwrap_or_default();
    let categories = payload.categories.unwrap_or_default();

    match state.users.update_area(user.id, &districts, &categories).await {
        Ok(Some(updated)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "area": updated.area() })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("User not found").into_response(),
        Err(err) => {
            error!(?err, user_id = %user.id, "failed to update coverage area");
            JsonResponse::server_error("Failed to update area").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::routes::issues::test_support::{
        base_state, sample_authority, sample_citizen, test_claims,
    };
    use std::sync::Arc;

    async fn response_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn profile_grants_pending_badges_exactly_once() {
        let db = Arc::new(MockDb::default());
        let mut citizen = sample_citizen();
        citizen.issues_raised = 5;
        db.insert_user(citizen.clone());
        let state = base_state(db.clone());

        let response = get_profile(
            State(state.clone()),
            AuthSession(test_claims(&citizen)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let mut stored = db.user(citizen.id).unwrap().badges;
        stored.sort_unstable();
        assert_eq!(stored, vec!["first_step".to_string(), "reporter".to_string()]);

        // Second fetch with unchanged counters grants nothing new.
        get_profile(State(state), AuthSession(test_claims(&citizen))).await;
        assert_eq!(db.user(citizen.id).unwrap().badges.len(), 2);
    }

    #[tokio::test]
    async fn profile_reports_earned_flags_on_the_badge_board() {
        let db = Arc::new(MockDb::default());
        let mut citizen = sample_citizen();
        citizen.issues_solved = 1;
        db.insert_user(citizen.clone());
        let state = base_state(db);

        let response = get_profile(State(state), AuthSession(test_claims(&citizen))).await;
        let json = response_json(response).await;

        let board = json["allBadges"].as_array().unwrap();
        let solver = board
            .iter()
            .find(|b| b["id"] == "problem_solver")
            .expect("badge board lists every rule");
        assert_eq!(solver["earned"], true);
        let legend = board.iter().find(|b| b["id"] == "legend").unwrap();
        assert_eq!(legend["earned"], false);
    }

    #[tokio::test]
    async fn citizen_cannot_set_an_area() {
        let db = Arc::new(MockDb::default());
        let citizen = sample_citizen();
        db.insert_user(citizen.clone());
        let state = base_state(db);

        let response = update_area(
            State(state),
            AuthSession(test_claims(&citizen)),
            Json(AreaPayload {
                districts: Some(vec!["Kathmandu".into()]),
                categories: Some(vec!["water".into()]),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn authority_area_update_round_trips() {
        let db = Arc::new(MockDb::default());
        let authority = sample_authority();
        db.insert_user(authority.clone());
        let state = base_state(db.clone());

        let response = update_area(
            State(state),
            AuthSession(test_claims(&authority)),
            Json(AreaPayload {
                districts: Some(vec!["Lalitpur".into()]),
                categories: Some(vec!["road".into(), "water".into()]),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let stored = db.user(authority.id).unwrap();
        assert_eq!(stored.area_districts, vec!["Lalitpur".to_string()]);
        assert_eq!(
            stored.area_categories,
            vec!["road".to_string(), "water".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_arrays_clear_the_area() {
        let db = Arc::new(MockDb::default());
        let mut authority = sample_authority();
        authority.area_categories = vec!["garbage".into()];
        db.insert_user(authority.clone());
        let state = base_state(db.clone());

        update_area(
            State(state),
            AuthSession(test_claims(&authority)),
            Json(AreaPayload {
                districts: None,
                categories: None,
            }),
        )
        .await;

        assert!(db.user(authority.id).unwrap().area_categories.is_empty());
    }
}
