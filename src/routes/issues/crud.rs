use std::str::FromStr;

use super::helpers::{can_modify, resolve_photo};
use super::prelude::*;
use crate::models::issue::{IssueChanges, NewIssue};
use crate::scoring::creation_deadline;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssuePayload {
    pub title: String,
    pub description: String,
    pub category: String,
    pub target_group: String,
    pub photo: Option<String>,
    pub location: Option<GeoLocation>,
    pub district: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssuePayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_group: Option<String>,
    pub photo: Option<String>,
    pub location: Option<GeoLocation>,
    pub district: Option<String>,
}

pub async fn list_issues(State(state): State<AppState>) -> Response {
    match state.issues.list_issues().await {
        Ok(issues) => (
            StatusCode::OK,
            Json(json!({ "success": true, "issues": issues })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, "failed to list issues");
            JsonResponse::server_error("Failed to fetch issues").into_response()
        }
    }
}

pub async fn get_issue(State(state): State<AppState>, Path(issue_id): Path<Uuid>) -> Response {
    match state.issues.find_issue_with_author(issue_id).await {
        Ok(Some(issue)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "issue": issue })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to fetch issue");
            JsonResponse::server_error("Failed to fetch issue").into_response()
        }
    }
}

pub async fn create_issue(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<CreateIssuePayload>,
) -> Response {
    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    if payload.title.trim().is_empty() || payload.description.trim().is_empty() {
        return JsonResponse::bad_request(
            "title, description, category and targetGroup are required",
        )
        .into_response();
    }

    let Ok(category) = IssueCategory::from_str(&payload.category) else {
        return JsonResponse::bad_request("Unknown issue category").into_response();
    };
    let Ok(target_group) = TargetGroup::from_str(&payload.target_group) else {
        return JsonResponse::bad_request("Unknown target group").into_response();
    };

    let photo = match &payload.photo {
        Some(data_uri) if !data_uri.is_empty() => {
            resolve_photo(&state, data_uri).await.unwrap_or_default()
        }
        _ => String::new(),
    };

    let now = OffsetDateTime::now_utc();
    let new_issue = NewIssue {
        author_id: user.id,
        title: payload.title.trim().to_string(),
        description: payload.description.trim().to_string(),
        category,
        target_group,
        photo,
        location: payload.location,
        district: payload.district.unwrap_or_default(),
        deadline: creation_deadline(target_group.includes_authority(), now),
    };

    let created = match state.issues.create_issue(&new_issue).await {
        Ok(created) => created,
        Err(err) => {
            error!(?err, "failed to create issue");
            return JsonResponse::server_error("Failed to create issue").into_response();
        }
    };

    if let Err(err) = state.users.record_issue_raised(user.id).await {
        // Counter drift is logged but the issue itself is already durable.
        error!(?err, user_id = %user.id, "failed to bump issues_raised");
    }

    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "issue": created })),
    )
        .into_response()
}

pub async fn update_issue(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(issue_id): Path<Uuid>,
    Json(payload): Json<UpdateIssuePayload>,
) -> Response {
    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let issue = match state.issues.find_issue_by_id(issue_id).await {
        Ok(Some(issue)) => issue,
        Ok(None) => return JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to load issue for update");
            return JsonResponse::server_error("Failed to update issue").into_response();
        }
    };

    if !can_modify(&user, &issue) {
        return JsonResponse::forbidden("You can only edit your own issues").into_response();
    }

    let category = match &payload.category {
        Some(raw) => match IssueCategory::from_str(raw) {
            Ok(category) => Some(category),
            Err(()) => {
                return JsonResponse::bad_request("Unknown issue category").into_response()
            }
        },
        None => None,
    };
    let target_group = match &payload.target_group {
        Some(raw) => match TargetGroup::from_str(raw) {
            Ok(target_group) => Some(target_group),
            Err(()) => return JsonResponse::bad_request("Unknown target group").into_response(),
        },
        None => None,
    };

    // Only a fresh data-URI replaces the stored photo; anything else keeps it.
    let photo = match &payload.photo {
        Some(data_uri) if data_uri.starts_with("data:") => {
            resolve_photo(&state, data_uri).await
        }
        _ => None,
    };

    let changes = IssueChanges {
        title: payload.title.filter(|t| !t.trim().is_empty()),
        description: payload.description.filter(|d| !d.trim().is_empty()),
        category,
        target_group,
        photo,
        location: payload.location,
        district: payload.district,
    };

    match state.issues.update_issue(issue_id, &changes).await {
        Ok(Some(updated)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "issue": updated })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to update issue");
            JsonResponse::server_error("Failed to update issue").into_response()
        }
    }
}

pub async fn delete_issue(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(issue_id): Path<Uuid>,
) -> Response {
    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let issue = match state.issues.find_issue_by_id(issue_id).await {
        Ok(Some(issue)) => issue,
        Ok(None) => return JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to load issue for delete");
            return JsonResponse::server_error("Failed to delete issue").into_response();
        }
    };

    if !can_modify(&user, &issue) {
        return JsonResponse::forbidden("You can only delete your own issues").into_response();
    }

    match state.issues.delete_issue(issue_id).await {
        Ok(true) => {
            if let Err(err) = state.users.record_issue_removed(issue.author_id).await {
                error!(?err, author_id = %issue.author_id, "failed to decrement issues_raised");
            }
            JsonResponse::success("Issue deleted successfully").into_response()
        }
        Ok(false) => JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to delete issue");
            JsonResponse::server_error("Failed to delete issue").into_response()
        }
    }
}
