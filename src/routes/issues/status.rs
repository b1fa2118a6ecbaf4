use std::str::FromStr;

use super::prelude::*;
use crate::db::issue_repository::StatusTransitionWrite;
use crate::models::user::User;
use crate::scoring::{self, badges};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    /// Kept as a raw string so unrecognized values produce a validation
    /// error instead of a body-deserialization rejection.
    pub status: String,
    pub response: Option<String>,
}

/// PATCH /api/issues/{id}/status — an authority moves an issue through the
/// pending -> in_progress -> completed lifecycle.
///
/// Scoring is computed from the issue's pre-transition snapshot, then the
/// status fields and both affected user records are written in one
/// transaction, so re-confirming `completed` can never double-apply the
/// resolution bonus.
pub async fn update_issue_status(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(issue_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Response {
    let authority = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    // Role comes from the durable record, never from token claims.
    if authority.role != UserRole::Authority {
        return JsonResponse::forbidden("Only authorities can update issue status")
            .into_response();
    }

    let Ok(target) = IssueStatus::from_str(&payload.status) else {
        return JsonResponse::bad_request("Invalid status").into_response();
    };

    let snapshot = match state.issues.find_issue_by_id(issue_id).await {
        Ok(Some(issue)) => issue,
        Ok(None) => return JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to load issue for status update");
            return JsonResponse::server_error("Failed to update status").into_response();
        }
    };

    let now = OffsetDateTime::now_utc();
    let effects = scoring::transition_effects(&snapshot, authority.rating, target, now);

    let write = StatusTransitionWrite {
        issue_id,
        status: target,
        response: payload
            .response
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        responded_by: authority.id,
        responded_at: now,
        author_id: snapshot.author_id,
        effects,
    };

    let updated = match state.issues.apply_status_transition(&write).await {
        Ok(Some(updated)) => updated,
        Ok(None) => return JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to apply status transition");
            return JsonResponse::server_error("Failed to update status").into_response();
        }
    };

    if !effects.is_noop() {
        award_badges(&state, snapshot.author_id).await;
        award_badges(&state, authority.id).await;
    }

    (
        StatusCode::OK,
        Json(json!({ "success": true, "issue": updated })),
    )
        .into_response()
}

/// Opportunistic badge pass over a user's fresh counters. Best-effort: a
/// failure here is logged and the status response still goes out, because
/// the next profile fetch repeats the evaluation.
async fn award_badges(state: &AppState, user_id: Uuid) {
    let user: User = match state.users.find_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(err) => {
            error!(?err, %user_id, "failed to load user for badge evaluation");
            return;
        }
    };

    let earned = badges::compute_new_badges(&user);
    if earned.is_empty() {
        return;
    }

    if let Err(err) = state.users.grant_badges(user.id, &earned).await {
        error!(?err, %user_id, "failed to persist earned badges");
    }
}
