use super::prelude::*;
use crate::models::comment::MAX_COMMENT_LENGTH;

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub text: String,
}

/// GET /api/issues/{id}/comments — oldest first, author populated.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
) -> Response {
    match state.issues.list_comments(issue_id).await {
        Ok(comments) => (
            StatusCode::OK,
            Json(json!({ "success": true, "comments": comments })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to list comments");
            JsonResponse::server_error("Failed to fetch comments").into_response()
        }
    }
}

/// POST /api/issues/{id}/comments — append a comment to an issue's thread.
pub async fn add_comment(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(issue_id): Path<Uuid>,
    Json(payload): Json<CommentPayload>,
) -> Response {
    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.issues.find_issue_by_id(issue_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to load issue for comment");
            return JsonResponse::server_error("Failed to add comment").into_response();
        }
    }

    let text = payload.text.trim();
    if text.is_empty() {
        return JsonResponse::bad_request("Comment text is required").into_response();
    }
    // Char-boundary-safe truncation; the limit mirrors the stored column.
    let body: String = text.chars().take(MAX_COMMENT_LENGTH).collect();

    match state.issues.create_comment(issue_id, user.id, &body).await {
        Ok(comment) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "comment": comment })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to store comment");
            JsonResponse::server_error("Failed to add comment").into_response()
        }
    }
}
