use super::prelude::*;

/// POST /api/issues/{id}/like — toggle like/unlike, returns the new count.
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(issue_id): Path<Uuid>,
) -> Response {
    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.issues.find_issue_by_id(issue_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to load issue for like toggle");
            return JsonResponse::server_error("Failed to update like").into_response();
        }
    }

    let already_liked = match state.issues.has_liked(issue_id, user.id).await {
        Ok(liked) => liked,
        Err(err) => {
            error!(?err, %issue_id, "failed to check like membership");
            return JsonResponse::server_error("Failed to update like").into_response();
        }
    };

    let result = if already_liked {
        state.issues.remove_like(issue_id, user.id).await
    } else {
        state.issues.add_like(issue_id, user.id).await
    };
    if let Err(err) = result {
        error!(?err, %issue_id, "failed to toggle like");
        return JsonResponse::server_error("Failed to update like").into_response();
    }

    match state.issues.count_likes(issue_id).await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({ "liked": !already_liked, "count": count })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to count likes");
            JsonResponse::server_error("Failed to update like").into_response()
        }
    }
}

/// POST /api/issues/{id}/volunteer — toggle volunteering. Joining also pays
/// the volunteer points; leaving only drops the membership count.
pub async fn toggle_volunteer(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(issue_id): Path<Uuid>,
) -> Response {
    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.issues.find_issue_by_id(issue_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to load issue for volunteer toggle");
            return JsonResponse::server_error("Failed to toggle volunteer").into_response();
        }
    }

    let already_volunteered = match state.issues.has_volunteered(issue_id, user.id).await {
        Ok(volunteered) => volunteered,
        Err(err) => {
            error!(?err, %issue_id, "failed to check volunteer membership");
            return JsonResponse::server_error("Failed to toggle volunteer").into_response();
        }
    };

    let result = if already_volunteered {
        state.issues.remove_volunteer(issue_id, user.id).await
    } else {
        state.issues.add_volunteer(issue_id, user.id).await
    };
    if let Err(err) = result {
        error!(?err, %issue_id, "failed to toggle volunteer");
        return JsonResponse::server_error("Failed to toggle volunteer").into_response();
    }

    if let Err(err) = state
        .users
        .record_volunteer_toggle(user.id, !already_volunteered)
        .await
    {
        error!(?err, user_id = %user.id, "failed to adjust volunteer stats");
    }

    match state.issues.count_volunteers(issue_id).await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({ "volunteered": !already_volunteered, "count": count })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to count volunteers");
            JsonResponse::server_error("Failed to toggle volunteer").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::models::issue::IssueCategory;
    use crate::routes::issues::test_support::{
        base_state, sample_citizen, seed_issue, test_claims,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn like_toggle_round_trips() {
        let db = Arc::new(MockDb::default());
        let citizen = sample_citizen();
        db.insert_user(citizen.clone());
        let issue = seed_issue(
            &db,
            citizen.id,
            IssueCategory::Road,
            IssueStatus::Pending,
            None,
        );
        let state = base_state(db.clone());

        let first = toggle_like(
            State(state.clone()),
            AuthSession(test_claims(&citizen)),
            Path(issue.id),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);
        let body = axum::body::to_bytes(first.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["liked"], true);
        assert_eq!(json["count"], 1);

        let second = toggle_like(
            State(state),
            AuthSession(test_claims(&citizen)),
            Path(issue.id),
        )
        .await;
        let body = axum::body::to_bytes(second.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["liked"], false);
        assert_eq!(json["count"], 0);
        assert!(db.issue(issue.id).unwrap().likes.is_empty());
    }

    #[tokio::test]
    async fn liking_a_missing_issue_is_not_found() {
        let db = Arc::new(MockDb::default());
        let citizen = sample_citizen();
        db.insert_user(citizen.clone());
        let state = base_state(db);

        let response = toggle_like(
            State(state),
            AuthSession(test_claims(&citizen)),
            Path(Uuid::new_v4()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn volunteering_pays_points_once_on_join() {
        let db = Arc::new(MockDb::default());
        let citizen = sample_citizen();
        db.insert_user(citizen.clone());
        let issue = seed_issue(
            &db,
            citizen.id,
            IssueCategory::Garbage,
            IssueStatus::Pending,
            None,
        );
        let state = base_state(db.clone());

        toggle_volunteer(
            State(state.clone()),
            AuthSession(test_claims(&citizen)),
            Path(issue.id),
        )
        .await;
        let joined = db.user(citizen.id).unwrap();
        assert_eq!(joined.volunteer_count, 1);
        assert_eq!(joined.points, 5);

        toggle_volunteer(
            State(state),
            AuthSession(test_claims(&citizen)),
            Path(issue.id),
        )
        .await;
        let left = db.user(citizen.id).unwrap();
        assert_eq!(left.volunteer_count, 0);
        // Leaving does not claw the points back.
        assert_eq!(left.points, 5);
        assert!(db.issue(issue.id).unwrap().volunteers.is_empty());
    }
}
