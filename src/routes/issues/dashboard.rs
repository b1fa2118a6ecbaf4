use std::str::FromStr;

use super::prelude::*;
use crate::models::issue::DashboardStats;

#[derive(Debug, Deserialize, Default)]
pub struct DashboardQuery {
    pub status: Option<String>,
}

/// GET /api/issues/authority?status= — the authority's area-scoped feed.
///
/// An authority with no declared categories sees everything (default-open);
/// declared categories restrict the feed, and the optional status filter
/// narrows it further. Stats are computed over the filtered set, not the
/// global one.
pub async fn authority_dashboard(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let user = match ensure_user(&state, &claims).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    if user.role != UserRole::Authority {
        return JsonResponse::forbidden("Authority access only").into_response();
    }

    let status = match query.status.as_deref() {
        None | Some("all") | Some("") => None,
        Some(raw) => match IssueStatus::from_str(raw) {
            Ok(status) => Some(status),
            Err(()) => return JsonResponse::bad_request("Invalid status filter").into_response(),
        },
    };

    // Stored as plain strings; anything unrecognized is ignored rather than
    // silently filtering everything out.
    let categories: Vec<IssueCategory> = user
        .area_categories
        .iter()
        .filter_map(|c| IssueCategory::from_str(c).ok())
        .collect();

    let issues = match state.issues.list_issues_filtered(&categories, status).await {
        Ok(issues) => issues,
        Err(err) => {
            error!(?err, user_id = %user.id, "failed to load dashboard issues");
            return JsonResponse::server_error("Failed to fetch issues").into_response();
        }
    };

    let stats = DashboardStats::from_issues(&issues, OffsetDateTime::now_utc());

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "issues": issues,
            "stats": stats,
            "authority": user
        })),
    )
        .into_response()
}
