pub(crate) use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
pub(crate) use serde::Deserialize;
pub(crate) use serde_json::json;
pub(crate) use time::OffsetDateTime;
pub(crate) use tracing::{error, warn};
pub(crate) use uuid::Uuid;

pub(crate) use crate::{
    models::issue::{GeoLocation, IssueCategory, IssueStatus, TargetGroup},
    models::user::UserRole,
    responses::JsonResponse,
    routes::auth::{identity::ensure_user, session::AuthSession},
    state::AppState,
};
