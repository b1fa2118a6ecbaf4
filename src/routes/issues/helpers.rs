use super::prelude::*;
use crate::models::issue::Issue;
use crate::models::user::User;

/// Edit/delete rule: the original author, or any authority.
pub(crate) fn can_modify(user: &User, issue: &Issue) -> bool {
    issue.author_id == user.id || user.role == UserRole::Authority
}

/// Turns a data-URI into a CDN URL, degrading to "no photo" when the media
/// service is unconfigured or unreachable. Issue writes never fail on the
/// photo path.
pub(crate) async fn resolve_photo(state: &AppState, data_uri: &str) -> Option<String> {
    match state.media.upload_image(data_uri).await {
        Ok(Some(url)) => Some(url),
        Ok(None) => {
            warn!("media storage not configured, storing issue without photo");
            None
        }
        Err(err) => {
            warn!(?err, "photo upload failed, storing issue without photo");
            None
        }
    }
}
