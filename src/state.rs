use std::sync::Arc;

use crate::config::Config;
use crate::db::{issue_repository::IssueRepository, user_repository::UserRepository};
use crate::services::media_storage::MediaStorage;
use crate::utils::jwt::TokenKeys;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub issues: Arc<dyn IssueRepository>,
    pub media: Arc<dyn MediaStorage>,
    pub config: Arc<Config>,
    pub token_keys: Arc<TokenKeys>,
}
