use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::{NewUser, PublicUser, User, UserRole};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, sqlx::Error>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error>;

    /// Inserts a freshly provisioned user. Concurrent first requests for the
    /// same subject surface as a unique violation; callers retry as a fetch.
    async fn create_user(&self, user: &NewUser) -> Result<User, sqlx::Error>;

    async fn set_role(&self, user_id: Uuid, role: UserRole) -> Result<(), sqlx::Error>;

    /// issues_raised += 1, points += ISSUE_CREATION_POINTS.
    async fn record_issue_raised(&self, user_id: Uuid) -> Result<(), sqlx::Error>;

    /// issues_raised -= 1, applied when an issue is deleted.
    async fn record_issue_removed(&self, user_id: Uuid) -> Result<(), sqlx::Error>;

    /// volunteer_count += 1 and points += VOLUNTEER_JOIN_POINTS on join;
    /// volunteer_count -= 1 on leave.
    async fn record_volunteer_toggle(&self, user_id: Uuid, joined: bool)
        -> Result<(), sqlx::Error>;

    /// Append-only add-to-set on the badge list.
    async fn grant_badges(&self, user_id: Uuid, badges: &[&str]) -> Result<(), sqlx::Error>;

    async fn update_area(
        &self,
        user_id: Uuid,
        districts: &[String],
        categories: &[String],
    ) -> Result<Option<User>, sqlx::Error>;
}
