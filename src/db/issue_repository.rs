use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::comment::{Comment, CommentWithAuthor};
use crate::models::issue::{
    Issue, IssueCategory, IssueChanges, IssueStatus, IssueSummary, IssueWithAuthor, NewIssue,
};
use crate::scoring::TransitionEffects;

/// Everything the status-transition transaction writes, computed by the
/// handler from the pre-transition snapshot before any mutation happens.
#[derive(Debug, Clone)]
pub struct StatusTransitionWrite {
    pub issue_id: Uuid,
    pub status: IssueStatus,
    pub response: Option<String>,
    pub responded_by: Uuid,
    pub responded_at: OffsetDateTime,
    pub author_id: Uuid,
    pub effects: TransitionEffects,
}

#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueWithAuthor, sqlx::Error>;

    async fn find_issue_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error>;

    async fn find_issue_with_author(
        &self,
        issue_id: Uuid,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error>;

    /// All issues, newest first.
    async fn list_issues(&self) -> Result<Vec<IssueWithAuthor>, sqlx::Error>;

    /// Dashboard feed: empty `categories` means no category restriction,
    /// `status = None` means all statuses. Newest first.
    async fn list_issues_filtered(
        &self,
        categories: &[IssueCategory],
        status: Option<IssueStatus>,
    ) -> Result<Vec<IssueWithAuthor>, sqlx::Error>;

    async fn list_recent_issues_by_author(
        &self,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Vec<IssueSummary>, sqlx::Error>;

    async fn update_issue(
        &self,
        issue_id: Uuid,
        changes: &IssueChanges,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error>;

    async fn delete_issue(&self, issue_id: Uuid) -> Result<bool, sqlx::Error>;

    /// Applies the status fields and both user-side scoring mutations in a
    /// single transaction. The completed-guard is re-checked under row lock,
    /// so the resolution effects apply at most once even under concurrent
    /// requests.
    async fn apply_status_transition(
        &self,
        write: &StatusTransitionWrite,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error>;

    // Engagement sets. Adds are idempotent (add-to-set), removes report
    // whether a row was actually deleted.
    async fn has_liked(&self, issue_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>;
    async fn add_like(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>;
    async fn remove_like(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>;
    async fn count_likes(&self, issue_id: Uuid) -> Result<i64, sqlx::Error>;

    async fn has_volunteered(&self, issue_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>;
    async fn add_volunteer(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>;
    async fn remove_volunteer(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>;
    async fn count_volunteers(&self, issue_id: Uuid) -> Result<i64, sqlx::Error>;

    /// Comments for an issue, oldest first.
    async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<CommentWithAuthor>, sqlx::Error>;

    async fn create_comment(
        &self,
        issue_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Comment, sqlx::Error>;
}
