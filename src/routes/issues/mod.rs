pub mod comments;
pub mod crud;
pub mod dashboard;
pub mod engagement;
mod helpers;
mod prelude;
pub mod status;

pub use comments::{add_comment, list_comments};
pub use crud::{create_issue, delete_issue, get_issue, list_issues, update_issue};
pub use dashboard::authority_dashboard;
pub use engagement::{toggle_like, toggle_volunteer};
pub use status::update_issue_status;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::config::Config;
    use crate::db::mock_db::MockDb;
    use crate::models::issue::{Issue, IssueCategory, IssueStatus, TargetGroup};
    use crate::models::user::{User, UserRole};
    use crate::routes::auth::claims::Claims;
    use crate::services::media_storage::MockMediaStorage;
    use crate::state::AppState;
    use crate::utils::jwt::TokenKeys;

    pub(crate) fn base_state(db: Arc<MockDb>) -> AppState {
        AppState {
            users: db.clone(),
            issues: db,
            media: Arc::new(MockMediaStorage::default()),
            config: Arc::new(Config {
                database_url: String::new(),
                frontend_origin: "http://localhost".into(),
                jwt_issuer: "test-issuer".into(),
                jwt_audience: "test-audience".into(),
                authority_secret_code: Some("test-code".into()),
                media: None,
            }),
            token_keys: Arc::new(
                TokenKeys::new(
                    b"0123456789abcdef0123456789abcdef",
                    "test-issuer",
                    "test-audience",
                )
                .expect("test JWT secret should be valid"),
            ),
        }
    }

    pub(crate) fn sample_citizen() -> User {
        let id = Uuid::new_v4();
        User {
            id,
            subject: format!("user_{id}"),
            name: "Test Citizen".into(),
            email: "citizen@example.com".into(),
            avatar: String::new(),
            role: UserRole::Citizen,
            points: 0,
            badges: vec![],
            issues_raised: 0,
            issues_solved: 0,
            volunteer_count: 0,
            rating: 5.0,
            total_resolved: 0,
            total_ignored: 0,
            area_districts: vec![],
            area_categories: vec![],
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub(crate) fn sample_authority() -> User {
        let mut user = sample_citizen();
        user.name = "Ward Office".into();
        user.email = "ward@example.gov".into();
        user.role = UserRole::Authority;
        user
    }

    pub(crate) fn test_claims(user: &User) -> Claims {
        Claims {
            sub: user.subject.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar: None,
            exp: 0,
            iss: "test-issuer".into(),
            aud: "test-audience".into(),
        }
    }

    pub(crate) fn seed_issue(
        db: &MockDb,
        author_id: Uuid,
        category: IssueCategory,
        status: IssueStatus,
        deadline: Option<OffsetDateTime>,
    ) -> Issue {
        let now = OffsetDateTime::now_utc();
        let issue = Issue {
            id: Uuid::new_v4(),
            author_id,
            title: "Leaking supply line".into(),
            description: "Water pooling by the intersection".into(),
            category,
            status,
            target_group: TargetGroup::Authority,
            photo: String::new(),
            location: None,
            district: String::new(),
            likes: vec![],
            volunteers: vec![],
            authority_response: String::new(),
            responded_by: None,
            responded_at: None,
            deadline,
            created_at: now,
            updated_at: now,
        };
        db.insert_issue(issue.clone());
        issue
    }
}
