use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::issue_repository::{IssueRepository, StatusTransitionWrite};
use crate::models::comment::{Comment, CommentWithAuthor};
use crate::models::issue::{
    GeoLocation, Issue, IssueCategory, IssueChanges, IssueStatus, IssueSummary, IssueWithAuthor,
    NewIssue, TargetGroup,
};
use crate::models::user::{PublicUser, UserRole};
use crate::scoring::{AUTHOR_RESOLUTION_POINTS, RESOLUTION_POINTS};

pub struct PostgresIssueRepository {
    pub pool: PgPool,
}

const ISSUE_SELECT: &str = r#"
    SELECT i.id, i.author_id, i.title, i.description, i.category, i.status, i.target_group,
           i.photo, i.location_address, i.location_lat, i.location_lng, i.district,
           i.authority_response, i.responded_by, i.responded_at, i.deadline,
           i.created_at, i.updated_at,
           COALESCE((SELECT array_agg(l.user_id) FROM issue_likes l WHERE l.issue_id = i.id),
                    ARRAY[]::uuid[]) AS likes,
           COALESCE((SELECT array_agg(v.user_id) FROM issue_volunteers v WHERE v.issue_id = i.id),
                    ARRAY[]::uuid[]) AS volunteers,
           u.name AS author_name, u.avatar AS author_avatar, u.role AS author_role
    FROM issues i
    JOIN users u ON u.id = i.author_id
"#;

/// Flat join row; split into `Issue` + `PublicUser` after fetching.
#[derive(FromRow)]
struct IssueAuthorRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    description: String,
    category: IssueCategory,
    status: IssueStatus,
    target_group: TargetGroup,
    photo: String,
    location_address: Option<String>,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
    district: String,
    authority_response: String,
    responded_by: Option<Uuid>,
    responded_at: Option<OffsetDateTime>,
    deadline: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    likes: Vec<Uuid>,
    volunteers: Vec<Uuid>,
    author_name: String,
    author_avatar: String,
    author_role: UserRole,
}

impl From<IssueAuthorRow> for IssueWithAuthor {
    fn from(row: IssueAuthorRow) -> Self {
        let location = match (row.location_lat, row.location_lng) {
            (Some(lat), Some(lng)) => Some(GeoLocation {
                address: row.location_address.clone().unwrap_or_default(),
                lat,
                lng,
            }),
            _ => None,
        };

        IssueWithAuthor {
            author: PublicUser {
                id: row.author_id,
                name: row.author_name,
                avatar: row.author_avatar,
                role: row.author_role,
            },
            issue: Issue {
                id: row.id,
                author_id: row.author_id,
                title: row.title,
                description: row.description,
                category: row.category,
                status: row.status,
                target_group: row.target_group,
                photo: row.photo,
                location,
                district: row.district,
                likes: row.likes,
                volunteers: row.volunteers,
                authority_response: row.authority_response,
                responded_by: row.responded_by,
                responded_at: row.responded_at,
                deadline: row.deadline,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[derive(FromRow)]
struct CommentAuthorRow {
    id: Uuid,
    issue_id: Uuid,
    author_id: Uuid,
    body: String,
    created_at: OffsetDateTime,
    author_name: String,
    author_avatar: String,
    author_role: UserRole,
}

impl From<CommentAuthorRow> for CommentWithAuthor {
    fn from(row: CommentAuthorRow) -> Self {
        CommentWithAuthor {
            author: PublicUser {
                id: row.author_id,
                name: row.author_name,
                avatar: row.author_avatar,
                role: row.author_role,
            },
            comment: Comment {
                id: row.id,
                issue_id: row.issue_id,
                author_id: row.author_id,
                body: row.body,
                created_at: row.created_at,
            },
        }
    }
}

#[async_trait]
impl IssueRepository for PostgresIssueRepository {
    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueWithAuthor, sqlx::Error> {
        let issue_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO issues (
                author_id, title, description, category, target_group, photo,
                location_address, location_lat, location_lng, district, deadline
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(issue.author_id)
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(issue.category)
        .bind(issue.target_group)
        .bind(&issue.photo)
        .bind(issue.location.as_ref().map(|l| l.address.clone()))
        .bind(issue.location.as_ref().map(|l| l.lat))
        .bind(issue.location.as_ref().map(|l| l.lng))
        .bind(&issue.district)
        .bind(issue.deadline)
        .fetch_one(&self.pool)
        .await?;

        self.find_issue_with_author(issue_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn find_issue_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error> {
        Ok(self
            .find_issue_with_author(issue_id)
            .await?
            .map(|found| found.issue))
    }

    async fn find_issue_with_author(
        &self,
        issue_id: Uuid,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error> {
        let row = sqlx::query_as::<_, IssueAuthorRow>(&format!("{ISSUE_SELECT} WHERE i.id = $1"))
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(IssueWithAuthor::from))
    }

    async fn list_issues(&self) -> Result<Vec<IssueWithAuthor>, sqlx::Error> {
        let rows =
            sqlx::query_as::<_, IssueAuthorRow>(&format!("{ISSUE_SELECT} ORDER BY i.created_at DESC"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(IssueWithAuthor::from).collect())
    }

    async fn list_issues_filtered(
        &self,
        categories: &[IssueCategory],
        status: Option<IssueStatus>,
    ) -> Result<Vec<IssueWithAuthor>, sqlx::Error> {
        let rows = sqlx::query_as::<_, IssueAuthorRow>(&format!(
            r#"
            {ISSUE_SELECT}
            WHERE (cardinality($1::issue_category[]) = 0 OR i.category = ANY($1))
              AND ($2::issue_status IS NULL OR i.status = $2)
            ORDER BY i.created_at DESC
            "#
        ))
        .bind(categories.to_vec())
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(IssueWithAuthor::from).collect())
    }

    async fn list_recent_issues_by_author(
        &self,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Vec<IssueSummary>, sqlx::Error> {
        sqlx::query_as::<_, IssueSummary>(
            r#"
            SELECT id, title, category, status, photo, created_at
            FROM issues
            WHERE author_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_issue(
        &self,
        issue_id: Uuid,
        changes: &IssueChanges,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE issues
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                target_group = COALESCE($5, target_group),
                photo = COALESCE($6, photo),
                location_address = COALESCE($7, location_address),
                location_lat = COALESCE($8, location_lat),
                location_lng = COALESCE($9, location_lng),
                district = COALESCE($10, district),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(issue_id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.category)
        .bind(changes.target_group)
        .bind(changes.photo.as_deref())
        .bind(changes.location.as_ref().map(|l| l.address.clone()))
        .bind(changes.location.as_ref().map(|l| l.lat))
        .bind(changes.location.as_ref().map(|l| l.lng))
        .bind(changes.district.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_issue_with_author(issue_id).await
    }

    async fn delete_issue(&self, issue_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM issues WHERE id = $1")
            .bind(issue_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_status_transition(
        &self,
        write: &StatusTransitionWrite,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Re-check the completion guard under row lock: a concurrent request
        // may have completed the issue after the handler took its snapshot.
        let locked_status: Option<IssueStatus> =
            sqlx::query_scalar("SELECT status FROM issues WHERE id = $1 FOR UPDATE")
                .bind(write.issue_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(locked_status) = locked_status else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut effects = write.effects;
        if write.status == IssueStatus::Completed && locked_status == IssueStatus::Completed {
            effects = Default::default();
        }

        sqlx::query(
            r#"
            UPDATE issues
            SET status = $2,
                responded_by = $3,
                responded_at = $4,
                authority_response = COALESCE($5, authority_response),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(write.issue_id)
        .bind(write.status)
        .bind(write.responded_by)
        .bind(write.responded_at)
        .bind(write.response.as_deref())
        .execute(&mut *tx)
        .await?;

        if let Some(rating) = effects.authority_rating {
            if effects.authority_resolution_counters {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET rating = $2,
                        total_resolved = total_resolved + 1,
                        issues_solved = issues_solved + 1,
                        points = points + $3,
                        updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(write.responded_by)
                .bind(rating)
                .bind(RESOLUTION_POINTS)
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query("UPDATE users SET rating = $2, updated_at = now() WHERE id = $1")
                    .bind(write.responded_by)
                    .bind(rating)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        if effects.author_reward {
            sqlx::query(
                r#"
                UPDATE users
                SET issues_solved = issues_solved + 1,
                    points = points + $2,
                    updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(write.author_id)
            .bind(AUTHOR_RESOLUTION_POINTS)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_issue_with_author(write.issue_id).await
    }

    async fn has_liked(&self, issue_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM issue_likes WHERE issue_id = $1 AND user_id = $2",
        )
        .bind(issue_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn add_like(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO issue_likes (issue_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(issue_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn remove_like(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM issue_likes WHERE issue_id = $1 AND user_id = $2")
            .bind(issue_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map(|_| ())
    }

    async fn count_likes(&self, issue_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*)::bigint FROM issue_likes WHERE issue_id = $1")
            .bind(issue_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn has_volunteered(&self, issue_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM issue_volunteers WHERE issue_id = $1 AND user_id = $2",
        )
        .bind(issue_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn add_volunteer(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO issue_volunteers (issue_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(issue_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn remove_volunteer(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM issue_volunteers WHERE issue_id = $1 AND user_id = $2")
            .bind(issue_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map(|_| ())
    }

    async fn count_volunteers(&self, issue_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*)::bigint FROM issue_volunteers WHERE issue_id = $1")
            .bind(issue_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CommentAuthorRow>(
            r#"
            SELECT c.id, c.issue_id, c.author_id, c.body, c.created_at,
                   u.name AS author_name, u.avatar AS author_avatar, u.role AS author_role
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.issue_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CommentWithAuthor::from).collect())
    }

    async fn create_comment(
        &self,
        issue_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (issue_id, author_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, issue_id, author_id, body, created_at
            "#,
        )
        .bind(issue_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
    }
}
