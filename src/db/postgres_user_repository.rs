use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::user_repository::UserRepository;
use crate::models::user::{NewUser, PublicUser, User, UserRole};
use crate::scoring::{ISSUE_CREATION_POINTS, VOLUNTEER_JOIN_POINTS};

const USER_COLUMNS: &str = "id, subject, name, email, avatar, role, points, badges, \
     issues_raised, issues_solved, volunteer_count, rating, total_resolved, total_ignored, \
     area_districts, area_categories, created_at";

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE subject = $1"
        ))
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>("SELECT id, name, avatar, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (subject, name, email, avatar, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.subject)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.avatar)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_role(&self, user_id: Uuid, role: UserRole) -> Result<(), sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn record_issue_raised(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET issues_raised = issues_raised + 1,
                points = points + $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(ISSUE_CREATION_POINTS)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn record_issue_removed(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET issues_raised = issues_raised - 1, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn record_volunteer_toggle(
        &self,
        user_id: Uuid,
        joined: bool,
    ) -> Result<(), sqlx::Error> {
        if joined {
            sqlx::query(
                r#"
                UPDATE users
                SET volunteer_count = volunteer_count + 1,
                    points = points + $2,
                    updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .bind(VOLUNTEER_JOIN_POINTS)
            .execute(&self.pool)
            .await
            .map(|_| ())
        } else {
            sqlx::query(
                r#"
                UPDATE users
                SET volunteer_count = volunteer_count - 1,
                    updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map(|_| ())
        }
    }

    async fn grant_badges(&self, user_id: Uuid, badges: &[&str]) -> Result<(), sqlx::Error> {
        if badges.is_empty() {
            return Ok(());
        }

        let new: Vec<String> = badges.iter().map(|b| b.to_string()).collect();

        // Add-to-set: append then de-duplicate, never dropping stored ids.
        sqlx::query(
            r#"
            UPDATE users
            SET badges = (
                    SELECT COALESCE(array_agg(DISTINCT b), ARRAY[]::text[])
                    FROM unnest(badges || $2::text[]) AS b
                ),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(new)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn update_area(
        &self,
        user_id: Uuid,
        districts: &[String],
        categories: &[String],
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET area_districts = $2,
                area_categories = $3,
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(districts.to_vec())
        .bind(categories.to_vec())
        .fetch_optional(&self.pool)
        .await
    }
}
