use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::issue_repository::{IssueRepository, StatusTransitionWrite};
use crate::db::user_repository::UserRepository;
use crate::models::comment::{Comment, CommentWithAuthor};
use crate::models::issue::{
    GeoLocation, Issue, IssueCategory, IssueChanges, IssueStatus, IssueSummary, IssueWithAuthor,
    NewIssue,
};
use crate::models::user::{NewUser, PublicUser, User, UserRole};
use crate::scoring::{
    AUTHOR_RESOLUTION_POINTS, ISSUE_CREATION_POINTS, RESOLUTION_POINTS, VOLUNTEER_JOIN_POINTS,
};

/// In-memory stand-in for both Postgres repositories. Used by handler tests;
/// compiled unconditionally so integration tests can reach it too.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockDb {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub issues: Mutex<HashMap<Uuid, Issue>>,
    pub comments: Mutex<Vec<Comment>>,
    pub should_fail: bool,
}

#[allow(dead_code)]
impl MockDb {
    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn insert_issue(&self, issue: Issue) {
        self.issues.lock().unwrap().insert(issue.id, issue);
    }

    pub fn user(&self, user_id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }

    pub fn issue(&self, issue_id: Uuid) -> Option<Issue> {
        self.issues.lock().unwrap().get(&issue_id).cloned()
    }

    fn fail_check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }

    fn public_user(&self, user_id: Uuid) -> Option<PublicUser> {
        self.users.lock().unwrap().get(&user_id).map(|u| PublicUser {
            id: u.id,
            name: u.name.clone(),
            avatar: u.avatar.clone(),
            role: u.role,
        })
    }

    fn with_author(&self, issue: Issue) -> Result<IssueWithAuthor, sqlx::Error> {
        let author = self
            .public_user(issue.author_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(IssueWithAuthor { issue, author })
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.subject == subject)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.fail_check()?;
        Ok(self.user(user_id))
    }

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        self.fail_check()?;
        Ok(self.public_user(user_id))
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, sqlx::Error> {
        self.fail_check()?;
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.subject == user.subject) {
            return Err(sqlx::Error::Protocol("duplicate subject".into()));
        }

        let created = User {
            id: Uuid::new_v4(),
            subject: user.subject.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
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
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_role(&self, user_id: Uuid, role: UserRole) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(sqlx::Error::RowNotFound)?;
        user.role = role;
        Ok(())
    }

    async fn record_issue_raised(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.issues_raised += 1;
            user.points += ISSUE_CREATION_POINTS;
        }
        Ok(())
    }

    async fn record_issue_removed(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.issues_raised -= 1;
        }
        Ok(())
    }

    async fn record_volunteer_toggle(
        &self,
        user_id: Uuid,
        joined: bool,
    ) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            if joined {
                user.volunteer_count += 1;
                user.points += VOLUNTEER_JOIN_POINTS;
            } else {
                user.volunteer_count -= 1;
            }
        }
        Ok(())
    }

    async fn grant_badges(&self, user_id: Uuid, badges: &[&str]) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            for badge in badges {
                if !user.badges.iter().any(|b| b == badge) {
                    user.badges.push(badge.to_string());
                }
            }
        }
        Ok(())
    }

    async fn update_area(
        &self,
        user_id: Uuid,
        districts: &[String],
        categories: &[String],
    ) -> Result<Option<User>, sqlx::Error> {
        self.fail_check()?;
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(&user_id).map(|user| {
            user.area_districts = districts.to_vec();
            user.area_categories = categories.to_vec();
            user.clone()
        }))
    }
}

#[async_trait]
impl IssueRepository for MockDb {
    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueWithAuthor, sqlx::Error> {
        self.fail_check()?;
        let now = OffsetDateTime::now_utc();
        let created = Issue {
            id: Uuid::new_v4(),
            author_id: issue.author_id,
            title: issue.title.clone(),
            description: issue.description.clone(),
            category: issue.category,
            status: IssueStatus::Pending,
            target_group: issue.target_group,
            photo: issue.photo.clone(),
            location: issue.location.clone(),
            district: issue.district.clone(),
            likes: vec![],
            volunteers: vec![],
            authority_response: String::new(),
            responded_by: None,
            responded_at: None,
            deadline: issue.deadline,
            created_at: now,
            updated_at: now,
        };
        self.issues
            .lock()
            .unwrap()
            .insert(created.id, created.clone());
        self.with_author(created)
    }

    async fn find_issue_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error> {
        self.fail_check()?;
        Ok(self.issue(issue_id))
    }

    async fn find_issue_with_author(
        &self,
        issue_id: Uuid,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error> {
        self.fail_check()?;
        match self.issue(issue_id) {
            Some(issue) => Ok(Some(self.with_author(issue)?)),
            None => Ok(None),
        }
    }

    async fn list_issues(&self) -> Result<Vec<IssueWithAuthor>, sqlx::Error> {
        self.list_issues_filtered(&[], None).await
    }

    async fn list_issues_filtered(
        &self,
        categories: &[IssueCategory],
        status: Option<IssueStatus>,
    ) -> Result<Vec<IssueWithAuthor>, sqlx::Error> {
        self.fail_check()?;
        let mut issues: Vec<Issue> = self
            .issues
            .lock()
            .unwrap()
            .values()
            .filter(|i| categories.is_empty() || categories.contains(&i.category))
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        issues
            .into_iter()
            .map(|issue| self.with_author(issue))
            .collect()
    }

    async fn list_recent_issues_by_author(
        &self,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Vec<IssueSummary>, sqlx::Error> {
        self.fail_check()?;
        let mut issues: Vec<Issue> = self
            .issues
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.author_id == author_id)
            .cloned()
            .collect();
        issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        issues.truncate(limit as usize);

        Ok(issues
            .into_iter()
            .map(|i| IssueSummary {
                id: i.id,
                title: i.title,
                category: i.category,
                status: i.status,
                photo: i.photo,
                created_at: i.created_at,
            })
            .collect())
    }

    async fn update_issue(
        &self,
        issue_id: Uuid,
        changes: &IssueChanges,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error> {
        self.fail_check()?;
        let updated = {
            let mut issues = self.issues.lock().unwrap();
            match issues.get_mut(&issue_id) {
                Some(issue) => {
                    if let Some(title) = &changes.title {
                        issue.title = title.clone();
                    }
                    if let Some(description) = &changes.description {
                        issue.description = description.clone();
                    }
                    if let Some(category) = changes.category {
                        issue.category = category;
                    }
                    if let Some(target_group) = changes.target_group {
                        issue.target_group = target_group;
                    }
                    if let Some(photo) = &changes.photo {
                        issue.photo = photo.clone();
                    }
                    if let Some(location) = &changes.location {
                        issue.location = Some(GeoLocation {
                            address: location.address.clone(),
                            lat: location.lat,
                            lng: location.lng,
                        });
                    }
                    if let Some(district) = &changes.district {
                        issue.district = district.clone();
                    }
                    issue.updated_at = OffsetDateTime::now_utc();
                    Some(issue.clone())
                }
                None => None,
            }
        };

        match updated {
            Some(issue) => Ok(Some(self.with_author(issue)?)),
            None => Ok(None),
        }
    }

    async fn delete_issue(&self, issue_id: Uuid) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        Ok(self.issues.lock().unwrap().remove(&issue_id).is_some())
    }

    async fn apply_status_transition(
        &self,
        write: &StatusTransitionWrite,
    ) -> Result<Option<IssueWithAuthor>, sqlx::Error> {
        self.fail_check()?;

        let updated = {
            let mut issues = self.issues.lock().unwrap();
            let Some(issue) = issues.get_mut(&write.issue_id) else {
                return Ok(None);
            };

            let mut effects = write.effects;
            if write.status == IssueStatus::Completed && issue.status == IssueStatus::Completed {
                effects = Default::default();
            }

            issue.status = write.status;
            issue.responded_by = Some(write.responded_by);
            issue.responded_at = Some(write.responded_at);
            if let Some(response) = &write.response {
                issue.authority_response = response.clone();
            }
            issue.updated_at = write.responded_at;
            let updated = issue.clone();

            let mut users = self.users.lock().unwrap();
            if let Some(rating) = effects.authority_rating {
                if let Some(authority) = users.get_mut(&write.responded_by) {
                    authority.rating = rating;
                    if effects.authority_resolution_counters {
                        authority.total_resolved += 1;
                        authority.issues_solved += 1;
                        authority.points += RESOLUTION_POINTS;
                    }
                }
            }
            if effects.author_reward {
                if let Some(author) = users.get_mut(&write.author_id) {
                    author.issues_solved += 1;
                    author.points += AUTHOR_RESOLUTION_POINTS;
                }
            }

            updated
        };

        Ok(Some(self.with_author(updated)?))
    }

    async fn has_liked(&self, issue_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .issue(issue_id)
            .map(|i| i.likes.contains(&user_id))
            .unwrap_or(false))
    }

    async fn add_like(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(issue) = self.issues.lock().unwrap().get_mut(&issue_id) {
            if !issue.likes.contains(&user_id) {
                issue.likes.push(user_id);
            }
        }
        Ok(())
    }

    async fn remove_like(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(issue) = self.issues.lock().unwrap().get_mut(&issue_id) {
            issue.likes.retain(|id| *id != user_id);
        }
        Ok(())
    }

    async fn count_likes(&self, issue_id: Uuid) -> Result<i64, sqlx::Error> {
        self.fail_check()?;
        Ok(self.issue(issue_id).map(|i| i.likes.len() as i64).unwrap_or(0))
    }

    async fn has_volunteered(&self, issue_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .issue(issue_id)
            .map(|i| i.volunteers.contains(&user_id))
            .unwrap_or(false))
    }

    async fn add_volunteer(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(issue) = self.issues.lock().unwrap().get_mut(&issue_id) {
            if !issue.volunteers.contains(&user_id) {
                issue.volunteers.push(user_id);
            }
        }
        Ok(())
    }

    async fn remove_volunteer(&self, issue_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(issue) = self.issues.lock().unwrap().get_mut(&issue_id) {
            issue.volunteers.retain(|id| *id != user_id);
        }
        Ok(())
    }

    async fn count_volunteers(&self, issue_id: Uuid) -> Result<i64, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .issue(issue_id)
            .map(|i| i.volunteers.len() as i64)
            .unwrap_or(0))
    }

    async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        self.fail_check()?;
        let mut comments: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        comments
            .into_iter()
            .map(|comment| {
                let author = self
                    .public_user(comment.author_id)
                    .ok_or(sqlx::Error::RowNotFound)?;
                Ok(CommentWithAuthor { comment, author })
            })
            .collect()
    }

    async fn create_comment(
        &self,
        issue_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Comment, sqlx::Error> {
        self.fail_check()?;
        let comment = Comment {
            id: Uuid::new_v4(),
            issue_id,
            author_id,
            body: body.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.lock().unwrap().push(comment.clone());
        Ok(comment)
    }
}
