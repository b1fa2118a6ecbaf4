use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::user::PublicUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "issue_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Road,
    Water,
    Electricity,
    Garbage,
    Safety,
    Other,
}

impl FromStr for IssueCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "road" => Ok(IssueCategory::Road),
            "water" => Ok(IssueCategory::Water),
            "electricity" => Ok(IssueCategory::Electricity),
            "garbage" => Ok(IssueCategory::Garbage),
            "safety" => Ok(IssueCategory::Safety),
            "other" => Ok(IssueCategory::Other),
            _ => Err(()),
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueCategory::Road => "road",
            IssueCategory::Water => "water",
            IssueCategory::Electricity => "electricity",
            IssueCategory::Garbage => "garbage",
            IssueCategory::Safety => "safety",
            IssueCategory::Other => "other",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "issue_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    InProgress,
    Completed,
}

impl FromStr for IssueStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IssueStatus::Pending),
            "in_progress" => Ok(IssueStatus::InProgress),
            "completed" => Ok(IssueStatus::Completed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueStatus::Pending => "pending",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// Whether an issue is routed to authorities, volunteer citizens, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "target_group", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TargetGroup {
    Authority,
    Volunteer,
    Both,
}

impl TargetGroup {
    /// Authority-targeted issues carry a 24h response deadline.
    pub fn includes_authority(self) -> bool {
        matches!(self, TargetGroup::Authority | TargetGroup::Both)
    }
}

impl FromStr for TargetGroup {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authority" => Ok(TargetGroup::Authority),
            "volunteer" => Ok(TargetGroup::Volunteer),
            "both" => Ok(TargetGroup::Both),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoLocation {
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub status: IssueStatus,
    pub target_group: TargetGroup,
    pub photo: String,
    pub location: Option<GeoLocation>,
    pub district: String,
    pub likes: Vec<Uuid>,
    pub volunteers: Vec<Uuid>,
    // Only meaningful once status has left `pending`.
    pub authority_response: String,
    pub responded_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub responded_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Issue {
    pub fn deadline_elapsed(&self, now: OffsetDateTime) -> bool {
        self.deadline.is_some_and(|d| now > d)
    }
}

/// Issue with its author populated, the shape every read endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct IssueWithAuthor {
    #[serde(flatten)]
    pub issue: Issue,
    pub author: PublicUser,
}

/// Trimmed projection for the profile page's recent-issues list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub id: Uuid,
    pub title: String,
    pub category: IssueCategory,
    pub status: IssueStatus,
    pub photo: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewIssue {
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub target_group: TargetGroup,
    pub photo: String,
    pub location: Option<GeoLocation>,
    pub district: String,
    pub deadline: Option<OffsetDateTime>,
}

/// Partial update for PUT; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct IssueChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<IssueCategory>,
    pub target_group: Option<TargetGroup>,
    pub photo: Option<String>,
    pub location: Option<GeoLocation>,
    pub district: Option<String>,
}

/// Aggregate counts for the authority dashboard, computed over the
/// already-filtered issue list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl DashboardStats {
    pub fn from_issues(issues: &[IssueWithAuthor], now: OffsetDateTime) -> Self {
        let of_status = |s: IssueStatus| issues.iter().filter(|i| i.issue.status == s).count();
        DashboardStats {
            total: issues.len(),
            pending: of_status(IssueStatus::Pending),
            in_progress: of_status(IssueStatus::InProgress),
            completed: of_status(IssueStatus::Completed),
            overdue: issues
                .iter()
                .filter(|i| {
                    i.issue.status != IssueStatus::Completed && i.issue.deadline_elapsed(now)
                })
                .count(),
        }
    }
}
