use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role")] // Matches the Postgres enum name
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Citizen,
    Authority,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Citizen => "citizen",
            UserRole::Authority => "authority",
        };
        write!(f, "{}", s)
    }
}

/// An authority's self-declared coverage filter. Empty lists mean
/// "everything is visible" on the dashboard, not "nothing".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoverageArea {
    pub districts: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: uuid::Uuid,
    /// External auth subject id (unique). The hosted identity provider owns
    /// authentication; this is the only field we keep from its token.
    pub subject: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: UserRole,
    // Gamification counters
    pub points: i32,
    pub badges: Vec<String>,
    pub issues_raised: i32,
    pub issues_solved: i32,
    pub volunteer_count: i32,
    // Authority-facing
    pub rating: f64,
    pub total_resolved: i32,
    pub total_ignored: i32,
    pub area_districts: Vec<String>,
    pub area_categories: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn area(&self) -> CoverageArea {
        CoverageArea {
            districts: self.area_districts.clone(),
            categories: self.area_categories.clone(),
        }
    }
}

/// Author projection embedded in issue and comment payloads.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, sqlx::FromRow)]
pub struct PublicUser {
    pub id: uuid::Uuid,
    pub name: String,
    pub avatar: String,
    pub role: UserRole,
}

/// Fields for lazily provisioning a user on first authenticated request.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub subject: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: UserRole,
}
