//! Badge rules as declarative threshold tables, one per role.
//!
//! Identifiers are stored in users' badge sets and must stay stable once
//! shipped. Granting is append-only; evaluation with unchanged counters is a
//! no-op.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::user::{User, UserRole};

/// Counter a badge rule thresholds on. Ratings are the only non-integer
/// stat, so everything is compared as f64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    IssuesRaised,
    IssuesSolved,
    VolunteerCount,
    Points,
    TotalResolved,
    Rating,
}

impl StatField {
    pub fn value_for(self, user: &User) -> f64 {
        match self {
            StatField::IssuesRaised => user.issues_raised as f64,
            StatField::IssuesSolved => user.issues_solved as f64,
            StatField::VolunteerCount => user.volunteer_count as f64,
            StatField::Points => user.points as f64,
            StatField::TotalResolved => user.total_resolved as f64,
            StatField::Rating => user.rating,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BadgeRule {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub field: StatField,
    pub threshold: f64,
}

impl BadgeRule {
    pub fn earned_by(&self, user: &User) -> bool {
        self.field.value_for(user) >= self.threshold
    }
}

pub const CITIZEN_BADGES: &[BadgeRule] = &[
    BadgeRule {
        id: "first_step",
        label: "First Step",
        description: "Raised your first issue",
        field: StatField::IssuesRaised,
        threshold: 1.0,
    },
    BadgeRule {
        id: "reporter",
        label: "Reporter",
        description: "Raised 5 issues",
        field: StatField::IssuesRaised,
        threshold: 5.0,
    },
    BadgeRule {
        id: "community_hero",
        label: "Community Hero",
        description: "Raised 10 issues",
        field: StatField::IssuesRaised,
        threshold: 10.0,
    },
    BadgeRule {
        id: "active",
        label: "Active Citizen",
        description: "Raised 25 issues",
        field: StatField::IssuesRaised,
        threshold: 25.0,
    },
    BadgeRule {
        id: "problem_solver",
        label: "Problem Solver",
        description: "Had an issue resolved",
        field: StatField::IssuesSolved,
        threshold: 1.0,
    },
    BadgeRule {
        id: "fixer",
        label: "Fixer",
        description: "Had 5 issues resolved",
        field: StatField::IssuesSolved,
        threshold: 5.0,
    },
    BadgeRule {
        id: "volunteer",
        label: "Volunteer",
        description: "Volunteered for 3 issues",
        field: StatField::VolunteerCount,
        threshold: 3.0,
    },
    BadgeRule {
        id: "century",
        label: "Century",
        description: "Earned 100 points",
        field: StatField::Points,
        threshold: 100.0,
    },
    BadgeRule {
        id: "legend",
        label: "Legend",
        description: "Earned 500 points",
        field: StatField::Points,
        threshold: 500.0,
    },
];

pub const AUTHORITY_BADGES: &[BadgeRule] = &[
    BadgeRule {
        id: "first_response",
        label: "First Response",
        description: "Resolved your first issue",
        field: StatField::TotalResolved,
        threshold: 1.0,
    },
    BadgeRule {
        id: "dependable",
        label: "Dependable",
        description: "Resolved 5 issues",
        field: StatField::TotalResolved,
        threshold: 5.0,
    },
    BadgeRule {
        id: "workhorse",
        label: "Workhorse",
        description: "Resolved 25 issues",
        field: StatField::TotalResolved,
        threshold: 25.0,
    },
    BadgeRule {
        id: "top_rated",
        label: "Top Rated",
        description: "Holding a rating of 4.5 or better",
        field: StatField::Rating,
        threshold: 4.5,
    },
    BadgeRule {
        id: "backbone",
        label: "Backbone",
        description: "Earned 500 points",
        field: StatField::Points,
        threshold: 500.0,
    },
];

pub fn rules_for_role(role: UserRole) -> &'static [BadgeRule] {
    match role {
        UserRole::Citizen => CITIZEN_BADGES,
        UserRole::Authority => AUTHORITY_BADGES,
    }
}

/// Badge ids the user has earned but not yet stored. Callers persist the
/// returned ids with an add-to-set write.
pub fn compute_new_badges(user: &User) -> Vec<&'static str> {
    let existing: HashSet<&str> = user.badges.iter().map(String::as_str).collect();
    rules_for_role(user.role)
        .iter()
        .filter(|rule| !existing.contains(rule.id) && rule.earned_by(user))
        .map(|rule| rule.id)
        .collect()
}

/// A rule plus whether the user holds it, for the profile page.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub rule: BadgeRule,
    pub earned: bool,
}

pub fn badge_statuses(user: &User) -> Vec<BadgeStatus> {
    let earned: HashSet<&str> = user.badges.iter().map(String::as_str).collect();
    rules_for_role(user.role)
        .iter()
        .map(|rule| BadgeStatus {
            rule: *rule,
            earned: earned.contains(rule.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn citizen() -> User {
        User {
            id: Uuid::new_v4(),
            subject: "user_test".into(),
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

    #[test]
    fn fresh_citizen_earns_nothing() {
        assert!(compute_new_badges(&citizen()).is_empty());
    }

    #[test]
    fn thresholds_grant_once_counters_cross() {
        let mut user = citizen();
        user.issues_raised = 5;
        user.points = 120;

        let mut earned = compute_new_badges(&user);
        earned.sort_unstable();
        assert_eq!(earned, vec!["century", "first_step", "reporter"]);
    }

    #[test]
    fn already_held_badges_are_never_regranted() {
        let mut user = citizen();
        user.issues_raised = 5;
        user.badges = vec!["first_step".into(), "reporter".into()];

        assert!(compute_new_badges(&user).is_empty());
    }

    #[test]
    fn evaluation_is_idempotent_for_unchanged_counters() {
        let mut user = citizen();
        user.issues_solved = 1;

        let first = compute_new_badges(&user);
        assert_eq!(first, vec!["problem_solver"]);
        user.badges.extend(first.iter().map(|id| id.to_string()));

        assert!(compute_new_badges(&user).is_empty());
    }

    #[test]
    fn authority_rules_use_authority_counters() {
        let mut user = citizen();
        user.role = UserRole::Authority;
        user.total_resolved = 5;
        user.rating = 4.6;

        let mut earned = compute_new_badges(&user);
        earned.sort_unstable();
        assert_eq!(earned, vec!["dependable", "first_response", "top_rated"]);
    }

    #[test]
    fn badge_statuses_flag_earned_rules() {
        let mut user = citizen();
        user.badges = vec!["first_step".into()];

        let statuses = badge_statuses(&user);
        assert_eq!(statuses.len(), CITIZEN_BADGES.len());
        assert!(statuses
            .iter()
            .find(|s| s.rule.id == "first_step")
            .unwrap()
            .earned);
        assert!(!statuses
            .iter()
            .find(|s| s.rule.id == "legend")
            .unwrap()
            .earned);
    }
}
