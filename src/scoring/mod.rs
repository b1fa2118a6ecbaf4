pub mod badges;

use time::{Duration, OffsetDateTime};

use crate::models::issue::{Issue, IssueStatus};

/// Hours an authority-targeted issue has before it counts as overdue.
pub const AUTHORITY_DEADLINE_HOURS: i64 = 24;

/// Points granted to the author when they file an issue.
pub const ISSUE_CREATION_POINTS: i32 = 10;
/// Points granted to the resolving authority on completion.
pub const RESOLUTION_POINTS: i32 = 15;
/// Points granted to the author when their issue is resolved.
pub const AUTHOR_RESOLUTION_POINTS: i32 = 5;
/// Points granted when a citizen volunteers for an issue.
pub const VOLUNTEER_JOIN_POINTS: i32 = 5;

/// Rating delta for resolving before the deadline (or with no deadline).
pub const ON_TIME_BONUS: f64 = 0.1;
/// Rating delta for resolving after the deadline has elapsed.
pub const LATE_PENALTY: f64 = -0.3;
/// Rating delta for a first response that arrives after the deadline.
pub const LATE_RESPONSE_PENALTY: f64 = -0.1;

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// Deadline for a freshly created issue: 24h out iff it targets an authority.
pub fn creation_deadline(
    target_includes_authority: bool,
    created_at: OffsetDateTime,
) -> Option<OffsetDateTime> {
    target_includes_authority.then(|| created_at + Duration::hours(AUTHORITY_DEADLINE_HOURS))
}

/// Clamps into [0.0, 5.0] and rounds to one decimal place, the precision
/// ratings are stored and displayed at.
pub fn clamp_rating(rating: f64) -> f64 {
    (rating.clamp(MIN_RATING, MAX_RATING) * 10.0).round() / 10.0
}

/// What a status transition does to the two user records involved.
///
/// Computed purely from the issue's pre-transition snapshot, so re-confirming
/// `completed` never re-applies the resolution effects.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransitionEffects {
    /// New rating for the acting authority, when the transition adjusts it.
    pub authority_rating: Option<f64>,
    /// total_resolved += 1, issues_solved += 1, points += RESOLUTION_POINTS.
    pub authority_resolution_counters: bool,
    /// Author gets issues_solved += 1, points += AUTHOR_RESOLUTION_POINTS.
    pub author_reward: bool,
}

impl TransitionEffects {
    pub fn is_noop(&self) -> bool {
        *self == TransitionEffects::default()
    }
}

/// Scoring side-effects of moving `snapshot` to `target`, evaluated lazily
/// against `now` (deadlines never fire a timer; they are checked here).
///
/// Two independent triggers:
/// 1. first transition into `completed` — late resolutions cost 0.3 rating,
///    on-time ones earn 0.1, and both sides collect resolution counters;
/// 2. first response (`pending` -> `in_progress`) after the deadline has
///    already elapsed — a flat 0.1 rating penalty, no counter changes.
pub fn transition_effects(
    snapshot: &Issue,
    authority_rating: f64,
    target: IssueStatus,
    now: OffsetDateTime,
) -> TransitionEffects {
    let mut effects = TransitionEffects::default();

    match target {
        IssueStatus::Completed if snapshot.status != IssueStatus::Completed => {
            let delta = if snapshot.deadline_elapsed(now) {
                LATE_PENALTY
            } else {
                // No-deadline issues (volunteer-targeted) take the on-time
                // branch; there is nothing to be late against.
                ON_TIME_BONUS
            };
            effects.authority_rating = Some(clamp_rating(authority_rating + delta));
            effects.authority_resolution_counters = true;
            effects.author_reward = true;
        }
        IssueStatus::InProgress
            if snapshot.status == IssueStatus::Pending && snapshot.deadline_elapsed(now) =>
        {
            effects.authority_rating =
                Some(clamp_rating(authority_rating + LATE_RESPONSE_PENALTY));
        }
        _ => {}
    }

    effects
}
