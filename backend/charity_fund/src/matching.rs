//! Matching engine: moves money from one donation into one project.
//!
//! A match always closes at least one side. When the project has at least
//! as much room as the donation, the whole remaining donation goes in and
//! the donation closes; otherwise the project is topped up to its target
//! and closes, and the donation keeps the rest for a later match.

use chrono::{DateTime, Utc};

use crate::models::Funding;

/// Outcome of a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Amount moved from the donation into the project.
    pub transferred: i64,
    /// `project_room - donation_room` before the match. Zero means both closed.
    pub delta: i64,
}

/// Match `donation` against `project`, mutating both in place.
///
/// Both sides must have room left; calling this on a closed entity is a
/// caller bug and trips a debug assertion. Nothing is persisted here.
pub fn match_funds(donation: &mut Funding, project: &mut Funding, now: DateTime<Utc>) -> Match {
    debug_assert!(donation.room() > 0, "donation has no room: {donation:?}");
    debug_assert!(project.room() > 0, "project has no room: {project:?}");

    let project_room = project.room();
    let donation_room = donation.room();
    let delta = project_room - donation_room;

    let transferred = if delta >= 0 {
        project.invested_amount += donation_room;
        donation.invested_amount = donation.full_amount;
        donation.close(now);
        donation_room
    } else {
        project.invested_amount = project.full_amount;
        project.close(now);
        donation.invested_amount += project_room;
        project_room
    };

    // Covers delta == 0, where the project filled up in the first branch.
    project.close_if_filled(now);

    Match { transferred, delta }
}
