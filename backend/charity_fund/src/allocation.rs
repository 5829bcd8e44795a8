//! Allocation orchestrator: runs right after a project or donation is
//! inserted and matches it against the oldest open entities of the other
//! kind, persisting every side that changed.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::db;
use crate::errors::{FundError, Result};
use crate::matching::{match_funds, Match};
use crate::models::NewEntity;

/// How much of the backlog a new entity is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Only the single oldest open counterpart.
    Single,
    /// Oldest first, until the new entity is full or nothing open is left.
    #[default]
    Drain,
}

impl FromStr for AllocationPolicy {
    type Err = FundError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "drain" => Ok(Self::Drain),
            other => Err(FundError::Config(format!(
                "Invalid ALLOCATION_POLICY {other:?} (expected \"single\" or \"drain\")"
            ))),
        }
    }
}

/// One match performed by [`allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub donation_id: i64,
    pub project_id: i64,
    pub outcome: Match,
}

/// Match `entity` against open counterparts and persist the results.
///
/// `entity` must already be inserted; its funding state is updated through
/// the borrow and written back. Must run inside the caller's write transaction.
pub async fn allocate(
    conn: &mut SqliteConnection,
    entity: NewEntity<'_>,
    policy: AllocationPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<Allocation>> {
    let mut allocations = Vec::new();

    match entity {
        NewEntity::Donation(donation) => {
            while donation.funding.is_open() {
                let Some(mut project) = db::oldest_open_project(conn).await? else {
                    debug!("No open project for donation {}", donation.id);
                    break;
                };

                let outcome = match_funds(&mut donation.funding, &mut project.funding, now);
                db::save_project_funding(conn, &project).await?;
                allocations.push(Allocation {
                    donation_id: donation.id,
                    project_id: project.id,
                    outcome,
                });

                if policy == AllocationPolicy::Single {
                    break;
                }
            }
            if !allocations.is_empty() {
                db::save_donation_funding(conn, donation).await?;
            }
        }
        NewEntity::Project(project) => {
            while project.funding.is_open() {
                let Some(mut donation) = db::oldest_open_donation(conn).await? else {
                    debug!("No open donation for project {}", project.id);
                    break;
                };

                let outcome = match_funds(&mut donation.funding, &mut project.funding, now);
                db::save_donation_funding(conn, &donation).await?;
                allocations.push(Allocation {
                    donation_id: donation.id,
                    project_id: project.id,
                    outcome,
                });

                if policy == AllocationPolicy::Single {
                    break;
                }
            }
            if !allocations.is_empty() {
                db::save_project_funding(conn, project).await?;
            }
        }
    }

    for a in &allocations {
        info!(
            "Allocated {} from donation {} to project {}",
            a.outcome.transferred, a.donation_id, a.project_id
        );
    }

    Ok(allocations)
}
