//! Closed projects ranked by how quickly they were funded. This is the data
//! the spreadsheet export consumes; the export itself lives elsewhere.

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::db::{self, ClosedProjectRow};
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosedProjectReport {
    pub name: String,
    /// Seconds between creation and full funding.
    pub duration_seconds: i64,
    pub description: String,
}

/// Fastest-funded first; equal durations keep creation order.
pub fn rank_by_speed(rows: Vec<ClosedProjectRow>) -> Vec<ClosedProjectReport> {
    let mut ranked: Vec<(i64, i64, ClosedProjectRow)> = rows
        .into_iter()
        .map(|row| {
            let duration = (row.close_date - row.create_date).num_seconds();
            (duration, row.id, row)
        })
        .collect();
    ranked.sort_by_key(|(duration, id, _)| (*duration, *id));

    ranked
        .into_iter()
        .map(|(duration_seconds, _, row)| ClosedProjectReport {
            name: row.name,
            duration_seconds,
            description: row.description,
        })
        .collect()
}

pub async fn closed_projects_by_speed(
    conn: &mut SqliteConnection,
) -> Result<Vec<ClosedProjectReport>> {
    Ok(rank_by_speed(db::closed_projects(conn).await?))
}
