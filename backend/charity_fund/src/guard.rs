//! Project lifecycle rules checked before a project is created, edited or
//! removed.

use sqlx::SqliteConnection;

use crate::db;
use crate::errors::{FundError, Result};
use crate::models::{Project, ProjectUpdate};

pub const MSG_DUPLICATE_NAME: &str = "A project with this name already exists";
pub const MSG_CLOSED: &str = "A closed project cannot be edited";
pub const MSG_TARGET_BELOW_INVESTED: &str =
    "full_amount cannot be set below the amount already invested";
pub const MSG_HAS_FUNDS: &str = "The project has received funds and cannot be deleted";

/// Edits are allowed only on open projects, and never below what is invested.
pub fn check_update(project: &Project, update: &ProjectUpdate) -> Result<()> {
    if project.funding.fully_invested {
        return Err(FundError::conflict(MSG_CLOSED));
    }
    if let Some(target) = update.full_amount {
        if target < project.funding.invested_amount {
            return Err(FundError::conflict(MSG_TARGET_BELOW_INVESTED));
        }
    }
    Ok(())
}

pub fn check_delete(project: &Project) -> Result<()> {
    if project.funding.invested_amount > 0 {
        return Err(FundError::conflict(MSG_HAS_FUNDS));
    }
    Ok(())
}

/// Fail if any project other than `exclude` already uses `name`.
pub async fn check_name_free(
    conn: &mut SqliteConnection,
    name: &str,
    exclude: Option<i64>,
) -> Result<()> {
    match db::project_id_by_name(conn, name).await? {
        Some(id) if Some(id) != exclude => Err(FundError::conflict(MSG_DUPLICATE_NAME)),
        _ => Ok(()),
    }
}
