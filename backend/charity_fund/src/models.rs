//! Ledger entities: charity projects, donations and the funding state they share.
//!
//! A project's `full_amount` is its target; a donation's `full_amount` is the
//! money donated. In both, `invested_amount` is what has already moved across
//! to the other side, so one [`Funding`] shape and one matching routine cover
//! both directions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FundError, Result};

pub const NAME_MIN_LEN: usize = 1;
pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MIN_LEN: usize = 1;

/// Funding state common to projects and donations.
///
/// Invariants:
/// * `0 <= invested_amount <= full_amount`
/// * `fully_invested == (invested_amount == full_amount)`
/// * `close_date` is set once, when `fully_invested` flips to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Funding {
    pub full_amount: i64,
    pub invested_amount: i64,
    pub fully_invested: bool,
    pub create_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_date: Option<DateTime<Utc>>,
}

impl Funding {
    pub fn new(full_amount: i64, now: DateTime<Utc>) -> Self {
        Self {
            full_amount,
            invested_amount: 0,
            fully_invested: false,
            create_date: now,
            close_date: None,
        }
    }

    /// Money that can still move across.
    pub fn room(&self) -> i64 {
        self.full_amount - self.invested_amount
    }

    pub fn is_open(&self) -> bool {
        !self.fully_invested
    }

    /// Mark as fully invested. The first close timestamp sticks.
    pub fn close(&mut self, now: DateTime<Utc>) {
        self.fully_invested = true;
        if self.close_date.is_none() {
            self.close_date = Some(now);
        }
    }

    /// Close if the invested amount has reached the full amount.
    pub fn close_if_filled(&mut self, now: DateTime<Utc>) {
        if self.invested_amount == self.full_amount {
            self.close(now);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub funding: Funding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Donation {
    pub id: i64,
    pub user_id: i64,
    pub comment: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub funding: Funding,
}

/// A freshly inserted entity handed to the allocator.
#[derive(Debug)]
pub enum NewEntity<'a> {
    Project(&'a mut Project),
    Donation(&'a mut Donation),
}

// ─────────────────────────────────────────────────────────
// Request payloads
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCreate {
    pub name: String,
    pub description: String,
    pub full_amount: i64,
}

impl ProjectCreate {
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_description(&self.description)?;
        validate_amount(self.full_amount)
    }
}

/// Partial update. Fields that are absent stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub full_amount: Option<i64>,
}

impl ProjectUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(amount) = self.full_amount {
            validate_amount(amount)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DonationCreate {
    pub full_amount: i64,
    pub comment: Option<String>,
}

impl DonationCreate {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.full_amount)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(FundError::validation(format!(
            "name must be between {NAME_MIN_LEN} and {NAME_MAX_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    if description.chars().count() < DESCRIPTION_MIN_LEN {
        return Err(FundError::validation("description must not be empty"));
    }
    Ok(())
}

fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(FundError::validation("full_amount must be a positive integer"));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

/// What a donor sees of their own donation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserDonationView {
    pub id: i64,
    pub full_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub create_date: DateTime<Utc>,
}

impl From<Donation> for UserDonationView {
    fn from(d: Donation) -> Self {
        Self {
            id: d.id,
            full_amount: d.funding.full_amount,
            comment: d.comment,
            create_date: d.funding.create_date,
        }
    }
}
