//! Write-side operations on projects and donations.
//!
//! A [`FundService`] is built per request around one open transaction. It
//! runs the lifecycle checks, writes the entity, and hands newly created
//! entities to the allocator, all on that transaction. Committing is left
//! to the caller.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::allocation::{allocate, AllocationPolicy};
use crate::auth::Caller;
use crate::db;
use crate::errors::{FundError, Result};
use crate::guard;
use crate::models::{Donation, DonationCreate, NewEntity, Project, ProjectCreate, ProjectUpdate};

pub const MSG_PROJECT_NOT_FOUND: &str = "Project not found";

/// Serializes write transactions within this process, so two requests can
/// never read the same open counterpart and both allocate against it.
#[derive(Debug, Default)]
pub struct WriteGate {
    lock: Mutex<()>,
}

impl WriteGate {
    pub async fn begin(&self, pool: &SqlitePool) -> Result<WriteTx<'_>> {
        let gate = self.lock.lock().await;
        let tx = pool.begin().await?;
        Ok(WriteTx { tx, _gate: gate })
    }
}

/// A transaction holding the write gate. Dropping it without
/// [`WriteTx::commit`] rolls back.
pub struct WriteTx<'a> {
    // Declared first so the rollback happens before the gate is released.
    tx: Transaction<'static, Sqlite>,
    _gate: MutexGuard<'a, ()>,
}

impl WriteTx<'_> {
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

pub struct FundService<'c> {
    conn: &'c mut SqliteConnection,
    policy: AllocationPolicy,
    now: DateTime<Utc>,
}

impl<'c> FundService<'c> {
    pub fn new(conn: &'c mut SqliteConnection, policy: AllocationPolicy, now: DateTime<Utc>) -> Self {
        Self { conn, policy, now }
    }

    pub async fn create_project(&mut self, input: &ProjectCreate) -> Result<Project> {
        input.validate()?;
        guard::check_name_free(self.conn, &input.name, None).await?;

        let mut project = db::insert_project(
            self.conn,
            &input.name,
            &input.description,
            input.full_amount,
            self.now,
        )
        .await?;
        info!("Created project {} ({:?})", project.id, project.name);

        allocate(self.conn, NewEntity::Project(&mut project), self.policy, self.now).await?;
        Ok(project)
    }

    pub async fn create_donation(&mut self, caller: Caller, input: &DonationCreate) -> Result<Donation> {
        input.validate()?;

        let mut donation = db::insert_donation(
            self.conn,
            caller.user_id,
            input.comment.as_deref(),
            input.full_amount,
            self.now,
        )
        .await?;
        info!(
            "User {} donated {} (donation {})",
            caller.user_id, donation.funding.full_amount, donation.id
        );

        allocate(self.conn, NewEntity::Donation(&mut donation), self.policy, self.now).await?;
        Ok(donation)
    }

    pub async fn update_project(&mut self, id: i64, update: &ProjectUpdate) -> Result<Project> {
        update.validate()?;
        let mut project = self.existing_project(id).await?;
        guard::check_update(&project, update)?;
        if let Some(name) = &update.name {
            guard::check_name_free(self.conn, name, Some(id)).await?;
        }

        if let Some(name) = &update.name {
            project.name = name.clone();
        }
        if let Some(description) = &update.description {
            project.description = description.clone();
        }
        if let Some(target) = update.full_amount {
            project.funding.full_amount = target;
            // Retargeting down to the invested amount completes the project.
            project.funding.close_if_filled(self.now);
        }

        db::update_project(self.conn, &project).await?;
        info!("Updated project {id}");
        Ok(project)
    }

    pub async fn delete_project(&mut self, id: i64) -> Result<Project> {
        let project = self.existing_project(id).await?;
        guard::check_delete(&project)?;
        db::delete_project(self.conn, id).await?;
        info!("Deleted project {id} ({:?})", project.name);
        Ok(project)
    }

    async fn existing_project(&mut self, id: i64) -> Result<Project> {
        db::get_project(self.conn, id)
            .await?
            .ok_or_else(|| FundError::NotFound(MSG_PROJECT_NOT_FOUND.to_string()))
    }
}
