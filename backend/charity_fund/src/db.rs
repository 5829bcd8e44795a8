//! Database layer: pool setup, migrations, and ledger queries.
//!
//! Every query takes a `&mut SqliteConnection` so that callers decide the
//! transaction boundary: pass a pooled connection for plain reads, or a
//! [`sqlx::Transaction`] when reads and writes must commit together.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::models::{Donation, Project};

const BUSY_TIMEOUT_SECS: u64 = 5;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Writers from other processes wait on the file lock instead of failing.
    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory pool. The connection never idles out, since
/// the database vanishes with it.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}

const PROJECT_COLUMNS: &str = "id, name, description, full_amount, invested_amount, \
                               fully_invested, create_date, close_date";
const DONATION_COLUMNS: &str = "id, user_id, comment, full_amount, invested_amount, \
                                fully_invested, create_date, close_date";

// ─────────────────────────────────────────────────────────
// Project writes
// ─────────────────────────────────────────────────────────

pub async fn insert_project(
    conn: &mut SqliteConnection,
    name: &str,
    description: &str,
    full_amount: i64,
    now: DateTime<Utc>,
) -> Result<Project> {
    let project = sqlx::query_as::<_, Project>(&format!(
        r#"
        INSERT INTO charity_project (name, description, full_amount, create_date)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(name)
    .bind(description)
    .bind(full_amount)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(project)
}

/// Persist the editable fields together with the funding state.
pub async fn update_project(conn: &mut SqliteConnection, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE charity_project
        SET    name = ?2, description = ?3, full_amount = ?4,
               invested_amount = ?5, fully_invested = ?6, close_date = ?7
        WHERE  id = ?1
        "#,
    )
    .bind(project.id)
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.funding.full_amount)
    .bind(project.funding.invested_amount)
    .bind(project.funding.fully_invested)
    .bind(project.funding.close_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn save_project_funding(conn: &mut SqliteConnection, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE charity_project
        SET    invested_amount = ?2, fully_invested = ?3, close_date = ?4
        WHERE  id = ?1
        "#,
    )
    .bind(project.id)
    .bind(project.funding.invested_amount)
    .bind(project.funding.fully_invested)
    .bind(project.funding.close_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_project(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM charity_project WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Project reads
// ─────────────────────────────────────────────────────────

pub async fn get_project(conn: &mut SqliteConnection, id: i64) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM charity_project WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(project)
}

pub async fn project_id_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM charity_project WHERE name = ?1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(id,)| id))
}

/// The earliest created project that still accepts money.
pub async fn oldest_open_project(conn: &mut SqliteConnection) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>(&format!(
        r#"
        SELECT {PROJECT_COLUMNS}
        FROM   charity_project
        WHERE  fully_invested = 0
        ORDER  BY create_date ASC, id ASC
        LIMIT  1
        "#
    ))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(project)
}

pub async fn list_projects(conn: &mut SqliteConnection) -> Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM charity_project ORDER BY id ASC"
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Name, description and open/close timestamps of every closed project.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClosedProjectRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub create_date: DateTime<Utc>,
    pub close_date: DateTime<Utc>,
}

pub async fn closed_projects(conn: &mut SqliteConnection) -> Result<Vec<ClosedProjectRow>> {
    let rows = sqlx::query_as::<_, ClosedProjectRow>(
        r#"
        SELECT id, name, description, create_date, close_date
        FROM   charity_project
        WHERE  fully_invested = 1 AND close_date IS NOT NULL
        ORDER  BY id ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Donations
// ─────────────────────────────────────────────────────────

pub async fn insert_donation(
    conn: &mut SqliteConnection,
    user_id: i64,
    comment: Option<&str>,
    full_amount: i64,
    now: DateTime<Utc>,
) -> Result<Donation> {
    let donation = sqlx::query_as::<_, Donation>(&format!(
        r#"
        INSERT INTO donation (user_id, comment, full_amount, create_date)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING {DONATION_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(comment)
    .bind(full_amount)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(donation)
}

pub async fn save_donation_funding(conn: &mut SqliteConnection, donation: &Donation) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE donation
        SET    invested_amount = ?2, fully_invested = ?3, close_date = ?4
        WHERE  id = ?1
        "#,
    )
    .bind(donation.id)
    .bind(donation.funding.invested_amount)
    .bind(donation.funding.fully_invested)
    .bind(donation.funding.close_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_donation(conn: &mut SqliteConnection, id: i64) -> Result<Option<Donation>> {
    let donation = sqlx::query_as::<_, Donation>(&format!(
        "SELECT {DONATION_COLUMNS} FROM donation WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(donation)
}

/// The earliest created donation that still has money to hand out.
pub async fn oldest_open_donation(conn: &mut SqliteConnection) -> Result<Option<Donation>> {
    let donation = sqlx::query_as::<_, Donation>(&format!(
        r#"
        SELECT {DONATION_COLUMNS}
        FROM   donation
        WHERE  fully_invested = 0
        ORDER  BY create_date ASC, id ASC
        LIMIT  1
        "#
    ))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(donation)
}

pub async fn list_donations(conn: &mut SqliteConnection) -> Result<Vec<Donation>> {
    let rows = sqlx::query_as::<_, Donation>(&format!(
        "SELECT {DONATION_COLUMNS} FROM donation ORDER BY id ASC"
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn list_user_donations(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<Donation>> {
    let rows = sqlx::query_as::<_, Donation>(&format!(
        "SELECT {DONATION_COLUMNS} FROM donation WHERE user_id = ?1 ORDER BY id ASC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
