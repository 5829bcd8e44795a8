//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::allocation::AllocationPolicy;
use crate::auth::AuthGate;
use crate::config::Config;
use crate::db;
use crate::errors::{FundError, Result};
use crate::models::{Donation, DonationCreate, Project, ProjectCreate, ProjectUpdate, UserDonationView};
use crate::report::{self, ClosedProjectReport};
use crate::service::{FundService, WriteGate};

pub struct ApiState {
    pub pool: SqlitePool,
    pub config: Config,
    pub auth: AuthGate,
    pub write_gate: WriteGate,
}

impl ApiState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let auth = AuthGate::new(config.superuser_ids.clone());
        Self {
            pool,
            config,
            auth,
            write_gate: WriteGate::default(),
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/charity_project", get(list_projects).post(create_project))
        .route(
            "/charity_project/:id",
            patch(update_project).delete(delete_project),
        )
        .route("/donation", get(list_donations).post(create_donation))
        .route("/donation/my", get(my_donations))
        .route("/reports/closed_projects", get(closed_projects_report))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub title: String,
    pub version: &'static str,
    pub allocation_policy: AllocationPolicy,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// Turn a JSON body rejection into a validation error. Handlers call this
/// after the auth check.
fn payload<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| FundError::Validation(rejection.body_text()))
}

/// `GET /health`
pub async fn health(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        title: state.config.app_title.clone(),
        version: env!("CARGO_PKG_VERSION"),
        allocation_policy: state.config.allocation_policy,
    })
}

/// `GET /charity_project`
pub async fn list_projects(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<Project>>> {
    let mut conn = state.pool.acquire().await?;
    let projects = db::list_projects(&mut conn).await?;
    if projects.is_empty() {
        return Err(FundError::NotFound("No projects yet".to_string()));
    }
    Ok(Json(projects))
}

/// `POST /charity_project` (superusers only)
///
/// Creates the project and immediately pours open donations into it.
pub async fn create_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: std::result::Result<Json<ProjectCreate>, JsonRejection>,
) -> Result<Json<Project>> {
    state.auth.privileged(&headers)?;
    let input = payload(body)?;

    let mut tx = state.write_gate.begin(&state.pool).await?;
    let project = FundService::new(tx.conn(), state.config.allocation_policy, Utc::now())
        .create_project(&input)
        .await?;
    tx.commit().await?;
    Ok(Json(project))
}

/// `PATCH /charity_project/:id` (superusers only)
pub async fn update_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    body: std::result::Result<Json<ProjectUpdate>, JsonRejection>,
) -> Result<Json<Project>> {
    state.auth.privileged(&headers)?;
    let update = payload(body)?;

    let mut tx = state.write_gate.begin(&state.pool).await?;
    let project = FundService::new(tx.conn(), state.config.allocation_policy, Utc::now())
        .update_project(id, &update)
        .await?;
    tx.commit().await?;
    Ok(Json(project))
}

/// `DELETE /charity_project/:id` (superusers only)
///
/// Returns the removed project.
pub async fn delete_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Project>> {
    state.auth.privileged(&headers)?;

    let mut tx = state.write_gate.begin(&state.pool).await?;
    let project = FundService::new(tx.conn(), state.config.allocation_policy, Utc::now())
        .delete_project(id)
        .await?;
    tx.commit().await?;
    Ok(Json(project))
}

/// `GET /donation` (superusers only)
pub async fn list_donations(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Donation>>> {
    state.auth.privileged(&headers)?;

    let mut conn = state.pool.acquire().await?;
    let donations = db::list_donations(&mut conn).await?;
    if donations.is_empty() {
        return Err(FundError::NotFound("No donations yet".to_string()));
    }
    Ok(Json(donations))
}

/// `POST /donation`
///
/// Records the donation and invests it into the oldest open projects.
pub async fn create_donation(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: std::result::Result<Json<DonationCreate>, JsonRejection>,
) -> Result<Json<UserDonationView>> {
    let caller = state.auth.authenticated(&headers)?;
    let input = payload(body)?;

    let mut tx = state.write_gate.begin(&state.pool).await?;
    let donation = FundService::new(tx.conn(), state.config.allocation_policy, Utc::now())
        .create_donation(caller, &input)
        .await?;
    tx.commit().await?;
    Ok(Json(donation.into()))
}

/// `GET /donation/my`
pub async fn my_donations(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserDonationView>>> {
    let caller = state.auth.authenticated(&headers)?;

    let mut conn = state.pool.acquire().await?;
    let donations = db::list_user_donations(&mut conn, caller.user_id).await?;
    Ok(Json(donations.into_iter().map(Into::into).collect()))
}

/// `GET /reports/closed_projects` (superusers only)
pub async fn closed_projects_report(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ClosedProjectReport>>> {
    state.auth.privileged(&headers)?;

    let mut conn = state.pool.acquire().await?;
    let report = report::closed_projects_by_speed(&mut conn).await?;
    if report.is_empty() {
        return Err(FundError::NotFound("No closed projects yet".to_string()));
    }
    Ok(Json(report))
}
