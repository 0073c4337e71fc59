use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::errors::AppError;
use crate::matching::pipeline::PipelineError;
use crate::models::job_match::JobMatch;
use crate::models::profile::Profile;
use crate::state::AppState;

/// Fired when a user saves their profile. Skills come from the external
/// resume extraction step.
#[derive(Debug, Deserialize)]
pub struct SaveProfileRequest {
    pub email: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub desired_title: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchesResponse {
    pub email: String,
    pub matches: Vec<JobMatch>,
}

fn validate(req: &SaveProfileRequest) -> Result<(), AppError> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "email must be a valid address".to_string(),
        ));
    }
    if req.desired_title.trim().is_empty() {
        return Err(AppError::Validation(
            "desired_title is required".to_string(),
        ));
    }
    Ok(())
}

/// A started run is never cancelled: it lives on its own task, so a client
/// that disconnects only stops waiting for the result.
async fn detached<F>(run: F) -> Result<Vec<JobMatch>, AppError>
where
    F: Future<Output = Result<Vec<JobMatch>, PipelineError>> + Send + 'static,
{
    tokio::spawn(run)
        .await
        .map_err(|e| AppError::Internal(format!("match run task failed: {e}")))?
        .map_err(AppError::from)
}

/// POST /api/v1/profiles
pub async fn handle_save_profile(
    State(state): State<AppState>,
    Json(req): Json<SaveProfileRequest>,
) -> Result<Json<MatchesResponse>, AppError> {
    validate(&req)?;
    let profile = Profile::new(req.email, req.skills, req.desired_title, req.location);
    let email = profile.email.clone();
    let pipeline = state.pipeline;
    let matches = detached(async move { pipeline.save_profile_and_run(&profile).await }).await?;
    Ok(Json(MatchesResponse { email, matches }))
}

/// POST /api/v1/profiles/:email/run
pub async fn handle_run(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<MatchesResponse>, AppError> {
    let pipeline = state.pipeline;
    let run_email = email.clone();
    let matches = detached(async move { pipeline.run(&run_email).await }).await?;
    Ok(Json(MatchesResponse { email, matches }))
}

/// GET /api/v1/profiles/:email
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Profile>, AppError> {
    state
        .store
        .get_profile(&email)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No profile for {email}")))
}

/// GET /api/v1/profiles/:email/matches
pub async fn handle_list_matches(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<MatchesResponse>, AppError> {
    if state.store.get_profile(&email).await?.is_none() {
        return Err(AppError::NotFound(format!("No profile for {email}")));
    }
    let matches = state.store.list_matches(&email).await?;
    Ok(Json(MatchesResponse { email, matches }))
}
