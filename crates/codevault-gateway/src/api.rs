//! Game and admin route handlers

use crate::auth::verify_pin;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{Path as AxumPath, State},
    http::HeaderMap,
    Json,
};
use codevault_core::{Error, Fragment, Submission, TeamId};
use codevault_engine::{CodeResult, GameView, LeaderboardEntry, SkipResult, TerminalResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

type Shared = State<Arc<AppState>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub team_id: String,
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRequest {
    pub team_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCodeRequest {
    pub team_id: String,
    #[serde(default)]
    pub submitted_order: Submission,
    /// Level the client believes it is answering.
    #[serde(default)]
    pub level: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalRequest {
    pub team_id: String,
    #[serde(default)]
    pub user_output: String,
    #[serde(default)]
    pub level: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipRequest {
    pub team_id: String,
    #[serde(default)]
    pub level: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub restore_score: bool,
}

fn snippets(fragments: &[Fragment]) -> Vec<Value> {
    fragments
        .iter()
        .map(|f| json!({ "id": f.id, "code": f.text }))
        .collect()
}

/// Admin body is optional; the id may come from the body or the `x-admin-id` header.
fn admin_request(state: &AppState, headers: &HeaderMap, body: &Bytes) -> ApiResult<AdminRequest> {
    let request: AdminRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AdminRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let candidate = request
        .admin_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| headers.get("x-admin-id").and_then(|v| v.to_str().ok()));
    state
        .admin
        .verify(candidate)
        .map_err(|_| ApiError::AdminRequired)?;
    Ok(request)
}

pub async fn login(State(state): Shared, Json(req): Json<LoginRequest>) -> ApiResult<Json<Value>> {
    let record = state.runtime.login(&req.team_id).await.map_err(|e| match e {
        Error::TeamNotFound(_) => Error::auth_failed("unknown team"),
        other => other,
    })?;
    verify_pin(record.pin.as_deref(), req.pin.as_deref())?;
    info!(team = %record.id(), "team logged in");
    Ok(Json(json!({
        "status": "SUCCESS",
        "teamId": record.id(),
    })))
}

pub async fn game_status(State(state): Shared) -> Json<Value> {
    let flags = state.runtime.flags().await;
    Json(json!({
        "started": flags.started,
        "eventActive": flags.event_active,
    }))
}

pub async fn game_data(
    State(state): Shared,
    AxumPath(team_id): AxumPath<String>,
) -> ApiResult<Json<Value>> {
    let team = TeamId::sanitize(&team_id);
    let body = match state.runtime.game_data(&team).await? {
        GameView::Locked => json!({
            "status": "LOCKED",
            "message": "TERMINATED DUE TO VIOLATIONS",
        }),
        GameView::Complete { score } => json!({
            "status": "COMPLETE",
            "message": "ALL LEVELS COMPLETED!",
            "score": score,
        }),
        GameView::Playing {
            level,
            description,
            score,
            violations,
            attempts,
            fragments,
        } => json!({
            "status": "SUCCESS",
            "level": level,
            "description": description,
            "score": score,
            "snippets": snippets(&fragments),
            "violations": violations,
            "attempts": attempts,
            "isLocked": false,
        }),
    };
    Ok(Json(body))
}

pub async fn submit_code(
    State(state): Shared,
    Json(req): Json<SubmitCodeRequest>,
) -> ApiResult<Json<Value>> {
    let team = TeamId::sanitize(&req.team_id);
    let body = match state
        .runtime
        .submit_code(&team, &req.submitted_order, req.level)
        .await?
    {
        CodeResult::Complete => json!({
            "status": "COMPLETE",
            "message": "ALL LEVELS COMPLETED!",
        }),
        CodeResult::Judged { outcome, .. } if outcome.success => json!({
            "status": "SUCCESS",
            "currentScore": outcome.score,
            "attemptsUsed": outcome.attempts,
        }),
        CodeResult::Judged { outcome, .. } => json!({
            "status": "FAIL",
            "message": "Logic Incorrect. Check your syntax order.",
            "attemptsUsed": outcome.attempts,
            "currentScore": outcome.score,
            "penalty": outcome.penalty,
        }),
    };
    Ok(Json(body))
}

pub async fn submit_terminal(
    State(state): Shared,
    Json(req): Json<TerminalRequest>,
) -> ApiResult<Json<Value>> {
    let team = TeamId::sanitize(&req.team_id);
    let body = match state
        .runtime
        .submit_terminal(&team, req.level, &req.user_output)
        .await?
    {
        TerminalResult::Complete => json!({
            "status": "COMPLETE",
            "message": "ALL LEVELS COMPLETED!",
        }),
        TerminalResult::Answered(outcome) => json!({
            "status": if outcome.correct { "SUCCESS" } else { "FAIL" },
            "message": if outcome.correct { "Output Correct" } else { "Output Incorrect" },
            "currentScore": outcome.score,
            "nextLevel": outcome.next_level,
        }),
    };
    Ok(Json(body))
}

pub async fn skip_terminal(
    State(state): Shared,
    Json(req): Json<SkipRequest>,
) -> ApiResult<Json<Value>> {
    let team = TeamId::sanitize(&req.team_id);
    let body = match state.runtime.skip_terminal(&team, req.level).await? {
        SkipResult::Complete => json!({
            "status": "COMPLETE",
            "message": "ALL LEVELS COMPLETED!",
        }),
        SkipResult::Skipped(outcome) => json!({
            "status": "SUCCESS",
            "currentScore": outcome.score,
            "nextLevel": outcome.next_level,
        }),
    };
    Ok(Json(body))
}

pub async fn report_violation(
    State(state): Shared,
    Json(req): Json<TeamRequest>,
) -> ApiResult<Json<Value>> {
    let team = TeamId::sanitize(&req.team_id);
    let outcome = state.runtime.report_violation(&team).await?;
    Ok(Json(json!({
        "status": "SUCCESS",
        "violations": outcome.violations,
        "isLocked": outcome.locked,
        "currentScore": outcome.score,
    })))
}

pub async fn leaderboard(State(state): Shared) -> Json<Vec<LeaderboardEntry>> {
    Json(state.runtime.leaderboard().await)
}

pub async fn start_game(
    State(state): Shared,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    admin_request(&state, &headers, &body)?;
    let flags = state.runtime.start_game().await;
    Ok(Json(json!({
        "status": "SUCCESS",
        "message": "GAME STARTED",
        "started": flags.started,
    })))
}

pub async fn end_game(
    State(state): Shared,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    admin_request(&state, &headers, &body)?;
    let flags = state.runtime.end_game().await;
    Ok(Json(json!({
        "status": "SUCCESS",
        "message": "EVENT ENDED",
        "eventActive": flags.event_active,
    })))
}

pub async fn open_event(
    State(state): Shared,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    admin_request(&state, &headers, &body)?;
    let flags = state.runtime.open_event().await;
    Ok(Json(json!({
        "status": "SUCCESS",
        "message": "EVENT OPEN",
        "eventActive": flags.event_active,
        "started": flags.started,
    })))
}

pub async fn reset_game(
    State(state): Shared,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    admin_request(&state, &headers, &body)?;
    let flags = state.runtime.reset_game().await?;
    Ok(Json(json!({
        "status": "SUCCESS",
        "message": "GAME RESET",
        "started": flags.started,
    })))
}

pub async fn reset_team(
    State(state): Shared,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let req = admin_request(&state, &headers, &body)?;
    let raw = req
        .team_id
        .ok_or_else(|| ApiError::BadRequest("teamId required".into()))?;
    let team = TeamId::sanitize(&raw);
    let record = state.runtime.reset_team(&team, req.restore_score).await?;
    Ok(Json(json!({
        "status": "SUCCESS",
        "message": format!("Team {} reset.", team),
        "currentScore": record.progress.score,
    })))
}
