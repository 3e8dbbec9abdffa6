//! Request handlers for the JSON API and the single-page UI.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::account::{HistoryEntry, UserSummary};
use crate::sentiment::{PolarityScores, Sentiment};

use super::{ApiError, AppState};

/// The form-based UI, served as a single page.
const UI_PAGE: &str = include_str!("../../assets/index.html");

type Handled<T> = Result<Json<T>, ApiError>;

/// Username and password, as posted to `/register` and `/login`.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Body of `/analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Text to score.
    pub text: String,
    /// When present, the result is appended to this account's history.
    #[serde(default)]
    pub account_id: Option<i64>,
}

/// Query string of `/history/:account_id`.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Return only the most recent entries.
    pub limit: Option<usize>,
}

/// Query string of `/logout`.
#[derive(Debug, Deserialize)]
pub struct LogoutParams {
    /// The account logging out.
    pub account_id: i64,
}

/// Reply to register, login, and logout.
#[derive(Debug, Serialize)]
pub struct AccountMessage {
    /// The account acted upon.
    pub account_id: i64,
    /// Human-readable outcome.
    pub message: &'static str,
}

/// Reply to `/analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Echoed when the request named an account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<i64>,
    /// The scored text.
    pub text: String,
    /// The assigned label.
    pub sentiment: Sentiment,
    /// The raw polarity scores.
    pub scores: PolarityScores,
}

/// Reply to `/history/:account_id`.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// The account whose history this is.
    pub account_id: i64,
    /// Entries, oldest first.
    pub history: Vec<HistoryEntry>,
}

/// Reply to `/admin/:account_id`.
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    /// Every registered account.
    pub users: Vec<UserSummary>,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Backend is running!" }))
}

pub async fn ui() -> Html<&'static str> {
    Html(UI_PAGE)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Handled<AccountMessage> {
    let Json(Credentials { username, password }) = payload?;

    state.account_rules().check(&username, &password)?;

    let name = username.clone();
    let account_id = state
        .with_storage(move |s| s.register_user(&name, &password))
        .await?
        .ok_or_else(|| ApiError::BadRequest("Username already exists".to_string()))?;

    info!(account_id, username = %username, "Registered account");
    Ok(Json(AccountMessage {
        account_id,
        message: "Registration successful",
    }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Handled<AccountMessage> {
    let Json(Credentials { username, password }) = payload?;

    let account_id = state
        .with_storage(move |s| s.verify_user(&username, &password))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    info!(account_id, "Login successful");
    Ok(Json(AccountMessage {
        account_id,
        message: "Login successful",
    }))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Handled<AnalyzeResponse> {
    let Json(AnalyzeRequest { text, account_id }) = payload?;

    if text.trim().is_empty() {
        return Err(ApiError::BadRequest("Text must not be empty".to_string()));
    }
    let max_len = state.config.sentiment.max_text_length;
    if text.chars().count() > max_len {
        return Err(ApiError::BadRequest(format!(
            "Text exceeds {max_len} characters"
        )));
    }

    let analysis = state.analyzer.analyze(&text, state.thresholds());

    if let Some(id) = account_id {
        let stored_text = text.clone();
        let saved = state
            .with_storage(move |s| {
                if s.get_account(id)?.is_none() {
                    return Ok(false);
                }
                s.save_history(
                    id,
                    &stored_text,
                    analysis.sentiment,
                    analysis.scores.compound,
                )?;
                Ok(true)
            })
            .await?;
        if !saved {
            return Err(ApiError::NotFound("Account not found".to_string()));
        }
    }

    info!(
        account_id = ?account_id,
        sentiment = %analysis.sentiment,
        compound = analysis.scores.compound,
        "Analyzed text"
    );
    Ok(Json(AnalyzeResponse {
        account_id,
        text,
        sentiment: analysis.sentiment,
        scores: analysis.scores,
    }))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    account_id: Result<Path<i64>, PathRejection>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Handled<HistoryResponse> {
    let Path(account_id) = account_id?;
    let Query(HistoryParams { limit }) = params?;

    let history = state
        .with_storage(move |s| {
            if s.get_account(account_id)?.is_none() {
                return Ok(None);
            }
            s.get_history(account_id, limit).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    Ok(Json(HistoryResponse {
        account_id,
        history,
    }))
}

pub async fn logout(
    params: Result<Query<LogoutParams>, QueryRejection>,
) -> Handled<AccountMessage> {
    let Query(LogoutParams { account_id }) = params?;

    info!(account_id, "Logged out");
    Ok(Json(AccountMessage {
        account_id,
        message: "Logged out successfully",
    }))
}

pub async fn admin(
    State(state): State<Arc<AppState>>,
    account_id: Result<Path<i64>, PathRejection>,
) -> Handled<UsersResponse> {
    let Path(account_id) = account_id?;

    let users = state
        .with_storage(move |s| {
            if !s.is_admin(account_id)? {
                return Ok(None);
            }
            s.list_users().map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not authorized".to_string()))?;

    Ok(Json(UsersResponse { users }))
}
