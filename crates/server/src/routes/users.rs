//! Account route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::services::auth::{IssuedTokens, Session, Signup};
use crate::state::AppState;

/// Signup form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Create an account and log it in.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>)> {
    let Json(form) = payload?;

    let session = state
        .auth()
        .signup(Signup {
            first_name: &form.first_name,
            last_name: &form.last_name,
            email: &form.email,
            phone: &form.phone,
            password: &form.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Log in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Session>> {
    let Json(form) = payload?;
    let session = state.auth().login(&form.email, &form.password).await?;
    Ok(Json(session))
}

/// Exchange a refresh token for a new token pair.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<IssuedTokens>> {
    let Json(form) = payload?;
    let tokens = state.auth().refresh(&form.refresh_token).await?;
    Ok(Json(tokens))
}
