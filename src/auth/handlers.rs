use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, CredentialsRequest, PublicUser, RefreshRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LEN},
    },
    error::AppError,
    state::AppState,
    users::{record::UserRecord, role::Role},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, user: &UserRecord) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(state);
    Ok(Json(AuthResponse {
        access_token: keys.sign_access(&user.id)?,
        refresh_token: keys.sign_refresh(&user.id)?,
        user: PublicUser {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::BadRequest("Password too short".into()));
    }
    if state.accounts.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let id = Uuid::new_v4().to_string();
    state.accounts.create(&id, &payload.email, &hash).await?;

    let mut user = UserRecord::new(id, payload.email, Some(Role::Client));
    user.created_at = Some(OffsetDateTime::now_utc());
    if let Err(e) = state.users.create(&user).await {
        // no credentials without a user document
        if let Err(cleanup) = state.accounts.delete(&user.id).await {
            error!(error = %cleanup, user_id = %user.id, "could not remove orphaned account");
        }
        return Err(e.into());
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_tokens(&state, &user)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let Some(account) = state.accounts.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(&payload.password, &account.password_hash)? {
        warn!(user_id = %account.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let Some(user) = state.users.get(&account.id).await? else {
        error!(user_id = %account.id, "account has no user document");
        return Err(AppError::InvalidCredentials);
    };
    if user.is_blocked {
        warn!(user_id = %user.id, "login refused for blocked account");
        return Err(AppError::Forbidden("Account is blocked".into()));
    }

    if let Err(e) = state
        .users
        .touch_last_login(&user.id, OffsetDateTime::now_utc())
        .await
    {
        warn!(error = %e, user_id = %user.id, "could not record last login");
    }

    state.directories.on_sign_in(&user.id).await;
    info!(user_id = %user.id, "user logged in");
    issue_tokens(&state, &user)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = match state.users.get(&claims.sub).await {
        Ok(Some(u)) if !u.is_blocked => u,
        Ok(Some(_)) => return Err((StatusCode::FORBIDDEN, "Account is blocked".into())),
        Ok(None) => return Err((StatusCode::UNAUTHORIZED, "User not found".into())),
        Err(e) => {
            error!(error = %e, user_id = %claims.sub, "refresh user lookup failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into()));
        }
    };
    state.directories.on_sign_in(&user.id).await;
    issue_tokens(&state, &user).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> StatusCode {
    state.directories.deactivate(&user_id).await;
    info!(%user_id, "signed out");
    StatusCode::NO_CONTENT
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserRecord>, AppError> {
    state
        .users
        .get(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
