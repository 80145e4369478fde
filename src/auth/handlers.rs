use axum::{
    extract::{FromRef, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, NewPasswordRequest, PublicUser,
            RefreshRequest, RegisterRequest, ResetRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, is_acceptable, verify_password},
        repo::NewUser,
        repo_types::User,
        services::{
            is_valid_email, normalize_login, random_token, reset_expiry, reset_url, verify_url,
        },
    },
    error::{ApiError, ApiResult, HtmlError, InternalContext},
    extract::{ApiJson, ApiPath},
    mail::templates,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify/:token", get(verify_email))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/request-reset", post(request_reset))
        .route("/reset-password/:token", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let login = normalize_login(&payload.login);

    if !is_valid_email(&login) {
        warn!(login = %login, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }
    if !is_acceptable(&payload.password) {
        warn!("password too short");
        return Err(ApiError::bad_request("Password too short"));
    }

    let taken = || {
        warn!(login = %login, "login already registered");
        ApiError::bad_request("Username already exists")
    };
    if let Some(existing) = User::find_by_login(&state.db, &login).await? {
        if existing.verified {
            return Err(taken());
        }
    }

    let hash = hash_password(&payload.password)?;
    let token = random_token();
    let new_user = || NewUser {
        first_name: payload.first_name.trim(),
        last_name: payload.last_name.trim(),
        login: &login,
        password_hash: &hash,
        verification_token: &token,
    };

    // unverified accounts get their details and token replaced
    let user = match User::create(&state.db, new_user()).await? {
        Some(user) => {
            info!(user_id = user.id, login = %user.login, "user registered");
            user
        }
        None => {
            let user = User::refresh_unverified(&state.db, new_user())
                .await?
                .ok_or_else(taken)?;
            info!(user_id = user.id, "unverified registration renewed");
            user
        }
    };

    let mail = templates::verification(
        &user.login,
        &user.first_name,
        &verify_url(&state.config.base_url, &token),
    );
    state
        .mailer
        .send(mail)
        .await
        .or_internal("Failed to send verification email.")?;

    info!(user_id = user.id, "verification email sent");
    Ok(Json(MessageResponse::new(
        "Verification email sent. Please verify before logging in.",
    )))
}

#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<Html<String>, HtmlError> {
    let user = User::verify_by_token(&state.db, &token)
        .await
        .map_err(|e| HtmlError::internal("Something went wrong verifying your email.", e))?
        .ok_or_else(|| {
            warn!("unknown verification token");
            HtmlError::bad_request("Invalid or expired verification link.")
        })?;

    info!(user_id = user.id, "user verified");
    Ok(Html(templates::page(
        "Email verified successfully!",
        Some("You can now log in to SkillSwap. <a href=\"/\">Go to Login</a>"),
    )))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let login = normalize_login(&payload.login);
    let invalid = || ApiError::bad_request("Invalid username or password");

    let Some(user) = User::find_by_login(&state.db, &login).await? else {
        warn!(login = %login, "login unknown user");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(invalid());
    }

    if !user.verified {
        warn!(user_id = user.id, "login before email verification");
        return Err(ApiError::forbidden(
            "Please verify your email before logging in.",
        ));
    }

    let response = issue_tokens(&state, user)?;
    info!(user_id = response.id, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::forbidden("Invalid or expired token"))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&state, user)?))
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign_access(&user).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        ApiError::from(e)
    })?;
    let refresh_token = keys.sign_refresh(&user)?;
    Ok(AuthResponse {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        token,
        refresh_token,
        error: String::new(),
    })
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let login = normalize_login(&payload.login);
    let user = User::find_by_login(&state.db, &login)
        .await
        .or_internal("Error sending reset email")?
        .ok_or_else(|| ApiError::bad_request("No user found with that email"))?;

    let token = random_token();
    let ttl = state.config.reset_ttl_minutes;
    let expires = reset_expiry(OffsetDateTime::now_utc(), ttl);
    User::set_reset_token(&state.db, user.id, &token, expires)
        .await
        .or_internal("Error sending reset email")?;

    let mail = templates::password_reset(
        &user.login,
        &reset_url(&state.config.base_url, &token),
        ttl,
    );
    state
        .mailer
        .send(mail)
        .await
        .or_internal("Error sending reset email")?;

    info!(user_id = user.id, "password reset email sent");
    Ok(Json(MessageResponse::new(
        "Password reset email sent successfully",
    )))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(payload): ApiJson<NewPasswordRequest>,
) -> Result<Html<String>, HtmlError> {
    if !is_acceptable(&payload.password) {
        return Err(HtmlError::bad_request("Password too short"));
    }
    let hash = hash_password(&payload.password)
        .map_err(|e| HtmlError::internal("Error resetting password. Try again.", e))?;

    let updated = User::reset_password(&state.db, &token, &hash, OffsetDateTime::now_utc())
        .await
        .map_err(|e| HtmlError::internal("Error resetting password. Try again.", e))?;
    if !updated {
        warn!("invalid or expired reset token");
        return Err(HtmlError::bad_request("Invalid or expired reset link"));
    }

    info!("password reset");
    Ok(Html(templates::page(
        "Password reset successful!",
        Some("You can now log in with your new password."),
    )))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}
