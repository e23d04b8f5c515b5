use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotRequest, GoogleLoginRequest, LoginRequest, MessageResponse,
            ProfileForm, PublicUser, RegisterForm, ResetRequest, UploadedFile,
        },
        google,
        jwt::{AuthUser, JwtKeys},
        otp,
        password::{hash_password, verify_password},
        repo::{NewUser, User},
    },
    mailer,
    state::AppState,
    storage::ext_from_mime,
};

/// Verification links stop working after a day; login re-issues them.
const VERIFY_TOKEN_TTL: time::Duration = time::Duration::hours(24);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify/:token", get(verify_email))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me).put(update_me))
        .route("/auth/forgot", post(forgot_password))
        .route("/auth/reset", post(reset_password))
        .route("/auth/google", post(google_login))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB, avatar uploads
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error".into())
}

fn bad_field<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, format!("invalid form field: {e}"))
}

async fn store_avatar(state: &AppState, file: UploadedFile) -> anyhow::Result<String> {
    let ext = ext_from_mime(&file.content_type).unwrap_or("bin");
    let key = format!("avatar_{}.{}", Uuid::new_v4(), ext);
    state.storage.put(&key, file.body).await?;
    Ok(format!("{}/uploads/{}", state.config.base_url, key))
}

async fn send_verification_email(state: &AppState, email: &str, token: Uuid) {
    let link = format!("{}/api/auth/verify/{}", state.config.base_url, token);
    let (subject, html) = mailer::verification_email(&link);
    if let Err(e) = state.mailer.send(email, subject, &html).await {
        error!(error = %e, %email, "verification email failed");
    }
}

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Response, (StatusCode, String)> {
    let mut form = RegisterForm::default();
    while let Ok(Some(field)) = mp.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("name") => form.name = field.text().await.map_err(bad_field)?.trim().to_string(),
            Some("email") => {
                form.email = field.text().await.map_err(bad_field)?.trim().to_lowercase()
            }
            Some("password") => form.password = field.text().await.map_err(bad_field)?,
            Some("avatar") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_field)?;
                if !body.is_empty() {
                    form.avatar = Some(UploadedFile { body, content_type });
                }
            }
            _ => {}
        }
    }

    if form.name.is_empty() || form.email.is_empty() || form.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Please enter all fields".into()));
    }
    if !is_valid_email(&form.email) {
        warn!(email = %form.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }
    if form.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    if let Some(_existing) = User::find_by_email(&state.db, &form.email)
        .await
        .map_err(internal)?
    {
        warn!(email = %form.email, "email already registered");
        return Err((StatusCode::CONFLICT, "User already exists".into()));
    }

    let hash = hash_password(&form.password).map_err(internal)?;
    let avatar_url = match form.avatar {
        Some(file) => Some(store_avatar(&state, file).await.map_err(internal)?),
        None => None,
    };

    let require_verification = state.config.require_email_verification;
    let verify_token = require_verification.then(Uuid::new_v4);
    let new_user = NewUser {
        name: form.name,
        email: form.email,
        password_hash: Some(hash),
        avatar_url,
        email_verified: !require_verification,
        verify_token,
        verify_token_expiry: verify_token.map(|_| OffsetDateTime::now_utc() + VERIFY_TOKEN_TTL),
    };
    let user = User::create(&state.db, &new_user).await.map_err(internal)?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    if let Some(token) = user.verify_token {
        send_verification_email(&state, &user.email, token).await;
        return Ok(Json(MessageResponse {
            message: "Registered! Verify email".into(),
        })
        .into_response());
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(internal)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    })
    .into_response())
}

#[instrument(skip(state))]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect, (StatusCode, String)> {
    let token: Uuid = token
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid token".to_string()))?;

    let user = User::find_by_verify_token(&state.db, token)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::BAD_REQUEST, "Invalid token".to_string()))?;

    if otp::is_expired(user.verify_token_expiry) {
        warn!(user_id = %user.id, "verification token expired");
        return Err((StatusCode::BAD_REQUEST, "Token expired".into()));
    }

    User::mark_verified(&state.db, user.id)
        .await
        .map_err(internal)?;
    info!(user_id = %user.id, "email verified");

    Ok(Redirect::to(&format!(
        "{}/login?verified=success",
        state.config.frontend_url
    )))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        })?;

    // Social-only accounts have no hash; the answer stays the same.
    let ok = match user.password_hash.as_deref() {
        Some(hash) => verify_password(&payload.password, hash).map_err(internal)?,
        None => false,
    };
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    if state.config.require_email_verification && !user.email_verified {
        let token = Uuid::new_v4();
        match User::refresh_verify_token(
            &state.db,
            user.id,
            token,
            OffsetDateTime::now_utc() + VERIFY_TOKEN_TTL,
        )
        .await
        {
            Ok(()) => send_verification_email(&state, &user.email, token).await,
            Err(e) => error!(error = %e, user_id = %user.id, "verify token refresh failed"),
        }
        return Err((StatusCode::FORBIDDEN, "Verify email first".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(internal)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            error!(user_id = %user_id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;

    Ok(Json(user.into()))
}

#[instrument(skip(state, mp))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let mut form = ProfileForm::default();
    while let Ok(Some(field)) = mp.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("name") => form.name = Some(field.text().await.map_err(bad_field)?),
            Some("currency") => form.currency = Some(field.text().await.map_err(bad_field)?),
            Some("avatar") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_field)?;
                if !body.is_empty() {
                    form.avatar = Some(UploadedFile { body, content_type });
                }
            }
            _ => {}
        }
    }

    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let avatar_url = match form.avatar {
        Some(file) => {
            let url = store_avatar(&state, file).await.map_err(internal)?;
            if let Some(old) = user.avatar_url.as_deref().and_then(|u| u.rsplit('/').next()) {
                if let Err(e) = state.storage.delete(old).await {
                    warn!(error = %e, user_id = %user_id, "stale avatar not removed");
                }
            }
            Some(url)
        }
        None => None,
    };

    let name = form.name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let currency = form
        .currency
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());

    let updated = User::update_profile(
        &state.db,
        user_id,
        name.as_deref(),
        currency.as_deref(),
        avatar_url.as_deref(),
    )
    .await
    .map_err(internal)?;

    info!(user_id = %user_id, "profile updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let email = payload.email.trim().to_lowercase();

    // Same answer whether or not the account exists.
    if let Some(user) = User::find_by_email(&state.db, &email)
        .await
        .map_err(internal)?
    {
        let code = otp::generate();
        User::set_reset_otp(&state.db, user.id, &code, otp::expiry_from_now())
            .await
            .map_err(internal)?;

        let (subject, html) = mailer::reset_otp_email(&code);
        if let Err(e) = state.mailer.send(&email, subject, &html).await {
            error!(error = %e, user_id = %user.id, "otp email failed");
        }
        info!(user_id = %user.id, "reset otp issued");
    }

    Ok(Json(MessageResponse {
        message: "OTP sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let email = payload.email.trim().to_lowercase();

    if payload.password.len() < 8 {
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let user = User::find_by_email(&state.db, &email)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::BAD_REQUEST, "Invalid".to_string()))?;

    match user.reset_otp.as_deref() {
        Some(stored) if stored == payload.otp => {}
        _ => {
            warn!(user_id = %user.id, "reset with wrong or consumed otp");
            return Err((StatusCode::BAD_REQUEST, "Invalid OTP".into()));
        }
    }
    if otp::is_expired(user.reset_otp_expiry) {
        warn!(user_id = %user.id, "reset with expired otp");
        return Err((StatusCode::BAD_REQUEST, "OTP expired".into()));
    }

    let hash = hash_password(&payload.password).map_err(internal)?;
    User::reset_password(&state.db, user.id, &hash)
        .await
        .map_err(internal)?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse {
        message: "Password Reset Success".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn google_login(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let Some(client_id) = state.config.google_client_id.as_deref() else {
        error!("google login attempted without GOOGLE_CLIENT_ID configured");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Google login failed".into(),
        ));
    };

    let info = match google::verify_id_token(client_id, &payload.token).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "google token verification failed");
            return Err((StatusCode::UNAUTHORIZED, "Google login failed".into()));
        }
    };

    let email = info.email.trim().to_lowercase();
    let user = match User::find_by_email(&state.db, &email)
        .await
        .map_err(internal)?
    {
        Some(user) => user,
        None => {
            let new_user = NewUser {
                name: info.display_name(),
                email: email.clone(),
                password_hash: None,
                avatar_url: info.picture.clone(),
                email_verified: true,
                verify_token: None,
                verify_token_expiry: None,
            };
            let user = User::create(&state.db, &new_user).await.map_err(internal)?;
            info!(user_id = %user.id, email = %user.email, "user created from google login");
            user
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(internal)?;

    info!(user_id = %user.id, "google login");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.domain.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email(""));
    }
}
