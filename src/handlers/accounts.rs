use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{CurrentUser, Subscription};
use crate::services::{auth, sessions};
use crate::state::AppState;

#[derive(Serialize)]
pub struct Outcome {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<&'static str>,
}

fn check_auth_rate_limit(state: &AppState, client: &str) -> Result<(), AppError> {
    let db = state.studio()?;
    let attempts = queries::record_auth_attempt(&db, client)?;
    let _ = queries::cleanup_auth_windows(&db);

    if attempts > auth::MAX_AUTH_ATTEMPTS {
        tracing::warn!(client = %client, attempts, "auth rate limit exceeded");
        return Err(AppError::RateLimited(
            "Demasiados intentos de autenticación, por favor intente más tarde.".to_string(),
        ));
    }
    Ok(())
}

pub(crate) async fn require_user(session: &Session) -> Result<CurrentUser, AppError> {
    sessions::current_user(session)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Debe iniciar sesión primero".to_string()))
}

async fn start_session(
    state: &AppState,
    session: &Session,
    user: CurrentUser,
    message: &'static str,
) -> Result<Json<Outcome>, AppError> {
    sessions::sign_in(session, &user).await?;
    if let Ok(db) = state.studio() {
        let _ = queries::delete_expired_sessions(&db, chrono::Utc::now().timestamp());
    }

    Ok(Json(Outcome {
        success: true,
        message,
        redirect: Some("/"),
    }))
}

// POST /register
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    session: Session,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Outcome>, AppError> {
    let client = auth::client_key(&headers, peer.map(|ConnectInfo(addr)| addr), state.config.trust_proxy);
    check_auth_rate_limit(&state, &client)?;

    let username = req.username.trim();
    let email = req.email.trim();
    auth::validate_registration(username, email, &req.password)
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    let hash = auth::hash_password(&req.password)?;
    let user_id = {
        let db = state.studio()?;
        queries::create_user(&db, username, email, &hash)?
    };
    let Some(user_id) = user_id else {
        return Err(AppError::BadRequest("El usuario o email ya existe".to_string()));
    };

    tracing::info!(user_id, username = %username, "user registered");
    let user = CurrentUser {
        user_id,
        username: username.to_string(),
    };
    start_session(&state, &session, user, "Usuario registrado exitosamente").await
}

// POST /login
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Outcome>, AppError> {
    let client = auth::client_key(&headers, peer.map(|ConnectInfo(addr)| addr), state.config.trust_proxy);
    check_auth_rate_limit(&state, &client)?;

    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Usuario y contraseña son requeridos".to_string()));
    }

    let credentials = {
        let db = state.studio()?;
        queries::get_credentials(&db, username)?
    };

    let invalid = || AppError::Unauthorized("Usuario o contraseña incorrectos".to_string());
    let credentials = credentials.ok_or_else(invalid)?;
    if !auth::verify_password(&req.password, &credentials.password_hash) {
        tracing::info!(username = %username, "login failed");
        return Err(invalid());
    }

    tracing::info!(user_id = credentials.user_id, "user logged in");
    let user = CurrentUser {
        user_id: credentials.user_id,
        username: credentials.username,
    };
    start_session(&state, &session, user, "Inicio de sesión exitoso").await
}

// POST /logout
pub async fn logout(session: Session) -> Result<Json<Outcome>, AppError> {
    if let Some(user) = sessions::current_user(&session).await? {
        tracing::info!(user_id = user.user_id, "user logged out");
    }
    sessions::sign_out(&session).await?;

    Ok(Json(Outcome {
        success: true,
        message: "Sesión cerrada exitosamente",
        redirect: None,
    }))
}

// GET /auth/status
#[derive(Serialize)]
pub struct AuthStatus {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

pub async fn auth_status(session: Session) -> Result<Json<AuthStatus>, AppError> {
    let user = sessions::current_user(&session).await?;
    Ok(Json(AuthStatus {
        authenticated: user.is_some(),
        username: user.map(|u| u.username),
    }))
}

// POST /subscription
#[derive(Deserialize)]
pub struct SubscriptionRequest {
    pub preapproval_id: Option<String>,
    pub status: Option<String>,
}

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<SubscriptionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = require_user(&session).await?;

    let preapproval_id = req.preapproval_id.as_deref().filter(|s| !s.is_empty());
    let status = req.status.as_deref().filter(|s| !s.is_empty()).unwrap_or("pending");

    let id = {
        let db = state.studio()?;
        queries::create_subscription(&db, user.user_id, preapproval_id, status)?
    };
    tracing::info!(subscription_id = id, user_id = user.user_id, status, "subscription saved");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Suscripción guardada exitosamente",
    })))
}

// GET /subscriptions
#[derive(Serialize)]
pub struct SubscriptionList {
    pub success: bool,
    pub subscriptions: Vec<Subscription>,
}

pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<SubscriptionList>, AppError> {
    let user = require_user(&session).await?;
    let subscriptions = {
        let db = state.studio()?;
        queries::get_subscriptions_for_user(&db, user.user_id)?
    };

    Ok(Json(SubscriptionList {
        success: true,
        subscriptions,
    }))
}
