use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Subscription, User};
use crate::services::auth;
use crate::services::tokens::AdminClaims;
use crate::state::AppState;

pub(crate) fn check_admin(state: &AppState, headers: &HeaderMap) -> Result<AdminClaims, AppError> {
    let unauthorized = || AppError::Unauthorized("No autorizado".to_string());

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;

    let issuer = state.tokens.as_ref().ok_or_else(unauthorized)?;
    issuer.verify(token.trim()).ok_or_else(unauthorized)
}

// POST /api/admin-login
#[derive(Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    success: bool,
    custom_token: String,
    email: String,
}

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, AppError> {
    let config = &state.config;
    if config.admin_email.is_empty() || config.admin_password_hash.is_empty() {
        return Err(AppError::Config("admin credentials not configured".to_string()));
    }
    let Some(issuer) = state.tokens.as_ref() else {
        return Err(AppError::Config("service account not configured".to_string()));
    };

    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Por favor, ingresa tu email y contraseña.".to_string()));
    }

    let invalid = || {
        AppError::Unauthorized(
            "Credenciales incorrectas. Por favor, verifica tu email y contraseña.".to_string(),
        )
    };
    if !email.eq_ignore_ascii_case(&config.admin_email) {
        tracing::info!(email = %email, "admin login failed: unknown email");
        return Err(invalid());
    }
    if !auth::verify_admin_password(&req.password, &config.admin_password_hash) {
        tracing::info!(email = %email, "admin login failed: wrong password");
        return Err(invalid());
    }

    let custom_token = issuer.issue(&config.admin_email)?;
    tracing::info!(email = %config.admin_email, "admin token issued");

    Ok(Json(AdminLoginResponse {
        success: true,
        custom_token,
        email: config.admin_email.clone(),
    }))
}

// GET /admin/users
#[derive(Serialize)]
pub struct UsersResponse {
    success: bool,
    users: Vec<User>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UsersResponse>, AppError> {
    check_admin(&state, &headers)?;
    let users = {
        let db = state.studio()?;
        queries::list_users(&db)?
    };
    Ok(Json(UsersResponse { success: true, users }))
}

// GET /admin/subscriptions
#[derive(Serialize)]
pub struct AllSubscriptionsResponse {
    success: bool,
    subscriptions: Vec<Subscription>,
}

pub async fn list_all_subscriptions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AllSubscriptionsResponse>, AppError> {
    check_admin(&state, &headers)?;
    let subscriptions = {
        let db = state.studio()?;
        queries::get_all_subscriptions(&db)?
    };
    Ok(Json(AllSubscriptionsResponse {
        success: true,
        subscriptions,
    }))
}

// GET /admin/payments
#[derive(Deserialize)]
pub struct PaymentsQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct PaymentNotificationView {
    id: i64,
    topic: String,
    resource_id: Option<String>,
    status: Option<String>,
}

pub async fn list_payment_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_admin(&state, &headers)?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let notifications: Vec<PaymentNotificationView> = {
        let db = state.studio()?;
        queries::get_payment_notifications(&db, limit)?
    }
    .into_iter()
    .map(|n| PaymentNotificationView {
        id: n.id,
        topic: n.topic,
        resource_id: n.resource_id,
        status: n.status,
    })
    .collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "notifications": notifications,
    })))
}
