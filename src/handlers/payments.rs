use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{PreferenceRequest, WebhookNotification};
use crate::services::payments::build_preference;
use crate::services::webhooks;
use crate::state::AppState;

// POST /api/create-preference
#[derive(Serialize)]
pub struct PreferenceResponse {
    init_point: String,
}

pub async fn create_preference(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PreferenceRequest>,
) -> Result<Json<PreferenceResponse>, AppError> {
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let preference = build_preference(&req, &state.config.base_url, host).map_err(AppError::BadRequest)?;

    let created = state
        .payments
        .create_preference(&preference)
        .await
        .map_err(|e| AppError::Payment(format!("{e:#}")))?;

    tracing::info!(
        preference_id = created.id.as_deref().unwrap_or(""),
        title = %preference.items[0].title,
        "checkout preference created"
    );

    Ok(Json(PreferenceResponse {
        init_point: created.init_point,
    }))
}

// GET /api/webhook
pub async fn webhook_check() -> &'static str {
    "Webhook endpoint active"
}

// POST /api/webhook
//
// Always acknowledged with 200 so the gateway does not retry; failures are
// only logged.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Json<serde_json::Value> {
    let ack = Json(serde_json::json!({"received": true}));

    let notification: WebhookNotification = match serde_json::from_str(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable webhook body");
            WebhookNotification::default()
        }
    };
    let topic = notification.topic().to_string();
    let resource_id = notification.resource_id();

    tracing::info!(topic = %topic, resource_id = resource_id.as_deref().unwrap_or(""), "webhook received");

    let secret = &state.config.mercado_pago_webhook_secret;
    if !secret.is_empty() {
        let signature = headers.get("x-signature").and_then(|v| v.to_str().ok()).unwrap_or("");
        let request_id = headers.get("x-request-id").and_then(|v| v.to_str().ok()).unwrap_or("");
        let data_id = resource_id.as_deref().unwrap_or("");

        if !webhooks::validate_signature(secret, signature, request_id, data_id) {
            tracing::warn!(topic = %topic, "invalid webhook signature, ignoring notification");
            return ack;
        }
    }

    let mut status = None;
    if topic == "payment" {
        if let Some(id) = resource_id.as_deref() {
            match state.payments.get_payment(id).await {
                Ok(payment) => {
                    tracing::info!(
                        payment_id = %id,
                        status = payment.status.as_deref().unwrap_or(""),
                        detail = payment.status_detail.as_deref().unwrap_or(""),
                        amount = payment.transaction_amount.unwrap_or_default(),
                        "payment status"
                    );
                    status = payment.status;
                }
                Err(e) => tracing::error!(error = %e, payment_id = %id, "payment lookup failed"),
            }
        }
    }

    let Ok(db) = state.studio() else {
        tracing::error!("studio database unavailable, notification not recorded");
        return ack;
    };
    if let Err(e) = queries::insert_payment_notification(
        &db,
        &topic,
        resource_id.as_deref(),
        status.as_deref(),
        &body,
    ) {
        tracing::error!(error = %e, "failed to record payment notification");
    }

    if topic == "preapproval" || topic == "subscription_preapproval" {
        if let (Some(id), Some(action)) = (resource_id.as_deref(), notification.action.as_deref()) {
            if let Some(new_status) = preapproval_status(action) {
                match queries::update_subscription_status(&db, id, new_status) {
                    Ok(n) => tracing::info!(preapproval_id = %id, status = new_status, updated = n, "subscription status updated"),
                    Err(e) => tracing::error!(error = %e, "failed to update subscription status"),
                }
            }
        }
    }

    ack
}

/// Subscription status implied by a preapproval notification action.
fn preapproval_status(action: &str) -> Option<&'static str> {
    match action {
        "authorized" | "subscription.authorized" => Some("authorized"),
        "paused" | "subscription.paused" => Some("paused"),
        "cancelled" | "subscription.cancelled" => Some("cancelled"),
        _ => None,
    }
}
