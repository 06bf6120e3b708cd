use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;

use crate::models::business_hours::status_at;
use crate::models::BusinessHoursStatus;
use crate::state::AppState;

// GET /api/config
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    studio_phone: String,
}

pub async fn public_config(State(state): State<Arc<AppState>>) -> Json<PublicConfig> {
    Json(PublicConfig {
        studio_phone: state.config.studio_phone.clone(),
    })
}

// GET /api/business-hours
pub async fn business_hours(State(state): State<Arc<AppState>>) -> Json<BusinessHoursStatus> {
    let local = studio_now(state.config.studio_utc_offset_hours);
    Json(status_at(&local))
}

/// Wall-clock time at the studio, from a fixed UTC offset.
pub fn studio_now(utc_offset_hours: i32) -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::hours(i64::from(utc_offset_hours))
}
