use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::handlers::site::studio_now;
use crate::models::{AvailabilityExportRequest, CalendarExportRequest};
use crate::services::reports::{availability, calendar};
use crate::services::storage;
use crate::state::AppState;

fn pdf_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

// POST /api/exportar-calendario
pub async fn export_calendar(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalendarExportRequest>,
) -> Result<Response, AppError> {
    if req.reservations.is_empty() {
        return Err(AppError::BadRequest("No hay datos de reservas para exportar".to_string()));
    }

    let now = studio_now(state.config.studio_utc_offset_hours);
    let bytes = calendar::render_calendar(&req.reservations, now);
    tracing::info!(reservations = req.reservations.len(), bytes = bytes.len(), "calendar pdf generated");

    Ok(pdf_response(&calendar::calendar_filename(now), bytes))
}

// POST /api/exportar-disponibilidad
pub async fn export_availability(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AvailabilityExportRequest>,
) -> Result<Response, AppError> {
    if req.availability.is_empty() {
        return Err(AppError::BadRequest(
            "No hay datos de disponibilidad para exportar".to_string(),
        ));
    }

    let bytes = availability::render_availability(&req, &state.config.studio_phone);
    tracing::info!(days = req.availability.len(), bytes = bytes.len(), "availability pdf generated");

    Ok(pdf_response(availability::FILENAME, bytes))
}

// POST /exportar_calendario.php
#[derive(Serialize)]
pub struct StoredExport {
    success: bool,
    filename: String,
    filepath: String,
    message: String,
}

pub async fn save_calendar(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalendarExportRequest>,
) -> Result<Json<StoredExport>, AppError> {
    if req.reservations.is_empty() {
        return Err(AppError::BadRequest("No hay datos de reservas para exportar".to_string()));
    }

    let now = studio_now(state.config.studio_utc_offset_hours);
    let bytes = calendar::render_calendar(&req.reservations, now);

    let (filename, _) = storage::write_unique_pdf(
        Path::new(&state.config.pdf_dir),
        &calendar::calendar_stem(now),
        &bytes,
    )
    .map_err(|e| AppError::Pdf(format!("{e:#}")))?;

    Ok(Json(StoredExport {
        success: true,
        filepath: storage::public_path(&filename),
        filename,
        message: "Calendario exportado exitosamente".to_string(),
    }))
}
