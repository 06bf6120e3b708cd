use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::db::market;
use crate::errors::AppError;
use crate::handlers::admin::check_admin;
use crate::handlers::site::studio_now;
use crate::models::{InvoiceDetail, InvoiceRequest, InvoiceSummaryView, ProductView, SavedInvoice};
use crate::services::{catalog, invoicing, sessions};
use crate::state::AppState;

/// Enforces a logged-in session when `AUTH_REQUIRED=true`.
async fn require_market_session(state: &AppState, session: &Session) -> Result<(), AppError> {
    if !state.config.auth_required {
        return Ok(());
    }

    match sessions::current_user(session).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Unauthorized(
            "No autorizado. Por favor inicie sesión.".to_string(),
        )),
    }
}

fn invoice_not_found() -> AppError {
    AppError::NotFound("Factura no encontrada".to_string())
}

// GET /buscar.php?upc=
#[derive(Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub upc: String,
}

#[derive(Serialize)]
pub struct LookupResponse {
    success: bool,
    producto: ProductView,
}

pub async fn lookup_product(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, AppError> {
    require_market_session(&state, &session).await?;

    let upc = query.upc.trim();
    if upc.is_empty() {
        return Err(AppError::BadRequest("UPC no proporcionado".to_string()));
    }

    let product = {
        let db = state.market()?;
        market::find_product_by_upc(&db, upc)?
    };

    match product {
        Some(p) => Ok(Json(LookupResponse {
            success: true,
            producto: p.view(false),
        })),
        None => Err(AppError::NotFound("Producto no encontrado".to_string())),
    }
}

// GET /buscar_autocomplete.php?search=
#[derive(Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Serialize)]
pub struct AutocompleteResponse {
    success: bool,
    productos: Vec<ProductView>,
}

pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AutocompleteQuery>,
) -> Result<Json<AutocompleteResponse>, AppError> {
    let search = query.search.trim();
    if search.is_empty() {
        return Ok(Json(AutocompleteResponse {
            success: false,
            productos: vec![],
        }));
    }

    let products = {
        let db = state.market()?;
        market::search_products_by_upc_prefix(&db, search)?
    };

    Ok(Json(AutocompleteResponse {
        success: true,
        productos: products.iter().map(|p| p.view(true)).collect(),
    }))
}

// POST /guardar_factura.php
pub async fn save_invoice(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InvoiceRequest>,
) -> Result<Json<SavedInvoice>, AppError> {
    let invoice = req
        .into_invoice()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let now = studio_now(state.config.studio_utc_offset_hours);
    let mut db = state.market()?;
    let pdf_dir = std::path::Path::new(&state.config.pdf_dir);
    let saved = invoicing::save_invoice(&mut db, pdf_dir, &invoice, now)
        .map_err(|e| AppError::Internal(e.context("Error al guardar la factura")))?;

    Ok(Json(saved))
}

// GET /api/facturas?limit=
#[derive(Deserialize)]
pub struct InvoiceListQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct InvoiceListResponse {
    success: bool,
    facturas: Vec<InvoiceSummaryView>,
}

pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    require_market_session(&state, &session).await?;

    let limit = query.limit.unwrap_or(market::INVOICE_LIST_LIMIT).clamp(1, 500);
    let invoices = {
        let db = state.market()?;
        market::list_invoices(&db, limit)?
    };

    Ok(Json(InvoiceListResponse {
        success: true,
        facturas: invoices.iter().map(|i| i.view()).collect(),
    }))
}

// GET /api/facturas/:id
#[derive(Serialize)]
pub struct InvoiceDetailResponse {
    success: bool,
    factura: InvoiceDetail,
}

pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceDetailResponse>, AppError> {
    require_market_session(&state, &session).await?;

    let stored = {
        let db = state.market()?;
        market::get_invoice(&db, id)?
    };
    let stored = stored.ok_or_else(invoice_not_found)?;

    Ok(Json(InvoiceDetailResponse {
        success: true,
        factura: stored.detail(),
    }))
}

// POST /api/facturas/:id/pdf
pub async fn reexport_invoice_pdf(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Json<SavedInvoice>, AppError> {
    require_market_session(&state, &session).await?;

    let now = studio_now(state.config.studio_utc_offset_hours);
    let db = state.market()?;
    let saved = invoicing::reexport_pdf(&db, std::path::Path::new(&state.config.pdf_dir), id, now)
        .map_err(|e| AppError::Pdf(format!("{e:#}")))?;

    saved.map(Json).ok_or_else(invoice_not_found)
}

// GET /api/facturas/:id/csv
pub async fn export_invoice_csv(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    require_market_session(&state, &session).await?;

    let stored = {
        let db = state.market()?;
        market::get_invoice(&db, id)?
    };
    let stored = stored.ok_or_else(invoice_not_found)?;
    let bytes = invoicing::invoice_csv(&stored)?;

    let now = studio_now(state.config.studio_utc_offset_hours);
    let filename = invoicing::invoice_csv_filename(id, now);
    tracing::info!(factura_id = id, bytes = bytes.len(), "invoice csv exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

// POST /api/productos/importar
#[derive(Serialize)]
pub struct ImportResponse {
    success: bool,
    productos_procesados: usize,
    mensaje: String,
}

pub async fn import_products(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportResponse>, AppError> {
    let admin = check_admin(&state, &headers)?;

    let rows = catalog::parse_catalog_csv(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;
    if rows.is_empty() {
        return Err(AppError::BadRequest("El CSV no contiene productos".to_string()));
    }

    let count = {
        let mut db = state.market()?;
        catalog::import_catalog(&mut db, &rows)?
    };
    tracing::info!(admin = %admin.sub, products = count, "product catalogue imported");

    Ok(Json(ImportResponse {
        success: true,
        productos_procesados: count,
        mensaje: format!("Se importaron {count} productos exitosamente"),
    }))
}
