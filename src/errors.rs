use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("payment gateway error: {0}")]
    Payment(String),

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_)
            | AppError::Session(_)
            | AppError::Config(_)
            | AppError::Payment(_)
            | AppError::Pdf(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message shown to the client. Server-side failures never leak details.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                "Error en el servidor".to_string()
            }
            AppError::Config(_) => "Error de configuración del servidor".to_string(),
            AppError::Payment(_) => "Error al procesar el pago".to_string(),
            AppError::Pdf(_) => "Error al generar PDF".to_string(),
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::RateLimited(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        // Browser clients read `message`; API callers read `error`.
        let message = self.public_message();
        let body = serde_json::json!({ "success": false, "error": message, "message": message });
        (status, axum::Json(body)).into_response()
    }
}
