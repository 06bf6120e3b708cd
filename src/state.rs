use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::payments::PaymentGateway;
use crate::services::tokens::TokenIssuer;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub market_db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentGateway>,
    /// `None` when no service account is configured; admin login then
    /// reports a configuration error.
    pub tokens: Option<Box<dyn TokenIssuer>>,
}

impl AppState {
    pub fn studio(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("studio database lock poisoned")))
    }

    pub fn market(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.market_db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("market database lock poisoned")))
    }
}
