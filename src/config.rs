use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub market_database_url: String,
    pub migrations_dir: String,
    pub pdf_dir: String,
    pub admin_email: String,
    pub admin_password_hash: String,
    pub firebase_service_account: String,
    pub studio_phone: String,
    pub mercado_pago_access_token: String,
    pub mercado_pago_webhook_secret: String,
    pub base_url: String,
    pub auth_required: bool,
    pub studio_utc_offset_hours: i32,
    pub cookie_secure: bool,
    /// Take client addresses from `X-Forwarded-For`/`X-Real-IP`.
    pub trust_proxy: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let db_name = env::var("DB_NAME").unwrap_or_else(|_| "el_mexiquense_market".to_string());
        if env::var("DB_HOST").is_ok() || env::var("DB_USER").is_ok() {
            tracing::warn!("DB_HOST/DB_USER/DB_PASS are ignored, market data lives in {db_name}.db");
        }

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "aura_studio.db".to_string()),
            market_database_url: format!("{db_name}.db"),
            migrations_dir: env::var("MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string()),
            pdf_dir: env::var("PDF_DIR").unwrap_or_else(|_| "pdfs".to_string()),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            admin_password_hash: env::var("ADMIN_PASSWORD_HASH").unwrap_or_default(),
            firebase_service_account: env::var("FIREBASE_SERVICE_ACCOUNT").unwrap_or_default(),
            studio_phone: env::var("STUDIO_PHONE").unwrap_or_else(|_| "527151596586".to_string()),
            mercado_pago_access_token: env::var("MERCADO_PAGO_ACCESS_TOKEN")
                .or_else(|_| env::var("MERCADOPAGO_ACCESS_TOKEN"))
                .unwrap_or_default(),
            mercado_pago_webhook_secret: env::var("MERCADO_PAGO_WEBHOOK_SECRET").unwrap_or_default(),
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "https://aura-eta-five.vercel.app".to_string()),
            auth_required: env::var("AUTH_REQUIRED").map(|v| v == "true").unwrap_or(false),
            studio_utc_offset_hours: env::var("STUDIO_UTC_OFFSET_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(-6),
            cookie_secure: env::var("COOKIE_SECURE").map(|v| v == "true").unwrap_or(false),
            trust_proxy: env::var("TRUST_PROXY").map(|v| v == "true").unwrap_or(false),
        }
    }
}
