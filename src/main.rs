use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use aura::config::AppConfig;
use aura::db;
use aura::handlers;
use aura::services::payments::mercadopago::MercadoPagoGateway;
use aura::services::sessions::{self, SqliteSessionStore};
use aura::services::tokens::{Hs256Issuer, TokenIssuer};
use aura::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let studio = db::init_studio_db(&config.database_url, &config.migrations_dir)?;
    let market = db::init_market_db(&config.market_database_url, &config.migrations_dir)?;

    if config.mercado_pago_access_token.is_empty() {
        tracing::warn!("MERCADO_PAGO_ACCESS_TOKEN not set, checkout will fail");
    }
    let payments = MercadoPagoGateway::new(config.mercado_pago_access_token.clone());

    let tokens: Option<Box<dyn TokenIssuer>> = if config.firebase_service_account.is_empty() {
        tracing::warn!("FIREBASE_SERVICE_ACCOUNT not set, admin login disabled");
        None
    } else {
        match Hs256Issuer::from_service_account(&config.firebase_service_account) {
            Ok(issuer) => Some(Box::new(issuer)),
            Err(e) => {
                tracing::error!(error = %e, "invalid FIREBASE_SERVICE_ACCOUNT, admin login disabled");
                None
            }
        }
    };

    std::fs::create_dir_all(&config.pdf_dir)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(studio)),
        market_db: Arc::new(Mutex::new(market)),
        config: config.clone(),
        payments: Box::new(payments),
        tokens,
    });

    let session_store = SqliteSessionStore::new(Arc::clone(&state.db));
    match session_store.delete_expired() {
        Ok(n) if n > 0 => tracing::info!(sessions = n, "purged expired sessions"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "failed to purge expired sessions"),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/admin-login", post(handlers::admin::admin_login))
        .route("/api/config", get(handlers::site::public_config))
        .route("/api/business-hours", get(handlers::site::business_hours))
        .route(
            "/api/create-preference",
            post(handlers::payments::create_preference),
        )
        .route(
            "/api/webhook",
            get(handlers::payments::webhook_check).post(handlers::payments::webhook),
        )
        .route(
            "/api/exportar-calendario",
            post(handlers::exports::export_calendar),
        )
        .route(
            "/api/exportar-disponibilidad",
            post(handlers::exports::export_availability),
        )
        .route(
            "/exportar_calendario.php",
            post(handlers::exports::save_calendar),
        )
        .route("/buscar.php", get(handlers::market::lookup_product))
        .route(
            "/buscar_autocomplete.php",
            get(handlers::market::autocomplete),
        )
        .route("/guardar_factura.php", post(handlers::market::save_invoice))
        .route("/api/facturas", get(handlers::market::list_invoices))
        .route("/api/facturas/:id", get(handlers::market::get_invoice))
        .route(
            "/api/facturas/:id/pdf",
            post(handlers::market::reexport_invoice_pdf),
        )
        .route(
            "/api/facturas/:id/csv",
            get(handlers::market::export_invoice_csv),
        )
        .route(
            "/api/productos/importar",
            post(handlers::market::import_products),
        )
        .route("/register", post(handlers::accounts::register))
        .route("/login", post(handlers::accounts::login))
        .route("/logout", post(handlers::accounts::logout))
        .route("/auth/status", get(handlers::accounts::auth_status))
        .route(
            "/subscription",
            post(handlers::accounts::create_subscription),
        )
        .route(
            "/subscriptions",
            get(handlers::accounts::list_subscriptions),
        )
        .route("/admin/users", get(handlers::admin::list_users))
        .route(
            "/admin/subscriptions",
            get(handlers::admin::list_all_subscriptions),
        )
        .route(
            "/admin/payments",
            get(handlers::admin::list_payment_notifications),
        )
        .nest_service("/pdfs", ServeDir::new(&config.pdf_dir))
        .layer(sessions::session_layer(session_store, config.cookie_secure))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
