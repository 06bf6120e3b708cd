use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use rust_decimal::Decimal;
use tower::ServiceExt;

use aura::config::AppConfig;
use aura::db;
use aura::handlers;
use aura::models::{CreatedPreference, PaymentInfo, Preference};
use aura::services::payments::PaymentGateway;
use aura::services::sessions::{self, SqliteSessionStore};
use aura::services::tokens::{Hs256Issuer, TokenIssuer};
use aura::state::AppState;

// ── Mock Gateway ──

#[derive(Default)]
struct MockGateway {
    preferences: Arc<Mutex<Vec<Preference>>>,
    fail: bool,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_preference(&self, preference: &Preference) -> anyhow::Result<CreatedPreference> {
        if self.fail {
            anyhow::bail!("gateway down");
        }
        self.preferences.lock().unwrap().push(preference.clone());
        Ok(CreatedPreference {
            id: Some("pref-1".to_string()),
            init_point: "https://checkout.example/pref-1".to_string(),
        })
    }

    async fn get_payment(&self, payment_id: &str) -> anyhow::Result<PaymentInfo> {
        Ok(PaymentInfo {
            id: serde_json::json!(payment_id),
            status: Some("approved".to_string()),
            status_detail: Some("accredited".to_string()),
            transaction_amount: Some(150.0),
        })
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        market_database_url: ":memory:".to_string(),
        migrations_dir: "migrations".to_string(),
        pdf_dir: std::env::temp_dir()
            .join(format!("aura-test-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .to_string(),
        admin_email: "Admin@Aura.mx".to_string(),
        admin_password_hash: "clave-admin".to_string(),
        firebase_service_account: String::new(),
        studio_phone: "527151596586".to_string(),
        mercado_pago_access_token: String::new(),
        mercado_pago_webhook_secret: String::new(), // empty = skip signature validation
        base_url: "https://aura.example".to_string(),
        auth_required: false,
        studio_utc_offset_hours: -6,
        cookie_secure: false,
        trust_proxy: false,
    }
}

fn test_issuer() -> Hs256Issuer {
    Hs256Issuer::new("svc@aura.iam".to_string(), b"test-key".to_vec())
}

fn build_state(config: AppConfig, gateway: MockGateway) -> Arc<AppState> {
    let studio = db::init_studio_db(":memory:", &config.migrations_dir).unwrap();
    let market = db::init_market_db(":memory:", &config.migrations_dir).unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(studio)),
        market_db: Arc::new(Mutex::new(market)),
        config,
        payments: Box::new(gateway),
        tokens: Some(Box::new(test_issuer())),
    })
}

fn test_state() -> Arc<AppState> {
    build_state(test_config(), MockGateway::default())
}

fn test_app(state: Arc<AppState>) -> Router {
    let store = SqliteSessionStore::new(Arc::clone(&state.db));
    Router::new()
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
        .layer(sessions::session_layer(store, false))
        .with_state(state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
    let (status, headers, body) = send(app, req).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, headers, json)
}

fn session_cookie(headers: &HeaderMap) -> String {
    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn register_user(state: &Arc<AppState>, username: &str) -> String {
    let (status, headers, _) = send_json(
        test_app(state.clone()),
        json_request(
            "POST",
            "/register",
            serde_json::json!({
                "username": username,
                "email": format!("{username}@aura.mx"),
                "password": "secreto1",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    session_cookie(&headers)
}

// ── Site ──

#[tokio::test]
async fn test_health() {
    let (status, _, body) = send_json(test_app(test_state()), get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_public_config() {
    let (status, _, body) = send_json(test_app(test_state()), get_request("/api/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["studioPhone"], "527151596586");
}

#[tokio::test]
async fn test_business_hours_shape() {
    let (status, _, body) = send_json(test_app(test_state()), get_request("/api/business-hours")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["open"].is_boolean());
    assert!(!body["message"].as_str().unwrap().is_empty());
}

// ── Payments ──

#[tokio::test]
async fn test_create_preference() {
    let gateway = MockGateway::default();
    let sent = Arc::clone(&gateway.preferences);
    let state = build_state(test_config(), gateway);

    let mut req = json_request(
        "POST",
        "/api/create-preference",
        serde_json::json!({"title": "Clase muestra", "price": "150", "payer_name": "Ana", "payer_phone": "7151234567"}),
    );
    req.headers_mut().insert(header::HOST, "api.aura.example".parse().unwrap());

    let (status, _, body) = send_json(test_app(state), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["init_point"], "https://checkout.example/pref-1");

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].items[0].unit_price, 150.0);
    assert_eq!(sent[0].notification_url, "https://api.aura.example/api/webhook");
    assert_eq!(sent[0].back_urls.failure, "https://aura.example/?error=1");
}

#[tokio::test]
async fn test_create_preference_invalid_price() {
    let (status, _, body) = send_json(
        test_app(test_state()),
        json_request(
            "POST",
            "/api/create-preference",
            serde_json::json!({"title": "Clase", "price": "gratis", "payer_name": "Ana", "payer_phone": "1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_create_preference_gateway_failure() {
    let state = build_state(
        test_config(),
        MockGateway {
            fail: true,
            ..Default::default()
        },
    );
    let (status, _, body) = send_json(
        test_app(state),
        json_request(
            "POST",
            "/api/create-preference",
            serde_json::json!({"title": "Clase", "price": 150, "payer_name": "Ana", "payer_phone": "1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error al procesar el pago");
}

#[tokio::test]
async fn test_webhook_check() {
    let (status, _, body) = send(test_app(test_state()), get_request("/api/webhook")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Webhook endpoint active");
}

#[tokio::test]
async fn test_webhook_records_payment() {
    let state = test_state();
    let (status, _, body) = send_json(
        test_app(state.clone()),
        json_request(
            "POST",
            "/api/webhook",
            serde_json::json!({"type": "payment", "data": {"id": 987654}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let db = state.db.lock().unwrap();
    let list = db::queries::get_payment_notifications(&db, 10).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].resource_id.as_deref(), Some("987654"));
    assert_eq!(list[0].status.as_deref(), Some("approved"));
}

async fn subscribe(state: &Arc<AppState>, cookie: &str, preapproval_id: &str) {
    let mut req = json_request(
        "POST",
        "/subscription",
        serde_json::json!({"preapproval_id": preapproval_id}),
    );
    req.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
    let (status, _, _) = send_json(test_app(state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
}

fn subscription_status(state: &Arc<AppState>, preapproval_id: &str) -> String {
    let db = state.db.lock().unwrap();
    db::queries::get_all_subscriptions(&db)
        .unwrap()
        .into_iter()
        .find(|s| s.preapproval_id.as_deref() == Some(preapproval_id))
        .unwrap()
        .status
}

#[tokio::test]
async fn test_webhook_preapproval_updates_subscription() {
    let state = test_state();
    let cookie = register_user(&state, "ana").await;
    subscribe(&state, &cookie, "pre-1").await;
    subscribe(&state, &cookie, "pre-2").await;

    let (status, _, body) = send_json(
        test_app(state.clone()),
        json_request(
            "POST",
            "/api/webhook",
            serde_json::json!({
                "type": "subscription_preapproval",
                "action": "subscription.authorized",
                "data": {"id": "pre-1"}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(subscription_status(&state, "pre-1"), "authorized");

    let (status, _, _) = send_json(
        test_app(state.clone()),
        json_request(
            "POST",
            "/api/webhook",
            serde_json::json!({
                "type": "subscription_preapproval",
                "action": "subscription.updated",
                "data": {"id": "pre-2"}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(subscription_status(&state, "pre-2"), "pending");
    assert_eq!(subscription_status(&state, "pre-1"), "authorized");

    let db = state.db.lock().unwrap();
    assert_eq!(db::queries::get_payment_notifications(&db, 10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_webhook_always_acknowledges() {
    let state = test_state();
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _, body) = send_json(test_app(state), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn test_webhook_bad_signature_not_recorded() {
    let mut config = test_config();
    config.mercado_pago_webhook_secret = "s3cret".to_string();
    let state = build_state(config, MockGateway::default());

    let mut req = json_request(
        "POST",
        "/api/webhook",
        serde_json::json!({"type": "payment", "data": {"id": "1"}}),
    );
    req.headers_mut().insert("x-signature", "ts=1,v1=deadbeef".parse().unwrap());
    req.headers_mut().insert("x-request-id", "req-1".parse().unwrap());

    let (status, _, _) = send_json(test_app(state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);

    let db = state.db.lock().unwrap();
    assert!(db::queries::get_payment_notifications(&db, 10).unwrap().is_empty());
}

// ── Exports ──

fn reservations() -> serde_json::Value {
    serde_json::json!({
        "reservations": [
            {"date": "2025-03-04", "time": "07:00", "name": "Ana López", "phone": "7151234567", "notes": ""},
            {"date": "2025-03-03", "time": "18:00", "name": "Berta", "phone": "7157654321", "notes": "Primera clase"}
        ]
    })
}

#[tokio::test]
async fn test_export_calendar_pdf() {
    let (status, headers, body) = send(
        test_app(test_state()),
        json_request("POST", "/api/exportar-calendario", reservations()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"calendario_reservas_aura_"));
    assert!(body.starts_with(b"%PDF-1.4"));
}

#[tokio::test]
async fn test_export_calendar_empty() {
    let (status, _, body) = send_json(
        test_app(test_state()),
        json_request("POST", "/api/exportar-calendario", serde_json::json!({"reservations": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No hay datos de reservas para exportar");
}

#[tokio::test]
async fn test_export_availability_pdf() {
    let payload = serde_json::json!({
        "startDate": "2025-03-03",
        "endDate": "2025-03-08",
        "maxCapacity": 5,
        "availability": [{
            "dayName": "Lunes", "dayNumber": 3, "monthName": "Marzo",
            "morning": [{"time": "07:00", "available": 3, "isFull": false}],
            "afternoon": [{"time": "18:00", "available": 0, "isFull": true}]
        }]
    });
    let (status, headers, body) = send(
        test_app(test_state()),
        json_request("POST", "/api/exportar-disponibilidad", payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Disponibilidad.pdf\""
    );
    assert!(body.starts_with(b"%PDF-1.4"));
}

#[tokio::test]
async fn test_export_availability_empty() {
    let (status, _, body) = send_json(
        test_app(test_state()),
        json_request("POST", "/api/exportar-disponibilidad", serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No hay datos de disponibilidad para exportar");
}

#[tokio::test]
async fn test_save_calendar_to_disk() {
    let state = test_state();
    let pdf_dir = state.config.pdf_dir.clone();
    let (status, _, body) = send_json(
        test_app(state),
        json_request("POST", "/exportar_calendario.php", reservations()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Calendario exportado exitosamente");

    let filename = body["filename"].as_str().unwrap();
    assert_eq!(body["filepath"], format!("pdfs/{filename}"));
    let bytes = std::fs::read(std::path::Path::new(&pdf_dir).join(filename)).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    std::fs::remove_dir_all(&pdf_dir).unwrap();
}

#[tokio::test]
async fn test_save_calendar_twice_keeps_both_files() {
    let state = test_state();
    let pdf_dir = state.config.pdf_dir.clone();

    let mut names = vec![];
    for _ in 0..2 {
        let (status, _, body) = send_json(
            test_app(state.clone()),
            json_request("POST", "/exportar_calendario.php", reservations()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        names.push(body["filename"].as_str().unwrap().to_string());
    }

    assert_ne!(names[0], names[1]);
    for name in &names {
        assert!(std::path::Path::new(&pdf_dir).join(name).exists());
    }
    std::fs::remove_dir_all(&pdf_dir).unwrap();
}

// ── Market ──

fn seed_products(state: &Arc<AppState>) {
    let db = state.market_db.lock().unwrap();
    db::market::insert_product(&db, "7501055300075", "Coca-Cola 600ml", Decimal::new(1850, 2), "PZA").unwrap();
    db::market::insert_product(&db, "7501055300082", "Coca-Cola 2L", Decimal::new(42, 0), "PZA").unwrap();
    db::market::insert_product(&db, "7501000111206", "Pan Bimbo", Decimal::new(4550, 2), "PZA").unwrap();
}

#[tokio::test]
async fn test_lookup_product() {
    let state = test_state();
    seed_products(&state);

    let (status, _, body) = send_json(test_app(state), get_request("/buscar.php?upc=7501055300082")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["producto"]["nombre"], "Coca-Cola 2L");
    assert_eq!(body["producto"]["precio"], "42.00");
    assert!(body["producto"].get("upc").is_none());
}

#[tokio::test]
async fn test_lookup_product_missing() {
    let state = test_state();
    let (status, _, body) = send_json(test_app(state.clone()), get_request("/buscar.php?upc=000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Producto no encontrado");

    let (status, _, body) = send_json(test_app(state), get_request("/buscar.php")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UPC no proporcionado");
}

#[tokio::test]
async fn test_lookup_requires_session_when_configured() {
    let mut config = test_config();
    config.auth_required = true;
    let state = build_state(config, MockGateway::default());
    seed_products(&state);

    let (status, _, _) = send_json(test_app(state.clone()), get_request("/buscar.php?upc=7501055300082")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cookie = register_user(&state, "cajero").await;
    let req = Request::builder()
        .uri("/buscar.php?upc=7501055300082")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send_json(test_app(state), req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_autocomplete() {
    let state = test_state();
    seed_products(&state);

    let (status, _, body) = send_json(
        test_app(state.clone()),
        get_request("/buscar_autocomplete.php?search=75010553"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let productos = body["productos"].as_array().unwrap();
    assert_eq!(productos.len(), 2);
    assert_eq!(productos[0]["upc"], "7501055300075");
    assert_eq!(productos[0]["precio"], "18.50");

    let (_, _, body) = send_json(test_app(state), get_request("/buscar_autocomplete.php?search=")).await;
    assert_eq!(body["success"], false);
    assert!(body["productos"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_save_invoice() {
    let state = test_state();
    seed_products(&state);
    let pdf_dir = state.config.pdf_dir.clone();

    let payload = serde_json::json!({
        "fecha": "2025-03-10",
        "cliente": "Doña Rosa",
        "productos": [
            {"upc": "7501055300075", "descripcion": "Coca-Cola 600ml", "cantidad": 2, "precio": "18.50", "total": 37},
            {"upc": "9999", "descripcion": "Tamal", "cantidad": 3, "precio": 15, "total": 45}
        ],
        "subtotal": 82,
        "creditos": 2,
        "total": 80
    });
    let (status, _, body) = send_json(
        test_app(state.clone()),
        json_request("POST", "/guardar_factura.php", payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["mensaje"], "Factura guardada exitosamente");

    let factura_id = body["factura_id"].as_i64().unwrap();
    let pdf_url = body["pdf_url"].as_str().unwrap();
    assert!(pdf_url.starts_with(&format!("pdfs/factura_{factura_id}_")));

    {
        let db = state.market_db.lock().unwrap();
        let stored = db::market::get_invoice(&db, factura_id).unwrap().unwrap();
        assert_eq!(stored.invoice.total, Decimal::new(80, 0));
        assert_eq!(stored.invoice.lines.len(), 2);
        let created = db::market::find_product_by_upc(&db, "9999").unwrap().unwrap();
        assert_eq!(created.unidad, "PZA");
    }

    let filename = pdf_url.trim_start_matches("pdfs/");
    assert!(std::path::Path::new(&pdf_dir).join(filename).exists());
    std::fs::remove_dir_all(&pdf_dir).unwrap();
}

#[tokio::test]
async fn test_save_invoice_incomplete() {
    let (status, _, body) = send_json(
        test_app(test_state()),
        json_request("POST", "/guardar_factura.php", serde_json::json!({"cliente": "X"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Datos incompletos");

    let (status, _, body) = send_json(
        test_app(test_state()),
        json_request(
            "POST",
            "/guardar_factura.php",
            serde_json::json!({"fecha": "2025-03-10", "cliente": "X", "productos": []}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No hay productos en la factura");
}

fn invoice_payload(cliente: &str) -> serde_json::Value {
    serde_json::json!({
        "fecha": "2025-03-10",
        "cliente": cliente,
        "productos": [
            {"upc": "7501055300075", "descripcion": "Coca-Cola 600ml", "cantidad": 2, "precio": "18.50", "total": 37},
            {"upc": "", "descripcion": "Tamal", "cantidad": 3, "precio": 15, "total": 45}
        ],
        "subtotal": 82,
        "creditos": 2,
        "total": 80
    })
}

async fn store_invoice(state: &Arc<AppState>, cliente: &str) -> i64 {
    let (status, _, body) = send_json(
        test_app(state.clone()),
        json_request("POST", "/guardar_factura.php", invoice_payload(cliente)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["factura_id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_invoice_list_and_detail() {
    let state = test_state();
    seed_products(&state);
    let pdf_dir = state.config.pdf_dir.clone();
    let first = store_invoice(&state, "Doña Rosa").await;
    let second = store_invoice(&state, "Don Pepe").await;

    let (status, _, body) = send_json(test_app(state.clone()), get_request("/api/facturas")).await;
    assert_eq!(status, StatusCode::OK);
    let facturas = body["facturas"].as_array().unwrap();
    assert_eq!(facturas.len(), 2);
    assert_eq!(facturas[0]["id"], second);
    assert_eq!(facturas[0]["total"], "80.00");

    let (_, _, body) = send_json(test_app(state.clone()), get_request("/api/facturas?limit=1")).await;
    assert_eq!(body["facturas"].as_array().unwrap().len(), 1);

    let (status, _, body) = send_json(
        test_app(state.clone()),
        get_request(&format!("/api/facturas/{first}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let factura = &body["factura"];
    assert_eq!(factura["cliente"], "Doña Rosa");
    assert_eq!(factura["fecha"], "2025-03-10");
    assert_eq!(factura["creditos"], "2.00");
    assert_eq!(factura["items"].as_array().unwrap().len(), 2);
    assert_eq!(factura["items"][0]["precio"], "18.50");
    assert!(factura["pdf_url"].as_str().unwrap().starts_with("pdfs/factura_"));

    let (status, _, body) = send_json(test_app(state), get_request("/api/facturas/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Factura no encontrada");
    std::fs::remove_dir_all(&pdf_dir).unwrap();
}

#[tokio::test]
async fn test_invoice_pdf_reexport() {
    let state = test_state();
    let pdf_dir = state.config.pdf_dir.clone();
    let id = store_invoice(&state, "Doña Rosa").await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/facturas/{id}/pdf"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send_json(test_app(state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mensaje"], "Factura exportada a PDF");

    let pdf_url = body["pdf_url"].as_str().unwrap();
    let file = std::path::Path::new(&pdf_dir).join(pdf_url.trim_start_matches("pdfs/"));
    assert!(std::fs::read(file).unwrap().starts_with(b"%PDF-1.4"));

    let (_, _, detail) = send_json(test_app(state.clone()), get_request(&format!("/api/facturas/{id}"))).await;
    assert_eq!(detail["factura"]["pdf_url"], pdf_url);

    let req = Request::builder()
        .method("POST")
        .uri("/api/facturas/999/pdf")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send_json(test_app(state), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    std::fs::remove_dir_all(&pdf_dir).unwrap();
}

#[tokio::test]
async fn test_invoice_csv_export() {
    let state = test_state();
    let pdf_dir = state.config.pdf_dir.clone();
    let id = store_invoice(&state, "Doña Rosa").await;

    let (status, headers, body) = send(test_app(state), get_request(&format!("/api/facturas/{id}/csv"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with(&format!("attachment; filename=\"Factura_{id}_")));

    let text = String::from_utf8(body).unwrap();
    let rows: Vec<&str> = text.trim_start_matches('\u{feff}').lines().collect();
    assert_eq!(rows[0], "UPC,PRODUCT,PRICE,QTY,TOTAL");
    assert_eq!(rows[1], "7501055300075,Coca-Cola 600ml,$18.50,2,$37.00");
    assert_eq!(rows[2], ",Tamal,$15.00,3,$45.00");
    assert_eq!(&rows[3..], [",,,SUBTOTAL:,$82.00", ",,,CRÉDITO:,-$2.00", ",,,TOTAL:,$80.00"]);
    std::fs::remove_dir_all(&pdf_dir).unwrap();
}

#[tokio::test]
async fn test_invoice_endpoints_require_session_when_configured() {
    let mut config = test_config();
    config.auth_required = true;
    let state = build_state(config, MockGateway::default());

    let (status, _, _) = send_json(test_app(state.clone()), get_request("/api/facturas")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cookie = register_user(&state, "cajero").await;
    let req = Request::builder()
        .uri("/api/facturas")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send_json(test_app(state), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["facturas"].as_array().unwrap().is_empty());
}

fn csv_request(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/productos/importar")
        .header(header::CONTENT_TYPE, "text/csv");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_import_products_csv() {
    let state = test_state();
    seed_products(&state);
    let sheet = "UPC,QTY,PRODUCT,PRICE,TOTAL\n\
        7501055300075,10,Coca-Cola 600ml,$19.00,$190.00\n\
        ,5,Pan dulce,$8.50,$42.50\n";

    let (status, _, _) = send_json(test_app(state.clone()), csv_request(None, sheet)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = admin_token(&state).await;
    let (status, _, body) = send_json(test_app(state.clone()), csv_request(Some(&token), sheet)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["productos_procesados"], 2);
    assert_eq!(body["mensaje"], "Se importaron 2 productos exitosamente");

    let (_, _, body) = send_json(test_app(state.clone()), get_request("/buscar.php?upc=7501055300075")).await;
    assert_eq!(body["producto"]["precio"], "19.00");
    let (status, _, body) = send_json(test_app(state.clone()), get_request("/buscar.php?upc=PANDULCE001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["producto"]["nombre"], "Pan dulce");

    let (status, _, body) = send_json(
        test_app(state),
        csv_request(Some(&token), "UPC,PRODUCT\n1,Sal\n"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Columna 'PRICE' no encontrada en el CSV");
}

// ── Accounts ──

#[tokio::test]
async fn test_register_login_logout() {
    let state = test_state();
    let cookie = register_user(&state, "ana").await;
    assert!(cookie.starts_with("aura_sid="));

    let req = Request::builder()
        .uri("/auth/status")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = send_json(test_app(state.clone()), req).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["username"], "ana");

    let (status, headers, body) = send_json(
        test_app(state.clone()),
        json_request("POST", "/login", serde_json::json!({"username": "ana", "password": "secreto1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Inicio de sesión exitoso");
    let login_cookie = session_cookie(&headers);

    let req = Request::builder()
        .method("POST")
        .uri("/logout")
        .header(header::COOKIE, &login_cookie)
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send_json(test_app(state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));

    let req = Request::builder()
        .uri("/auth/status")
        .header(header::COOKIE, &login_cookie)
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = send_json(test_app(state), req).await;
    assert_eq!(body["authenticated"], false);
    assert!(body.get("username").is_none());
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let state = test_state();
    register_user(&state, "ana").await;

    let (status, _, body) = send_json(
        test_app(state.clone()),
        json_request(
            "POST",
            "/register",
            serde_json::json!({"username": "ana", "email": "otra@aura.mx", "password": "secreto1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "El usuario o email ya existe");
    assert_eq!(body["message"], "El usuario o email ya existe");

    let (status, _, body) = send_json(
        test_app(state),
        json_request(
            "POST",
            "/register",
            serde_json::json!({"username": "beto", "email": "beto@aura.mx", "password": "123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "La contraseña debe tener al menos 6 caracteres");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let state = test_state();
    register_user(&state, "ana").await;

    let (status, _, body) = send_json(
        test_app(state),
        json_request("POST", "/login", serde_json::json!({"username": "ana", "password": "otra-clave"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Usuario o contraseña incorrectos");
    assert_eq!(body["message"], "Usuario o contraseña incorrectos");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_auth_rate_limit() {
    let state = test_state();
    let attempt = || {
        let mut req = json_request("POST", "/login", serde_json::json!({"username": "x", "password": "y"}));
        req.headers_mut().insert("x-forwarded-for", "198.51.100.7".parse().unwrap());
        req
    };

    for _ in 0..5 {
        let (status, _, _) = send_json(test_app(state.clone()), attempt()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _, body) = send_json(test_app(state), attempt()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["error"],
        "Demasiados intentos de autenticación, por favor intente más tarde."
    );
}

fn login_from(forwarded_for: &str) -> Request<Body> {
    let mut req = json_request("POST", "/login", serde_json::json!({"username": "x", "password": "y"}));
    req.headers_mut().insert("x-forwarded-for", forwarded_for.parse().unwrap());
    req.headers_mut().insert("x-real-ip", forwarded_for.parse().unwrap());
    req
}

#[tokio::test]
async fn test_rotating_forwarded_headers_still_limited() {
    let state = test_state();
    for i in 0..5 {
        let (status, _, _) = send_json(test_app(state.clone()), login_from(&format!("10.0.0.{i}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _, body) = send_json(test_app(state), login_from("10.0.0.99")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_trusted_proxy_limits_per_forwarded_client() {
    let mut config = test_config();
    config.trust_proxy = true;
    let state = build_state(config, MockGateway::default());

    for i in 0..8 {
        let (status, _, _) = send_json(test_app(state.clone()), login_from(&format!("10.0.0.{i}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    for _ in 0..5 {
        send_json(test_app(state.clone()), login_from("10.0.0.50")).await;
    }
    let (status, _, _) = send_json(test_app(state), login_from("10.0.0.50")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_subscriptions_require_session() {
    let state = test_state();
    let (status, _, body) = send_json(test_app(state.clone()), get_request("/subscriptions")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Debe iniciar sesión primero");

    let cookie = register_user(&state, "ana").await;
    let mut req = json_request("POST", "/subscription", serde_json::json!({"preapproval_id": "pre-1"}));
    req.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
    let (status, _, body) = send_json(test_app(state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let req = Request::builder()
        .uri("/subscriptions")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = send_json(test_app(state), req).await;
    let subs = body["subscriptions"].as_array().unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0]["status"], "pending");
    assert_eq!(subs[0]["preapproval_id"], "pre-1");
}

// ── Admin ──

async fn admin_token(state: &Arc<AppState>) -> String {
    let (status, _, body) = send_json(
        test_app(state.clone()),
        json_request(
            "POST",
            "/api/admin-login",
            serde_json::json!({"email": "admin@aura.MX", "password": "clave-admin"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "Admin@Aura.mx");
    body["customToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_admin_login_issues_verifiable_token() {
    let state = test_state();
    let token = admin_token(&state).await;
    let claims = test_issuer().verify(&token).unwrap();
    assert_eq!(claims.uid, "Admin@Aura.mx");
}

#[tokio::test]
async fn test_admin_login_rejections() {
    let state = test_state();
    let (status, _, _) = send_json(
        test_app(state.clone()),
        json_request("POST", "/api/admin-login", serde_json::json!({"email": "admin@aura.mx"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send_json(
        test_app(state),
        json_request(
            "POST",
            "/api/admin-login",
            serde_json::json!({"email": "admin@aura.mx", "password": "nope"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["error"],
        "Credenciales incorrectas. Por favor, verifica tu email y contraseña."
    );
}

#[tokio::test]
async fn test_admin_login_not_configured() {
    let mut config = test_config();
    config.admin_password_hash = String::new();
    let state = build_state(config, MockGateway::default());

    let (status, _, body) = send_json(
        test_app(state),
        json_request(
            "POST",
            "/api/admin-login",
            serde_json::json!({"email": "admin@aura.mx", "password": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error de configuración del servidor");
}

#[tokio::test]
async fn test_admin_listings_require_token() {
    let state = test_state();
    register_user(&state, "ana").await;

    let (status, _, _) = send_json(test_app(state.clone()), get_request("/admin/users")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/admin/users")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send_json(test_app(state.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = admin_token(&state).await;
    for (uri, key) in [
        ("/admin/users", "users"),
        ("/admin/subscriptions", "subscriptions"),
        ("/admin/payments", "notifications"),
    ] {
        let req = Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send_json(test_app(state.clone()), req).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body[key].is_array(), "{uri}");
    }

    let req = Request::builder()
        .uri("/admin/users")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = send_json(test_app(state), req).await;
    assert_eq!(body["users"][0]["username"], "ana");
    assert!(body["users"][0].get("password").is_none());
}
