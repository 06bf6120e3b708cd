pub mod mercadopago;

use async_trait::async_trait;

use crate::models::payment::{BackUrls, Payer, PayerPhone, PreferenceItem};
use crate::models::{CreatedPreference, PaymentInfo, Preference, PreferenceRequest};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(&self, preference: &Preference) -> anyhow::Result<CreatedPreference>;
    async fn get_payment(&self, payment_id: &str) -> anyhow::Result<PaymentInfo>;
}

/// Builds a single-item MXN checkout for a class purchase.
///
/// `base_url` is where the buyer returns after paying and `host` is the
/// public host of this server, used for the notification callback.
pub fn build_preference(req: &PreferenceRequest, base_url: &str, host: &str) -> Result<Preference, String> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err("El título es requerido".to_string());
    }

    let price = parse_price(&req.price).ok_or_else(|| "Precio inválido".to_string())?;

    let phone = req.payer_phone.trim();
    let base_url = base_url.trim_end_matches('/');

    Ok(Preference {
        items: vec![PreferenceItem {
            title: title.to_string(),
            unit_price: price,
            quantity: 1,
            currency_id: "MXN".to_string(),
        }],
        payer: Payer {
            name: req.payer_name.trim().to_string(),
            phone: PayerPhone {
                number: phone.to_string(),
                area_code: "52".to_string(),
            },
            email: format!("{phone}@temp.aura.com"),
        },
        back_urls: BackUrls {
            success: format!("{base_url}/?success=1"),
            failure: format!("{base_url}/?error=1"),
            pending: format!("{base_url}/?pending=1"),
        },
        auto_return: "approved".to_string(),
        notification_url: format!("https://{host}/api/webhook"),
    })
}

/// Accepts a JSON number or a numeric string. Zero, negative and
/// non-finite prices are rejected.
fn parse_price(value: &serde_json::Value) -> Option<f64> {
    let price = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (price.is_finite() && price > 0.0).then_some(price)
}
