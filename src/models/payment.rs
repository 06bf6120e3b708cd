use serde::{Deserialize, Serialize};

/// Body of `POST /api/create-preference`.
#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: serde_json::Value,
    #[serde(default)]
    pub payer_name: String,
    #[serde(default)]
    pub payer_phone: String,
}

/// Checkout item in MXN. Each preference sells a single unit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreferenceItem {
    pub title: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub currency_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PayerPhone {
    pub number: String,
    pub area_code: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Payer {
    pub name: String,
    pub phone: PayerPhone,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Preference {
    pub items: Vec<PreferenceItem>,
    pub payer: Payer,
    pub back_urls: BackUrls,
    pub auto_return: String,
    pub notification_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPreference {
    pub id: Option<String>,
    pub init_point: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInfo {
    pub id: serde_json::Value,
    pub status: Option<String>,
    pub status_detail: Option<String>,
    pub transaction_amount: Option<f64>,
}

/// Loose view of a gateway notification. Unknown shapes still parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookNotification {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl WebhookNotification {
    pub fn topic(&self) -> &str {
        self.kind
            .as_deref()
            .or(self.topic.as_deref())
            .unwrap_or("unknown")
    }

    /// Resource id as a string; the gateway sends it as either number or string.
    pub fn resource_id(&self) -> Option<String> {
        match self.data.as_ref()?.id.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
