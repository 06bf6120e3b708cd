use anyhow::Context;
use async_trait::async_trait;

use super::PaymentGateway;
use crate::models::{CreatedPreference, PaymentInfo, Preference};

const API_BASE: &str = "https://api.mercadopago.com";

pub struct MercadoPagoGateway {
    access_token: String,
    client: reqwest::Client,
}

impl MercadoPagoGateway {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_preference(&self, preference: &Preference) -> anyhow::Result<CreatedPreference> {
        anyhow::ensure!(!self.access_token.is_empty(), "MercadoPago access token is not configured");

        let created = self
            .client
            .post(format!("{API_BASE}/checkout/preferences"))
            .bearer_auth(&self.access_token)
            .json(preference)
            .send()
            .await
            .context("failed to reach MercadoPago")?
            .error_for_status()
            .context("MercadoPago rejected the preference")?
            .json::<CreatedPreference>()
            .await
            .context("failed to parse MercadoPago preference response")?;

        Ok(created)
    }

    async fn get_payment(&self, payment_id: &str) -> anyhow::Result<PaymentInfo> {
        anyhow::ensure!(!self.access_token.is_empty(), "MercadoPago access token is not configured");

        let payment = self
            .client
            .get(format!("{API_BASE}/v1/payments/{payment_id}"))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("failed to reach MercadoPago")?
            .error_for_status()
            .context("MercadoPago payment lookup failed")?
            .json::<PaymentInfo>()
            .await
            .context("failed to parse MercadoPago payment")?;

        Ok(payment)
    }
}
