//! Signed admin tokens.
//!
//! Tokens are compact JWTs (`header.claims.signature`, base64url without
//! padding) signed with HMAC-SHA256. The signing key and issuer come from
//! the service account configured in `FIREBASE_SERVICE_ACCOUNT`.

use anyhow::Context;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminClaims {
    pub iss: String,
    pub sub: String,
    pub uid: String,
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
}

pub trait TokenIssuer: Send + Sync {
    fn issue(&self, uid: &str) -> anyhow::Result<String>;
    /// Returns the claims of a well-signed, unexpired token.
    fn verify(&self, token: &str) -> Option<AdminClaims>;
}

#[derive(Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
}

pub struct Hs256Issuer {
    issuer: String,
    key: Vec<u8>,
}

impl Hs256Issuer {
    pub fn new(issuer: String, key: Vec<u8>) -> Self {
        Self { issuer, key }
    }

    /// Reads `client_email` and `private_key` from a service account JSON.
    pub fn from_service_account(json: &str) -> anyhow::Result<Self> {
        let account: ServiceAccount =
            serde_json::from_str(json).context("invalid service account JSON")?;
        anyhow::ensure!(
            !account.client_email.is_empty() && !account.private_key.is_empty(),
            "service account is missing client_email or private_key"
        );
        Ok(Self::new(account.client_email, account.private_key.into_bytes()))
    }

    fn sign(&self, data: &str) -> anyhow::Result<Vec<u8>> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).context("invalid signing key")?;
        mac.update(data.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn issue_at(&self, uid: &str, now: i64) -> anyhow::Result<String> {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = AdminClaims {
            iss: self.issuer.clone(),
            sub: self.issuer.clone(),
            uid: uid.to_string(),
            admin: true,
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{header}.{claims}");
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&signing_input)?);
        Ok(format!("{signing_input}.{signature}"))
    }

    fn verify_at(&self, token: &str, now: i64) -> Option<AdminClaims> {
        let (signing_input, signature) = token.rsplit_once('.')?;
        let (_, claims) = signing_input.split_once('.')?;

        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).ok()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let claims: AdminClaims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims).ok()?).ok()?;
        (claims.iss == self.issuer && claims.admin && claims.exp > now).then_some(claims)
    }
}

impl TokenIssuer for Hs256Issuer {
    fn issue(&self, uid: &str) -> anyhow::Result<String> {
        self.issue_at(uid, Utc::now().timestamp())
    }

    fn verify(&self, token: &str) -> Option<AdminClaims> {
        self.verify_at(token, Utc::now().timestamp())
    }
}
