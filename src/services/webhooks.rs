use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Splits an `x-signature` header (`ts=1704908010,v1=618c85...`) into its
/// timestamp and hex digest.
fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }
    Some((ts?, v1?))
}

/// Validates a gateway notification signature.
///
/// The signed manifest is `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`
/// and the digest is HMAC-SHA256 keyed with the webhook secret, hex encoded.
pub fn validate_signature(secret: &str, signature_header: &str, request_id: &str, data_id: &str) -> bool {
    let Some((ts, digest)) = parse_signature_header(signature_header) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };

    let manifest = format!(
        "id:{};request-id:{request_id};ts:{ts};",
        data_id.to_lowercase()
    );

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(manifest.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, ts: &str, request_id: &str, data_id: &str) -> String {
    let manifest = format!("id:{data_id};request-id:{request_id};ts:{ts};");
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(manifest.as_bytes());
    format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}
