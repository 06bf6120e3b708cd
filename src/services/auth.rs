use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderMap;

pub const MAX_AUTH_ATTEMPTS: i64 = 5;
pub const MIN_PASSWORD_LENGTH: usize = 6;

// ── Passwords ──

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// `configured` may be an argon2 PHC string or, for older deployments,
/// the plain password itself.
pub fn verify_admin_password(password: &str, configured: &str) -> bool {
    if configured.starts_with("$argon2") {
        return verify_password(password, configured);
    }
    constant_time_eq(password.as_bytes(), configured.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Registration ──

/// Returns the message shown to the user when a field is rejected.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), &'static str> {
    if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err("Todos los campos son requeridos");
    }
    if !is_valid_email(email.trim()) {
        return Err("Email inválido");
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("La contraseña debe tener al menos 6 caracteres");
    }
    Ok(())
}

/// `local@domain.tld` with an alphabetic TLD of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}

// ── Rate Limiting ──

/// Key used to rate-limit authentication attempts: the socket address, or
/// the first proxy-reported address when `trust_proxy` is set.
pub fn client_key(headers: &HeaderMap, peer: Option<std::net::SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
            .map(str::to_string)
    };

    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
