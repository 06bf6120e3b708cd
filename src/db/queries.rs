use chrono::{Timelike, Utc};
use rusqlite::{params, Connection, ErrorCode};

use crate::models::{Subscription, User};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// ── Users ──

/// Inserts a user. Returns `None` when the username or email is taken.
pub fn create_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> anyhow::Result<Option<i64>> {
    let result = conn.execute(
        "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
        params![username, email, password_hash],
    );

    match result {
        Ok(_) => Ok(Some(conn.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct Credentials {
    pub user_id: i64,
    pub username: String,
    pub password_hash: String,
}

pub fn get_credentials(conn: &Connection, username: &str) -> anyhow::Result<Option<Credentials>> {
    let result = conn.query_row(
        "SELECT id, username, password FROM users WHERE username = ?1",
        params![username],
        |row| {
            Ok(Credentials {
                user_id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
            })
        },
    );

    match result {
        Ok(c) => Ok(Some(c)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, created_at FROM users ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;

    let mut users = vec![];
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

// ── Sessions ──

/// A serialized session record; `expiry_date` is a unix timestamp.
pub struct StoredSession {
    pub data: String,
    pub expiry_date: i64,
}

pub fn save_session(conn: &Connection, id: &str, data: &str, expiry_date: i64) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, data, expiry_date) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET data = excluded.data, expiry_date = excluded.expiry_date",
        params![id, data, expiry_date],
    )?;
    Ok(())
}

/// Returns the session only while it expires after `now`.
pub fn load_session(conn: &Connection, id: &str, now: i64) -> anyhow::Result<Option<StoredSession>> {
    let result = conn.query_row(
        "SELECT data, expiry_date FROM sessions WHERE id = ?1 AND expiry_date > ?2",
        params![id, now],
        |row| {
            Ok(StoredSession {
                data: row.get(0)?,
                expiry_date: row.get(1)?,
            })
        },
    );

    match result {
        Ok(session) => Ok(Some(session)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn delete_session(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn delete_expired_sessions(conn: &Connection, now: i64) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expiry_date <= ?1",
        params![now],
    )?;
    Ok(count)
}

// ── Subscriptions ──

pub fn create_subscription(
    conn: &Connection,
    user_id: i64,
    preapproval_id: Option<&str>,
    status: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO subscriptions (user_id, preapproval_id, status) VALUES (?1, ?2, ?3)",
        params![user_id, preapproval_id, status],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_subscriptions_for_user(conn: &Connection, user_id: i64) -> anyhow::Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, preapproval_id, status, created_at FROM subscriptions
         WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(Subscription {
            id: row.get(0)?,
            user_id: row.get(1)?,
            preapproval_id: row.get(2)?,
            status: row.get(3)?,
            created_at: row.get(4)?,
            username: None,
            email: None,
        })
    })?;

    let mut subs = vec![];
    for row in rows {
        subs.push(row?);
    }
    Ok(subs)
}

pub fn get_all_subscriptions(conn: &Connection) -> anyhow::Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.user_id, s.preapproval_id, s.status, s.created_at, u.username, u.email
         FROM subscriptions s
         JOIN users u ON s.user_id = u.id
         ORDER BY s.created_at DESC, s.id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Subscription {
            id: row.get(0)?,
            user_id: row.get(1)?,
            preapproval_id: row.get(2)?,
            status: row.get(3)?,
            created_at: row.get(4)?,
            username: row.get(5)?,
            email: row.get(6)?,
        })
    })?;

    let mut subs = vec![];
    for row in rows {
        subs.push(row?);
    }
    Ok(subs)
}

/// Applies a gateway status to every subscription with this preapproval id.
pub fn update_subscription_status(
    conn: &Connection,
    preapproval_id: &str,
    status: &str,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE subscriptions SET status = ?1 WHERE preapproval_id = ?2",
        params![status, preapproval_id],
    )?;
    Ok(count)
}

// ── Auth Rate Limits ──

pub const AUTH_WINDOW_MINUTES: u32 = 15;

fn current_auth_window() -> String {
    let now = Utc::now().naive_utc();
    let minute = now.minute() - now.minute() % AUTH_WINDOW_MINUTES;
    format!("{}:{minute:02}:00", now.format("%Y-%m-%d %H"))
}

/// Counts an attempt for `client` in the current window and returns the
/// number of attempts so far, this one included.
pub fn record_auth_attempt(conn: &Connection, client: &str) -> anyhow::Result<i64> {
    let window = current_auth_window();

    conn.execute(
        "INSERT INTO auth_attempts (client, window_start, attempt_count)
         VALUES (?1, ?2, 1)
         ON CONFLICT(client, window_start) DO UPDATE SET attempt_count = attempt_count + 1",
        params![client, window],
    )?;

    let count: i64 = conn.query_row(
        "SELECT attempt_count FROM auth_attempts WHERE client = ?1 AND window_start = ?2",
        params![client, window],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn cleanup_auth_windows(conn: &Connection) -> anyhow::Result<()> {
    let cutoff = (Utc::now() - chrono::Duration::hours(1))
        .format(TIMESTAMP_FORMAT)
        .to_string();
    conn.execute(
        "DELETE FROM auth_attempts WHERE window_start < ?1",
        params![cutoff],
    )?;
    Ok(())
}

// ── Payment Notifications ──

pub fn insert_payment_notification(
    conn: &Connection,
    topic: &str,
    resource_id: Option<&str>,
    status: Option<&str>,
    raw: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO payment_notifications (topic, resource_id, status, raw) VALUES (?1, ?2, ?3, ?4)",
        params![topic, resource_id, status, raw],
    )?;
    Ok(conn.last_insert_rowid())
}

pub struct PaymentNotification {
    pub id: i64,
    pub topic: String,
    pub resource_id: Option<String>,
    pub status: Option<String>,
}

pub fn get_payment_notifications(conn: &Connection, limit: i64) -> anyhow::Result<Vec<PaymentNotification>> {
    let mut stmt = conn.prepare(
        "SELECT id, topic, resource_id, status FROM payment_notifications ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(PaymentNotification {
            id: row.get(0)?,
            topic: row.get(1)?,
            resource_id: row.get(2)?,
            status: row.get(3)?,
        })
    })?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}
