//! Cookie sessions backed by the studio database.
//!
//! `tower-sessions` owns the cookie (`aura_sid`) and the session lifecycle;
//! [`SqliteSessionStore`] persists each record as JSON in the `sessions`
//! table.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::Connection;
use tower_sessions::cookie::time::{Duration, OffsetDateTime};
use tower_sessions::cookie::SameSite;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::{Expiry, Session, SessionManagerLayer};

use crate::db::queries;
use crate::models::CurrentUser;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "aura_sid";

pub const SESSION_TTL_HOURS: i64 = 24;

const CURRENT_USER: &str = "current_user";

#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> session_store::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| session_store::Error::Backend("session database lock poisoned".to_string()))
    }

    /// Drops every record that expired before now.
    pub fn delete_expired(&self) -> session_store::Result<usize> {
        let conn = self.lock()?;
        queries::delete_expired_sessions(&conn, OffsetDateTime::now_utc().unix_timestamp())
            .map_err(backend)
    }
}

fn backend(e: anyhow::Error) -> session_store::Error {
    session_store::Error::Backend(format!("{e:#}"))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data = serde_json::to_string(&record.data)
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;

        let conn = self.lock()?;
        queries::save_session(
            &conn,
            &record.id.to_string(),
            &data,
            record.expiry_date.unix_timestamp(),
        )
        .map_err(backend)
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let stored = {
            let conn = self.lock()?;
            queries::load_session(
                &conn,
                &session_id.to_string(),
                OffsetDateTime::now_utc().unix_timestamp(),
            )
            .map_err(backend)?
        };
        let Some(stored) = stored else {
            return Ok(None);
        };

        let data = serde_json::from_str(&stored.data)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;
        let expiry_date = OffsetDateTime::from_unix_timestamp(stored.expiry_date)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;

        Ok(Some(Record {
            id: *session_id,
            data,
            expiry_date,
        }))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let conn = self.lock()?;
        queries::delete_session(&conn, &session_id.to_string()).map_err(backend)?;
        Ok(())
    }
}

/// HttpOnly, SameSite=Strict cookie that lives 24 hours past the last
/// request. `secure` adds the `Secure` attribute.
pub fn session_layer(store: SqliteSessionStore, secure: bool) -> SessionManagerLayer<SqliteSessionStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_expiry(Expiry::OnInactivity(Duration::hours(SESSION_TTL_HOURS)))
        .with_secure(secure)
        .with_same_site(SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

pub async fn current_user(session: &Session) -> Result<Option<CurrentUser>, tower_sessions::session::Error> {
    session.get(CURRENT_USER).await
}

/// Rotates the session id and stores the signed-in account.
pub async fn sign_in(session: &Session, user: &CurrentUser) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(CURRENT_USER, user).await
}

/// Deletes the record; the layer answers with a removal cookie.
pub async fn sign_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
