//! Server-side sessions stored in the `session` table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::db::StoreError;
use crate::users::{Role, User};

/// Identity captured at login. The role is not re-read from `users` until the next login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists `data` under a fresh id valid until `expire`.
    async fn create(&self, data: &SessionData, expire: OffsetDateTime) -> Result<String, StoreError>;

    /// `None` when the id is unknown or `now >= expire`.
    async fn read(&self, sid: &str, now: OffsetDateTime) -> Result<Option<SessionData>, StoreError>;

    /// Idempotent.
    async fn destroy(&self, sid: &str) -> Result<(), StoreError>;

    /// Deletes rows with `expire <= now`; returns how many went.
    async fn sweep_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
}

pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[instrument(skip(self, data), fields(user_id = data.user_id))]
    async fn create(&self, data: &SessionData, expire: OffsetDateTime) -> Result<String, StoreError> {
        let started = Instant::now();
        let sid = new_session_id();
        sqlx::query("INSERT INTO session (sid, sess, expire) VALUES ($1, $2, $3)")
            .bind(&sid)
            .bind(Json(data))
            .bind(expire)
            .execute(&self.db)
            .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "session created");
        Ok(sid)
    }

    async fn read(&self, sid: &str, now: OffsetDateTime) -> Result<Option<SessionData>, StoreError> {
        let started = Instant::now();
        let row = sqlx::query_scalar::<_, Json<SessionData>>(
            "SELECT sess FROM session WHERE sid = $1 AND expire > $2",
        )
        .bind(sid)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, found = row.is_some(), "session read");
        Ok(row.map(|Json(data)| data))
    }

    async fn destroy(&self, sid: &str) -> Result<(), StoreError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM session WHERE sid = $1")
            .bind(sid)
            .execute(&self.db)
            .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, rows = result.rows_affected(), "session destroyed");
        Ok(())
    }

    async fn sweep_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM session WHERE expire <= $1")
            .bind(now)
            .execute(&self.db)
            .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, rows = result.rows_affected(), "expired sessions deleted");
        Ok(result.rows_affected())
    }
}

/// Periodically deletes expired sessions. Runs until the handle is aborted.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match store.sweep_expired(OffsetDateTime::now_utc()).await {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "expired sessions swept"),
                Err(e) => error!(error = %e, "session sweep failed"),
            }
        }
    })
}
