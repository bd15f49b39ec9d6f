use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use tracing::debug;

use crate::config::AppConfig;

/// Failure of the relational store, as seen by callers.
///
/// "Not found" is not an error: lookups return `Ok(None)` or an empty list.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("constraint violation ({constraint}): {message}")]
    ConstraintViolation { constraint: String, message: String },
}

impl StoreError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::ConstraintViolation { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // unique, foreign key, check, not null
            if matches!(
                db_err.code().as_deref(),
                Some("23505" | "23503" | "23514" | "23502")
            ) {
                return StoreError::ConstraintViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    message: db_err.message().to_string(),
                };
            }
        }
        StoreError::Unavailable(e)
    }
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}

/// Result of the connectivity diagnostic.
#[derive(Debug, Clone)]
pub struct ProbeInfo {
    pub now: OffsetDateTime,
    pub version: String,
}

#[async_trait]
pub trait DbProbe: Send + Sync {
    async fn probe(&self) -> Result<ProbeInfo, StoreError>;
}

pub struct PgProbe {
    db: PgPool,
}

impl PgProbe {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DbProbe for PgProbe {
    async fn probe(&self) -> Result<ProbeInfo, StoreError> {
        let started = std::time::Instant::now();
        let (now, version) =
            sqlx::query_as::<_, (OffsetDateTime, String)>("SELECT now(), version()")
                .fetch_one(&self.db)
                .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "probe query");
        Ok(ProbeInfo { now, version })
    }
}
