use anyhow::Context;
use serde::Deserialize;

/// Longest session lifetime accepted from the environment (one year).
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
    pub sweep_secs: u64,
    pub cookie_secure: bool,
}

impl SessionConfig {
    /// Rejects a zero sweep interval and a TTL outside `1..=MAX_SESSION_TTL_HOURS`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.ttl_hours) {
            anyhow::bail!(
                "SESSION_TTL_HOURS must be between 1 and {MAX_SESSION_TTL_HOURS}, got {}",
                self.ttl_hours
            );
        }
        if self.sweep_secs == 0 {
            anyhow::bail!("SESSION_SWEEP_SECS must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    pub admin_email: String,
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        // Required, there is no fallback secret.
        let secret = std::env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .context("SESSION_SECRET is not set")?;

        let session = SessionConfig {
            secret,
            ttl_hours: parse_var("SESSION_TTL_HOURS", 24)?,
            sweep_secs: parse_var("SESSION_SWEEP_SECS", 15 * 60)?,
            cookie_secure: parse_var("COOKIE_SECURE", false)?,
        };
        session.validate().context("invalid session settings")?;
        let bootstrap = BootstrapConfig {
            admin_email: std::env::var("BOOTSTRAP_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@example.com".into()),
            admin_password: std::env::var("BOOTSTRAP_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".into()),
        };

        Ok(Self {
            database_url,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 3000)?,
            session,
            bootstrap,
        })
    }

    /// Host part of the database URL, safe to log.
    pub fn database_host(&self) -> &str {
        let rest = self
            .database_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.database_url);
        let rest = rest.rsplit_once('@').map(|(_, host)| host).unwrap_or(rest);
        rest.split(['/', '?']).next().unwrap_or(rest)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value")),
        _ => Ok(default),
    }
}
