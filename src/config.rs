use std::{net::SocketAddr, num::NonZeroU32, time::Duration};

use anyhow::{Context, bail};

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub auth_token: String,
    pub database_url: String,
    pub db_max_conns: u32,
    pub db_min_conns: u32,
    pub db_connect_timeout: Duration,
    pub db_idle_timeout: Duration,
    pub db_max_lifetime: Duration,
    pub boxoffice_url: String,
    pub boxoffice_api_key: String,
    pub boxoffice_timeout: Duration,
    pub boxoffice_rps: NonZeroU32,
    pub health_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        fn parsed<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
        where
            T: std::str::FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            match value {
                Some(raw) => raw.parse().with_context(|| format!("{key}={raw}")),
                None => Ok(default),
            }
        }

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parsed(get("PORT"), "PORT", 8080)?;

        let auth_token = required("AUTH_TOKEN")?;
        let database_url =
            get("DATABASE_URL").unwrap_or_else(|| "sqlite://movies.db?mode=rwc".to_string());

        let db_max_conns: u32 = parsed(get("DB_MAX_CONNS"), "DB_MAX_CONNS", 10)?;
        let db_min_conns: u32 = parsed(get("DB_MIN_CONNS"), "DB_MIN_CONNS", 1)?;
        if db_max_conns == 0 {
            bail!("DB_MAX_CONNS must be positive");
        }
        if db_min_conns > db_max_conns {
            bail!("DB_MIN_CONNS ({db_min_conns}) exceeds DB_MAX_CONNS ({db_max_conns})");
        }
        let db_connect_timeout = secs(parsed(get("DB_CONN_TIMEOUT_SECS"), "DB_CONN_TIMEOUT_SECS", 10)?);
        let db_idle_timeout =
            secs(parsed(get("DB_MAX_CONN_IDLE_SECS"), "DB_MAX_CONN_IDLE_SECS", 300)?);
        let db_max_lifetime =
            secs(parsed(get("DB_MAX_CONN_LIFETIME_SECS"), "DB_MAX_CONN_LIFETIME_SECS", 3600)?);

        let boxoffice_url = required("BOXOFFICE_URL")?.trim_end_matches('/').to_string();
        let boxoffice_api_key = required("BOXOFFICE_API_KEY")?;
        let boxoffice_timeout_secs: u64 =
            parsed(get("BOXOFFICE_TIMEOUT_SECS"), "BOXOFFICE_TIMEOUT_SECS", 5)?;
        if boxoffice_timeout_secs == 0 {
            bail!("BOXOFFICE_TIMEOUT_SECS must be positive");
        }
        // NonZeroU32 parsing rejects 0 as well as negatives
        let default_rps = NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN);
        let boxoffice_rps: NonZeroU32 = parsed(get("BOXOFFICE_RPS"), "BOXOFFICE_RPS", default_rps)?;

        let health_timeout_secs: u64 =
            parsed(get("HEALTH_TIMEOUT_SECS"), "HEALTH_TIMEOUT_SECS", 2)?;
        if health_timeout_secs == 0 {
            bail!("HEALTH_TIMEOUT_SECS must be positive");
        }

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            auth_token,
            database_url,
            db_max_conns,
            db_min_conns,
            db_connect_timeout,
            db_idle_timeout,
            db_max_lifetime,
            boxoffice_url,
            boxoffice_api_key,
            boxoffice_timeout: secs(boxoffice_timeout_secs),
            boxoffice_rps,
            health_timeout: secs(health_timeout_secs),
        })
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
