use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context};
use rand::{distributions::Alphanumeric, Rng};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
    /// Origin used when building absolute short links.
    pub public_url: String,
    pub jwt_secret: String,
    pub media_root: PathBuf,
    pub media_url: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: try_load("FOODGRAM_DATABASE_URL", "sqlite://foodgram.db?mode=rwc")?,
            bind_address: try_load("FOODGRAM_BIND_ADDRESS", "0.0.0.0:8000")?,
            public_url: try_load::<String>("FOODGRAM_PUBLIC_URL", "http://localhost:8000")?
                .trim_end_matches('/')
                .to_owned(),
            jwt_secret: jwt_secret(),
            media_root: try_load("FOODGRAM_MEDIA_ROOT", "media")?,
            media_url: try_load("FOODGRAM_MEDIA_URL", "/media/")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        log::info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    value
        .parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {value}"))
}

fn jwt_secret() -> String {
    match env::var("FOODGRAM_JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => secret,
        _ => {
            log::warn!("FOODGRAM_JWT_SECRET not set, sessions will not survive a restart");
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect()
        }
    }
}
