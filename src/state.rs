use std::sync::Arc;

use sqlx::{Pool, Sqlite};

use crate::{config::Config, error::Error, jwt::SessionKey, media::MediaStore};

/// Everything a request handler may touch.
#[derive(Clone)]
pub struct State {
    pub pool: Pool<Sqlite>,
    pub config: Arc<Config>,
    pub media: MediaStore,
    pub session_key: SessionKey,
}

impl State {
    pub fn new(pool: Pool<Sqlite>, config: Config) -> Result<Self, Error> {
        let session_key = SessionKey::new(config.jwt_secret.as_bytes())?;
        let media = MediaStore::new(config.media_root.clone(), &config.media_url);

        Ok(Self {
            pool,
            config: Arc::new(config),
            media,
            session_key,
        })
    }

    /// Absolute URL of a stored media reference.
    pub fn media_url(&self, reference: &str) -> String {
        let url = self.media.url(reference);
        if url.starts_with("http://") || url.starts_with("https://") {
            return url;
        }
        format!("{}{url}", self.config.public_url)
    }

    pub fn short_link_url(&self, link: &str) -> String {
        format!("{}/s/{link}", self.config.public_url)
    }
}
