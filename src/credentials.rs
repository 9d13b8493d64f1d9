//! Credential Source (component H, ambient): one-shot HTTP fetch of the
//! opaque session strings the client pool logs in with.
//!
//! Grounded in `graze_api.py`: a single authenticated GET against a
//! credentials endpoint, returning a JSON array of `{ session_string }`
//! objects. Called exactly once at startup, before the client pool is built
//! (spec §6/§7.8).

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self) -> AppResult<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SessionCredential {
    session_string: String,
}

/// HTTP credential source bound to one base URL and pre-shared secret.
pub struct HttpCredentialSource {
    http: reqwest::Client,
    base_url: String,
    secret: String,
}

impl HttpCredentialSource {
    pub fn new(http: reqwest::Client, base_url: String, secret: String) -> Self {
        Self {
            http,
            base_url,
            secret,
        }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn fetch(&self) -> AppResult<Vec<String>> {
        let url = format!(
            "{}/app/api/v1/turbo-tokens/credentials",
            self.base_url.trim_end_matches('/')
        );
        let resp = self
            .http
            .get(&url)
            .query(&[("credential_secret", &self.secret)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AppError::Api {
                service: "credentials.fetch".into(),
                status: resp.status(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let credentials: Vec<SessionCredential> = resp.json().await?;
        Ok(credentials.into_iter().map(|c| c.session_string).collect())
    }
}
