//! Concrete remote social API client (the "Remote social API" external
//! interface from spec §6), grounded in `bluesky_api.py`: session-string
//! auth, chunked bulk fetch in pages of `CHUNK_SIZE`, chunks fanned out
//! concurrently and merged.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{AppError, AppResult};
use crate::model::{Post, Profile};

pub const CHUNK_SIZE: usize = 25;

#[async_trait]
pub trait SocialClient: Send + Sync {
    async fn get_profiles(&self, dids: &[String]) -> AppResult<HashMap<String, Profile>>;
    async fn get_posts(&self, uris: &[String]) -> AppResult<HashMap<String, Post>>;
}

/// Thin client bound to one PDS/AppView host, authenticated with one opaque
/// session string. Mirrors `BlueskyAPI` in the original implementation: it
/// owns nothing but an HTTP client, a base URL, and the session token.
#[derive(Debug, Clone)]
pub struct BlueskyClient {
    http: reqwest::Client,
    base_url: String,
    session: String,
}

impl BlueskyClient {
    pub fn new(http: reqwest::Client, base_url: String, session: String) -> Self {
        Self {
            http,
            base_url,
            session,
        }
    }

    /// Validate the session against the host by requesting the current
    /// session (mirrors the original's `client.login(session_string=ss)`
    /// followed by a liveness probe). Returns an error if login fails —
    /// the caller (client pool) discards the session string and logs it.
    pub async fn login(&self) -> AppResult<()> {
        let url = format!("{}/xrpc/com.atproto.server.getSession", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.session)
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(AppError::Api {
                service: "bluesky.getSession".into(),
                status: resp.status(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Split `items` into chunks of at most `CHUNK_SIZE`, call `fetcher` on
    /// each chunk concurrently, and merge the resulting maps. An empty input
    /// short-circuits to an empty map without making any request.
    async fn chunked_map<F, Fut>(&self, items: &[String], fetcher: F) -> AppResult<HashMap<String, serde_json::Value>>
    where
        F: Fn(Vec<String>) -> Fut,
        Fut: Future<Output = AppResult<HashMap<String, serde_json::Value>>>,
    {
        if items.is_empty() {
            return Ok(HashMap::new());
        }
        let futures = items
            .chunks(CHUNK_SIZE)
            .map(|chunk| fetcher(chunk.to_vec()));
        let chunks = futures_util::future::try_join_all(futures).await?;
        let mut merged = HashMap::new();
        for chunk in chunks {
            merged.extend(chunk);
        }
        Ok(merged)
    }

    async fn fetch_profiles_chunk(&self, dids: Vec<String>) -> AppResult<HashMap<String, serde_json::Value>> {
        let url = format!("{}/xrpc/app.bsky.actor.getProfiles", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.session)
            .query(&dids.iter().map(|d| ("actors", d.as_str())).collect::<Vec<_>>())
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(AppError::Api {
                service: "bluesky.getProfiles".into(),
                status: resp.status(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let body: serde_json::Value = resp.json().await?;
        let profiles = body.get("profiles").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        let mut out = HashMap::new();
        for profile in profiles {
            if let Some(did) = profile.get("did").and_then(|v| v.as_str()) {
                out.insert(did.to_string(), profile);
            }
        }
        Ok(out)
    }

    async fn fetch_posts_chunk(&self, uris: Vec<String>) -> AppResult<HashMap<String, serde_json::Value>> {
        let url = format!("{}/xrpc/app.bsky.feed.getPosts", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.session)
            .query(&uris.iter().map(|u| ("uris", u.as_str())).collect::<Vec<_>>())
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(AppError::Api {
                service: "bluesky.getPosts".into(),
                status: resp.status(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let body: serde_json::Value = resp.json().await?;
        let posts = body.get("posts").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        let mut out = HashMap::new();
        for post in posts {
            if let Some(uri) = post.get("uri").and_then(|v| v.as_str()) {
                out.insert(uri.to_string(), post);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SocialClient for BlueskyClient {
    async fn get_profiles(&self, dids: &[String]) -> AppResult<HashMap<String, Profile>> {
        self.chunked_map(dids, |chunk| self.fetch_profiles_chunk(chunk)).await
    }

    async fn get_posts(&self, uris: &[String]) -> AppResult<HashMap<String, Post>> {
        self.chunked_map(uris, |chunk| self.fetch_posts_chunk(chunk)).await
    }
}
