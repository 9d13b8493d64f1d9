//! Client Pool (component D).
//!
//! Loads up to `CLIENT_BANDWIDTH` authenticated clients from a list of
//! opaque session strings at startup, then serves uniform-random selection
//! per batch. Read-only after startup; a faulty client observed during a
//! batch is never evicted — only that batch fails (spec §4.D/§7.5).

use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::{info, warn};

use crate::client::bluesky_api::{BlueskyClient, SocialClient};
use crate::error::{AppError, AppResult};

pub const CLIENT_BANDWIDTH: usize = 10;
const SESSION_DELIMITER: &str = ":::";

pub struct ClientPool {
    clients: Vec<Arc<dyn SocialClient>>,
}

impl ClientPool {
    /// For each session string: split on `:::`, treat the last field as the
    /// host, construct a client bound to that host, and perform a session
    /// login. Failures are discarded and logged; once `max_clients` have
    /// been loaded, remaining inputs are ignored.
    pub async fn load(session_strings: Vec<String>, max_clients: usize) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(AppError::Reqwest)?;

        let mut clients: Vec<Arc<dyn SocialClient>> = Vec::new();

        for session in session_strings {
            if clients.len() >= max_clients {
                break;
            }
            let Some(host) = session.split(SESSION_DELIMITER).next_back() else {
                continue;
            };
            if host.is_empty() {
                warn!("session string has no host component, skipping");
                continue;
            }
            let base_url = format!("https://{host}");
            let client = BlueskyClient::new(http.clone(), base_url, session.clone());
            match client.login().await {
                Ok(()) => {
                    info!(host, "client login succeeded");
                    clients.push(Arc::new(client));
                }
                Err(e) => {
                    warn!(host, error = %e, "client login failed, discarding session");
                }
            }
        }

        Ok(Self { clients })
    }

    /// Build a pool directly from already-constructed clients, bypassing
    /// session loading. Used by callers (and tests) that already hold live
    /// `SocialClient` handles.
    pub fn from_clients(clients: Vec<Arc<dyn SocialClient>>) -> Self {
        Self { clients }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Uniform-random selection across the pool. Panics only if called on an
    /// empty pool — callers must validate `is_empty()` before the first
    /// batch (spec §7.5: an empty pool at batch time is a fatal programmer
    /// error, not a recoverable one).
    pub fn pick(&self) -> Arc<dyn SocialClient> {
        let mut rng = rand::rng();
        self.clients
            .choose(&mut rng)
            .cloned()
            .expect("ClientPool::pick called on an empty pool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discards_sessions_without_a_host() {
        let pool = ClientPool::load(vec!["no-delimiter-here".to_string()], CLIENT_BANDWIDTH)
            .await
            .unwrap();
        // "no-delimiter-here" splits to itself as the last field, which is
        // non-empty, so this actually attempts a login against a bogus host
        // and is expected to fail (network error), leaving the pool empty.
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn caps_at_max_clients_without_attempting_more_logins() {
        // All of these share a host guaranteed to fail DNS, but we only care
        // that loading never attempts more than `max` logins.
        let sessions: Vec<String> = (0..20)
            .map(|i| format!("sess{i}:::invalid.invalid"))
            .collect();
        let pool = ClientPool::load(sessions, 3).await.unwrap();
        assert!(pool.len() <= 3);
    }
}
