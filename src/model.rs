//! Wire/data model shared across the hydration core.
//!
//! The raw event is dynamically typed at the source: it's whatever JSON the
//! jetstream sends us. Rather than inventing a bespoke tagged-value enum, we
//! lean on `serde_json::Value` directly — it already is a tree of tagged
//! values (object, array, string, number, null) and the crate already pulls
//! in `serde_json` for config/remote-API decoding. Accessor helpers below
//! return `None` on any type mismatch instead of panicking.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;

/// A raw jetstream frame, opaque beyond the fields the hydration core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEvent(pub Json);

impl RawEvent {
    pub fn did(&self) -> Option<&str> {
        self.0.get("did")?.as_str()
    }

    pub fn time_us(&self) -> Option<i64> {
        self.0.get("time_us")?.as_i64()
    }

    fn commit(&self) -> Option<&Json> {
        self.0.get("commit")
    }

    pub fn collection(&self) -> Option<&str> {
        self.commit()?.get("collection")?.as_str()
    }

    pub fn rkey(&self) -> Option<&str> {
        self.commit()?.get("rkey")?.as_str()
    }

    fn record(&self) -> Option<&Json> {
        self.commit()?.get("record")
    }

    /// `commit.record.facets[].features[]` whose `$type` ends in `#mention`,
    /// keeping only entries that carry a non-empty `did`.
    pub fn mention_dids(&self) -> Vec<String> {
        let mut out = Vec::new();
        let Some(facets) = self.record().and_then(|r| r.get("facets")).and_then(Json::as_array)
        else {
            return out;
        };
        for facet in facets {
            let Some(features) = facet.get("features").and_then(Json::as_array) else {
                continue;
            };
            for feature in features {
                let is_mention = feature
                    .get("$type")
                    .and_then(Json::as_str)
                    .map(|t| t.ends_with("#mention"))
                    .unwrap_or(false);
                if !is_mention {
                    continue;
                }
                if let Some(did) = feature.get("did").and_then(Json::as_str) {
                    if !did.is_empty() {
                        out.push(did.to_string());
                    }
                }
            }
        }
        out
    }

    pub fn reply_parent_uri(&self) -> Option<String> {
        self.record()?
            .get("reply")?
            .get("parent")?
            .get("uri")?
            .as_str()
            .map(str::to_string)
    }

    pub fn reply_root_uri(&self) -> Option<String> {
        self.record()?
            .get("reply")?
            .get("root")?
            .get("uri")?
            .as_str()
            .map(str::to_string)
    }

    /// Quote-post URI, only when the embed is the record-embed form
    /// (`$type` ending in `embed.record`).
    pub fn quote_uri(&self) -> Option<String> {
        let embed = self.record()?.get("embed")?;
        let is_record_embed = embed
            .get("$type")
            .and_then(Json::as_str)
            .map(|t| t.ends_with("embed.record"))
            .unwrap_or(false);
        if !is_record_embed {
            return None;
        }
        embed.get("record")?.get("uri")?.as_str().map(str::to_string)
    }
}

/// Remote actor descriptor, keyed by DID. Opaque beyond the key itself — the
/// hydration core never interprets its contents, it only caches and forwards
/// whatever the social client returned.
pub type Profile = Json;

/// Remote post descriptor, keyed by AT-URI. Same opacity rule as `Profile`.
pub type Post = Json;

/// Per-record hydrated references attached to the original raw event.
#[derive(Debug, Clone, Serialize)]
pub struct HydratedMetadata {
    pub user: Option<Profile>,
    pub mentions: HashMap<String, Option<Profile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_post: Option<Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_post: Option<Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_post: Option<Post>,
}

/// One coordinator output per input event.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRecord {
    pub at_uri: String,
    pub did: String,
    pub time_us: Option<i64>,
    pub message: RawEvent,
    pub hydrated_metadata: HydratedMetadata,
}

impl EnrichedRecord {
    pub fn at_uri_for(did: &str, collection: &str, rkey: &str) -> String {
        if did.is_empty() || collection.is_empty() || rkey.is_empty() {
            String::new()
        } else {
            format!("at://{did}/{collection}/{rkey}")
        }
    }
}
