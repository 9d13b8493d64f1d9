//! Reference Extractor (component B).
//!
//! Pulls the set of actor/post references one raw event needs out of its
//! nested JSON. Never fails: missing, null, or wrong-typed intermediate
//! nodes are simply treated as absent, and whatever can be derived is
//! returned.

use std::collections::HashSet;

use crate::model::RawEvent;

/// References extracted from a single event, still tied to its batch index
/// so the coordinator can re-assemble per-event output in phase 5.
#[derive(Debug, Clone, Default)]
pub struct EventRefs {
    pub did: String,
    pub mentions: HashSet<String>,
    pub parent_uri: Option<String>,
    pub root_uri: Option<String>,
    pub quote_uri: Option<String>,
}

/// Extract references from one event. `_index` is accepted (per the
/// component contract) for callers that want to thread it through, though
/// this implementation doesn't need it itself — the caller tracks the index.
pub fn extract(event: &RawEvent, _index: usize) -> EventRefs {
    EventRefs {
        did: event.did().unwrap_or_default().to_string(),
        mentions: event.mention_dids().into_iter().collect(),
        parent_uri: event.reply_parent_uri(),
        root_uri: event.reply_root_uri(),
        quote_uri: event.quote_uri(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(v: serde_json::Value) -> RawEvent {
        RawEvent(v)
    }

    #[test]
    fn extracts_nothing_from_bare_event() {
        let e = event(json!({ "did": "D1", "commit": { "collection": "c", "rkey": "r", "record": {} } }));
        let refs = extract(&e, 0);
        assert_eq!(refs.did, "D1");
        assert!(refs.mentions.is_empty());
        assert!(refs.parent_uri.is_none());
        assert!(refs.root_uri.is_none());
        assert!(refs.quote_uri.is_none());
    }

    #[test]
    fn extracts_mentions_reply_and_quote() {
        let e = event(json!({
            "did": "D1",
            "commit": {
                "collection": "app.bsky.feed.post",
                "rkey": "r",
                "record": {
                    "facets": [
                        { "features": [ { "$type": "app.bsky.richtext.facet#mention", "did": "D2" } ] },
                        { "features": [ { "$type": "app.bsky.richtext.facet#link" } ] },
                    ],
                    "reply": {
                        "parent": { "uri": "at://X/c/p" },
                        "root": { "uri": "at://Y/c/r" },
                    },
                    "embed": {
                        "$type": "app.bsky.embed.record",
                        "record": { "uri": "at://Z/c/q" },
                    },
                },
            },
        }));
        let refs = extract(&e, 1);
        assert_eq!(refs.mentions, HashSet::from(["D2".to_string()]));
        assert_eq!(refs.parent_uri.as_deref(), Some("at://X/c/p"));
        assert_eq!(refs.root_uri.as_deref(), Some("at://Y/c/r"));
        assert_eq!(refs.quote_uri.as_deref(), Some("at://Z/c/q"));
    }

    #[test]
    fn ignores_non_record_embeds() {
        let e = event(json!({
            "did": "D1",
            "commit": { "collection": "c", "rkey": "r", "record": {
                "embed": { "$type": "app.bsky.embed.images", "images": [] }
            } }
        }));
        let refs = extract(&e, 0);
        assert!(refs.quote_uri.is_none());
    }

    #[test]
    fn missing_and_malformed_fields_are_absent_not_errors() {
        let e = event(json!({ "commit": { "record": { "facets": "not-an-array" } } }));
        let refs = extract(&e, 0);
        assert_eq!(refs.did, "");
        assert!(refs.mentions.is_empty());
    }
}
