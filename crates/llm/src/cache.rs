//! Content-addressed response cache, keyed by `(task_tag, prompt_hash,
//! schema_hash)`. Entries expire after a caller-supplied TTL; expired
//! entries are treated as absent rather than evicted eagerly.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use lexiscribe_core::{StructuredResponse, TaskTag};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(task_tag: TaskTag, prompt: &str, schema: &serde_json::Value) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(task_tag.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(prompt.as_bytes());
        hasher.update(b"\0");
        hasher.update(schema.to_string().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }
}

struct CacheEntry {
    response: StructuredResponse,
    expires_at: Instant,
}

pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn get(&self, key: &CacheKey) -> Option<StructuredResponse> {
        let entry = self.entries.get(key)?;
        if Instant::now() > entry.expires_at {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        let mut response = entry.response.clone();
        response.from_cache = true;
        Some(response)
    }

    pub fn put(&self, key: CacheKey, response: StructuredResponse, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                response,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexiscribe_core::TokenUsage;

    fn sample_response() -> StructuredResponse {
        StructuredResponse {
            value: serde_json::json!({"ok": true}),
            usage: TokenUsage::new(10, 5),
            model: "gpt-4o-mini".to_string(),
            wall_time_ms: 5,
            from_cache: false,
        }
    }

    #[test]
    fn identical_key_inputs_produce_identical_keys() {
        let schema = serde_json::json!({"type": "object"});
        let a = CacheKey::new(TaskTag::Synonyms, "hello", &schema);
        let b = CacheKey::new(TaskTag::Synonyms, "hello", &schema);
        assert_eq!(a, b);
    }

    #[test]
    fn differing_prompt_changes_key() {
        let schema = serde_json::json!({"type": "object"});
        let a = CacheKey::new(TaskTag::Synonyms, "hello", &schema);
        let b = CacheKey::new(TaskTag::Synonyms, "world", &schema);
        assert_ne!(a, b);
    }

    #[test]
    fn expired_entry_is_treated_as_absent() {
        let cache = ResponseCache::new();
        let schema = serde_json::json!({"type": "object"});
        let key = CacheKey::new(TaskTag::Synonyms, "hello", &schema);
        cache.put(key.clone(), sample_response(), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn fresh_entry_is_returned_marked_from_cache() {
        let cache = ResponseCache::new();
        let schema = serde_json::json!({"type": "object"});
        let key = CacheKey::new(TaskTag::Synonyms, "hello", &schema);
        cache.put(key.clone(), sample_response(), Duration::from_secs(60));
        let hit = cache.get(&key).unwrap();
        assert!(hit.from_cache);
    }
}
