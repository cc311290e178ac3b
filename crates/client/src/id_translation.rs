//! Caching translator from raw dimension values (ids) to display labels.
//!
//! Mapped dimensions store ids in the usage data; the labels live behind a
//! per-dimension lookup endpoint. The translator caches fetched records,
//! queues unknown ids as they are encountered, and flushes the queue with
//! one batch request. A failed batch fetch is logged and the queue kept,
//! so the next flush retries the same ids.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use flexistat_core::types::DbId;

use crate::api::ReportingApi;

/// Cache hit/miss counters, mostly for debugging translation traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub hits: u64,
    pub misses: u64,
}

/// Id-to-label cache backed by one lookup endpoint.
#[derive(Debug)]
pub struct IdTranslation {
    /// Endpoint path of this dimension's text source.
    path: String,
    dict: HashMap<DbId, Value>,
    pending: HashSet<DbId>,
    stats: TranslationStats,
}

impl IdTranslation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dict: HashMap::new(),
            pending: HashSet::new(),
            stats: TranslationStats::default(),
        }
    }

    pub fn stats(&self) -> TranslationStats {
        self.stats
    }

    /// Cached record for a key. A miss queues the key for the next batch
    /// fetch and returns `None`.
    pub fn translate_key(&mut self, key: DbId) -> Option<&Value> {
        if self.dict.contains_key(&key) {
            return self.dict.get(&key);
        }
        self.pending.insert(key);
        None
    }

    /// Cached label string for a key, falling back to the key itself.
    ///
    /// A record is rendered from its `name_<locale>` field, then `name`,
    /// then the raw id.
    pub fn translate_key_to_string(&mut self, key: DbId, locale: &str) -> String {
        match self.translate_key(key) {
            Some(item) => item_to_string(item, locale).unwrap_or_else(|| key.to_string()),
            None => key.to_string(),
        }
    }

    /// Make sure the given keys can be translated: queue the unknown ones
    /// and flush the queue through one batch fetch.
    pub async fn prepare_translation(&mut self, keys: &[DbId], api: &ReportingApi) {
        for key in keys {
            if self.dict.contains_key(key) {
                self.stats.hits += 1;
            } else {
                self.pending.insert(*key);
                self.stats.misses += 1;
            }
        }
        self.update_dictionary(api).await;
    }

    /// Flush the pending set through one batch request.
    ///
    /// On failure the pending set is kept for a later retry; translation
    /// falls back to raw ids in the meantime.
    pub async fn update_dictionary(&mut self, api: &ReportingApi) {
        if self.pending.is_empty() {
            return;
        }
        let pks: Vec<DbId> = self.pending.iter().copied().collect();
        match api.get_id_labels(&self.path, &pks).await {
            Ok(items) => {
                for item in items {
                    if let Some(pk) = item.get("pk").and_then(Value::as_i64) {
                        self.dict.insert(pk, item);
                    }
                }
                self.pending.clear();
            }
            Err(error) => {
                tracing::warn!(
                    path = %self.path,
                    pending = pks.len(),
                    %error,
                    "Could not load id translations"
                );
            }
        }
    }
}

/// Render one lookup record as a display string for a locale.
fn item_to_string(item: &Value, locale: &str) -> Option<String> {
    if let Some(name) = item.get(format!("name_{locale}")).and_then(Value::as_str) {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    if let Some(name) = item.get("name").and_then(Value::as_str) {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    None
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn miss_queues_key_and_returns_none() {
        let mut translation = IdTranslation::new("/api/platform/");
        assert!(translation.translate_key(5).is_none());
        assert!(translation.pending.contains(&5));
    }

    #[test]
    fn string_fallback_is_the_raw_id() {
        let mut translation = IdTranslation::new("/api/platform/");
        assert_eq!(translation.translate_key_to_string(42, "en"), "42");
    }

    #[test]
    fn cached_record_renders_localized_name_first() {
        let mut translation = IdTranslation::new("/api/platform/");
        translation
            .dict
            .insert(5, json!({"pk": 5, "name": "Platform", "name_cs": "Platforma"}));
        assert_eq!(translation.translate_key_to_string(5, "cs"), "Platforma");
        assert_eq!(translation.translate_key_to_string(5, "en"), "Platform");
    }

    #[test]
    fn record_without_names_falls_back_to_id() {
        let mut translation = IdTranslation::new("/api/platform/");
        translation.dict.insert(7, json!({"pk": 7}));
        assert_eq!(translation.translate_key_to_string(7, "en"), "7");
    }
}
