//! In-memory response cache.
//!
//! Entries are keyed by a SHA-256 fingerprint of everything that affects a
//! model answer: the model list, language hint, prompt version, code and
//! error message. Expiry is lazy (checked on read) and capacity is enforced
//! on write by evicting the single oldest entry.
//!
//! One cache is built per process and shared by reference; every operation
//! takes the internal lock for its whole read-check-remove or
//! write-then-evict sequence.

use crate::models::CanonicalResponse;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Cache construction errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache max_size must be at least 1")]
    InvalidCapacity,
}

/// A stored value with its creation time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Whether the entry is past its TTL at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

/// TTL- and size-bounded map from fingerprint to response.
#[derive(Debug)]
pub struct ResponseCache<V = CanonicalResponse> {
    store: Mutex<HashMap<String, CacheEntry<V>>>,
    max_size: usize,
    default_ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache holding at most `max_size` entries.
    pub fn new(max_size: usize, default_ttl_seconds: u64) -> Result<Self, CacheError> {
        if max_size == 0 {
            return Err(CacheError::InvalidCapacity);
        }

        Ok(Self {
            store: Mutex::new(HashMap::new()),
            max_size,
            default_ttl: Duration::from_secs(default_ttl_seconds),
        })
    }

    /// Look up `key`, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Store `value` under `key` with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.insert_at(key.into(), value, self.default_ttl, Instant::now());
    }

    /// Store `value` under `key` with an explicit TTL.
    #[allow(dead_code)] // Not used by the CLI
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl_seconds: u64) {
        self.insert_at(
            key.into(),
            value,
            Duration::from_secs(ttl_seconds),
            Instant::now(),
        );
    }

    /// Remove every entry.
    #[allow(dead_code)] // Not used by the CLI
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Current number of entries, expired ones included until they are read.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut store = self.lock();

        let expired = store.get(key)?.is_expired(now);
        if expired {
            debug!("Cache entry {} expired", short_key(key));
            store.remove(key);
            return None;
        }

        store.get(key).map(|entry| entry.value.clone())
    }

    fn insert_at(&self, key: String, value: V, ttl: Duration, now: Instant) {
        let mut store = self.lock();

        store.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                ttl,
            },
        );

        if store.len() > self.max_size {
            let oldest = store
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full; evicting {}", short_key(&oldest));
                store.remove(&oldest);
            }
        }
    }
}

fn short_key(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

/// Deterministic cache key for a request.
///
/// The model list is sorted and comma-joined. Each field is length-prefixed
/// before hashing so no choice of field contents can make two different
/// tuples hash the same input.
pub fn fingerprint(
    models: &[String],
    code: &str,
    error_message: &str,
    language: Option<&str>,
    prompt_version: &str,
) -> String {
    let mut sorted: Vec<&str> = models.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let model_list = sorted.join(",");

    let mut hasher = Sha256::new();
    for field in [
        model_list.as_str(),
        language.unwrap_or(""),
        prompt_version,
        code,
        error_message,
    ] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
