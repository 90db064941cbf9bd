//! Result cache contract.
//!
//! Best-effort key/value storage used to skip a provider call whose
//! fingerprint was seen before. A miss is not an error, and a failed write is
//! only logged by callers.

use crate::progress::GenerationKind;
use futures::FutureExt;
use futures::future::BoxFuture;
use mb_core::Size;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub trait CacheStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>>;
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, ()>;
}

/// Cache key for one generation: kind + provider + size + prompt.
pub fn fingerprint(kind: GenerationKind, provider: &str, size: Size, prompt: &str) -> String {
    format!(
        "{kind}|{provider}|{}x{}|{}",
        size.width,
        size.height,
        prompt.trim()
    )
}

/// In-process cache. Good enough for tests and the demo harness.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>> {
        let hit = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        futures::future::ready(hit).boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, ()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        futures::future::ready(()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_covers_every_part() {
        let size = Size::new(200.0, 300.0);
        let base = fingerprint(GenerationKind::Image, "echo", size, "fog");
        assert_eq!(base, "image|echo|200x300|fog");
        assert_ne!(base, fingerprint(GenerationKind::Text, "echo", size, "fog"));
        assert_ne!(base, fingerprint(GenerationKind::Image, "other", size, "fog"));
        assert_ne!(base, fingerprint(GenerationKind::Image, "echo", Size::new(1.0, 1.0), "fog"));
        assert_eq!(base, fingerprint(GenerationKind::Image, "echo", size, "  fog "));
    }

    #[tokio::test]
    async fn memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await, None);
        cache.set("k", "v".into()).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.len(), 1);
    }
}
