//! The Producer's in-memory reorg detector (spec §4.4): the last 12 confirmed block headers,
//! never persisted — a restart always re-derives it from the first 12 blocks it processes.

use std::collections::BTreeMap;

const WINDOW: usize = 12;

#[derive(Default)]
pub struct ReorgCache {
    headers: BTreeMap<i64, String>,
}

impl ReorgCache {
    pub fn new() -> ReorgCache {
        ReorgCache { headers: BTreeMap::new() }
    }

    pub fn hash_at(&self, height: i64) -> Option<&str> {
        self.headers.get(&height).map(String::as_str)
    }

    /// Records `height`'s hash, then prunes down to the most recent `WINDOW` entries (oldest
    /// evicted first).
    pub fn confirm(&mut self, height: i64, hash: String) {
        self.headers.insert(height, hash);
        while self.headers.len() > WINDOW {
            if let Some((&oldest, _)) = self.headers.iter().next() {
                self.headers.remove(&oldest);
            }
        }
    }

    pub fn clear(&mut self) {
        self.headers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorg_cache_prunes_to_window() {
        let mut cache = ReorgCache::new();
        for h in 0..20 {
            cache.confirm(h, format!("hash{h}"));
        }
        assert_eq!(cache.headers.len(), WINDOW);
        assert!(cache.hash_at(0).is_none());
        assert_eq!(cache.hash_at(19), Some("hash19"));
    }
}
