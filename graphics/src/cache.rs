//! String-keyed resource caches.
//!
//! Keys are used exactly as given: no path normalization, no case folding.
//! Two spellings of the same file are two entries and two loads.
//!
//! Keys starting with [`SOLID_COLOR_PREFIX`] are reserved for generated 1x1
//! textures, e.g. `#solid:255,255,255,255`.

use std::collections::HashMap;
use std::sync::Arc;

use tessera_core::color::{ParseColorError, Rgba8};

/// Reserved key prefix for generated solid-color textures.
pub const SOLID_COLOR_PREFIX: &str = "#solid:";

/// Cache key of the generated texture of `color`.
pub fn solid_color_key(color: Rgba8) -> String {
    format!("{SOLID_COLOR_PREFIX}{color}")
}

/// Parse a solid-color key.
///
/// Returns `None` for keys without the reserved prefix.
pub fn parse_solid_color_key(key: &str) -> Option<Result<Rgba8, ParseColorError>> {
    key.strip_prefix(SOLID_COLOR_PREFIX).map(str::parse)
}

/// Owns loaded objects by key; each key loads at most once.
pub struct ResourceCache<T> {
    entries: HashMap<String, Arc<T>>,
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Look up a previously loaded object.
    pub fn get(&self, key: &str) -> Option<&Arc<T>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert an object, replacing any previous entry under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Arc<T>) -> Option<Arc<T>> {
        self.entries.insert(key.into(), value)
    }

    /// Return the cached object, or load, insert and return it.
    ///
    /// A failed load inserts nothing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(existing) = self.entries.get(key) {
            log::debug!("Cache hit: {}", key);
            return Ok(Arc::clone(existing));
        }
        log::debug!("Cache miss: {}", key);
        let value = Arc::new(load()?);
        self.entries.insert(key.to_string(), Arc::clone(&value));
        Ok(value)
    }

    /// Remove an entry, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Arc<T>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ResourceCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_once_per_key() {
        let mut cache = ResourceCache::<u32>::new();
        let mut loads = 0;
        let a = cache
            .get_or_try_insert_with::<()>("a", || {
                loads += 1;
                Ok(1)
            })
            .unwrap();
        let again = cache
            .get_or_try_insert_with::<()>("a", || {
                loads += 1;
                Ok(2)
            })
            .unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(loads, 1);
    }

    #[test]
    fn test_keys_are_not_normalized() {
        let mut cache = ResourceCache::<&str>::new();
        cache
            .get_or_try_insert_with::<()>("data/a.png", || Ok("a"))
            .unwrap();
        cache
            .get_or_try_insert_with::<()>("data/../data/a.png", || Ok("a"))
            .unwrap();
        cache
            .get_or_try_insert_with::<()>("DATA/a.png", || Ok("a"))
            .unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_failed_load_inserts_nothing() {
        let mut cache = ResourceCache::<u32>::new();
        assert_eq!(cache.get_or_try_insert_with("bad", || Err("boom")), Err("boom"));
        assert!(!cache.contains("bad"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_solid_color_keys() {
        let key = solid_color_key(Rgba8::FLAT_NORMAL);
        assert_eq!(key, "#solid:128,128,255,255");
        assert_eq!(parse_solid_color_key(&key), Some(Ok(Rgba8::FLAT_NORMAL)));
        assert!(matches!(parse_solid_color_key("#solid:red"), Some(Err(_))));
        assert_eq!(parse_solid_color_key("textures/white.png"), None);
    }
}
