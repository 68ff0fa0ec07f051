use fxhash::FxHashMap;
use std::cell::RefCell;

/// Process-wide named-slot store for scalar features.
///
/// Owned by the host and shared with downstream consumers, so methods take `&self` and
/// implementors provide their own interior mutability.
pub trait FeatureCache {
    /// Register a named slot, returning its index. Consecutive calls return consecutive indices.
    fn add(&self, name: &str) -> usize;
    /// Store a value into a slot
    fn cache(&self, index: usize, value: f64);
}

#[derive(Debug, Default)]
struct CacheSlots {
    names: Vec<String>,
    values: Vec<f64>,
    lookup: FxHashMap<String, usize>,
}

/// In-memory FeatureCache. Every `add` allocates a fresh slot, even for a known name;
/// `lookup` resolves a name to its most recent slot.
#[derive(Debug, Default)]
pub struct MemoryCache {
    slots: RefCell<CacheSlots>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.slots.borrow().values.get(index).copied()
    }

    pub fn name(&self, index: usize) -> Option<String> {
        self.slots.borrow().names.get(index).cloned()
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.slots.borrow().lookup.get(name).copied()
    }
}

impl FeatureCache for MemoryCache {
    fn add(&self, name: &str) -> usize {
        let mut slots = self.slots.borrow_mut();
        let index = slots.names.len();
        slots.names.push(name.to_string());
        slots.values.push(f64::NAN);
        slots.lookup.insert(name.to_string(), index);
        index
    }

    fn cache(&self, index: usize, value: f64) {
        if let Some(slot) = self.slots.borrow_mut().values.get_mut(index) {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_slots() {
        let cache = MemoryCache::new();
        let first = cache.add("A");
        let second = cache.add("B");
        assert_eq!(second, first + 1);
        cache.cache(second, 2.5);
        assert_eq!(cache.value(second), Some(2.5));
        assert!(cache.value(first).unwrap().is_nan());
        assert_eq!(cache.lookup("B"), Some(second));
        // Writes to unknown slots are dropped
        cache.cache(99, 1.0);
        assert_eq!(cache.len(), 2);
    }
}
