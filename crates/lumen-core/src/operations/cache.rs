//! Bounded memo of operation results.
//!
//! Keys use the BLAKE3 hash of the input payload rather than its identifier,
//! since reprocessing mints new identifiers for identical content.

use std::collections::{HashMap, VecDeque};

use super::Operation;
use crate::types::{EncodedImage, StepOptions};

/// Identifies one operation invocation by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: Operation,
    input_hash: blake3::Hash,
    options: String,
}

impl CacheKey {
    pub fn new(operation: Operation, input: &[u8], options: &StepOptions) -> Self {
        // BTreeMap serialization is key-ordered, so equal maps give equal strings.
        let options = serde_json::to_string(options).unwrap_or_default();
        Self {
            operation,
            input_hash: blake3::hash(input),
            options,
        }
    }
}

/// FIFO-evicting cache of encoded results.
#[derive(Debug)]
pub struct OperationCache {
    capacity: usize,
    entries: HashMap<CacheKey, EncodedImage>,
    order: VecDeque<CacheKey>,
}

impl OperationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<EncodedImage> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: CacheKey, value: EncodedImage) {
        if self.capacity == 0 || self.entries.contains_key(&key) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(tag: u8) -> EncodedImage {
        EncodedImage::new("image/png", vec![tag; 4])
    }

    #[test]
    fn test_hit_and_miss() {
        let mut cache = OperationCache::new(4);
        let key = CacheKey::new(Operation::Invert, b"abc", &StepOptions::new());
        assert!(cache.get(&key).is_none());

        cache.insert(key.clone(), payload(1));
        assert_eq!(cache.get(&key), Some(payload(1)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_depends_on_content_operation_and_options() {
        let options = StepOptions::new();
        let mut other_options = StepOptions::new();
        other_options.insert("strength".to_string(), serde_json::json!(2));

        let base = CacheKey::new(Operation::Blur, b"abc", &options);
        assert_eq!(base, CacheKey::new(Operation::Blur, b"abc", &options));
        assert_ne!(base, CacheKey::new(Operation::Blur, b"abd", &options));
        assert_ne!(base, CacheKey::new(Operation::Invert, b"abc", &options));
        assert_ne!(base, CacheKey::new(Operation::Blur, b"abc", &other_options));
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut cache = OperationCache::new(2);
        let keys: Vec<CacheKey> = (0u8..3)
            .map(|i| CacheKey::new(Operation::Invert, &[i], &StepOptions::new()))
            .collect();
        for (i, key) in keys.iter().enumerate() {
            cache.insert(key.clone(), payload(i as u8));
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_some());
        assert!(cache.get(&keys[2]).is_some());
    }
}
