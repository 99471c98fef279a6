use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Last raw response per user prompt, used only to spot verbatim repeats.
///
/// Bounded LRU: recording past `capacity` keys evicts the least recently touched one.
/// Losing an entry only costs response diversity, so a poisoned lock behaves like a miss.
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<Lru>,
}

#[derive(Default)]
struct Lru {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl Lru {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Lru::default()),
        }
    }

    pub fn last(&self, key: &str) -> Option<String> {
        let mut lru = self.inner.lock().ok()?;
        let value = lru.entries.get(key).cloned()?;
        lru.touch(key);
        Some(value)
    }

    pub fn record(&self, key: &str, response: &str) {
        let Ok(mut lru) = self.inner.lock() else {
            return;
        };
        if lru
            .entries
            .insert(key.to_string(), response.to_string())
            .is_some()
        {
            lru.touch(key);
            return;
        }
        lru.order.push_back(key.to_string());
        while lru.order.len() > self.capacity {
            if let Some(oldest) = lru.order.pop_front() {
                lru.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|l| l.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut lru) = self.inner.lock() {
            lru.entries.clear();
            lru.order.clear();
        }
    }
}
