//! Named monotonically increasing counters

use std::collections::HashMap;

/// Event counts keyed by name, e.g. `spawned` or `chunks`.
#[derive(Debug, Default)]
pub struct Counter {
    counts: HashMap<String, usize>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &str, value: usize) {
        match self.counts.get_mut(name) {
            Some(count) => *count += value,
            None => {
                self.counts.insert(name.to_owned(), value);
            }
        }
    }

    pub fn set(&mut self, name: &str, value: usize) {
        self.counts.insert(name.to_owned(), value);
    }

    /// Zero for names never touched.
    pub fn get(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counts.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(name, &count)| (name.as_str(), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate_per_name() {
        let mut counter = Counter::new();
        counter.increment("spawned", 128);
        counter.increment("spawned", 72);
        counter.increment("chunks", 2);
        assert_eq!(counter.get("spawned"), 200);
        assert_eq!(counter.get("chunks"), 2);
        assert_eq!(counter.get("missing"), 0);
    }

    #[test]
    fn set_overwrites_and_reset_clears() {
        let mut counter = Counter::new();
        counter.increment("spawned", 5);
        counter.set("spawned", 1);
        assert_eq!(counter.get("spawned"), 1);
        assert_eq!(counter.iter().count(), 1);
        counter.reset_all();
        assert_eq!(counter.iter().count(), 0);
    }
}
