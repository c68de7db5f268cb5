// src/naming.rs

use chrono::Local;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out unique, sortable names for run artifacts (figures, data files,
/// remote folders). Injected wherever a component needs a fresh name.
pub trait NameGenerator: Send + Sync {
    fn next_name(&self) -> String;
}

/// Wall-clock names like `20240614_120501_123456_0003`.
///
/// The trailing counter keeps two calls within the same microsecond apart and
/// preserves creation order when names are sorted.
#[derive(Debug, Default)]
pub struct TimestampNames {
    counter: AtomicU64,
}

impl TimestampNames {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameGenerator for TimestampNames {
    fn next_name(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}_{:04}", Local::now().format("%Y%m%d_%H%M%S_%6f"), seq)
    }
}

/// Deterministic `<prefix>_0000`, `<prefix>_0001`, ... names.
#[derive(Debug)]
pub struct SequentialNames {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl NameGenerator for SequentialNames {
    fn next_name(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}_{:04}", self.prefix, seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn timestamp_names_never_collide() {
        let names = TimestampNames::new();
        let generated: Vec<String> = (0..500).map(|_| names.next_name()).collect();
        let unique: HashSet<&String> = generated.iter().collect();
        assert_eq!(unique.len(), generated.len());
    }

    #[test]
    fn timestamp_names_sort_in_creation_order() {
        let names = TimestampNames::new();
        let generated: Vec<String> = (0..50).map(|_| names.next_name()).collect();
        let mut sorted = generated.clone();
        sorted.sort();
        assert_eq!(sorted, generated);
    }

    #[test]
    fn sequential_names_are_deterministic() {
        let names = SequentialNames::new("run");
        assert_eq!(names.next_name(), "run_0000");
        assert_eq!(names.next_name(), "run_0001");
    }
}
