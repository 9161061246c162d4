use std::collections::HashMap;
use std::sync::Mutex;

use super::EventBus;
use crate::error::Result;

/// An in-process, `Vec`-backed bus. Used by tests and by in-process replay
/// where a file-backed log would be unnecessary ceremony.
#[derive(Default)]
pub struct MemoryBus {
    topics: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventBus for MemoryBus {
    fn publish_raw(&self, topic: &str, canonical_line: &str) -> Result<()> {
        let mut topics = self.topics.lock().expect("event bus mutex poisoned");
        topics.entry(topic.to_string()).or_default().push(canonical_line.to_string());
        Ok(())
    }

    fn read_raw(&self, topic: &str) -> Result<Vec<String>> {
        let topics = self.topics.lock().expect("event bus mutex poisoned");
        Ok(topics.get(topic).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{publish, read_topic};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Rec {
        b: i32,
        a: i32,
    }

    #[test]
    fn read_on_empty_topic_returns_empty() {
        let bus = MemoryBus::new();
        let recs: Vec<Rec> = read_topic(&bus, "nothing").unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn publish_preserves_insertion_order() {
        let bus = MemoryBus::new();
        publish(&bus, "t", &Rec { a: 1, b: 2 }).unwrap();
        publish(&bus, "t", &Rec { a: 3, b: 4 }).unwrap();
        let recs: Vec<Rec> = read_topic(&bus, "t").unwrap();
        assert_eq!(recs, vec![Rec { a: 1, b: 2 }, Rec { a: 3, b: 4 }]);
    }

    #[test]
    fn publish_emits_sorted_keys() {
        let bus = MemoryBus::new();
        publish(&bus, "t", &Rec { a: 1, b: 2 }).unwrap();
        let raw = bus.read_raw("t").unwrap();
        assert_eq!(raw[0], r#"{"a":1,"b":2}"#);
    }
}
