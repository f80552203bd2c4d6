use crate::config::TradeIdScheme;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait TradeIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTradeIds;

impl TradeIdGenerator for UuidTradeIds {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// `<prefix>-<n>-<unix millis>`; the counter alone keeps ids unique within a process.
#[derive(Debug)]
pub struct SequentialTradeIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialTradeIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialTradeIds {
    fn default() -> Self {
        Self::new("mocktrade")
    }
}

impl TradeIdGenerator for SequentialTradeIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let millis = chrono::Utc::now().timestamp_millis();
        format!("{}-{n}-{millis}", self.prefix)
    }
}

pub fn generator_for(scheme: TradeIdScheme) -> Arc<dyn TradeIdGenerator> {
    match scheme {
        TradeIdScheme::Uuid => Arc::new(UuidTradeIds),
        TradeIdScheme::Sequential => Arc::new(SequentialTradeIds::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialTradeIds::new("t");
        let first = ids.next_id();
        let second = ids.next_id();
        assert!(first.starts_with("t-1-"), "{first}");
        assert!(second.starts_with("t-2-"), "{second}");
    }

    #[test]
    fn generators_do_not_repeat() {
        for generator in [generator_for(TradeIdScheme::Uuid), generator_for(TradeIdScheme::Sequential)] {
            let seen: HashSet<String> = (0..500).map(|_| generator.next_id()).collect();
            assert_eq!(seen.len(), 500);
        }
    }
}
