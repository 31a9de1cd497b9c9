use std::collections::HashMap;

use models::Id;

pub const DEFAULT_CAPACITY: usize = 64;

/// A bounded top-K heavy-hitters tracker over stream flow ids, used for
/// operational visibility only (§4.5): it need not be exact under races but
/// must never grow without bound. Implemented as a fixed-capacity map that
/// evicts its lowest-count entry to make room for a newly observed flow,
/// in the spirit of the teacher's small fixed-capacity caches rather than a
/// full count-min-sketch -- flow cardinality here is bounded by concurrent
/// connections, not by request volume.
pub struct FlowTop {
    capacity: usize,
    counts: HashMap<Id, u64>,
}

impl FlowTop {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            counts: HashMap::with_capacity(capacity),
        }
    }

    pub fn submit(&mut self, flow_id: Id, messages: u64) {
        if let Some(count) = self.counts.get_mut(&flow_id) {
            *count += messages;
            return;
        }

        if self.counts.len() >= self.capacity {
            if let Some((&lowest_key, _)) = self.counts.iter().min_by_key(|(_, count)| **count) {
                self.counts.remove(&lowest_key);
            }
        }

        self.counts.insert(flow_id, messages);
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn top(&self, n: usize) -> Vec<(Id, u64)> {
        let mut entries: Vec<(Id, u64)> = self.counts.iter().map(|(&id, &count)| (id, count)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(n);
        entries
    }
}

impl Default for FlowTop {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_submissions_accumulate_on_the_same_flow() {
        let mut top = FlowTop::new(4);
        let flow = Id::generate();
        top.submit(flow, 3);
        top.submit(flow, 4);
        assert_eq!(top.top(1), vec![(flow, 7)]);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut top = FlowTop::new(2);
        for _ in 0..10 {
            top.submit(Id::generate(), 1);
        }
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn evicts_the_lowest_count_entry_when_full() {
        let mut top = FlowTop::new(2);
        let heavy = Id::generate();
        let light = Id::generate();
        top.submit(heavy, 100);
        top.submit(light, 1);

        let newcomer = Id::generate();
        top.submit(newcomer, 5);

        let ids: Vec<Id> = top.top(2).into_iter().map(|(id, _)| id).collect();
        assert!(ids.contains(&heavy));
        assert!(!ids.contains(&light));
    }
}
