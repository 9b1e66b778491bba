//! Recency-ordered session index.
//!
//! Nodes live in a `Vec` and link to each other by slot index; vacated slots go on a free list and are
//! handed out again by the next insert. Together with the id → slot map this gives O(1) insert, touch
//! and removal, and lets an expiry sweep walk from the least recently used end and stop at the first
//! entry that is still fresh.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug)]
struct Node<V> {
    id: String,
    value: V,
    accessed: DateTime<Utc>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct RecencyList<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    // most recently used
    head: Option<usize>,
    // least recently used
    tail: Option<usize>,
}

impl<V> Default for RecencyList<V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }
}

impl<V> RecencyList<V> {
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn get(&self, id: &str) -> Option<&V> {
        let slot = *self.index.get(id)?;
        self.node(slot).map(|node| &node.value)
    }

    /// Inserts `id` at the head. An existing entry under the same id is replaced.
    pub(crate) fn push_front(&mut self, id: String, value: V, now: DateTime<Utc>) {
        self.remove(&id);

        let node = Node {
            id: id.clone(),
            value,
            accessed: now,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        self.link_front(slot);
    }

    /// Stamps `id` with `now` and moves it to the head. Returns `false` if `id` is unknown.
    pub(crate) fn touch(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let Some(&slot) = self.index.get(id) else {
            return false;
        };
        if let Some(node) = self.node_mut(slot) {
            node.accessed = now;
        }
        if self.head != Some(slot) {
            self.unlink(slot);
            self.link_front(slot);
        }
        true
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<V> {
        let slot = self.index.remove(id)?;
        self.unlink(slot);
        let node = self.slots[slot].take()?;
        self.free.push(slot);
        Some(node.value)
    }

    /// Pops entries off the tail while they have been idle for longer than `max_idle`, returning
    /// their ids oldest first.
    pub(crate) fn evict_idle(&mut self, now: DateTime<Utc>, max_idle: TimeDelta) -> Vec<String> {
        let mut evicted = Vec::new();
        while let Some(tail) = self.tail {
            let Some(node) = self.node(tail) else {
                break;
            };
            if now - node.accessed <= max_idle {
                break;
            }
            let id = node.id.clone();
            self.remove(&id);
            evicted.push(id);
        }
        evicted
    }

    fn node(&self, slot: usize) -> Option<&Node<V>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node<V>> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn link_front(&mut self, slot: usize) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head.and_then(|head| self.node_mut(head)) {
            Some(head) => head.prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let Some((prev, next)) = self.node(slot).map(|node| (node.prev, node.next)) else {
            return;
        };
        match prev.and_then(|p| self.node_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.node_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = None;
        }
    }

    /// Ids from most to least recently used.
    #[cfg(test)]
    pub(crate) fn ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = self.node(slot).expect("linked slot is occupied");
            ids.push(node.id.clone());
            cursor = node.next;
        }
        ids
    }

    /// Panics unless access times never increase from head to tail.
    #[cfg(test)]
    pub(crate) fn assert_ordered_by_access(&self) {
        let mut cursor = self.head;
        let mut newer: Option<DateTime<Utc>> = None;
        while let Some(slot) = cursor {
            let node = self.node(slot).expect("linked slot is occupied");
            if let Some(newer) = newer {
                assert!(
                    node.accessed <= newer,
                    "{} was accessed after an entry closer to the head",
                    node.id
                );
            }
            newer = Some(node.accessed);
            cursor = node.next;
        }
    }

    /// Panics unless the list and the index describe the same set of ids with consistent links.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let forward = self.ids();
        assert_eq!(forward.len(), self.index.len(), "list and index sizes differ");
        for id in &forward {
            let slot = self.index[id];
            assert_eq!(&self.node(slot).expect("indexed slot is occupied").id, id);
        }

        let mut backward = Vec::new();
        let mut cursor = self.tail;
        while let Some(slot) = cursor {
            let node = self.node(slot).expect("linked slot is occupied");
            backward.push(node.id.clone());
            cursor = node.prev;
        }
        backward.reverse();
        assert_eq!(forward, backward, "prev links disagree with next links");

        let occupied = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(occupied, self.index.len());
        assert_eq!(occupied + self.free.len(), self.slots.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn push_front_orders_newest_first() {
        let mut list = RecencyList::default();
        list.push_front("a".into(), 1, at(0));
        list.push_front("b".into(), 2, at(1));
        list.push_front("c".into(), 3, at(2));

        assert_eq!(list.ids(), ["c", "b", "a"]);
        assert_eq!(list.get("b"), Some(&2));
        list.assert_consistent();
    }

    #[test]
    fn touch_moves_to_head() {
        let mut list = RecencyList::default();
        for (i, id) in ["a", "b", "c", "d"].into_iter().enumerate() {
            list.push_front(id.into(), (), at(i as i64));
        }

        assert!(list.touch("a", at(10)));
        assert_eq!(list.ids(), ["a", "d", "c", "b"]);
        assert!(list.touch("c", at(11)));
        assert_eq!(list.ids(), ["c", "a", "d", "b"]);
        assert!(list.touch("c", at(12)));
        assert_eq!(list.ids(), ["c", "a", "d", "b"]);
        assert!(!list.touch("missing", at(13)));
        list.assert_consistent();
    }

    #[test]
    fn remove_relinks_neighbours_and_reuses_slots() {
        let mut list = RecencyList::default();
        list.push_front("a".into(), (), at(0));
        list.push_front("b".into(), (), at(1));
        list.push_front("c".into(), (), at(2));

        assert!(list.remove("b").is_some());
        assert!(list.remove("b").is_none());
        assert_eq!(list.ids(), ["c", "a"]);
        list.assert_consistent();

        list.push_front("d".into(), (), at(3));
        assert_eq!(list.slots.len(), 3);
        assert_eq!(list.ids(), ["d", "c", "a"]);
        list.assert_consistent();

        list.remove("d");
        list.remove("a");
        list.remove("c");
        assert_eq!(list.len(), 0);
        assert_eq!(list.head, None);
        assert_eq!(list.tail, None);
        list.assert_consistent();
    }

    #[test]
    fn reinserting_an_id_replaces_it() {
        let mut list = RecencyList::default();
        list.push_front("a".into(), 1, at(0));
        list.push_front("b".into(), 2, at(1));
        list.push_front("a".into(), 3, at(2));

        assert_eq!(list.len(), 2);
        assert_eq!(list.ids(), ["a", "b"]);
        assert_eq!(list.get("a"), Some(&3));
        list.assert_consistent();
    }

    #[test]
    fn evict_idle_removes_only_the_stale_suffix() {
        let mut list = RecencyList::default();
        for i in 0..5 {
            list.push_front(format!("s{i}"), (), at(i * 10));
        }

        // s0..s4 were last seen at 0, 10, 20, 30, 40; window 15 at t = 40 keeps s3 and s4 (exactly
        // 10 and 0 seconds idle) and s2 is 20 > 15.
        let evicted = list.evict_idle(at(40), TimeDelta::seconds(15));
        assert_eq!(evicted, ["s0", "s1", "s2"]);
        assert_eq!(list.ids(), ["s4", "s3"]);
        list.assert_consistent();
    }

    #[test]
    fn evict_idle_keeps_entries_exactly_at_the_window() {
        let mut list = RecencyList::default();
        list.push_front("a".into(), (), at(0));

        assert!(list.evict_idle(at(60), TimeDelta::seconds(60)).is_empty());
        assert_eq!(list.evict_idle(at(61), TimeDelta::seconds(60)), ["a"]);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn touched_entries_survive_eviction() {
        let mut list = RecencyList::default();
        list.push_front("old".into(), (), at(0));
        list.push_front("new".into(), (), at(5));
        list.touch("old", at(100));

        let evicted = list.evict_idle(at(110), TimeDelta::seconds(50));
        assert_eq!(evicted, ["new"]);
        assert_eq!(list.ids(), ["old"]);
    }

    #[test]
    fn touch_order_matches_access_time_order() {
        let mut list = RecencyList::default();
        list.push_front("a".into(), (), at(0));
        list.push_front("b".into(), (), at(1));
        list.touch("a", at(2));
        list.assert_ordered_by_access();

        // a touch stamped earlier than the current head breaks the ordering the sweep relies on
        list.touch("b", at(1));
        let unordered = std::panic::catch_unwind(|| list.assert_ordered_by_access());
        assert!(unordered.is_err());
    }

    #[test]
    fn interleaved_operations_keep_the_index_consistent() {
        let mut list = RecencyList::default();
        let mut clock = 0;
        for round in 0..200usize {
            clock += 1;
            let id = format!("id{}", round % 17);
            match round % 5 {
                0 | 1 => list.push_front(id.clone(), round, at(clock)),
                2 | 3 => {
                    list.touch(&id, at(clock));
                }
                _ => {
                    list.remove(&id);
                }
            }
            list.assert_consistent();
            if let Some(head) = list.ids().first() {
                if round % 5 < 2 || (round % 5 < 4 && list.get(&id).is_some()) {
                    assert_eq!(head, &id);
                }
            }
        }
    }
}
