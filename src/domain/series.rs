//! Time-indexed series: the ordered container every other component builds on.
//!
//! Nodes live in a slot arena and link to their neighbours through [`NodeId`]
//! handles. A hash index maps each timestamp to its node, so lookups by time are
//! O(1) and traversal in either direction follows the links.
//!
//! The series never sorts. Callers insert in chronological order with unique
//! timestamps; inserting an existing timestamp replaces that node in place.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub type Timestamp = DateTime<Utc>;

/// Window bound applied to new series unless configured otherwise.
pub const DEFAULT_MAX_LEN: usize = 1000;

static NEXT_SERIES_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a series, used to build cache signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId(u64);

impl SeriesId {
    pub fn fresh() -> Self {
        SeriesId(NEXT_SERIES_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a node inside one series.
///
/// The generation makes handles to replaced or evicted nodes resolve to `None`
/// instead of aliasing whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    slot: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
pub struct Node<T> {
    timestamp: Timestamp,
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

impl<T> Node<T> {
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    pub fn next(&self) -> Option<NodeId> {
        self.next
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

#[derive(Debug)]
pub struct TimeSeries<T> {
    id: SeriesId,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    index: HashMap<Timestamp, NodeId>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    cursor: Option<NodeId>,
    // 0 means unbounded
    max_len: usize,
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimeSeries<T> {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            id: SeriesId::fresh(),
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            cursor: None,
            max_len,
        }
    }

    pub fn id(&self) -> SeriesId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Sets the window bound and evicts from the head until it holds.
    /// A bound of 0 disables eviction.
    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len;
        self.resize();
    }

    /// Appends a node at the tail, or replaces the node already at `timestamp`
    /// keeping its position in the chain.
    pub fn set(&mut self, timestamp: Timestamp, value: T) {
        match self.index.get(&timestamp).copied() {
            Some(old) => self.replace(old, value),
            None => self.append(timestamp, value),
        }
        self.resize();
    }

    fn append(&mut self, timestamp: Timestamp, value: T) {
        let id = self.alloc(Node {
            timestamp,
            value,
            prev: self.tail,
            next: None,
        });
        if let Some(tail) = self.tail {
            if let Some(node) = self.node_mut(tail) {
                node.next = Some(id);
            }
        }
        self.tail = Some(id);
        if self.head.is_none() {
            self.head = Some(id);
        }
        self.index.insert(timestamp, id);
    }

    fn replace(&mut self, old: NodeId, value: T) {
        let Some(existing) = self.release(old) else {
            return;
        };
        let (timestamp, prev, next) = (existing.timestamp, existing.prev, existing.next);
        let id = self.alloc(Node {
            timestamp,
            value,
            prev,
            next,
        });
        if let Some(node) = prev.and_then(|p| self.node_mut(p)) {
            node.next = Some(id);
        }
        if let Some(node) = next.and_then(|n| self.node_mut(n)) {
            node.prev = Some(id);
        }
        if self.head == Some(old) {
            self.head = Some(id);
        }
        if self.tail == Some(old) {
            self.tail = Some(id);
        }
        if self.cursor == Some(old) {
            self.cursor = Some(id);
        }
        self.index.insert(timestamp, id);
    }

    /// Evicts the head node. Returns false when the series is empty.
    pub fn shift(&mut self) -> bool {
        let Some(head) = self.head else {
            return false;
        };
        let Some(node) = self.release(head) else {
            return false;
        };
        self.index.remove(&node.timestamp);
        self.head = node.next;
        match node.next.and_then(|n| self.node_mut(n)) {
            Some(new_head) => new_head.prev = None,
            None => self.tail = None,
        }
        if self.cursor == Some(head) {
            self.cursor = None;
        }
        true
    }

    fn resize(&mut self) {
        if self.max_len == 0 {
            return;
        }
        while self.len() > self.max_len {
            if !self.shift() {
                break;
            }
        }
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot];
                entry.node = Some(node);
                NodeId {
                    slot,
                    generation: entry.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    slot: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Option<Node<T>> {
        let entry = self.slots.get_mut(id.slot)?;
        if entry.generation != id.generation {
            return None;
        }
        let node = entry.node.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.slot);
        Some(node)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        let entry = self.slots.get_mut(id.slot)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.node.as_mut()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        let entry = self.slots.get(id.slot)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.node.as_ref()
    }

    pub fn node_at(&self, timestamp: Timestamp) -> Option<NodeId> {
        self.index.get(&timestamp).copied()
    }

    pub fn get(&self, timestamp: Timestamp) -> Option<&T> {
        self.node_at(timestamp)
            .and_then(|id| self.node(id))
            .map(Node::value)
    }

    pub fn first_id(&self) -> Option<NodeId> {
        self.head
    }

    pub fn last_id(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn current_id(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn first(&self) -> Option<&Node<T>> {
        self.head.and_then(|id| self.node(id))
    }

    pub fn last(&self) -> Option<&Node<T>> {
        self.tail.and_then(|id| self.node(id))
    }

    pub fn current(&self) -> Option<&Node<T>> {
        self.cursor.and_then(|id| self.node(id))
    }

    /// Value under the cursor.
    pub fn value(&self) -> Option<&T> {
        self.current().map(Node::value)
    }

    /// Moves the cursor to `timestamp`. When no node exists there the cursor is
    /// unset and false is returned.
    pub fn set_current(&mut self, timestamp: Timestamp) -> bool {
        self.cursor = self.node_at(timestamp);
        self.cursor.is_some()
    }

    pub(crate) fn set_current_id(&mut self, id: NodeId) {
        if self.node(id).is_some() {
            self.cursor = Some(id);
        }
    }

    pub fn clear_current(&mut self) {
        self.cursor = None;
    }

    /// Walks head to tail.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            series: self,
            next: self.head,
        }
    }

    /// Walks from the node at `timestamp` (inclusive) to the tail.
    pub fn iter_from(&self, timestamp: Timestamp) -> Iter<'_, T> {
        Iter {
            series: self,
            next: self.node_at(timestamp),
        }
    }

    /// Collects up to `count` values ending at `id` (inclusive), oldest first.
    pub fn trailing(&self, id: NodeId, count: usize) -> Vec<&T> {
        let mut out = Vec::with_capacity(count);
        let mut at = Some(id);
        while out.len() < count {
            let Some(node) = at.and_then(|i| self.node(i)) else {
                break;
            };
            out.push(&node.value);
            at = node.prev;
        }
        out.reverse();
        out
    }
}

pub struct Iter<'a, T> {
    series: &'a TimeSeries<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next.and_then(|id| self.series.node(id))?;
        self.next = node.next;
        Some(node)
    }
}
