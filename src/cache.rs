use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Shared LRU object cache keyed by request URI.
///
/// Entries live in an arena of slots addressed by stable indices; the
/// recency order is an intrusive prev/next chain over those indices and the
/// URI index is a hash map pointing into the same arena. Everything mutable
/// sits behind one readers-writer lock, and the lock is never held across
/// I/O. Callers only ever see copies of payloads; the cache owns its entries
/// exclusively.
pub struct ObjectCache {
    capacity: usize,
    max_object: usize,
    inner: RwLock<Lru>,
}

struct Slot {
    uri: String,
    payload: Box<[u8]>,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Lru {
    slots: Vec<Slot>,
    free: Vec<usize>,
    index: FxHashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    total_bytes: usize,
}

impl ObjectCache {
    /// An empty cache with a total byte budget and a per-object ceiling.
    pub fn new(capacity: usize, max_object: usize) -> Self {
        Self {
            capacity,
            max_object,
            inner: RwLock::new(Lru {
                slots: Vec::new(),
                free: Vec::new(),
                index: FxHashMap::default(),
                head: None,
                tail: None,
                total_bytes: 0,
            }),
        }
    }

    /// Looks up `uri`, copying the payload out on a hit. A hit promotes the
    /// entry to most-recent, so this takes the writer side of the lock.
    pub fn get(&self, uri: &str) -> Option<Vec<u8>> {
        let mut lru = self.inner.write();
        let idx = *lru.index.get(uri)?;
        let payload = lru.slots[idx].payload.to_vec();
        lru.detach(idx);
        lru.push_front(idx);
        Some(payload)
    }

    /// Stores `payload` under `uri`, evicting least-recently-used entries
    /// until it fits. Oversize payloads are silently discarded, as is a
    /// payload that would not fit even in an empty cache.
    pub fn put(&self, uri: &str, payload: &[u8]) {
        if payload.len() > self.max_object {
            return;
        }

        let mut lru = self.inner.write();

        // Replace: any previous entry under the same URI goes first.
        let existing = lru.index.get(uri).copied();
        if let Some(idx) = existing {
            lru.release(idx);
        }

        while lru.total_bytes + payload.len() > self.capacity {
            let Some(tail) = lru.tail else { break };
            lru.release(tail);
        }
        if lru.total_bytes + payload.len() > self.capacity {
            return;
        }

        let idx = lru.allocate(uri, payload);
        lru.push_front(idx);
        lru.index.insert(uri.to_owned(), idx);
        lru.total_bytes += payload.len();
    }

    /// Deletes the entry under `uri` if present. Idempotent.
    pub fn remove(&self, uri: &str) {
        let mut lru = self.inner.write();
        let existing = lru.index.get(uri).copied();
        if let Some(idx) = existing {
            lru.release(idx);
        }
    }

    /// Sum of payload lengths of all live entries.
    pub fn size(&self) -> usize {
        self.inner.read().total_bytes
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().index.is_empty()
    }

    /// Teardown drain: walks the recency chain releasing every entry.
    pub fn clear(&self) {
        let mut lru = self.inner.write();
        while let Some(head) = lru.head {
            lru.release(head);
        }
        lru.slots.clear();
        lru.free.clear();
    }
}

impl Lru {
    /// Unlinks `idx` from the recency chain. The slot stays allocated.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    /// Links `idx` at the most-recent end of the chain.
    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;
        if let Some(old) = self.head {
            self.slots[old].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    /// Destroys the entry at `idx`: unchains it, drops it from the URI
    /// index, updates the byte total, and returns the slot to the free list.
    fn release(&mut self, idx: usize) {
        self.detach(idx);
        self.total_bytes -= self.slots[idx].payload.len();
        let slot = &mut self.slots[idx];
        self.index.remove(&slot.uri);
        slot.uri = String::new();
        slot.payload = Box::default();
        self.free.push(idx);
    }

    /// Claims a slot for a new entry, reusing a vacant one when available.
    fn allocate(&mut self, uri: &str, payload: &[u8]) -> usize {
        let slot = Slot {
            uri: uri.to_owned(),
            payload: payload.into(),
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }
}

impl fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lru = self.inner.read();
        let mut recency = Vec::with_capacity(lru.index.len());
        let mut cursor = lru.head;
        while let Some(idx) = cursor {
            let slot = &lru.slots[idx];
            recency.push(format!("{} ({}B)", slot.uri, slot.payload.len()));
            cursor = slot.next;
        }
        f.debug_struct("ObjectCache")
            .field("capacity", &self.capacity)
            .field("max_object", &self.max_object)
            .field("total_bytes", &lru.total_bytes)
            .field("entries", &recency)
            .finish()
    }
}
