//! Attachment List
//!
//! An ordered list of listeners attached to a reactive cell, supporting O(1)
//! append and O(1) removal by handle.
//!
//! # Implementation
//!
//! Rather than an intrusive pointer-linked list, the chain lives in an arena
//! of slots. Each slot stores its value plus `prev`/`next` slot indices, and
//! a handle ([`AttachKey`]) is a stable index plus a generation stamp. This
//! keeps removal O(1) while making stale handles detectable: a freed slot
//! only bumps its generation when reused, so a key minted for the old
//! occupant no longer matches.
//!
//! # Traversal during notification
//!
//! A notify walk must tolerate listeners detaching themselves or other
//! listeners mid-walk. [`AttachmentList::step`] supports this: it returns
//! the slot's current value together with the key of the next node, captured
//! *before* the caller invokes the listener. A slot that was detached keeps
//! its `next` link until reuse, so the walk continues past it (skipping the
//! vacated value).
//!
//! Reuse is the hazard: a key captured by the walk must never find its slot
//! occupied by a different node. Walks therefore bracket themselves with
//! [`AttachmentList::begin_walk`]/[`AttachmentList::end_walk`]; while any
//! walk is active, freed slots are quarantined and only become reusable when
//! the last walk ends. A key minted before the walk whose slot was since
//! reused still fails the generation check in [`AttachmentList::step`] and
//! ends the traversal.

/// Handle to a node in an [`AttachmentList`].
///
/// Callers must retain the key returned by [`AttachmentList::push`] to later
/// remove the node. Keys are invalidated by removal; using a stale key is a
/// detected no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachKey {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    /// `None` while the slot is vacant (detached or on the free list).
    value: Option<T>,
    prev: Option<u32>,
    /// Kept as-is on removal so an in-flight traversal can continue;
    /// overwritten on reuse.
    next: Option<u32>,
    generation: u32,
}

/// Doubly-linked list of attachments backed by a slot arena.
#[derive(Debug)]
pub struct AttachmentList<T> {
    slots: Vec<Slot<T>>,
    head: Option<u32>,
    tail: Option<u32>,
    free: Vec<u32>,
    /// Slots freed while a walk was active; moved to `free` when the last
    /// walk ends.
    pending_free: Vec<u32>,
    /// Number of walks currently in flight.
    walks: u32,
    len: usize,
}

impl<T> AttachmentList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            head: None,
            tail: None,
            free: Vec::new(),
            pending_free: Vec::new(),
            walks: 0,
            len: 0,
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list has no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a value at the tail. O(1); always succeeds.
    pub fn push(&mut self, value: T) -> AttachKey {
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.value = Some(value);
                slot.prev = self.tail;
                slot.next = None;
                index
            }
            None => {
                self.slots.push(Slot {
                    value: Some(value),
                    prev: self.tail,
                    next: None,
                    generation: 0,
                });
                (self.slots.len() - 1) as u32
            }
        };

        match self.tail {
            Some(tail) => self.slots[tail as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        self.debug_check();
        AttachKey {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Unlink the node for `key`, returning its value.
    ///
    /// Idempotent: a stale generation or an already-vacant slot is a no-op
    /// returning `None`, so double-removal and removal interleaved with
    /// notification cannot corrupt the chain.
    pub fn remove(&mut self, key: AttachKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation || slot.value.is_none() {
            return None;
        }

        let value = slot.value.take();
        let (prev, next) = (slot.prev, slot.next);
        slot.prev = None;
        // slot.next intentionally kept; see module docs.

        match prev {
            Some(prev) => self.slots[prev as usize].next = next,
            // Reassign head only if this node is still the recorded head.
            None => {
                if self.head == Some(key.index) {
                    self.head = next;
                }
            }
        }
        match next {
            Some(next) => self.slots[next as usize].prev = prev,
            None => {
                if self.tail == Some(key.index) {
                    self.tail = prev;
                }
            }
        }

        // Quarantine the slot while walks are in flight; a key captured by
        // a walk must keep resolving to this (vacated) node, not a reused
        // one.
        if self.walks > 0 {
            self.pending_free.push(key.index);
        } else {
            self.free.push(key.index);
        }
        self.len -= 1;

        self.debug_check();
        value
    }

    /// Borrow the value for `key`, if it is still attached.
    pub fn get(&self, key: AttachKey) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Key of the first node, if any.
    pub fn head_key(&self) -> Option<AttachKey> {
        self.head.map(|index| self.key_at(index))
    }

    /// Key of the last node, if any.
    pub fn tail_key(&self) -> Option<AttachKey> {
        self.tail.map(|index| self.key_at(index))
    }

    /// Mark the start of a notification walk.
    ///
    /// While any walk is active, freed slots are quarantined instead of
    /// being handed back out by [`push`](Self::push), so every key the walk
    /// captures stays resolvable for its duration. Walks nest; each
    /// `begin_walk` must be balanced by one [`end_walk`](Self::end_walk).
    pub fn begin_walk(&mut self) {
        self.walks += 1;
    }

    /// Mark the end of a notification walk, releasing quarantined slots for
    /// reuse once no walk remains.
    pub fn end_walk(&mut self) {
        self.walks = self.walks.saturating_sub(1);
        if self.walks == 0 {
            self.free.append(&mut self.pending_free);
        }
    }

    /// One traversal step, for use by a notification walk.
    ///
    /// Returns the value at `key` (`None` if that node was detached since
    /// the key was captured) and the key of the following node. The caller
    /// must capture the returned next key before invoking the listener.
    /// Returns `None` when the slot was reused for a different node.
    pub fn step(&self, key: AttachKey) -> Option<(Option<&T>, Option<AttachKey>)> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let next = slot.next.map(|index| self.key_at(index));
        Some((slot.value.as_ref(), next))
    }

    /// Forward iteration over live values, head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        Traversal {
            list: self,
            cursor: self.head,
            forward: true,
        }
    }

    /// Backward iteration over live values, tail to head.
    pub fn iter_rev(&self) -> impl Iterator<Item = &T> {
        Traversal {
            list: self,
            cursor: self.tail,
            forward: false,
        }
    }

    /// Drop every node and reset the arena.
    ///
    /// An in-flight walk sees its next step fail outright (the slot is
    /// gone) and ends; the walk counter is left for the matching
    /// [`end_walk`](Self::end_walk).
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.pending_free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn key_at(&self, index: u32) -> AttachKey {
        AttachKey {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    #[cfg(debug_assertions)]
    fn debug_check(&self) {
        debug_assert_eq!(self.head.is_none(), self.tail.is_none());
        if let Some(head) = self.head {
            debug_assert!(self.slots[head as usize].prev.is_none());
        }
        if let Some(tail) = self.tail {
            debug_assert!(self.slots[tail as usize].next.is_none());
        }
        debug_assert_eq!(self.iter().count(), self.len);
    }

    #[cfg(not(debug_assertions))]
    fn debug_check(&self) {}
}

impl<T> Default for AttachmentList<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Traversal<'a, T> {
    list: &'a AttachmentList<T>,
    cursor: Option<u32>,
    forward: bool,
}

impl<'a, T> Iterator for Traversal<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        while let Some(index) = self.cursor {
            let slot = &self.list.slots[index as usize];
            self.cursor = if self.forward { slot.next } else { slot.prev };
            if let Some(value) = slot.value.as_ref() {
                return Some(value);
            }
        }
        None
    }
}
