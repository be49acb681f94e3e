//! LinkedHashMap: insertion-ordered storage behind `ListMap`.
//!
//! Entries live in a generational `SlotMap`; a `HashTable` maps each key's
//! hash to its slot, and each entry carries `prev`/`next` slot links that
//! thread the insertion order. Removal unlinks a slot in O(1) without
//! scanning the order.
//!
//! Each entry stores its precomputed hash; the index is rebuilt from stored
//! hashes only, so `K: Hash` is never invoked after insertion.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

#[derive(Clone, Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

#[derive(Clone)]
pub(crate) struct LinkedHashMap<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

/// Iterator over entries in insertion order (or its reverse).
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    cursor: Option<DefaultKey>,
    forward: bool,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let e = &self.slots[slot];
        self.cursor = if self.forward { e.next } else { e.prev };
        Some((&e.key, &e.value))
    }
}

impl<K, V, S> LinkedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn find<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.key.borrow() == q)
                    .unwrap_or(false)
            })
            .copied()
    }

    pub(crate) fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub(crate) fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).map(|k| &self.slots[k].value)
    }

    /// Insert or update. An updated key keeps its position.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hash_table::Entry::Occupied(o) => {
                let slot = *o.get();
                Some(core::mem::replace(&mut self.slots[slot].value, value))
            }
            hash_table::Entry::Vacant(v) => {
                let entry = Entry {
                    key,
                    value,
                    hash,
                    prev: self.tail,
                    next: None,
                };
                let k = self.slots.insert(entry);
                match self.tail {
                    Some(t) => self.slots[t].next = Some(k),
                    None => self.head = Some(k),
                }
                self.tail = Some(k);
                let _ = v.insert(k);
                None
            }
        }
    }

    /// Value for `key`, inserting `default()` at the back when absent.
    /// `default` only runs on insert. The flag reports whether it did.
    pub(crate) fn get_or_insert_with<F>(&mut self, key: K, default: F) -> (&mut V, bool)
    where
        F: FnOnce() -> V,
    {
        if let Some(slot) = self.find(&key) {
            return (&mut self.slots[slot].value, false);
        }
        self.insert(key, default());
        let tail = self.tail.expect("tail is set after an insert");
        (&mut self.slots[tail].value, true)
    }

    pub(crate) fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find(q)?;
        self.remove_slot(slot)
    }

    pub(crate) fn pop_front(&mut self) -> Option<(K, V)> {
        let head = self.head?;
        self.remove_slot(head)
    }

    fn remove_slot(&mut self, slot: DefaultKey) -> Option<(K, V)> {
        let hash = self.slots.get(slot)?.hash;
        if let Ok(o) = self.index.find_entry(hash, |&kk| kk == slot) {
            let _ = o.remove();
        }
        let entry = self.slots.remove(slot)?;
        match entry.prev {
            Some(p) => self.slots[p].next = entry.next,
            None => self.head = entry.next,
        }
        match entry.next {
            Some(n) => self.slots[n].prev = entry.prev,
            None => self.tail = entry.prev,
        }
        Some((entry.key, entry.value))
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keep only entries for which `keep` returns true, preserving order.
    pub(crate) fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let e = &self.slots[slot];
            cursor = e.next;
            if !keep(&e.key, &e.value) {
                self.remove_slot(slot);
            }
        }
    }

    /// Remove every entry, returning them in insertion order.
    pub(crate) fn drain(&mut self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.len());
        while let Some(kv) = self.pop_front() {
            out.push(kv);
        }
        out
    }
}

impl<K, V, S> LinkedHashMap<K, V, S> {
    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
            forward: true,
        }
    }

    pub(crate) fn iter_rev(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.tail,
            forward: false,
        }
    }
}
