//! ListMap: a lock-guarded map that remembers insertion order.
//!
//! Same contract as [`HashMap`](crate::HashMap), except that `keys`,
//! `values`, `entries`, `iterate` and serialization follow insertion order,
//! `pop` takes the oldest entry, and updating an existing key keeps its
//! position. Removal is O(1).

use crate::convert::{Coerce, Emptiness};
use crate::hash_map::{same_container, Diff, RawMap};
use crate::linked_hash_map::LinkedHashMap;
use crate::mode::{Mode, RwCell, Safe};
use crate::value::Value;
use crate::var::Var;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

pub use crate::linked_hash_map::Iter;

pub struct ListMap<K, V, M: Mode = Safe, S = RandomState> {
    data: M::Lock<LinkedHashMap<K, V, S>>,
}

impl<K, V, M: Mode> ListMap<K, V, M>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V, M: Mode> Default for ListMap<K, V, M>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, M, S> ListMap<K, V, M, S>
where
    K: Eq + Hash,
    M: Mode,
    S: BuildHasher + Clone,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            data: RwCell::new(LinkedHashMap::with_hasher(hasher)),
        }
    }

    pub fn is_safe(&self) -> bool {
        M::SAFE
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.data.read().contains_key(key)
    }

    /// Upsert. A new key goes to the back; an existing key keeps its place.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    pub fn set_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut data = self.data.write();
        for (k, v) in entries {
            data.insert(k, v);
        }
    }

    /// Value for `key`, or `V::default()` when absent.
    pub fn get<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone + Default,
    {
        self.search(key).unwrap_or_default()
    }

    pub fn search<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.data.read().get(key).cloned()
    }

    /// Value for `key` wrapped in a [`Var`]; `Value::Null` when absent.
    pub fn get_var<Q>(&self, key: &Q) -> Var
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone + Into<Value>,
    {
        Var::new(self.search(key).map_or(Value::Null, Into::into))
    }

    pub fn get_or_set(&self, key: K, value: V) -> V
    where
        V: Clone,
    {
        if let Some(v) = self.data.read().get(&key) {
            return v.clone();
        }
        self.data.write().get_or_insert_with(key, || value).0.clone()
    }

    /// `default` runs without the lock; a value computed while another
    /// caller stored the key is dropped.
    pub fn get_or_set_with<F>(&self, key: K, default: F) -> V
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        if let Some(v) = self.data.read().get(&key) {
            return v.clone();
        }
        let value = default();
        let mut data = self.data.write();
        let (v, inserted) = data.get_or_insert_with(key, || value);
        if !inserted {
            tracing::trace!("get_or_set_with: key stored concurrently, dropping computed value");
        }
        v.clone()
    }

    /// `default` runs under the write lock, at most once per key.
    pub fn get_or_set_with_lock<F>(&self, key: K, default: F) -> V
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        if let Some(v) = self.data.read().get(&key) {
            return v.clone();
        }
        self.data.write().get_or_insert_with(key, default).0.clone()
    }

    pub fn set_if_absent(&self, key: K, value: V) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.data.write().get_or_insert_with(key, || value).1
    }

    pub fn set_if_absent_with<F>(&self, key: K, default: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains(&key) {
            return false;
        }
        let value = default();
        self.data.write().get_or_insert_with(key, || value).1
    }

    pub fn set_if_absent_with_lock<F>(&self, key: K, default: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains(&key) {
            return false;
        }
        self.data.write().get_or_insert_with(key, default).1
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.data.write().remove(key).map(|(_, v)| v)
    }

    pub fn remove_many<'q, Q, I>(&self, keys: I)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + 'q,
        I: IntoIterator<Item = &'q Q>,
    {
        let mut data = self.data.write();
        for key in keys {
            data.remove(key);
        }
    }

    /// Remove and return the oldest entry.
    pub fn pop(&self) -> Option<(K, V)> {
        self.data.write().pop_front()
    }

    /// Remove up to `n` of the oldest entries, oldest first. A negative `n`
    /// removes all; `0` removes nothing.
    pub fn pops(&self, n: isize) -> Vec<(K, V)> {
        let mut data = self.data.write();
        let want = usize::try_from(n).map_or(data.len(), |n| n.min(data.len()));
        if want == data.len() {
            return data.drain();
        }
        let mut out = Vec::with_capacity(want);
        while out.len() < want {
            match data.pop_front() {
                Some(kv) => out.push(kv),
                None => break,
            }
        }
        out
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.data.read().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.data.read().iter().map(|(_, v)| v.clone()).collect()
    }

    /// Ordered copy of every entry.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Same as [`iterate_asc`](ListMap::iterate_asc).
    pub fn iterate<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.iterate_asc(f)
    }

    /// Visit entries oldest first under the read lock until `f` returns
    /// `false`.
    pub fn iterate_asc<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let data = self.data.read();
        for (k, v) in data.iter() {
            if !f(k, v) {
                break;
            }
        }
    }

    /// Visit entries newest first.
    pub fn iterate_desc<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let data = self.data.read();
        for (k, v) in data.iter_rev() {
            if !f(k, v) {
                break;
            }
        }
    }

    /// Unordered copy of the contents. Always a copy, in either mode.
    pub fn map(&self) -> RawMap<K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        let data = self.data.read();
        let mut out = RawMap::with_capacity_and_hasher(data.len(), data.hasher().clone());
        out.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    pub fn clone_as<M2: Mode>(&self) -> ListMap<K, V, M2, S>
    where
        K: Clone,
        V: Clone,
    {
        ListMap {
            data: RwCell::new(self.data.read().clone()),
        }
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// Replace the contents with `entries`, kept in the given order.
    pub fn replace<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut data = self.data.write();
        data.clear();
        for (k, v) in entries {
            data.insert(k, v);
        }
    }

    /// Rebuild with keys and values swapped, keeping entry order. On value
    /// collisions the later entry wins and keeps the earlier position.
    pub fn flip(&self)
    where
        K: Coerce<V>,
        V: Coerce<K>,
    {
        let mut data = self.data.write();
        for (k, v) in data.drain() {
            data.insert(v.coerce(), k.coerce());
        }
    }

    /// Append the entries of `other` in its order, overwriting values of
    /// keys already present. Merging a map into itself is a no-op.
    pub fn merge<M2: Mode, S2>(&self, other: &ListMap<K, V, M2, S2>)
    where
        K: Clone,
        V: Clone,
        S2: BuildHasher + Clone,
    {
        if same_container(self, other) {
            tracing::trace!("merge: source is the target, nothing to do");
            return;
        }
        let entries = other.entries();
        self.set_many(entries);
    }

    pub fn filter_empty(&self)
    where
        V: Emptiness,
    {
        self.data.write().retain(|_, v| !v.is_empty_value());
    }

    pub fn filter_nil(&self)
    where
        V: Emptiness,
    {
        self.data.write().retain(|_, v| !v.is_nil_value());
    }

    /// Run `f` over the entries, oldest first, under the read lock.
    pub fn with_read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(Iter<'_, K, V>) -> R,
    {
        f(self.data.read().iter())
    }

    /// Hand the entries to `f` as an ordered `Vec` under the write lock,
    /// then rebuild the map from what `f` leaves in it. A key repeated in
    /// the `Vec` keeps its first position and its last value. The map is
    /// left empty if `f` panics.
    pub fn with_write<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Vec<(K, V)>) -> R,
    {
        let mut data = self.data.write();
        let mut entries = data.drain();
        let out = f(&mut entries);
        for (k, v) in entries {
            data.insert(k, v);
        }
        out
    }

    /// Consume the map, returning its entries oldest first.
    pub fn into_inner(self) -> Vec<(K, V)> {
        self.data.into_inner().drain()
    }

    /// Whether every entry of `self` is present in `other` with an equal
    /// value. Order is not compared.
    pub fn is_sub_of<M2: Mode, S2>(&self, other: &ListMap<K, V, M2, S2>) -> bool
    where
        K: Clone,
        V: Clone + PartialEq,
        S2: BuildHasher + Clone,
    {
        if same_container(self, other) {
            return true;
        }
        let theirs = other.map();
        let ours = self.data.read();
        ours.iter()
            .all(|(k, v)| theirs.get(k).map_or(false, |o| o == v))
    }

    /// Keys added, removed and updated going from `self` to `other`.
    /// `removed` and `updated` follow the order of `self`, `added` the
    /// order of `other`.
    pub fn diff<M2: Mode, S2>(&self, other: &ListMap<K, V, M2, S2>) -> Diff<K>
    where
        K: Clone,
        V: Clone + PartialEq,
        S2: BuildHasher + Clone,
    {
        if same_container(self, other) {
            return Diff::default();
        }
        let theirs = other.entries();
        let lookup: RawMap<&K, &V, RandomState> = theirs.iter().map(|(k, v)| (k, v)).collect();
        let ours = self.data.read();
        let mut diff = Diff::default();
        for (k, v) in ours.iter() {
            match lookup.get(k) {
                None => diff.removed.push(k.clone()),
                Some(o) if *o != v => diff.updated.push(k.clone()),
                Some(_) => {}
            }
        }
        for (k, _) in &theirs {
            if !ours.contains_key(k) {
                diff.added.push(k.clone());
            }
        }
        diff
    }
}

impl<K, V, M, S> Clone for ListMap<K, V, M, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    M: Mode,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        self.clone_as::<M>()
    }
}

impl<K, V, M, S> fmt::Debug for ListMap<K, V, M, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
    M: Mode,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.data.read().iter()).finish()
    }
}

impl<K, V, M, S> FromIterator<(K, V)> for ListMap<K, V, M, S>
where
    K: Eq + Hash,
    M: Mode,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::with_hasher(S::default());
        map.set_many(iter);
        map
    }
}

#[cfg(feature = "serde")]
impl<K, V, M, S> serde::Serialize for ListMap<K, V, M, S>
where
    K: serde::Serialize,
    V: serde::Serialize,
    M: Mode,
{
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        let data = self.data.read();
        serializer.collect_map(data.iter().map(|(k, v)| (crate::ser::MapKey(k), v)))
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, M, S> serde::Deserialize<'de> for ListMap<K, V, M, S>
where
    K: serde::Deserialize<'de> + Eq + Hash,
    V: serde::Deserialize<'de>,
    M: Mode,
    S: BuildHasher + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let crate::de::Pairs::<K, V>(entries) = serde::Deserialize::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(feature = "serde")]
impl<K, V, M, S> ListMap<K, V, M, S>
where
    K: Eq + Hash,
    M: Mode,
    S: BuildHasher + Clone,
{
    /// Decode a map and append it to the current contents in input order.
    /// Nothing is written when decoding fails.
    pub fn merge_from<'de, D>(&self, deserializer: D) -> Result<(), D::Error>
    where
        D: serde::Deserializer<'de>,
        K: serde::Deserialize<'de>,
        V: serde::Deserialize<'de>,
    {
        let crate::de::Pairs::<K, V>(entries) = serde::Deserialize::deserialize(deserializer)?;
        self.set_many(entries);
        Ok(())
    }
}
