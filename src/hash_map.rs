//! HashMap: lock-guarded generic hash map.
//!
//! Storage is a `hashbrown::HashMap` owned by the mode's cell (see
//! [`crate::mode`]). Every public method acquires the cell once and
//! releases it before returning; user callbacks passed to `iterate`,
//! `with_read` and `with_write` run while the guard is held and must not
//! touch the same map.
//!
//! Lazy initialization comes in two flavours:
//! - `*_with` computes the fallback outside the lock. Concurrent callers
//!   may each compute a value; only the first write is kept.
//! - `*_with_lock` computes it under the write lock, so the closure runs
//!   at most once per key across all callers.

use crate::convert::{Coerce, Emptiness};
use crate::mode::{Mode, RwCell, Safe, Unsync};
use crate::value::Value;
use crate::var::Var;
use core::borrow::Borrow;
use core::cell::RefMut;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::Entry;
use std::collections::hash_map::RandomState;

/// Plain, unsynchronized storage type used for copies and bulk results.
pub type RawMap<K, V, S = RandomState> = hashbrown::HashMap<K, V, S>;

pub type AnyAnyMap<M = Safe> = HashMap<Value, Value, M>;
pub type AnyIntMap<M = Safe> = HashMap<Value, i64, M>;
pub type AnyStrMap<M = Safe> = HashMap<Value, String, M>;
pub type IntAnyMap<M = Safe> = HashMap<i64, Value, M>;
pub type IntIntMap<M = Safe> = HashMap<i64, i64, M>;
pub type IntStrMap<M = Safe> = HashMap<i64, String, M>;
pub type StrAnyMap<M = Safe> = HashMap<String, Value, M>;
pub type StrIntMap<M = Safe> = HashMap<String, i64, M>;
pub type StrStrMap<M = Safe> = HashMap<String, String, M>;

pub struct HashMap<K, V, M: Mode = Safe, S = RandomState> {
    data: M::Lock<RawMap<K, V, S>>,
}

/// Key-level difference between two maps, see [`HashMap::diff`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diff<K> {
    /// Present in the other map only.
    pub added: Vec<K>,
    /// Present in this map only.
    pub removed: Vec<K>,
    /// Present in both with different values.
    pub updated: Vec<K>,
}

impl<K> Default for Diff<K> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            updated: Vec::new(),
        }
    }
}

impl<K, V, M: Mode> HashMap<K, V, M>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V, M: Mode> Default for HashMap<K, V, M>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, M, S> HashMap<K, V, M, S>
where
    K: Eq + Hash,
    M: Mode,
    S: BuildHasher + Clone,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_map(RawMap::with_hasher(hasher))
    }

    /// Adopt `map` as the backing storage. No copy is made; the map is moved
    /// in, so nothing else can observe it afterwards.
    pub fn from_map(map: RawMap<K, V, S>) -> Self {
        Self {
            data: RwCell::new(map),
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

    /// Unconditional upsert; returns the replaced value.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    pub fn set_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.data.write().extend(entries);
    }

    /// Value for `key`, or `V::default()` when absent. Use [`search`] to
    /// tell absence apart from a stored default.
    ///
    /// [`search`]: HashMap::search
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
        self.data.write().entry(key).or_insert(value).clone()
    }

    /// Like [`get_or_set`](HashMap::get_or_set) with a lazily computed
    /// value. `default` runs without any lock held; if another caller
    /// stores the key first, the computed value is dropped.
    pub fn get_or_set_with<F>(&self, key: K, default: F) -> V
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        if let Some(v) = self.data.read().get(&key) {
            return v.clone();
        }
        let value = default();
        match self.data.write().entry(key) {
            Entry::Occupied(e) => {
                tracing::trace!("get_or_set_with: key stored concurrently, dropping computed value");
                e.get().clone()
            }
            Entry::Vacant(e) => e.insert(value).clone(),
        }
    }

    /// Like [`get_or_set_with`](HashMap::get_or_set_with) but `default`
    /// runs under the write lock: at most once per key, and the whole map is
    /// blocked while it runs.
    pub fn get_or_set_with_lock<F>(&self, key: K, default: F) -> V
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        if let Some(v) = self.data.read().get(&key) {
            return v.clone();
        }
        self.data.write().entry(key).or_insert_with(default).clone()
    }

    /// Store `value` only if `key` is absent. Returns whether it was stored.
    pub fn set_if_absent(&self, key: K, value: V) -> bool {
        if self.contains(&key) {
            return false;
        }
        match self.data.write().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(value);
                true
            }
        }
    }

    pub fn set_if_absent_with<F>(&self, key: K, default: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains(&key) {
            return false;
        }
        let value = default();
        match self.data.write().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(value);
                true
            }
        }
    }

    pub fn set_if_absent_with_lock<F>(&self, key: K, default: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains(&key) {
            return false;
        }
        match self.data.write().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(default());
                true
            }
        }
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.data.write().remove(key)
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

    /// Remove and return an arbitrary entry.
    pub fn pop(&self) -> Option<(K, V)>
    where
        K: Clone,
    {
        let mut data = self.data.write();
        let key = data.keys().next()?.clone();
        data.remove_entry(&key)
    }

    /// Remove up to `n` arbitrary entries. A negative `n` removes all of
    /// them; `0` returns an empty map and leaves the contents untouched.
    pub fn pops(&self, n: isize) -> RawMap<K, V, S>
    where
        K: Clone,
    {
        let mut data = self.data.write();
        let want = usize::try_from(n).map_or(data.len(), |n| n.min(data.len()));
        let hasher = data.hasher().clone();
        if want == 0 {
            return RawMap::with_hasher(hasher);
        }
        if want == data.len() {
            tracing::trace!(popped = want, "pops: draining map");
            return core::mem::replace(&mut *data, RawMap::with_hasher(hasher));
        }
        let keys: Vec<K> = data.keys().take(want).cloned().collect();
        let mut out = RawMap::with_capacity_and_hasher(want, hasher);
        for key in keys {
            if let Some((k, v)) = data.remove_entry(&key) {
                out.insert(k, v);
            }
        }
        tracing::trace!(popped = out.len(), remaining = data.len(), "pops");
        out
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.data.read().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.data.read().values().cloned().collect()
    }

    /// Call `f` for each entry under the read lock until it returns `false`.
    pub fn iterate<F>(&self, mut f: F)
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

    /// Run `f` with the whole storage under the read lock.
    pub fn with_read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&RawMap<K, V, S>) -> R,
    {
        f(&self.data.read())
    }

    /// Run `f` with the whole storage under the write lock.
    pub fn with_write<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut RawMap<K, V, S>) -> R,
    {
        f(&mut self.data.write())
    }

    /// Fresh copy of the contents, independent of the mode.
    pub fn map_copy(&self) -> RawMap<K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        self.data.read().clone()
    }

    /// Deep copy into a container of mode `M2`.
    pub fn clone_as<M2: Mode>(&self) -> HashMap<K, V, M2, S>
    where
        K: Clone,
        V: Clone,
    {
        HashMap::from_map(self.map_copy())
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// Swap in `map` as the new contents.
    pub fn replace(&self, map: RawMap<K, V, S>) {
        *self.data.write() = map;
    }

    pub fn into_inner(self) -> RawMap<K, V, S> {
        self.data.into_inner()
    }

    /// Rebuild with keys and values swapped. When several keys share a
    /// value, whichever is visited last wins; the visiting order is
    /// unspecified.
    pub fn flip(&self)
    where
        K: Coerce<V>,
        V: Coerce<K>,
    {
        let mut data = self.data.write();
        let mut flipped = RawMap::with_capacity_and_hasher(data.len(), data.hasher().clone());
        for (k, v) in data.drain() {
            flipped.insert(v.coerce(), k.coerce());
        }
        *data = flipped;
    }

    /// Copy every entry of `other` into `self`, overwriting on collision.
    /// Merging a map into itself is a no-op.
    pub fn merge<M2: Mode, S2>(&self, other: &HashMap<K, V, M2, S2>)
    where
        K: Clone,
        V: Clone,
        S2: BuildHasher + Clone,
    {
        if same_container(self, other) {
            tracing::trace!("merge: source is the target, nothing to do");
            return;
        }
        // Snapshot first so the two locks are never held together.
        let entries: Vec<(K, V)> = other
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.data.write().extend(entries);
    }

    /// Drop entries whose value is empty (zero-equivalent).
    pub fn filter_empty(&self)
    where
        V: Emptiness,
    {
        self.data.write().retain(|_, v| !v.is_empty_value());
    }

    /// Drop entries whose value is nil.
    pub fn filter_nil(&self)
    where
        V: Emptiness,
    {
        self.data.write().retain(|_, v| !v.is_nil_value());
    }

    /// Whether every entry of `self` is present in `other` with an equal
    /// value.
    pub fn is_sub_of<M2: Mode, S2>(&self, other: &HashMap<K, V, M2, S2>) -> bool
    where
        K: Clone,
        V: Clone + PartialEq,
        S2: BuildHasher + Clone,
    {
        if same_container(self, other) {
            return true;
        }
        let theirs = other.map_copy();
        let ours = self.data.read();
        ours.iter()
            .all(|(k, v)| theirs.get(k).map_or(false, |o| o == v))
    }

    /// Keys added, removed and updated going from `self` to `other`.
    pub fn diff<M2: Mode, S2>(&self, other: &HashMap<K, V, M2, S2>) -> Diff<K>
    where
        K: Clone,
        V: Clone + PartialEq,
        S2: BuildHasher + Clone,
    {
        if same_container(self, other) {
            return Diff::default();
        }
        let theirs = other.map_copy();
        let ours = self.data.read();
        let mut diff = Diff::default();
        for (k, v) in ours.iter() {
            match theirs.get(k) {
                None => diff.removed.push(k.clone()),
                Some(o) if o != v => diff.updated.push(k.clone()),
                Some(_) => {}
            }
        }
        for k in theirs.keys() {
            if !ours.contains_key(k) {
                diff.added.push(k.clone());
            }
        }
        diff
    }
}

/// Whether two container references point at the same object.
pub(crate) fn same_container<A, B>(a: &A, b: &B) -> bool {
    core::ptr::eq(a as *const A as *const u8, b as *const B as *const u8)
}

impl<K, V, S> HashMap<K, V, Unsync, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Live, mutable view of the backing storage. Changes made through the
    /// returned borrow are changes to this map. Any other call on the map
    /// panics while the borrow is alive.
    pub fn map(&self) -> RefMut<'_, RawMap<K, V, S>> {
        self.data.borrow_mut()
    }
}

impl<K, V, S> HashMap<K, V, Safe, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Copy of the backing storage. A safe map never hands out its storage.
    pub fn map(&self) -> RawMap<K, V, S> {
        self.map_copy()
    }
}

impl<K, V, M, S> Clone for HashMap<K, V, M, S>
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

impl<K, V, M, S> fmt::Debug for HashMap<K, V, M, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
    M: Mode,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.data.read().iter()).finish()
    }
}

impl<K, V, M, S> From<RawMap<K, V, S>> for HashMap<K, V, M, S>
where
    K: Eq + Hash,
    M: Mode,
    S: BuildHasher + Clone,
{
    fn from(map: RawMap<K, V, S>) -> Self {
        Self::from_map(map)
    }
}

impl<K, V, M, S> FromIterator<(K, V)> for HashMap<K, V, M, S>
where
    K: Eq + Hash,
    M: Mode,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = RawMap::with_hasher(S::default());
        map.extend(iter);
        Self::from_map(map)
    }
}

#[cfg(feature = "serde")]
impl<K, V, M, S> serde::Serialize for HashMap<K, V, M, S>
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
impl<'de, K, V, M, S> serde::Deserialize<'de> for HashMap<K, V, M, S>
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
impl<K, V, M, S> HashMap<K, V, M, S>
where
    K: Eq + Hash,
    M: Mode,
    S: BuildHasher + Clone,
{
    /// Decode a map and merge it into the current contents. Nothing is
    /// written when decoding fails.
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn kv(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn search_before_and_after_set() {
        let m: StrIntMap = HashMap::new();
        assert_eq!(m.search("a"), None);
        assert_eq!(m.get("a"), 0);
        assert_eq!(m.set("a".to_string(), 0), None);
        assert_eq!(m.search("a"), Some(0));
        assert_eq!(m.set("a".to_string(), 2), Some(0));
        assert_eq!(m.get("a"), 2);
        assert!(m.contains("a"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn absent_any_value_is_null() {
        let m: AnyAnyMap = HashMap::new();
        assert_eq!(m.get(&Value::from(1)), Value::Null);
        assert!(m.get_var(&Value::from(1)).is_nil());
        m.set(Value::from(1), Value::from("one"));
        assert_eq!(m.get_var(&Value::from(1)).to_string(), "one");
    }

    #[test]
    fn remove_twice() {
        let m: IntIntMap = HashMap::new();
        m.set(1, 10);
        assert_eq!(m.remove(&1), Some(10));
        assert_eq!(m.remove(&1), None);
        assert!(m.is_empty());
    }

    #[test]
    fn remove_many_ignores_absent_keys() {
        let m: IntIntMap = (0..5).map(|i| (i, i)).collect();
        m.remove_many(&[1i64, 3, 9]);
        let mut keys = m.keys();
        keys.sort();
        assert_eq!(keys, vec![0, 2, 4]);
    }

    #[test]
    fn lazy_family_only_writes_when_absent() {
        let m: StrStrMap = HashMap::new();
        assert_eq!(m.get_or_set("k".into(), "v1".into()), "v1");
        assert_eq!(m.get_or_set("k".into(), "v2".into()), "v1");

        let calls = AtomicUsize::new(0);
        let make = || {
            calls.fetch_add(1, Ordering::SeqCst);
            "lazy".to_string()
        };
        assert_eq!(m.get_or_set_with("k".into(), make), "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(m.get_or_set_with_lock("k2".into(), make), "lazy");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(!m.set_if_absent("k".into(), "x".into()));
        assert!(m.set_if_absent("k3".into(), "x".into()));
        assert!(!m.set_if_absent_with("k3".into(), make));
        assert!(m.set_if_absent_with("k4".into(), make));
        assert!(!m.set_if_absent_with_lock("k4".into(), make));
        assert!(m.set_if_absent_with_lock("k5".into(), make));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(m.get("k5"), "lazy");
    }

    #[test]
    fn get_or_set_with_lock_runs_once_across_threads() {
        let m: IntIntMap = HashMap::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(8);
        let seen: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let (m, calls, barrier) = (&m, &calls, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        m.get_or_set_with_lock(7, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            100 + i
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.iter().all(|v| *v == seen[0]));
        assert_eq!(m.get(&7), seen[0]);
    }

    #[test]
    fn pops_clamps_and_handles_zero_and_all() {
        let m: IntIntMap = (0..10).map(|i| (i, i * i)).collect();
        assert!(m.pops(0).is_empty());
        assert_eq!(m.len(), 10);

        let some = m.pops(3);
        assert_eq!(some.len(), 3);
        assert_eq!(m.len(), 7);
        for (k, v) in &some {
            assert_eq!(*v, k * k);
            assert!(!m.contains(k));
        }

        assert_eq!(m.pops(100).len(), 7);
        assert!(m.is_empty());

        m.set_many((0..4).map(|i| (i, i)));
        assert_eq!(m.pops(-1).len(), 4);
        assert!(m.is_empty());
        assert!(m.pop().is_none());
    }

    #[test]
    fn pop_removes_what_it_returns() {
        let m: StrStrMap = [kv("a", "1"), kv("b", "2")].into_iter().collect();
        let (k, v) = m.pop().unwrap();
        assert!(!m.contains(&k));
        assert_eq!(m.len(), 1);
        assert!((k == "a" && v == "1") || (k == "b" && v == "2"));
    }

    #[test]
    fn iterate_stops_early() {
        let m: IntIntMap = (0..10).map(|i| (i, i)).collect();
        let mut visited = 0;
        m.iterate(|_, _| {
            visited += 1;
            visited < 3
        });
        assert_eq!(visited, 3);
    }

    #[test]
    fn clone_is_deep() {
        let m: AnyAnyMap = HashMap::new();
        m.set(Value::from(1), Value::from(1));
        m.set(Value::from("key1"), Value::from("val1"));
        let copy = m.clone();
        m.remove(&Value::from(1));
        assert!(copy.contains(&Value::from(1)));
        assert_eq!(copy.len(), 2);
        copy.set(Value::from("key2"), Value::from("val2"));
        assert!(!m.contains(&Value::from("key2")));

        let unsync: AnyAnyMap<Unsync> = m.clone_as();
        assert!(!unsync.is_safe());
        assert!(m.is_safe());
        assert_eq!(unsync.len(), 1);
    }

    #[test]
    fn unsync_map_aliases_storage() {
        let m: StrStrMap<Unsync> = HashMap::new();
        m.set("a".into(), "1".into());
        m.map().insert("b".into(), "2".into());
        assert_eq!(m.get("b"), "2");

        let safe: StrStrMap = HashMap::new();
        safe.set("a".into(), "1".into());
        safe.map().insert("b".into(), "2".into());
        assert!(!safe.contains("b"));
        assert_eq!(safe.map_copy().len(), 1);
    }

    #[test]
    fn flip_swaps_keys_and_values() {
        let m: StrStrMap = [kv("k1", "v1"), kv("k2", "v2")].into_iter().collect();
        m.flip();
        assert_eq!(m.get("v1"), "k1");
        assert_eq!(m.get("v2"), "k2");
        assert_eq!(m.len(), 2);

        let any: StrAnyMap = HashMap::new();
        any.set("a".into(), Value::from(1));
        any.flip();
        assert_eq!(any.get("1"), Value::from("a"));
    }

    #[test]
    fn merge_and_self_merge() {
        let m1: StrStrMap = [kv("key1", "val1")].into_iter().collect();
        let m2: StrStrMap<Unsync> = [kv("key2", "val2")].into_iter().collect();
        m1.merge(&m2);
        assert_eq!(m1.len(), 2);
        assert_eq!(m1.get("key1"), "val1");
        assert_eq!(m1.get("key2"), "val2");

        m1.merge(&m1);
        assert_eq!(m1.len(), 2);
    }

    #[test]
    fn filter_empty_and_nil() {
        let m: StrAnyMap = HashMap::new();
        m.set("zero".into(), Value::from(0));
        m.set("null".into(), Value::Null);
        m.set("empty".into(), Value::from(""));
        m.set("one".into(), Value::from(1));
        m.filter_nil();
        assert_eq!(m.len(), 3);
        assert!(!m.contains("null"));
        m.filter_empty();
        assert_eq!(m.keys(), vec!["one".to_string()]);

        let opt: HashMap<i64, Option<i64>> = HashMap::new();
        opt.set(1, None);
        opt.set(2, Some(0));
        opt.filter_nil();
        assert_eq!(opt.keys(), vec![2]);
    }

    #[test]
    fn sub_and_diff() {
        let a: IntIntMap = [(1, 1), (2, 2)].into_iter().collect();
        let b: IntIntMap = [(1, 1), (2, 3), (4, 4)].into_iter().collect();
        assert!(!a.is_sub_of(&b));
        let c: IntIntMap = [(1, 1)].into_iter().collect();
        assert!(c.is_sub_of(&b));
        assert!(a.is_sub_of(&a));

        let d = a.diff(&b);
        assert_eq!(d.added, vec![4]);
        assert!(d.removed.is_empty());
        assert_eq!(d.updated, vec![2]);
        assert_eq!(a.diff(&a), Diff::default());
    }

    #[test]
    fn clear_replace_and_closures() {
        let m: IntIntMap = (0..3).map(|i| (i, i)).collect();
        let sum = m.with_read(|data| data.values().sum::<i64>());
        assert_eq!(sum, 3);
        m.with_write(|data| data.insert(9, 9));
        assert_eq!(m.get(&9), 9);
        let mut fresh = RawMap::default();
        fresh.insert(5, 5);
        m.replace(fresh);
        assert_eq!(m.keys(), vec![5]);
        m.clear();
        assert!(m.is_empty());
        assert!(m.into_inner().is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_merges_into_existing() {
        let m: StrIntMap = HashMap::new();
        m.set("a".into(), 1);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"a":1}"#);

        let mut de = serde_json::Deserializer::from_str(r#"{"b":2,"a":3}"#);
        m.merge_from(&mut de).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.get("a"), 3);

        let mut bad = serde_json::Deserializer::from_str(r#"{"c":"x"}"#);
        assert!(m.merge_from(&mut bad).is_err());
        assert!(!m.contains("c"));

        let decoded: StrIntMap<Unsync> = serde_json::from_str(r#"{"x":9}"#).unwrap();
        assert_eq!(decoded.get("x"), 9);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_writes_null_and_list_keys_as_text() {
        let m: AnyAnyMap = HashMap::new();
        m.set(Value::Null, Value::from(1));
        assert_eq!(serde_json::to_string(&m).unwrap(), r#"{"":1}"#);

        m.clear();
        m.set(Value::List(vec![Value::from(1), Value::from("a")]), Value::Null);
        assert_eq!(serde_json::to_string(&m).unwrap(), r#"{"[1,\"a\"]":null}"#);

        let back: AnyAnyMap = serde_json::from_str(r#"{"":1}"#).unwrap();
        assert_eq!(back.get(&Value::from("")), Value::from(1));
    }

    // A hasher with no `Default` impl.
    #[derive(Clone)]
    struct Seeded(RandomState);

    impl BuildHasher for Seeded {
        type Hasher = <RandomState as BuildHasher>::Hasher;
        fn build_hasher(&self) -> Self::Hasher {
            self.0.build_hasher()
        }
    }

    #[test]
    fn hasher_without_default() {
        let raw: RawMap<i64, i64, Seeded> = RawMap::with_hasher(Seeded(RandomState::new()));
        let m: HashMap<i64, i64, Unsync, Seeded> = HashMap::from_map(raw);
        m.set(1, 10);
        let n: HashMap<i64, i64, Safe, Seeded> = HashMap::with_hasher(Seeded(RandomState::new()));
        n.merge(&m);
        assert!(m.is_sub_of(&n));
        assert_eq!(n.clone().map().len(), 1);
        m.flip();
        assert_eq!(m.get(&10), 1);
    }
}
