//! TreeMap: a lock-guarded ordered map over an AVL tree.
//!
//! Keys are ordered by a [`Comparator`] fixed at construction (or swapped
//! by [`flip`](TreeMap::flip)). Lookups, `ceiling` and `floor` are
//! O(log n); `keys`, `values`, `entries`, `pop` and plain iteration follow
//! ascending comparator order.
//!
//! Bounded iteration starts from an arbitrary key:
//! - ascending: at the ceiling of the key when `inclusive`, else at its
//!   strict successor;
//! - descending: at the floor of the key when `inclusive`, else at its
//!   strict predecessor.

use crate::avl::AvlTree;
use crate::comparator::{self, Comparator};
use crate::convert::{Coerce, Emptiness};
use crate::hash_map::{same_container, Diff};
use crate::mode::{Mode, RwCell, Safe};
use crate::value::Value;
use crate::var::Var;
use core::fmt;

pub use crate::avl::Iter;

pub type IntAnyTreeMap<M = Safe> = TreeMap<i64, Value, M>;
pub type StrAnyTreeMap<M = Safe> = TreeMap<String, Value, M>;
pub type AnyAnyTreeMap<M = Safe> = TreeMap<Value, Value, M>;

pub struct TreeMap<K, V, M: Mode = Safe> {
    data: M::Lock<AvlTree<K, V>>,
}

impl<K, V, M: Mode> TreeMap<K, V, M>
where
    K: Ord + 'static,
{
    /// Empty map in `Ord` order.
    pub fn new() -> Self {
        Self::with_comparator(comparator::natural())
    }
}

impl<K, V, M: Mode> Default for TreeMap<K, V, M>
where
    K: Ord + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn drive<K, V, F>(iter: Iter<'_, K, V>, mut f: F)
where
    F: FnMut(&K, &V) -> bool,
{
    for (k, v) in iter {
        if !f(k, v) {
            break;
        }
    }
}

fn owned<K: Clone, V: Clone>((k, v): (&K, &V)) -> (K, V) {
    (k.clone(), v.clone())
}

impl<K, V, M: Mode> TreeMap<K, V, M> {
    pub fn with_comparator(cmp: Comparator<K>) -> Self {
        Self {
            data: RwCell::new(AvlTree::new(cmp)),
        }
    }

    pub fn from_pairs<I>(cmp: Comparator<K>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let map = Self::with_comparator(cmp);
        map.set_many(entries);
        map
    }

    pub fn is_safe(&self) -> bool {
        M::SAFE
    }

    pub fn comparator(&self) -> Comparator<K> {
        self.data.read().comparator().clone()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Height of the tree; `0` when empty.
    pub fn height(&self) -> usize {
        self.data.read().height()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.data.read().contains_key(key)
    }

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
    pub fn get(&self, key: &K) -> V
    where
        V: Clone + Default,
    {
        self.search(key).unwrap_or_default()
    }

    pub fn search(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.data.read().get(key).cloned()
    }

    pub fn get_var(&self, key: &K) -> Var
    where
        V: Clone + Into<Value>,
    {
        Var::new(self.search(key).map_or(Value::Null, Into::into))
    }

    pub fn get_or_set(&self, key: K, value: V) -> V
    where
        V: Clone,
    {
        self.get_or_set_with_lock(key, || value)
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
        if let Some(v) = data.get(&key) {
            tracing::trace!("get_or_set_with: key stored concurrently, dropping computed value");
            return v.clone();
        }
        data.insert(key, value.clone());
        value
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
        let mut data = self.data.write();
        if let Some(v) = data.get(&key) {
            return v.clone();
        }
        let value = default();
        data.insert(key, value.clone());
        value
    }

    pub fn set_if_absent(&self, key: K, value: V) -> bool {
        self.set_if_absent_with_lock(key, || value)
    }

    pub fn set_if_absent_with<F>(&self, key: K, default: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains(&key) {
            return false;
        }
        let value = default();
        let mut data = self.data.write();
        if data.contains_key(&key) {
            return false;
        }
        data.insert(key, value);
        true
    }

    pub fn set_if_absent_with_lock<F>(&self, key: K, default: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains(&key) {
            return false;
        }
        let mut data = self.data.write();
        if data.contains_key(&key) {
            return false;
        }
        data.insert(key, default());
        true
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.data.write().remove(key).map(|(_, v)| v)
    }

    pub fn remove_many<'q, I>(&self, keys: I)
    where
        K: 'q,
        I: IntoIterator<Item = &'q K>,
    {
        let mut data = self.data.write();
        for key in keys {
            data.remove(key);
        }
    }

    /// Remove and return the smallest entry.
    pub fn pop(&self) -> Option<(K, V)> {
        self.data.write().pop_first()
    }

    /// Remove up to `n` of the smallest entries, ascending. A negative `n`
    /// removes all; `0` removes nothing.
    pub fn pops(&self, n: isize) -> Vec<(K, V)> {
        let mut data = self.data.write();
        let want = usize::try_from(n).map_or(data.len(), |n| n.min(data.len()));
        if want == data.len() {
            return data.drain();
        }
        let mut out = Vec::with_capacity(want);
        while out.len() < want {
            match data.pop_first() {
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

    /// Ascending copy of every entry.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.data.read().iter().map(owned).collect()
    }

    /// Same as [`entries`](TreeMap::entries): a copy, in either mode.
    pub fn map(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.entries()
    }

    pub fn iterate<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.iterate_asc(f)
    }

    /// Visit entries in ascending order under the read lock until `f`
    /// returns `false`.
    pub fn iterate_asc<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        drive(self.data.read().iter(), f)
    }

    pub fn iterate_desc<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        drive(self.data.read().iter_rev(), f)
    }

    /// Same as [`iterate_asc_from`](TreeMap::iterate_asc_from).
    pub fn iterate_from<F>(&self, key: &K, inclusive: bool, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.iterate_asc_from(key, inclusive, f)
    }

    pub fn iterate_asc_from<F>(&self, key: &K, inclusive: bool, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        drive(self.data.read().iter_from(key, inclusive), f)
    }

    pub fn iterate_desc_from<F>(&self, key: &K, inclusive: bool, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        drive(self.data.read().iter_rev_from(key, inclusive), f)
    }

    /// Smallest entry with a key `>= key`.
    pub fn ceiling(&self, key: &K) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.data.read().ceiling(key, true).map(owned)
    }

    /// Largest entry with a key `<= key`.
    pub fn floor(&self, key: &K) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.data.read().floor(key, true).map(owned)
    }

    /// Smallest entry.
    pub fn left(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.data.read().first().map(owned)
    }

    /// Largest entry.
    pub fn right(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.data.read().last().map(owned)
    }

    pub fn clone_as<M2: Mode>(&self) -> TreeMap<K, V, M2>
    where
        K: Clone,
        V: Clone,
    {
        TreeMap {
            data: RwCell::new(self.data.read().clone()),
        }
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// Replace the contents with `entries`, keeping the comparator.
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

    /// Rebuild with keys and values swapped, ordered by `cmp` (or the
    /// current comparator when `None`). On value collisions the entry with
    /// the larger old key wins.
    pub fn flip(&self, cmp: Option<Comparator<K>>)
    where
        K: Coerce<V>,
        V: Coerce<K>,
    {
        let mut data = self.data.write();
        let entries = data.drain();
        if let Some(cmp) = cmp {
            data.set_comparator(cmp);
        }
        tracing::debug!(entries = entries.len(), "flip: rebuilding tree");
        for (k, v) in entries {
            data.insert(v.coerce(), k.coerce());
        }
    }

    /// Copy every entry of `other` into `self`, overwriting on collision.
    /// Merging a map into itself is a no-op.
    pub fn merge<M2: Mode>(&self, other: &TreeMap<K, V, M2>)
    where
        K: Clone,
        V: Clone,
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

    /// Run `f` over the entries in ascending order under the read lock.
    pub fn with_read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(Iter<'_, K, V>) -> R,
    {
        f(self.data.read().iter())
    }

    /// Hand the entries to `f` as an ascending `Vec` under the write lock,
    /// then reinsert what `f` leaves in it under the comparator. For a key
    /// repeated in the `Vec` the last value wins. The map is left empty if
    /// `f` panics.
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

    /// Consume the map, returning its entries in ascending order.
    pub fn into_inner(self) -> Vec<(K, V)> {
        self.data.into_inner().drain()
    }

    /// Snapshot of `other` re-keyed under this map's comparator.
    fn index_of<M2: Mode>(&self, other: &TreeMap<K, V, M2>) -> AvlTree<K, V>
    where
        K: Clone,
        V: Clone,
    {
        let entries = other.entries();
        let mut index = AvlTree::new(self.comparator());
        for (k, v) in entries {
            index.insert(k, v);
        }
        index
    }

    /// Whether every entry of `self` is present in `other` with an equal
    /// value. Keys are matched with this map's comparator.
    pub fn is_sub_of<M2: Mode>(&self, other: &TreeMap<K, V, M2>) -> bool
    where
        K: Clone,
        V: Clone + PartialEq,
    {
        if same_container(self, other) {
            return true;
        }
        let theirs = self.index_of(other);
        let ours = self.data.read();
        ours.iter()
            .all(|(k, v)| theirs.get(k).map_or(false, |o| o == v))
    }

    /// Keys added, removed and updated going from `self` to `other`, each
    /// list ascending under this map's comparator.
    pub fn diff<M2: Mode>(&self, other: &TreeMap<K, V, M2>) -> Diff<K>
    where
        K: Clone,
        V: Clone + PartialEq,
    {
        if same_container(self, other) {
            return Diff::default();
        }
        let theirs = self.index_of(other);
        let ours = self.data.read();
        let mut diff = Diff::default();
        for (k, v) in ours.iter() {
            match theirs.get(k) {
                None => diff.removed.push(k.clone()),
                Some(o) if o != v => diff.updated.push(k.clone()),
                Some(_) => {}
            }
        }
        for (k, _) in theirs.iter() {
            if !ours.contains_key(k) {
                diff.added.push(k.clone());
            }
        }
        diff
    }

    #[cfg(test)]
    pub(crate) fn check(&self) {
        self.data.read().check();
    }
}

impl<K, V, M> Clone for TreeMap<K, V, M>
where
    K: Clone,
    V: Clone,
    M: Mode,
{
    fn clone(&self) -> Self {
        self.clone_as::<M>()
    }
}

impl<K, V, M> fmt::Debug for TreeMap<K, V, M>
where
    K: fmt::Debug,
    V: fmt::Debug,
    M: Mode,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.data.read().iter()).finish()
    }
}

impl<K, V, M> FromIterator<(K, V)> for TreeMap<K, V, M>
where
    K: Ord + 'static,
    M: Mode,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(comparator::natural(), iter)
    }
}

#[cfg(feature = "serde")]
impl<K, V, M> serde::Serialize for TreeMap<K, V, M>
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

/// Decodes into `Ord` order; use [`TreeMap::merge_from`] on a map built
/// with a custom comparator.
#[cfg(feature = "serde")]
impl<'de, K, V, M> serde::Deserialize<'de> for TreeMap<K, V, M>
where
    K: serde::Deserialize<'de> + Ord + 'static,
    V: serde::Deserialize<'de>,
    M: Mode,
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
impl<K, V, M: Mode> TreeMap<K, V, M> {
    /// Decode a map and merge it into the current contents under the
    /// current comparator. Nothing is written when decoding fails.
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
    use crate::comparator::{by_int, reverse};
    use crate::mode::Unsync;

    fn sample() -> TreeMap<i64, i64> {
        [1, 4, 6, 8, 10, 12, 15, 19, 20]
            .into_iter()
            .map(|k| (k, k * 100))
            .collect()
    }

    #[test]
    fn ceiling_floor_left_right() {
        let t = sample();
        assert_eq!(t.ceiling(&9), Some((10, 1000)));
        assert_eq!(t.floor(&5), Some((4, 400)));
        assert_eq!(t.ceiling(&21), None);
        assert_eq!(t.floor(&0), None);
        assert_eq!(t.left(), Some((1, 100)));
        assert_eq!(t.right(), Some((20, 2000)));
        assert!(TreeMap::<i64, i64>::new().left().is_none());
    }

    #[test]
    fn ordered_views_and_pop() {
        let t: TreeMap<i64, &str, Unsync> = TreeMap::new();
        for (k, v) in [(3, "c"), (1, "a"), (2, "b")] {
            t.set(k, v);
        }
        assert_eq!(t.keys(), vec![1, 2, 3]);
        assert_eq!(t.values(), vec!["a", "b", "c"]);
        assert_eq!(t.pop(), Some((1, "a")));
        assert!(t.pops(0).is_empty());
        assert_eq!(t.pops(-1), vec![(2, "b"), (3, "c")]);
        assert!(t.is_empty());
        assert_eq!(t.get(&7), "");
    }

    #[test]
    fn bounded_iteration_with_early_stop() {
        let t = sample();
        let mut seen = Vec::new();
        t.iterate_from(&8, false, |k, _| {
            seen.push(*k);
            seen.len() < 3
        });
        assert_eq!(seen, vec![10, 12, 15]);

        seen.clear();
        t.iterate_desc_from(&9, true, |k, _| {
            seen.push(*k);
            true
        });
        assert_eq!(seen, vec![8, 6, 4, 1]);

        seen.clear();
        t.iterate_desc(|k, _| {
            seen.push(*k);
            *k > 15
        });
        assert_eq!(seen, vec![20, 19, 15]);
    }

    #[test]
    fn custom_comparator_orders_keys() {
        let t: TreeMap<i64, i64> = TreeMap::from_pairs(reverse(), (1..=5).map(|k| (k, k)));
        assert_eq!(t.keys(), vec![5, 4, 3, 2, 1]);
        // Under reverse order, "ceiling" walks toward smaller integers.
        assert_eq!(t.ceiling(&0), None);
        assert_eq!(t.ceiling(&6), Some((5, 5)));
        t.check();
    }

    #[test]
    fn lazy_family() {
        let t: TreeMap<String, i64> = TreeMap::new();
        let mut calls = 0;
        assert_eq!(t.get_or_set_with_lock("a".into(), || { calls += 1; 1 }), 1);
        assert_eq!(t.get_or_set_with_lock("a".into(), || { calls += 1; 2 }), 1);
        assert_eq!(calls, 1);
        assert_eq!(t.get_or_set("b".into(), 2), 2);
        assert_eq!(t.get_or_set_with("b".into(), || 3), 2);
        assert!(t.set_if_absent("c".into(), 3));
        assert!(!t.set_if_absent_with("c".into(), || 4));
        assert!(!t.set_if_absent_with_lock("a".into(), || 4));
        assert_eq!(t.keys(), vec!["a", "b", "c"]);
        t.remove_many([&"a".to_string(), &"zz".to_string()]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn flip_with_and_without_comparator() {
        let t: TreeMap<Value, Value> = TreeMap::new();
        t.set(Value::from("k1"), Value::from("v1"));
        t.set(Value::from("k2"), Value::from("v2"));
        t.flip(None);
        assert_eq!(t.get(&Value::from("v1")), Value::from("k1"));
        assert_eq!(t.keys(), vec![Value::from("v1"), Value::from("v2")]);

        let n: TreeMap<Value, Value> = TreeMap::new();
        n.set(Value::from(10), Value::from("9"));
        n.set(Value::from(20), Value::from("10"));
        n.flip(Some(by_int()));
        // Integer order: "9" before "10".
        assert_eq!(n.keys(), vec![Value::from("9"), Value::from("10")]);
        n.check();
    }

    #[test]
    fn merge_clone_and_filters() {
        let a = sample();
        let b: TreeMap<i64, i64, Unsync> = [(4, 0), (100, 1)].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.get(&4), 0);
        assert_eq!(a.len(), 10);
        a.merge(&a);
        assert_eq!(a.len(), 10);

        let c = a.clone();
        a.filter_empty();
        assert!(!a.contains(&4));
        assert!(c.contains(&4));
        assert_eq!(c.height(), c.clone_as::<Unsync>().height());

        let nils: TreeMap<i64, Option<i64>> = [(1, None), (2, Some(0)), (3, Some(3))].into_iter().collect();
        nils.filter_nil();
        assert_eq!(nils.keys(), vec![2, 3]);
        nils.filter_empty();
        assert_eq!(nils.keys(), vec![3]);
    }

    #[test]
    fn with_read_and_with_write() {
        let t = sample();
        let sum: i64 = t.with_read(|it| it.map(|(_, v)| *v).sum());
        assert_eq!(sum, 9500);

        let dropped = t.with_write(|entries| {
            let before = entries.len();
            entries.retain(|(k, _)| k % 2 == 0);
            entries.push((3, 300));
            before - entries.len()
        });
        assert_eq!(dropped, 2);
        assert_eq!(t.keys(), vec![3, 4, 6, 8, 10, 12, 20]);
        t.check();
        assert_eq!(t.into_inner().first(), Some(&(3, 300)));
    }

    #[test]
    fn sub_and_diff() {
        let a = sample();
        let b: TreeMap<i64, i64, Unsync> = [(1, 100), (4, 0), (99, 1)].into_iter().collect();
        assert!(!a.is_sub_of(&b));
        assert!(a.is_sub_of(&a));
        let small: TreeMap<i64, i64, Unsync> = [(10, 1000), (20, 2000)].into_iter().collect();
        assert!(small.is_sub_of(&a));

        let d = a.diff(&b);
        assert_eq!(d.added, vec![99]);
        assert_eq!(d.removed, vec![6, 8, 10, 12, 15, 19, 20]);
        assert_eq!(d.updated, vec![4]);
        assert_eq!(b.diff(&b), Diff::default());
    }

    #[test]
    fn get_var_wraps_value() {
        let t: IntAnyTreeMap = TreeMap::new();
        t.set(1, Value::from("x"));
        assert_eq!(t.get_var(&1).val(), Value::from("x"));
        assert!(t.get_var(&2).is_nil());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_is_ascending() {
        let t: TreeMap<String, i64> = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), r#"{"a":1,"b":2}"#);

        let r: TreeMap<String, i64> = TreeMap::with_comparator(reverse());
        let mut de = serde_json::Deserializer::from_str(r#"{"a":1,"c":3,"b":2}"#);
        r.merge_from(&mut de).unwrap();
        assert_eq!(r.keys(), vec!["c", "b", "a"]);

        let mut bad = serde_json::Deserializer::from_str(r#"{"z":"nope"}"#);
        assert!(r.merge_from(&mut bad).is_err());
        assert_eq!(r.len(), 3);
    }
}
