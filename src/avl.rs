//! AvlTree: the ordered storage behind `TreeMap`.
//!
//! Nodes are uniquely owned boxes; each one caches the height of its
//! subtree. All ordering goes through the tree's [`Comparator`]; mutations
//! are recursive on the way down and rebalance on the way back up.
//!
//! Invariants (checked by `check` in tests):
//! - in-order traversal is strictly increasing under the comparator;
//! - every node's cached height is `1 + max(child heights)`;
//! - the heights of two siblings differ by at most one.

use crate::comparator::Comparator;
use core::cmp::Ordering;

type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    height: u8,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Box<Self> {
        Box::new(Node {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        })
    }

    fn balance(&self) -> i16 {
        height(&self.left) as i16 - height(&self.right) as i16
    }

    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }
}

fn height<K, V>(link: &Link<K, V>) -> u8 {
    link.as_ref().map_or(0, |n| n.height)
}

fn rotate_right<K, V>(mut root: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let mut pivot = root.left.take().expect("rotate_right needs a left child");
    root.left = pivot.right.take();
    root.update();
    pivot.right = Some(root);
    pivot.update();
    pivot
}

fn rotate_left<K, V>(mut root: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let mut pivot = root.right.take().expect("rotate_left needs a right child");
    root.right = pivot.left.take();
    root.update();
    pivot.left = Some(root);
    pivot.update();
    pivot
}

/// Restore the AVL condition at `node`, whose children are balanced and
/// differ in height by at most two.
fn rebalance<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    node.update();
    let bal = node.balance();
    if bal > 1 {
        if node.left.as_ref().is_some_and(|l| l.balance() < 0) {
            let left = node.left.take().expect("left-heavy node has a left child");
            node.left = Some(rotate_left(left));
        }
        return rotate_right(node);
    }
    if bal < -1 {
        if node.right.as_ref().is_some_and(|r| r.balance() > 0) {
            let right = node.right.take().expect("right-heavy node has a right child");
            node.right = Some(rotate_right(right));
        }
        return rotate_left(node);
    }
    node
}

type Cmp<K> = dyn Fn(&K, &K) -> Ordering + Send + Sync;

fn insert<K, V>(link: Link<K, V>, key: K, value: V, cmp: &Cmp<K>) -> (Box<Node<K, V>>, Option<V>) {
    let mut node = match link {
        None => return (Node::leaf(key, value), None),
        Some(node) => node,
    };
    let old = match cmp(&key, &node.key) {
        Ordering::Equal => return replace_value(node, value),
        Ordering::Less => {
            let (child, old) = insert(node.left.take(), key, value, cmp);
            node.left = Some(child);
            old
        }
        Ordering::Greater => {
            let (child, old) = insert(node.right.take(), key, value, cmp);
            node.right = Some(child);
            old
        }
    };
    (rebalance(node), old)
}

fn replace_value<K, V>(mut node: Box<Node<K, V>>, value: V) -> (Box<Node<K, V>>, Option<V>) {
    let old = core::mem::replace(&mut node.value, value);
    (node, Some(old))
}

/// Detach the minimum node of the subtree. Returns the remaining subtree
/// and the detached node (with empty child links).
fn remove_min<K, V>(mut node: Box<Node<K, V>>) -> (Link<K, V>, Box<Node<K, V>>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            node.height = 1;
            (rest, node)
        }
        Some(left) => {
            let (rest, min) = remove_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

fn remove<K, V>(link: Link<K, V>, key: &K, cmp: &Cmp<K>) -> (Link<K, V>, Option<(K, V)>) {
    let mut node = match link {
        None => return (None, None),
        Some(node) => node,
    };
    match cmp(key, &node.key) {
        Ordering::Less => {
            let (child, out) = remove(node.left.take(), key, cmp);
            node.left = child;
            (Some(rebalance(node)), out)
        }
        Ordering::Greater => {
            let (child, out) = remove(node.right.take(), key, cmp);
            node.right = child;
            (Some(rebalance(node)), out)
        }
        Ordering::Equal => {
            let Node {
                key, value, left, right, ..
            } = *node;
            let rest = match (left, right) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                // Two children: the in-order successor takes this place.
                (Some(left), Some(right)) => {
                    let (right, mut successor) = remove_min(right);
                    successor.left = Some(left);
                    successor.right = right;
                    Some(rebalance(successor))
                }
            };
            (rest, Some((key, value)))
        }
    }
}

fn collect<K, V>(link: Link<K, V>, out: &mut Vec<(K, V)>) {
    if let Some(node) = link {
        let Node {
            key, value, left, right, ..
        } = *node;
        collect(left, out);
        out.push((key, value));
        collect(right, out);
    }
}

/// Perfectly balanced tree over the next `n` items of a sorted sequence.
fn build<K, V, I>(items: &mut I, n: usize) -> Link<K, V>
where
    I: Iterator<Item = (K, V)>,
{
    if n == 0 {
        return None;
    }
    let left = build(items, n / 2);
    let (key, value) = items.next()?;
    let right = build(items, n - n / 2 - 1);
    let mut node = Box::new(Node {
        key,
        value,
        height: 1,
        left,
        right,
    });
    node.update();
    Some(node)
}

#[derive(Clone)]
pub(crate) struct AvlTree<K, V> {
    root: Link<K, V>,
    len: usize,
    cmp: Comparator<K>,
}

impl<K, V> AvlTree<K, V> {
    pub(crate) fn new(cmp: Comparator<K>) -> Self {
        Self {
            root: None,
            len: 0,
            cmp,
        }
    }

    pub(crate) fn comparator(&self) -> &Comparator<K> {
        &self.cmp
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn height(&self) -> usize {
        height(&self.root) as usize
    }

    fn find(&self, key: &K) -> Option<&Node<K, V>> {
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            cur = match (self.cmp)(key, &n.key) {
                Ordering::Equal => return Some(n),
                Ordering::Less => n.left.as_deref(),
                Ordering::Greater => n.right.as_deref(),
            };
        }
        None
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|n| &n.value)
    }

    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (root, old) = insert(self.root.take(), key, value, &*self.cmp);
        self.root = Some(root);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let (root, out) = remove(self.root.take(), key, &*self.cmp);
        self.root = root;
        if out.is_some() {
            self.len -= 1;
        }
        out
    }

    /// Remove and return the smallest entry.
    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        let root = self.root.take()?;
        let (rest, min) = remove_min(root);
        self.root = rest;
        self.len -= 1;
        let Node { key, value, .. } = *min;
        Some((key, value))
    }

    pub(crate) fn first(&self) -> Option<(&K, &V)> {
        let mut cur = self.root.as_deref()?;
        while let Some(l) = cur.left.as_deref() {
            cur = l;
        }
        Some((&cur.key, &cur.value))
    }

    pub(crate) fn last(&self) -> Option<(&K, &V)> {
        let mut cur = self.root.as_deref()?;
        while let Some(r) = cur.right.as_deref() {
            cur = r;
        }
        Some((&cur.key, &cur.value))
    }

    /// Smallest entry `>= key` (`> key` when `inclusive` is false).
    pub(crate) fn ceiling(&self, key: &K, inclusive: bool) -> Option<(&K, &V)> {
        let mut best = None;
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            match (self.cmp)(&n.key, key) {
                Ordering::Equal if inclusive => return Some((&n.key, &n.value)),
                Ordering::Greater => {
                    best = Some(n);
                    cur = n.left.as_deref();
                }
                _ => cur = n.right.as_deref(),
            }
        }
        best.map(|n| (&n.key, &n.value))
    }

    /// Largest entry `<= key` (`< key` when `inclusive` is false).
    pub(crate) fn floor(&self, key: &K, inclusive: bool) -> Option<(&K, &V)> {
        let mut best = None;
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            match (self.cmp)(&n.key, key) {
                Ordering::Equal if inclusive => return Some((&n.key, &n.value)),
                Ordering::Less => {
                    best = Some(n);
                    cur = n.right.as_deref();
                }
                _ => cur = n.left.as_deref(),
            }
        }
        best.map(|n| (&n.key, &n.value))
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        let mut it = Iter::empty(true);
        it.push_spine(self.root.as_deref());
        it
    }

    pub(crate) fn iter_rev(&self) -> Iter<'_, K, V> {
        let mut it = Iter::empty(false);
        it.push_spine(self.root.as_deref());
        it
    }

    /// Ascending from the ceiling of `key` (or its strict successor).
    pub(crate) fn iter_from(&self, key: &K, inclusive: bool) -> Iter<'_, K, V> {
        let mut it = Iter::empty(true);
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            let ord = (self.cmp)(&n.key, key);
            if ord == Ordering::Greater || (inclusive && ord == Ordering::Equal) {
                it.stack.push(n);
                cur = n.left.as_deref();
            } else {
                cur = n.right.as_deref();
            }
        }
        it
    }

    /// Descending from the floor of `key` (or its strict predecessor).
    pub(crate) fn iter_rev_from(&self, key: &K, inclusive: bool) -> Iter<'_, K, V> {
        let mut it = Iter::empty(false);
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            let ord = (self.cmp)(&n.key, key);
            if ord == Ordering::Less || (inclusive && ord == Ordering::Equal) {
                it.stack.push(n);
                cur = n.right.as_deref();
            } else {
                cur = n.left.as_deref();
            }
        }
        it
    }

    pub(crate) fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Remove every entry, returning them in ascending order.
    pub(crate) fn drain(&mut self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.len);
        collect(self.root.take(), &mut out);
        self.len = 0;
        out
    }

    /// Replace the contents with `sorted`, which must be strictly
    /// increasing under the comparator.
    fn rebuild_sorted(&mut self, sorted: Vec<(K, V)>) {
        let n = sorted.len();
        self.root = build(&mut sorted.into_iter(), n);
        self.len = n;
    }

    /// Keep only entries for which `keep` returns true. Linear time.
    pub(crate) fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let before = self.len;
        let mut entries = self.drain();
        entries.retain(|(k, v)| keep(k, v));
        if entries.len() != before {
            tracing::trace!(before, after = entries.len(), "avl: rebuilt after retain");
        }
        self.rebuild_sorted(entries);
    }

    /// Switch to `cmp` and re-sort every entry under it.
    pub(crate) fn set_comparator(&mut self, cmp: Comparator<K>) {
        let entries = self.drain();
        self.cmp = cmp;
        for (k, v) in entries {
            self.insert(k, v);
        }
    }

    #[cfg(test)]
    pub(crate) fn check(&self) {
        fn walk<K, V>(link: &Link<K, V>) -> u8 {
            match link {
                None => 0,
                Some(n) => {
                    let lh = walk(&n.left);
                    let rh = walk(&n.right);
                    assert!((lh as i16 - rh as i16).abs() <= 1, "unbalanced node");
                    assert_eq!(n.height, 1 + lh.max(rh), "stale height");
                    n.height
                }
            }
        }
        walk(&self.root);
        let keys: Vec<&K> = self.iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), self.len, "len out of sync");
        for w in keys.windows(2) {
            assert_eq!((self.cmp)(w[0], w[1]), Ordering::Less, "keys out of order");
        }
    }
}

/// In-order iterator over a tree (or its reverse), holding the path of
/// pending ancestors.
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
    forward: bool,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn empty(forward: bool) -> Self {
        Self {
            stack: Vec::new(),
            forward,
        }
    }

    fn push_spine(&mut self, mut cur: Option<&'a Node<K, V>>) {
        while let Some(n) = cur {
            self.stack.push(n);
            cur = if self.forward {
                n.left.as_deref()
            } else {
                n.right.as_deref()
            };
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let next = if self.forward {
            n.right.as_deref()
        } else {
            n.left.as_deref()
        };
        self.push_spine(next);
        Some((&n.key, &n.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{natural, reverse};

    fn tree(keys: &[i64]) -> AvlTree<i64, i64> {
        let mut t = AvlTree::new(natural());
        for &k in keys {
            t.insert(k, k * 10);
        }
        t.check();
        t
    }

    /// Invariant: ascending inserts stay logarithmic in height.
    #[test]
    fn sequential_inserts_stay_balanced() {
        let keys: Vec<i64> = (0..1000).collect();
        let t = tree(&keys);
        assert_eq!(t.len(), 1000);
        // AVL bound: h < 1.44 log2(n + 2).
        assert!(t.height() <= 14, "height {}", t.height());
        let back: Vec<i64> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(back, keys);
    }

    #[test]
    fn ceiling_and_floor() {
        let t = tree(&[1, 4, 6, 8, 10, 12, 15, 19, 20]);
        assert_eq!(t.ceiling(&9, true).map(|(k, _)| *k), Some(10));
        assert_eq!(t.floor(&5, true).map(|(k, _)| *k), Some(4));
        assert_eq!(t.ceiling(&21, true), None);
        assert_eq!(t.floor(&0, true), None);
        assert_eq!(t.ceiling(&10, true).map(|(k, _)| *k), Some(10));
        assert_eq!(t.ceiling(&10, false).map(|(k, _)| *k), Some(12));
        assert_eq!(t.floor(&10, false).map(|(k, _)| *k), Some(8));
        assert_eq!(t.first().map(|(k, _)| *k), Some(1));
        assert_eq!(t.last().map(|(k, _)| *k), Some(20));
    }

    /// Invariant: removing a node with two children keeps order and
    /// balance.
    #[test]
    fn remove_inner_nodes() {
        let mut t = tree(&(1..=31).collect::<Vec<_>>());
        for k in [16, 8, 24, 4, 12, 1, 31] {
            assert_eq!(t.remove(&k), Some((k, k * 10)));
            t.check();
        }
        assert_eq!(t.remove(&16), None);
        assert_eq!(t.len(), 24);
        assert_eq!(t.pop_first(), Some((2, 20)));
        t.check();
    }

    #[test]
    fn bounded_iteration() {
        fn keys(it: Iter<'_, i64, i64>) -> Vec<i64> {
            it.map(|(k, _)| *k).collect()
        }
        let t = tree(&[1, 4, 6, 8, 10]);
        assert_eq!(keys(t.iter_from(&6, true)), vec![6, 8, 10]);
        assert_eq!(keys(t.iter_from(&6, false)), vec![8, 10]);
        assert_eq!(keys(t.iter_from(&5, false)), vec![6, 8, 10]);
        assert_eq!(keys(t.iter_rev_from(&6, true)), vec![6, 4, 1]);
        assert_eq!(keys(t.iter_rev_from(&6, false)), vec![4, 1]);
        assert_eq!(keys(t.iter_rev()), vec![10, 8, 6, 4, 1]);
        assert!(keys(t.iter_from(&11, true)).is_empty());
    }

    #[test]
    fn retain_and_comparator_switch() {
        let mut t = tree(&(0..20).collect::<Vec<_>>());
        t.retain(|k, _| k % 3 == 0);
        t.check();
        assert_eq!(t.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![0, 3, 6, 9, 12, 15, 18]);
        t.set_comparator(reverse());
        t.check();
        assert_eq!(t.first().map(|(k, _)| *k), Some(18));
        assert_eq!(t.drain().len(), 7);
        assert!(t.is_empty());
        assert_eq!(t.height(), 0);
    }
}
