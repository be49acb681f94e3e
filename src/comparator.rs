//! Key ordering for [`TreeMap`](crate::TreeMap).
//!
//! A comparator must be a total order over the keys it sees. It is shared
//! (`Arc`) so clones of a tree reuse it.

use crate::convert::Coerce;
use core::cmp::Ordering;
use std::sync::Arc;

pub type Comparator<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// `Ord` order.
pub fn natural<K: Ord + 'static>() -> Comparator<K> {
    Arc::new(|a: &K, b: &K| a.cmp(b))
}

/// Reverse of `Ord` order.
pub fn reverse<K: Ord + 'static>() -> Comparator<K> {
    Arc::new(|a: &K, b: &K| b.cmp(a))
}

/// Compare the string forms of two keys.
pub fn by_string<K: Coerce<String> + 'static>() -> Comparator<K> {
    Arc::new(|a: &K, b: &K| {
        let (a, b): (String, String) = (a.coerce(), b.coerce());
        a.cmp(&b)
    })
}

/// Compare the integer forms of two keys.
pub fn by_int<K: Coerce<i64> + 'static>() -> Comparator<K> {
    Arc::new(|a: &K, b: &K| {
        let (a, b): (i64, i64) = (a.coerce(), b.coerce());
        a.cmp(&b)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn helpers_order_as_named() {
        assert_eq!(natural::<i64>()(&1, &2), Ordering::Less);
        assert_eq!(reverse::<i64>()(&1, &2), Ordering::Greater);
        // "10" < "9" as strings, 10 > 9 as integers.
        let s = by_string::<Value>();
        assert_eq!(s(&Value::from(10), &Value::from(9)), Ordering::Less);
        let i = by_int::<Value>();
        assert_eq!(i(&Value::from("10"), &Value::from(9)), Ordering::Greater);
    }
}
