use dcontainer::{HashMap, ListMap, TreeMap, Unsync};

// Test: an Unsync container panics instead of deadlocking when a callback
// writes to the container it is iterating.
#[test]
fn unsync_reentrant_write_panics() {
    let m: HashMap<i32, i32, Unsync> = (0..3).map(|i| (i, i)).collect();
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        m.iterate(|k, _| {
            m.set(*k + 10, 0);
            true
        });
    }));
    assert!(res.is_err(), "expected a borrow panic");
}

// Test: nested reads are allowed; only writes conflict.
#[test]
fn nested_reads_are_fine() {
    let l: ListMap<i32, i32, Unsync> = (0..3).map(|i| (i, i)).collect();
    let mut total = 0;
    l.iterate(|k, _| {
        total += l.get(k);
        true
    });
    assert_eq!(total, 3);

    let t: TreeMap<i32, i32, Unsync> = (0..3).map(|i| (i, i)).collect();
    let mut n = 0;
    t.iterate(|k, _| {
        n += usize::from(t.contains(k));
        true
    });
    assert_eq!(n, 3);
}

// Test: `*_with` defaults run without a guard and may reenter.
#[test]
fn lazy_default_may_reenter() {
    let m: HashMap<i32, i32, Unsync> = HashMap::new();
    m.set(1, 5);
    let v = m.get_or_set_with(2, || m.get(&1) * 2);
    assert_eq!(v, 10);
}
