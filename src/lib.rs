//! dcontainer: generic maps that are safe to share between threads, or
//! cheap to use from one, chosen per container at compile time.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one set of container APIs that behave identically whether the
//!   caller wants locking or not, with the choice made once, in the type.
//! - Layers:
//!   - `mode`: the `Mode` trait picks the storage cell. `Safe` is a
//!     `parking_lot::RwLock`, `Unsync` a `RefCell`. Method bodies are
//!     written once against the `RwCell` trait.
//!   - Storage: `hashbrown::HashMap` for `HashMap`; `LinkedHashMap`
//!     (`HashTable` index over a `SlotMap` of linked entries) for
//!     `ListMap`; an AVL tree of boxed nodes for `TreeMap`.
//!   - Public containers: `HashMap`, `ListMap`, `TreeMap` and `Var`, each a
//!     thin wrapper that takes the cell once per call.
//!   - `Value` is the dynamic "any" type; `Coerce` and `Emptiness` are the
//!     conversion hooks that `flip` and the filters rely on.
//!
//! Constraints
//! - Every public method takes `&self` and acquires the cell exactly once;
//!   guards are released on every exit path.
//! - Values leave a container by clone. Only `HashMap<_, _, Unsync>::map`
//!   hands out the live storage, as a `RefMut`.
//! - Operations that read a second container (`merge`, `is_sub_of`,
//!   `diff`) copy it first, so two locks are never held together.
//!
//! Reentrancy policy
//! - Callbacks (`iterate*`, `with_read`, `with_write`, lazy defaults of the
//!   `*_with_lock` family) run with the guard held and must not call back
//!   into the same container. Under `Safe` that deadlocks; under `Unsync`
//!   the `RefCell` panics with a borrow error.
//! - `*_with` lazy defaults run with no guard held and may reenter freely.
//!
//! Ordering
//! - `HashMap`: unspecified. `ListMap`: insertion order, updates keep
//!   their position. `TreeMap`: ascending under its comparator.
//!
//! Notes and non-goals
//! - No atomics-based scalar wrappers and no reflection-driven struct
//!   conversion.
//! - Serialization (feature `serde`, default on) uses the "object of
//!   key/value pairs" shape only. In human-readable formats a null key is
//!   written as `""` and a list key as its `Display` text.

mod avl;
mod avl_proptest;
pub mod comparator;
pub mod convert;
#[cfg(feature = "serde")]
mod de;
pub mod error;
pub mod hash_map;
mod linked_hash_map;
mod linked_hash_map_proptest;
pub mod list_map;
pub mod mode;
#[cfg(feature = "serde")]
mod ser;
pub mod tree_map;
pub mod value;
pub mod var;

// Public surface
pub use comparator::Comparator;
pub use convert::{Coerce, Emptiness};
pub use error::{Error, Result};
pub use hash_map::{
    AnyAnyMap, AnyIntMap, AnyStrMap, Diff, HashMap, IntAnyMap, IntIntMap, IntStrMap, RawMap,
    StrAnyMap, StrIntMap, StrStrMap,
};
pub use list_map::ListMap;
pub use mode::{Mode, Safe, Unsync};
pub use tree_map::{AnyAnyTreeMap, IntAnyTreeMap, StrAnyTreeMap, TreeMap};
pub use value::Value;
pub use var::{SafeVar, Var};
