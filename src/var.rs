//! Var: a single mutable [`Value`] box.
//!
//! `Var<Safe>` can be shared between threads; the default `Var<Unsync>` is a
//! plain single-threaded cell.

use crate::mode::{Mode, RwCell, Safe, Unsync};
use crate::value::Value;
use core::fmt;

pub struct Var<M: Mode = Unsync> {
    value: M::Lock<Value>,
}

/// Shareable variant.
pub type SafeVar = Var<Safe>;

impl<M: Mode> Var<M> {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: RwCell::new(value.into()),
        }
    }

    pub fn is_safe(&self) -> bool {
        M::SAFE
    }

    /// Store `value`, returning the previous one.
    pub fn set(&self, value: impl Into<Value>) -> Value {
        core::mem::replace(&mut *self.value.write(), value.into())
    }

    /// Copy of the held value.
    pub fn val(&self) -> Value {
        self.value.read().clone()
    }

    pub fn is_nil(&self) -> bool {
        self.value.read().is_null()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    pub fn to_int(&self) -> i64 {
        self.value.read().to_int()
    }

    pub fn to_float(&self) -> f64 {
        self.value.read().to_float()
    }

    pub fn to_bool(&self) -> bool {
        self.value.read().to_bool()
    }

    pub fn clone_as<M2: Mode>(&self) -> Var<M2> {
        Var::new(self.val())
    }

    pub fn into_inner(self) -> Value {
        self.value.into_inner()
    }
}

impl<M: Mode> Default for Var<M> {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl<M: Mode> Clone for Var<M> {
    fn clone(&self) -> Self {
        self.clone_as::<M>()
    }
}

impl<M: Mode> fmt::Display for Var<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.value.read(), f)
    }
}

impl<M: Mode> fmt::Debug for Var<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Var").field(&*self.value.read()).finish()
    }
}

#[cfg(feature = "serde")]
impl<M: Mode> serde::Serialize for Var<M> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serde::Serialize::serialize(&*self.value.read(), serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, M: Mode> serde::Deserialize<'de> for Var<M> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value: Value = serde::Deserialize::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_returns_previous() {
        let v: Var = Var::new(1);
        assert_eq!(v.set("two"), Value::from(1));
        assert_eq!(v.val(), Value::from("two"));
        assert_eq!(v.to_string(), "two");
        assert!(!v.is_safe());
    }

    #[test]
    fn coercions_and_emptiness() {
        let v: Var = Var::default();
        assert!(v.is_nil());
        assert!(v.is_empty());
        v.set("12");
        assert_eq!(v.to_int(), 12);
        assert_eq!(v.to_float(), 12.0);
        assert!(v.to_bool());
        assert!(!v.is_nil());
    }

    #[test]
    fn clone_is_independent() {
        let a = SafeVar::new(1);
        let b = a.clone();
        a.set(2);
        assert_eq!(b.val(), Value::from(1));
        let c: Var<Unsync> = a.clone_as();
        assert_eq!(c.into_inner(), Value::from(2));
    }

    #[test]
    fn safe_var_is_shareable() {
        let v = SafeVar::new(0);
        std::thread::scope(|s| {
            for i in 1..=4 {
                let v = &v;
                s.spawn(move || {
                    v.set(i);
                });
            }
        });
        assert!((1..=4).contains(&v.to_int()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_is_transparent() {
        let v: Var = Var::new(vec![1, 2]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1,2]");
        let back: Var = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(back.val(), Value::from("x"));
    }
}
