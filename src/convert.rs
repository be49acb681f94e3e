//! Conversion traits consumed by the containers.
//!
//! - [`Coerce`] turns a key into a value type and back for `flip`. Every
//!   `Clone` type coerces into itself; `Value`, `i64` and `String` coerce
//!   into each other with the lenient rules of [`Value`].
//! - [`Emptiness`] decides which entries `filter_empty` / `filter_nil` drop.

use crate::value::Value;

/// Infallible conversion into `T`.
pub trait Coerce<T> {
    fn coerce(&self) -> T;
}

impl<T: Clone> Coerce<T> for T {
    #[inline]
    fn coerce(&self) -> T {
        self.clone()
    }
}

impl Coerce<String> for Value {
    fn coerce(&self) -> String {
        self.to_string()
    }
}

impl Coerce<i64> for Value {
    fn coerce(&self) -> i64 {
        self.to_int()
    }
}

impl Coerce<Value> for String {
    fn coerce(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl Coerce<Value> for i64 {
    fn coerce(&self) -> Value {
        Value::Int(*self)
    }
}

impl Coerce<String> for i64 {
    fn coerce(&self) -> String {
        self.to_string()
    }
}

impl Coerce<i64> for String {
    fn coerce(&self) -> i64 {
        Value::Str(self.clone()).to_int()
    }
}

/// Semantic emptiness of a stored value.
pub trait Emptiness {
    /// Zero-equivalent: `0`, `false`, `""`, empty collections, `None`.
    fn is_empty_value(&self) -> bool;

    /// Absent rather than merely zero. Only `Option::None` and
    /// `Value::Null` are nil.
    fn is_nil_value(&self) -> bool {
        false
    }
}

macro_rules! zero_is_empty {
    ($($t:ty),*) => {
        $(impl Emptiness for $t {
            #[inline]
            fn is_empty_value(&self) -> bool {
                *self == (0 as $t)
            }
        })*
    };
}

zero_is_empty!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl Emptiness for bool {
    fn is_empty_value(&self) -> bool {
        !*self
    }
}

impl Emptiness for String {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for &str {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Emptiness> Emptiness for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.as_ref().map_or(true, Emptiness::is_empty_value)
    }

    fn is_nil_value(&self) -> bool {
        self.is_none()
    }
}

impl Emptiness for Value {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }

    fn is_nil_value(&self) -> bool {
        self.is_null()
    }
}
