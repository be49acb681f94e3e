//! Map-key encoding shared by the containers.
//!
//! Human-readable formats such as JSON only accept scalar map keys, so a
//! `Value::Null` or `Value::List` key would fail to encode. Keys go through
//! [`MapKey`], which writes null as `""` and a sequence as the `Display`
//! text of the equivalent `Value::List`. Binary formats see the key
//! unchanged. Decoding such a map yields string keys.

use crate::value::Value;
use serde::ser::{self, Impossible, Serialize, SerializeSeq, Serializer};

/// Borrowed map key, encoded as described above.
pub(crate) struct MapKey<'a, K: ?Sized>(pub(crate) &'a K);

impl<K> Serialize for MapKey<'_, K>
where
    K: ?Sized + Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(KeySerializer(serializer))
    }
}

struct KeySerializer<S>(S);

impl<S: Serializer> KeySerializer<S> {
    fn text(&self) -> bool {
        self.0.is_human_readable()
    }
}

impl<S: Serializer> Serializer for KeySerializer<S> {
    type Ok = S::Ok;
    type Error = S::Error;
    type SerializeSeq = KeySeq<S>;
    type SerializeTuple = S::SerializeTuple;
    type SerializeTupleStruct = S::SerializeTupleStruct;
    type SerializeTupleVariant = S::SerializeTupleVariant;
    type SerializeMap = S::SerializeMap;
    type SerializeStruct = S::SerializeStruct;
    type SerializeStructVariant = S::SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<S::Ok, S::Error> {
        self.0.serialize_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<S::Ok, S::Error> {
        self.0.serialize_i8(v)
    }

    fn serialize_i16(self, v: i16) -> Result<S::Ok, S::Error> {
        self.0.serialize_i16(v)
    }

    fn serialize_i32(self, v: i32) -> Result<S::Ok, S::Error> {
        self.0.serialize_i32(v)
    }

    fn serialize_i64(self, v: i64) -> Result<S::Ok, S::Error> {
        self.0.serialize_i64(v)
    }

    fn serialize_i128(self, v: i128) -> Result<S::Ok, S::Error> {
        self.0.serialize_i128(v)
    }

    fn serialize_u8(self, v: u8) -> Result<S::Ok, S::Error> {
        self.0.serialize_u8(v)
    }

    fn serialize_u16(self, v: u16) -> Result<S::Ok, S::Error> {
        self.0.serialize_u16(v)
    }

    fn serialize_u32(self, v: u32) -> Result<S::Ok, S::Error> {
        self.0.serialize_u32(v)
    }

    fn serialize_u64(self, v: u64) -> Result<S::Ok, S::Error> {
        self.0.serialize_u64(v)
    }

    fn serialize_u128(self, v: u128) -> Result<S::Ok, S::Error> {
        self.0.serialize_u128(v)
    }

    fn serialize_f32(self, v: f32) -> Result<S::Ok, S::Error> {
        self.0.serialize_f32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<S::Ok, S::Error> {
        self.0.serialize_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<S::Ok, S::Error> {
        self.0.serialize_char(v)
    }

    fn serialize_str(self, v: &str) -> Result<S::Ok, S::Error> {
        self.0.serialize_str(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<S::Ok, S::Error> {
        self.0.serialize_bytes(v)
    }

    fn serialize_none(self) -> Result<S::Ok, S::Error> {
        if self.text() {
            return self.0.serialize_str("");
        }
        self.0.serialize_none()
    }

    fn serialize_some<T>(self, value: &T) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        if self.text() {
            return value.serialize(self);
        }
        self.0.serialize_some(value)
    }

    fn serialize_unit(self) -> Result<S::Ok, S::Error> {
        if self.text() {
            return self.0.serialize_str("");
        }
        self.0.serialize_unit()
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<S::Ok, S::Error> {
        if self.text() {
            return self.0.serialize_str("");
        }
        self.0.serialize_unit_struct(name)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
    ) -> Result<S::Ok, S::Error> {
        self.0.serialize_unit_variant(name, index, variant)
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        self.0.serialize_newtype_struct(name, value)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        self.0.serialize_newtype_variant(name, index, variant, value)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<KeySeq<S>, S::Error> {
        if self.text() {
            let items = Vec::with_capacity(len.unwrap_or(0));
            return Ok(KeySeq::Text(self.0, items));
        }
        self.0.serialize_seq(len).map(KeySeq::Forward)
    }

    fn serialize_tuple(self, len: usize) -> Result<S::SerializeTuple, S::Error> {
        self.0.serialize_tuple(len)
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<S::SerializeTupleStruct, S::Error> {
        self.0.serialize_tuple_struct(name, len)
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<S::SerializeTupleVariant, S::Error> {
        self.0.serialize_tuple_variant(name, index, variant, len)
    }

    fn serialize_map(self, len: Option<usize>) -> Result<S::SerializeMap, S::Error> {
        self.0.serialize_map(len)
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<S::SerializeStruct, S::Error> {
        self.0.serialize_struct(name, len)
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<S::SerializeStructVariant, S::Error> {
        self.0.serialize_struct_variant(name, index, variant, len)
    }

    fn is_human_readable(&self) -> bool {
        self.text()
    }
}

enum KeySeq<S: Serializer> {
    Forward(S::SerializeSeq),
    /// Elements gathered as values, written as one string at the end.
    Text(S, Vec<Value>),
}

impl<S: Serializer> SerializeSeq for KeySeq<S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), S::Error>
    where
        T: ?Sized + Serialize,
    {
        match self {
            KeySeq::Forward(seq) => seq.serialize_element(value),
            KeySeq::Text(_, items) => {
                let item = value.serialize(ToValue).map_err(ser::Error::custom)?;
                items.push(item);
                Ok(())
            }
        }
    }

    fn end(self) -> Result<S::Ok, S::Error> {
        match self {
            KeySeq::Forward(seq) => seq.end(),
            KeySeq::Text(out, items) => out.serialize_str(&Value::List(items).to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct ToValueError(String);

impl ser::Error for ToValueError {
    fn custom<T: core::fmt::Display>(msg: T) -> Self {
        ToValueError(msg.to_string())
    }
}

fn unsupported(what: &str) -> ToValueError {
    ToValueError(format!("{what} cannot be part of a map key"))
}

/// Captures one list element as a [`Value`].
struct ToValue;

impl Serializer for ToValue {
    type Ok = Value;
    type Error = ToValueError;
    type SerializeSeq = ListBuilder;
    type SerializeTuple = ListBuilder;
    type SerializeTupleStruct = ListBuilder;
    type SerializeTupleVariant = Impossible<Value, ToValueError>;
    type SerializeMap = Impossible<Value, ToValueError>;
    type SerializeStruct = Impossible<Value, ToValueError>;
    type SerializeStructVariant = Impossible<Value, ToValueError>;

    fn serialize_bool(self, v: bool) -> Result<Value, ToValueError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, ToValueError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, ToValueError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, ToValueError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, ToValueError> {
        Ok(Value::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, ToValueError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, ToValueError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, ToValueError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, ToValueError> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| ToValueError(format!("{v} does not fit an i64")))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, ToValueError> {
        Ok(Value::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, ToValueError> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, ToValueError> {
        Ok(Value::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, ToValueError> {
        Ok(Value::Str(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, ToValueError> {
        Ok(Value::List(v.iter().map(|b| Value::Int((*b).into())).collect()))
    }

    fn serialize_none(self) -> Result<Value, ToValueError> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value, ToValueError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, ToValueError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, ToValueError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, ToValueError> {
        Ok(Value::Str(variant.to_owned()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value, ToValueError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Value, ToValueError>
    where
        T: ?Sized + Serialize,
    {
        Err(unsupported("an enum variant with data"))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<ListBuilder, ToValueError> {
        Ok(ListBuilder(Vec::with_capacity(len.unwrap_or(0))))
    }

    fn serialize_tuple(self, len: usize) -> Result<ListBuilder, ToValueError> {
        Ok(ListBuilder(Vec::with_capacity(len)))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<ListBuilder, ToValueError> {
        Ok(ListBuilder(Vec::with_capacity(len)))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ToValueError> {
        Err(unsupported("an enum variant with data"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ToValueError> {
        Err(unsupported("a map"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ToValueError> {
        Err(unsupported("a struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ToValueError> {
        Err(unsupported("an enum variant with data"))
    }
}

struct ListBuilder(Vec<Value>);

impl ListBuilder {
    fn push<T>(&mut self, value: &T) -> Result<(), ToValueError>
    where
        T: ?Sized + Serialize,
    {
        self.0.push(value.serialize(ToValue)?);
        Ok(())
    }
}

impl SerializeSeq for ListBuilder {
    type Ok = Value;
    type Error = ToValueError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), ToValueError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value, ToValueError> {
        Ok(Value::List(self.0))
    }
}

impl ser::SerializeTuple for ListBuilder {
    type Ok = Value;
    type Error = ToValueError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), ToValueError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value, ToValueError> {
        Ok(Value::List(self.0))
    }
}

impl ser::SerializeTupleStruct for ListBuilder {
    type Ok = Value;
    type Error = ToValueError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), ToValueError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value, ToValueError> {
        Ok(Value::List(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_json<K: Serialize>(key: &K) -> String {
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::new(&mut out);
        let mut map = serde::ser::Serializer::serialize_map(&mut ser, Some(1)).unwrap();
        serde::ser::SerializeMap::serialize_entry(&mut map, &MapKey(key), &0).unwrap();
        serde::ser::SerializeMap::end(map).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn null_and_list_keys_become_text() {
        assert_eq!(key_json(&Value::Null), r#"{"":0}"#);
        let list = Value::List(vec![Value::from(1), Value::from("a"), Value::Null]);
        assert_eq!(key_json(&list), r#"{"[1,\"a\",null]":0}"#);
        let nested = Value::List(vec![Value::List(vec![Value::from(true)])]);
        assert_eq!(key_json(&nested), r#"{"[[true]]":0}"#);
    }

    #[test]
    fn scalar_keys_are_unchanged() {
        assert_eq!(key_json(&Value::from(7)), r#"{"7":0}"#);
        assert_eq!(key_json(&Value::from("k")), r#"{"k":0}"#);
        assert_eq!(key_json(&"plain"), r#"{"plain":0}"#);
        assert_eq!(key_json(&Some(3)), r#"{"3":0}"#);
    }

    #[test]
    fn struct_elements_are_rejected() {
        let err = vec![serde_json::json!({"a": 1})].serialize(ToValue).unwrap_err();
        assert!(err.to_string().contains("a map"));
    }
}
