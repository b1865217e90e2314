// Fri Jan 16 2026 - Alex

use crate::codec::CodecError;
use crate::overlay::{Overlay, OverlayType};
use indexmap::IndexMap;
use serde_json::{json, Map, Number, Value as Json};
use std::fmt;
use std::sync::Arc;

/// Host-side value moved in and out of buffers by generated readers and writers.
#[derive(Clone)]
pub enum Value {
    /// Absent optional, or a field that was never set.
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Struct(Record),
    /// Lazy view over a buffer region, produced by overlay-composed formats.
    Overlay(Arc<Overlay>),
}

/// Decoded struct value. Inherited fields come first, then own fields in physical order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub tag: Option<String>,
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tagged(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            fields: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
            Self::Overlay(_) => "overlay",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Struct(record) => Some(record),
            _ => None,
        }
    }

    /// Field lookup on struct values.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_record().and_then(|record| record.get(name))
    }

    /// Struct tag, for records and overlays alike.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Struct(record) => record.tag(),
            Self::Overlay(overlay) => overlay.tag(),
            _ => None,
        }
    }

    pub fn into_overlay<T: OverlayType>(self) -> Option<T> {
        match self {
            Self::Overlay(overlay) => Some(T::from_overlay(overlay)),
            _ => None,
        }
    }

    /// Plain-data copy. Overlays are snapshotted into records.
    pub fn to_plain(&self) -> Result<Value, CodecError> {
        Ok(match self {
            Self::Overlay(overlay) => Self::Struct(overlay.snapshot()?),
            Self::Array(items) => Self::Array(items.iter().map(Value::to_plain).collect::<Result<_, _>>()?),
            Self::Struct(record) => {
                let mut plain = Record {
                    tag: record.tag.clone(),
                    fields: IndexMap::with_capacity(record.len()),
                };
                for (name, value) in &record.fields {
                    plain.fields.insert(name.clone(), value.to_plain()?);
                }
                Self::Struct(plain)
            }
            other => other.clone(),
        })
    }

    /// JSON encoding used by the layout archive and the CLI dump. `from_json` inverts it.
    pub fn to_json(&self) -> Result<Json, CodecError> {
        Ok(match self {
            Self::Undefined => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(n) => Json::Number(Number::from(*n)),
            Self::Float(f) => match Number::from_f64(*f) {
                Some(n) => Json::Number(n),
                None => json!({ "$float": non_finite_name(*f) }),
            },
            Self::String(s) => Json::String(s.clone()),
            Self::Bytes(bytes) => json!({ "$bytes": bytes }),
            Self::Array(items) => Json::Array(items.iter().map(Value::to_json).collect::<Result<_, _>>()?),
            Self::Struct(record) => record_to_json(record)?,
            Self::Overlay(overlay) => record_to_json(&overlay.snapshot()?)?,
        })
    }

    pub fn from_json(json: &Json) -> Result<Value, CodecError> {
        Ok(match json {
            Json::Null => Self::Undefined,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::Array(items.iter().map(Value::from_json).collect::<Result<_, _>>()?),
            Json::Object(map) => object_from_json(map)?,
        })
    }
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "nan"
    } else if f > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn record_to_json(record: &Record) -> Result<Json, CodecError> {
    let mut fields = Map::new();
    for (name, value) in &record.fields {
        fields.insert(name.clone(), value.to_json()?);
    }
    let mut object = Map::new();
    object.insert("$struct".to_string(), Json::Object(fields));
    if let Some(tag) = &record.tag {
        object.insert("$tag".to_string(), Json::String(tag.clone()));
    }
    Ok(Json::Object(object))
}

fn object_from_json(map: &Map<String, Json>) -> Result<Value, CodecError> {
    if let Some(Json::String(name)) = map.get("$float") {
        return Ok(Value::Float(match name.as_str() {
            "inf" => f64::INFINITY,
            "-inf" => f64::NEG_INFINITY,
            _ => f64::NAN,
        }));
    }
    if let Some(Json::Array(bytes)) = map.get("$bytes") {
        let mut out = Vec::with_capacity(bytes.len());
        for byte in bytes {
            let value = byte
                .as_u64()
                .filter(|b| *b <= u8::MAX as u64)
                .ok_or_else(|| CodecError::TypeMismatch {
                    expected: "byte",
                    found: "json".to_string(),
                })?;
            out.push(value as u8);
        }
        return Ok(Value::Bytes(out));
    }
    if let Some(Json::Object(fields)) = map.get("$struct") {
        let mut record = Record::new();
        record.tag = map.get("$tag").and_then(Json::as_str).map(str::to_string);
        for (name, value) in fields {
            record.fields.insert(name.clone(), Value::from_json(value)?);
        }
        return Ok(Value::Struct(record));
    }
    Err(CodecError::TypeMismatch {
        expected: "encoded value",
        found: "json object".to_string(),
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) => a == b,
            (Self::Overlay(a), Self::Overlay(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{:?}", x),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Bytes(bytes) => write!(f, "bytes[{}]", bytes.len()),
            Self::Array(items) => f.debug_list().entries(items).finish(),
            Self::Struct(record) => {
                if let Some(tag) = &record.tag {
                    write!(f, "{} ", tag)?;
                }
                f.debug_map().entries(record.fields.iter()).finish()
            }
            Self::Overlay(overlay) => write!(f, "overlay {}@{}", overlay.class().name(), overlay.offset()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! int_conversions {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Int(value as i64)
                }
            }
        )*
    };
}

int_conversions!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Struct(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}

/// Conversion out of a decoded value, used by typed codecs.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, CodecError>;
}

/// Conversion into a value, used by typed codecs.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

fn mismatch(expected: &'static str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: found.type_name().to_string(),
    }
}

macro_rules! typed_ints {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, CodecError> {
                    let n = value.as_i64().ok_or_else(|| mismatch(stringify!($ty), &value))?;
                    <$ty>::try_from(n).map_err(|_| CodecError::ValueOutOfRange {
                        kind: stringify!($ty),
                        value: n.to_string(),
                    })
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(*self as i64)
                }
            }
        )*
    };
}

typed_ints!(i8, i16, i32, i64, u8, u16, u32);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        value.as_f64().ok_or_else(|| mismatch("f64", &value))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        value.as_bool().ok_or_else(|| mismatch("bool", &value))
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("array", &other)),
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Undefined => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Undefined, ToValue::to_value)
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        Ok(value)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_encoding_round_trips() {
        let value = Value::Struct(
            Record::tagged("spawn")
                .with("name", "Spawn1")
                .with("energy", 300)
                .with("ratio", 0.5)
                .with("blob", Value::Bytes(vec![1, 2, 255]))
                .with("missing", Value::Undefined),
        );
        let json = value.to_json().unwrap();
        assert_eq!(Value::from_json(&json).unwrap(), value);
    }

    #[test]
    fn test_integral_float_reads_as_integer() {
        assert_eq!(Value::Float(4.0).as_i64(), Some(4));
        assert_eq!(Value::Float(4.5).as_i64(), None);
    }

    #[test]
    fn test_typed_conversions() {
        assert_eq!(u8::from_value(Value::Int(200)).unwrap(), 200);
        assert!(u8::from_value(Value::Int(300)).is_err());
        let items = vec![Some(1i32), None].to_value();
        assert_eq!(Vec::<Option<i32>>::from_value(items).unwrap(), vec![Some(1), None]);
    }
}
