//! The structured log record emitted once per request.

use std::borrow::Cow;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A typed attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Uint(u64),
    Duration(Duration),
    Time(DateTime<Utc>),
    List(Vec<String>),
    Group(Vec<Attr>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Uint(n) => Some(n),
            Self::Int(n) => u64::try_from(n).ok(),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&[Attr]> {
        match self {
            Self::Group(attrs) => Some(attrs),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::Str(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::Str(s) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Self::Int(n.into()) }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self { Self::Uint(n) }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self { Self::Uint(n.into()) }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self { Self::Duration(d) }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self { Self::Time(t) }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self { Self::List(items) }
}

impl From<Vec<Attr>> for Value {
    fn from(attrs: Vec<Attr>) -> Self { Self::Group(attrs) }
}

/// A key/value pair in a [`Record`].
#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    pub key: Cow<'static, str>,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    pub fn group(key: impl Into<Cow<'static, str>>, attrs: Vec<Attr>) -> Self {
        Self::new(key, Value::Group(attrs))
    }
}

/// Ordered attribute set for one request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    attrs: Vec<Attr>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attr: Attr) {
        self.attrs.push(attr);
    }

    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    /// Looks up a value by dotted path, e.g. `"request.header.accept"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut attrs = self.attrs.as_slice();
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let value = &attrs.iter().find(|a| a.key == segment)?.value;
            if segments.peek().is_none() {
                return Some(value);
            }
            attrs = value.as_group()?;
        }
        None
    }

    /// Keys of the top-level attributes, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|a| a.key.as_ref())
    }
}

impl Extend<Attr> for Record {
    fn extend<I: IntoIterator<Item = Attr>>(&mut self, iter: I) {
        self.attrs.extend(iter);
    }
}

// ── JSON encoding ─────────────────────────────────────────────────────────────

/// Attribute list encoded as a JSON object, keys in insertion order.
struct Attrs<'a>(&'a [Attr]);

impl Serialize for Attrs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for attr in self.0 {
            map.serialize_entry(&*attr.key, &attr.value)?;
        }
        map.end()
    }
}

/// Groups become nested objects, lists become arrays, times are RFC 3339 and
/// durations are rendered like `3ms`.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Uint(n) => serializer.serialize_u64(*n),
            Self::Duration(d) => serializer.collect_str(&format_args!("{d:?}")),
            Self::Time(t) => t.serialize(serializer),
            Self::List(items) => items.serialize(serializer),
            Self::Group(attrs) => Attrs(attrs).serialize(serializer),
        }
    }
}

/// A single `{"key": value}` object.
impl Serialize for Attr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Attrs(std::slice::from_ref(self)).serialize(serializer)
    }
}

/// The whole record as one JSON object.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Attrs(&self.attrs).serialize(serializer)
    }
}
