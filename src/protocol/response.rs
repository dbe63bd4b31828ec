//! Decoded response records.

use bytes::Bytes;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use super::codes::Code;

/// A single decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U16(u16),
    U32(u32),
    F32(f32),
    /// Raw string bytes; the protocol assumes no encoding.
    Str(Bytes),
}

impl Value {
    /// Integer value, widening `U16`.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U16(v) => Some(u32::from(*v)),
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::Str(v) => serializer.serialize_str(&String::from_utf8_lossy(v)),
        }
    }
}

/// A complete response decoded from the inbound stream.
///
/// Fields keep the order they were read in.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Main code, or the banner pseudo-code.
    pub code: Code,
    /// Low 4 bits of the code word.
    pub subcode: u8,
    /// Code table name, for logging.
    pub name: &'static str,
    fields: Vec<(&'static str, Value)>,
}

impl Response {
    /// Create an empty response.
    pub fn new(code: Code, subcode: u8, name: &'static str) -> Self {
        Self {
            code,
            subcode,
            name,
            fields: Vec::new(),
        }
    }

    /// Append a field, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: &'static str, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: &'static str, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Get an integer field.
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(Value::as_u32)
    }

    /// Get a float field.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(Value::as_f32)
    }

    /// Get a string field's raw bytes.
    pub fn get_bytes(&self, name: &str) -> Option<&Bytes> {
        self.get(name).and_then(Value::as_bytes)
    }

    /// Get a string field, lossily decoded as UTF-8.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_bytes(name)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Fields in decode order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    /// Number of decoded fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Check if this is the connection banner.
    #[inline]
    pub fn is_banner(&self) -> bool {
        self.code == Code::Banner
    }
}

struct FieldMap<'a>(&'a [(&'static str, Value)]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Response", 4)?;
        state.serialize_field("code", &self.code.wire())?;
        state.serialize_field("name", self.name)?;
        state.serialize_field("subcode", &self.subcode)?;
        state.serialize_field("fields", &FieldMap(&self.fields))?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes::playback;

    #[test]
    fn test_field_access() {
        let response = Response::new(Code::Wire(playback::LOAD), 1, "LOAD")
            .with("index", Value::U32(4))
            .with("title", Value::Str(Bytes::from_static(b"Jingle")))
            .with("gain", Value::F32(0.5));

        assert_eq!(response.get_u32("index"), Some(4));
        assert_eq!(response.get_string("title").as_deref(), Some("Jingle"));
        assert_eq!(response.get_f32("gain"), Some(0.5));
        assert_eq!(response.get_u32("title"), None);
        assert!(response.get("missing").is_none());
    }

    #[test]
    fn test_field_order_preserved() {
        let response = Response::new(Code::Banner, 0, "CONNECT")
            .with("b", Value::U16(1))
            .with("a", Value::U16(2));

        let names: Vec<_> = response.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_insert_replaces() {
        let mut response = Response::new(Code::Banner, 0, "CONNECT");
        response.insert("x", Value::U16(1));
        response.insert("x", Value::U16(2));

        assert_eq!(response.field_count(), 1);
        assert_eq!(response.get_u32("x"), Some(2));
    }

    #[test]
    fn test_json_shape() {
        let response = Response::new(Code::Wire(playback::LOAD), 2, "LOAD")
            .with("index", Value::U32(0))
            .with("title", Value::Str(Bytes::from_static(b"News")));

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["code"], 0x0280);
        assert_eq!(json["name"], "LOAD");
        assert_eq!(json["subcode"], 2);
        assert_eq!(json["fields"]["title"], "News");
        assert_eq!(json["fields"]["index"], 0);
    }

    #[test]
    fn test_banner_json_has_null_code() {
        let response = Response::new(Code::Banner, 0, "CONNECT");
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["code"].is_null());
        assert!(response.is_banner());
    }
}
