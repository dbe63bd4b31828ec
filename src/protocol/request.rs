//! Outgoing request builder.
//!
//! A request is a command word followed by its fields:
//! ```text
//! ┌──────────────┬──────────────┬──────────────────────┐
//! │ Code|Subcode │ Byte count   │ Fields...            │
//! │ uint16 BE    │ uint32 BE    │ uint16/uint32/string │
//! └──────────────┴──────────────┴──────────────────────┘
//! ```
//! The byte count covers only the bytes after the 6-byte command word.
//!
//! # Example
//!
//! ```
//! use baps_gateway::protocol::{Request, codes::playback};
//!
//! let bytes = Request::new(playback::POSITION, 1).uint32(500).encode();
//! assert_eq!(&bytes[..], &[0x01, 0x81, 0, 0, 0, 4, 0, 0, 0x01, 0xF4]);
//! ```

use bytes::{Bytes, BytesMut};

use super::codes;
use super::primitive::{
    put_command_word, put_f32, put_string, put_u16, put_u32, string_size, COMMAND_WORD_SIZE,
    U16_SIZE, U32_SIZE,
};

/// One typed request field.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    U16(u16),
    U32(u32),
    F32(f32),
    Str(Bytes),
}

impl Field {
    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Field::U16(_) => U16_SIZE,
            Field::U32(_) | Field::F32(_) => U32_SIZE,
            Field::Str(s) => string_size(s),
        }
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Field::U16(v) => put_u16(buf, *v),
            Field::U32(v) => put_u32(buf, *v),
            Field::F32(v) => put_f32(buf, *v),
            Field::Str(s) => put_string(buf, s),
        }
    }
}

impl From<u16> for Field {
    fn from(v: u16) -> Self {
        Field::U16(v)
    }
}

impl From<u32> for Field {
    fn from(v: u32) -> Self {
        Field::U32(v)
    }
}

impl From<f32> for Field {
    fn from(v: f32) -> Self {
        Field::F32(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Str(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Str(Bytes::from(v))
    }
}

impl From<Bytes> for Field {
    fn from(v: Bytes) -> Self {
        Field::Str(v)
    }
}

/// A request on its way to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    code: u16,
    subcode: u8,
    fields: Vec<Field>,
    /// Running total of encoded field bytes.
    byte_length: usize,
}

impl Request {
    /// Start a request with no fields.
    pub fn new(code: u16, subcode: u8) -> Self {
        Self {
            code,
            subcode,
            fields: Vec::new(),
            byte_length: 0,
        }
    }

    /// Append a field in place.
    pub fn push(&mut self, field: Field) {
        self.byte_length += field.encoded_len();
        self.fields.push(field);
    }

    /// Append a `uint16` field.
    pub fn uint16(mut self, value: u16) -> Self {
        self.push(Field::U16(value));
        self
    }

    /// Append a `uint32` field.
    pub fn uint32(mut self, value: u32) -> Self {
        self.push(Field::U32(value));
        self
    }

    /// Append a `float32` field.
    pub fn float32(mut self, value: f32) -> Self {
        self.push(Field::F32(value));
        self
    }

    /// Append a string field.
    pub fn string(mut self, value: impl AsRef<[u8]>) -> Self {
        self.push(Field::Str(Bytes::copy_from_slice(value.as_ref())));
        self
    }

    /// Append several fields at once.
    ///
    /// Produces the same bytes as appending them one by one.
    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Field>,
    {
        for field in fields {
            self.push(field.into());
        }
        self
    }

    /// Main code.
    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Subcode.
    #[inline]
    pub fn subcode(&self) -> u8 {
        self.subcode
    }

    /// Packed code word.
    #[inline]
    pub fn command_word(&self) -> u16 {
        codes::join(self.code, self.subcode)
    }

    /// Bytes following the command word.
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Fields in append order.
    pub fn field_list(&self) -> &[Field] {
        &self.fields
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(COMMAND_WORD_SIZE + self.byte_length);
        put_command_word(&mut buf, self.command_word(), self.byte_length as u32);
        for field in &self.fields {
            field.encode_into(&mut buf);
        }
        buf.freeze()
    }
}
