//! Primitive field encoding and decoding.
//!
//! All multi-byte values are Big Endian:
//! ```text
//! ┌──────────┬──────────┬───────────┬─────────────────────────┐
//! │ uint16   │ uint32   │ float32   │ string                  │
//! │ 2 bytes  │ 4 bytes  │ 4 bytes   │ uint32 length + N bytes │
//! └──────────┴──────────┴───────────┴─────────────────────────┘
//! ```
//!
//! Every message starts with a command word:
//! ```text
//! ┌──────────────┬──────────────┐
//! │ Code|Subcode │ Byte count   │
//! │ uint16 BE    │ uint32 BE    │
//! └──────────────┴──────────────┘
//! ```
//! The byte count is unreliable on the legacy server. Decoding consumes and
//! discards it; it is never used to skip or validate.

use bytes::{Buf, BufMut, Bytes};

use super::demand_reader::{DemandReader, Priority};
use crate::error::Result;

/// Command word size in bytes (code word + byte count).
pub const COMMAND_WORD_SIZE: usize = 6;

/// Size of an encoded `uint16`.
pub const U16_SIZE: usize = 2;

/// Size of an encoded `uint32` or `float32`.
pub const U32_SIZE: usize = 4;

/// Read a big-endian `uint16`.
pub fn read_u16<C, F>(reader: &mut DemandReader<C>, priority: Priority, then: F)
where
    C: 'static,
    F: FnOnce(&mut DemandReader<C>, &mut C, u16) -> Result<()> + Send + 'static,
{
    reader.request(U16_SIZE, priority, move |reader, ctx, mut bytes| {
        then(reader, ctx, bytes.get_u16())
    });
}

/// Read a big-endian `uint32`.
pub fn read_u32<C, F>(reader: &mut DemandReader<C>, priority: Priority, then: F)
where
    C: 'static,
    F: FnOnce(&mut DemandReader<C>, &mut C, u32) -> Result<()> + Send + 'static,
{
    reader.request(U32_SIZE, priority, move |reader, ctx, mut bytes| {
        then(reader, ctx, bytes.get_u32())
    });
}

/// Read a big-endian IEEE-754 `float32`.
pub fn read_f32<C, F>(reader: &mut DemandReader<C>, priority: Priority, then: F)
where
    C: 'static,
    F: FnOnce(&mut DemandReader<C>, &mut C, f32) -> Result<()> + Send + 'static,
{
    reader.request(U32_SIZE, priority, move |reader, ctx, mut bytes| {
        then(reader, ctx, bytes.get_f32())
    });
}

/// Read a length-prefixed string as raw bytes.
///
/// The body read is queued with `Priority::Immediate` so nothing else can
/// slip between the length and the bytes it describes.
pub fn read_string<C, F>(reader: &mut DemandReader<C>, priority: Priority, then: F)
where
    C: 'static,
    F: FnOnce(&mut DemandReader<C>, &mut C, Bytes) -> Result<()> + Send + 'static,
{
    read_u32(reader, priority, move |reader, _ctx, length| {
        reader.request(length as usize, Priority::Immediate, then);
        Ok(())
    });
}

/// Read a command word, yielding the raw code word.
///
/// The trailing byte count is consumed and ignored.
pub fn read_command_word<C, F>(reader: &mut DemandReader<C>, priority: Priority, then: F)
where
    C: 'static,
    F: FnOnce(&mut DemandReader<C>, &mut C, u16) -> Result<()> + Send + 'static,
{
    reader.request(COMMAND_WORD_SIZE, priority, move |reader, ctx, mut bytes| {
        let word = bytes.get_u16();
        let _declared_length = bytes.get_u32();
        then(reader, ctx, word)
    });
}

/// Write a big-endian `uint16`.
#[inline]
pub fn put_u16<B: BufMut>(buf: &mut B, value: u16) {
    buf.put_u16(value);
}

/// Write a big-endian `uint32`.
#[inline]
pub fn put_u32<B: BufMut>(buf: &mut B, value: u32) {
    buf.put_u32(value);
}

/// Write a big-endian `float32`.
#[inline]
pub fn put_f32<B: BufMut>(buf: &mut B, value: f32) {
    buf.put_f32(value);
}

/// Write a length-prefixed string.
pub fn put_string<B: BufMut>(buf: &mut B, value: &[u8]) {
    buf.put_u32(value.len() as u32);
    buf.put_slice(value);
}

/// Write a command word with the given payload byte count.
pub fn put_command_word<B: BufMut>(buf: &mut B, word: u16, byte_count: u32) {
    buf.put_u16(word);
    buf.put_u32(byte_count);
}

/// Encoded size of a string field.
#[inline]
pub fn string_size(value: &[u8]) -> usize {
    U32_SIZE + value.len()
}
