//! Response decoder.
//!
//! Drives the [`DemandReader`] with the response structure table to assemble
//! complete [`Response`]s from an arbitrarily chunked byte stream. Implements
//! a state machine:
//! - `ExpectingCommand`: waiting for a 6-byte command word
//! - `ExpectingField`: response under construction, fields still to read
//!
//! Each field read is one demand-reader request, so the decoder never
//! blocks; progress happens only when bytes arrive. The first response is
//! always the connection banner, which the server sends without a command
//! word.
//!
//! # Example
//!
//! ```
//! use baps_gateway::protocol::{ResponseDecoder, Request, codes::system};
//!
//! let mut decoder = ResponseDecoder::new();
//!
//! // Banner: a bare length-prefixed string.
//! let responses = decoder.push(&[0, 0, 0, 2, b'h', b'i']).unwrap();
//! assert_eq!(responses[0].get_string("message").as_deref(), Some("hi"));
//!
//! let seed = Request::new(system::SEED, 0).string("abc").encode();
//! let responses = decoder.push(&seed).unwrap();
//! assert_eq!(responses[0].name, "SEED");
//! ```

use std::collections::VecDeque;

use super::codes::{self, Code, BANNER_NAME};
use super::demand_reader::{DemandReader, Priority};
use super::primitive::{read_command_word, read_f32, read_string, read_u16, read_u32};
use super::response::{Response, Value};
use super::structure::{self, FieldKind, FieldSpec, BANNER};
use crate::error::Result;

/// Decoder state.
#[derive(Debug)]
enum State {
    /// Waiting for the next command word.
    ExpectingCommand,
    /// Response under construction.
    ExpectingField {
        remaining: VecDeque<FieldSpec>,
        partial: Response,
    },
}

/// Context threaded through demand-reader continuations.
#[derive(Debug)]
pub struct ParseState {
    state: State,
    /// Responses finished but not yet handed out.
    completed: Vec<Response>,
}

impl ParseState {
    fn banner() -> Self {
        Self {
            state: State::ExpectingField {
                remaining: BANNER.iter().copied().collect(),
                partial: Response::new(Code::Banner, 0, BANNER_NAME),
            },
            completed: Vec::new(),
        }
    }

    /// Queue fields ahead of whatever the current response still expects.
    fn push_front_fields(&mut self, fields: &[FieldSpec]) {
        if let State::ExpectingField { remaining, .. } = &mut self.state {
            for field in fields.iter().rev() {
                remaining.push_front(*field);
            }
        }
    }

    fn store(&mut self, name: &'static str, value: Value) {
        if let State::ExpectingField { partial, .. } = &mut self.state {
            partial.insert(name, value);
        }
    }
}

/// Incremental BAPS response decoder.
pub struct ResponseDecoder {
    reader: DemandReader<ParseState>,
    parse: ParseState,
}

impl ResponseDecoder {
    /// Create a decoder expecting the connection banner.
    pub fn new() -> Self {
        let mut decoder = Self {
            reader: DemandReader::new(),
            parse: ParseState::banner(),
        };
        advance(&mut decoder.reader, &mut decoder.parse);
        decoder
    }

    /// Push socket data and collect every response it completes.
    ///
    /// Responses come back in the order their bytes arrived. Partial data is
    /// buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if a response has no structure entry or
    /// carries an unknown type tag. The decoder is dead afterwards; responses
    /// completed earlier in the same push stay available through
    /// [`take_completed`](Self::take_completed).
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Response>> {
        self.reader.add_data(&mut self.parse, data)?;
        Ok(self.take_completed())
    }

    /// Take responses completed but not yet returned.
    pub fn take_completed(&mut self) -> Vec<Response> {
        std::mem::take(&mut self.parse.completed)
    }

    /// Get the number of buffered, unconsumed bytes.
    pub fn buffered(&self) -> usize {
        self.reader.len()
    }

    /// Whether a protocol error has stopped the decoder.
    pub fn is_failed(&self) -> bool {
        self.reader.is_poisoned()
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.parse.state {
            State::ExpectingCommand => "ExpectingCommand",
            State::ExpectingField { .. } => "ExpectingField",
        }
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Move the state machine forward until it needs bytes.
///
/// Finishes responses whose field list is exhausted, then queues exactly one
/// read: either the next field or the next command word.
fn advance(reader: &mut DemandReader<ParseState>, parse: &mut ParseState) {
    loop {
        match std::mem::replace(&mut parse.state, State::ExpectingCommand) {
            State::ExpectingCommand => {
                read_command_word(reader, Priority::Normal, on_command_word);
                return;
            }
            State::ExpectingField {
                mut remaining,
                partial,
            } => match remaining.pop_front() {
                Some(field) => {
                    parse.state = State::ExpectingField { remaining, partial };
                    read_field(reader, field);
                    return;
                }
                None => {
                    tracing::trace!(
                        code = %partial.code,
                        subcode = partial.subcode,
                        "response complete"
                    );
                    parse.completed.push(partial);
                }
            },
        }
    }
}

fn on_command_word(
    reader: &mut DemandReader<ParseState>,
    parse: &mut ParseState,
    word: u16,
) -> Result<()> {
    let (code, subcode) = codes::split(word);
    let fields = structure::lookup(code, subcode)?;
    let name = codes::name_of(Code::Wire(code)).unwrap_or("UNKNOWN");

    parse.state = State::ExpectingField {
        remaining: fields.iter().copied().collect(),
        partial: Response::new(Code::Wire(code), subcode, name),
    };
    advance(reader, parse);
    Ok(())
}

/// Queue the read for one field, ahead of anything else pending.
fn read_field(reader: &mut DemandReader<ParseState>, field: FieldSpec) {
    let name = field.name;
    let priority = Priority::Immediate;

    match field.kind {
        FieldKind::U16 => read_u16(reader, priority, move |reader, parse, v| {
            store(reader, parse, name, Value::U16(v))
        }),
        FieldKind::U32 => read_u32(reader, priority, move |reader, parse, v| {
            store(reader, parse, name, Value::U32(v))
        }),
        FieldKind::F32 => read_f32(reader, priority, move |reader, parse, v| {
            store(reader, parse, name, Value::F32(v))
        }),
        FieldKind::Str => read_string(reader, priority, move |reader, parse, v| {
            store(reader, parse, name, Value::Str(v))
        }),
        FieldKind::DynamicConfig => read_u32(reader, priority, move |reader, parse, tag| {
            let value = structure::config_value(tag)?;
            parse.push_front_fields(&[value]);
            store(reader, parse, name, Value::U32(tag))
        }),
        FieldKind::DynamicLoad => read_u32(reader, priority, move |reader, parse, tag| {
            parse.push_front_fields(structure::track_fields(tag)?);
            store(reader, parse, name, Value::U32(tag))
        }),
    }
}

fn store(
    reader: &mut DemandReader<ParseState>,
    parse: &mut ParseState,
    name: &'static str,
    value: Value,
) -> Result<()> {
    parse.store(name, value);
    advance(reader, parse);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::protocol::codes::{
        config, database, login_result, playback, setting_type, system, track_type,
    };
    use crate::protocol::Request;
    use bytes::{BufMut, BytesMut};

    fn banner(message: &str) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u32(message.len() as u32);
        buf.put_slice(message.as_bytes());
        buf.to_vec()
    }

    fn synced_decoder() -> ResponseDecoder {
        let mut decoder = ResponseDecoder::new();
        let responses = decoder.push(&banner("Welcome")).unwrap();
        assert_eq!(responses.len(), 1);
        decoder
    }

    #[test]
    fn test_banner_is_first_response() {
        let mut decoder = ResponseDecoder::new();
        assert_eq!(decoder.state_name(), "ExpectingField");

        let responses = decoder.push(&banner("Welcome")).unwrap();

        assert_eq!(responses.len(), 1);
        assert!(responses[0].is_banner());
        assert_eq!(responses[0].name, "CONNECT");
        assert_eq!(responses[0].get_string("message").as_deref(), Some("Welcome"));
        assert_eq!(decoder.state_name(), "ExpectingCommand");
    }

    #[test]
    fn test_banner_byte_at_a_time() {
        let mut decoder = ResponseDecoder::new();
        let mut all = Vec::new();

        for byte in banner("Welcome to BAPS") {
            all.extend(decoder.push(&[byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(
            all[0].get_string("message").as_deref(),
            Some("Welcome to BAPS")
        );
    }

    #[test]
    fn test_fieldless_response() {
        let mut decoder = synced_decoder();

        let responses = decoder
            .push(&Request::new(playback::PLAY, 2).encode())
            .unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].code, Code::Wire(playback::PLAY));
        assert_eq!(responses[0].subcode, 2);
        assert_eq!(responses[0].field_count(), 0);
    }

    #[test]
    fn test_multiple_responses_in_one_push() {
        let mut decoder = ResponseDecoder::new();

        let mut data = banner("hi");
        data.extend(Request::new(playback::STOP, 0).encode());
        data.extend(Request::new(playback::POSITION, 1).uint32(1500).encode());
        data.extend(Request::new(playback::VOLUME, 1).float32(0.75).encode());

        let responses = decoder.push(&data).unwrap();

        let names: Vec<_> = responses.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["CONNECT", "STOP", "POSITION", "VOLUME"]);
        assert_eq!(responses[2].get_u32("position"), Some(1500));
        assert_eq!(responses[3].get_f32("volume"), Some(0.75));
    }

    #[test]
    fn test_round_trip_primitive_fields() {
        let mut decoder = synced_decoder();

        let bytes = Request::new(database::LIBRARY_RESULT, 1)
            .uint16(0xABCD)
            .uint32(0x0102_0304)
            .string("Artist - Title")
            .encode();
        let responses = decoder.push(&bytes).unwrap();

        let response = &responses[0];
        assert_eq!(response.get("dirty"), Some(&Value::U16(0xABCD)));
        assert_eq!(response.get_u32("result_id"), Some(0x0102_0304));
        assert_eq!(
            response.get_string("description").as_deref(),
            Some("Artist - Title")
        );
    }

    #[test]
    fn test_partial_response_not_emitted() {
        let mut decoder = synced_decoder();

        let bytes = Request::new(system::SEED, 0).string("abc123").encode();
        let (head, tail) = bytes.split_at(bytes.len() - 1);

        assert!(decoder.push(head).unwrap().is_empty());
        assert_eq!(decoder.state_name(), "ExpectingField");

        let responses = decoder.push(tail).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].get_string("seed").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_dynamic_config_string_setting() {
        let mut decoder = synced_decoder();

        let bytes = Request::new(config::SETTING, 0)
            .uint32(12)
            .uint32(setting_type::STR)
            .string("x")
            .encode();
        let responses = decoder.push(&bytes).unwrap();

        let response = &responses[0];
        assert_eq!(response.get_u32("option_id"), Some(12));
        assert_eq!(response.get_u32("setting"), Some(setting_type::STR));
        assert_eq!(response.get_string("value").as_deref(), Some("x"));
    }

    #[test]
    fn test_dynamic_config_int_setting() {
        let mut decoder = synced_decoder();

        let bytes = Request::new(config::SETTING, 0)
            .uint32(3)
            .uint32(setting_type::INT)
            .uint32(44)
            .encode();
        let responses = decoder.push(&bytes).unwrap();

        assert_eq!(responses[0].get("value"), Some(&Value::U32(44)));
    }

    #[test]
    fn test_dynamic_load_track_types() {
        let mut decoder = synced_decoder();

        let mut data = Vec::new();
        data.extend(
            Request::new(playback::LOAD, 0)
                .uint32(0)
                .uint32(track_type::VOID)
                .string("--")
                .encode(),
        );
        data.extend(
            Request::new(playback::LOAD, 1)
                .uint32(2)
                .uint32(track_type::FILE)
                .string("Jingle")
                .uint32(9000)
                .encode(),
        );
        data.extend(
            Request::new(playback::LOAD, 2)
                .uint32(5)
                .uint32(track_type::TEXT)
                .string("Notes")
                .string("Read the weather")
                .encode(),
        );
        data.extend(Request::new(playback::PLAY, 1).encode());

        let responses = decoder.push(&data).unwrap();
        assert_eq!(responses.len(), 4);

        let void = &responses[0];
        assert_eq!(void.get_u32("track_type"), Some(track_type::VOID));
        assert_eq!(void.get_string("title").as_deref(), Some("--"));
        assert_eq!(void.field_count(), 3);

        let file = &responses[1];
        assert_eq!(file.get_u32("index"), Some(2));
        assert_eq!(file.get_u32("duration"), Some(9000));

        let text = &responses[2];
        assert_eq!(text.get_string("text").as_deref(), Some("Read the weather"));

        assert_eq!(responses[3].name, "PLAY");
    }

    #[test]
    fn test_dynamic_load_fragmented() {
        let data = Request::new(playback::LOAD, 1)
            .uint32(2)
            .uint32(track_type::LIBRARY)
            .string("Song")
            .uint32(180_000)
            .encode();

        let mut decoder = synced_decoder();
        let mut all = Vec::new();
        for chunk in data.chunks(3) {
            all.extend(decoder.push(chunk).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get_u32("duration"), Some(180_000));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_field_order_follows_wire() {
        let mut decoder = synced_decoder();
        let bytes = Request::new(playback::LOAD, 0)
            .uint32(1)
            .uint32(track_type::FILE)
            .string("t")
            .uint32(1)
            .encode();

        let responses = decoder.push(&bytes).unwrap();
        let names: Vec<_> = responses[0].fields().map(|(n, _)| n).collect();

        assert_eq!(names, vec!["index", "track_type", "title", "duration"]);
    }

    #[test]
    fn test_login_result_subcode() {
        let mut decoder = synced_decoder();
        let bytes = Request::new(system::LOGIN_RESULT, login_result::INCORRECT_PASSWORD)
            .string("Bad password")
            .encode();

        let responses = decoder.push(&bytes).unwrap();

        assert_eq!(responses[0].subcode, login_result::INCORRECT_PASSWORD);
        assert_eq!(
            responses[0].get_string("details").as_deref(),
            Some("Bad password")
        );
    }

    #[test]
    fn test_unknown_code_is_fatal() {
        let mut decoder = synced_decoder();

        let mut data = Request::new(0x4440, 3).uint32(1).encode().to_vec();
        data.extend(Request::new(playback::PLAY, 0).encode());

        let err = decoder.push(&data).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UnknownCode {
                code: 0x4440,
                subcode: 3
            }
        ));
        assert!(decoder.is_failed());

        // Nothing after the bad word is decoded, now or later.
        assert!(decoder.take_completed().is_empty());
        let err = decoder
            .push(&Request::new(playback::STOP, 0).encode())
            .unwrap_err();
        assert!(matches!(err, GatewayError::DecoderPoisoned));
    }

    #[test]
    fn test_responses_before_error_kept() {
        let mut decoder = synced_decoder();

        let mut data = Request::new(playback::PLAY, 0).encode().to_vec();
        data.extend(Request::new(0x4440, 0).encode());

        assert!(decoder.push(&data).is_err());

        let kept = decoder.take_completed();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "PLAY");
    }

    #[test]
    fn test_unknown_track_type_is_fatal() {
        let mut decoder = synced_decoder();
        let bytes = Request::new(playback::LOAD, 0)
            .uint32(0)
            .uint32(99)
            .encode();

        let err = decoder.push(&bytes).unwrap_err();
        assert!(matches!(err, GatewayError::UnknownTrackType(99)));
        assert!(err.is_protocol());
    }
}
