//! Response structure table.
//!
//! Describes, per main code, the ordered fields a response carries. Most
//! fields are primitives; two kinds decide the shape of what follows from a
//! tag read earlier in the same response:
//!
//! - [`FieldKind::DynamicConfig`]: a setting type tag, then one `value`
//!   field whose kind depends on the tag.
//! - [`FieldKind::DynamicLoad`]: a track type tag, then the per-type track
//!   fields (title, and duration or text).
//!
//! A main code missing from the table cannot be skipped: the protocol has no
//! reliable length, so the stream position is lost.

use super::codes::{config, database, playback, playlist, setting_type, system, track_type};
use crate::error::{GatewayError, Result};

/// How a field is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U16,
    U32,
    F32,
    Str,
    /// `u32` setting type, then a `value` field of the matching kind.
    DynamicConfig,
    /// `u32` track type, then the fields for that track type.
    DynamicLoad,
}

/// One named field in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub const fn u16(name: &'static str) -> Self {
        Self::new(name, FieldKind::U16)
    }

    pub const fn u32(name: &'static str) -> Self {
        Self::new(name, FieldKind::U32)
    }

    pub const fn f32(name: &'static str) -> Self {
        Self::new(name, FieldKind::F32)
    }

    pub const fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::Str)
    }
}

/// Fields of the connection banner.
pub const BANNER: &[FieldSpec] = &[FieldSpec::string("message")];

const NONE: &[FieldSpec] = &[];
const POSITION: &[FieldSpec] = &[FieldSpec::u32("position")];
const VOLUME: &[FieldSpec] = &[FieldSpec::f32("volume")];
const LOADED_ITEM: &[FieldSpec] = &[
    FieldSpec::u32("index"),
    FieldSpec::new("track_type", FieldKind::DynamicLoad),
];
const INDEX: &[FieldSpec] = &[FieldSpec::u32("index")];
const MOVE_ITEM: &[FieldSpec] = &[FieldSpec::u32("old_index"), FieldSpec::u32("new_index")];
const COUNT: &[FieldSpec] = &[FieldSpec::u32("count")];

const LIBRARY_RESULT: &[FieldSpec] = &[
    FieldSpec::u16("dirty"),
    FieldSpec::u32("result_id"),
    FieldSpec::string("description"),
];
const LIBRARY_ERROR: &[FieldSpec] = &[
    FieldSpec::u32("error_code"),
    FieldSpec::string("description"),
];

const OPTION: &[FieldSpec] = &[
    FieldSpec::u32("option_id"),
    FieldSpec::string("description"),
    FieldSpec::u32("option_type"),
];
const OPTION_COUNT: &[FieldSpec] = &[FieldSpec::u32("option_id"), FieldSpec::u32("count")];
const OPTION_CHOICE: &[FieldSpec] = &[
    FieldSpec::u32("option_id"),
    FieldSpec::u32("choice_index"),
    FieldSpec::string("description"),
];
const SETTING: &[FieldSpec] = &[
    FieldSpec::u32("option_id"),
    FieldSpec::new("setting", FieldKind::DynamicConfig),
];
const CONFIG_RESULT: &[FieldSpec] = &[FieldSpec::u32("option_id"), FieldSpec::u32("result")];

const FILENAME: &[FieldSpec] = &[FieldSpec::u32("index"), FieldSpec::string("filename")];
const MESSAGE: &[FieldSpec] = &[
    FieldSpec::string("sender"),
    FieldSpec::string("subject"),
    FieldSpec::string("text"),
];
const CLIENT: &[FieldSpec] = &[FieldSpec::string("client")];
const SEED: &[FieldSpec] = &[FieldSpec::string("seed")];
const LOGIN_RESULT: &[FieldSpec] = &[FieldSpec::string("details")];
const VERSION: &[FieldSpec] = &[
    FieldSpec::string("version"),
    FieldSpec::string("date"),
    FieldSpec::string("time"),
    FieldSpec::string("author"),
];

const VOID_TRACK: &[FieldSpec] = &[FieldSpec::string("title")];
const TIMED_TRACK: &[FieldSpec] = &[FieldSpec::string("title"), FieldSpec::u32("duration")];
const TEXT_TRACK: &[FieldSpec] = &[FieldSpec::string("title"), FieldSpec::string("text")];

/// Fields of a response with the given main code, if it has an entry.
pub fn structure_for(code: u16) -> Option<&'static [FieldSpec]> {
    let fields = match code {
        playback::PLAY | playback::STOP | playback::PAUSE => NONE,
        playback::POSITION | playback::CUE | playback::INTRO => POSITION,
        playback::VOLUME => VOLUME,
        playback::LOAD => LOADED_ITEM,

        playlist::ITEM_DATA => LOADED_ITEM,
        playlist::DELETE_ITEM => INDEX,
        playlist::MOVE_ITEM_TO => MOVE_ITEM,
        playlist::RESET => NONE,
        playlist::ITEM_COUNT => COUNT,

        database::LIBRARY_RESULT => LIBRARY_RESULT,
        database::LIBRARY_ERROR => LIBRARY_ERROR,

        config::OPTION_COUNT | config::SETTING_COUNT => COUNT,
        config::OPTION => OPTION,
        config::OPTION_CHOICE_COUNT => OPTION_COUNT,
        config::OPTION_CHOICE => OPTION_CHOICE,
        config::SETTING => SETTING,
        config::RESULT => CONFIG_RESULT,

        system::LIST_FILES => COUNT,
        system::FILENAME => FILENAME,
        system::MESSAGE => MESSAGE,
        system::CLIENT_ADD | system::CLIENT_REMOVE => CLIENT,
        system::SEED => SEED,
        system::LOGIN_RESULT => LOGIN_RESULT,
        system::VERSION => VERSION,
        system::QUIT => NONE,

        _ => return None,
    };
    Some(fields)
}

/// Like [`structure_for`], but a missing entry is a protocol error.
pub fn lookup(code: u16, subcode: u8) -> Result<&'static [FieldSpec]> {
    structure_for(code).ok_or(GatewayError::UnknownCode { code, subcode })
}

/// The `value` field following a config setting type tag.
pub fn config_value(setting: u32) -> Result<FieldSpec> {
    match setting {
        setting_type::CHOICE | setting_type::INT => Ok(FieldSpec::u32("value")),
        setting_type::STR => Ok(FieldSpec::string("value")),
        other => Err(GatewayError::UnknownSettingType(other)),
    }
}

/// The fields following a track type tag.
pub fn track_fields(track: u32) -> Result<&'static [FieldSpec]> {
    match track {
        track_type::VOID => Ok(VOID_TRACK),
        track_type::FILE | track_type::LIBRARY => Ok(TIMED_TRACK),
        track_type::TEXT => Ok(TEXT_TRACK),
        other => Err(GatewayError::UnknownTrackType(other)),
    }
}
