//! Code table: protocol code words and their names.
//!
//! A 16-bit code word packs a main code and a subcode:
//! ```text
//! ┌──────────────────────────┬───────────┐
//! │ Main code (bits 4-15)    │ Subcode   │
//! │ raw & 0xFFF0             │ raw & 0xF │
//! └──────────────────────────┴───────────┘
//! ```
//! The subcode is usually a channel index or a sub-selector.
//!
//! Each group owns one high nibble of the code space (playback `0x0`,
//! playlist `0x2`, database `0x3`, config `0x5`, system `0xE`). The values
//! are this gateway's reconstruction of the BAPS code map and have not been
//! checked against a live server; a corrected group only touches its own
//! module below.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{GatewayError, Result};

/// Mask selecting the main code.
pub const MAIN_CODE_MASK: u16 = 0xFFF0;

/// Mask selecting the subcode.
pub const SUBCODE_MASK: u16 = 0x000F;

/// Name reported for the connection banner pseudo-code.
pub const BANNER_NAME: &str = "CONNECT";

/// Split a raw code word into `(main_code, subcode)`.
#[inline]
pub fn split(raw: u16) -> (u16, u8) {
    (raw & MAIN_CODE_MASK, (raw & SUBCODE_MASK) as u8)
}

/// Pack a main code and subcode into a raw code word.
///
/// Bits outside each component's mask are dropped.
#[inline]
pub fn join(code: u16, subcode: u8) -> u16 {
    (code & MAIN_CODE_MASK) | (u16::from(subcode) & SUBCODE_MASK)
}

/// Response code as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Code {
    /// The banner string the server sends unprompted on connect.
    ///
    /// Never appears on the wire as a code word.
    Banner,
    /// A main code read from a command word.
    Wire(u16),
}

impl Code {
    /// The main code, if this is a real wire code.
    pub fn wire(self) -> Option<u16> {
        match self {
            Code::Banner => None,
            Code::Wire(code) => Some(code),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, name_of(*self)) {
            (_, Some(name)) => f.write_str(name),
            (Code::Wire(code), None) => write!(f, "0x{code:04X}"),
            (Code::Banner, None) => f.write_str(BANNER_NAME),
        }
    }
}

/// Playback codes; subcode is the channel.
pub mod playback {
    pub const PLAY: u16 = 0x0000;
    pub const STOP: u16 = 0x0080;
    pub const PAUSE: u16 = 0x0100;
    pub const POSITION: u16 = 0x0180;
    pub const VOLUME: u16 = 0x0200;
    pub const LOAD: u16 = 0x0280;
    pub const CUE: u16 = 0x0300;
    pub const INTRO: u16 = 0x0380;
}

/// Playlist codes; subcode is the channel.
pub mod playlist {
    pub const ADD_ITEM: u16 = 0x2000;
    pub const DELETE_ITEM: u16 = 0x2040;
    pub const MOVE_ITEM_TO: u16 = 0x2080;
    pub const ITEM_DATA: u16 = 0x20C0;
    pub const GET: u16 = 0x2100;
    pub const RESET: u16 = 0x2140;
    pub const COPY_ITEM_TO: u16 = 0x2180;
    pub const ITEM_COUNT: u16 = 0x21C0;
}

/// Record library codes.
pub mod database {
    pub const LIBRARY_SEARCH: u16 = 0x3000;
    pub const LIBRARY_ORDERING: u16 = 0x3020;
    pub const LIBRARY_RESULT: u16 = 0x3040;
    pub const LIBRARY_ERROR: u16 = 0x3060;
}

/// Server configuration codes.
pub mod config {
    pub const OPTION_COUNT: u16 = 0x5000;
    pub const OPTION: u16 = 0x5020;
    pub const OPTION_CHOICE_COUNT: u16 = 0x5040;
    pub const OPTION_CHOICE: u16 = 0x5060;
    pub const SETTING_COUNT: u16 = 0x5080;
    pub const SETTING: u16 = 0x50A0;
    pub const RESULT: u16 = 0x50C0;
    pub const GET_OPTIONS: u16 = 0x50E0;
    pub const SET_CONFIG_VALUE: u16 = 0x5100;
}

/// Connection and session codes.
pub mod system {
    pub const LIST_FILES: u16 = 0xE000;
    pub const FILENAME: u16 = 0xE020;
    pub const SEND_MESSAGE: u16 = 0xE040;
    pub const MESSAGE: u16 = 0xE060;
    pub const CLIENT_ADD: u16 = 0xE080;
    pub const CLIENT_REMOVE: u16 = 0xE0A0;
    pub const SET_BINARY_MODE: u16 = 0xE0C0;
    pub const SEED: u16 = 0xE0E0;
    pub const LOGIN: u16 = 0xE100;
    pub const LOGIN_RESULT: u16 = 0xE120;
    pub const VERSION: u16 = 0xE140;
    pub const SYNC: u16 = 0xE160;
    pub const END: u16 = 0xE180;
    pub const QUIT: u16 = 0xE1A0;
}

/// LOGIN_RESULT subcodes.
pub mod login_result {
    pub const OK: u8 = 0;
    pub const INCORRECT_USER: u8 = 1;
    pub const EXISTS: u8 = 2;
    pub const NO_ACCESS: u8 = 3;
    pub const INCORRECT_PASSWORD: u8 = 4;

    /// Name of a login result subcode.
    pub fn name(status: u8) -> &'static str {
        match status {
            OK => "OK",
            INCORRECT_USER => "INCORRECT_USER",
            EXISTS => "EXISTS",
            NO_ACCESS => "NO_ACCESS",
            INCORRECT_PASSWORD => "INCORRECT_PASSWORD",
            _ => "UNKNOWN",
        }
    }
}

/// SYNC subcodes.
pub mod sync {
    /// Synchronise, then keep receiving live updates.
    pub const SUBSCRIBE: u8 = 3;
}

/// Config setting type tags.
pub mod setting_type {
    pub const INT: u32 = 0;
    pub const STR: u32 = 1;
    pub const CHOICE: u32 = 2;
}

/// Track type tags carried by LOAD and ITEM_DATA.
pub mod track_type {
    pub const VOID: u32 = 0;
    pub const FILE: u32 = 1;
    pub const LIBRARY: u32 = 2;
    pub const TEXT: u32 = 3;
}

const PLAYBACK_CODES: &[(u16, &str)] = &[
    (playback::PLAY, "PLAY"),
    (playback::STOP, "STOP"),
    (playback::PAUSE, "PAUSE"),
    (playback::POSITION, "POSITION"),
    (playback::VOLUME, "VOLUME"),
    (playback::LOAD, "LOAD"),
    (playback::CUE, "CUE"),
    (playback::INTRO, "INTRO"),
];

const PLAYLIST_CODES: &[(u16, &str)] = &[
    (playlist::ADD_ITEM, "ADD_ITEM"),
    (playlist::DELETE_ITEM, "DELETE_ITEM"),
    (playlist::MOVE_ITEM_TO, "MOVE_ITEM_TO"),
    (playlist::ITEM_DATA, "ITEM_DATA"),
    (playlist::GET, "GET"),
    (playlist::RESET, "RESET"),
    (playlist::COPY_ITEM_TO, "COPY_ITEM_TO"),
    (playlist::ITEM_COUNT, "ITEM_COUNT"),
];

const DATABASE_CODES: &[(u16, &str)] = &[
    (database::LIBRARY_SEARCH, "LIBRARY_SEARCH"),
    (database::LIBRARY_ORDERING, "LIBRARY_ORDERING"),
    (database::LIBRARY_RESULT, "LIBRARY_RESULT"),
    (database::LIBRARY_ERROR, "LIBRARY_ERROR"),
];

const CONFIG_CODES: &[(u16, &str)] = &[
    (config::OPTION_COUNT, "OPTION_COUNT"),
    (config::OPTION, "OPTION"),
    (config::OPTION_CHOICE_COUNT, "OPTION_CHOICE_COUNT"),
    (config::OPTION_CHOICE, "OPTION_CHOICE"),
    (config::SETTING_COUNT, "SETTING_COUNT"),
    (config::SETTING, "SETTING"),
    (config::RESULT, "RESULT"),
    (config::GET_OPTIONS, "GET_OPTIONS"),
    (config::SET_CONFIG_VALUE, "SET_CONFIG_VALUE"),
];

const SYSTEM_CODES: &[(u16, &str)] = &[
    (system::LIST_FILES, "LIST_FILES"),
    (system::FILENAME, "FILENAME"),
    (system::SEND_MESSAGE, "SEND_MESSAGE"),
    (system::MESSAGE, "MESSAGE"),
    (system::CLIENT_ADD, "CLIENT_ADD"),
    (system::CLIENT_REMOVE, "CLIENT_REMOVE"),
    (system::SET_BINARY_MODE, "SET_BINARY_MODE"),
    (system::SEED, "SEED"),
    (system::LOGIN, "LOGIN"),
    (system::LOGIN_RESULT, "LOGIN_RESULT"),
    (system::VERSION, "VERSION"),
    (system::SYNC, "SYNC"),
    (system::END, "END"),
    (system::QUIT, "QUIT"),
];

/// A named group of related codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeGroup {
    Playback,
    Playlist,
    Database,
    Config,
    System,
}

impl CodeGroup {
    /// Every group, in code order.
    pub const ALL: [CodeGroup; 5] = [
        CodeGroup::Playback,
        CodeGroup::Playlist,
        CodeGroup::Database,
        CodeGroup::Config,
        CodeGroup::System,
    ];

    /// Lowercase group name.
    pub fn name(self) -> &'static str {
        match self {
            CodeGroup::Playback => "playback",
            CodeGroup::Playlist => "playlist",
            CodeGroup::Database => "database",
            CodeGroup::Config => "config",
            CodeGroup::System => "system",
        }
    }

    /// `(main_code, name)` pairs in this group.
    pub fn codes(self) -> &'static [(u16, &'static str)] {
        match self {
            CodeGroup::Playback => PLAYBACK_CODES,
            CodeGroup::Playlist => PLAYLIST_CODES,
            CodeGroup::Database => DATABASE_CODES,
            CodeGroup::Config => CONFIG_CODES,
            CodeGroup::System => SYSTEM_CODES,
        }
    }

    /// Name of `code` within this group.
    pub fn name_of(self, code: u16) -> Option<&'static str> {
        self.codes()
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
    }
}

impl FromStr for CodeGroup {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        CodeGroup::ALL
            .into_iter()
            .find(|group| group.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GatewayError::UnknownCodeGroup(s.to_string()))
    }
}

/// Reverse lookup of a code's name across all groups.
pub fn name_of(code: Code) -> Option<&'static str> {
    match code {
        Code::Banner => Some(BANNER_NAME),
        Code::Wire(main) => CodeGroup::ALL
            .into_iter()
            .find_map(|group| group.name_of(main)),
    }
}

/// Look up a code's name inside the group called `group`.
///
/// # Errors
///
/// Returns [`GatewayError::UnknownCodeGroup`] if no such group exists.
pub fn name_in(group: &str, code: u16) -> Result<Option<&'static str>> {
    Ok(group.parse::<CodeGroup>()?.name_of(code))
}
