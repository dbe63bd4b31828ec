//! Error types for baps-gateway.

use thiserror::Error;

/// Main error type for all gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (response output only).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Inbound main code has no response structure.
    ///
    /// The decoder's alignment with the byte stream is lost after this.
    #[error("Protocol error: unknown response code 0x{code:04X} (subcode {subcode})")]
    UnknownCode {
        /// Main code as read from the wire.
        code: u16,
        /// Subcode as read from the wire.
        subcode: u8,
    },

    /// A config setting carried a type tag outside the setting type enumeration.
    #[error("Protocol error: unknown config setting type {0}")]
    UnknownSettingType(u32),

    /// A load response carried a type tag outside the track type enumeration.
    #[error("Protocol error: unknown track type {0}")]
    UnknownTrackType(u32),

    /// The decoder already hit a protocol error and refuses further input.
    #[error("Decoder stopped after an earlier protocol error")]
    DecoderPoisoned,

    /// Code group name not present in the code table.
    #[error("Unknown code group: {0}")]
    UnknownCodeGroup(String),

    /// Server rejected the login.
    #[error("Authentication failed ({status}): {details}")]
    AuthenticationFailed {
        /// Login result name from the code table.
        status: &'static str,
        /// Human-readable detail string sent by the server.
        details: String,
    },

    /// Server dropped the connection without us asking.
    #[error("Connection lost")]
    ConnectionLost,

    /// Outbound queue closed (writer task gone).
    #[error("Connection closed")]
    ConnectionClosed,

    /// Outbound queue is at capacity; the writer is still running.
    #[error("Outbound queue full")]
    QueueFull,

    /// Configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Whether this error means the decoder lost its place in the stream.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            GatewayError::UnknownCode { .. }
                | GatewayError::UnknownSettingType(_)
                | GatewayError::UnknownTrackType(_)
                | GatewayError::DecoderPoisoned
        )
    }
}

/// Result type alias using GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;
