//! Response output on stdout.
//!
//! With JSON output enabled every response received after synchronisation
//! is written to stdout as one JSON object per line.
//!
//! # Important
//!
//! - **stdout**: JSON lines only (one response per line)
//! - **stderr**: Logs (see [`crate::telemetry`])
//! - **Never use `println!`**: It may add `\r\n` on Windows
//!
//! # Example
//!
//! ```ignore
//! use baps_gateway::output::write_response_json;
//!
//! write_response_json(&response)?;
//! // {"code":57568,"name":"SEED","subcode":0,"fields":{"seed":"abc123"}}
//! ```

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::protocol::Response;

/// Write a line to stdout.
///
/// Writes the string followed by a single `\n` and flushes.
///
/// # Errors
///
/// Returns IO error if write or flush fails.
pub fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_line(&mut handle, line)
}

/// Write a JSON value to stdout as a single line.
pub fn write_stdout_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    write_stdout_line(&json)?;
    Ok(())
}

/// Write a decoded response to stdout as a JSON line.
pub fn write_response_json(response: &Response) -> Result<()> {
    write_stdout_json(response)
}

/// Write a JSON line to any writer.
pub fn write_json_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    write_line(out, &json)?;
    Ok(())
}

fn write_line<W: Write>(out: &mut W, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}
