//! ELM327 reply parsing
//!
//! The adapter answers every command with one or more CR-separated lines
//! followed by a `>` prompt. Status words such as `NO DATA` share the same
//! channel as hex payloads, so every reply is classified here before a
//! value is decoded.

use crate::error::ObdError;
use crate::mode;
use crate::pid::Pid;

/// Prompt byte the adapter prints when it is ready for the next command
pub(crate) const PROMPT: u8 = b'>';

/// A classified adapter reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElmReply {
    /// Data bytes following the mode/PID echo of a positive response
    Data(Vec<u8>),
    /// The vehicle did not answer the request
    NoData,
    /// The adapter did not understand the request
    Unknown,
    /// Any other text, e.g. `OK` or the reset banner
    Text(String),
}

impl ElmReply {
    /// Classify the text received before the prompt.
    ///
    /// `command` is the request that produced the reply; an echoed copy of
    /// it is ignored. When `pid` is given, only a positive response for
    /// that PID is accepted as data.
    pub fn parse(raw: &str, command: &str, pid: Option<Pid>) -> Result<Self, ObdError> {
        let lines: Vec<&str> = raw
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| !line.eq_ignore_ascii_case(command))
            .filter(|line| !line.starts_with("SEARCHING"))
            .filter(|line| !line.starts_with("BUS INIT"))
            .collect();

        for line in &lines {
            classify_status(line)?;
        }

        if lines.iter().any(|line| *line == "NO DATA") {
            return Ok(ElmReply::NoData);
        }
        if lines.iter().any(|line| *line == "?") {
            return Ok(ElmReply::Unknown);
        }

        let Some(pid) = pid else {
            return Ok(ElmReply::Text(lines.join(" ")));
        };

        let prefix = [mode::CURRENT_DATA + mode::RESPONSE_OFFSET, pid.as_hex()];
        for line in &lines {
            let Some(bytes) = decode_hex(line) else {
                continue;
            };
            if bytes.len() > prefix.len() && bytes[..prefix.len()] == prefix {
                return Ok(ElmReply::Data(bytes[prefix.len()..].to_vec()));
            }
        }

        Err(ObdError::InvalidResponse(lines.join(" ")))
    }

    /// Whether an AT command was acknowledged
    pub fn is_ok(&self) -> bool {
        matches!(self, ElmReply::Text(text) if text.ends_with("OK"))
    }
}

/// Map adapter status words that signal a failed request
fn classify_status(line: &str) -> Result<(), ObdError> {
    if line.starts_with("UNABLE TO CONNECT") {
        return Err(ObdError::VehicleNotConnected);
    }
    const BUS_FAULTS: [&str; 7] = [
        "CAN ERROR",
        "BUS ERROR",
        "BUS BUSY",
        "FB ERROR",
        "DATA ERROR",
        "BUFFER FULL",
        "<RX ERROR",
    ];
    if BUS_FAULTS.iter().any(|fault| line.starts_with(fault)) || line.starts_with("ERR") {
        return Err(ObdError::CanBusError(line.to_string()));
    }
    if line == "STOPPED" {
        return Err(ObdError::InvalidResponse("request interrupted".to_string()));
    }
    Ok(())
}

/// Decode a hex line, ignoring the spaces the adapter may insert
fn decode_hex(line: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = line.bytes().filter(|b| *b != b' ').collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}
