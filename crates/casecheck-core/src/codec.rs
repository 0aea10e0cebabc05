//! Binary `.case` record format.
//!
//! Layout (big-endian, no padding):
//!
//! ```text
//! offset  width  field
//! 0       1      expected exit code (u8)
//! 1       2      command length (u16)
//! 3       4      stdout length (u32)
//! 7       4      stderr length (u32)
//! 11      4      stdin length (u32)
//! 15      ..     command, stdout, stderr, stdin (UTF-8, in that order)
//! ```
//!
//! Every payload is framed by its length prefix only. Decoding reads exactly
//! the declared number of bytes per field and never scans for delimiters.

use core::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::case::TestCase;

/// Fixed header size.
pub const HEADER_SIZE: usize = 15;
/// Largest encodable command, in bytes.
pub const COMMAND_LIMIT: u64 = u16::MAX as u64;
/// Largest encodable stdout/stderr/stdin, in bytes.
pub const STREAM_LIMIT: u64 = u32::MAX as u64;

const OFF_EXIT_CODE: usize = 0; // u8
const OFF_COMMAND_LEN: usize = 1; // u16
const OFF_STDOUT_LEN: usize = 3; // u32
const OFF_STDERR_LEN: usize = 7; // u32
const OFF_STDIN_LEN: usize = 11; // u32

/// Names of the persisted fields, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseField {
    Header,
    ExitCode,
    Command,
    Stdout,
    Stderr,
    Stdin,
}

impl CaseField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::ExitCode => "exit_code",
            Self::Command => "command",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Stdin => "stdin",
        }
    }
}

impl fmt::Display for CaseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("expected exit code {value} does not fit in one byte (0-255)")]
    InvalidExitCode { value: i32 },
    #[error("{field} is {length} bytes, limit is {limit}")]
    FieldTooLarge {
        field: CaseField,
        length: usize,
        limit: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{field} declares {declared} bytes but only {available} remain")]
    TruncatedInput {
        field: CaseField,
        declared: usize,
        available: usize,
    },
    #[error("{count} unexpected byte(s) after the last field")]
    TrailingBytes { count: usize },
    #[error("{field} is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 {
        field: CaseField,
        valid_up_to: usize,
    },
}

/// How bytes past the final payload are treated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Any trailing byte is a [`DecodeError::TrailingBytes`].
    #[default]
    Strict,
    /// Trailing bytes are never read.
    Lenient,
}

impl DecodePolicy {
    /// Parse from string (case-insensitive). Unknown values fall back to `Strict`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" | "loose" | "ignore" => Self::Lenient,
            _ => Self::Strict,
        }
    }
}

/// Encode a case into its binary form.
pub fn encode_case(case: &TestCase) -> Result<Vec<u8>, EncodeError> {
    let exit_code =
        u8::try_from(case.expected_exit_code()).map_err(|_| EncodeError::InvalidExitCode {
            value: case.expected_exit_code(),
        })?;

    let command = case.command().as_bytes();
    let stdout = case.expected_stdout().as_bytes();
    let stderr = case.expected_stderr().as_bytes();
    let stdin = case.stdin().as_bytes();

    let command_len: u16 = checked_len(CaseField::Command, command, COMMAND_LIMIT)?;
    let stdout_len: u32 = checked_len(CaseField::Stdout, stdout, STREAM_LIMIT)?;
    let stderr_len: u32 = checked_len(CaseField::Stderr, stderr, STREAM_LIMIT)?;
    let stdin_len: u32 = checked_len(CaseField::Stdin, stdin, STREAM_LIMIT)?;

    let mut out = Vec::with_capacity(
        HEADER_SIZE + command.len() + stdout.len() + stderr.len() + stdin.len(),
    );
    out.push(exit_code);
    out.extend_from_slice(&command_len.to_be_bytes());
    out.extend_from_slice(&stdout_len.to_be_bytes());
    out.extend_from_slice(&stderr_len.to_be_bytes());
    out.extend_from_slice(&stdin_len.to_be_bytes());
    debug_assert_eq!(out.len(), HEADER_SIZE);
    out.extend_from_slice(command);
    out.extend_from_slice(stdout);
    out.extend_from_slice(stderr);
    out.extend_from_slice(stdin);
    Ok(out)
}

fn checked_len<T: TryFrom<usize>>(
    field: CaseField,
    bytes: &[u8],
    limit: u64,
) -> Result<T, EncodeError> {
    T::try_from(bytes.len()).map_err(|_| EncodeError::FieldTooLarge {
        field,
        length: bytes.len(),
        limit,
    })
}

/// Decode with [`DecodePolicy::Strict`].
pub fn decode_case(bytes: &[u8]) -> Result<TestCase, DecodeError> {
    decode_case_with(bytes, DecodePolicy::Strict)
}

/// Decode a binary case record.
pub fn decode_case_with(bytes: &[u8], policy: DecodePolicy) -> Result<TestCase, DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let header = cursor.take(CaseField::Header, HEADER_SIZE)?;

    let exit_code = header[OFF_EXIT_CODE];
    let command_len = usize::from(read_u16(header, OFF_COMMAND_LEN));
    let stdout_len = read_u32_len(header, OFF_STDOUT_LEN);
    let stderr_len = read_u32_len(header, OFF_STDERR_LEN);
    let stdin_len = read_u32_len(header, OFF_STDIN_LEN);

    let command = cursor.take_text(CaseField::Command, command_len)?;
    let stdout = cursor.take_text(CaseField::Stdout, stdout_len)?;
    let stderr = cursor.take_text(CaseField::Stderr, stderr_len)?;
    let stdin = cursor.take_text(CaseField::Stdin, stdin_len)?;

    let remaining = cursor.remaining();
    if remaining > 0 && policy == DecodePolicy::Strict {
        return Err(DecodeError::TrailingBytes { count: remaining });
    }

    Ok(TestCase::new(
        i32::from(exit_code),
        command,
        stdout,
        stderr,
        stdin,
    ))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, field: CaseField, len: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.remaining();
        if len > available {
            return Err(DecodeError::TruncatedInput {
                field,
                declared: len,
                available,
            });
        }
        let chunk = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(chunk)
    }

    fn take_text(&mut self, field: CaseField, len: usize) -> Result<String, DecodeError> {
        let chunk = self.take(field, len)?;
        core::str::from_utf8(chunk)
            .map(str::to_owned)
            .map_err(|err| DecodeError::InvalidUtf8 {
                field,
                valid_up_to: err.valid_up_to(),
            })
    }
}

fn read_u16(bytes: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([bytes[off], bytes[off + 1]])
}

fn read_u32_len(bytes: &[u8], off: usize) -> usize {
    let v = u32::from_be_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]]);
    // A length that does not fit in usize can never be satisfied by the input.
    usize::try_from(v).unwrap_or(usize::MAX)
}
