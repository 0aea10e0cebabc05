//! Expected-vs-actual judgment for a replayed case.

use serde::Serialize;

use crate::case::{ProcessOutput, TestCase};
use crate::codec::CaseField;

/// One field that differs between the stored case and the replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldMismatch {
    ExitCode { expected: i32, actual: i32 },
    Stdout(TextMismatch),
    Stderr(TextMismatch),
}

/// Both sides of a differing text stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMismatch {
    pub expected: String,
    pub actual: String,
    pub expected_len: usize,
    pub actual_len: usize,
}

impl TextMismatch {
    fn new(expected: &str, actual: &str) -> Self {
        Self {
            expected: expected.to_string(),
            actual: actual.to_string(),
            expected_len: expected.len(),
            actual_len: actual.len(),
        }
    }
}

impl FieldMismatch {
    #[must_use]
    pub const fn field(&self) -> CaseField {
        match self {
            Self::ExitCode { .. } => CaseField::ExitCode,
            Self::Stdout(_) => CaseField::Stdout,
            Self::Stderr(_) => CaseField::Stderr,
        }
    }
}

/// Outcome of comparing one case. A failing verdict is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub mismatches: Vec<FieldMismatch>,
}

impl Verdict {
    /// Fields that differed, in exit code, stdout, stderr order.
    #[must_use]
    pub fn mismatched_fields(&self) -> Vec<CaseField> {
        self.mismatches.iter().map(FieldMismatch::field).collect()
    }
}

/// Compare every checked field; never stops at the first difference.
#[must_use]
pub fn compare(expected: &TestCase, actual: &ProcessOutput) -> Verdict {
    let mut mismatches = Vec::new();

    if expected.expected_exit_code() != actual.exit_code {
        mismatches.push(FieldMismatch::ExitCode {
            expected: expected.expected_exit_code(),
            actual: actual.exit_code,
        });
    }
    if expected.expected_stdout() != actual.stdout {
        mismatches.push(FieldMismatch::Stdout(TextMismatch::new(
            expected.expected_stdout(),
            &actual.stdout,
        )));
    }
    if expected.expected_stderr() != actual.stderr {
        mismatches.push(FieldMismatch::Stderr(TextMismatch::new(
            expected.expected_stderr(),
            &actual.stderr,
        )));
    }

    Verdict {
        passed: mismatches.is_empty(),
        mismatches,
    }
}
