//! Check, record and update operations: the runner and the comparator glued
//! to the case store.

use std::path::Path;
use std::time::{Duration, Instant};

use casecheck_core::{
    Convention, DecodePolicy, EncodeError, NamingError, ProcessOutput, TestCase, TokenizeError,
    Verdict, compare, encode_case,
};
use serde::Serialize;
use thiserror::Error;

use crate::runner::{RunError, RunOptions, run_process};
use crate::store::{self, StoreError};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Naming(#[from] NamingError),
}

impl CheckError {
    /// True when the child was killed for exceeding its time bound.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Run(RunError::Timeout { .. }))
    }
}

fn run_case(case: &TestCase, options: &RunOptions) -> Result<ProcessOutput, CheckError> {
    let tokens = case.command_list()?;
    Ok(run_process(&tokens, case.stdin(), options)?)
}

/// Run the case's command with its stdin and compare against its expectations.
///
/// A mismatch is a failing [`Verdict`], not an error.
pub fn check_case(expected: &TestCase, options: &RunOptions) -> Result<Verdict, CheckError> {
    let actual = run_case(expected, options)?;
    Ok(compare(expected, &actual))
}

/// Run `tokens` with `stdin` and capture the result as a new case.
pub fn record_case(
    tokens: &[String],
    stdin: &str,
    options: &RunOptions,
) -> Result<TestCase, CheckError> {
    let output = run_process(tokens, stdin, options)?;
    let case = TestCase::from_run(tokens, stdin, output)?;
    // Surface encoding limits before anyone tries to persist it.
    encode_case(&case)?;
    Ok(case)
}

/// Re-run a stored case. Command text and stdin are carried over verbatim;
/// exit code, stdout and stderr are replaced by what the run produced.
pub fn update_case(stored: &TestCase, options: &RunOptions) -> Result<TestCase, CheckError> {
    let output = run_case(stored, options)?;
    let refreshed = stored.with_observed(output);
    encode_case(&refreshed)?;
    Ok(refreshed)
}

/// Decode, refresh and overwrite the case at `path`. The file is left as is
/// when any step before the write fails.
pub fn update_case_file(
    path: &Path,
    policy: DecodePolicy,
    options: &RunOptions,
) -> Result<TestCase, CheckError> {
    let stored = store::read_case_file(path, policy)?;
    let refreshed = update_case(&stored, options)?;
    store::write_case_file(path, &refreshed)?;
    Ok(refreshed)
}

/// Result of checking one case file.
#[derive(Debug, Clone)]
pub struct FileCheck {
    pub case: TestCase,
    pub verdict: Verdict,
    /// SHA-256 of the file's bytes.
    pub digest: String,
    pub elapsed: Duration,
}

/// Read, decode and check the case stored at `path`.
pub fn check_file(
    path: &Path,
    policy: DecodePolicy,
    options: &RunOptions,
) -> Result<FileCheck, CheckError> {
    let bytes = store::read_case_bytes(path)?;
    let digest = store::case_digest(&bytes);
    let case = casecheck_core::decode_case_with(&bytes, policy).map_err(|source| {
        StoreError::Decode {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let started = Instant::now();
    let verdict = check_case(&case, options)?;
    Ok(FileCheck {
        case,
        verdict,
        digest,
        elapsed: started.elapsed(),
    })
}

/// A case file that could not be checked at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderError {
    pub name: String,
    pub message: String,
}

/// Outcome of a folder scan, names in visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderReport {
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    pub errors: Vec<FolderError>,
}

impl FolderReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len() + self.errors.len()
    }

    /// Failing and erroring cases together.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed.len() + self.errors.len()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failure_count() == 0
    }

    /// Names of every case that did not pass, failures first.
    #[must_use]
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed
            .iter()
            .map(String::as_str)
            .chain(self.errors.iter().map(|e| e.name.as_str()))
            .collect()
    }
}

/// Check every case file `dir`'s convention selects, in name order.
///
/// Per-file failures are recorded in the report instead of aborting the scan.
/// `observe` sees each file's result as it completes.
pub fn check_folder(
    dir: &Path,
    policy: DecodePolicy,
    options: &RunOptions,
    mut observe: impl FnMut(&Path, &Result<FileCheck, CheckError>),
) -> Result<FolderReport, CheckError> {
    let convention: Convention = store::load_convention(dir)?;
    let paths = store::list_case_files(dir, &convention)?;

    let mut report = FolderReport::default();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let result = check_file(&path, policy, options);
        observe(&path, &result);
        match result {
            Ok(check) if check.verdict.passed => report.passed.push(name),
            Ok(_) => report.failed.push(name),
            Err(err) => report.errors.push(FolderError {
                name,
                message: err.to_string(),
            }),
        }
    }
    Ok(report)
}
