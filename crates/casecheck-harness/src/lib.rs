//! Golden-case harness for command-line programs.
//!
//! This crate provides:
//! - Process runner: spawn a command with stdin, capture exit code and output
//! - Case store: read/write `.case` files, naming conventions, folder listing
//! - Check/record/update: compare a stored case with a fresh run, or refresh it
//! - Structured logging: JSONL run logs with a validated schema
//! - Configuration: environment defaults with CLI overrides

#![forbid(unsafe_code)]

pub mod check;
pub mod config;
pub mod runner;
pub mod store;
pub mod structured_log;

pub use check::{
    CheckError, FileCheck, FolderError, FolderReport, check_case, check_file, check_folder,
    record_case, update_case, update_case_file,
};
pub use config::HarnessConfig;
pub use runner::{RunError, RunOptions, Stream, run_process};
pub use store::StoreError;
