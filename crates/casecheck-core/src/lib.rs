//! # casecheck-core
//!
//! The pure half of casecheck: the [`TestCase`] model, the binary `.case`
//! record codec, expected-vs-actual comparison, name generation and text
//! rendering. Nothing in this crate spawns processes or touches the
//! filesystem.

#![forbid(unsafe_code)]

pub mod case;
pub mod codec;
pub mod compare;
pub mod naming;
pub mod render;

pub use case::{ProcessOutput, TestCase, TokenizeError, join_command, split_command};
pub use codec::{
    CaseField, DecodeError, DecodePolicy, EncodeError, decode_case, decode_case_with, encode_case,
};
pub use compare::{FieldMismatch, TextMismatch, Verdict, compare};
pub use naming::{Convention, NamingError};
pub use render::{DumpParams, RenderOptions};
