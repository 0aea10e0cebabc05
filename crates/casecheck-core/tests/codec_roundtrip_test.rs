//! Integration test: `.case` record format contract
//!
//! Validates that:
//! 1. decode(encode(c)) == c for arbitrary valid cases.
//! 2. Encoded length is always header + the four UTF-8 payload lengths.
//! 3. Any strict prefix of a valid record fails with TruncatedInput.
//! 4. Lenient decoding ignores appended bytes; strict decoding counts them.
//!
//! Run: cargo test -p casecheck-core --test codec_roundtrip_test

use casecheck_core::codec::HEADER_SIZE;
use casecheck_core::{DecodeError, DecodePolicy, TestCase, decode_case, decode_case_with, encode_case};
use proptest::prelude::*;

fn case_strategy() -> impl Strategy<Value = TestCase> {
    (
        0i32..=255,
        "\\PC{0,64}",
        ".{0,256}",
        ".{0,128}",
        "(.|\n){0,128}",
    )
        .prop_map(|(exit, command, stdout, stderr, stdin)| {
            TestCase::new(exit, command, stdout, stderr, stdin)
        })
}

proptest! {
    #[test]
    fn roundtrip_preserves_every_field(case in case_strategy()) {
        let bytes = encode_case(&case).unwrap();
        prop_assert_eq!(decode_case(&bytes).unwrap(), case);
    }

    #[test]
    fn encoded_length_is_header_plus_payloads(case in case_strategy()) {
        let bytes = encode_case(&case).unwrap();
        let payload = case.command().len()
            + case.expected_stdout().len()
            + case.expected_stderr().len()
            + case.stdin().len();
        prop_assert_eq!(bytes.len(), HEADER_SIZE + payload);
    }

    #[test]
    fn encoding_is_deterministic(case in case_strategy()) {
        prop_assert_eq!(encode_case(&case).unwrap(), encode_case(&case.clone()).unwrap());
    }

    #[test]
    fn every_prefix_is_truncated(case in case_strategy(), cut in any::<prop::sample::Index>()) {
        let bytes = encode_case(&case).unwrap();
        let len = cut.index(bytes.len());
        let is_truncated = matches!(
            decode_case(&bytes[..len]),
            Err(DecodeError::TruncatedInput { .. })
        );
        prop_assert!(is_truncated);
    }

    #[test]
    fn appended_bytes_follow_policy(case in case_strategy(), extra in prop::collection::vec(any::<u8>(), 1..16)) {
        let mut bytes = encode_case(&case).unwrap();
        bytes.extend_from_slice(&extra);
        prop_assert_eq!(
            decode_case(&bytes),
            Err(DecodeError::TrailingBytes { count: extra.len() })
        );
        prop_assert_eq!(decode_case_with(&bytes, DecodePolicy::Lenient).unwrap(), case);
    }
}

#[test]
fn known_record_layout() {
    let case = TestCase::new(1, "echo hi", "hi\n", "", "");
    let bytes = encode_case(&case).unwrap();
    assert_eq!(
        &bytes[..HEADER_SIZE],
        &[1, 0, 7, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0]
    );
    assert_eq!(&bytes[HEADER_SIZE..], b"echo hihi\n");
}
