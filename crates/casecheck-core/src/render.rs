//! Human-readable rendering of cases and verdicts.
//!
//! Everything here is a pure function of its inputs and a [`RenderOptions`];
//! there is no process-wide formatting state.

use std::fmt::Write as _;

use crate::case::TestCase;
use crate::compare::{FieldMismatch, TextMismatch, Verdict};

/// Quote character wrapped around rendered text.
pub const QUOTE: char = '`';
/// Rendering of an empty value.
pub const EMPTY: &str = "NULL";

/// Text rendering switches.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Escape control and non-ASCII characters (`\n`, `\u{e9}`, ...).
    pub escape: bool,
}

/// Which sections `render_case` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpParams {
    pub command: bool,
    pub stdin: bool,
    pub stdout: bool,
    pub stderr: bool,
    pub byte_lengths: bool,
}

impl Default for DumpParams {
    fn default() -> Self {
        Self {
            command: true,
            stdin: true,
            stdout: true,
            stderr: true,
            byte_lengths: false,
        }
    }
}

/// Quote stream content, escaping it when `options.escape` is set.
#[must_use]
pub fn quote_text(text: &str, options: RenderOptions) -> String {
    if text.is_empty() {
        return EMPTY.to_string();
    }
    if options.escape {
        format!("{QUOTE}{}{QUOTE}", escape(text))
    } else {
        format!("{QUOTE}{text}{QUOTE}")
    }
}

/// Quote a name or path verbatim.
#[must_use]
pub fn quote_name(name: &str) -> String {
    if name.is_empty() {
        return EMPTY.to_string();
    }
    format!("{QUOTE}{name}{QUOTE}")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(ch),
            _ => {
                let _ = write!(out, "{}", ch.escape_unicode());
            }
        }
    }
    out
}

/// Multi-line description of a stored case.
#[must_use]
pub fn render_case(case: &TestCase, params: DumpParams, options: RenderOptions) -> String {
    let mut out = String::new();
    if params.command {
        let _ = writeln!(out, "Command:\n{}", case.command());
    }
    let _ = writeln!(out, "Expected exit code: {}", case.expected_exit_code());
    if params.stdin {
        let _ = writeln!(out, "Stdin:\n{}", quote_text(case.stdin(), options));
    }
    if params.stdout {
        let _ = writeln!(
            out,
            "Expected stdout:\n{}",
            quote_text(case.expected_stdout(), options)
        );
    }
    if params.stderr {
        let _ = writeln!(
            out,
            "Expected stderr:\n{}",
            quote_text(case.expected_stderr(), options)
        );
    }
    if params.byte_lengths {
        let _ = writeln!(out, "Byte length of stdin:   {}", case.stdin().len());
        let _ = writeln!(out, "Byte length of stdout:  {}", case.expected_stdout().len());
        let _ = writeln!(out, "Byte length of stderr:  {}", case.expected_stderr().len());
        let _ = writeln!(out, "Byte length of command: {}", case.command().len());
    }
    out
}

/// Every mismatch of a verdict, one `[ERROR]` block per field. Empty for a pass.
#[must_use]
pub fn render_verdict(verdict: &Verdict, options: RenderOptions) -> String {
    let mut out = String::new();
    for mismatch in &verdict.mismatches {
        match mismatch {
            FieldMismatch::ExitCode { expected, actual } => {
                let _ = writeln!(out, "[ERROR] Expected exit code {expected} but got {actual}");
            }
            FieldMismatch::Stdout(m) => render_text_mismatch(&mut out, "stdout", m, options),
            FieldMismatch::Stderr(m) => render_text_mismatch(&mut out, "stderr", m, options),
        }
    }
    out
}

fn render_text_mismatch(out: &mut String, stream: &str, m: &TextMismatch, options: RenderOptions) {
    let _ = writeln!(out, "[ERROR] Expected {stream} ({}):", m.expected_len);
    let _ = writeln!(out, "{}", quote_text(&m.expected, options));
    let _ = writeln!(out, "[ERROR] Actual {stream} ({}):", m.actual_len);
    let _ = writeln!(out, "{}", quote_text(&m.actual, options));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::ProcessOutput;
    use crate::compare::compare;

    const RAW: RenderOptions = RenderOptions { escape: false };
    const ESCAPED: RenderOptions = RenderOptions { escape: true };

    #[test]
    fn empty_text_renders_as_null() {
        assert_eq!(quote_text("", RAW), "NULL");
        assert_eq!(quote_text("", ESCAPED), "NULL");
        assert_eq!(quote_name(""), "NULL");
    }

    #[test]
    fn escaping_is_an_explicit_option() {
        assert_eq!(quote_text("a\nb", RAW), "`a\nb`");
        assert_eq!(quote_text("a\nb", ESCAPED), "`a\\nb`");
        assert_eq!(quote_text("tab\there\\", ESCAPED), "`tab\\there\\\\`");
        assert_eq!(quote_text("é", ESCAPED), "`\\u{e9}`");
    }

    #[test]
    fn dump_respects_params() {
        let case = TestCase::new(3, "cat", "out", "", "in");
        let params = DumpParams {
            stdin: false,
            byte_lengths: true,
            ..DumpParams::default()
        };
        let text = render_case(&case, params, RAW);
        assert!(text.starts_with("Command:\ncat\nExpected exit code: 3\n"));
        assert!(!text.contains("Stdin:"));
        assert!(text.contains("Expected stdout:\n`out`\n"));
        assert!(text.contains("Expected stderr:\nNULL\n"));
        assert!(text.contains("Byte length of stdin:   2\n"));
        assert!(text.contains("Byte length of command: 3\n"));
    }

    #[test]
    fn verdict_report_lists_each_field() {
        let expected = TestCase::new(0, "p", "A", "B", "");
        let verdict = compare(&expected, &ProcessOutput::new(1, "X\n", "B"));
        let text = render_verdict(&verdict, ESCAPED);
        assert_eq!(
            text,
            "[ERROR] Expected exit code 0 but got 1\n\
             [ERROR] Expected stdout (1):\n`A`\n\
             [ERROR] Actual stdout (2):\n`X\\n`\n"
        );
    }

    #[test]
    fn passing_verdict_renders_nothing() {
        let expected = TestCase::new(0, "p", "", "", "");
        let verdict = compare(&expected, &ProcessOutput::new(0, "", ""));
        assert!(render_verdict(&verdict, RAW).is_empty());
    }
}
