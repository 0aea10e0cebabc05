//! Harness configuration.
//!
//! Defaults come from the environment and are overridden by CLI flags:
//! - `CASECHECK_DECODE`: `strict` (default) or `lenient` trailing-byte policy.
//! - `CASECHECK_TIMEOUT_MS`: per-process wait bound in milliseconds. Unset,
//!   empty, `0` or unparsable means no timeout.
//! - `CASECHECK_ESCAPE`: `1|true|yes|on` renders text with escapes.

use std::time::Duration;

use casecheck_core::{DecodePolicy, RenderOptions};

use crate::runner::RunOptions;

pub const ENV_DECODE: &str = "CASECHECK_DECODE";
pub const ENV_TIMEOUT_MS: &str = "CASECHECK_TIMEOUT_MS";
pub const ENV_ESCAPE: &str = "CASECHECK_ESCAPE";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    pub decode: DecodePolicy,
    pub timeout: Option<Duration>,
    pub render: RenderOptions,
}

impl HarnessConfig {
    /// Resolve from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup (tests pass a map here).
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let decode = lookup(ENV_DECODE)
            .map(|raw| DecodePolicy::from_str_loose(&raw))
            .unwrap_or_default();
        let timeout = lookup(ENV_TIMEOUT_MS).and_then(|raw| parse_timeout_ms(&raw));
        let escape = lookup(ENV_ESCAPE).is_some_and(|raw| parse_flag(&raw));
        Self {
            decode,
            timeout,
            render: RenderOptions { escape },
        }
    }

    /// Apply CLI overrides. Flags can only switch behavior on; absent flags
    /// keep the environment's value.
    #[must_use]
    pub fn with_overrides(mut self, lenient: bool, timeout_ms: Option<u64>, escape: bool) -> Self {
        if lenient {
            self.decode = DecodePolicy::Lenient;
        }
        if let Some(ms) = timeout_ms {
            self.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if escape {
            self.render.escape = true;
        }
        self
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            timeout: self.timeout,
        }
    }
}

fn parse_timeout_ms(raw: &str) -> Option<Duration> {
    match raw.trim().replace('_', "").parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = HarnessConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, HarnessConfig::default());
        assert_eq!(cfg.decode, DecodePolicy::Strict);
        assert!(cfg.timeout.is_none());
        assert!(!cfg.render.escape);
    }

    #[test]
    fn environment_values_are_parsed() {
        let cfg = HarnessConfig::from_lookup(lookup(&[
            (ENV_DECODE, "Lenient"),
            (ENV_TIMEOUT_MS, "1_500"),
            (ENV_ESCAPE, "yes"),
        ]));
        assert_eq!(cfg.decode, DecodePolicy::Lenient);
        assert_eq!(cfg.timeout, Some(Duration::from_millis(1500)));
        assert!(cfg.render.escape);
    }

    #[test]
    fn zero_or_garbage_timeout_disables_it() {
        for raw in ["0", "", "soon", "-5"] {
            let cfg = HarnessConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, raw)]));
            assert!(cfg.timeout.is_none(), "{raw:?}");
        }
    }

    #[test]
    fn cli_overrides_environment() {
        let cfg = HarnessConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, "100")]))
            .with_overrides(true, Some(0), true);
        assert_eq!(cfg.decode, DecodePolicy::Lenient);
        assert!(cfg.timeout.is_none());
        assert!(cfg.render.escape);

        let cfg = HarnessConfig::default().with_overrides(false, Some(250), false);
        assert_eq!(cfg.run_options().timeout, Some(Duration::from_millis(250)));
    }
}
