//! # Runtime Configuration
//!
//! Environment overrides for the coroutine runtime.
//!
//! ## `TABLEGATE_STACK_SIZE`
//!
//! Stack size for handler coroutines, decimal (`65536`) or hexadecimal
//! (`0x10000`). Default: `0x10000` (64 KB). SQLite calls run on the handler
//! coroutines, so the default is larger than a bare router would need.
//!
//! ```bash
//! export TABLEGATE_STACK_SIZE=0x20000
//! tablegate serve --database chinook.db
//! ```

use std::env;

/// Default handler coroutine stack size
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub stack_size: usize,
}

/// Parse `"0x..."` hex or plain decimal.
#[must_use]
pub fn parse_stack_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("TABLEGATE_STACK_SIZE")
            .ok()
            .and_then(|v| parse_stack_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_stack_size;

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size("0x4000"), Some(0x4000));
        assert_eq!(parse_stack_size("32768"), Some(32768));
        assert_eq!(parse_stack_size("lots"), None);
    }
}
