//! Environment variable parsing utilities.
//!
//! Every cache knob that can be set from the environment goes through these
//! helpers, so unset and unparsable values behave the same way everywhere:
//! both fall back to the default.
//!
//! # Example
//!
//! ```
//! use chain_cache_types::env_utils::{env_bool_or, env_var_or};
//!
//! let ttl: u64 = env_var_or("CHAIN_CACHE_PRICE_TTL", 300);
//! let bypass = env_bool_or("CHAIN_CACHE_BYPASS", false);
//! # let _ = (ttl, bypass);
//! ```

use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set, is blank, or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Parse an environment variable with a default value.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Read a non-blank environment variable, trimmed.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Interpret an environment variable as a flag.
///
/// "1", "true", "yes" and "on" (case-insensitive) are true, any other value is
/// false, and an unset variable yields `default`.
pub fn env_bool_or(key: &str, default: bool) -> bool {
    match env_string(key) {
        Some(v) => is_truthy(&v),
        None => default,
    }
}

/// Truthiness rule shared by flags read from the environment and config files.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
