//! Runtime tunables, read from environment variables with a
//! parsed-and-validated fallback to documented defaults — the same discipline
//! the teacher crate uses for its own coroutine stack size
//! (`SEQ_STACK_SIZE`/`parse_stack_size`).
//!
//! A CLI may layer a TOML config file on top of these (see `loom-cli`), but
//! `loom-runtime` itself never reads files — only the environment.

use std::fmt;

/// Default stackful-coroutine stack size for a wire, in bytes (1 MiB).
pub const DEFAULT_STACK_SIZE: usize = 0x100000;

/// Default number of worker-pool threads backing `asyncActivate` (§5).
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;

/// Default strand/wire registry capacity reported by diagnostics.
pub const DEFAULT_WIRE_REGISTRY_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub stack_size: usize,
    pub worker_pool_size: usize,
    pub wire_registry_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            wire_registry_capacity: DEFAULT_WIRE_REGISTRY_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    /// Read from `LOOM_STACK_SIZE`, `LOOM_WORKER_POOL_SIZE`,
    /// `LOOM_WIRE_REGISTRY_CAPACITY`. An unset, zero, or unparsable value
    /// warns via `tracing::warn!` and falls back to the default.
    pub fn from_env() -> Self {
        RuntimeConfig {
            stack_size: parse_env_usize("LOOM_STACK_SIZE", DEFAULT_STACK_SIZE),
            worker_pool_size: parse_env_usize("LOOM_WORKER_POOL_SIZE", DEFAULT_WORKER_POOL_SIZE),
            wire_registry_capacity: parse_env_usize("LOOM_WIRE_REGISTRY_CAPACITY", DEFAULT_WIRE_REGISTRY_CAPACITY),
        }
    }

    /// Overlay non-default fields of `other` onto `self` — used by the CLI to
    /// layer a `--config` TOML file under explicit environment variables.
    pub fn merge(self, other: PartialRuntimeConfig) -> Self {
        RuntimeConfig {
            stack_size: other.stack_size.unwrap_or(self.stack_size),
            worker_pool_size: other.worker_pool_size.unwrap_or(self.worker_pool_size),
            wire_registry_capacity: other.wire_registry_capacity.unwrap_or(self.wire_registry_capacity),
        }
    }
}

/// The subset of `RuntimeConfig` a TOML file may override; every field is
/// optional so an absent key leaves the environment-derived value in place.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
pub struct PartialRuntimeConfig {
    pub stack_size: Option<usize>,
    pub worker_pool_size: Option<usize>,
    pub wire_registry_capacity: Option<usize>,
}

fn parse_env_usize(var: &str, default: usize) -> usize {
    match std::env::var(var) {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(0) => {
                tracing::warn!(var, raw, default, "value is zero, using default");
                default
            }
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(var, raw, default, "value is not a valid number, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_constants() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(cfg.worker_pool_size, DEFAULT_WORKER_POOL_SIZE);
        assert_eq!(cfg.wire_registry_capacity, DEFAULT_WIRE_REGISTRY_CAPACITY);
    }

    #[test]
    fn parse_env_usize_falls_back_on_zero_and_garbage() {
        assert_eq!(parse_env_usize("LOOM_TEST_DOES_NOT_EXIST_A", 7), 7);
        // SAFETY: test runs single-threaded with respect to this var.
        unsafe { std::env::set_var("LOOM_TEST_PARSE_ZERO", "0") };
        assert_eq!(parse_env_usize("LOOM_TEST_PARSE_ZERO", 9), 9);
        unsafe { std::env::set_var("LOOM_TEST_PARSE_GARBAGE", "nope") };
        assert_eq!(parse_env_usize("LOOM_TEST_PARSE_GARBAGE", 11), 11);
        unsafe { std::env::set_var("LOOM_TEST_PARSE_OK", "42") };
        assert_eq!(parse_env_usize("LOOM_TEST_PARSE_OK", 1), 42);
        unsafe {
            std::env::remove_var("LOOM_TEST_PARSE_ZERO");
            std::env::remove_var("LOOM_TEST_PARSE_GARBAGE");
            std::env::remove_var("LOOM_TEST_PARSE_OK");
        }
    }

    #[test]
    fn merge_overlays_only_present_fields() {
        let base = RuntimeConfig::default();
        let overlay = PartialRuntimeConfig { stack_size: Some(2 << 20), worker_pool_size: None, wire_registry_capacity: None };
        let merged = base.merge(overlay);
        assert_eq!(merged.stack_size, 2 << 20);
        assert_eq!(merged.worker_pool_size, base.worker_pool_size);
    }
}
