//! Host configuration.
//!
//! Every field has a default, so an empty document deserializes to
//! [`HostConfig::default`]. Environment variables override individual fields:
//!
//! | Variable                               | Field                        |
//! |----------------------------------------|------------------------------|
//! | `SHELLWIRE_MAX_CONCURRENT_INVOCATIONS` | `max_concurrent_invocations` |
//! | `SHELLWIRE_CHANNEL_CAPACITY`           | `channel_capacity`           |
//! | `SHELLWIRE_MAX_FRAME_SIZE`             | `max_frame_size`             |
//! | `SHELLWIRE_PLATFORM`                   | `platform`                   |

use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Result, ShellwireError};
use crate::host::Platform;
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Default maximum concurrent invocations per connection.
pub const DEFAULT_MAX_CONCURRENT_INVOCATIONS: usize = 256;

/// Default capacity of the outbound frame channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

const ENV_MAX_CONCURRENT_INVOCATIONS: &str = "SHELLWIRE_MAX_CONCURRENT_INVOCATIONS";
const ENV_CHANNEL_CAPACITY: &str = "SHELLWIRE_CHANNEL_CAPACITY";
const ENV_MAX_FRAME_SIZE: &str = "SHELLWIRE_MAX_FRAME_SIZE";
const ENV_PLATFORM: &str = "SHELLWIRE_PLATFORM";

/// Tunables of a [`Host`](crate::server::Host).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Invocations running at once on one connection; requests beyond this
    /// are answered with a protocol error.
    #[serde(default = "default_max_concurrent_invocations")]
    pub max_concurrent_invocations: usize,

    /// Outbound frames queued before senders wait.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Largest accepted frame payload in bytes.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: u32,

    /// Platform reported to handlers; `None` keeps the one the capabilities carry.
    #[serde(default)]
    pub platform: Option<Platform>,
}

fn default_max_concurrent_invocations() -> usize {
    DEFAULT_MAX_CONCURRENT_INVOCATIONS
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_max_frame_size() -> u32 {
    DEFAULT_MAX_PAYLOAD_SIZE
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_concurrent_invocations: default_max_concurrent_invocations(),
            channel_capacity: default_channel_capacity(),
            max_frame_size: default_max_frame_size(),
            platform: None,
        }
    }
}

impl HostConfig {
    /// Defaults overridden by `SHELLWIRE_*` environment variables, validated.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, ENV_MAX_CONCURRENT_INVOCATIONS)? {
            config.max_concurrent_invocations = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CHANNEL_CAPACITY)? {
            config.channel_capacity = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MAX_FRAME_SIZE)? {
            config.max_frame_size = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_PLATFORM)? {
            config.platform = Some(v);
        }

        config.validate()?;
        tracing::debug!(?config, "Host configuration loaded");
        Ok(config)
    }

    /// Reject values the host cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_invocations == 0 {
            return Err(invalid("max_concurrent_invocations", "must be at least 1"));
        }
        if self.channel_capacity == 0 {
            return Err(invalid("channel_capacity", "must be at least 1"));
        }
        if self.max_frame_size == 0 {
            return Err(invalid("max_frame_size", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| invalid(key, format!("{raw:?}: {e}"))),
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ShellwireError {
    ShellwireError::Config {
        key: key.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default() {
        let config = HostConfig::default();
        assert_eq!(config.max_concurrent_invocations, 256);
        assert_eq!(config.channel_capacity, 1024);
        assert_eq!(config.max_frame_size, DEFAULT_MAX_PAYLOAD_SIZE);
        assert_eq!(config.platform, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: HostConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config: HostConfig =
            serde_json::from_str(r#"{ "max_concurrent_invocations": 4, "platform": "darwin" }"#)
                .unwrap();
        assert_eq!(config.max_concurrent_invocations, 4);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.platform, Some(Platform::MacOs));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<HostConfig>(r#"{ "max_pending": 1 }"#).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = HostConfig::from_lookup(lookup(&[
            ("SHELLWIRE_MAX_CONCURRENT_INVOCATIONS", "8"),
            ("SHELLWIRE_CHANNEL_CAPACITY", " 32 "),
            ("SHELLWIRE_PLATFORM", "linux"),
        ]))
        .unwrap();
        assert_eq!(config.max_concurrent_invocations, 8);
        assert_eq!(config.channel_capacity, 32);
        assert_eq!(config.max_frame_size, DEFAULT_MAX_PAYLOAD_SIZE);
        assert_eq!(config.platform, Some(Platform::Linux));
    }

    #[test]
    fn test_env_parse_error_names_variable() {
        let err =
            HostConfig::from_lookup(lookup(&[("SHELLWIRE_MAX_FRAME_SIZE", "huge")])).unwrap_err();
        match err {
            ShellwireError::Config { key, .. } => assert_eq!(key, "SHELLWIRE_MAX_FRAME_SIZE"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_rejected() {
        let err = HostConfig::from_lookup(lookup(&[("SHELLWIRE_MAX_CONCURRENT_INVOCATIONS", "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ShellwireError::Config { ref key, .. } if key == "max_concurrent_invocations"
        ));
    }
}
