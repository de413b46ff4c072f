//! Runtime configuration for the sealer engine.
//!
//! Defaults reproduce the behaviour existing sealer deployments rely on. Values can be
//! overlaid from `SEALER_*` environment variables or read from a JSON document.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{SealerError, SealerResult};

/// Base used to parse the group order string returned by the primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRadix {
    Hex,
    Decimal,
}

impl OrderRadix {
    pub fn radix(self) -> u32 {
        match self {
            OrderRadix::Hex => 16,
            OrderRadix::Decimal => 10,
        }
    }
}

/// How a raw random draw is mapped into `[0, modulus)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// `value mod modulus`. Carries a small modulo bias.
    Reduce,
    /// Redraw values that fall in the biased tail.
    Rejection,
}

/// Sealer label handed to the primitive's decrypt call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SealerIdentityPolicy {
    /// Use the active secret's label for the primitive call and the output.
    ActiveLabel,
    /// Use `placeholder_sealer` for the primitive call, the active label for the output.
    Placeholder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SealerConfig {
    pub order_radix: OrderRadix,
    pub sampling: SamplingPolicy,
    pub fallback_draw_bytes: usize,
    pub max_draw_bytes: usize,
    pub decryption_sealer: SealerIdentityPolicy,
    pub placeholder_sealer: String,
    pub secret_wait_timeout_ms: Option<u64>,
    pub cancel_on_supersede: bool,
    pub envelope_id: u32,
}

impl Default for SealerConfig {
    fn default() -> Self {
        Self {
            order_radix: OrderRadix::Hex,
            sampling: SamplingPolicy::Reduce,
            fallback_draw_bytes: 32,
            max_draw_bytes: 4096,
            decryption_sealer: SealerIdentityPolicy::ActiveLabel,
            placeholder_sealer: "bob".to_string(),
            secret_wait_timeout_ms: None,
            cancel_on_supersede: true,
            envelope_id: 12345678,
        }
    }
}

impl SealerConfig {
    /// Defaults overlaid with any `SEALER_*` environment variables that are set.
    pub fn from_env() -> SealerResult<Self> {
        Self::default().overlay(|key| env::var(key).ok())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> SealerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SealerError::Config(format!("read {}: {e}", path.display())))?;
        let config: SealerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup. Split out from `from_env` so tests don't
    /// have to mutate the process environment.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> SealerResult<Self> {
        if let Some(v) = lookup("SEALER_ORDER_RADIX") {
            self.order_radix = parse_enum("SEALER_ORDER_RADIX", &v)?;
        }
        if let Some(v) = lookup("SEALER_SAMPLING") {
            self.sampling = parse_enum("SEALER_SAMPLING", &v)?;
        }
        if let Some(v) = lookup("SEALER_FALLBACK_DRAW_BYTES") {
            self.fallback_draw_bytes = parse_number("SEALER_FALLBACK_DRAW_BYTES", &v)?;
        }
        if let Some(v) = lookup("SEALER_MAX_DRAW_BYTES") {
            self.max_draw_bytes = parse_number("SEALER_MAX_DRAW_BYTES", &v)?;
        }
        if let Some(v) = lookup("SEALER_DECRYPTION_SEALER") {
            self.decryption_sealer = parse_enum("SEALER_DECRYPTION_SEALER", &v)?;
        }
        if let Some(v) = lookup("SEALER_PLACEHOLDER_SEALER") {
            self.placeholder_sealer = v;
        }
        if let Some(v) = lookup("SEALER_SECRET_WAIT_TIMEOUT_MS") {
            self.secret_wait_timeout_ms = Some(parse_number("SEALER_SECRET_WAIT_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("SEALER_CANCEL_ON_SUPERSEDE") {
            self.cancel_on_supersede = parse_number("SEALER_CANCEL_ON_SUPERSEDE", &v)?;
        }
        if let Some(v) = lookup("SEALER_ENVELOPE_ID") {
            self.envelope_id = parse_number("SEALER_ENVELOPE_ID", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> SealerResult<()> {
        if self.fallback_draw_bytes == 0 {
            return Err(SealerError::Config("fallback_draw_bytes must be positive".into()));
        }
        if self.fallback_draw_bytes > self.max_draw_bytes {
            return Err(SealerError::Config(format!(
                "fallback_draw_bytes ({}) exceeds max_draw_bytes ({})",
                self.fallback_draw_bytes, self.max_draw_bytes
            )));
        }
        Ok(())
    }

    pub fn secret_wait_timeout(&self) -> Option<Duration> {
        self.secret_wait_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_enum<T: DeserializeOwned>(key: &str, value: &str) -> SealerResult<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_ascii_lowercase()))
        .map_err(|e| SealerError::Config(format!("{key}={value}: {e}")))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> SealerResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| SealerError::Config(format!("{key}={value}: {e}")))
}
