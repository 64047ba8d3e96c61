/********************************************************************************
 * Copyright (c) 2025 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! JSON5 configuration for endpoints and brokers.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::path::Path;
use std::time::Duration;

const DEFAULT_SYNC_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_EGRESS_QUEUE_SIZE: usize = 1_024;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MalConfig {
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InteractionConfig {
    /// How long a synchronous call waits for its reply; `null` waits forever.
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: Option<u64>,
}

fn default_sync_timeout_ms() -> Option<u64> {
    Some(DEFAULT_SYNC_TIMEOUT_MS)
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            sync_timeout_ms: default_sync_timeout_ms(),
        }
    }
}

impl InteractionConfig {
    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    #[serde(default = "default_egress_queue_size")]
    pub egress_queue_size: usize,
}

fn default_egress_queue_size() -> usize {
    DEFAULT_EGRESS_QUEUE_SIZE
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            egress_queue_size: DEFAULT_EGRESS_QUEUE_SIZE,
        }
    }
}

/// Configuration loading failures.
pub enum ConfigError {
    Read(std::io::Error),
    Parse(String),
    Invalid(&'static str),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(err) => write!(f, "Read({:?})", err),
            ConfigError::Parse(reason) => write!(f, "Parse({})", reason),
            ConfigError::Invalid(reason) => write!(f, "Invalid({})", reason),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(err) => write!(f, "Unable to read config file: {}", err),
            ConfigError::Parse(reason) => write!(f, "Unable to parse config file: {}", reason),
            ConfigError::Invalid(reason) => write!(f, "Invalid configuration: {}", reason),
        }
    }
}

impl Error for ConfigError {}

impl MalConfig {
    pub fn from_json5_str(contents: &str) -> Result<Self, ConfigError> {
        let config: MalConfig =
            json5::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_json5_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.egress_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "broker.egress_queue_size must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, MalConfig};
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = MalConfig::from_json5_str("{}").expect("empty config should parse");
        assert_eq!(config, MalConfig::default());
        assert_eq!(
            config.interaction.sync_timeout(),
            Some(Duration::from_millis(5_000))
        );
        assert_eq!(config.broker.egress_queue_size, 1_024);
    }

    #[test]
    fn json5_comments_and_null_timeout_are_accepted() {
        let config = MalConfig::from_json5_str(
            r#"{
                // wait forever on synchronous calls
                interaction: { sync_timeout_ms: null },
                broker: { egress_queue_size: 16 },
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.interaction.sync_timeout(), None);
        assert_eq!(config.broker.egress_queue_size, 16);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = MalConfig::from_json5_str(r#"{ broker: { queue: 3 } }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn zero_queue_size_is_invalid() {
        let result = MalConfig::from_json5_str(r#"{ broker: { egress_queue_size: 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
