// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::discovery::user_config_path;
use crate::errors::ConfigError;
use camino::Utf8Path;
use itertools::Itertools;
use serde::Deserialize;
use std::{collections::BTreeSet, io};
use tracing::{debug, warn};

/// Environment variable pointing at an explicit config file, or `none` to skip user config.
pub const CONFIG_FILE_ENV: &str = "TESTBRIDGE_CONFIG_FILE";

/// Special value for [`CONFIG_FILE_ENV`] that skips user config loading entirely.
pub const CONFIG_NONE: &str = "none";

/// Environment variable overriding [`AdapterConfig::verbosity`].
pub const VERBOSITY_ENV: &str = "TESTBRIDGE_VERBOSITY";

/// Environment variable overriding [`AdapterConfig::shadow_copy`].
pub const SHADOW_COPY_ENV: &str = "TESTBRIDGE_SHADOW_COPY";

/// Environment variable overriding [`AdapterConfig::use_keep_engine_running`].
pub const USE_KEEP_ENGINE_RUNNING_ENV: &str = "TESTBRIDGE_USE_KEEP_ENGINE_RUNNING";

/// Specifies where to load the user config file from.
#[derive(Clone, Copy, Debug)]
pub enum ConfigLocation<'a> {
    /// Look in the default location. A missing file is not an error.
    Default,

    /// Skip the user config file, using only built-in defaults and the environment.
    Isolated,

    /// Load from an explicit path. A missing file is an error.
    Explicit(&'a Utf8Path),
}

impl<'a> ConfigLocation<'a> {
    /// Creates a config location from the value of [`CONFIG_FILE_ENV`].
    pub fn from_env_value(value: Option<&'a str>) -> Self {
        match value {
            None => Self::Default,
            Some(CONFIG_NONE) => Self::Isolated,
            Some(path) => Self::Explicit(Utf8Path::new(path)),
        }
    }
}

/// Resolved adapter configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AdapterConfig {
    /// How much detail to send to the host.
    pub verbosity: u32,

    /// Whether the engine should shadow-copy assemblies before loading them.
    pub shadow_copy: bool,

    /// Whether the host's keep-alive flag controls engine shutdown.
    pub use_keep_engine_running: bool,
}

impl AdapterConfig {
    /// Loads the config from the process environment.
    ///
    /// The config file location is taken from [`CONFIG_FILE_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let location = std::env::var(CONFIG_FILE_ENV).ok();
        Self::load(
            ConfigLocation::from_env_value(location.as_deref()),
            |var| std::env::var(var).ok(),
        )
    }

    /// Loads the config from the given location, then applies overrides from `env`.
    pub fn load(
        location: ConfigLocation<'_>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::from_embedded()?;
        if let Some(user_config) = DeserializedConfig::from_location(location)? {
            config.apply(user_config);
        }
        config.apply_env(env)?;
        debug!(?config, "resolved adapter config");
        Ok(config)
    }

    /// Returns the built-in defaults.
    pub fn from_embedded() -> Result<Self, ConfigError> {
        const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

        let deserializer =
            toml::Deserializer::parse(DEFAULT_CONFIG).map_err(ConfigError::ParseDefault)?;
        let config = DefaultConfig::deserialize(deserializer).map_err(ConfigError::ParseDefault)?;
        Ok(Self {
            verbosity: config.verbosity,
            shadow_copy: config.shadow_copy,
            use_keep_engine_running: config.use_keep_engine_running,
        })
    }

    fn apply(&mut self, user_config: DeserializedConfig) {
        let DeserializedConfig {
            verbosity,
            shadow_copy,
            use_keep_engine_running,
        } = user_config;
        if let Some(verbosity) = verbosity {
            self.verbosity = verbosity;
        }
        if let Some(shadow_copy) = shadow_copy {
            self.shadow_copy = shadow_copy;
        }
        if let Some(use_keep_engine_running) = use_keep_engine_running {
            self.use_keep_engine_running = use_keep_engine_running;
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = env(VERBOSITY_ENV) {
            self.verbosity = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    var: VERBOSITY_ENV,
                    value,
                    reason: "expected a non-negative integer",
                })?;
        }
        if let Some(value) = env(SHADOW_COPY_ENV) {
            self.shadow_copy = parse_bool_env(SHADOW_COPY_ENV, value)?;
        }
        if let Some(value) = env(USE_KEEP_ENGINE_RUNNING_ENV) {
            self.use_keep_engine_running = parse_bool_env(USE_KEEP_ENGINE_RUNNING_ENV, value)?;
        }
        Ok(())
    }
}

fn parse_bool_env(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "true" => return Ok(true),
        "0" | "false" => return Ok(false),
        _ => {}
    }
    Err(ConfigError::InvalidEnv {
        var,
        value,
        reason: "expected 1, 0, true or false",
    })
}

/// The embedded default config. Every key is required.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct DefaultConfig {
    verbosity: u32,
    shadow_copy: bool,
    use_keep_engine_running: bool,
}

/// A user config file. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedConfig {
    #[serde(default)]
    verbosity: Option<u32>,
    #[serde(default)]
    shadow_copy: Option<bool>,
    #[serde(default)]
    use_keep_engine_running: Option<bool>,
}

impl DeserializedConfig {
    fn from_location(location: ConfigLocation<'_>) -> Result<Option<Self>, ConfigError> {
        match location {
            ConfigLocation::Isolated => {
                debug!("config: skipping user config (isolated)");
                Ok(None)
            }
            ConfigLocation::Explicit(path) => {
                debug!("config: loading from explicit path {path}");
                match Self::from_path(path)? {
                    Some(config) => Ok(Some(config)),
                    None => Err(ConfigError::FileNotFound {
                        path: path.to_owned(),
                    }),
                }
            }
            ConfigLocation::Default => match user_config_path()? {
                Some(path) => Self::from_path(&path),
                None => {
                    debug!("config: could not determine config directory");
                    Ok(None)
                }
            },
        }
    }

    fn from_path(path: &Utf8Path) -> Result<Option<Self>, ConfigError> {
        debug!("config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (config, unknown) =
            Self::deserialize_toml(&contents).map_err(|error| ConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;
        if !unknown.is_empty() {
            warn_unknown_keys(path, &unknown);
        }

        debug!("config: loaded successfully from {path}");
        Ok(Some(config))
    }

    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: Self = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((config, unknown))
    }
}

fn warn_unknown_keys(path: &Utf8Path, unknown: &BTreeSet<String>) {
    let unknown_str = if unknown.len() == 1 {
        // Print this on the same line.
        format!("key: {}", unknown.iter().join(""))
    } else {
        format!("keys:\n  - {}", unknown.iter().join("\n  - "))
    };
    warn!("in config file {path}, ignoring unknown configuration {unknown_str}");
}
