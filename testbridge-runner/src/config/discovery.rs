// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ConfigError;
use camino::Utf8PathBuf;
use etcetera::{BaseStrategy, HomeDirError, base_strategy::Xdg};

/// Returns the path the user config file is expected at, or `None` if no home directory could be
/// determined.
///
/// This is `$XDG_CONFIG_HOME/testbridge/config.toml`, or `~/.config/testbridge/config.toml` if
/// `XDG_CONFIG_HOME` is unset.
pub fn user_config_path() -> Result<Option<Utf8PathBuf>, ConfigError> {
    let strategy = match Xdg::new() {
        Ok(strategy) => strategy,
        Err(HomeDirError) => return Ok(None),
    };

    let config_path = strategy.config_dir().join("testbridge").join("config.toml");
    Utf8PathBuf::try_from(config_path)
        .map(Some)
        .map_err(|error| ConfigError::NonUtf8Path { error })
}
