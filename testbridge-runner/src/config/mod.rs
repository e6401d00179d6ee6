// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter configuration.
//!
//! ## Config file location
//!
//! The user config file is looked up at `$XDG_CONFIG_HOME/testbridge/config.toml`, falling back to
//! `~/.config/testbridge/config.toml`. The `TESTBRIDGE_CONFIG_FILE` environment variable points
//! at an explicit file instead, or disables user config entirely if set to `none`.
//!
//! ## Configuration hierarchy
//!
//! Settings are resolved in the following order (highest priority first):
//!
//! 1. Environment variables (`TESTBRIDGE_VERBOSITY`, `TESTBRIDGE_SHADOW_COPY`,
//!    `TESTBRIDGE_USE_KEEP_ENGINE_RUNNING`)
//! 2. The user config file
//! 3. Built-in defaults

mod discovery;
mod imp;

pub use discovery::*;
pub use imp::*;
