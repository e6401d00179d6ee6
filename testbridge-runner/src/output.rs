// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide logging setup.

use std::sync::Once;
use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{
    Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt,
};

/// The environment variable controlling which log messages are written to stderr.
///
/// The value uses `tracing-subscriber`'s target syntax, for example
/// `testbridge_runner=debug,info`.
pub const LOG_ENV: &str = "TESTBRIDGE_LOG";

static INIT_LOGGER: Once = Once::new();

/// Installs a `tracing` subscriber writing to stderr, filtered by [`LOG_ENV`].
///
/// Only the first call in a process has any effect. If another subscriber is already installed,
/// it is left in place.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let level_str = std::env::var(LOG_ENV).unwrap_or_default();

        // If the level string is empty or invalid, use the standard level filter instead.
        let (targets, parse_error) = if level_str.is_empty() {
            (default_targets(), None)
        } else {
            match level_str.parse::<Targets>() {
                Ok(targets) => (targets, None),
                Err(error) => (default_targets(), Some(error)),
            }
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(targets);

        if tracing_subscriber::registry().with(layer).try_init().is_ok()
            && let Some(error) = parse_error
        {
            warn!("ignoring invalid {LOG_ENV} value `{level_str}`: {error}");
        }
    });
}

fn default_targets() -> Targets {
    Targets::new().with_default(LevelFilter::INFO)
}
