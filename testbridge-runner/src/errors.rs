// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testbridge.

use crate::engine::{FailureSite, ResultState};
use camino::{FromPathBufError, Utf8PathBuf};
use itertools::Itertools;
use std::{error::Error as StdError, fmt};
use thiserror::Error;

/// A boxed error from an engine implementation.
pub type BoxedEngineError = Box<dyn StdError + Send + Sync + 'static>;

/// An error returned by [`ExecutionContext::load`](crate::engine::ExecutionContext::load).
///
/// The first three variants are expected for assemblies that aren't meant for this engine, and
/// are reported to the host as warnings or informational messages rather than errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The assembly's binary format isn't supported in the current process.
    #[error("unsupported binary format")]
    UnsupportedImageFormat,

    /// An assembly that the target depends on could not be found.
    #[error("dependent assembly `{dependency}` not found")]
    DependencyNotFound {
        /// The name of the missing dependency.
        dependency: String,
    },

    /// The assembly targets a version of the engine that isn't supported.
    #[error("unsupported test framework version")]
    UnsupportedFramework,

    /// Any other error.
    #[error(transparent)]
    Other(BoxedEngineError),
}

impl LoadError {
    /// Creates a new [`LoadError::DependencyNotFound`].
    pub fn dependency_not_found(dependency: impl Into<String>) -> Self {
        Self::DependencyNotFound {
            dependency: dependency.into(),
        }
    }

    /// Wraps any other error.
    pub fn other(error: impl Into<BoxedEngineError>) -> Self {
        Self::Other(error.into())
    }
}

/// An error returned by [`ExecutionContext::run`](crate::engine::ExecutionContext::run).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The execution context released engine state while a run was being cancelled.
    ///
    /// This is an expected consequence of cancellation and is not reported as a failure.
    #[error("execution context released its state during cancellation")]
    ContextReleased,

    /// Any other error.
    #[error(transparent)]
    Other(BoxedEngineError),
}

impl RunError {
    /// Wraps any other error.
    pub fn other(error: impl Into<BoxedEngineError>) -> Self {
        Self::Other(error.into())
    }
}

/// Engine services were used after [`EngineServices::shutdown`](crate::engine::EngineServices::shutdown).
#[derive(Clone, Debug, Error)]
#[error("engine services have been shut down")]
#[non_exhaustive]
pub struct ServicesShutDownError;

/// An error that occurred while loading the adapter configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The user config file could not be read.
    #[error("failed to read config file at `{path}`")]
    Read {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The user config file could not be parsed.
    #[error("failed to parse config file at `{path}`")]
    Parse {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },

    /// The embedded default config could not be parsed.
    #[error("failed to parse default config")]
    ParseDefault(#[source] toml::de::Error),

    /// An environment variable had an invalid value.
    #[error("invalid value for environment variable `{var}`: `{value}` ({reason})")]
    InvalidEnv {
        /// The environment variable.
        var: &'static str,

        /// The value it was set to.
        value: String,

        /// Why the value is invalid.
        reason: &'static str,
    },

    /// A config file was explicitly requested but does not exist.
    #[error("config file not found at `{path}`")]
    FileNotFound {
        /// The path to the config file.
        path: Utf8PathBuf,
    },

    /// The user config directory path was not valid UTF-8.
    #[error("user config path is not valid UTF-8")]
    NonUtf8Path {
        /// The underlying error.
        #[source]
        error: FromPathBufError,
    },
}

/// Error returned while parsing a [`ResultState`] from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized native result state: {input}\n(known states: {})",
    ResultState::ALL.iter().map(|state| state.as_str()).join(", "),
)]
pub struct ResultStateParseError {
    input: String,
}

impl ResultStateParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`FailureSite`] from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized failure site: {input}\n(known sites: {})",
    FailureSite::ALL.iter().map(|site| site.as_str()).join(", "),
)]
pub struct FailureSiteParseError {
    input: String,
}

impl FailureSiteParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Displays an error along with its chain of causes.
///
/// ```text
/// failed to parse config file at `/home/user/.config/testbridge/config.toml`
///   caused by:
///   - invalid type: string "yes", expected a boolean
/// ```
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: StdError> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: StdError> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let Some(mut cause) = self.error.source() else {
            return Ok(());
        };
        write!(f, "\n  caused by:")?;
        loop {
            // Multi-line causes are indented to line up with the bullet.
            write!(f, "\n  - {}", cause.to_string().replace('\n', "\n    "))?;
            match cause.source() {
                Some(next) => cause = next,
                None => return Ok(()),
            }
        }
    }
}
