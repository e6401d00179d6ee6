// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages sent to the host.

use crate::{
    errors::DisplayErrorChain,
    helpers::short_type_name,
    host::TestRecorder,
};
use camino::Utf8Path;
use std::error::Error as StdError;
use testbridge_metadata::MessageLevel;
use tracing::{debug, error, info, warn};

/// Sends messages to the host's message channel, mirroring each into `tracing`.
///
/// The verbosity controls how much error detail reaches the host: at 0 only the error's type and
/// the accompanying message, above that the full error chain. Debug messages always go to
/// `tracing` but only reach the host at [`TestLogger::DEBUG_VERBOSITY`] and above.
#[derive(Clone, Copy)]
pub struct TestLogger<'a> {
    recorder: &'a dyn TestRecorder,
    verbosity: u32,
}

impl<'a> TestLogger<'a> {
    /// The verbosity at and above which debug messages are forwarded to the host.
    pub const DEBUG_VERBOSITY: u32 = 5;

    /// Creates a new logger.
    pub fn new(recorder: &'a dyn TestRecorder, verbosity: u32) -> Self {
        Self {
            recorder,
            verbosity,
        }
    }

    /// Returns the configured verbosity.
    pub fn verbosity(&self) -> u32 {
        self.verbosity
    }

    /// Sends an informational message.
    pub fn info(&self, message: &str) {
        info!("{message}");
        self.recorder
            .send_message(MessageLevel::Informational, message);
    }

    /// Sends a warning.
    pub fn warn(&self, message: &str) {
        warn!("{message}");
        self.recorder.send_message(MessageLevel::Warning, message);
    }

    /// Sends an error.
    pub fn error(&self, message: &str) {
        error!("{message}");
        self.recorder.send_message(MessageLevel::Error, message);
    }

    /// Logs a debug message, forwarding it to the host if verbosity is high enough.
    pub fn debug(&self, message: &str) {
        debug!("{message}");
        if self.verbosity >= Self::DEBUG_VERBOSITY {
            self.recorder
                .send_message(MessageLevel::Informational, message);
        }
    }

    /// Sends an error along with details about its cause.
    pub fn error_with<E: StdError>(&self, message: &str, err: &E) {
        error!(error = %DisplayErrorChain::new(err), "{message}");
        self.send_with_detail(MessageLevel::Error, message, err);
    }

    /// Sends a warning along with details about its cause.
    pub fn warn_with<E: StdError>(&self, message: &str, err: &E) {
        warn!(error = %DisplayErrorChain::new(err), "{message}");
        self.send_with_detail(MessageLevel::Warning, message, err);
    }

    fn send_with_detail<E: StdError>(&self, level: MessageLevel, message: &str, err: &E) {
        if self.verbosity == 0 {
            self.recorder.send_message(
                level,
                &format!("Exception {}, {message}", short_type_name::<E>()),
            );
        } else {
            self.recorder.send_message(level, message);
            self.recorder
                .send_message(level, &DisplayErrorChain::new(err).to_string());
        }
    }

    // ---
    // Helper messages
    // ---

    pub(crate) fn assembly_not_supported(&self, assembly: &Utf8Path) {
        self.warn(&format!("Assembly not supported: {assembly}"));
    }

    pub(crate) fn dependency_not_found(&self, dependency: &str, assembly: &Utf8Path) {
        self.warn(&format!(
            "Dependent assembly {dependency} of {assembly} not found. \
             Can be ignored if not a test assembly for this engine."
        ));
    }

    pub(crate) fn unsupported_framework(&self, assembly: &Utf8Path) {
        self.info(&format!(
            "Attempt to load assembly with unsupported test framework in {assembly}"
        ));
    }

    pub(crate) fn no_tests_found(&self, assembly: &Utf8Path) {
        self.info(&format!("No tests found in {assembly}"));
    }
}

impl std::fmt::Debug for TestLogger<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestLogger")
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}
