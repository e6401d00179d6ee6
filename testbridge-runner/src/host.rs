// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the host test orchestrator.
//!
//! The host drives a run by calling into [`TestExecutor`](crate::runner::TestExecutor) with a
//! [`RunContext`] and a [`TestRecorder`]. Everything the bridge reports flows back through the
//! recorder.

use crate::test_filter::TestSelection;
use camino::Utf8PathBuf;
use semver::Version;
use std::{fmt, sync::Arc};
use testbridge_metadata::{MessageLevel, TestCase, TestOutcome, TestResult};

/// Receives test records and messages from the bridge.
///
/// For any single test case, the bridge calls [`record_start`](Self::record_start) before
/// [`record_end`](Self::record_end), and `record_end` before
/// [`record_result`](Self::record_result). Every call for a test case passes the same
/// `Arc<TestCase>` instance.
pub trait TestRecorder: Send + Sync {
    /// Records that a test case started.
    fn record_start(&self, test_case: &Arc<TestCase>);

    /// Records that a test case finished with the given outcome.
    fn record_end(&self, test_case: &Arc<TestCase>, outcome: TestOutcome);

    /// Records the full result of a test case.
    fn record_result(&self, result: TestResult);

    /// Sends a free-form message to the host.
    fn send_message(&self, level: MessageLevel, message: &str);

    /// Tells the host whether it may shut down the test engine once the run completes.
    fn set_enable_shutdown_after_test_run(&self, _enable: bool) {}
}

/// The source location of a test method.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NavigationData {
    /// The source file.
    pub file_path: Utf8PathBuf,

    /// The line number within the file.
    pub line_number: u32,
}

/// Looks up the source location of test methods, typically from debug symbols.
pub trait SourceLocator: Send + Sync {
    /// Returns the location of `method_name` on the type `class_name`, or `None` if unknown.
    fn resolve(&self, class_name: &str, method_name: &str) -> Option<NavigationData>;
}

/// Optional host features, resolved once from the host's version.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HostCapabilities {
    /// Whether the host accepts traits on test cases.
    pub supports_traits: bool,
}

impl HostCapabilities {
    /// The first host version that accepts traits.
    pub const TRAITS_MIN_VERSION: Version = Version::new(11, 0, 51106);

    /// Resolves capabilities from the host version.
    pub fn from_host_version(version: &Version) -> Self {
        Self {
            supports_traits: *version >= Self::TRAITS_MIN_VERSION,
        }
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            supports_traits: true,
        }
    }
}

/// Per-run configuration supplied by the host.
#[derive(Clone)]
pub struct RunContext {
    /// Whether to look up source file and line information for test cases.
    pub collect_source_information: bool,

    /// Whether the host intends to keep the test engine alive after the run.
    pub keep_alive: bool,

    /// Optional host features.
    pub capabilities: HostCapabilities,

    /// A host-side test selection, if any.
    pub selection: Option<Arc<dyn TestSelection>>,

    /// The source locator to use when collecting source information.
    pub source_locator: Option<Arc<dyn SourceLocator>>,
}

impl RunContext {
    /// Creates a run context with default settings.
    pub fn new() -> Self {
        Self {
            collect_source_information: true,
            keep_alive: false,
            capabilities: HostCapabilities::default(),
            selection: None,
            source_locator: None,
        }
    }

    /// Sets the host-side test selection.
    pub fn with_selection(mut self, selection: Arc<dyn TestSelection>) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Sets the source locator.
    pub fn with_source_locator(mut self, locator: Arc<dyn SourceLocator>) -> Self {
        self.source_locator = Some(locator);
        self
    }

    /// Returns true if a selection was supplied and is active.
    pub fn has_active_selection(&self) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|selection| selection.has_selection())
    }

    /// Returns the source locator to use, honoring `collect_source_information`.
    pub(crate) fn effective_source_locator(&self) -> Option<Arc<dyn SourceLocator>> {
        if self.collect_source_information {
            self.source_locator.clone()
        } else {
            None
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field(
                "collect_source_information",
                &self.collect_source_information,
            )
            .field("keep_alive", &self.keep_alive)
            .field("capabilities", &self.capabilities)
            .field("has_selection", &self.selection.is_some())
            .field("has_source_locator", &self.source_locator.is_some())
            .finish()
    }
}
