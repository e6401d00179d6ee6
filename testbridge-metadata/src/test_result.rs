// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::TestCase;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};

/// The terminal classification of a single test run, as understood by the host.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestOutcome {
    /// No outcome: the test was cancelled or was inconclusive.
    #[default]
    None,

    /// The test passed.
    Passed,

    /// The test failed, errored out or could not be run.
    Failed,

    /// The test was skipped or ignored.
    Skipped,

    /// The test could not be found.
    NotFound,
}

impl TestOutcome {
    /// Returns all the outcomes, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Passed,
        Self::Failed,
        Self::Skipped,
        Self::NotFound,
    ];

    /// Returns the string form of this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::NotFound => "not-found",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The severity of a free-form message sent to the host.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageLevel {
    /// An informational message.
    Informational,

    /// A warning.
    Warning,

    /// An error.
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Informational => f.write_str("informational"),
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// The category of a message attached to a [`TestResult`].
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultMessageCategory {
    /// Text written to standard output while the test ran.
    StandardOut,

    /// Text written to standard error while the test ran.
    StandardError,

    /// Additional information about the result.
    AdditionalInfo,
}

/// A message attached to a [`TestResult`].
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct TestResultMessage {
    /// The category of the message.
    pub category: ResultMessageCategory,

    /// The message text.
    pub text: String,
}

impl TestResultMessage {
    /// Creates a standard output message.
    pub fn standard_out(text: impl Into<String>) -> Self {
        Self {
            category: ResultMessageCategory::StandardOut,
            text: text.into(),
        }
    }
}

/// The result of running a single [`TestCase`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestResult {
    /// The test case this result is for.
    ///
    /// This is the same instance the host saw in `record_start`.
    pub test_case: Arc<TestCase>,

    /// The outcome of the test.
    pub outcome: TestOutcome,

    /// How long the test took to run.
    #[serde(with = "duration_secs")]
    pub duration: Duration,

    /// The error or status message reported by the engine, if any.
    pub error_message: Option<String>,

    /// The stack trace reported by the engine, if any.
    pub error_stack_trace: Option<String>,

    /// The time at which the test started.
    pub start_time: DateTime<FixedOffset>,

    /// The time at which the test finished.
    pub end_time: DateTime<FixedOffset>,

    /// Messages attached to this result, such as captured standard output.
    #[serde(default)]
    pub messages: Vec<TestResultMessage>,
}

impl TestResult {
    /// Returns the captured standard output for this result, if any was attached.
    pub fn standard_out(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.category == ResultMessageCategory::StandardOut)
            .map(|m| m.text.as_str())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
