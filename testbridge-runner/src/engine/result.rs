// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    engine::{TestKind, UniqueName},
    errors::{FailureSiteParseError, ResultStateParseError},
};
use std::{fmt, str::FromStr};

/// The state the engine assigns to a finished test or suite.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ResultState {
    /// The test ran but could not reach a verdict.
    Inconclusive,

    /// The test could not be run, for example because its arguments were missing.
    NotRunnable,

    /// The test was skipped.
    Skipped,

    /// The test was explicitly ignored.
    Ignored,

    /// The test passed.
    Success,

    /// An assertion failed.
    Failure,

    /// The test threw an unexpected exception.
    Error,

    /// The run was cancelled before the test finished.
    Cancelled,
}

impl ResultState {
    /// All result states, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Inconclusive,
        Self::NotRunnable,
        Self::Skipped,
        Self::Ignored,
        Self::Success,
        Self::Failure,
        Self::Error,
        Self::Cancelled,
    ];

    /// Returns the name the engine uses for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inconclusive => "Inconclusive",
            Self::NotRunnable => "NotRunnable",
            Self::Skipped => "Skipped",
            Self::Ignored => "Ignored",
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::Error => "Error",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for ResultState {
    type Err = ResultStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ResultStateParseError::new(s))
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in a test's lifecycle a failure happened.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum FailureSite {
    /// In the test itself.
    #[default]
    Test,

    /// In the fixture setup.
    SetUp,

    /// In the fixture teardown.
    TearDown,

    /// In a parent suite.
    Parent,

    /// In a child test.
    Child,
}

impl FailureSite {
    /// All failure sites, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Test,
        Self::SetUp,
        Self::TearDown,
        Self::Parent,
        Self::Child,
    ];

    /// Returns the name the engine uses for this site.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "Test",
            Self::SetUp => "SetUp",
            Self::TearDown => "TearDown",
            Self::Parent => "Parent",
            Self::Child => "Child",
        }
    }

    /// Returns true if this is the fixture setup or teardown.
    pub fn is_fixture_lifecycle(self) -> bool {
        matches!(self, Self::SetUp | Self::TearDown)
    }
}

impl FromStr for FailureSite {
    type Err = FailureSiteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|site| site.as_str() == s)
            .ok_or_else(|| FailureSiteParseError::new(s))
    }
}

impl fmt::Display for FailureSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity of a node, as carried by lifecycle events.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestName {
    /// The unique name of the node.
    pub unique_name: UniqueName,

    /// The engine's full name for the node.
    pub full_name: String,

    /// The node's short name.
    pub name: String,
}

/// The result of a finished test or suite, as reported by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeTestResult {
    /// The test or suite this result is for.
    pub test: TestName,

    /// Whether this is the result of a suite or a leaf test.
    pub kind: TestKind,

    /// The final state.
    pub state: ResultState,

    /// Where a failure happened, if the state is a failure or error.
    pub failure_site: FailureSite,

    /// The message reported alongside the result.
    pub message: Option<String>,

    /// The stack trace reported alongside the result.
    pub stack_trace: Option<String>,

    /// The elapsed time, in seconds.
    pub time: f64,
}

impl NativeTestResult {
    /// Creates a new result with no message, no stack trace and zero elapsed time.
    pub fn new(test: TestName, kind: TestKind, state: ResultState) -> Self {
        Self {
            test,
            kind,
            state,
            failure_site: FailureSite::Test,
            message: None,
            stack_trace: None,
            time: 0.0,
        }
    }

    /// Returns true if the engine considers this an error.
    pub fn is_error(&self) -> bool {
        self.state == ResultState::Error
    }

    /// Returns true if the engine considers this a failure.
    pub fn is_failure(&self) -> bool {
        self.state == ResultState::Failure
    }
}

/// A chunk of output captured while a test ran.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestOutput {
    /// The text, usually a single line including its line break.
    pub text: String,
}

impl TestOutput {
    /// Creates a chunk of captured output.
    pub fn out(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
