// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data models for fixture information.

use iddqd::{IdOrdItem, IdOrdMap, id_upcast};
use testbridge_metadata::TestOutcome;

/// A test fixture: a suite of leaf tests sharing setup and teardown.
#[derive(Clone, Debug)]
pub struct FixtureSuite {
    /// The dotted namespace the fixture lives in.
    pub namespace: &'static str,
    pub name: &'static str,
    pub categories: &'static [&'static str],
    /// If set, the fixture's one-time setup fails with this message and none of its tests run.
    pub setup_failure: Option<&'static str>,
    pub test_cases: IdOrdMap<FixtureTestCase>,
}

impl FixtureSuite {
    pub fn new(
        namespace: &'static str,
        name: &'static str,
        test_cases: IdOrdMap<FixtureTestCase>,
    ) -> Self {
        Self {
            namespace,
            name,
            categories: &[],
            setup_failure: None,
            test_cases,
        }
    }

    pub fn with_categories(mut self, categories: &'static [&'static str]) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_setup_failure(mut self, message: &'static str) -> Self {
        self.setup_failure = Some(message);
        self
    }

    /// The fixture's full name, as the engine reports it.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// The fully qualified name of one of this fixture's tests.
    pub fn test_full_name(&self, test_case: &FixtureTestCase) -> String {
        format!("{}.{}", self.full_name(), test_case.name)
    }

    /// The outcome the host should see for `test_case`, taking fixture setup into account.
    pub fn expected_outcome(&self, test_case: &FixtureTestCase) -> TestOutcome {
        if self.setup_failure.is_some() {
            TestOutcome::Failed
        } else {
            test_case.status.expected_outcome()
        }
    }
}

impl IdOrdItem for FixtureSuite {
    type Key<'a> = &'a str;
    fn key(&self) -> Self::Key<'_> {
        self.name
    }
    id_upcast!();
}

#[derive(Clone, Debug)]
pub struct FixtureTestCase {
    pub name: &'static str,
    pub status: FixtureStatus,
    pub categories: &'static [&'static str],
    pub properties: &'static [(&'static str, &'static str)],
    /// Lines the test writes to standard output while it runs.
    pub output: &'static [&'static str],
}

impl FixtureTestCase {
    pub fn new(name: &'static str, status: FixtureStatus) -> Self {
        Self {
            name,
            status,
            categories: &[],
            properties: &[],
            output: &[],
        }
    }

    pub fn with_categories(mut self, categories: &'static [&'static str]) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_properties(mut self, properties: &'static [(&'static str, &'static str)]) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_output(mut self, output: &'static [&'static str]) -> Self {
        self.output = output;
        self
    }
}

impl IdOrdItem for FixtureTestCase {
    type Key<'a> = &'a str;
    fn key(&self) -> Self::Key<'_> {
        self.name
    }
    id_upcast!();
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FixtureStatus {
    Pass,
    Fail {
        message: &'static str,
    },
    /// The test throws an exception it doesn't expect.
    Error {
        message: &'static str,
        stack_trace: &'static str,
    },
    Inconclusive {
        message: &'static str,
    },
    Ignored {
        reason: &'static str,
    },
    NotRunnable {
        reason: &'static str,
    },
}

impl FixtureStatus {
    pub fn expected_outcome(self) -> TestOutcome {
        match self {
            FixtureStatus::Pass => TestOutcome::Passed,
            FixtureStatus::Fail { .. }
            | FixtureStatus::Error { .. }
            | FixtureStatus::NotRunnable { .. } => TestOutcome::Failed,
            FixtureStatus::Inconclusive { .. } => TestOutcome::None,
            FixtureStatus::Ignored { .. } => TestOutcome::Skipped,
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            FixtureStatus::Pass => None,
            FixtureStatus::Fail { message }
            | FixtureStatus::Error { message, .. }
            | FixtureStatus::Inconclusive { message } => Some(message),
            FixtureStatus::Ignored { reason } | FixtureStatus::NotRunnable { reason } => {
                Some(reason)
            }
        }
    }

    pub fn stack_trace(self) -> Option<&'static str> {
        match self {
            FixtureStatus::Error { stack_trace, .. } => Some(stack_trace),
            _ => None,
        }
    }

    /// Returns true if the test body actually executes.
    pub fn is_executed(self) -> bool {
        !matches!(
            self,
            FixtureStatus::Ignored { .. } | FixtureStatus::NotRunnable { .. }
        )
    }
}
