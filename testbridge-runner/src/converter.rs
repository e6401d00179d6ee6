// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation from engine types to host records.
//!
//! [`TestConverter`] is the only place where engine types ([`TestNodeRef`], [`NativeTestResult`])
//! are turned into host records ([`TestCase`], [`TestResult`]).

use crate::{
    cache::TestCaseCache,
    engine::{CATEGORIES_PROPERTY, NativeTestResult, ResultState, TestNodeRef, UniqueName},
    host::{HostCapabilities, SourceLocator},
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Local, TimeDelta};
use debug_ignore::DebugIgnore;
use std::{sync::Arc, time::Duration};
use testbridge_metadata::{CATEGORY_TRAIT, TestCase, TestOutcome, TestResult};
use tracing::trace;

/// Converts engine test nodes and results into host test cases and results.
///
/// A converter is scoped to a single assembly. Every test case it creates is cached by the
/// node's unique name, so converting the same node twice yields the same `Arc`.
#[derive(Debug)]
pub struct TestConverter {
    source: Utf8PathBuf,
    cache: TestCaseCache,
    source_locator: DebugIgnore<Option<Arc<dyn SourceLocator>>>,
    capabilities: HostCapabilities,
}

impl TestConverter {
    /// Creates a converter for the given assembly.
    ///
    /// If `source_locator` is `None`, test cases are created without file and line information.
    pub fn new(
        source: impl Into<Utf8PathBuf>,
        source_locator: Option<Arc<dyn SourceLocator>>,
        capabilities: HostCapabilities,
    ) -> Self {
        Self {
            source: source.into(),
            cache: TestCaseCache::new(),
            source_locator: DebugIgnore(source_locator),
            capabilities,
        }
    }

    /// Returns the assembly this converter is for.
    pub fn source(&self) -> &Utf8Path {
        &self.source
    }

    /// Returns the number of test cases created so far.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Converts a leaf test into a host test case, or returns the one already cached for it.
    ///
    /// Returns `None` for suites.
    pub fn convert_test_case(&mut self, node: TestNodeRef<'_>) -> Option<Arc<TestCase>> {
        if node.is_suite() {
            return None;
        }
        let Self {
            source,
            cache,
            source_locator,
            capabilities,
        } = self;
        Some(cache.get_or_create(node.unique_name(), || {
            make_test_case(node, source, source_locator.as_deref(), *capabilities)
        }))
    }

    /// Returns the test case cached for `unique_name`, if any.
    pub fn cached_test_case(&self, unique_name: &UniqueName) -> Option<&Arc<TestCase>> {
        self.cache.lookup(unique_name)
    }

    /// Converts an engine result into a host result.
    ///
    /// Returns `None` if no test case was cached for the result's test.
    pub fn convert_test_result(&self, result: &NativeTestResult) -> Option<TestResult> {
        let test_case = self.cache.lookup(&result.test.unique_name)?;

        // Negative, NaN and overflowing times are treated as zero.
        let duration = Duration::try_from_secs_f64(result.time).unwrap_or(Duration::ZERO);
        let end_time = Local::now().fixed_offset();
        let start_time = TimeDelta::from_std(duration)
            .ok()
            .and_then(|delta| end_time.checked_sub_signed(delta))
            .unwrap_or(end_time);

        Some(TestResult {
            test_case: test_case.clone(),
            outcome: outcome_for(result.state),
            duration,
            error_message: result.message.clone(),
            error_stack_trace: result.stack_trace.clone(),
            start_time,
            end_time,
            messages: Vec::new(),
        })
    }
}

/// Maps an engine result state to a host outcome.
pub fn outcome_for(state: ResultState) -> TestOutcome {
    match state {
        ResultState::Cancelled => TestOutcome::None,
        ResultState::Error => TestOutcome::Failed,
        ResultState::Failure => TestOutcome::Failed,
        ResultState::Ignored => TestOutcome::Skipped,
        ResultState::Inconclusive => TestOutcome::None,
        ResultState::NotRunnable => TestOutcome::Failed,
        ResultState::Skipped => TestOutcome::Skipped,
        ResultState::Success => TestOutcome::Passed,
    }
}

fn make_test_case(
    node: TestNodeRef<'_>,
    source: &Utf8Path,
    source_locator: Option<&dyn SourceLocator>,
    capabilities: HostCapabilities,
) -> TestCase {
    let mut test_case = TestCase::new(node.fully_qualified_name(), node.name(), source);

    if let (Some(locator), Some(class_name)) = (source_locator, node.class_name()) {
        match locator.resolve(class_name, node.name()) {
            Some(navigation) => {
                test_case.code_file_path = Some(navigation.file_path);
                test_case.line_number = Some(navigation.line_number);
            }
            None => trace!(
                test = %test_case.fully_qualified_name,
                "no source location found"
            ),
        }
    }

    if capabilities.supports_traits {
        add_traits(&mut test_case, node);
    }

    test_case
}

/// Adds traits from the node's ancestors, outermost first, followed by the node's own.
fn add_traits(test_case: &mut TestCase, node: TestNodeRef<'_>) {
    let mut chain: Vec<_> = node.ancestors().collect();
    chain.reverse();
    chain.push(node);

    for node in chain {
        for (key, value) in node.properties() {
            if key == CATEGORIES_PROPERTY {
                for category in value.values() {
                    test_case.add_trait(CATEGORY_TRAIT, category);
                }
            } else if !key.starts_with('_') {
                test_case.add_trait(key.as_str(), value.to_string());
            }
        }
    }
}
