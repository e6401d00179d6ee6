// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fakes shared by unit tests.

use crate::{
    engine::{
        ContextFactory, EventListener, ExecutionContext, RunOptions, TestPackage, TestTree,
        TestTreeBuilder,
    },
    errors::{LoadError, RunError},
    host::TestRecorder,
    test_filter::TestFilter,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use testbridge_metadata::{MessageLevel, TestCase, TestOutcome, TestResult};

#[derive(Clone, Debug)]
pub(crate) enum RecorderEvent {
    Start(Arc<TestCase>),
    End(Arc<TestCase>, TestOutcome),
    Result(TestResult),
    Message(MessageLevel, String),
    EnableShutdown(bool),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingRecorder {
    events: Mutex<Vec<RecorderEvent>>,
}

impl RecordingRecorder {
    pub(crate) fn events(&self) -> Vec<RecorderEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecorderEvent::Message(level, text) => Some((level, text)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn results(&self) -> Vec<TestResult> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecorderEvent::Result(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    /// Returns the events with messages filtered out.
    pub(crate) fn records(&self) -> Vec<RecorderEvent> {
        self.events()
            .into_iter()
            .filter(|event| !matches!(event, RecorderEvent::Message(..)))
            .collect()
    }

    fn push(&self, event: RecorderEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl TestRecorder for RecordingRecorder {
    fn record_start(&self, test_case: &Arc<TestCase>) {
        self.push(RecorderEvent::Start(test_case.clone()));
    }

    fn record_end(&self, test_case: &Arc<TestCase>, outcome: TestOutcome) {
        self.push(RecorderEvent::End(test_case.clone(), outcome));
    }

    fn record_result(&self, result: TestResult) {
        self.push(RecorderEvent::Result(result));
    }

    fn send_message(&self, level: MessageLevel, message: &str) {
        self.push(RecorderEvent::Message(level, message.to_owned()));
    }

    fn set_enable_shutdown_after_test_run(&self, enable: bool) {
        self.push(RecorderEvent::EnableShutdown(enable));
    }
}

/// A small tree shaped like a typical assembly:
///
/// ```text
/// /work/mock-assembly.dll
/// └── NUnit (Category: super)
///     └── Tests
///         └── MockFixture (Category: cat1)
///             ├── MockTest1 (Priority: medium, _DESCRIPTION: hidden)
///             ├── MockTest2
///             └── MockTest3
/// ```
pub(crate) fn mock_tree() -> TestTree {
    let mut builder = TestTreeBuilder::new("/work/mock-assembly.dll");
    let ns = builder.add_suite(builder.root(), "NUnit");
    builder.add_category(ns, "super");
    let tests_ns = builder.add_suite(ns, "Tests");
    let fixture = builder.add_suite(tests_ns, "MockFixture");
    builder.add_category(fixture, "cat1");
    let test1 = builder.add_test(fixture, "MockTest1");
    builder
        .set_property(test1, "Priority", "medium")
        .set_property(test1, "_DESCRIPTION", "hidden");
    builder.add_test(fixture, "MockTest2");
    builder.add_test(fixture, "MockTest3");
    builder.build()
}

/// An execution context whose load result is fixed up front. Runs do nothing.
#[derive(Debug)]
pub(crate) struct FakeContext {
    load_result: Mutex<Option<Result<Option<TestTree>, LoadError>>>,
    packages: Mutex<Vec<TestPackage>>,
    unloads: AtomicUsize,
}

impl FakeContext {
    pub(crate) fn new(load_result: Result<Option<TestTree>, LoadError>) -> Arc<Self> {
        Arc::new(Self {
            load_result: Mutex::new(Some(load_result)),
            packages: Mutex::new(Vec::new()),
            unloads: AtomicUsize::new(0),
        })
    }

    pub(crate) fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    pub(crate) fn packages(&self) -> Vec<TestPackage> {
        self.packages.lock().unwrap().clone()
    }
}

impl ExecutionContext for FakeContext {
    fn load(&self, package: &TestPackage) -> Result<Option<TestTree>, LoadError> {
        self.packages.lock().unwrap().push(package.clone());
        self.load_result
            .lock()
            .unwrap()
            .take()
            .expect("load called at most once")
    }

    fn run(
        &self,
        _listener: &mut dyn EventListener,
        _filter: &TestFilter,
        _options: RunOptions,
    ) -> Result<(), RunError> {
        Ok(())
    }

    fn cancel_run(&self) {}

    fn is_running(&self) -> bool {
        false
    }

    fn unload(&self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct FakeFactory(pub(crate) Arc<FakeContext>);

impl ContextFactory for FakeFactory {
    fn create_context(&self) -> Arc<dyn ExecutionContext> {
        self.0.clone()
    }
}
