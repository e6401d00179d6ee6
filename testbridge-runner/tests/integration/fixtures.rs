// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use fixture_data::{
    mock_assembly::{EXPECTED_FIXTURES, MOCK_ASSEMBLY, NAMESPACE_CATEGORIES},
    models::{FixtureStatus, FixtureSuite, FixtureTestCase},
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, Once,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    },
    time::Duration,
};
use testbridge_metadata::{MessageLevel, TestCase, TestOutcome, TestResult};
use testbridge_runner::{
    config::AdapterConfig,
    engine::{
        ContextFactory, EngineEvent, EngineServices, EventListener, ExecutionContext, FailureSite,
        NativeTestResult, NodeIndex, ResultState, RunOptions, TestKind, TestName, TestOutput,
        TestPackage, TestTree, TestTreeBuilder,
    },
    errors::{LoadError, RunError},
    host::TestRecorder,
    output,
    runner::TestExecutor,
    test_filter::TestFilter,
};

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        color_eyre::install().expect("color-eyre installed once");
    });
    output::init_logging();
}

struct MockFixture {
    suite: &'static FixtureSuite,
    index: NodeIndex,
    tests: Vec<(NodeIndex, &'static FixtureTestCase)>,
}

/// The mock assembly as an engine would discover it.
pub(crate) struct MockAssembly {
    tree: TestTree,
    fixtures: Vec<MockFixture>,
}

impl MockAssembly {
    pub(crate) fn load() -> Self {
        let mut builder = TestTreeBuilder::new(MOCK_ASSEMBLY);
        let mut namespaces: HashMap<String, NodeIndex> = HashMap::new();
        let mut fixtures = Vec::new();

        for suite in EXPECTED_FIXTURES.iter() {
            let mut parent = builder.root();
            let mut path = String::new();
            for segment in suite.namespace.split('.') {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(segment);
                parent = *namespaces.entry(path.clone()).or_insert_with(|| {
                    let index = builder.add_suite(parent, segment);
                    for (namespace, categories) in NAMESPACE_CATEGORIES {
                        if *namespace == path {
                            for category in *categories {
                                builder.add_category(index, *category);
                            }
                        }
                    }
                    index
                });
            }

            let index = builder.add_suite(parent, suite.name);
            for category in suite.categories {
                builder.add_category(index, *category);
            }
            let tests = suite
                .test_cases
                .iter()
                .map(|test_case| {
                    let test = builder.add_test(index, test_case.name);
                    for category in test_case.categories {
                        builder.add_category(test, *category);
                    }
                    for (key, value) in test_case.properties {
                        builder.set_property(test, *key, *value);
                    }
                    (test, test_case)
                })
                .collect();
            fixtures.push(MockFixture {
                suite,
                index,
                tests,
            });
        }

        Self {
            tree: builder.build(),
            fixtures,
        }
    }
}

/// Pauses the first mock run that reaches it, after its first test finishes, until that run is
/// cancelled.
#[derive(Debug)]
pub(crate) struct CancelGate {
    armed: AtomicBool,
    paused_tx: Mutex<mpsc::Sender<()>>,
    cancel_tx: Mutex<mpsc::Sender<()>>,
    cancel_rx: Mutex<mpsc::Receiver<()>>,
}

impl CancelGate {
    /// Returns the gate and a receiver that fires once the run has paused.
    pub(crate) fn new() -> (Arc<Self>, mpsc::Receiver<()>) {
        let (paused_tx, paused_rx) = mpsc::channel();
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let gate = Self {
            armed: AtomicBool::new(true),
            paused_tx: Mutex::new(paused_tx),
            cancel_tx: Mutex::new(cancel_tx),
            cancel_rx: Mutex::new(cancel_rx),
        };
        (Arc::new(gate), paused_rx)
    }

    fn pause(&self) {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.paused_tx.lock().unwrap().send(());
        let _ = self
            .cancel_rx
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(30));
    }

    fn release(&self) {
        let _ = self.cancel_tx.lock().unwrap().send(());
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MockOptions {
    pub(crate) load_error: Option<fn() -> LoadError>,
    pub(crate) run_error: Option<fn() -> RunError>,
    pub(crate) gate: Option<Arc<CancelGate>>,
}

/// An execution context that "runs" the mock assembly by replaying its fixture data.
pub(crate) struct MockEngine {
    options: MockOptions,
    assembly: Mutex<Option<MockAssembly>>,
    running: AtomicBool,
    cancelled: AtomicBool,
    loads: AtomicUsize,
    unloads: AtomicUsize,
}

impl MockEngine {
    fn new(options: MockOptions) -> Self {
        Self {
            options,
            assembly: Mutex::new(None),
            running: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
            unloads: AtomicUsize::new(0),
        }
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub(crate) fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    fn run_fixtures(
        &self,
        assembly: &MockAssembly,
        listener: &mut dyn EventListener,
        filter: &TestFilter,
        options: RunOptions,
    ) -> Result<(), RunError> {
        let tree = &assembly.tree;
        let selected = tree.leaves().filter(|node| filter.matches(*node)).count();
        listener.handle_event(EngineEvent::RunStarted {
            name: MOCK_ASSEMBLY,
            test_count: selected,
        });

        let mut finished = 0;
        for fixture in &assembly.fixtures {
            let tests: Vec<_> = fixture
                .tests
                .iter()
                .filter(|(index, _)| filter.matches(tree.node(*index)))
                .collect();
            if tests.is_empty() {
                continue;
            }

            let suite_name = tree.node(fixture.index).test_name();
            listener.handle_event(EngineEvent::SuiteStarted { suite: &suite_name });
            for (index, test_case) in tests {
                if self.cancelled.load(Ordering::SeqCst) {
                    return Err(RunError::ContextReleased);
                }
                let test_name = tree.node(*index).test_name();
                run_test(listener, fixture.suite, test_name, test_case, options);

                finished += 1;
                if finished == 1
                    && let Some(gate) = &self.options.gate
                {
                    gate.pause();
                }
            }

            let mut suite_result =
                NativeTestResult::new(suite_name, TestKind::Suite, ResultState::Success);
            if let Some(message) = fixture.suite.setup_failure {
                suite_result.state = ResultState::Failure;
                suite_result.failure_site = FailureSite::SetUp;
                suite_result.message = Some(message.to_owned());
            }
            listener.handle_event(EngineEvent::SuiteFinished {
                result: &suite_result,
            });
        }

        let root = NativeTestResult::new(tree.root().test_name(), TestKind::Suite, ResultState::Success);
        listener.handle_event(EngineEvent::RunFinished { result: Some(&root) });
        Ok(())
    }
}

fn run_test(
    listener: &mut dyn EventListener,
    suite: &FixtureSuite,
    test_name: TestName,
    test_case: &FixtureTestCase,
    options: RunOptions,
) {
    let mut result = NativeTestResult::new(test_name, TestKind::Test, ResultState::Success);
    if let Some(message) = suite.setup_failure {
        // Tests under a fixture whose setup failed never run.
        result.state = ResultState::Failure;
        result.failure_site = FailureSite::Parent;
        result.message = Some(format!("OneTimeSetUp: {message}"));
        listener.handle_event(EngineEvent::TestFinished { result: &result });
        return;
    }

    if test_case.status.is_executed() {
        listener.handle_event(EngineEvent::TestStarted {
            test: &result.test,
        });
        for line in test_case.output.iter().filter(|_| options.capture_trace) {
            let output = TestOutput::out(*line);
            listener.handle_event(EngineEvent::TestOutput { output: &output });
        }
        result.time = 0.25;
    }

    result.state = match test_case.status {
        FixtureStatus::Pass => ResultState::Success,
        FixtureStatus::Fail { .. } => ResultState::Failure,
        FixtureStatus::Error { .. } => ResultState::Error,
        FixtureStatus::Inconclusive { .. } => ResultState::Inconclusive,
        FixtureStatus::Ignored { .. } => ResultState::Ignored,
        FixtureStatus::NotRunnable { .. } => ResultState::NotRunnable,
    };
    result.message = test_case.status.message().map(str::to_owned);
    result.stack_trace = test_case.status.stack_trace().map(str::to_owned);
    listener.handle_event(EngineEvent::TestFinished { result: &result });
}

impl ExecutionContext for MockEngine {
    fn load(&self, package: &TestPackage) -> Result<Option<TestTree>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(load_error) = self.options.load_error {
            return Err(load_error());
        }
        if package.assembly() != MOCK_ASSEMBLY {
            return Ok(None);
        }
        let assembly = MockAssembly::load();
        let tree = assembly.tree.clone();
        *self.assembly.lock().unwrap() = Some(assembly);
        Ok(Some(tree))
    }

    fn run(
        &self,
        listener: &mut dyn EventListener,
        filter: &TestFilter,
        options: RunOptions,
    ) -> Result<(), RunError> {
        if let Some(run_error) = self.options.run_error {
            return Err(run_error());
        }
        let guard = self.assembly.lock().unwrap();
        let assembly = guard.as_ref().expect("run called after a successful load");

        self.running.store(true, Ordering::SeqCst);
        let result = self.run_fixtures(assembly, listener, filter, options);
        self.running.store(false, Ordering::SeqCst);
        result
    }

    fn cancel_run(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(gate) = &self.options.gate {
            gate.release();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn unload(&self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        self.assembly.lock().unwrap().take();
    }
}

/// Hands out a fresh [`MockEngine`] per assembly, keeping track of each one.
pub(crate) struct MockFactory {
    options: MockOptions,
    engines: Mutex<Vec<Arc<MockEngine>>>,
}

impl MockFactory {
    pub(crate) fn new(options: MockOptions) -> Arc<Self> {
        Arc::new(Self {
            options,
            engines: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn engines(&self) -> Vec<Arc<MockEngine>> {
        self.engines.lock().unwrap().clone()
    }
}

impl ContextFactory for MockFactory {
    fn create_context(&self) -> Arc<dyn ExecutionContext> {
        let engine = Arc::new(MockEngine::new(self.options.clone()));
        self.engines.lock().unwrap().push(engine.clone());
        engine
    }
}

/// Creates an executor backed by a fresh set of engine services.
pub(crate) fn make_executor(factory: &Arc<MockFactory>, config: AdapterConfig) -> TestExecutor {
    let services = EngineServices::initialize(factory.clone());
    TestExecutor::new(services, config)
}

#[derive(Clone, Debug)]
pub(crate) enum Record {
    Start(Arc<TestCase>),
    End(Arc<TestCase>, TestOutcome),
    Result(TestResult),
    Message(MessageLevel, String),
    EnableShutdown(bool),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingRecorder {
    records: Mutex<Vec<Record>>,
}

impl RecordingRecorder {
    pub(crate) fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub(crate) fn starts(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                Record::Start(test_case) => Some(test_case.fully_qualified_name.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn ends(&self) -> Vec<(String, TestOutcome)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                Record::End(test_case, outcome) => {
                    Some((test_case.fully_qualified_name.clone(), outcome))
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn results(&self) -> Vec<TestResult> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                Record::Result(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn result_for(&self, fully_qualified_name: &str) -> TestResult {
        self.results()
            .into_iter()
            .find(|result| result.test_case.fully_qualified_name == fully_qualified_name)
            .unwrap_or_else(|| panic!("no result recorded for {fully_qualified_name}"))
    }

    pub(crate) fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                Record::Message(level, message) => Some((level, message)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn enable_shutdown(&self) -> Vec<bool> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                Record::EnableShutdown(enable) => Some(enable),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}

impl TestRecorder for RecordingRecorder {
    fn record_start(&self, test_case: &Arc<TestCase>) {
        self.push(Record::Start(test_case.clone()));
    }

    fn record_end(&self, test_case: &Arc<TestCase>, outcome: TestOutcome) {
        self.push(Record::End(test_case.clone(), outcome));
    }

    fn record_result(&self, result: TestResult) {
        self.push(Record::Result(result));
    }

    fn send_message(&self, level: MessageLevel, message: &str) {
        self.push(Record::Message(level, message.to_owned()));
    }

    fn set_enable_shutdown_after_test_run(&self, enable: bool) {
        self.push(Record::EnableShutdown(enable));
    }
}
