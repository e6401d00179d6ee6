// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{AssemblyOutcome, AssemblyRunner, RunCanceller};
use crate::{
    config::AdapterConfig,
    engine::EngineServices,
    errors::{ConfigError, ServicesShutDownError},
    helpers::plural,
    host::{RunContext, TestRecorder},
    logger::TestLogger,
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use testbridge_metadata::{MessageLevel, TestCase, TestOutcome, TestResult};
use tracing::{debug, info};

/// The name the executor reports itself under.
pub const ADAPTER_NAME: &str = "testbridge";

/// The version the executor reports itself under.
pub const ADAPTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs batches of assemblies on behalf of the host.
///
/// Assemblies run one at a time. [`cancel`](Self::cancel) may be called from any thread while a
/// batch is running, and targets whichever assembly is currently running.
#[derive(Debug)]
pub struct TestExecutor {
    services: Arc<EngineServices>,
    config: AdapterConfig,
    config_error: Option<ConfigError>,
    current: Mutex<Option<RunCanceller>>,
}

impl TestExecutor {
    /// Creates an executor with the given configuration.
    pub fn new(services: Arc<EngineServices>, config: AdapterConfig) -> Self {
        Self {
            services,
            config,
            config_error: None,
            current: Mutex::new(None),
        }
    }

    /// Creates an executor, loading configuration from the environment.
    ///
    /// See [`from_config_result`](Self::from_config_result) for what happens if the configuration
    /// fails to load.
    pub fn from_env(services: Arc<EngineServices>) -> Self {
        Self::from_config_result(services, AdapterConfig::from_env())
    }

    /// Creates an executor from the result of loading configuration.
    ///
    /// If loading failed, defaults are used and the error is reported to the host at the start of
    /// every batch.
    pub fn from_config_result(
        services: Arc<EngineServices>,
        config: Result<AdapterConfig, ConfigError>,
    ) -> Self {
        match config {
            Ok(config) => Self::new(services, config),
            Err(error) => Self {
                config_error: Some(error),
                ..Self::new(services, AdapterConfig::default())
            },
        }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Runs every test in the given assemblies.
    ///
    /// Relative paths are resolved against the current directory. If the run context carries an
    /// active selection, only the selected tests run.
    pub fn run_sources<I>(
        &self,
        sources: I,
        run_context: &RunContext,
        recorder: &dyn TestRecorder,
    ) -> RunSummary
    where
        I: IntoIterator,
        I::Item: AsRef<Utf8Path>,
    {
        let recorder = CountingRecorder::new(recorder);
        let logger = self.start_batch(&recorder);

        logger.debug(&format!("Keep alive: {}", run_context.keep_alive));
        let enable_shutdown = self.enable_shutdown(run_context);
        // Enabling shutdown while the host isn't keeping the engine alive is rejected by some
        // hosts.
        if !run_context.has_active_selection() && (!enable_shutdown || run_context.keep_alive) {
            recorder.set_enable_shutdown_after_test_run(enable_shutdown);
        }

        let mut summary = RunSummary::default();
        for source in sources {
            let assembly = resolve_source(source.as_ref());
            let mut runner = match AssemblyRunner::new(
                &self.services,
                assembly.clone(),
                &self.config,
                run_context,
            ) {
                Ok(runner) => runner,
                Err(error) => {
                    summary.add_assembly(report_shut_down(&logger, &assembly, &error));
                    continue;
                }
            };
            if let Some(selection) = &run_context.selection {
                runner = runner.with_selection(selection.clone());
            }
            summary.add_assembly(self.run_assembly(&mut runner, &recorder));
        }

        self.finish_batch(&logger, &recorder, summary)
    }

    /// Runs the given test cases, grouped by the assembly they belong to.
    ///
    /// Assemblies run in the order they first appear in `test_cases`.
    pub fn run_tests<'c>(
        &self,
        test_cases: impl IntoIterator<Item = &'c TestCase>,
        run_context: &RunContext,
        recorder: &dyn TestRecorder,
    ) -> RunSummary {
        let recorder = CountingRecorder::new(recorder);
        let enable_shutdown = self.enable_shutdown(run_context);
        recorder.set_enable_shutdown_after_test_run(enable_shutdown);
        let logger = self.start_batch(&recorder);
        logger.debug(&format!(
            "{ADAPTER_NAME} {ADAPTER_VERSION} enable shutdown set to {enable_shutdown}"
        ));

        let mut groups: IndexMap<&Utf8Path, Vec<&TestCase>> = IndexMap::new();
        for test_case in test_cases {
            groups.entry(test_case.source()).or_default().push(test_case);
        }

        let mut summary = RunSummary::default();
        for (assembly, test_cases) in groups {
            let mut runner = match AssemblyRunner::for_test_cases(
                &self.services,
                assembly,
                test_cases,
                &self.config,
                run_context,
            ) {
                Ok(runner) => runner,
                Err(error) => {
                    summary.add_assembly(report_shut_down(&logger, assembly, &error));
                    continue;
                }
            };
            summary.add_assembly(self.run_assembly(&mut runner, &recorder));
        }

        self.finish_batch(&logger, &recorder, summary)
    }

    /// Cancels the assembly that is currently running, if any.
    ///
    /// Returns immediately. The batch continues with the remaining assemblies.
    pub fn cancel(&self) {
        if let Some(canceller) = &*self.lock_current() {
            canceller.cancel();
        }
    }

    fn start_batch<'a>(&self, recorder: &'a dyn TestRecorder) -> TestLogger<'a> {
        let logger = TestLogger::new(recorder, self.config.verbosity);
        if let Some(error) = &self.config_error {
            logger.error_with("Failed to load adapter configuration", error);
        }
        logger.info(&format!(
            "{ADAPTER_NAME} {ADAPTER_VERSION} executing tests is started"
        ));

        // Channels left behind by earlier runs would receive this batch's events.
        self.services.channels().clear();
        logger
    }

    fn finish_batch(
        &self,
        logger: &TestLogger<'_>,
        recorder: &CountingRecorder<'_>,
        mut summary: RunSummary,
    ) -> RunSummary {
        logger.info(&format!(
            "{ADAPTER_NAME} {ADAPTER_VERSION} executing tests is finished"
        ));
        summary.outcomes = recorder.take_counts();
        let total = summary.total_results();
        info!(
            "ran {} {} in {} {} ({} skipped, {} failed)",
            total,
            plural::tests_str(total),
            summary.assemblies_run,
            plural::assemblies_str(summary.assemblies_run),
            summary.assemblies_skipped,
            summary.assemblies_failed,
        );
        summary
    }

    fn run_assembly(
        &self,
        runner: &mut AssemblyRunner,
        recorder: &dyn TestRecorder,
    ) -> AssemblyOutcome {
        *self.lock_current() = Some(runner.canceller());
        let outcome = runner.run_assembly(recorder);
        *self.lock_current() = None;
        debug!(assembly = %runner.assembly(), ?outcome, "assembly finished");
        outcome
    }

    fn enable_shutdown(&self, run_context: &RunContext) -> bool {
        if self.config.use_keep_engine_running {
            !run_context.keep_alive
        } else {
            true
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<RunCanceller>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn report_shut_down(
    logger: &TestLogger<'_>,
    assembly: &Utf8Path,
    error: &ServicesShutDownError,
) -> AssemblyOutcome {
    logger.error_with(&format!("Cannot run tests in {assembly}"), error);
    AssemblyOutcome::Failed
}

fn resolve_source(source: &Utf8Path) -> Utf8PathBuf {
    if source.is_absolute() {
        return source.to_owned();
    }
    match std::env::current_dir().map(Utf8PathBuf::try_from) {
        Ok(Ok(current_dir)) => current_dir.join(source),
        _ => {
            debug!(%source, "could not determine current directory, using relative path");
            source.to_owned()
        }
    }
}

/// A summary of a batch run by [`TestExecutor`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    /// The number of assemblies that were loaded and run.
    pub assemblies_run: usize,

    /// The number of assemblies that were skipped, including ones with no tests.
    pub assemblies_skipped: usize,

    /// The number of assemblies that failed to load or run.
    pub assemblies_failed: usize,

    /// The number of results reported to the host, by outcome.
    pub outcomes: BTreeMap<TestOutcome, usize>,
}

impl RunSummary {
    /// Returns the number of results reported with the given outcome.
    pub fn count(&self, outcome: TestOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Returns the total number of results reported.
    pub fn total_results(&self) -> usize {
        self.outcomes.values().sum()
    }

    fn add_assembly(&mut self, outcome: AssemblyOutcome) {
        match outcome {
            AssemblyOutcome::Ran => self.assemblies_run += 1,
            AssemblyOutcome::NoTests | AssemblyOutcome::Skipped => self.assemblies_skipped += 1,
            AssemblyOutcome::Failed => self.assemblies_failed += 1,
        }
    }
}

/// Forwards to another recorder, counting results by outcome.
struct CountingRecorder<'a> {
    inner: &'a dyn TestRecorder,
    counts: Mutex<BTreeMap<TestOutcome, usize>>,
}

impl<'a> CountingRecorder<'a> {
    fn new(inner: &'a dyn TestRecorder) -> Self {
        Self {
            inner,
            counts: Mutex::new(BTreeMap::new()),
        }
    }

    fn take_counts(&self) -> BTreeMap<TestOutcome, usize> {
        std::mem::take(&mut *self.counts.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl TestRecorder for CountingRecorder<'_> {
    fn record_start(&self, test_case: &Arc<TestCase>) {
        self.inner.record_start(test_case);
    }

    fn record_end(&self, test_case: &Arc<TestCase>, outcome: TestOutcome) {
        self.inner.record_end(test_case, outcome);
    }

    fn record_result(&self, result: TestResult) {
        *self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(result.outcome)
            .or_default() += 1;
        self.inner.record_result(result);
    }

    fn send_message(&self, level: MessageLevel, message: &str) {
        self.inner.send_message(level, message);
    }

    fn set_enable_shutdown_after_test_run(&self, enable: bool) {
        self.inner.set_enable_shutdown_after_test_run(enable);
    }
}
