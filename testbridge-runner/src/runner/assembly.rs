// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::AdapterConfig,
    converter::TestConverter,
    engine::{
        ChannelRegistry, EngineServices, ExecutionContext, RunOptions, SettingValue, TestPackage,
        TestTree,
    },
    errors::{LoadError, RunError, ServicesShutDownError},
    host::{RunContext, TestRecorder},
    listener::HostEventListener,
    logger::TestLogger,
    test_filter::{NameFilter, SelectionFilter, TestFilter, TestSelection},
};
use camino::{Utf8Path, Utf8PathBuf};
use debug_ignore::DebugIgnore;
use std::{fmt, sync::Arc};
use testbridge_metadata::TestCase;
use tracing::debug;

/// How a single assembly's run ended.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum AssemblyOutcome {
    /// The assembly was loaded and run. The run may have been cancelled.
    Ran,

    /// The assembly loaded but contained no tests.
    NoTests,

    /// The assembly was skipped because it isn't meant for this engine.
    Skipped,

    /// Loading or running the assembly failed.
    Failed,
}

/// Runs the tests in a single assembly.
///
/// Every call to [`run_assembly`](Self::run_assembly) loads the assembly into the runner's
/// execution context, runs it, and unloads it again, on every path.
pub struct AssemblyRunner {
    assembly: Utf8PathBuf,
    context: Arc<dyn ExecutionContext>,
    channels: ChannelRegistry,
    converter: TestConverter,
    filter: TestFilter,
    selection: Option<Arc<dyn TestSelection>>,
    loaded_test_cases: Vec<Arc<TestCase>>,
    verbosity: u32,
    shadow_copy: bool,
}

impl AssemblyRunner {
    /// Creates a runner for every test in `assembly`.
    ///
    /// Fails if `services` has been shut down.
    pub fn new(
        services: &EngineServices,
        assembly: impl Into<Utf8PathBuf>,
        config: &AdapterConfig,
        run_context: &RunContext,
    ) -> Result<Self, ServicesShutDownError> {
        let context = services.create_context()?;
        let assembly = assembly.into();
        let converter = TestConverter::new(
            assembly.clone(),
            run_context.effective_source_locator(),
            run_context.capabilities,
        );
        Ok(Self {
            assembly,
            context,
            channels: services.channels().clone(),
            converter,
            filter: TestFilter::All,
            selection: None,
            loaded_test_cases: Vec::new(),
            verbosity: config.verbosity,
            shadow_copy: config.shadow_copy,
        })
    }

    /// Creates a runner for the given test cases in `assembly`.
    pub fn for_test_cases<'c>(
        services: &EngineServices,
        assembly: impl Into<Utf8PathBuf>,
        test_cases: impl IntoIterator<Item = &'c TestCase>,
        config: &AdapterConfig,
        run_context: &RunContext,
    ) -> Result<Self, ServicesShutDownError> {
        let mut runner = Self::new(services, assembly, config, run_context)?;
        runner.filter = TestFilter::Names(NameFilter::from_test_cases(test_cases));
        Ok(runner)
    }

    /// Restricts the run to the tests chosen by a host-side selection.
    ///
    /// The selection is evaluated against the loaded tests once the assembly is loaded. If the
    /// selection turns out to be inactive, the runner's existing filter is used.
    pub fn with_selection(mut self, selection: Arc<dyn TestSelection>) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Returns the assembly this runner is for.
    pub fn assembly(&self) -> &Utf8Path {
        &self.assembly
    }

    /// Returns the filter the runner was constructed with.
    pub fn filter(&self) -> &TestFilter {
        &self.filter
    }

    /// Returns the test cases discovered by the last load, in depth-first order.
    pub fn loaded_test_cases(&self) -> &[Arc<TestCase>] {
        &self.loaded_test_cases
    }

    /// Returns a handle that can cancel this runner's run from another thread.
    pub fn canceller(&self) -> RunCanceller {
        RunCanceller {
            context: DebugIgnore(self.context.clone()),
        }
    }

    /// Cancels the run if one is in progress.
    pub fn cancel_run(&self) {
        self.canceller().cancel();
    }

    /// Loads and runs the assembly, reporting to `recorder`.
    ///
    /// Errors are reported to the host as messages and never returned.
    pub fn run_assembly(&mut self, recorder: &dyn TestRecorder) -> AssemblyOutcome {
        let logger = TestLogger::new(recorder, self.verbosity);
        let _unload = UnloadGuard(self.context.clone());

        let package = self.make_package(&logger);
        let tree = match self.context.load(&package) {
            Ok(Some(tree)) => tree,
            Ok(None) => {
                logger.no_tests_found(&self.assembly);
                return AssemblyOutcome::NoTests;
            }
            Err(error) => return self.report_load_error(&logger, error),
        };
        logger.info(&format!("Loading tests from {}", package.assembly()));

        self.add_test_cases(&tree);
        let filter = self.effective_filter(&logger);

        let mut listener = HostEventListener::new(
            recorder,
            logger,
            &self.converter,
            Some(
                self.channels
                    .register(format!("testbridge-listener:{}", self.assembly)),
            ),
        );
        match self
            .context
            .run(&mut listener, &filter, RunOptions::default())
        {
            Ok(()) => AssemblyOutcome::Ran,
            Err(RunError::ContextReleased) => {
                // Happens when the run is cancelled.
                logger.debug(&format!(
                    "Execution context for {} released during cancellation",
                    self.assembly
                ));
                AssemblyOutcome::Ran
            }
            Err(error) => {
                logger.error_with(
                    &format!("Exception thrown executing tests in {}", self.assembly),
                    &error,
                );
                AssemblyOutcome::Failed
            }
        }
    }

    fn make_package(&self, logger: &TestLogger<'_>) -> TestPackage {
        let mut package = TestPackage::new(self.assembly.clone());
        package.set(
            TestPackage::SHADOW_COPY_FILES,
            SettingValue::Bool(self.shadow_copy),
        );
        logger.debug(&format!(
            "{} is set to: {}",
            TestPackage::SHADOW_COPY_FILES,
            self.shadow_copy
        ));
        package
    }

    fn report_load_error(&self, logger: &TestLogger<'_>, error: LoadError) -> AssemblyOutcome {
        match error {
            LoadError::UnsupportedImageFormat => {
                logger.assembly_not_supported(&self.assembly);
                AssemblyOutcome::Skipped
            }
            LoadError::DependencyNotFound { dependency } => {
                logger.dependency_not_found(&dependency, &self.assembly);
                AssemblyOutcome::Skipped
            }
            LoadError::UnsupportedFramework => {
                logger.unsupported_framework(&self.assembly);
                AssemblyOutcome::Skipped
            }
            error => {
                logger.error_with(
                    &format!("Exception thrown executing tests in {}", self.assembly),
                    &error,
                );
                AssemblyOutcome::Failed
            }
        }
    }

    fn add_test_cases(&mut self, tree: &TestTree) {
        self.loaded_test_cases = tree
            .leaves()
            .filter_map(|node| self.converter.convert_test_case(node))
            .collect();
        debug!(
            assembly = %self.assembly,
            count = self.loaded_test_cases.len(),
            "registered test cases"
        );
    }

    fn effective_filter(&self, logger: &TestLogger<'_>) -> TestFilter {
        let Some(selection) = &self.selection else {
            return self.filter.clone();
        };
        if !selection.has_selection() {
            return self.filter.clone();
        }

        let filter = SelectionFilter::new(&**selection, &self.loaded_test_cases);
        logger.info(&format!(
            "Test selection detected: loaded test cases {}, selected test cases {}",
            self.loaded_test_cases.len(),
            filter.selected_count(),
        ));
        TestFilter::Selection(filter)
    }
}

impl fmt::Debug for AssemblyRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyRunner")
            .field("assembly", &self.assembly)
            .field("filter", &self.filter)
            .field("has_selection", &self.selection.is_some())
            .field("loaded_test_cases", &self.loaded_test_cases.len())
            .finish_non_exhaustive()
    }
}

/// Cancels an [`AssemblyRunner`]'s run from another thread.
#[derive(Clone, Debug)]
pub struct RunCanceller {
    context: DebugIgnore<Arc<dyn ExecutionContext>>,
}

impl RunCanceller {
    /// Requests cancellation if a run is in progress. Otherwise does nothing.
    ///
    /// This does not wait for the run to stop.
    pub fn cancel(&self) {
        if self.context.is_running() {
            debug!("cancelling in-progress run");
            self.context.cancel_run();
        }
    }
}

struct UnloadGuard(Arc<dyn ExecutionContext>);

impl Drop for UnloadGuard {
    fn drop(&mut self) {
        debug!("unloading execution context");
        self.0.unload();
    }
}
