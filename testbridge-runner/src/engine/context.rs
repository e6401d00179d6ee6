// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    engine::{EventListener, TestTree},
    errors::{LoadError, RunError},
    test_filter::TestFilter,
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// The value of a [`TestPackage`] setting.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SettingValue {
    /// A boolean setting.
    Bool(bool),

    /// A text setting.
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// An assembly to load, along with the settings to load it with.
#[derive(Clone, Debug)]
pub struct TestPackage {
    assembly: Utf8PathBuf,
    settings: IndexMap<String, SettingValue>,
}

impl TestPackage {
    /// Whether the engine should shadow-copy the assembly before loading it.
    pub const SHADOW_COPY_FILES: &'static str = "ShadowCopyFiles";

    /// Creates a package for the given assembly, with no settings.
    pub fn new(assembly: impl Into<Utf8PathBuf>) -> Self {
        Self {
            assembly: assembly.into(),
            settings: IndexMap::new(),
        }
    }

    /// Returns the assembly path.
    pub fn assembly(&self) -> &Utf8Path {
        &self.assembly
    }

    /// Sets a setting, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: SettingValue) -> &mut Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Returns a setting, if set.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.settings.get(key)
    }

    /// Returns a boolean setting, if set to a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.settings.get(key) {
            Some(SettingValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Iterates over all settings, in insertion order.
    pub fn settings(&self) -> impl Iterator<Item = (&str, &SettingValue)> + '_ {
        self.settings.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Options passed to [`ExecutionContext::run`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RunOptions {
    /// Whether the engine should capture trace output and forward it as
    /// [`EngineEvent::TestOutput`](crate::engine::EngineEvent::TestOutput).
    pub capture_trace: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            capture_trace: true,
        }
    }
}

/// An isolated boundary an assembly is loaded into and run in.
///
/// An execution context is used for exactly one assembly. The context is owned by the
/// [`AssemblyRunner`](crate::runner::AssemblyRunner) that created it, which calls
/// [`unload`](Self::unload) exactly once on every path. [`cancel_run`](Self::cancel_run) and
/// [`is_running`](Self::is_running) may be called from other threads while
/// [`run`](Self::run) is blocking.
pub trait ExecutionContext: Send + Sync {
    /// Loads the package and discovers its tests.
    ///
    /// Returns `Ok(None)` if the assembly loaded but contains no tests for this engine.
    fn load(&self, package: &TestPackage) -> Result<Option<TestTree>, LoadError>;

    /// Runs the tests selected by `filter`, delivering events to `listener` sequentially. Blocks
    /// until the run is complete or cancelled.
    fn run(
        &self,
        listener: &mut dyn EventListener,
        filter: &TestFilter,
        options: RunOptions,
    ) -> Result<(), RunError>;

    /// Requests cancellation of the current run.
    fn cancel_run(&self);

    /// Returns true if a run is in progress.
    fn is_running(&self) -> bool;

    /// Tears down the context, releasing the loaded assembly.
    fn unload(&self);
}

/// Creates [`ExecutionContext`] instances.
pub trait ContextFactory: Send + Sync {
    /// Creates a fresh execution context.
    fn create_context(&self) -> Arc<dyn ExecutionContext>;
}
