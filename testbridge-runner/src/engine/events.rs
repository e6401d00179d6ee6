// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::engine::{NativeTestResult, TestName, TestOutput};

/// A lifecycle event emitted by the engine while running an assembly.
///
/// Events borrow from the engine. They are delivered sequentially, in the order the engine
/// produced them, even if the engine runs tests on several threads internally.
#[derive(Clone, Copy, Debug)]
pub enum EngineEvent<'a> {
    /// The run started.
    RunStarted {
        /// The name of the run, usually the assembly path.
        name: &'a str,

        /// The number of tests the engine will run.
        test_count: usize,
    },

    /// The run finished. `result` is `None` if the engine aborted before producing one.
    RunFinished {
        /// The result of the root suite.
        result: Option<&'a NativeTestResult>,
    },

    /// A suite started.
    SuiteStarted {
        /// The suite.
        suite: &'a TestName,
    },

    /// A suite finished.
    SuiteFinished {
        /// The result of the suite.
        result: &'a NativeTestResult,
    },

    /// A leaf test started.
    TestStarted {
        /// The test.
        test: &'a TestName,
    },

    /// The currently running test wrote some output.
    TestOutput {
        /// The output.
        output: &'a TestOutput,
    },

    /// A leaf test finished.
    TestFinished {
        /// The result of the test.
        result: &'a NativeTestResult,
    },

    /// An exception escaped the engine's handling.
    UnhandledException {
        /// The exception message.
        message: &'a str,

        /// The stack trace, if any.
        stack_trace: Option<&'a str>,
    },
}

/// Receives lifecycle events from the engine.
///
/// Implemented for closures taking an [`EngineEvent`].
pub trait EventListener {
    /// Handles a single event.
    fn handle_event(&mut self, event: EngineEvent<'_>);
}

impl<F> EventListener for F
where
    F: FnMut(EngineEvent<'_>),
{
    fn handle_event(&mut self, event: EngineEvent<'_>) {
        self(event)
    }
}
