// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listening to engine events and recording them with the host.

use crate::{
    converter::TestConverter,
    engine::{
        ChannelRegistration, EngineEvent, EventListener, NativeTestResult, TestName, TestOutput,
        UniqueName,
    },
    helpers::trim_line_break,
    host::TestRecorder,
    logger::TestLogger,
};
use std::collections::HashMap;
use testbridge_metadata::TestResultMessage;
use tracing::debug;

/// The separator appended to each chunk of captured output.
pub const OUTPUT_SEPARATOR: char = '\r';

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum TestState {
    Started,
    Finished,
}

/// Translates engine lifecycle events into host records, as they arrive.
///
/// A listener handles exactly one assembly's event stream. While it is alive it holds a channel
/// registration with the engine, which is revoked when the listener is dropped.
pub struct HostEventListener<'a> {
    recorder: &'a dyn TestRecorder,
    logger: TestLogger<'a>,
    converter: &'a TestConverter,
    states: HashMap<UniqueName, TestState>,
    output: String,
    _channel: Option<ChannelRegistration>,
}

impl<'a> HostEventListener<'a> {
    /// Creates a new listener.
    pub fn new(
        recorder: &'a dyn TestRecorder,
        logger: TestLogger<'a>,
        converter: &'a TestConverter,
        channel: Option<ChannelRegistration>,
    ) -> Self {
        Self {
            recorder,
            logger,
            converter,
            states: HashMap::new(),
            output: String::new(),
            _channel: channel,
        }
    }

    /// Returns the output captured for the current test so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    fn run_started(&mut self, name: &str, test_count: usize) {
        debug!(name, test_count, "run started");
        self.logger.info(&format!("Run started: {name}"));
    }

    fn suite_finished(&mut self, result: &NativeTestResult) {
        if (result.is_error() || result.is_failure()) && result.failure_site.is_fixture_lifecycle()
        {
            self.logger.error(&format!(
                "{} failed for test fixture {}",
                result.failure_site, result.test.full_name
            ));
            if let Some(message) = &result.message {
                self.logger.error(message);
            }
            if let Some(stack_trace) = &result.stack_trace {
                self.logger.error(stack_trace);
            }
        }
    }

    fn test_started(&mut self, test: &TestName) {
        let Some(test_case) = self.converter.cached_test_case(&test.unique_name) else {
            debug!(test = %test.unique_name, "ignoring start of unknown test");
            return;
        };
        if self.states.contains_key(&test.unique_name) {
            debug!(test = %test.unique_name, "ignoring repeated start");
            return;
        }
        self.recorder.record_start(test_case);
        self.states
            .insert(test.unique_name.clone(), TestState::Started);
        self.output.clear();
    }

    fn test_output(&mut self, output: &TestOutput) {
        let text = trim_line_break(&output.text);
        if !text.trim().is_empty() {
            self.logger.info(text);
        }
        self.output.push_str(text);
        self.output.push(OUTPUT_SEPARATOR);
    }

    fn test_finished(&mut self, result: &NativeTestResult) {
        let Some(mut host_result) = self.converter.convert_test_result(result) else {
            debug!(test = %result.test.unique_name, "dropping result for unknown test");
            return;
        };

        match self.states.get(&result.test.unique_name) {
            Some(TestState::Started) => {}
            Some(TestState::Finished) => {
                debug!(test = %result.test.unique_name, "dropping duplicate result");
                return;
            }
            None => {
                // The engine reported a result for a registered test it never started. Keep the
                // host's start-before-end ordering.
                self.recorder.record_start(&host_result.test_case);
            }
        }

        if !self.output.is_empty() {
            host_result
                .messages
                .push(TestResultMessage::standard_out(std::mem::take(
                    &mut self.output,
                )));
        }
        self.recorder
            .record_end(&host_result.test_case, host_result.outcome);
        self.recorder.record_result(host_result);
        self.states
            .insert(result.test.unique_name.clone(), TestState::Finished);
    }
}

impl EventListener for HostEventListener<'_> {
    fn handle_event(&mut self, event: EngineEvent<'_>) {
        match event {
            EngineEvent::RunStarted { name, test_count } => self.run_started(name, test_count),
            EngineEvent::RunFinished { .. } | EngineEvent::SuiteStarted { .. } => {}
            EngineEvent::SuiteFinished { result } => self.suite_finished(result),
            EngineEvent::TestStarted { test } => self.test_started(test),
            EngineEvent::TestOutput { output } => self.test_output(output),
            EngineEvent::TestFinished { result } => self.test_finished(result),
            EngineEvent::UnhandledException {
                message,
                stack_trace,
            } => {
                debug!(message, stack_trace, "unhandled exception in engine");
            }
        }
    }
}
