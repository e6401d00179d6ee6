// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for testbridge: a bridge between a native test engine and a host test
//! orchestrator.
//!
//! The host calls into a [`TestExecutor`](runner::TestExecutor) with a list of assemblies or
//! test cases. For each assembly, the bridge loads it into an isolated
//! [`ExecutionContext`](engine::ExecutionContext), registers every discovered test, runs the
//! tests selected by a [`TestFilter`](test_filter::TestFilter), and translates the engine's
//! lifecycle events into host records as they arrive.
//!
//! The host-facing record types live in [`testbridge_metadata`].

pub mod cache;
pub mod config;
pub mod converter;
pub mod engine;
pub mod errors;
pub mod helpers;
pub mod host;
pub mod listener;
pub mod logger;
pub mod output;
pub mod runner;
pub mod test_filter;
#[cfg(test)]
mod test_helpers;
