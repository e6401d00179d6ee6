// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Host-facing records produced by testbridge.
//!
//! A test orchestrator consuming testbridge output only ever sees the types in this crate: a
//! [`TestCase`] for every leaf test discovered in an assembly, and a [`TestResult`] for every test
//! that finished running. Engine-native types never cross into this crate.
//!
//! All types are serializable, so recorders can forward them across a process boundary as JSON.

mod test_case;
mod test_result;

pub use test_case::*;
pub use test_result::*;
