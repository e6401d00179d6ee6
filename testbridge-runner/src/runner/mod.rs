// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running assemblies and reporting their results to the host.
//!
//! The main structure in this module is [`TestExecutor`], which drives a batch of assemblies one
//! at a time. Each assembly is run by an [`AssemblyRunner`].

mod assembly;
mod executor;

pub use assembly::*;
pub use executor::*;
