// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The native test engine, as seen from the bridge.
//!
//! Everything in this module describes the engine side of the bridge: the discovered test tree
//! ([`TestTree`]), the lifecycle events the engine emits while running ([`EngineEvent`]), native
//! results ([`NativeTestResult`]), and the isolated execution context an assembly is loaded into
//! ([`ExecutionContext`]).
//!
//! Engine types stop at the [`TestConverter`](crate::converter::TestConverter): the host recorder
//! only ever sees types from [`testbridge_metadata`].

mod context;
mod events;
mod result;
mod services;
mod tree;

pub use context::*;
pub use events::*;
pub use result::*;
pub use services::*;
pub use tree::*;
