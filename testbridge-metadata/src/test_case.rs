// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// The URI identifying the testbridge executor to the host orchestrator.
///
/// Every [`TestCase`] produced by testbridge carries this URI, so the host can route a later run
/// request for that case back to the same executor.
pub const EXECUTOR_URI: &str = "executor://testbridge";

/// The trait name used for test categories.
pub const CATEGORY_TRAIT: &str = "Category";

/// A single test case, as seen by the host orchestrator.
///
/// A `TestCase` is the projection of exactly one leaf test in an engine's test tree. Once created
/// it is never modified.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCase {
    /// The fully qualified name of the test: the path of the enclosing suite, a `.`, then the
    /// test's own name.
    pub fully_qualified_name: String,

    /// The name shown to users, typically the test's own name without the suite path.
    pub display_name: String,

    /// The URI of the executor that produced this test case.
    pub executor_uri: String,

    /// The assembly this test case was discovered in.
    pub source: Utf8PathBuf,

    /// The source file defining this test, if source information was collected and found.
    #[serde(default)]
    pub code_file_path: Option<Utf8PathBuf>,

    /// The line number of the test within [`Self::code_file_path`], if known.
    #[serde(default)]
    pub line_number: Option<u32>,

    /// Name/value tags attached to this test case, in the order they were derived.
    #[serde(default)]
    pub traits: Vec<Trait>,
}

impl TestCase {
    /// Creates a new test case without source location or traits.
    pub fn new(
        fully_qualified_name: impl Into<String>,
        display_name: impl Into<String>,
        source: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            fully_qualified_name: fully_qualified_name.into(),
            display_name: display_name.into(),
            executor_uri: EXECUTOR_URI.to_owned(),
            source: source.into(),
            code_file_path: None,
            line_number: None,
            traits: Vec::new(),
        }
    }

    /// Returns the assembly this test case belongs to.
    pub fn source(&self) -> &Utf8Path {
        &self.source
    }

    /// Adds a trait to this test case.
    pub fn add_trait(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) {
        self.traits.push(Trait::new(name, value));
    }

    /// Returns an iterator over the categories attached to this test case.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.traits
            .iter()
            .filter(|t| t.name == CATEGORY_TRAIT)
            .map(|t| t.value.as_str())
    }
}

/// A name/value tag attached to a [`TestCase`].
///
/// Categories are represented as multiple traits named [`CATEGORY_TRAIT`].
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
pub struct Trait {
    /// The name of the trait.
    pub name: SmolStr,

    /// The value of the trait.
    pub value: String,
}

impl Trait {
    /// Creates a new trait.
    pub fn new(name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.value)
    }
}
