// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filtering tests based on names or a host-side selection.
//!
//! Filters only ever decide on leaf tests. Whether a suite runs is up to the engine's traversal:
//! a suite runs if any of its leaves match.

use crate::engine::TestNodeRef;
use std::{collections::HashSet, fmt, sync::Arc};
use testbridge_metadata::TestCase;

/// A host-side test selection, such as a build server's test case filter expression.
pub trait TestSelection: Send + Sync {
    /// Returns true if the host actually requested a selection.
    ///
    /// If this returns false, [`matches`](Self::matches) is never consulted.
    fn has_selection(&self) -> bool;

    /// Returns true if the test case is selected.
    fn matches(&self, test_case: &TestCase) -> bool;
}

/// Decides which of an assembly's tests run.
#[derive(Clone, Debug, Default)]
pub enum TestFilter {
    /// Every test runs.
    #[default]
    All,

    /// Only tests whose fully qualified names are in the set run.
    Names(NameFilter),

    /// Only tests chosen by a host-side selection run.
    Selection(SelectionFilter),
}

impl TestFilter {
    /// Returns true if the given node should run.
    pub fn matches(&self, node: TestNodeRef<'_>) -> bool {
        match self {
            Self::All => true,
            Self::Names(filter) => filter.matches(node),
            Self::Selection(filter) => filter.matches(node),
        }
    }

    /// Returns true if this filter accepts every test.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// A filter over a set of fully qualified test names.
///
/// Matching is by exact set membership, never by prefix.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NameFilter {
    names: HashSet<String>,
}

impl NameFilter {
    /// Creates a filter from fully qualified names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a filter matching exactly the given test cases.
    pub fn from_test_cases<'a>(test_cases: impl IntoIterator<Item = &'a TestCase>) -> Self {
        Self::new(
            test_cases
                .into_iter()
                .map(|test_case| test_case.fully_qualified_name.as_str()),
        )
    }

    /// Returns true if `node` is a leaf test whose name is in the set.
    pub fn matches(&self, node: TestNodeRef<'_>) -> bool {
        !node.is_suite() && self.contains(&node.fully_qualified_name())
    }

    /// Returns true if the name is in the set.
    pub fn contains(&self, fully_qualified_name: &str) -> bool {
        self.names.contains(fully_qualified_name)
    }

    /// Returns the number of names in the set.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A filter computed by intersecting a host-side selection with the tests loaded from an
/// assembly.
#[derive(Clone)]
pub struct SelectionFilter {
    active: bool,
    selected: NameFilter,
}

impl SelectionFilter {
    /// Evaluates `selection` against every loaded test case.
    pub fn new<'a>(
        selection: &dyn TestSelection,
        loaded: impl IntoIterator<Item = &'a Arc<TestCase>>,
    ) -> Self {
        let active = selection.has_selection();
        let selected = if active {
            NameFilter::from_test_cases(
                loaded
                    .into_iter()
                    .map(|test_case| &**test_case)
                    .filter(|test_case| selection.matches(test_case)),
            )
        } else {
            NameFilter::default()
        };
        Self { active, selected }
    }

    /// Returns true if the host requested a selection.
    ///
    /// An active selection that matched nothing suppresses every test.
    pub fn has_active_selection(&self) -> bool {
        self.active
    }

    /// Returns the number of selected test cases.
    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Returns true if the given node should run.
    pub fn matches(&self, node: TestNodeRef<'_>) -> bool {
        !self.active || self.selected.matches(node)
    }
}

impl fmt::Debug for SelectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionFilter")
            .field("active", &self.active)
            .field("selected_count", &self.selected.len())
            .finish()
    }
}
