// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The identity cache: one host test case per engine test, for the lifetime of an assembly run.

use crate::engine::UniqueName;
use std::{collections::HashMap, sync::Arc};
use testbridge_metadata::TestCase;

/// Maps engine unique names to the host test cases created for them.
///
/// The cache is the single source of truth for which host test case a lifecycle event belongs to.
/// It is scoped to one assembly and is never shared.
#[derive(Clone, Debug, Default)]
pub struct TestCaseCache {
    cases: HashMap<UniqueName, Arc<TestCase>>,
}

impl TestCaseCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the test case cached for `unique_name`, creating it with `create` if absent.
    ///
    /// Repeated calls for the same name return the same `Arc`.
    pub fn get_or_create(
        &mut self,
        unique_name: &UniqueName,
        create: impl FnOnce() -> TestCase,
    ) -> Arc<TestCase> {
        if let Some(test_case) = self.cases.get(unique_name) {
            return test_case.clone();
        }
        let test_case = Arc::new(create());
        self.cases.insert(unique_name.clone(), test_case.clone());
        test_case
    }

    /// Returns the test case cached for `unique_name`. Never creates one.
    pub fn lookup(&self, unique_name: &UniqueName) -> Option<&Arc<TestCase>> {
        self.cases.get(unique_name)
    }

    /// Returns the number of cached test cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns true if no test cases are cached.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
