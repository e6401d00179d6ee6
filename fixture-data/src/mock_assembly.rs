// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Information about the mock assembly used by the runner's integration tests.

use crate::models::{FixtureStatus, FixtureSuite, FixtureTestCase};
use iddqd::{IdOrdMap, id_ord_map};
use std::sync::LazyLock;

/// The path the mock assembly is loaded from.
pub const MOCK_ASSEMBLY: &str = "/work/mock-assembly.dll";

/// Categories set on namespace suites, keyed by the namespace's full name.
pub const NAMESPACE_CATEGORIES: &[(&str, &[&str])] = &[("NUnit", &["super"])];

pub static EXPECTED_FIXTURES: LazyLock<IdOrdMap<FixtureSuite>> = LazyLock::new(|| {
    id_ord_map! {
        FixtureSuite::new(
            "NUnit.Tests.Assemblies",
            "MockTestFixture",
            id_ord_map! {
                FixtureTestCase::new("MockTest1", FixtureStatus::Pass)
                    .with_properties(&[("Priority", "medium"), ("_DESCRIPTION", "Mock Test #1")]),
                FixtureTestCase::new("MockTest2", FixtureStatus::Pass)
                    .with_categories(&["MockCategory"])
                    .with_properties(&[("Severity", "Critical")])
                    .with_output(&["line1\n", "line2"]),
                FixtureTestCase::new("MockTest3", FixtureStatus::Pass)
                    .with_categories(&["AnotherCategory", "MockCategory"]),
                FixtureTestCase::new(
                    "MockTest4",
                    FixtureStatus::Ignored { reason: "ignoring this test method for now" },
                )
                .with_categories(&["Foo"]),
                FixtureTestCase::new(
                    "FailingTest",
                    FixtureStatus::Fail { message: "Intentional failure" },
                )
                .with_output(&["about to fail\r\n"]),
                FixtureTestCase::new(
                    "TestWithException",
                    FixtureStatus::Error {
                        message: "System.ApplicationException : Intentional Exception",
                        stack_trace: "at NUnit.Tests.Assemblies.MockTestFixture.MethodThrowsException() \
                                      in MockTestFixture.cs:line 152\n\
                                      at NUnit.Tests.Assemblies.MockTestFixture.TestWithException() \
                                      in MockTestFixture.cs:line 147",
                    },
                ),
                FixtureTestCase::new(
                    "InconclusiveTest",
                    FixtureStatus::Inconclusive { message: "No valid data" },
                ),
                FixtureTestCase::new(
                    "NotRunnableTest",
                    FixtureStatus::NotRunnable { reason: "No arguments were provided" },
                ),
            },
        )
        .with_categories(&["cat1"]),
        FixtureSuite::new(
            "NUnit.Tests.Assemblies",
            "FixtureWithSetUpFailure",
            id_ord_map! {
                FixtureTestCase::new("TestUnderFailedSetUp", FixtureStatus::Pass),
            },
        )
        .with_setup_failure("System.InvalidOperationException : SetUp exploded"),
        FixtureSuite::new(
            "NUnit.Tests",
            "OtherFixture",
            id_ord_map! {
                FixtureTestCase::new("OtherTest", FixtureStatus::Pass)
                    .with_output(&["   \n"]),
            },
        ),
    }
});

/// Returns the number of leaf tests in the mock assembly.
pub fn leaf_count() -> usize {
    EXPECTED_FIXTURES
        .iter()
        .map(|fixture| fixture.test_cases.len())
        .sum()
}

pub fn get_expected_test(
    fixture_name: &str,
    test_name: &str,
) -> (&'static FixtureSuite, &'static FixtureTestCase) {
    let fixture = EXPECTED_FIXTURES
        .iter()
        .find(|fixture| fixture.name == fixture_name)
        .unwrap_or_else(|| panic!("fixture {fixture_name} not found"));
    let test_case = fixture
        .test_cases
        .iter()
        .find(|test_case| test_case.name == test_name)
        .unwrap_or_else(|| panic!("for fixture {fixture_name}, test name {test_name} not found"));
    (fixture, test_case)
}
