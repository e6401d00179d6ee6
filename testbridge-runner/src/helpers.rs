// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for testbridge-runner.

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "assembly" if `count` is 1, otherwise "assemblies".
    pub fn assemblies_str(count: usize) -> &'static str {
        if count == 1 { "assembly" } else { "assemblies" }
    }
}

/// Removes exactly one trailing line break (`\r\n`, `\n` or `\r`) from `text`.
pub(crate) fn trim_line_break(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .or_else(|| text.strip_suffix('\r'))
        .unwrap_or(text)
}

/// Returns the last path segment of a type name, for use in short error reports.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    // Strip generic arguments first so that `a::B<c::D>` yields `B`.
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}
