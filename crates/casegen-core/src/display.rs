//! Display cleaning for UI-facing copies of cases

use crate::types::TestCase;
use once_cell::sync::Lazy;
use regex::Regex;

static CASE_ID_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]+(?:-[A-Z]+)*-\d+(?:-\d+)*:\s*").expect("regex to match case id prefixes")
});

/// Strip a leading id prefix such as `TC-USA-002-03: `
#[must_use]
pub fn clean_case_name(name: &str) -> String {
    CASE_ID_PREFIX.replace(name, "").into_owned()
}

/// Drop a trailing parenthesized alias: `"Orders (Order Management)"` -> `"Orders"`
#[must_use]
pub fn clean_module_name(module: &str) -> String {
    module.split(" (").next().unwrap_or(module).to_string()
}

/// Cleaned copy of a case for display
#[must_use]
pub fn display_case(case: &TestCase) -> TestCase {
    TestCase {
        case_name: clean_case_name(&case.case_name),
        module: clean_module_name(&case.module),
        ..case.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_prefixes() {
        assert_eq!(clean_case_name("TC-USA-002-03: buy at market"), "buy at market");
        assert_eq!(clean_case_name("TC-1:  x"), "x");
        assert_eq!(clean_case_name("buy TC-1: later"), "buy TC-1: later");
        assert_eq!(clean_case_name("tc-1: lower"), "tc-1: lower");
    }

    #[test]
    fn module_alias() {
        assert_eq!(clean_module_name("Orders (Order Management)"), "Orders");
        assert_eq!(clean_module_name("Orders"), "Orders");
    }
}
