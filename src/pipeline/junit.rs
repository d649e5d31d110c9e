// src/pipeline/junit.rs

//! Failed-test extraction from a CTest `--output-junit` file.

use anyhow::{Context, Result};
use serde::Deserialize;

/// One failed test case from the result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTest {
    pub name: String,
    /// Captured `system-out`, if the test produced any.
    pub output: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TestSuite {
    #[serde(rename = "testcase", default)]
    cases: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
struct TestCase {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@status", default)]
    status: Option<String>,
    #[serde(rename = "failure", default)]
    failure: Option<Failure>,
    #[serde(rename = "system-out", default)]
    system_out: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Failure {
    #[serde(rename = "@message", default)]
    _message: Option<String>,
}

impl TestCase {
    fn failed(&self) -> bool {
        self.status.as_deref() == Some("fail") || self.failure.is_some()
    }
}

/// Parse the JUnit XML written by ctest and return its failed test cases in
/// file order.
pub fn failed_tests(xml: &str) -> Result<Vec<FailedTest>> {
    let suite: TestSuite = quick_xml::de::from_str(xml).context("parsing JUnit test results")?;

    Ok(suite
        .cases
        .into_iter()
        .filter(TestCase::failed)
        .map(|case| FailedTest {
            name: case.name,
            output: case
                .system_out
                .map(|out| out.trim_end().to_string())
                .filter(|out| !out.is_empty()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTEST_OUTPUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="Linux-c++" tests="3" failures="2" disabled="0" skipped="0" hostname="" time="0" timestamp="2024-05-01T10:00:00">
	<properties>
		<property name="ctest.version" value="3.28"/>
	</properties>
	<testcase name="math.adds" classname="math.adds" time="0.01" status="run">
		<system-out>ok</system-out>
	</testcase>
	<testcase name="math.divides" classname="math.divides" time="0.02" status="fail">
		<failure message="Failed"/>
		<system-out>expected 2 &lt; 1
at divide_test.cpp:14
</system-out>
	</testcase>
	<testcase name="io.reads" classname="io.reads" time="0.00" status="fail">
		<failure message="Failed"/>
	</testcase>
</testsuite>
"#;

    #[test]
    fn extracts_failed_cases_with_output() {
        let failed = failed_tests(CTEST_OUTPUT).unwrap();

        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].name, "math.divides");
        assert_eq!(
            failed[0].output.as_deref(),
            Some("expected 2 < 1\nat divide_test.cpp:14")
        );
        assert_eq!(failed[1].name, "io.reads");
        assert_eq!(failed[1].output, None);
    }

    #[test]
    fn passing_suite_has_no_failures() {
        let xml = r#"<testsuite name="s" tests="1">
  <testcase name="only" status="run"/>
</testsuite>"#;
        assert!(failed_tests(xml).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(failed_tests("<testsuite><testcase").is_err());
    }
}
