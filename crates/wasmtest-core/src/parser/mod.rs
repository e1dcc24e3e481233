//! Fixture parser — decodes fixture documents into a `TestSuite`
//!
//! A fixture is a JSON array of groups, each an array of test case
//! objects. Parsing is pure; literal fields are validated later, per case.

pub mod ast;
pub mod tokenizer;

use std::path::Path;

use crate::{Error, Result};
use ast::TestSuite;

/// Parse fixture text into a TestSuite
///
/// # Errors
/// Returns `FixtureFormat` (serde_json reports line and column) for malformed JSON, for
/// documents that are not an array of arrays of case objects, and for
/// cases whose `method` is empty.
pub fn parse_suite(input: &str) -> Result<TestSuite> {
    let suite: TestSuite =
        serde_json::from_str(input).map_err(|e| Error::FixtureFormat(e.to_string()))?;

    for (g, group) in suite.groups.iter().enumerate() {
        for (c, case) in group.cases.iter().enumerate() {
            if case.method.is_empty() {
                return Err(Error::FixtureFormat(format!(
                    "group {} case {}: 'method' must not be empty",
                    g, c
                )));
            }
        }
    }

    tracing::debug!(
        groups = suite.groups.len(),
        cases = suite.case_count(),
        "parsed fixture"
    );
    Ok(suite)
}

/// Read and parse a fixture file
pub fn parse_suite_file(path: &Path) -> Result<TestSuite> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
    parse_suite(&text)
}
