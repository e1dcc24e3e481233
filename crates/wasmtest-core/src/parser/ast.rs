//! Fixture document types
//!
//! These mirror the JSON shape of a fixture: an outer array of groups,
//! each an array of test case objects. Literal fields (`param`,
//! `expected`, witness addresses) are kept as raw text so that a bad
//! literal fails only its own case; decoding happens through the
//! accessor methods below.

use crate::address::Address;
use crate::literal::{self, Value};
use crate::{Error, Result};

/// Ordered sequence of test groups
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TestSuite {
    pub groups: Vec<TestGroup>,
}

/// Ordered sequence of test cases sharing engine storage and context
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TestGroup {
    pub cases: Vec<TestCase>,
}

/// Signer set for one invocation
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct TestEnv {
    #[serde(default)]
    pub witness: Vec<String>,
}

/// One invocation record
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub env: TestEnv,
    #[serde(default, rename = "needContext", alias = "needcontext")]
    pub need_context: bool,
    /// Method name, surrounding whitespace removed on read
    #[serde(deserialize_with = "trimmed")]
    pub method: String,
    #[serde(default)]
    pub param: String,
    #[serde(default)]
    pub expected: String,
    /// Substring the JSON of the call's notifications must contain
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notify: String,
}

fn trimmed<'de, D: serde::Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let s: String = serde::Deserialize::deserialize(d)?;
    Ok(s.trim().to_string())
}

impl TestSuite {
    pub fn case_count(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }
}

impl TestCase {
    pub fn new(method: impl Into<String>) -> Self {
        TestCase {
            method: method.into().trim().to_string(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = expected.into();
        self
    }

    pub fn with_witness(mut self, witness: impl Into<String>) -> Self {
        self.env.witness.push(witness.into());
        self
    }

    pub fn with_context(mut self) -> Self {
        self.need_context = true;
        self
    }

    /// Decode `param` into positional call arguments
    pub fn params(&self) -> Result<Vec<Value>> {
        literal::decode_list(&self.param)
    }

    /// Decode `expected`; `None` means no return value check
    pub fn expectation(&self) -> Result<Option<Value>> {
        literal::decode_optional(&self.expected)
    }

    /// Decode the witness addresses
    pub fn witnesses(&self) -> Result<Vec<Address>> {
        self.env
            .witness
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Address::from_base58(text.trim()).map_err(|reason| Error::LiteralDecode {
                    token: text.clone(),
                    position: i + 1,
                    reason: format!("invalid witness address: {}", reason),
                })
            })
            .collect()
    }
}
