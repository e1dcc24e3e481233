//! Canonical normalizer — converts fixtures to a deterministic canonical form
//!
//! The canonical form is the single representation used for hashing,
//! diffing and `wasmtest fmt`.
//!
//! # Pipeline
//!
//! `fixture text → parse → normalize_suite → serialize_canonical → SHA-256`
//!
//! # Guarantees
//!
//! - **Idempotent**: `normalize(normalize(x)) == normalize(x)`
//! - **Deterministic**: same input always produces same output
//! - **Semantic preserving**: every case decodes to the same values after
//!   normalization; literals that do not decode are kept verbatim (trimmed)
//!   so the failure they cause is preserved too

use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::literal;
use crate::parser::ast::{TestCase, TestSuite};
use crate::{Error, Result};

// ── Public API ─────────────────────────────────────────────

/// Normalize fixture text to canonical form
///
/// # Errors
/// Returns `FixtureFormat` for documents the parser rejects.
pub fn normalize(fixture: &str) -> Result<String> {
    let suite = crate::parser::parse_suite(fixture)?;
    serialize_canonical(&normalize_suite(suite))
}

/// Rewrite every literal of a suite to its canonical spelling
///
/// 1. `param` is re-encoded from its decoded values (`int:1, int:2` → `int:1,int:2`)
/// 2. `expected` is re-encoded, or emptied when it is blank
/// 3. Witness addresses are trimmed and re-encoded
///
/// `method` needs no rewrite: the parser already trims it.
pub fn normalize_suite(mut suite: TestSuite) -> TestSuite {
    for case in suite.groups.iter_mut().flat_map(|g| g.cases.iter_mut()) {
        normalize_case(case);
    }
    suite
}

fn normalize_case(case: &mut TestCase) {
    case.param = match literal::decode_list(&case.param) {
        Ok(values) => literal::encode_list(&values),
        Err(_) => case.param.trim().to_string(),
    };

    case.expected = match literal::decode_optional(&case.expected) {
        Ok(Some(value)) => value.encode(),
        Ok(None) => String::new(),
        Err(_) => case.expected.trim().to_string(),
    };

    for witness in &mut case.env.witness {
        *witness = match Address::from_base58(witness.trim()) {
            Ok(address) => address.to_base58(),
            Err(_) => witness.trim().to_string(),
        };
    }
}

// ── Canonical Serializer ───────────────────────────────────

/// Serialize a suite as canonical JSON
///
/// One case object per line, keys in fixed order, defaults explicit
/// (`env` and `needContext` are always written; `notify` only when set).
pub fn serialize_canonical(suite: &TestSuite) -> Result<String> {
    if suite.groups.is_empty() {
        return Ok("[]\n".to_string());
    }

    let mut out = String::from("[\n");
    for (g, group) in suite.groups.iter().enumerate() {
        if group.cases.is_empty() {
            out.push_str("  []");
        } else {
            out.push_str("  [\n");
            for (c, case) in group.cases.iter().enumerate() {
                let line = serde_json::to_string(case)
                    .map_err(|e| Error::FixtureFormat(e.to_string()))?;
                out.push_str("    ");
                out.push_str(&line);
                if c + 1 < group.cases.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str("  ]");
        }
        if g + 1 < suite.groups.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str("]\n");
    Ok(out)
}

/// SHA-256 (hex) of the canonical form of a suite
pub fn compute_fixture_hash(suite: &TestSuite) -> Result<String> {
    let canonical = serialize_canonical(&normalize_suite(suite.clone()))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
