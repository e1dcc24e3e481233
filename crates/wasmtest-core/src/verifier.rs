//! Fixture verifier — checks a suite against a contract's dispatch table
//!
//! Verification is static: nothing is executed. The verifier walks every
//! case and accumulates all diagnostics rather than stopping at the first
//! error, so a single `check` run reports every problem in a fixture.
//!
//! # Checks
//!
//! 1. **Literals** — `param`, `expected` and witness addresses decode
//! 2. **Dispatch** — the method is registered on the target
//! 3. **Arguments** — arity and parameter types match the descriptor
//! 4. **Context** — `needContext` agrees with what the method declares
//! 5. **Return** — a non-empty `expected` matches the declared return type

use crate::engine::{DispatchTable, MethodSignature};
use crate::literal::Value;
use crate::parser::ast::{TestCase, TestSuite};
use crate::Error;

// ── Verification Result Types ─────────────────────────────

/// Result of fixture verification — accumulates all diagnostics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VerificationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl VerificationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no errors were found (warnings are OK)
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns only error-level diagnostics
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    /// Returns only warning-level diagnostics
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    fn add_error(&mut self, kind: DiagnosticKind, message: String, location: Location) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            kind,
            message,
            location,
        });
    }

    fn add_warning(&mut self, kind: DiagnosticKind, message: String, location: Location) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            message,
            location,
        });
    }
}

/// Position of a case inside a suite (both 0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Location {
    pub group: usize,
    pub case: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "group {} case {}", self.group, self.case)
    }
}

/// A single verification diagnostic
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Location,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{} [{}] at {}: {}",
            prefix, self.kind, self.location, self.message
        )
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Category of verification issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    LiteralError,
    UnknownMethod,
    ArgumentError,
    ContextError,
    ReturnTypeError,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiagnosticKind::LiteralError => write!(f, "literal"),
            DiagnosticKind::UnknownMethod => write!(f, "dispatch"),
            DiagnosticKind::ArgumentError => write!(f, "arguments"),
            DiagnosticKind::ContextError => write!(f, "context"),
            DiagnosticKind::ReturnTypeError => write!(f, "return"),
        }
    }
}

// ── Public API ────────────────────────────────────────────

/// Verify a parsed suite against the methods of one contract.
///
/// Does not stop at first error — reports everything found.
pub fn verify(suite: &TestSuite, table: &DispatchTable) -> VerificationResult {
    let mut result = VerificationResult::new();

    for (g, group) in suite.groups.iter().enumerate() {
        for (c, case) in group.cases.iter().enumerate() {
            verify_case(case, table, Location { group: g, case: c }, &mut result);
        }
    }

    tracing::debug!(
        errors = result.errors().len(),
        warnings = result.warnings().len(),
        "verified fixture"
    );
    result
}

/// Verify literal syntax only, for fixtures with no known target
pub fn verify_literals(suite: &TestSuite) -> VerificationResult {
    let mut result = VerificationResult::new();
    for (g, group) in suite.groups.iter().enumerate() {
        for (c, case) in group.cases.iter().enumerate() {
            let location = Location { group: g, case: c };
            decode_literals(case, location, &mut result);
        }
    }
    result
}

// ── Per-Case Checks ───────────────────────────────────────

/// Decoded literals of one case; `None` where decoding failed
struct Decoded {
    params: Option<Vec<Value>>,
    expected: Option<Option<Value>>,
}

fn verify_case(case: &TestCase, table: &DispatchTable, location: Location, result: &mut VerificationResult) {
    let decoded = decode_literals(case, location, result);

    let signature = match table.signature(&case.method) {
        Some(sig) => sig,
        None => {
            result.add_error(
                DiagnosticKind::UnknownMethod,
                format!("method '{}' is not registered", case.method),
                location,
            );
            return;
        }
    };

    if let Some(params) = &decoded.params {
        verify_arguments(&case.method, params, signature, location, result);
    }
    verify_context(case, signature, location, result);
    if let Some(Some(expected)) = &decoded.expected {
        verify_return(&case.method, expected, signature, location, result);
    }
}

fn decode_literals(case: &TestCase, location: Location, result: &mut VerificationResult) -> Decoded {
    let params = match case.params() {
        Ok(values) => Some(values),
        Err(e) => {
            result.add_error(DiagnosticKind::LiteralError, literal_message("param", &e), location);
            None
        }
    };
    let expected = match case.expectation() {
        Ok(value) => Some(value),
        Err(e) => {
            result.add_error(
                DiagnosticKind::LiteralError,
                literal_message("expected", &e),
                location,
            );
            None
        }
    };
    if let Err(e) = case.witnesses() {
        result.add_error(DiagnosticKind::LiteralError, literal_message("witness", &e), location);
    }
    Decoded { params, expected }
}

fn literal_message(field: &str, e: &Error) -> String {
    format!("'{}': {}", field, e)
}

fn verify_arguments(
    method: &str,
    params: &[Value],
    signature: &MethodSignature,
    location: Location,
    result: &mut VerificationResult,
) {
    if params.len() != signature.params.len() {
        result.add_error(
            DiagnosticKind::ArgumentError,
            format!(
                "'{}' takes {} argument(s), fixture passes {}",
                method,
                signature.params.len(),
                params.len()
            ),
            location,
        );
        return;
    }

    for (i, (value, declared)) in params.iter().zip(&signature.params).enumerate() {
        if value.param_type() != *declared {
            result.add_error(
                DiagnosticKind::ArgumentError,
                format!(
                    "argument {} of '{}' must be {}, fixture passes {}",
                    i + 1,
                    method,
                    declared,
                    value.param_type()
                ),
                location,
            );
        }
    }
}

fn verify_context(
    case: &TestCase,
    signature: &MethodSignature,
    location: Location,
    result: &mut VerificationResult,
) {
    match (signature.needs_context, case.need_context) {
        (true, false) => result.add_error(
            DiagnosticKind::ContextError,
            format!("'{}' requires context; set needContext", case.method),
            location,
        ),
        (false, true) => result.add_warning(
            DiagnosticKind::ContextError,
            format!("'{}' does not take context; it will be dropped", case.method),
            location,
        ),
        _ => {}
    }
}

fn verify_return(
    method: &str,
    expected: &Value,
    signature: &MethodSignature,
    location: Location,
    result: &mut VerificationResult,
) {
    match signature.returns {
        None => result.add_error(
            DiagnosticKind::ReturnTypeError,
            format!("'{}' returns nothing but expected is {}", method, expected),
            location,
        ),
        Some(declared) if declared != expected.param_type() => result.add_error(
            DiagnosticKind::ReturnTypeError,
            format!(
                "'{}' returns {}, expected literal is {}",
                method,
                declared,
                expected.param_type()
            ),
            location,
        ),
        Some(_) => {}
    }
}

// ── Tests ─────────────────────────────────────────────────
