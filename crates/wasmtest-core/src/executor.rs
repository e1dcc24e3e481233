//! Invocation executor — runs fixture cases against a contract engine
//!
//! Each test case moves through a fixed sequence of phases:
//!
//! ```text
//! Pending → EnvSetup → ContextBuild (optional) → Dispatch → ResultCheck → Pass | Fail
//! ```
//!
//! 1. **EnvSetup** installs the case's witness set for exactly one call
//! 2. **ContextBuild** hands over the group's shared context, resolving it
//!    from the engine the first time a case in the group asks for it
//! 3. **Dispatch** decodes `param` and invokes the method by name
//! 4. **ResultCheck** fails on an internal assertion failure, then
//!    compares the return value with `expected` and notifications with
//!    `notify`
//!
//! Errors raised in any phase fail only the case they belong to. Groups
//! and suites always run to completion; the outcome of every case is
//! collected in a [`SuiteReport`].

use std::collections::BTreeSet;

use crate::address::Address;
use crate::engine::memory::MemoryEngine;
use crate::engine::{Call, ContractEngine, Context};
use crate::literal::Value;
use crate::parser::ast::{TestCase, TestGroup, TestSuite};
use crate::{Error, Result};

// ── Phases & Outcomes ─────────────────────────────────────

/// Position of a case in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    EnvSetup,
    ContextBuild,
    Dispatch,
    ResultCheck,
    Pass,
    Fail,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Pending => "pending",
            Phase::EnvSetup => "env_setup",
            Phase::ContextBuild => "context_build",
            Phase::Dispatch => "dispatch",
            Phase::ResultCheck => "result_check",
            Phase::Pass => "pass",
            Phase::Fail => "fail",
        };
        write!(f, "{}", name)
    }
}

/// Why a case failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedLiteralType,
    LiteralDecode,
    DispatchNotFound,
    ArgumentMismatch,
    InternalAssertionFailure,
    ExpectationMismatch,
    ContractDestroyed,
    /// Any other engine-reported error
    Engine,
}

impl From<&Error> for FailureKind {
    fn from(e: &Error) -> Self {
        match e {
            Error::UnsupportedLiteralType { .. } => FailureKind::UnsupportedLiteralType,
            Error::LiteralDecode { .. } => FailureKind::LiteralDecode,
            Error::DispatchNotFound { .. } => FailureKind::DispatchNotFound,
            Error::ArgumentMismatch { .. } => FailureKind::ArgumentMismatch,
            Error::InternalAssertionFailure(_) => FailureKind::InternalAssertionFailure,
            Error::ExpectationMismatch { .. } => FailureKind::ExpectationMismatch,
            Error::ContractDestroyed(_) => FailureKind::ContractDestroyed,
            _ => FailureKind::Engine,
        }
    }
}

/// Details of a failed case
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaseFailure {
    pub kind: FailureKind,
    /// Phase the case was in when it failed
    pub phase: Phase,
    pub message: String,
}

/// Final verdict for one case
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    Pass,
    Fail(CaseFailure),
}

impl CaseOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, CaseOutcome::Pass)
    }

    pub fn failure(&self) -> Option<&CaseFailure> {
        match self {
            CaseOutcome::Pass => None,
            CaseOutcome::Fail(f) => Some(f),
        }
    }
}

// ── Reports ───────────────────────────────────────────────

/// Result of one case
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaseReport {
    /// 0-indexed position in the group
    pub index: usize,
    pub method: String,
    pub outcome: CaseOutcome,
    /// Value the method returned, when dispatch got that far
    pub returned: Option<Value>,
}

/// Result of one group
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroupReport {
    /// 0-indexed position in the suite
    pub index: usize,
    pub cases: Vec<CaseReport>,
}

impl GroupReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }
}

/// Result of running a whole suite against one target
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SuiteReport {
    pub target: Address,
    pub groups: Vec<GroupReport>,
    pub passed: usize,
    pub failed: usize,
}

impl SuiteReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    /// Every failed case with its group index
    pub fn failures(&self) -> Vec<(usize, &CaseReport)> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.cases
                    .iter()
                    .filter(|c| !c.outcome.is_pass())
                    .map(move |c| (g.index, c))
            })
            .collect()
    }
}

// ── Runner ────────────────────────────────────────────────

/// Knobs for a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Add the admin address to every case's witness set
    pub admin_always_signs: bool,
    /// Run only these group indexes; `None` runs all
    pub groups: Option<Vec<usize>>,
}

/// Executes suites sequentially, in document order
#[derive(Debug, Clone, Default)]
pub struct Runner {
    options: RunOptions,
}

/// Per-case bookkeeping while the state machine runs
struct CaseRun {
    phase: Phase,
    returned: Option<Value>,
}

impl CaseRun {
    fn enter(&mut self, phase: Phase) {
        tracing::trace!(from = %self.phase, to = %phase, "case phase");
        self.phase = phase;
    }
}

impl Runner {
    pub fn new(options: RunOptions) -> Self {
        Runner { options }
    }

    /// Run every selected group of `suite` against `target`
    pub fn run_suite(
        &self,
        engine: &mut dyn ContractEngine,
        target: &Address,
        suite: &TestSuite,
    ) -> SuiteReport {
        tracing::info!(%target, groups = suite.groups.len(), "running suite");

        let groups: Vec<GroupReport> = suite
            .groups
            .iter()
            .enumerate()
            .filter(|(i, _)| self.selects(*i))
            .map(|(i, group)| self.run_group(engine, target, i, group))
            .collect();

        let passed = groups.iter().map(GroupReport::passed).sum();
        let failed = groups.iter().map(GroupReport::failed).sum();
        tracing::info!(%target, passed, failed, "suite finished");

        SuiteReport {
            target: *target,
            groups,
            passed,
            failed,
        }
    }

    /// Run the fixture a deployed reference contract carries about itself
    pub fn run_embedded(&self, engine: &mut MemoryEngine, name: &str) -> Result<SuiteReport> {
        let target = engine
            .address_of(name)
            .ok_or_else(|| Error::Config(format!("contract '{}' is not deployed", name)))?;
        let fixture = engine
            .embedded_fixture(&target)
            .ok_or_else(|| Error::FixtureFormat(format!("contract '{}' carries no fixture", name)))?
            .to_string();
        let suite = crate::parser::parse_suite(&fixture)?;
        Ok(self.run_suite(engine, &target, &suite))
    }

    fn selects(&self, group: usize) -> bool {
        match &self.options.groups {
            Some(wanted) => wanted.contains(&group),
            None => true,
        }
    }

    /// Run one group; its context is resolved at most once
    pub fn run_group(
        &self,
        engine: &mut dyn ContractEngine,
        target: &Address,
        index: usize,
        group: &TestGroup,
    ) -> GroupReport {
        tracing::debug!(group = index, cases = group.cases.len(), "running group");
        let mut context = None;
        let cases = group
            .cases
            .iter()
            .enumerate()
            .map(|(i, case)| {
                let report = self.run_case(engine, target, case, &mut context, i);
                if let Some(failure) = report.outcome.failure() {
                    tracing::warn!(
                        group = index,
                        case = i,
                        method = %case.method,
                        phase = %failure.phase,
                        "case failed: {}",
                        failure.message
                    );
                }
                report
            })
            .collect();
        GroupReport { index, cases }
    }

    /// Run one case to a verdict
    pub fn run_case(
        &self,
        engine: &mut dyn ContractEngine,
        target: &Address,
        case: &TestCase,
        group_context: &mut Option<Context>,
        index: usize,
    ) -> CaseReport {
        let mut run = CaseRun {
            phase: Phase::Pending,
            returned: None,
        };

        let outcome = match self.drive(&mut run, engine, target, case, group_context) {
            Ok(()) => {
                run.enter(Phase::Pass);
                CaseOutcome::Pass
            }
            Err(e) => {
                let failure = CaseFailure {
                    kind: FailureKind::from(&e),
                    phase: run.phase,
                    message: e.to_string(),
                };
                run.enter(Phase::Fail);
                CaseOutcome::Fail(failure)
            }
        };

        CaseReport {
            index,
            method: case.method.clone(),
            outcome,
            returned: run.returned,
        }
    }

    fn drive(
        &self,
        run: &mut CaseRun,
        engine: &mut dyn ContractEngine,
        target: &Address,
        case: &TestCase,
        group_context: &mut Option<Context>,
    ) -> Result<()> {
        // ── EnvSetup ───────────────────────────────────
        run.enter(Phase::EnvSetup);
        let mut witnesses: BTreeSet<Address> = case.witnesses()?.into_iter().collect();
        if self.options.admin_always_signs {
            witnesses.insert(shared_context(engine, group_context)?.admin);
        }
        engine.set_witnesses(witnesses);

        // ── ContextBuild ───────────────────────────────
        let context = if case.need_context {
            run.enter(Phase::ContextBuild);
            Some(shared_context(engine, group_context)?)
        } else {
            None
        };

        // ── Dispatch ───────────────────────────────────
        run.enter(Phase::Dispatch);
        let mut call = Call::new(case.method.clone(), case.params()?);
        if let Some(ctx) = context {
            call = call.with_context(ctx);
        }
        let outcome = engine.dispatch(target, call)?;
        run.returned = outcome.value.clone();

        // ── ResultCheck ────────────────────────────────
        run.enter(Phase::ResultCheck);
        if let Some(message) = outcome.failure {
            return Err(Error::InternalAssertionFailure(message));
        }

        if let Some(expected) = case.expectation()? {
            if outcome.value.as_ref() != Some(&expected) {
                return Err(Error::ExpectationMismatch {
                    expected: expected.encode(),
                    actual: outcome
                        .value
                        .as_ref()
                        .map(Value::encode)
                        .unwrap_or_else(|| "no return value".into()),
                });
            }
        }

        if !case.notify.is_empty() {
            let emitted = serde_json::to_string(&outcome.notifications)
                .map_err(|e| Error::InternalAssertionFailure(e.to_string()))?;
            if !emitted.contains(&case.notify) {
                return Err(Error::ExpectationMismatch {
                    expected: format!("notifications containing '{}'", case.notify),
                    actual: emitted,
                });
            }
        }

        Ok(())
    }
}

/// The group's context, resolved on first request
fn shared_context(
    engine: &mut dyn ContractEngine,
    cache: &mut Option<Context>,
) -> Result<Context> {
    if let Some(ctx) = cache {
        return Ok(ctx.clone());
    }
    let ctx = engine.resolve_context()?;
    tracing::debug!(admin = %ctx.admin, contracts = ctx.addresses.len(), "resolved context");
    *cache = Some(ctx.clone());
    Ok(ctx)
}

// ── Tests ─────────────────────────────────────────────────
