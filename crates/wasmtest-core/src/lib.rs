//! wasmtest core - contract fixture runner
//!
//! Parses JSON fixture documents, decodes their typed literals, and runs
//! every case against a contract execution engine.
//!
//! # Architecture
//!
//! ```text
//! Fixture JSON → Parser → TestSuite → Normalizer → Canonical Form + Hash
//!                             ↓
//!                          Verifier → Literal, Arity, Type and Context Checks
//!                             ↓
//!                          Executor → ContractEngine (MemoryEngine) → SuiteReport
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: Same fixture and engine state produce the same report
//! - **Isolated**: A failing case never aborts its group or suite
//! - **Sequential**: Groups and cases run in document order
//! - **Canonical**: One normalized form per fixture

pub mod address;
pub mod config;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod executor;
pub mod literal;
pub mod normalizer;
pub mod parser;
pub mod verifier;

pub use address::Address;
pub use config::RunnerConfig;
pub use error::{Error, Result};
pub use executor::{CaseOutcome, Runner, SuiteReport};
pub use literal::{ParamType, Value};
pub use parser::ast::{TestCase, TestEnv, TestGroup, TestSuite};
