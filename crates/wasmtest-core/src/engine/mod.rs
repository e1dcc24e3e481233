//! Contract execution engine interface
//!
//! The runner talks to whatever executes contracts through
//! [`ContractEngine`]. Contracts registered with an engine see their
//! environment through [`Host`]. [`memory::MemoryEngine`] is the
//! in-process implementation used by the CLI and the tests.

pub mod memory;
pub mod table;

use std::collections::{BTreeMap, BTreeSet};

use crate::address::Address;
use crate::literal::Value;
use crate::Result;

pub use table::{Args, DispatchTable, MethodSignature};

// ── Call Types ────────────────────────────────────────────

/// Shared auxiliary data injected into methods that declare they need it
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Context {
    pub admin: Address,
    /// Symbolic name (e.g. `test_add.wasm`) to deployed address
    pub addresses: BTreeMap<String, Address>,
}

impl Context {
    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.addresses.get(name).copied()
    }
}

/// One named invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
    /// Trailing context capability, present only when requested
    pub context: Option<Context>,
}

impl Call {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Call {
            method: method.into(),
            args,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

/// Event emitted by a contract during a call
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Notification {
    pub contract: Address,
    pub states: Vec<Value>,
}

/// What came back from a dispatched call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallOutcome {
    /// Return value, `None` for methods returning nothing
    pub value: Option<Value>,
    /// Set when the method itself failed; side effects were discarded
    pub failure: Option<String>,
    pub notifications: Vec<Notification>,
}

impl CallOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        CallOutcome {
            failure: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Contract-level failure raised from inside a method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort(pub String);

impl std::fmt::Display for Abort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a method body
pub type CallResult = std::result::Result<Option<Value>, Abort>;

/// Abort with `message` unless `condition` holds
pub fn check(condition: bool, message: &str) -> std::result::Result<(), Abort> {
    if condition {
        Ok(())
    } else {
        Err(Abort(message.to_string()))
    }
}

// ── Engine & Host Seams ───────────────────────────────────

/// Operations the runner needs from a contract execution engine
pub trait ContractEngine {
    /// Install the signer set for the next dispatch
    fn set_witnesses(&mut self, witnesses: BTreeSet<Address>);

    /// Build the shared context (admin address and deployed name map)
    fn resolve_context(&mut self) -> Result<Context>;

    /// Declared signature of `method` on `target`, if registered
    fn signature(&self, target: &Address, method: &str) -> Option<MethodSignature>;

    /// Run one call against `target`.
    ///
    /// Harness-level problems (unknown method, bad arguments, destroyed
    /// contract) are `Err`. A failure raised by the method itself is
    /// `Ok` with [`CallOutcome::failure`] set.
    fn dispatch(&mut self, target: &Address, call: Call) -> Result<CallOutcome>;
}

/// Environment visible to a contract method while it runs
pub trait Host {
    fn self_address(&self) -> Address;
    fn caller_address(&self) -> Address;
    fn entry_address(&self) -> Address;
    fn block_height(&self) -> u32;
    fn timestamp(&self) -> u64;
    fn check_witness(&self, address: &Address) -> bool;

    fn storage_get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn storage_put(&mut self, key: &[u8], value: &[u8]);
    fn storage_delete(&mut self, key: &[u8]);

    fn notify(&mut self, states: Vec<Value>);

    /// Invoke another deployed contract; its failure aborts this call too
    fn call_contract(&mut self, target: &Address, method: &str, args: Vec<Value>) -> CallResult;

    /// Remove this contract and all of its storage
    fn destroy(&mut self);
}
