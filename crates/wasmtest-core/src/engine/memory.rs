//! In-memory contract host
//!
//! Hosts contracts registered as dispatch tables. Owns the store handle,
//! the witness set, the admin address and the current block environment.
//! Every top-level dispatch runs against a snapshot: if the method fails,
//! storage writes and destructions made during the call are discarded.
//! Nested calls are limited to [`MAX_CALL_DEPTH`] frames.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{
    Abort, Call, CallOutcome, CallResult, ContractEngine, Context, DispatchTable, Host,
    MethodSignature, Notification,
};
use crate::address::Address;
use crate::literal::Value;
use crate::{Error, Result};

/// Genesis block timestamp used when nothing else is configured
pub const DEFAULT_TIMESTAMP: u64 = 1_530_316_800;

/// Deepest nesting of contract frames, the top-level call included
pub const MAX_CALL_DEPTH: usize = 1024;

// ── Store ─────────────────────────────────────────────────

/// Key-value storage partitioned by contract address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    entries: BTreeMap<(Address, Vec<u8>), Vec<u8>>,
}

impl Store {
    pub fn get(&self, contract: &Address, key: &[u8]) -> Option<&Vec<u8>> {
        self.entries.get(&(*contract, key.to_vec()))
    }

    pub fn put(&mut self, contract: &Address, key: &[u8], value: &[u8]) {
        self.entries.insert((*contract, key.to_vec()), value.to_vec());
    }

    pub fn delete(&mut self, contract: &Address, key: &[u8]) {
        self.entries.remove(&(*contract, key.to_vec()));
    }

    /// Remove every key belonging to `contract`
    pub fn clear_contract(&mut self, contract: &Address) {
        self.entries.retain(|(owner, _), _| owner != contract);
    }

    /// Number of keys stored for `contract`
    pub fn key_count(&self, contract: &Address) -> usize {
        self.entries
            .keys()
            .filter(|(owner, _)| owner == contract)
            .count()
    }
}

/// Block being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlockEnv {
    pub height: u32,
    pub timestamp: u64,
}

impl Default for BlockEnv {
    fn default() -> Self {
        BlockEnv {
            height: 1,
            timestamp: DEFAULT_TIMESTAMP,
        }
    }
}

struct Deployed {
    name: String,
    table: Arc<DispatchTable>,
    fixture: Option<String>,
}

// ── Engine ────────────────────────────────────────────────

/// In-process engine hosting dispatch-table contracts
pub struct MemoryEngine {
    contracts: BTreeMap<Address, Deployed>,
    destroyed: BTreeSet<Address>,
    store: Store,
    witnesses: BTreeSet<Address>,
    admin: Address,
    block: BlockEnv,
    pending: Vec<Notification>,
}

impl MemoryEngine {
    pub fn new(admin: Address) -> Self {
        MemoryEngine {
            contracts: BTreeMap::new(),
            destroyed: BTreeSet::new(),
            store: Store::default(),
            witnesses: BTreeSet::new(),
            admin,
            block: BlockEnv::default(),
            pending: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: BlockEnv) -> Self {
        self.block = block;
        self
    }

    /// Deploy a contract under a symbolic name.
    ///
    /// The address is derived from the name, so deploying the same name
    /// twice replaces the earlier contract at the same address.
    pub fn deploy(
        &mut self,
        name: &str,
        table: DispatchTable,
        fixture: Option<String>,
    ) -> Address {
        let address = Address::from_code(name.as_bytes());
        tracing::debug!(contract = name, %address, methods = table.len(), "deployed");
        self.destroyed.remove(&address);
        self.contracts.insert(
            address,
            Deployed {
                name: name.to_string(),
                table: Arc::new(table),
                fixture,
            },
        );
        address
    }

    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.contracts
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(addr, _)| *addr)
    }

    /// Fixture document a deployed contract carries about itself
    pub fn embedded_fixture(&self, address: &Address) -> Option<&str> {
        self.contracts.get(address)?.fixture.as_deref()
    }

    pub fn is_destroyed(&self, address: &Address) -> bool {
        self.destroyed.contains(address)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn block(&self) -> BlockEnv {
        self.block
    }

    fn invoke(
        &mut self,
        target: &Address,
        caller: Address,
        entry: Address,
        call: Call,
        depth: usize,
    ) -> Result<CallResult> {
        if self.destroyed.contains(target) {
            return Err(Error::ContractDestroyed(target.to_base58()));
        }
        let table = match self.contracts.get(target) {
            Some(deployed) => Arc::clone(&deployed.table),
            None => {
                return Err(Error::DispatchNotFound {
                    method: format!("{} (no contract at {})", call.method, target),
                });
            }
        };
        let mut frame = Frame {
            engine: self,
            this: *target,
            caller,
            entry,
            depth,
        };
        table.invoke(&mut frame, call)
    }

    #[cfg(test)]
    pub(crate) fn detached_host(&mut self) -> Frame<'_> {
        Frame {
            engine: self,
            this: Address::ZERO,
            caller: Address::ZERO,
            entry: Address::ZERO,
            depth: 1,
        }
    }
}

impl ContractEngine for MemoryEngine {
    fn set_witnesses(&mut self, witnesses: BTreeSet<Address>) {
        self.witnesses = witnesses;
    }

    fn resolve_context(&mut self) -> Result<Context> {
        let addresses = self
            .contracts
            .iter()
            .filter(|(addr, _)| !self.destroyed.contains(*addr))
            .map(|(addr, c)| (c.name.clone(), *addr))
            .collect();
        Ok(Context {
            admin: self.admin,
            addresses,
        })
    }

    fn signature(&self, target: &Address, method: &str) -> Option<MethodSignature> {
        self.contracts.get(target)?.table.signature(method).cloned()
    }

    fn dispatch(&mut self, target: &Address, call: Call) -> Result<CallOutcome> {
        let snapshot = (self.store.clone(), self.destroyed.clone());
        self.pending.clear();
        let method = call.method.clone();

        let result = self.invoke(target, Address::ZERO, *target, call, 1);
        let notifications = std::mem::take(&mut self.pending);

        match result {
            Ok(Ok(value)) => {
                let next = self
                    .block
                    .height
                    .checked_add(1)
                    .zip(self.block.timestamp.checked_add(1));
                let Some((height, timestamp)) = next else {
                    (self.store, self.destroyed) = snapshot;
                    return Err(Error::Config(format!(
                        "block environment exhausted at height {} timestamp {}",
                        self.block.height, self.block.timestamp
                    )));
                };
                self.block = BlockEnv { height, timestamp };
                Ok(CallOutcome {
                    value,
                    failure: None,
                    notifications,
                })
            }
            Ok(Err(Abort(message))) => {
                tracing::debug!(%method, %message, "call aborted, rolling back");
                (self.store, self.destroyed) = snapshot;
                Ok(CallOutcome::failed(message))
            }
            Err(e) => {
                (self.store, self.destroyed) = snapshot;
                Err(e)
            }
        }
    }
}

// ── Host Frame ────────────────────────────────────────────

/// Host view for one executing contract
pub struct Frame<'a> {
    engine: &'a mut MemoryEngine,
    this: Address,
    caller: Address,
    entry: Address,
    /// 1 for the top-level call
    depth: usize,
}

impl Frame<'_> {
    fn is_destroyed(&self) -> bool {
        self.engine.destroyed.contains(&self.this)
    }
}

impl Host for Frame<'_> {
    fn self_address(&self) -> Address {
        self.this
    }

    fn caller_address(&self) -> Address {
        self.caller
    }

    fn entry_address(&self) -> Address {
        self.entry
    }

    fn block_height(&self) -> u32 {
        self.engine.block.height
    }

    fn timestamp(&self) -> u64 {
        self.engine.block.timestamp
    }

    fn check_witness(&self, address: &Address) -> bool {
        // a calling contract authorizes its callee
        self.engine.witnesses.contains(address)
            || (self.caller != Address::ZERO && *address == self.caller)
    }

    fn storage_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.engine.store.get(&self.this, key).cloned()
    }

    // a destroyed contract keeps no storage, even later in the same call
    fn storage_put(&mut self, key: &[u8], value: &[u8]) {
        if !self.is_destroyed() {
            self.engine.store.put(&self.this, key, value);
        }
    }

    fn storage_delete(&mut self, key: &[u8]) {
        if !self.is_destroyed() {
            self.engine.store.delete(&self.this, key);
        }
    }

    fn notify(&mut self, states: Vec<Value>) {
        self.engine.pending.push(Notification {
            contract: self.this,
            states,
        });
    }

    fn call_contract(&mut self, target: &Address, method: &str, args: Vec<Value>) -> CallResult {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Abort(format!(
                "call stack depth exceeded ({} frames)",
                MAX_CALL_DEPTH
            )));
        }
        let call = Call::new(method, args);
        match self
            .engine
            .invoke(target, self.this, self.entry, call, self.depth + 1)
        {
            Ok(result) => result,
            Err(e) => Err(Abort(e.to_string())),
        }
    }

    fn destroy(&mut self) {
        tracing::debug!(contract = %self.this, "destroying contract");
        self.engine.store.clear_contract(&self.this);
        self.engine.destroyed.insert(self.this);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::check;
    use crate::literal::ParamType;

    fn counter() -> DispatchTable {
        DispatchTable::new()
            .method("bump", &[], Some(ParamType::Int), |host, _| {
                let next = host
                    .storage_get(b"n")
                    .map(|v| v[0] as i128 + 1)
                    .unwrap_or(1);
                host.storage_put(b"n", &[next as u8]);
                host.notify(vec![Value::Int(next)]);
                Ok(Some(Value::Int(next)))
            })
            .method("bump_then_fail", &[], None, |host, _| {
                host.storage_put(b"n", &[99]);
                check(false, "boom")?;
                Ok(None)
            })
            .method("destroy", &[], None, |host, _| {
                host.destroy();
                Ok(None)
            })
            .method("destroy_then_put", &[], None, |host, _| {
                host.destroy();
                host.storage_put(b"n", &[7]);
                host.storage_put(b"m", &[8]);
                host.storage_delete(b"n");
                Ok(None)
            })
            .method("whoami", &[], Some(ParamType::Address), |host, _| {
                Ok(Some(Value::Address(host.caller_address())))
            })
    }

    fn proxy() -> DispatchTable {
        DispatchTable::new().method(
            "forward",
            &[ParamType::Address, ParamType::String],
            None,
            |host, args| {
                host.call_contract(&args.address(0)?, args.string(1)?, vec![])
            },
        )
    }

    /// `nest(n)` calls itself `n` more times and returns the frame count
    fn nesting() -> DispatchTable {
        DispatchTable::new().method(
            "nest",
            &[ParamType::Int],
            Some(ParamType::Int),
            |host, args| {
                let n = args.int(0)?;
                if n == 0 {
                    return Ok(Some(Value::Int(1)));
                }
                let me = host.self_address();
                let inner = host.call_contract(&me, "nest", vec![Value::Int(n - 1)])?;
                let frames = inner.and_then(|v| v.as_int()).unwrap_or(0);
                Ok(Some(Value::Int(frames + 1)))
            },
        )
    }

    fn engine() -> (MemoryEngine, Address) {
        let mut engine = MemoryEngine::new(Address::from_code(b"admin"));
        let addr = engine.deploy("counter.wasm", counter(), None);
        (engine, addr)
    }

    #[test]
    fn test_dispatch_commits_and_advances_block() {
        let (mut engine, addr) = engine();
        let before = engine.block();
        let out = engine.dispatch(&addr, Call::new("bump", vec![])).unwrap();
        assert_eq!(out.value, Some(Value::Int(1)));
        assert_eq!(out.notifications.len(), 1);
        assert_eq!(engine.block().height, before.height + 1);

        let out = engine.dispatch(&addr, Call::new("bump", vec![])).unwrap();
        assert_eq!(out.value, Some(Value::Int(2)));
    }

    #[test]
    fn test_failed_call_rolls_back() {
        let (mut engine, addr) = engine();
        engine.dispatch(&addr, Call::new("bump", vec![])).unwrap();
        let out = engine
            .dispatch(&addr, Call::new("bump_then_fail", vec![]))
            .unwrap();
        assert_eq!(out.failure.as_deref(), Some("boom"));
        assert_eq!(engine.store().get(&addr, b"n"), Some(&vec![1u8]));
    }

    #[test]
    fn test_destroy_clears_storage_and_blocks_calls() {
        let (mut engine, addr) = engine();
        engine.dispatch(&addr, Call::new("bump", vec![])).unwrap();
        assert_eq!(engine.store().key_count(&addr), 1);

        engine.dispatch(&addr, Call::new("destroy", vec![])).unwrap();
        assert!(engine.is_destroyed(&addr));
        assert_eq!(engine.store().key_count(&addr), 0);

        let err = engine.dispatch(&addr, Call::new("bump", vec![])).unwrap_err();
        assert!(matches!(err, Error::ContractDestroyed(_)));
        assert_eq!(engine.store().key_count(&addr), 0);
    }

    #[test]
    fn test_storage_writes_after_destroy_are_dropped() {
        let (mut engine, addr) = engine();
        engine.dispatch(&addr, Call::new("bump", vec![])).unwrap();

        let out = engine
            .dispatch(&addr, Call::new("destroy_then_put", vec![]))
            .unwrap();
        assert!(out.failure.is_none());
        assert!(engine.is_destroyed(&addr));
        assert_eq!(engine.store().key_count(&addr), 0);
    }

    #[test]
    fn test_block_overflow_is_an_error_not_a_panic() {
        let mut engine = MemoryEngine::new(Address::from_code(b"admin")).with_block(BlockEnv {
            height: u32::MAX,
            timestamp: 5,
        });
        let addr = engine.deploy("counter.wasm", counter(), None);

        let err = engine.dispatch(&addr, Call::new("bump", vec![])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(engine.store().key_count(&addr), 0);
        assert_eq!(
            engine.block(),
            BlockEnv {
                height: u32::MAX,
                timestamp: 5
            }
        );

        let mut engine = MemoryEngine::new(Address::from_code(b"admin")).with_block(BlockEnv {
            height: 1,
            timestamp: u64::MAX,
        });
        let addr = engine.deploy("counter.wasm", counter(), None);
        assert!(engine.dispatch(&addr, Call::new("bump", vec![])).is_err());
    }

    #[test]
    fn test_call_depth_limit() {
        // debug builds need more than the default test-thread stack
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let mut engine = MemoryEngine::new(Address::from_code(b"admin"));
                let addr = engine.deploy("nest.wasm", nesting(), None);
                let deepest = MAX_CALL_DEPTH as i128 - 1;

                let out = engine
                    .dispatch(&addr, Call::new("nest", vec![Value::Int(deepest)]))
                    .unwrap();
                assert_eq!(out.value, Some(Value::Int(MAX_CALL_DEPTH as i128)));

                let out = engine
                    .dispatch(&addr, Call::new("nest", vec![Value::Int(deepest + 1)]))
                    .unwrap();
                let message = out.failure.unwrap();
                assert!(message.contains("call stack depth exceeded"), "{}", message);
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_cross_contract_call_sets_caller() {
        let (mut engine, counter_addr) = engine();
        let proxy_addr = engine.deploy("proxy.wasm", proxy(), None);
        let out = engine
            .dispatch(
                &proxy_addr,
                Call::new(
                    "forward",
                    vec![Value::Address(counter_addr), Value::String("whoami".into())],
                ),
            )
            .unwrap();
        assert_eq!(out.value, Some(Value::Address(proxy_addr)));
    }

    #[test]
    fn test_nested_failure_aborts_caller() {
        let (mut engine, counter_addr) = engine();
        let proxy_addr = engine.deploy("proxy.wasm", proxy(), None);
        let out = engine
            .dispatch(
                &proxy_addr,
                Call::new(
                    "forward",
                    vec![
                        Value::Address(counter_addr),
                        Value::String("bump_then_fail".into()),
                    ],
                ),
            )
            .unwrap();
        assert_eq!(out.failure.as_deref(), Some("boom"));
        assert_eq!(engine.store().get(&counter_addr, b"n"), None);
    }

    #[test]
    fn test_witnesses_replace_previous_set() {
        let (mut engine, _) = engine();
        let a = Address::from_code(b"a");
        let b = Address::from_code(b"b");
        engine.set_witnesses(BTreeSet::from([a]));
        engine.set_witnesses(BTreeSet::from([b]));
        let host = engine.detached_host();
        assert!(!host.check_witness(&a));
        assert!(host.check_witness(&b));
    }

    #[test]
    fn test_resolve_context_lists_deployed() {
        let (mut engine, addr) = engine();
        let ctx = engine.resolve_context().unwrap();
        assert_eq!(ctx.admin, Address::from_code(b"admin"));
        assert_eq!(ctx.address_of("counter.wasm"), Some(addr));
    }

    #[test]
    fn test_unknown_target() {
        let (mut engine, _) = engine();
        let err = engine
            .dispatch(&Address::from_code(b"nowhere"), Call::new("bump", vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::DispatchNotFound { .. }));
    }
}
