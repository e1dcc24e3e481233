//! Reference contracts
//!
//! Small contracts registered as dispatch tables, each exercising one
//! host capability. Every contract carries the fixture that tests it,
//! the way deployed test contracts export a `testcase` document.

mod arith;
mod cross_call;
mod destroy;
mod runtime;

use crate::address::Address;
use crate::engine::memory::MemoryEngine;
use crate::engine::DispatchTable;

/// A contract ready to deploy: symbolic name, methods, embedded fixture
pub struct ContractModule {
    pub name: &'static str,
    pub table: DispatchTable,
    pub fixture: Option<&'static str>,
}

/// All reference contracts, in deployment order
pub fn builtin() -> Vec<ContractModule> {
    vec![
        arith::module(),
        runtime::module(),
        destroy::module(),
        cross_call::module(),
    ]
}

/// Names of the reference contracts
pub fn names() -> Vec<&'static str> {
    builtin().iter().map(|m| m.name).collect()
}

/// Look up one reference contract by name (with or without `.wasm`)
pub fn find(name: &str) -> Option<ContractModule> {
    builtin()
        .into_iter()
        .find(|m| m.name == name || m.name.strip_suffix(".wasm") == Some(name))
}

/// Deploy every reference contract, returning name and address pairs
pub fn deploy_all(engine: &mut MemoryEngine) -> Vec<(&'static str, Address)> {
    builtin()
        .into_iter()
        .map(|m| {
            let fixture = m.fixture.map(str::to_string);
            (m.name, engine.deploy(m.name, m.table, fixture))
        })
        .collect()
}
