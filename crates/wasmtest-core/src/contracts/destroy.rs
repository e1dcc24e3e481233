//! Storage overwrite followed by self-destruction

use super::ContractModule;
use crate::engine::{Abort, DispatchTable};
use crate::literal::{ParamType, Value};

const KEY: &[u8] = &[0x23];

const FIXTURE: &str = r#"
[
    [{"method":"put", "param":"string:V1"},
    {"method":"get", "expected":"string:V1"},
    {"method":"put", "param":"string:V2"},
    {"method":"get", "expected":"string:V2"},
    {"method":"destroy"}
    ]
]
"#;

pub(super) fn module() -> ContractModule {
    let table = DispatchTable::new()
        .method("put", &[ParamType::String], None, |host, args| {
            host.storage_put(KEY, args.string(0)?.as_bytes());
            Ok(None)
        })
        .method("get", &[], Some(ParamType::String), |host, _| {
            let raw = host
                .storage_get(KEY)
                .ok_or_else(|| Abort("not found".into()))?;
            let text = String::from_utf8(raw).map_err(|_| Abort("not utf-8".into()))?;
            Ok(Some(Value::String(text)))
        })
        .method("destroy", &[], None, |host, _| {
            host.destroy();
            Ok(None)
        });

    ContractModule {
        name: "test_destroy.wasm",
        table,
        fixture: Some(FIXTURE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::engine::memory::MemoryEngine;
    use crate::engine::{Call, ContractEngine};
    use crate::Error;

    #[test]
    fn test_overwrite_then_destroy() {
        let m = module();
        let mut engine = MemoryEngine::new(Address::ZERO);
        let addr = engine.deploy(m.name, m.table, None);

        for value in ["V1", "V2"] {
            engine
                .dispatch(&addr, Call::new("put", vec![Value::String(value.into())]))
                .unwrap();
        }
        assert_eq!(engine.store().get(&addr, KEY), Some(&b"V2".to_vec()));

        engine.dispatch(&addr, Call::new("destroy", vec![])).unwrap();
        assert_eq!(engine.store().get(&addr, KEY), None);
        assert_eq!(engine.store().key_count(&addr), 0);

        let err = engine.dispatch(&addr, Call::new("get", vec![])).unwrap_err();
        assert!(matches!(err, Error::ContractDestroyed(_)));
    }
}
