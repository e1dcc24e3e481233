//! Runtime introspection, witness checks and storage

use super::ContractModule;
use crate::engine::{check, DispatchTable, Host};
use crate::literal::{ParamType, Value};

// Expectations assume the default admin and block environment: every
// committed call before `timestamp` and `block_height` advances both by one.
const FIXTURE: &str = r#"
[
    [{"env":{"witness":[]}, "method":"self_address", "param":"", "expected":"address:ALqunsc8Vju2qs8GQdX6Wi3nK3uD9WibTh"},
    {"env":{"witness":[]}, "method":"entry_address", "param":"", "expected":"address:ALqunsc8Vju2qs8GQdX6Wi3nK3uD9WibTh"},
    {"env":{"witness":[]}, "method":"caller_address", "param":"", "expected":"address:AFmseVrdL9f9oyCzZefL9tG6UbvhPbdYzM"},
    {"env":{"witness":[]}, "method":"timestamp", "param":"", "expected":"int:1530316803"},
    {"env":{"witness":["AUaJb9oLGfZzaVZM6pdKZrKa8HfDiQ193J"]}, "needContext":true, "method":"check_witness", "expected":"int:1"},
    {"needContext":true, "method":"check_witness", "expected":"int:0"},
    {"env":{"witness":[]}, "method":"block_height", "param":"", "expected":"int:7"},
    {"env":{"witness":[]}, "method":"testStorage", "param":"int:1,string:hello world", "expected":"string:hello world"},
    {"method":"testStorage", "param":"int:1,string:hello world", "expected":"string:hello world"},
    {"method":"emit", "param":"string:hello", "notify":"hello"}
    ]
]
"#;

pub(super) fn module() -> ContractModule {
    use ParamType::{Address, Int, String};

    let table = DispatchTable::new()
        .method("timestamp", &[], Some(Int), |host, _| {
            Ok(Some(Value::Int(host.timestamp() as i128)))
        })
        .method("block_height", &[], Some(Int), |host, _| {
            Ok(Some(Value::Int(host.block_height() as i128)))
        })
        .method("self_address", &[], Some(Address), |host, _| {
            Ok(Some(Value::Address(host.self_address())))
        })
        .method("caller_address", &[], Some(Address), |host, _| {
            Ok(Some(Value::Address(host.caller_address())))
        })
        .method("entry_address", &[], Some(Address), |host, _| {
            Ok(Some(Value::Address(host.entry_address())))
        })
        .method_with_context("check_witness", &[], Some(Int), |host, args| {
            let admin = args.context()?.admin;
            Ok(Some(Value::Int(host.check_witness(&admin) as i128)))
        })
        .method("testStorage", &[Int, String], Some(String), |host, args| {
            test_storage(host, args.int(0)?, args.string(1)?)
        })
        .method("emit", &[String], None, |host, args| {
            host.notify(vec![Value::String(args.string(0)?.to_string())]);
            Ok(None)
        });

    ContractModule {
        name: "test_runtime.wasm",
        table,
        fixture: Some(FIXTURE),
    }
}

/// Storage key for an integer index
fn make_key(index: i128) -> Vec<u8> {
    index.to_le_bytes().to_vec()
}

/// Put, read back, delete, confirm gone; returns what was read
fn test_storage(host: &mut dyn Host, index: i128, s: &str) -> crate::engine::CallResult {
    let key = make_key(index);
    host.storage_put(&key, s.as_bytes());
    let stored = host.storage_get(&key);
    check(stored.is_some(), "get failed")?;
    let res = std::string::String::from_utf8(stored.unwrap_or_default())
        .map_err(|_| crate::engine::Abort("stored value is not utf-8".into()))?;
    check(res == s, "string put failed")?;
    host.storage_delete(&key);
    check(host.storage_get(&key).is_none(), "delete failed")?;
    Ok(Some(Value::String(res)))
}
