//! Cross-contract calls resolved through the injected context

use super::ContractModule;
use crate::engine::{check, Abort, DispatchTable};
use crate::literal::{ParamType, Value};

const ADD_CONTRACT: &str = "test_add.wasm";

const FIXTURE: &str = r#"
[
    [{"needContext":true, "method":"call_add", "param":"int:1,int:2", "expected":"int:3"},
    {"needContext":true, "method":"call_add", "param":"int:-1,int:1", "expected":"int:0"},
    {"needContext":true, "method":"caller_of_callee", "expected":"bool:true"}
    ]
]
"#;

pub(super) fn module() -> ContractModule {
    use ParamType::{Bool, Int};

    let table = DispatchTable::new()
        .method_with_context("call_add", &[Int, Int], Some(Int), |host, args| {
            let target = args
                .context()?
                .address_of(ADD_CONTRACT)
                .ok_or_else(|| Abort(format!("{} not deployed", ADD_CONTRACT)))?;
            let sum = host.call_contract(
                &target,
                "add",
                vec![Value::Int(args.int(0)?), Value::Int(args.int(1)?)],
            )?;
            check(sum.is_some(), "add returned nothing")?;
            Ok(sum)
        })
        .method_with_context("caller_of_callee", &[], Some(Bool), |host, args| {
            let runtime = args
                .context()?
                .address_of("test_runtime.wasm")
                .ok_or_else(|| Abort("test_runtime.wasm not deployed".into()))?;
            let seen = host.call_contract(&runtime, "caller_address", vec![])?;
            Ok(Some(Value::Bool(
                seen == Some(Value::Address(host.self_address())),
            )))
        });

    ContractModule {
        name: "test_call.wasm",
        table,
        fixture: Some(FIXTURE),
    }
}
