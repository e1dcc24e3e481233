//! Integer arithmetic

use super::ContractModule;
use crate::engine::{Abort, DispatchTable};
use crate::literal::{ParamType, Value};

const FIXTURE: &str = r#"
[
    [{"env":{"witness":[]}, "method":"add", "param":"int:1, int:2", "expected":"int:3"},
    {"method":"add", "param":"int:-5,int:2", "expected":"int:-3"},
    {"method":"sub", "param":"int:10,int:4", "expected":"int:6"},
    {"method":"mul", "param":"int:-3,int:7", "expected":"int:-21"}
    ]
]
"#;

pub(super) fn module() -> ContractModule {
    use ParamType::Int;

    let table = DispatchTable::new()
        .method("add", &[Int, Int], Some(Int), |_, args| {
            arith(args.int(0)?.checked_add(args.int(1)?))
        })
        .method("sub", &[Int, Int], Some(Int), |_, args| {
            arith(args.int(0)?.checked_sub(args.int(1)?))
        })
        .method("mul", &[Int, Int], Some(Int), |_, args| {
            arith(args.int(0)?.checked_mul(args.int(1)?))
        });

    ContractModule {
        name: "test_add.wasm",
        table,
        fixture: Some(FIXTURE),
    }
}

fn arith(result: Option<i128>) -> Result<Option<Value>, Abort> {
    result
        .map(|v| Some(Value::Int(v)))
        .ok_or_else(|| Abort("integer overflow".into()))
}
