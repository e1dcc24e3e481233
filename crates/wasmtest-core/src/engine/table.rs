//! Dispatch tables — method name to typed callable
//!
//! A contract registers each exported method once, with its parameter
//! types, return type, and whether it takes the shared context. Calls are
//! routed by name and type-checked against the descriptor before the
//! method body runs.

use std::collections::BTreeMap;

use super::{Abort, Call, CallResult, Context, Host};
use crate::address::Address;
use crate::literal::{ParamType, Value};
use crate::{Error, Result};

/// Method body: receives the host and checked arguments
pub type Thunk = Box<dyn Fn(&mut dyn Host, &Args) -> CallResult + Send + Sync>;

/// Declared shape of a method
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MethodSignature {
    pub params: Vec<ParamType>,
    pub returns: Option<ParamType>,
    pub needs_context: bool,
}

struct MethodDescriptor {
    signature: MethodSignature,
    thunk: Thunk,
}

/// Explicit mapping from method name to descriptor
#[derive(Default)]
pub struct DispatchTable {
    methods: BTreeMap<String, MethodDescriptor>,
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method that takes only positional arguments
    pub fn method<F>(
        self,
        name: &str,
        params: &[ParamType],
        returns: Option<ParamType>,
        body: F,
    ) -> Self
    where
        F: Fn(&mut dyn Host, &Args) -> CallResult + Send + Sync + 'static,
    {
        self.register(name, params, returns, false, body)
    }

    /// Register a method that also receives the shared context
    pub fn method_with_context<F>(
        self,
        name: &str,
        params: &[ParamType],
        returns: Option<ParamType>,
        body: F,
    ) -> Self
    where
        F: Fn(&mut dyn Host, &Args) -> CallResult + Send + Sync + 'static,
    {
        self.register(name, params, returns, true, body)
    }

    fn register<F>(
        mut self,
        name: &str,
        params: &[ParamType],
        returns: Option<ParamType>,
        needs_context: bool,
        body: F,
    ) -> Self
    where
        F: Fn(&mut dyn Host, &Args) -> CallResult + Send + Sync + 'static,
    {
        self.methods.insert(
            name.to_string(),
            MethodDescriptor {
                signature: MethodSignature {
                    params: params.to_vec(),
                    returns,
                    needs_context,
                },
                thunk: Box::new(body),
            },
        );
        self
    }

    pub fn signature(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.get(name).map(|m| &m.signature)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Route a call to its method body.
    ///
    /// The outer `Result` carries routing and argument errors; the inner
    /// [`CallResult`] is what the method body produced.
    pub fn invoke(&self, host: &mut dyn Host, call: Call) -> Result<CallResult> {
        let descriptor = self
            .methods
            .get(&call.method)
            .ok_or_else(|| Error::DispatchNotFound {
                method: call.method.clone(),
            })?;
        let signature = &descriptor.signature;

        if call.args.len() != signature.params.len() {
            return Err(Error::ArgumentMismatch {
                method: call.method,
                reason: format!(
                    "expected {} argument(s), got {}",
                    signature.params.len(),
                    call.args.len()
                ),
            });
        }

        for (i, (arg, expected)) in call.args.iter().zip(&signature.params).enumerate() {
            if arg.param_type() != *expected {
                return Err(Error::ArgumentMismatch {
                    method: call.method.clone(),
                    reason: format!(
                        "argument {} must be {}, got {}",
                        i + 1,
                        expected,
                        arg.param_type()
                    ),
                });
            }
        }

        // an unrequested context is dropped, a missing one is an error
        let context = match (signature.needs_context, call.context) {
            (true, None) => {
                return Err(Error::ArgumentMismatch {
                    method: call.method,
                    reason: "method requires context but none was supplied".into(),
                });
            }
            (true, ctx) => ctx,
            (false, _) => None,
        };

        let args = Args {
            values: call.args,
            context,
        };
        Ok((descriptor.thunk)(host, &args))
    }
}

/// Type-checked call arguments handed to a method body
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    values: Vec<Value>,
    context: Option<Context>,
}

impl Args {
    pub fn get(&self, index: usize) -> std::result::Result<&Value, Abort> {
        self.values
            .get(index)
            .ok_or_else(|| Abort(format!("missing argument {}", index + 1)))
    }

    pub fn int(&self, index: usize) -> std::result::Result<i128, Abort> {
        self.get(index)?
            .as_int()
            .ok_or_else(|| Abort(format!("argument {} is not an int", index + 1)))
    }

    pub fn string(&self, index: usize) -> std::result::Result<&str, Abort> {
        self.get(index)?
            .as_str()
            .ok_or_else(|| Abort(format!("argument {} is not a string", index + 1)))
    }

    pub fn address(&self, index: usize) -> std::result::Result<Address, Abort> {
        self.get(index)?
            .as_address()
            .ok_or_else(|| Abort(format!("argument {} is not an address", index + 1)))
    }

    pub fn context(&self) -> std::result::Result<&Context, Abort> {
        self.context
            .as_ref()
            .ok_or_else(|| Abort("context not supplied".into()))
    }
}
