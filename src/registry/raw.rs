use alloy::dyn_abi::DynSolValue;
use serde_json::Value;
use tracing::debug;

use crate::bind::dynamic::{self, find_function};
use crate::bind::{BindError, BoundContract, CallOpts, PendingTransaction, TransactOpts};

/// Registry binding addressed by method name at runtime
#[derive(Debug, Clone)]
pub struct RegistryRaw {
    contract: BoundContract,
}

impl RegistryRaw {
    pub(super) fn from_bound(contract: BoundContract) -> Self {
        Self { contract }
    }

    /// Call `method` and return its decoded outputs
    pub async fn call(
        &self,
        opts: &CallOpts,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, BindError> {
        let function = find_function(self.contract.abi(), method, args.len())?;
        let input = dynamic::encode_input(function, args)?;

        debug!("Raw call {} on {:?}", function.signature(), self.contract.address());
        let output = self.contract.raw_call(opts, input.into()).await?;
        dynamic::decode_output(function, &output)
    }

    /// Send a transaction invoking `method`
    pub async fn transact(
        &self,
        opts: &TransactOpts,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<PendingTransaction, BindError> {
        let function = find_function(self.contract.abi(), method, args.len())?;
        let input = dynamic::encode_input(function, args)?;
        self.contract.raw_transact(opts, input.into()).await
    }

    /// Call `method` with JSON parameters and render the outputs as JSON
    pub async fn call_json(
        &self,
        opts: &CallOpts,
        method: &str,
        parameters: &Value,
    ) -> Result<Value, BindError> {
        let args = self.json_args(method, parameters)?;
        let outputs = self.call(opts, method, &args).await?;
        Ok(dynamic::values_to_json(&outputs))
    }

    /// Send a transaction invoking `method` with JSON parameters
    pub async fn transact_json(
        &self,
        opts: &TransactOpts,
        method: &str,
        parameters: &Value,
    ) -> Result<PendingTransaction, BindError> {
        let args = self.json_args(method, parameters)?;
        self.transact(opts, method, &args).await
    }

    fn json_args(&self, method: &str, parameters: &Value) -> Result<Vec<DynSolValue>, BindError> {
        let arg_count = match parameters {
            Value::Array(params) => params.len(),
            Value::Object(obj) => obj.len(),
            _ => 0,
        };
        let function = find_function(self.contract.abi(), method, arg_count)?;
        dynamic::json_to_args(function, parameters)
    }
}
