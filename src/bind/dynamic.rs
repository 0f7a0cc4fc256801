//! Untyped ABI access: JSON parameters in, JSON results out.
//!
//! Used by raw bindings where the method is only known by name at runtime.

use std::str::FromStr;

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier, Word};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, I256, U256};
use serde_json::Value;

use super::BindError;

/// Find the overload of `name` taking `arg_count` inputs
pub fn find_function<'a>(
    abi: &'a JsonAbi,
    name: &str,
    arg_count: usize,
) -> Result<&'a Function, BindError> {
    let overloads = abi
        .function(name)
        .ok_or_else(|| BindError::UnknownMethod(name.to_string()))?;

    overloads
        .iter()
        .find(|f| f.inputs.len() == arg_count)
        .ok_or_else(|| {
            let expected: Vec<String> = overloads.iter().map(|f| f.signature()).collect();
            BindError::Arguments(format!(
                "'{}' takes no overload with {} arguments; available: {}",
                name,
                arg_count,
                expected.join(", ")
            ))
        })
}

/// Encode calldata for `function` from typed dynamic values
pub fn encode_input(function: &Function, args: &[DynSolValue]) -> Result<Vec<u8>, BindError> {
    Ok(function.abi_encode_input(args)?)
}

/// Decode the output of `function`
pub fn decode_output(function: &Function, output: &[u8]) -> Result<Vec<DynSolValue>, BindError> {
    Ok(function.abi_decode_output(output, true)?)
}

/// Convert JSON parameters (positional array or object keyed by input name)
/// into values matching `function`'s inputs
pub fn json_to_args(function: &Function, parameters: &Value) -> Result<Vec<DynSolValue>, BindError> {
    let expected_params = || -> String {
        function
            .inputs
            .iter()
            .map(|input| format!("{} {}", input.ty, input.name))
            .collect::<Vec<_>>()
            .join(", ")
    };

    match parameters {
        Value::Null if function.inputs.is_empty() => Ok(Vec::new()),
        Value::Array(params) => {
            if params.len() != function.inputs.len() {
                return Err(BindError::Arguments(format!(
                    "'{}' expects {} parameters, got {}. Expected parameters: [{}]",
                    function.name,
                    function.inputs.len(),
                    params.len(),
                    expected_params()
                )));
            }

            function
                .inputs
                .iter()
                .zip(params)
                .enumerate()
                .map(|(i, (input, value))| {
                    let ty = input.resolve()?;
                    json_to_value(value, &ty).map_err(|e| {
                        BindError::Arguments(format!(
                            "parameter #{} ('{}' of type '{}'): {}",
                            i + 1,
                            input.name,
                            input.ty,
                            e
                        ))
                    })
                })
                .collect()
        }
        Value::Object(obj) => function
            .inputs
            .iter()
            .map(|input| {
                let value = obj.get(&input.name).ok_or_else(|| {
                    BindError::Arguments(format!(
                        "missing parameter '{}' of type '{}'. Expected parameters: {{{}}}",
                        input.name,
                        input.ty,
                        expected_params()
                    ))
                })?;
                let ty = input.resolve()?;
                json_to_value(value, &ty).map_err(|e| {
                    BindError::Arguments(format!(
                        "parameter '{}' of type '{}': {}",
                        input.name, input.ty, e
                    ))
                })
            })
            .collect(),
        other => Err(BindError::Arguments(format!(
            "parameters for '{}' must be an array or an object, got {}",
            function.name, other
        ))),
    }
}

/// Convert one JSON value to a dynamic ABI value of type `ty`
pub fn json_to_value(value: &Value, ty: &DynSolType) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::Address => {
            let s = value.as_str().ok_or("address must be a string")?;
            Address::from_str(s)
                .map(DynSolValue::Address)
                .map_err(|e| format!("invalid address '{}': {}", s, e))
        }
        DynSolType::Bool => value
            .as_bool()
            .map(DynSolValue::Bool)
            .ok_or_else(|| "bool must be true or false".to_string()),
        DynSolType::Uint(bits) => {
            let num = match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| format!("invalid uint value: {}", n))?,
                Value::String(s) => parse_u256(s)?,
                _ => return Err("uint must be a number or string".to_string()),
            };
            Ok(DynSolValue::Uint(num, *bits))
        }
        DynSolType::Int(bits) => {
            let num = match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(I256::try_from)
                    .and_then(Result::ok)
                    .ok_or_else(|| format!("invalid int value: {}", n))?,
                Value::String(s) => {
                    I256::from_dec_str(s).map_err(|_| format!("invalid int string: {}", s))?
                }
                _ => return Err("int must be a number or string".to_string()),
            };
            Ok(DynSolValue::Int(num, *bits))
        }
        DynSolType::String => value
            .as_str()
            .map(|s| DynSolValue::String(s.to_string()))
            .ok_or_else(|| "string parameter must be a string".to_string()),
        DynSolType::Bytes => Ok(DynSolValue::Bytes(parse_hex(value)?)),
        DynSolType::FixedBytes(size) => {
            let bytes = parse_hex(value)?;
            if bytes.len() > *size {
                return Err(format!(
                    "expected at most {} bytes, got {}",
                    size,
                    bytes.len()
                ));
            }
            let mut word = Word::ZERO;
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(word, *size))
        }
        DynSolType::Array(inner) => {
            let items = value.as_array().ok_or("array parameter must be an array")?;
            items
                .iter()
                .map(|item| json_to_value(item, inner))
                .collect::<Result<_, _>>()
                .map(DynSolValue::Array)
        }
        DynSolType::FixedArray(inner, len) => {
            let items = value.as_array().ok_or("array parameter must be an array")?;
            if items.len() != *len {
                return Err(format!("expected {} elements, got {}", len, items.len()));
            }
            items
                .iter()
                .map(|item| json_to_value(item, inner))
                .collect::<Result<_, _>>()
                .map(DynSolValue::FixedArray)
        }
        DynSolType::Tuple(types) => {
            let items = value.as_array().ok_or("tuple parameter must be an array")?;
            if items.len() != types.len() {
                return Err(format!(
                    "expected {} tuple fields, got {}",
                    types.len(),
                    items.len()
                ));
            }
            items
                .iter()
                .zip(types)
                .map(|(item, ty)| json_to_value(item, ty))
                .collect::<Result<_, _>>()
                .map(DynSolValue::Tuple)
        }
        other => Err(format!("unsupported Solidity type: {}", other)),
    }
}

fn parse_u256(s: &str) -> Result<U256, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
        None => U256::from_str_radix(s, 10),
    }
    .map_err(|_| format!("invalid uint string: {}", s))
}

fn parse_hex(value: &Value) -> Result<Vec<u8>, String> {
    let hex_str = value.as_str().ok_or("bytes must be a hex string")?;
    hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|_| format!("invalid hex string: {}", hex_str))
}

/// Render decoded values as JSON; a single value is unwrapped
pub fn values_to_json(values: &[DynSolValue]) -> Value {
    match values {
        [single] => value_to_json(single),
        many => Value::Array(many.iter().map(value_to_json).collect()),
    }
}

pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(addr) => Value::String(addr.to_checksum(None)),
        DynSolValue::Uint(num, _) => Value::String(num.to_string()),
        DynSolValue::Int(num, _) => Value::String(num.to_string()),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn abi() -> JsonAbi {
        serde_json::from_str(
            r#"[
                {"type":"function","name":"setEntry","inputs":[{"name":"key","type":"bytes32"},{"name":"target","type":"address"}],"outputs":[],"stateMutability":"nonpayable"},
                {"type":"function","name":"quote","inputs":[{"name":"amounts","type":"uint64[]"},{"name":"delta","type":"int32"}],"outputs":[{"name":"total","type":"uint256"},{"name":"ok","type":"bool"}],"stateMutability":"view"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_positional_and_named_params_agree() {
        let abi = abi();
        let function = find_function(&abi, "setEntry", 2).unwrap();

        let key = format!("0x{}", "ab".repeat(32));
        let target = "0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e";
        let positional = json_to_args(function, &json!([key, target])).unwrap();
        let named = json_to_args(function, &json!({ "target": target, "key": key })).unwrap();
        assert_eq!(positional, named);

        let calldata = encode_input(function, &positional).unwrap();
        assert_eq!(&calldata[..4], function.selector().as_slice());
        assert_eq!(calldata.len(), 4 + 64);
    }

    #[test]
    fn test_sized_integers() {
        let abi = abi();
        let function = find_function(&abi, "quote", 2).unwrap();

        let args = json_to_args(function, &json!([[1, "0x10", "300"], "-7"])).unwrap();
        assert_eq!(
            args[0],
            DynSolValue::Array(vec![
                DynSolValue::Uint(U256::from(1), 64),
                DynSolValue::Uint(U256::from(16), 64),
                DynSolValue::Uint(U256::from(300), 64),
            ])
        );
        assert_eq!(args[1], DynSolValue::Int(I256::try_from(-7i64).unwrap(), 32));
        assert!(encode_input(function, &args).is_ok());
    }

    #[test]
    fn test_output_round_trip() {
        let abi = abi();
        let function = find_function(&abi, "quote", 2).unwrap();

        let output = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(1234), 256),
            DynSolValue::Bool(true),
        ])
        .abi_encode_params();
        let decoded = decode_output(function, &output).unwrap();
        assert_eq!(values_to_json(&decoded), json!(["1234", true]));
    }

    #[test]
    fn test_argument_errors() {
        let abi = abi();
        assert!(matches!(
            find_function(&abi, "missing", 0),
            Err(BindError::UnknownMethod(_))
        ));
        assert!(matches!(
            find_function(&abi, "setEntry", 1),
            Err(BindError::Arguments(_))
        ));

        let function = find_function(&abi, "setEntry", 2).unwrap();
        assert!(json_to_args(function, &json!(["0x01"])).is_err());
        assert!(json_to_args(function, &json!({ "key": "0x01" })).is_err());
        assert!(json_to_args(function, &json!(["0x01", "not-an-address"])).is_err());
        assert!(json_to_args(function, &json!("0x01")).is_err());
    }
}
