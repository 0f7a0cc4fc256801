//! Typed bindings for the `Registry` contract over pluggable backends,
//! plus the JSON-RPC backend and command handlers used by `registry-cli`.

pub mod bind;
pub mod commands;
pub mod config;
pub mod ethereum;
pub mod registry;
