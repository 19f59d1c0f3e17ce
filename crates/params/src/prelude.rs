//! Re-exports of the commonly used parameter types.

pub use crate::{
    bridge::BridgeParams,
    default::{
        DEFAULT_FEE_RATE_SAT_PER_KVB, MAX_UNCONFIRMED_PW_VOUTS, MIN_RELAY_FEE,
        REQUIRED_CONFIRMATIONS, WITNESS_FEE_BP,
    },
    errors::ConfigError,
    rpc::RpcConfig,
};
