//! Parameters that every witness must agree on to build and verify condensing transactions.

use std::path::Path;

use bitcoin::{Amount, Network};
use serde::{Deserialize, Serialize};

use crate::{default::*, errors::ConfigError};

/// The consensus parameters of the bridge.
///
/// Missing fields fall back to their defaults when deserializing, so a config file only needs to
/// list the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeParams {
    /// The network the committee wallet lives on.
    pub network: Network,

    /// The sidechain asset credited for deposits and debited for withdrawals.
    pub peg_asset_id: u64,

    /// Lower bound of the fee of a condensing transaction.
    pub min_relay_fee: Amount,

    /// Fee rate used when the live estimate is unavailable or lower, in sats/kvB.
    pub default_fee_rate: u64,

    /// Share of every withdrawal paid to the committee, in basis points.
    pub witness_fee_bp: u64,

    /// Maximum number of deposit UTXOs per condensing transaction.
    pub vin_limit: usize,

    /// Maximum number of withdrawals per condensing transaction.
    pub vout_limit: usize,

    /// Maximum number of unconfirmed primary wallet change outputs.
    pub max_unconfirmed_pw_vouts: usize,

    /// Confirmations required before deposits are credited.
    pub required_confirmations: u32,

    /// Seconds after which a transaction without confirmations is reverted.
    pub revert_timeout_secs: u64,

    /// Confirmation target passed to the fee estimator.
    pub fee_estimate_blocks: u16,

    /// Do not relay finalized transactions.
    pub skip_broadcast: bool,
}

impl Default for BridgeParams {
    fn default() -> Self {
        Self {
            network: NETWORK,
            peg_asset_id: PEG_ASSET_ID,
            min_relay_fee: MIN_RELAY_FEE,
            default_fee_rate: DEFAULT_FEE_RATE_SAT_PER_KVB,
            witness_fee_bp: WITNESS_FEE_BP,
            vin_limit: VIN_LIMIT,
            vout_limit: VOUT_LIMIT,
            max_unconfirmed_pw_vouts: MAX_UNCONFIRMED_PW_VOUTS,
            required_confirmations: REQUIRED_CONFIRMATIONS,
            revert_timeout_secs: REVERT_TIMEOUT_SECS,
            fee_estimate_blocks: FEE_ESTIMATE_BLOCKS,
            skip_broadcast: false,
        }
    }
}

impl BridgeParams {
    /// Parses the parameters from a TOML string and validates them.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(raw)?;
        params.validate()?;

        Ok(params)
    }

    /// Loads the parameters from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;

        Self::from_toml_str(&raw)
    }

    /// Checks the ranges of every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.witness_fee_bp >= 10_000 {
            return Err(ConfigError::InvalidValue {
                field: "witness_fee_bp",
                reason: format!("{} is not below 10000", self.witness_fee_bp),
            });
        }
        if self.vin_limit == 0 && self.vout_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "vin_limit",
                reason: "vin_limit and vout_limit cannot both be zero".to_string(),
            });
        }
        if self.max_unconfirmed_pw_vouts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_unconfirmed_pw_vouts",
                reason: "must allow at least one unconfirmed change output".to_string(),
            });
        }
        if self.required_confirmations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "required_confirmations",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// The fee rate to build with given the node's live estimate.
    pub fn effective_fee_rate(&self, live_estimate: Option<u64>) -> u64 {
        live_estimate.map_or(self.default_fee_rate, |live| live.max(self.default_fee_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_params_serde() {
        let params = BridgeParams::default();
        let serialized = toml::to_string(&params).unwrap();

        let deserialized: BridgeParams = toml::from_str(&serialized).unwrap();

        assert_eq!(params, deserialized);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let params_toml = r#"
            network = "regtest"
            min_relay_fee = 2000
            witness_fee_bp = 50
            skip_broadcast = true
        "#;

        let params = BridgeParams::from_toml_str(params_toml).expect("must parse");

        assert_eq!(params.network, Network::Regtest);
        assert_eq!(params.min_relay_fee, Amount::from_sat(2000));
        assert_eq!(params.witness_fee_bp, 50);
        assert!(params.skip_broadcast);
        assert_eq!(params.max_unconfirmed_pw_vouts, MAX_UNCONFIRMED_PW_VOUTS);
        assert_eq!(params.required_confirmations, REQUIRED_CONFIRMATIONS);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            BridgeParams::from_toml_str("witness_fee_bp = 10000"),
            Err(ConfigError::InvalidValue { field: "witness_fee_bp", .. })
        ));
        assert!(matches!(
            BridgeParams::from_toml_str("required_confirmations = 0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            BridgeParams::from_toml_str("vin_limit = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn live_estimate_only_raises_the_rate() {
        let params = BridgeParams::default();

        assert_eq!(params.effective_fee_rate(None), params.default_fee_rate);
        assert_eq!(params.effective_fee_rate(Some(1)), params.default_fee_rate);
        assert_eq!(
            params.effective_fee_rate(Some(params.default_fee_rate * 3)),
            params.default_fee_rate * 3
        );
    }
}
