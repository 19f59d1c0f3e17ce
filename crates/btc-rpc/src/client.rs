//! A JSON-RPC 1.0 client for bitcoin-core compatible nodes.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bitcoin::{consensus::encode, Amount, Block, BlockHash, Txid};
use btc_peg_params::rpc::RpcConfig;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    errors::{ClientError, ClientResult},
    traits::{BitcoinRpc, TxStatus},
};

/// `RPC_INVALID_ADDRESS_OR_KEY`, returned for transactions the node does not know.
const RPC_NO_SUCH_TRANSACTION: i64 = -5;

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RawTransactionInfo {
    #[serde(default)]
    confirmations: u32,
}

#[derive(Debug, Deserialize)]
struct SmartFeeEstimate {
    /// BTC/kvB.
    feerate: Option<f64>,
}

/// Decodes the body of a JSON-RPC response.
fn parse_response<T: DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    let response: RpcResponse<T> =
        serde_json::from_slice(body).map_err(|e| ClientError::Parse(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ClientError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    response
        .result
        .ok_or_else(|| ClientError::Parse("response has neither result nor error".to_string()))
}

/// Converts a BTC/kvB rate as returned by `estimatesmartfee` to sats/kvB.
fn btc_per_kvb_to_sats(feerate: f64) -> Option<u64> {
    Amount::from_btc(feerate).ok().map(Amount::to_sat)
}

/// Tells a transaction the node does not know apart from a failed lookup.
fn tx_status(result: ClientResult<RawTransactionInfo>) -> ClientResult<TxStatus> {
    match result {
        Ok(info) => Ok(TxStatus::Seen {
            confirmations: info.confirmations,
        }),
        Err(ClientError::Rpc { code, .. }) if code == RPC_NO_SUCH_TRANSACTION => {
            Ok(TxStatus::Missing)
        }
        Err(e) => Err(e),
    }
}

/// A [`BitcoinRpc`] implementation over HTTP with Basic auth.
#[derive(Debug)]
pub struct BitcoinRpcClient {
    http: reqwest::Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl BitcoinRpcClient {
    /// Creates a client for the configured endpoint.
    pub fn new(config: RpcConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(0),
        })
    }

    /// Calls `method` and decodes its result.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ClientResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(%method, %id, "sending rpc request");

        let response = self
            .http
            .post(&self.config.url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&body)
            .send()
            .await?;

        // bitcoind reports rpc errors with a 500 and a regular error body
        let status = response.status();
        let bytes = response.bytes().await?;
        match parse_response(&bytes) {
            Err(ClientError::Parse(_)) if !status.is_success() => {
                Err(ClientError::Status(status.as_u16()))
            }
            result => result,
        }
    }
}

#[async_trait]
impl BitcoinRpc for BitcoinRpcClient {
    async fn send_raw_transaction(&self, tx_hex: &str) -> Option<Txid> {
        match self
            .call::<Txid>("sendrawtransaction", json!([tx_hex]))
            .await
        {
            Ok(txid) => Some(txid),
            Err(e) => {
                warn!(%e, "could not relay transaction");
                None
            }
        }
    }

    async fn get_tx_status(&self, txid: &Txid) -> Option<TxStatus> {
        let result = self
            .call::<RawTransactionInfo>("getrawtransaction", json!([txid, true]))
            .await;

        tx_status(result)
            .inspect_err(|e| warn!(%txid, %e, "could not look up transaction"))
            .ok()
    }

    async fn estimate_smart_fee(&self, blocks: u16) -> Option<u64> {
        match self
            .call::<SmartFeeEstimate>("estimatesmartfee", json!([blocks]))
            .await
        {
            Ok(estimate) => estimate.feerate.and_then(btc_per_kvb_to_sats),
            Err(e) => {
                warn!(%blocks, %e, "could not estimate fee");
                None
            }
        }
    }

    async fn get_full_block(&self, hash: &BlockHash) -> Option<Block> {
        let raw = match self.call::<String>("getblock", json!([hash, 0])).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%hash, %e, "could not fetch block");
                return None;
            }
        };

        encode::deserialize_hex(&raw)
            .inspect_err(|e| warn!(%hash, %e, "could not decode block"))
            .ok()
    }
}
