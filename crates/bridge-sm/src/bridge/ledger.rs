//! Deposits and withdrawals entering and leaving the ledger.

use bitcoin::{Amount, OutPoint, ScriptBuf};
use btc_peg_db::{models::UtxoRef, BridgeDb};
use btc_peg_primitives::{
    address::BitcoinAddress,
    types::{AccountId, VoutId},
};
use tracing::info;

use super::{BridgeOutput, SidechainBridge};
use crate::{
    errors::{BridgeError, BridgeResult},
    host::BridgeHost,
};

impl<Db: BridgeDb, Host: BridgeHost> SidechainBridge<Db, Host> {
    pub(super) fn register_deposit(
        &mut self,
        owner: AccountId,
        outpoint: OutPoint,
        amount: Amount,
        address: String,
        script: ScriptBuf,
    ) -> BridgeResult<BridgeOutput> {
        if amount == Amount::ZERO {
            return Err(BridgeError::InvalidAmount(amount));
        }
        BitcoinAddress::parse(&address, self.params.network)?;

        let wallet = self.host.committee().primary_wallet(self.params.network);
        if script.as_script() != wallet.redeem_script() {
            return Err(BridgeError::UnspendableDeposit);
        }

        let vin = self.db.insert_vin(owner, outpoint, amount, address, script)?;
        info!(id = %vin.id, %owner, %outpoint, %amount, "registered deposit");

        Ok(BridgeOutput::DepositRegistered(vin))
    }

    pub(super) fn request_withdrawal(
        &mut self,
        payer: AccountId,
        address: String,
        amount: Amount,
    ) -> BridgeResult<BridgeOutput> {
        if amount == Amount::ZERO {
            return Err(BridgeError::InvalidAmount(amount));
        }
        let parsed = BitcoinAddress::parse(&address, self.params.network)?;

        self.host.debit(payer, self.params.peg_asset_id, amount)?;
        let vout = self.db.insert_vout(payer, parsed.to_string(), amount);
        info!(id = %vout.id, %payer, %amount, address = %vout.address, "requested withdrawal");

        Ok(BridgeOutput::WithdrawalRequested(vout))
    }

    pub(super) fn return_withdrawal(&mut self, vout_id: VoutId) -> BridgeResult<BridgeOutput> {
        let utxo_ref = UtxoRef::Vout(vout_id);
        let vout = match self.db.get_vout(&vout_id) {
            Some(vout) if !vout.used => vout.clone(),
            _ => return Err(BridgeError::UnknownUtxoOrVout(utxo_ref)),
        };
        self.check_reuse(&[utxo_ref])?;

        self.host
            .credit(vout.payer, self.params.peg_asset_id, vout.amount)?;
        self.db
            .remove_vout(&vout_id)
            .expect("withdrawal was just looked up");
        info!(id = %vout_id, payer = %vout.payer, amount = %vout.amount, "returned withdrawal");

        Ok(BridgeOutput::WithdrawalReturned(vout))
    }
}
