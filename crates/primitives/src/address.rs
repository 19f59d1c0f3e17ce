//! External Bitcoin addresses.

use bitcoin::{address::NetworkUnchecked, Address, Network, ScriptBuf};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{errors::AddressError, script::Payload};

/// A wrapper around the [`bitcoin::Address<NetworkChecked>`] type.
///
/// This is created in order to couple addresses with the corresponding network and to preserve that
/// information across serialization/deserialization. Only addresses whose scriptPubKey decodes into
/// a [`Payload`] can be constructed, so every [`BitcoinAddress`] is payable by the bridge.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct BitcoinAddress {
    /// The [`bitcoin::Network`] that this address is valid in.
    network: Network,

    /// The actual [`Address`] that this type wraps.
    address: Address,
}

impl BitcoinAddress {
    /// Parses a bitcoin address from a string and network.
    ///
    /// Accepts Base58Check (P2PKH/P2SH) and Bech32/Bech32m (P2WPKH/P2WSH/P2TR) encodings,
    /// including the `bcrt` prefix on regtest.
    pub fn parse(address_str: &str, network: Network) -> Result<Self, AddressError> {
        let address = address_str
            .parse::<Address<NetworkUnchecked>>()
            .map_err(|e| AddressError::Unparseable {
                address: address_str.to_string(),
                reason: e.to_string(),
            })?;

        let checked_address =
            address
                .require_network(network)
                .map_err(|_| AddressError::WrongNetwork {
                    address: address_str.to_string(),
                    network,
                })?;

        Self::from_checked(checked_address, network)
    }

    /// Wraps an already network-checked address.
    pub fn from_checked(address: Address, network: Network) -> Result<Self, AddressError> {
        if Payload::from_script_pubkey(&address.script_pubkey()).is_none() {
            return Err(AddressError::Unsupported(address.to_string()));
        }

        Ok(Self { network, address })
    }

    /// Returns the address.
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// Returns the network.
    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// Returns the decoded payload of this address.
    pub fn payload(&self) -> Payload {
        Payload::from_script_pubkey(&self.address.script_pubkey())
            .expect("payload is checked at construction")
    }

    /// Returns the scriptPubKey that pays to this address.
    pub fn script_pubkey(&self) -> ScriptBuf {
        self.payload().script_pubkey()
    }
}

impl std::fmt::Display for BitcoinAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl<'de> Deserialize<'de> for BitcoinAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BitcoinAddressShim {
            network: Network,
            address: String,
        }

        let shim = BitcoinAddressShim::deserialize(deserializer)?;

        BitcoinAddress::parse(&shim.address, shim.network).map_err(de::Error::custom)
    }
}
