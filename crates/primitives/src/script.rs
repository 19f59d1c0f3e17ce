//! Script classification and scriptPubKey construction.
//!
//! Classification is pure pattern matching on the byte length and fixed opcode positions of a
//! scriptPubKey. No script is ever executed.

use bitcoin::{Script, ScriptBuf};
use serde::{Deserialize, Serialize};

const OP_0: u8 = 0x00;
const OP_1: u8 = 0x51;
const OP_PUSHBYTES_20: u8 = 0x14;
const OP_PUSHBYTES_32: u8 = 0x20;
const OP_PUSHBYTES_33: u8 = 0x21;
const OP_PUSHBYTES_65: u8 = 0x41;
const OP_RETURN: u8 = 0x6a;
const OP_DUP: u8 = 0x76;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_HASH160: u8 = 0xa9;
const OP_CHECKSIG: u8 = 0xac;

/// The kind of output a scriptPubKey pays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    /// `<pubkey> OP_CHECKSIG` with a 33 or 65 byte key.
    P2pk,
    /// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`.
    P2pkh,
    /// `OP_HASH160 <20> OP_EQUAL`; also covers the P2SH-wrapped segwit variants.
    P2sh,
    /// `OP_0 <20>`.
    P2wpkh,
    /// `OP_0 <32>`.
    P2wsh,
    /// `OP_1 <32>`.
    P2tr,
    /// `OP_RETURN ...`.
    NullData,
    /// Anything else.
    NonStandard,
}

impl ScriptType {
    /// Classifies a scriptPubKey.
    pub fn classify(script: &Script) -> Self {
        match script.as_bytes() {
            [OP_PUSHBYTES_33, key @ .., OP_CHECKSIG] if key.len() == 33 => Self::P2pk,
            [OP_PUSHBYTES_65, key @ .., OP_CHECKSIG] if key.len() == 65 => Self::P2pk,
            [OP_DUP, OP_HASH160, OP_PUSHBYTES_20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG]
                if hash.len() == 20 =>
            {
                Self::P2pkh
            }
            [OP_HASH160, OP_PUSHBYTES_20, hash @ .., OP_EQUAL] if hash.len() == 20 => Self::P2sh,
            [OP_0, OP_PUSHBYTES_20, program @ ..] if program.len() == 20 => Self::P2wpkh,
            [OP_0, OP_PUSHBYTES_32, program @ ..] if program.len() == 32 => Self::P2wsh,
            [OP_1, OP_PUSHBYTES_32, program @ ..] if program.len() == 32 => Self::P2tr,
            [OP_RETURN, ..] => Self::NullData,
            _ => Self::NonStandard,
        }
    }
}

/// The payload of an output the bridge can pay to.
///
/// Each variant carries the raw bytes that are committed to in the scriptPubKey, so building the
/// script is an exhaustive match with no runtime type inspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Payload {
    /// Serialized public key (33 or 65 bytes).
    P2pk(Vec<u8>),
    /// HASH160 of a public key.
    P2pkh([u8; 20]),
    /// HASH160 of a redeem script.
    P2sh([u8; 20]),
    /// HASH160 of a compressed public key.
    P2wpkh([u8; 20]),
    /// SHA256 of a witness script.
    P2wsh([u8; 32]),
    /// Tweaked x-only output key.
    P2tr([u8; 32]),
}

impl Payload {
    /// Extracts the payload of a scriptPubKey, if it is one of the supported kinds.
    pub fn from_script_pubkey(script: &Script) -> Option<Self> {
        let bytes = script.as_bytes();

        match ScriptType::classify(script) {
            ScriptType::P2pk => Some(Self::P2pk(bytes[1..bytes.len() - 1].to_vec())),
            ScriptType::P2pkh => Some(Self::P2pkh(copy_array(&bytes[3..23]))),
            ScriptType::P2sh => Some(Self::P2sh(copy_array(&bytes[2..22]))),
            ScriptType::P2wpkh => Some(Self::P2wpkh(copy_array(&bytes[2..22]))),
            ScriptType::P2wsh => Some(Self::P2wsh(copy_array(&bytes[2..34]))),
            ScriptType::P2tr => Some(Self::P2tr(copy_array(&bytes[2..34]))),
            ScriptType::NullData | ScriptType::NonStandard => None,
        }
    }

    /// The kind of script this payload produces.
    pub const fn script_type(&self) -> ScriptType {
        match self {
            Self::P2pk(_) => ScriptType::P2pk,
            Self::P2pkh(_) => ScriptType::P2pkh,
            Self::P2sh(_) => ScriptType::P2sh,
            Self::P2wpkh(_) => ScriptType::P2wpkh,
            Self::P2wsh(_) => ScriptType::P2wsh,
            Self::P2tr(_) => ScriptType::P2tr,
        }
    }

    /// Builds the scriptPubKey paying to this payload.
    pub fn script_pubkey(&self) -> ScriptBuf {
        let bytes = match self {
            Self::P2pk(key) => {
                let push = if key.len() == 65 {
                    OP_PUSHBYTES_65
                } else {
                    OP_PUSHBYTES_33
                };
                [&[push][..], key.as_slice(), &[OP_CHECKSIG][..]].concat()
            }
            Self::P2pkh(hash) => [
                &[OP_DUP, OP_HASH160, OP_PUSHBYTES_20][..],
                &hash[..],
                &[OP_EQUALVERIFY, OP_CHECKSIG][..],
            ]
            .concat(),
            Self::P2sh(hash) => {
                [&[OP_HASH160, OP_PUSHBYTES_20][..], &hash[..], &[OP_EQUAL][..]].concat()
            }
            Self::P2wpkh(program) => [&[OP_0, OP_PUSHBYTES_20][..], &program[..]].concat(),
            Self::P2wsh(program) => [&[OP_0, OP_PUSHBYTES_32][..], &program[..]].concat(),
            Self::P2tr(key) => [&[OP_1, OP_PUSHBYTES_32][..], &key[..]].concat(),
        };

        ScriptBuf::from_bytes(bytes)
    }
}

fn copy_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(bytes);
    array
}

/// Builds the scriptSig that spends a P2SH-wrapped segwit output: a single push of the witness
/// program.
pub fn p2sh_witness_program_script_sig(witness_program: &Script) -> ScriptBuf {
    let program = witness_program.as_bytes();
    let mut bytes = Vec::with_capacity(program.len() + 1);
    // witness programs are at most 42 bytes, so a direct push opcode suffices
    bytes.push(program.len() as u8);
    bytes.extend_from_slice(program);

    ScriptBuf::from_bytes(bytes)
}
