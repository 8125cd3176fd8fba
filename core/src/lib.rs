//! The `vaa-core` crate implements the Verified Action Approval (VAA) protocol.
//!
//! A VAA is a message observed on one chain and signed by a quorum of guardians. This crate
//! provides everything a destination chain needs to accept such a message exactly once:
//!
//! - The binary codec for VAAs and governance payloads.
//! - The guardian set registry, with rotation and an expiry grace window.
//! - Signature verification against a guardian set.
//! - Replay protection through claims.
//! - The governance dispatcher which applies guardian set upgrades and contract configuration.
//!
//! Storage is abstracted behind the [`GuardianSetStore`] and [`ClaimStore`] traits. In-memory
//! implementations are provided for tests and single-process hosts.

use std::{fmt, str::FromStr};

use primitive_types::U256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

pub mod claim;
pub mod codec;
pub mod config;
pub mod contract;
mod error;
pub mod governance;
pub mod guardian_set;
pub mod vaa;
pub mod verify;

pub use claim::{check_and_consume, ClaimKey, ClaimStore, MemoryClaimStore};
pub use codec::CodecError;
pub use config::{Config, ConfigError};
pub use contract::{Applied, ChainState, Contract, LocalChainState, Submitted, Verified};
pub use error::VaaError;
pub use governance::{Action, GovernancePacket, Module};
pub use guardian_set::{
    GuardianSet, GuardianSetLookup, GuardianSetRegistry, GuardianSetStore,
    MemoryGuardianSetStore,
};
pub use vaa::{digest, Body, Digest, Header, Signature, Vaa};
pub use vaa_supported_chains::Chain;
pub use verify::{guardian_address, recover_guardian_address, verify, verify_batch};

/// The `GOVERNANCE_EMITTER` is the address guardians observe governance actions from. The value
/// is "0000000000000000000000000000000000000000000000000000000000000004", emitted on Solana.
pub const GOVERNANCE_EMITTER: Address = Address([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04,
]);

/// The 20 byte Ethereum-style address of a guardian key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GuardianAddress(pub [u8; 20]);

/// Addresses are 32 bytes on the wire. Addresses that are shorter, for example 20 byte
/// Ethereum addresses, are left zero padded to 32.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

/// A uint256 encoded in big-endian order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub [u8; 32]);

macro_rules! hex_bytes {
    ($name:ident, $len:literal) => {
        impl $name {
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for b in self.0 {
                    write!(f, "{b:02x}")?;
                }

                Ok(())
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let mut out = [0u8; $len];
                hex::decode_to_slice(s, &mut out)?;
                Ok(Self(out))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                if serializer.is_human_readable() {
                    serializer.collect_str(self)
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    s.parse().map_err(D::Error::custom)
                } else {
                    <[u8; $len]>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

hex_bytes!(GuardianAddress, 20);
hex_bytes!(Address, 32);
hex_bytes!(Amount, 32);

impl From<U256> for Amount {
    fn from(v: U256) -> Self {
        Amount(v.to_big_endian())
    }
}

impl From<Amount> for U256 {
    fn from(v: Amount) -> Self {
        U256::from_big_endian(&v.0)
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        U256::from(v).into()
    }
}

impl Amount {
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        U256::from(*self).checked_add(U256::from(*other)).map(Amount::from)
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        U256::from(*self).checked_sub(U256::from(*other)).map(Amount::from)
    }
}
