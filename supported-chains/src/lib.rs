//! Chain IDs understood by the VAA core.
//!
//! Every emitter and every governance target is identified by a 16-bit chain id. Ids that are
//! not listed here are still representable through [`Chain::Unknown`] so that decoding never
//! fails on a chain this crate has not heard of yet.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid chain: {0}")]
pub struct InvalidChainError(String);

macro_rules! chains {
    ($($(#[$meta:meta])* $name:ident = $id:literal,)*) => {
        /// Chains, keyed by their wire id.
        ///
        /// Two chains are equal when their ids are, so `Unknown(2)` is the same chain as
        /// `Ethereum`. `From<u16>` only ever produces `Unknown` for unlisted ids.
        #[derive(Debug, Default, Clone, Copy)]
        pub enum Chain {
            /// In the wormhole wire format, 0 indicates that a message is for any destination chain.
            #[default]
            Any,
            $($(#[$meta])* $name,)*
            Unknown(u16),
        }

        impl From<u16> for Chain {
            fn from(other: u16) -> Chain {
                match other {
                    0 => Chain::Any,
                    $($id => Chain::$name,)*
                    c => Chain::Unknown(c),
                }
            }
        }

        impl From<Chain> for u16 {
            fn from(other: Chain) -> u16 {
                match other {
                    Chain::Any => 0,
                    $(Chain::$name => $id,)*
                    Chain::Unknown(c) => c,
                }
            }
        }

        impl fmt::Display for Chain {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Any => f.write_str("Any"),
                    $(Self::$name => f.write_str(stringify!($name)),)*
                    Self::Unknown(v) => write!(f, "Unknown({v})"),
                }
            }
        }

        impl FromStr for Chain {
            type Err = InvalidChainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.eq_ignore_ascii_case("any") {
                    return Ok(Chain::Any);
                }
                $(
                    if s.eq_ignore_ascii_case(stringify!($name)) {
                        return Ok(Chain::$name);
                    }
                )*
                parse_unknown(s).ok_or_else(|| InvalidChainError(s.into()))
            }
        }
    };
}

chains! {
    Solana = 1,
    Ethereum = 2,
    Terra = 3,
    Bsc = 4,
    Polygon = 5,
    Avalanche = 6,
    Oasis = 7,
    Algorand = 8,
    Aurora = 9,
    Fantom = 10,
    Karura = 11,
    Acala = 12,
    Klaytn = 13,
    Celo = 14,
    Near = 15,
    Moonbeam = 16,
    Terra2 = 18,
    Injective = 19,
    Osmosis = 20,
    Sui = 21,
    Aptos = 22,
    Arbitrum = 23,
    Optimism = 24,
    Gnosis = 25,
    Pythnet = 26,
    Xpla = 28,
    Btc = 29,
    Base = 30,
    Sei = 32,
    /// The cosmos chain that hosts the global accountant.
    Wormchain = 3104,
}

// Accepts the `Unknown(N)` form produced by `Display`.
fn parse_unknown(s: &str) -> Option<Chain> {
    let mut parts = s.split(['(', ')']);
    parts
        .next()
        .filter(|name| name.eq_ignore_ascii_case("unknown"))?;
    let id = parts.next()?.parse::<u16>().ok()?;
    match parts.next() {
        Some("") => Some(Chain::from(id)),
        _ => None,
    }
}

impl PartialEq for Chain {
    fn eq(&self, other: &Self) -> bool {
        u16::from(*self) == u16::from(*other)
    }
}

impl Eq for Chain {}

impl PartialOrd for Chain {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Chain {
    fn cmp(&self, other: &Self) -> Ordering {
        u16::from(*self).cmp(&u16::from(*other))
    }
}

impl Hash for Chain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        u16::from(*self).hash(state)
    }
}

impl Serialize for Chain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16((*self).into())
    }
}

impl<'de> Deserialize<'de> for Chain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        <u16 as Deserialize>::deserialize(deserializer).map(Self::from)
    }
}
