use thiserror::Error;

use crate::{
    claim::ClaimKey, codec::CodecError, governance::Module, Address, Amount, Chain,
    GuardianAddress,
};

/// Errors returned when a VAA is rejected.
///
/// Every variant is terminal: nothing in this crate retries, and a failure for one VAA never
/// changes the outcome for another.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaaError {
    #[error("malformed VAA: {0}")]
    Malformed(#[from] CodecError),

    #[error("unknown guardian set {0}")]
    UnknownGuardianSet(u32),

    #[error("no current guardian set")]
    NoCurrentGuardianSet,

    #[error("guardian set {index} expired at {expiration_time}")]
    GuardianSetExpired { index: u32, expiration_time: u32 },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("no quorum: {signatures} signatures, {quorum} required")]
    NoQuorum { signatures: usize, quorum: usize },

    #[error("VAA {0} already consumed")]
    AlreadyConsumed(ClaimKey),

    #[error("governance VAA for module {found}, expected {expected}")]
    WrongModule { expected: Module, found: Module },

    #[error("governance VAA targets chain {target}, this is chain {chain}")]
    WrongChain { target: Chain, chain: Chain },

    #[error("VAA emitted by {chain}/{address} is not from the governance emitter")]
    InvalidGovernanceEmitter { chain: Chain, address: Address },

    #[error("governance VAAs must be dispatched, not redeemed")]
    UnexpectedGovernanceVaa,

    #[error("governance VAA signed by guardian set {found}, current is {current}")]
    LatestGuardianSetRequired { current: u32, found: u32 },

    #[error("invalid guardian set index {found}, expected {expected}")]
    InvalidGuardianSetIndex { expected: u32, found: u32 },

    #[error("guardian set has no guardians")]
    ZeroGuardians,

    #[error("guardian set contains the zero address")]
    GuardianZeroAddress,

    #[error("duplicate guardian address {0}")]
    DuplicateGuardianAddress(GuardianAddress),

    #[error("invalid chain {0}")]
    InvalidChain(Chain),

    #[error("chain {0} is already registered")]
    ChainAlreadyRegistered(Chain),

    #[error("invalid fee recipient")]
    InvalidFeeRecipient,

    #[error("insufficient fees collected to transfer {0}")]
    InsufficientFees(Amount),

    #[error("EVM chain id {0} does not match this chain")]
    InvalidEvmChainId(Amount),
}

/// Return early with `$err` unless `$cond` holds.
macro_rules! require {
    ($cond:expr, $err:expr $(,)?) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

pub(crate) use require;
