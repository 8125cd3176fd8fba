//! Governance payloads.
//!
//! A governance VAA carries a payload of the form
//! ```markdown
//! module:32 action:u8 target_chain:u16 fields
//! ```
//! where `module` is an ASCII name left padded with zeroes. Action numbers are scoped by module.
//! `RecoverChainId` is the one action without a target chain; it identifies the chain it is for
//! by EVM chain id instead.

use std::{fmt, str::FromStr};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    codec::{self, encode_len, CodecError, Decode, Encode},
    Address, Amount, Chain, GuardianAddress,
};

/// A governance module label.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Module(pub [u8; 32]);

const fn module(name: &[u8]) -> Module {
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < name.len() {
        out[32 - name.len() + i] = name[i];
        i += 1;
    }
    Module(out)
}

impl Module {
    pub const CORE: Module = module(b"Core");
    pub const TOKEN_BRIDGE: Module = module(b"TokenBridge");
    pub const NFT_BRIDGE: Module = module(b"NFTBridge");

    /// Left pads `name` to 32 bytes.
    pub fn from_name(name: &str) -> Result<Module, CodecError> {
        if name.is_empty() || name.len() > 32 || !name.is_ascii() {
            return Err(CodecError::InvalidModuleName(name.into()));
        }
        let mut out = [0u8; 32];
        out[32 - name.len()..].copy_from_slice(name.as_bytes());
        Ok(Module(out))
    }

    /// The label without its zero padding.
    pub fn name(&self) -> String {
        let start = self.0.iter().position(|b| *b != 0).unwrap_or(32);
        String::from_utf8_lossy(&self.0[start..]).into_owned()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Module {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::from_name(s)
    }
}

impl Serialize for Module {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for Module {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Module::from_name(&name).map_err(D::Error::custom)
    }
}

impl Decode for Module {
    fn decode(buf: &mut &[u8]) -> codec::Result<Self> {
        Decode::decode(buf).map(Module)
    }
}

/// Actions understood by the governance dispatcher.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Register the emitter of a module's counterpart on a foreign chain.
    RegisterChain {
        chain: Chain,
        emitter_address: Address,
    },
    UpgradeContract {
        new_contract: Address,
    },
    UpgradeGuardianSet {
        new_guardian_set_index: u32,
        new_guardian_set: Vec<GuardianAddress>,
    },
    SetMessageFee {
        amount: Amount,
    },
    TransferFees {
        amount: Amount,
        recipient: Address,
    },
    /// Adopt `new_chain_id` on the chain whose EVM chain id is `evm_chain_id`. Used after a fork.
    RecoverChainId {
        evm_chain_id: Amount,
        new_chain_id: Chain,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    RegisterChain,
    UpgradeContract,
    UpgradeGuardianSet,
    SetMessageFee,
    TransferFees,
    RecoverChainId,
}

impl ActionKind {
    fn from_id(module: &Module, action: u8) -> Result<ActionKind, CodecError> {
        use ActionKind::*;

        let kind = match (*module, action) {
            (Module::CORE, 1) => Some(UpgradeContract),
            (Module::CORE, 2) => Some(UpgradeGuardianSet),
            (Module::CORE, 3) => Some(SetMessageFee),
            (Module::CORE, 4) => Some(TransferFees),
            (Module::CORE, 5) => Some(RecoverChainId),
            (Module::TOKEN_BRIDGE | Module::NFT_BRIDGE, 1) => Some(RegisterChain),
            (Module::TOKEN_BRIDGE | Module::NFT_BRIDGE, 2) => Some(UpgradeContract),
            (Module::TOKEN_BRIDGE | Module::NFT_BRIDGE, 3) => Some(RecoverChainId),
            (Module::CORE | Module::TOKEN_BRIDGE | Module::NFT_BRIDGE, _) => None,
            _ => return Err(CodecError::UnknownModule(module.name())),
        };

        kind.ok_or_else(|| CodecError::UnknownGovernanceAction {
            module: module.name(),
            action,
        })
    }

    fn id(self, module: &Module) -> Option<u8> {
        use ActionKind::*;

        match (*module, self) {
            (Module::CORE, UpgradeContract) => Some(1),
            (Module::CORE, UpgradeGuardianSet) => Some(2),
            (Module::CORE, SetMessageFee) => Some(3),
            (Module::CORE, TransferFees) => Some(4),
            (Module::CORE, RecoverChainId) => Some(5),
            (Module::TOKEN_BRIDGE | Module::NFT_BRIDGE, RegisterChain) => Some(1),
            (Module::TOKEN_BRIDGE | Module::NFT_BRIDGE, UpgradeContract) => Some(2),
            (Module::TOKEN_BRIDGE | Module::NFT_BRIDGE, RecoverChainId) => Some(3),
            _ => None,
        }
    }

    fn has_target_chain(self) -> bool {
        self != ActionKind::RecoverChainId
    }

    fn name(self) -> &'static str {
        match self {
            ActionKind::RegisterChain => "RegisterChain",
            ActionKind::UpgradeContract => "UpgradeContract",
            ActionKind::UpgradeGuardianSet => "UpgradeGuardianSet",
            ActionKind::SetMessageFee => "SetMessageFee",
            ActionKind::TransferFees => "TransferFees",
            ActionKind::RecoverChainId => "RecoverChainId",
        }
    }
}

impl Action {
    fn kind(&self) -> ActionKind {
        match self {
            Action::RegisterChain { .. } => ActionKind::RegisterChain,
            Action::UpgradeContract { .. } => ActionKind::UpgradeContract,
            Action::UpgradeGuardianSet { .. } => ActionKind::UpgradeGuardianSet,
            Action::SetMessageFee { .. } => ActionKind::SetMessageFee,
            Action::TransferFees { .. } => ActionKind::TransferFees,
            Action::RecoverChainId { .. } => ActionKind::RecoverChainId,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn decode_fields(kind: ActionKind, buf: &mut &[u8]) -> codec::Result<Action> {
        Ok(match kind {
            ActionKind::RegisterChain => Action::RegisterChain {
                chain: Chain::from(u16::decode(buf)?),
                emitter_address: Address(Decode::decode(buf)?),
            },
            ActionKind::UpgradeContract => Action::UpgradeContract {
                new_contract: Address(Decode::decode(buf)?),
            },
            ActionKind::UpgradeGuardianSet => {
                let new_guardian_set_index = u32::decode(buf)?;
                let len = u8::decode(buf)?;
                let new_guardian_set = (0..len)
                    .map(|_| Decode::decode(buf).map(GuardianAddress))
                    .collect::<codec::Result<Vec<_>>>()?;
                Action::UpgradeGuardianSet {
                    new_guardian_set_index,
                    new_guardian_set,
                }
            }
            ActionKind::SetMessageFee => Action::SetMessageFee {
                amount: Amount(Decode::decode(buf)?),
            },
            ActionKind::TransferFees => Action::TransferFees {
                amount: Amount(Decode::decode(buf)?),
                recipient: Address(Decode::decode(buf)?),
            },
            ActionKind::RecoverChainId => Action::RecoverChainId {
                evm_chain_id: Amount(Decode::decode(buf)?),
                new_chain_id: Chain::from(u16::decode(buf)?),
            },
        })
    }

    fn encode_fields(&self, out: &mut Vec<u8>) -> codec::Result<()> {
        match self {
            Action::RegisterChain {
                chain,
                emitter_address,
            } => {
                u16::from(*chain).encode(out)?;
                emitter_address.0.encode(out)
            }
            Action::UpgradeContract { new_contract } => new_contract.0.encode(out),
            Action::UpgradeGuardianSet {
                new_guardian_set_index,
                new_guardian_set,
            } => {
                new_guardian_set_index.encode(out)?;
                encode_len("guardians", new_guardian_set.len(), out)?;
                for addr in new_guardian_set {
                    addr.0.encode(out)?;
                }
                Ok(())
            }
            Action::SetMessageFee { amount } => amount.0.encode(out),
            Action::TransferFees { amount, recipient } => {
                amount.0.encode(out)?;
                recipient.0.encode(out)
            }
            Action::RecoverChainId {
                evm_chain_id,
                new_chain_id,
            } => {
                evm_chain_id.0.encode(out)?;
                u16::from(*new_chain_id).encode(out)
            }
        }
    }
}

/// A decoded governance payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GovernancePacket {
    pub module: Module,
    /// The chain this action is for. `Chain::Any` applies everywhere.
    pub chain: Chain,
    pub action: Action,
}

impl GovernancePacket {
    /// Decodes the rest of a packet once its module has been read.
    pub fn decode_for_module(module: Module, buf: &mut &[u8]) -> codec::Result<Self> {
        let kind = ActionKind::from_id(&module, u8::decode(buf)?)?;
        let chain = if kind.has_target_chain() {
            Chain::from(u16::decode(buf)?)
        } else {
            Chain::Any
        };
        let action = Action::decode_fields(kind, buf)?;

        Ok(GovernancePacket {
            module,
            chain,
            action,
        })
    }

    /// Parses a complete payload. Trailing bytes are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::from_slice(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::to_vec(self)
    }
}

impl Decode for GovernancePacket {
    fn decode(buf: &mut &[u8]) -> codec::Result<Self> {
        let module = Module::decode(buf)?;
        GovernancePacket::decode_for_module(module, buf)
    }
}

impl Encode for GovernancePacket {
    fn encode(&self, out: &mut Vec<u8>) -> codec::Result<()> {
        let kind = self.action.kind();
        let id = kind
            .id(&self.module)
            .ok_or_else(|| CodecError::UnsupportedAction {
                module: self.module.name(),
                action: kind.name(),
            })?;

        self.module.0.encode(out)?;
        id.encode(out)?;
        if kind.has_target_chain() {
            u16::from(self.chain).encode(out)?;
        }
        self.action.encode_fields(out)
    }

    fn encoded_len_hint(&self) -> usize {
        35 + match &self.action {
            Action::UpgradeGuardianSet {
                new_guardian_set, ..
            } => 5 + 20 * new_guardian_set.len(),
            Action::TransferFees { .. } => 64,
            Action::RecoverChainId { .. } => 32,
            _ => 34,
        }
    }
}
