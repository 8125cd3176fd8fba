use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{governance::Module, Address, Chain, GOVERNANCE_EMITTER};

/// One day, in seconds.
pub const DEFAULT_GUARDIAN_SET_EXPIRY: u32 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chain id must not be 0")]
    AnyChain,

    #[error("governance emitter must not be the zero address")]
    ZeroGovernanceEmitter,
}

/// Chain-specific settings of a destination.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The chain this destination runs on.
    pub chain_id: Chain,

    /// Chain and address governance VAAs must be emitted from.
    #[serde(default = "default_governance_chain")]
    pub governance_chain: Chain,
    #[serde(default = "default_governance_emitter")]
    pub governance_emitter: Address,

    /// Governance module this destination executes actions for.
    #[serde(default = "default_module")]
    pub module: Module,

    /// Seconds a superseded guardian set stays valid.
    #[serde(default = "default_guardian_set_expiry")]
    pub guardian_set_expiry: u32,
}

fn default_governance_chain() -> Chain {
    Chain::Solana
}

fn default_governance_emitter() -> Address {
    GOVERNANCE_EMITTER
}

fn default_module() -> Module {
    Module::CORE
}

fn default_guardian_set_expiry() -> u32 {
    DEFAULT_GUARDIAN_SET_EXPIRY
}

impl Config {
    /// Mainnet governance settings for the core module on `chain_id`.
    pub fn new(chain_id: Chain) -> Self {
        Config {
            chain_id,
            governance_chain: default_governance_chain(),
            governance_emitter: default_governance_emitter(),
            module: default_module(),
            guardian_set_expiry: default_guardian_set_expiry(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == Chain::Any {
            return Err(ConfigError::AnyChain);
        }
        if self.governance_emitter.is_zero() {
            return Err(ConfigError::ZeroGovernanceEmitter);
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn is_governance_emitter(&self, chain: Chain, address: &Address) -> bool {
        chain == self.governance_chain && *address == self.governance_emitter
    }
}
