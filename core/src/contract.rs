//! The destination side of the protocol: verify, claim, then apply.
//!
//! [`Contract`] ties together the configuration, the guardian set registry, the claim store and
//! whatever chain-local state governance actions mutate. Application messages go through
//! [`Contract::redeem`]; governance VAAs go through [`Contract::dispatch`]. Both share the same
//! verifier and the same claims, so there is no separate trust path for governance.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    claim::{check_and_consume, ClaimKey, ClaimStore, MemoryClaimStore},
    codec::{CodecError, Decode},
    config::Config,
    error::{require, VaaError},
    governance::{Action, GovernancePacket, Module},
    guardian_set::{GuardianSet, GuardianSetRegistry, GuardianSetStore, MemoryGuardianSetStore},
    vaa::{Digest, Vaa},
    verify::verify,
    Address, Amount, Chain,
};

/// Chain-local state that governance actions other than guardian set upgrades act on.
pub trait ChainState {
    /// Checks that `action` can be applied. Runs before the VAA is claimed, so a rejected action
    /// leaves no trace.
    fn check(&self, config: &Config, action: &Action) -> Result<(), VaaError>;

    /// Applies an action that passed [`ChainState::check`].
    fn apply(&mut self, config: &Config, action: &Action);
}

/// A plain in-memory [`ChainState`].
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalChainState {
    /// Emitters of this module's counterparts on other chains.
    pub registered_emitters: BTreeMap<Chain, Address>,
    /// Set by the most recent contract upgrade.
    pub contract: Option<Address>,
    pub message_fee: Amount,
    pub fees_collected: Amount,
    /// Fee transfers executed so far, oldest first.
    pub fee_transfers: Vec<(Address, Amount)>,
    /// EVM chain id of the host, for chains that have one.
    pub evm_chain_id: Option<Amount>,
}

impl LocalChainState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_evm_chain_id(evm_chain_id: Amount) -> Self {
        LocalChainState {
            evm_chain_id: Some(evm_chain_id),
            ..Default::default()
        }
    }

    /// Records a message fee paid to this contract.
    pub fn collect_fee(&mut self, amount: Amount) -> Option<()> {
        self.fees_collected = self.fees_collected.checked_add(&amount)?;
        Some(())
    }
}

impl ChainState for LocalChainState {
    fn check(&self, config: &Config, action: &Action) -> Result<(), VaaError> {
        match action {
            Action::RegisterChain { chain, .. } => {
                require!(
                    *chain != Chain::Any && *chain != config.chain_id,
                    VaaError::InvalidChain(*chain)
                );
                require!(
                    !self.registered_emitters.contains_key(chain),
                    VaaError::ChainAlreadyRegistered(*chain)
                );
            }
            Action::TransferFees { amount, recipient } => {
                require!(!recipient.is_zero(), VaaError::InvalidFeeRecipient);
                require!(
                    self.fees_collected >= *amount,
                    VaaError::InsufficientFees(*amount)
                );
            }
            Action::RecoverChainId {
                evm_chain_id,
                new_chain_id,
            } => {
                require!(
                    self.evm_chain_id == Some(*evm_chain_id),
                    VaaError::InvalidEvmChainId(*evm_chain_id)
                );
                require!(
                    *new_chain_id != Chain::Any,
                    VaaError::InvalidChain(*new_chain_id)
                );
            }
            Action::UpgradeContract { .. }
            | Action::SetMessageFee { .. }
            | Action::UpgradeGuardianSet { .. } => {}
        }

        Ok(())
    }

    fn apply(&mut self, _config: &Config, action: &Action) {
        match action {
            Action::RegisterChain {
                chain,
                emitter_address,
            } => {
                self.registered_emitters.insert(*chain, *emitter_address);
            }
            Action::UpgradeContract { new_contract } => self.contract = Some(*new_contract),
            Action::SetMessageFee { amount } => self.message_fee = *amount,
            Action::TransferFees { amount, recipient } => {
                // `check` guarantees enough fees were collected.
                self.fees_collected = self
                    .fees_collected
                    .checked_sub(amount)
                    .unwrap_or_default();
                self.fee_transfers.push((*recipient, *amount));
            }
            Action::RecoverChainId { .. } | Action::UpgradeGuardianSet { .. } => {}
        }
    }
}

/// A redeemed application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    pub claim: ClaimKey,
    pub digest: Digest,
}

/// An applied governance action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub claim: ClaimKey,
    pub digest: Digest,
    pub packet: GovernancePacket,
}

/// The outcome of [`Contract::submit_vaa`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    /// An application message, verified and claimed. Its payload is for the caller to act on.
    Message { vaa: Vaa, verified: Verified },
    Governance(Applied),
}

pub struct Contract<S = MemoryGuardianSetStore, C = MemoryClaimStore, L = LocalChainState> {
    config: Config,
    guardian_sets: GuardianSetRegistry<S>,
    claims: C,
    state: L,
}

impl Contract {
    /// An in-memory contract whose first guardian set is `genesis`.
    pub fn new(config: Config, genesis: GuardianSet) -> Self {
        let store = MemoryGuardianSetStore::with_genesis(genesis);
        Contract::with_stores(config, store, MemoryClaimStore::new(), LocalChainState::new())
    }
}

impl<S, C, L> Contract<S, C, L>
where
    S: GuardianSetStore,
    C: ClaimStore,
    L: ChainState,
{
    pub fn with_stores(config: Config, guardian_sets: S, claims: C, state: L) -> Self {
        let grace_period = config.guardian_set_expiry;
        Contract {
            config,
            guardian_sets: GuardianSetRegistry::new(guardian_sets, grace_period),
            claims,
            state,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn guardian_sets(&self) -> &GuardianSetRegistry<S> {
        &self.guardian_sets
    }

    pub fn claims(&self) -> &C {
        &self.claims
    }

    pub fn state(&self) -> &L {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut L {
        &mut self.state
    }

    pub fn guardian_set(&self, index: u32) -> Result<GuardianSet, VaaError> {
        self.guardian_sets.get(index)
    }

    pub fn current_guardian_set(&self) -> Result<GuardianSet, VaaError> {
        self.guardian_sets.current()
    }

    pub fn is_consumed(&self, key: &ClaimKey) -> bool {
        self.claims.exists(key)
    }

    pub fn verify_vaa(&self, vaa: &Vaa, now: u32) -> Result<Digest, VaaError> {
        verify(vaa, &self.guardian_sets, now)
    }

    /// Decodes and verifies `data` without claiming it.
    pub fn parse_and_verify_vaa(&self, data: &[u8], now: u32) -> Result<(Vaa, Digest), VaaError> {
        let vaa = Vaa::from_bytes(data)?;
        let digest = self.verify_vaa(&vaa, now)?;
        Ok((vaa, digest))
    }

    /// Verifies and claims an application message.
    ///
    /// Governance VAAs are refused here: claiming one without applying it would make it
    /// impossible to dispatch later.
    pub fn redeem(&self, vaa: &Vaa, now: u32) -> Result<Verified, VaaError> {
        require!(
            !self
                .config
                .is_governance_emitter(vaa.emitter_chain, &vaa.emitter_address),
            VaaError::UnexpectedGovernanceVaa
        );

        let digest = self.verify_vaa(vaa, now)?;
        let claim = vaa.message_id();
        check_and_consume(&self.claims, claim)?;

        Ok(Verified { claim, digest })
    }

    /// Verifies, claims and applies a governance VAA.
    pub fn dispatch(&mut self, vaa: &Vaa, now: u32) -> Result<Applied, VaaError> {
        match self.try_dispatch(vaa, now) {
            Ok(applied) => {
                info!(
                    "applied governance action {} from VAA {} (target chain {})",
                    applied.packet.action.name(),
                    applied.claim,
                    applied.packet.chain
                );
                Ok(applied)
            }
            Err(e) => {
                warn!("rejected governance VAA {}: {e}", vaa.message_id());
                Err(e)
            }
        }
    }

    fn try_dispatch(&mut self, vaa: &Vaa, now: u32) -> Result<Applied, VaaError> {
        let digest = self.verify_vaa(vaa, now)?;

        require!(
            self.config
                .is_governance_emitter(vaa.emitter_chain, &vaa.emitter_address),
            VaaError::InvalidGovernanceEmitter {
                chain: vaa.emitter_chain,
                address: vaa.emitter_address,
            }
        );

        let claim = vaa.message_id();
        require!(!self.claims.exists(&claim), VaaError::AlreadyConsumed(claim));

        let current = self.guardian_sets.current_index()?;
        require!(
            vaa.guardian_set_index == current,
            VaaError::LatestGuardianSetRequired {
                current,
                found: vaa.guardian_set_index,
            }
        );

        let packet = self.parse_governance_packet(&vaa.payload)?;
        self.check_action(&packet.action)?;

        check_and_consume(&self.claims, claim)?;
        self.apply_action(&packet.action, now)?;

        Ok(Applied {
            claim,
            digest,
            packet,
        })
    }

    /// Decodes a governance payload addressed to this contract's module and chain.
    pub fn parse_governance_packet(&self, payload: &[u8]) -> Result<GovernancePacket, VaaError> {
        let mut buf = payload;
        let module = Module::decode(&mut buf)?;
        require!(
            module == self.config.module,
            VaaError::WrongModule {
                expected: self.config.module,
                found: module,
            }
        );

        let packet = GovernancePacket::decode_for_module(module, &mut buf)?;
        require!(buf.is_empty(), CodecError::TrailingBytes(buf.len()));
        require!(
            packet.chain == Chain::Any || packet.chain == self.config.chain_id,
            VaaError::WrongChain {
                target: packet.chain,
                chain: self.config.chain_id,
            }
        );

        Ok(packet)
    }

    fn check_action(&self, action: &Action) -> Result<(), VaaError> {
        match action {
            Action::UpgradeGuardianSet {
                new_guardian_set_index,
                new_guardian_set,
            } => self
                .guardian_sets
                .check_upgrade(*new_guardian_set_index, new_guardian_set),
            _ => self.state.check(&self.config, action),
        }
    }

    fn apply_action(&mut self, action: &Action, now: u32) -> Result<(), VaaError> {
        match action {
            Action::UpgradeGuardianSet {
                new_guardian_set_index,
                new_guardian_set,
            } => self.guardian_sets.activate(
                GuardianSet::new(*new_guardian_set_index, new_guardian_set.clone()),
                now,
            ),
            Action::RecoverChainId { new_chain_id, .. } => {
                self.state.apply(&self.config, action);
                info!(
                    "chain id recovered: {} -> {}",
                    self.config.chain_id, new_chain_id
                );
                self.config.chain_id = *new_chain_id;
                Ok(())
            }
            _ => {
                self.state.apply(&self.config, action);
                Ok(())
            }
        }
    }

    /// Decodes `data` and routes it: governance VAAs are dispatched, everything else is redeemed.
    pub fn submit_vaa(&mut self, data: &[u8], now: u32) -> Result<Submitted, VaaError> {
        let vaa = Vaa::from_bytes(data)?;

        if self
            .config
            .is_governance_emitter(vaa.emitter_chain, &vaa.emitter_address)
        {
            self.dispatch(&vaa, now).map(Submitted::Governance)
        } else {
            let verified = self.redeem(&vaa, now)?;
            Ok(Submitted::Message { vaa, verified })
        }
    }

    /// Submits VAAs one after the other. Each result is independent of the others, except that
    /// a governance action applied earlier in the batch is in effect for later entries.
    pub fn submit_batch<I, B>(&mut self, batch: I, now: u32) -> Vec<Result<Submitted, VaaError>>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        batch
            .into_iter()
            .map(|data| self.submit_vaa(data.as_ref(), now))
            .collect()
    }
}

#[cfg(feature = "parallel")]
impl<S, C, L> Contract<S, C, L>
where
    S: GuardianSetStore + Sync,
    C: ClaimStore + Sync,
    L: ChainState + Sync,
{
    /// Redeems independent application messages in parallel.
    pub fn redeem_batch(&self, vaas: &[Vaa], now: u32) -> Vec<Result<Verified, VaaError>> {
        use rayon::prelude::*;

        vaas.par_iter().map(|vaa| self.redeem(vaa, now)).collect()
    }
}

#[cfg(not(feature = "parallel"))]
impl<S, C, L> Contract<S, C, L>
where
    S: GuardianSetStore,
    C: ClaimStore,
    L: ChainState,
{
    /// Redeems independent application messages.
    pub fn redeem_batch(&self, vaas: &[Vaa], now: u32) -> Vec<Result<Verified, VaaError>> {
        vaas.iter().map(|vaa| self.redeem(vaa, now)).collect()
    }
}
