//! Test harness for code that consumes VAAs.
//!
//! [`MockGuardianSet`] holds real secp256k1 keys and signs like a guardian network would.
//! [`TestVaa`] builds a body and signs it with any subset of a mock set, in any order, so
//! tests can produce both valid VAAs and every flavour of invalid one. Nothing here is global:
//! every helper takes the guardian set it signs with.

use anyhow::{ensure, Context};
use k256::ecdsa::SigningKey;
use sha3::{Digest as Sha3Digest, Keccak256};
use vaa_core::{
    guardian_address, Action, Address, Amount, Body, Chain, Digest, GovernancePacket,
    GuardianAddress, GuardianSet, Module, Signature, Vaa, GOVERNANCE_EMITTER,
};

/// Well known keys for a 7 guardian test network.
pub fn default_guardian_keys() -> [SigningKey; 7] {
    [
        "5dd9bde0a8519d5dee268f08b65e454de8c7eece0f87dd3a2b4a008136c63ee2",
        "963087dfc2baf38bb1087e20d2392a1c1d66c4c96a882895da96f0d5c080a1f5",
        "7933c75dede33edc8081c304bea3fe0cd4e0bc4c8df2e579c005a1b088635335",
        "e0b40472d7a1b80cda60148d9af22ee6a7a5368d6c40921bc159fb8bea847c1e",
        "450111b3132f382fffdb8f597336f2d1a383e11e3bc3d98da7fd065ffc3407df",
        "b503a57d0fc89b389dcc69ddcb95d7afdce4c825a927447f84c4cbe89b3743fd",
        "4851af6b176cb24220350e75e9217266445953c981393882d6d4ac101716eaa0",
    ]
    .map(|k| key_from_hex(k).expect("valid test key"))
}

/// The single guardian of a local development network.
pub fn devnet_guardian_key() -> SigningKey {
    key_from_hex("cfb12303a19cde580bb4dd771639b0d26bc68353645571a8cff516ab2ee113a0")
        .expect("valid devnet key")
}

fn key_from_hex(s: &str) -> anyhow::Result<SigningKey> {
    let bytes = hex::decode(s).context("invalid hex")?;
    SigningKey::from_slice(&bytes).context("invalid secp256k1 key")
}

/// A guardian set whose private keys are known.
#[derive(Debug, Clone)]
pub struct MockGuardianSet {
    pub index: u32,
    pub keys: Vec<SigningKey>,
}

impl MockGuardianSet {
    pub fn new(index: u32, keys: Vec<SigningKey>) -> Self {
        MockGuardianSet { index, keys }
    }

    /// The 7 guardians of [`default_guardian_keys`].
    pub fn default_set(index: u32) -> Self {
        Self::new(index, default_guardian_keys().to_vec())
    }

    /// `n` deterministic keys derived from `seed`.
    pub fn generate(index: u32, n: usize, seed: &[u8]) -> Self {
        let keys = (0..n as u64)
            .map(|i| {
                // The chance of a hash not being a valid scalar is negligible, but rehash until
                // it is rather than panic.
                let mut material: [u8; 32] = Keccak256::new()
                    .chain_update(seed)
                    .chain_update(i.to_be_bytes())
                    .finalize()
                    .into();
                loop {
                    if let Ok(key) = SigningKey::from_slice(&material) {
                        break key;
                    }
                    material = Keccak256::digest(material).into();
                }
            })
            .collect();

        Self::new(index, keys)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn quorum(&self) -> usize {
        self.guardian_set().quorum()
    }

    pub fn addresses(&self) -> Vec<GuardianAddress> {
        self.keys
            .iter()
            .map(|k| guardian_address(k.verifying_key()))
            .collect()
    }

    /// The public guardian set, as a destination chain would store it.
    pub fn guardian_set(&self) -> GuardianSet {
        GuardianSet::new(self.index, self.addresses())
    }

    /// Signs `digest` with the guardians at `indices`, in exactly that order. Out of range
    /// indices are an error, duplicates and disorder are not.
    pub fn sign_with(&self, digest: &Digest, indices: &[u8]) -> anyhow::Result<Vec<Signature>> {
        indices
            .iter()
            .map(|&index| {
                let key = self
                    .keys
                    .get(usize::from(index))
                    .with_context(|| format!("no guardian at index {index}"))?;
                sign_digest(key, index, digest)
            })
            .collect()
    }

    /// Signs `digest` with every guardian.
    pub fn sign(&self, digest: &Digest) -> anyhow::Result<Vec<Signature>> {
        let indices = self.indices(self.len())?;
        self.sign_with(digest, &indices)
    }

    /// Signs `digest` with the first `n` guardians.
    pub fn sign_first(&self, digest: &Digest, n: usize) -> anyhow::Result<Vec<Signature>> {
        ensure!(n <= self.len(), "only {} guardians, asked for {n}", self.len());
        let indices = self.indices(n)?;
        self.sign_with(digest, &indices)
    }

    fn indices(&self, n: usize) -> anyhow::Result<Vec<u8>> {
        (0..n)
            .map(|i| u8::try_from(i).context("more than 256 guardians"))
            .collect()
    }
}

/// Signs like a guardian: over the double keccak of the body, with a recovery id.
pub fn sign_digest(key: &SigningKey, index: u8, digest: &Digest) -> anyhow::Result<Signature> {
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(&digest.secp256k_hash)
        .context("signing failed")?;

    let mut rsv = [0u8; 65];
    rsv[..64].copy_from_slice(&sig.to_bytes());
    rsv[64] = recovery_id.to_byte();
    Ok(Signature::from_rsv(index, rsv))
}

/// An unsigned VAA under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVaa {
    pub body: Body,
}

impl TestVaa {
    pub fn new(emitter_chain: Chain, emitter_address: Address, sequence: u64, payload: Vec<u8>) -> Self {
        TestVaa {
            body: Body {
                timestamp: 1,
                nonce: 0,
                emitter_chain,
                emitter_address,
                sequence,
                consistency_level: 1,
                payload,
            },
        }
    }

    /// A VAA from the governance emitter carrying `packet`.
    pub fn governance(packet: &GovernancePacket, sequence: u64) -> anyhow::Result<Self> {
        let payload = packet.to_bytes().context("failed to encode governance packet")?;
        Ok(TestVaa::new(Chain::Solana, GOVERNANCE_EMITTER, sequence, payload).consistency_level(0))
    }

    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.body.timestamp = timestamp;
        self
    }

    pub fn nonce(mut self, nonce: u32) -> Self {
        self.body.nonce = nonce;
        self
    }

    pub fn consistency_level(mut self, consistency_level: u8) -> Self {
        self.body.consistency_level = consistency_level;
        self
    }

    pub fn digest(&self) -> Digest {
        self.body.digest()
    }

    /// Signs with every guardian of `guardians`.
    pub fn sign(&self, guardians: &MockGuardianSet) -> anyhow::Result<Vaa> {
        let signatures = guardians.sign(&self.digest())?;
        Ok(self.with_signatures(guardians.index, signatures))
    }

    /// Signs with exactly a quorum of `guardians`, lowest indices first.
    pub fn sign_quorum(&self, guardians: &MockGuardianSet) -> anyhow::Result<Vaa> {
        let signatures = guardians.sign_first(&self.digest(), guardians.quorum())?;
        Ok(self.with_signatures(guardians.index, signatures))
    }

    /// Signs with the guardians at `indices`, in that order.
    pub fn sign_with(&self, guardians: &MockGuardianSet, indices: &[u8]) -> anyhow::Result<Vaa> {
        let signatures = guardians.sign_with(&self.digest(), indices)?;
        Ok(self.with_signatures(guardians.index, signatures))
    }

    /// Attaches `signatures` as they are.
    pub fn with_signatures(&self, guardian_set_index: u32, signatures: Vec<Signature>) -> Vaa {
        Vaa {
            version: 1,
            guardian_set_index,
            signatures,
            timestamp: self.body.timestamp,
            nonce: self.body.nonce,
            emitter_chain: self.body.emitter_chain,
            emitter_address: self.body.emitter_address,
            sequence: self.body.sequence,
            consistency_level: self.body.consistency_level,
            payload: self.body.payload.clone(),
        }
    }
}

/// Governance packets for tests.
pub mod governance {
    use super::*;

    pub fn upgrade_guardian_set(new_index: u32, guardians: &MockGuardianSet) -> GovernancePacket {
        GovernancePacket {
            module: Module::CORE,
            chain: Chain::Any,
            action: Action::UpgradeGuardianSet {
                new_guardian_set_index: new_index,
                new_guardian_set: guardians.addresses(),
            },
        }
    }

    pub fn upgrade_contract(module: Module, chain: Chain, new_contract: Address) -> GovernancePacket {
        GovernancePacket {
            module,
            chain,
            action: Action::UpgradeContract { new_contract },
        }
    }

    pub fn register_chain(module: Module, chain: Chain, emitter_address: Address) -> GovernancePacket {
        GovernancePacket {
            module,
            chain: Chain::Any,
            action: Action::RegisterChain {
                chain,
                emitter_address,
            },
        }
    }

    pub fn set_message_fee(chain: Chain, amount: u128) -> GovernancePacket {
        GovernancePacket {
            module: Module::CORE,
            chain,
            action: Action::SetMessageFee {
                amount: Amount::from(amount),
            },
        }
    }

    pub fn transfer_fees(chain: Chain, amount: u128, recipient: Address) -> GovernancePacket {
        GovernancePacket {
            module: Module::CORE,
            chain,
            action: Action::TransferFees {
                amount: Amount::from(amount),
                recipient,
            },
        }
    }

    pub fn recover_chain_id(module: Module, evm_chain_id: u128, new_chain_id: Chain) -> GovernancePacket {
        GovernancePacket {
            module,
            chain: Chain::Any,
            action: Action::RecoverChainId {
                evm_chain_id: Amount::from(evm_chain_id),
                new_chain_id,
            },
        }
    }
}
