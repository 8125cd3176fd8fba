//! Replay protection.
//!
//! A VAA is identified by its emitter and sequence. The first time a destination applies a VAA
//! it records a claim for that key; any later attempt with the same key is rejected. Claims are
//! local to a destination, so the same VAA can be redeemed once on every chain.

use std::{
    collections::{hash_map::RandomState, HashSet},
    fmt,
    hash::BuildHasher,
    sync::{Mutex, PoisonError},
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{Address, Chain, VaaError};

const DEFAULT_SHARDS: usize = 64;

/// The key under which a consumed VAA is recorded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimKey {
    pub emitter_chain: Chain,
    pub emitter_address: Address,
    pub sequence: u64,
}

/// Formats as `chain/emitter/sequence`, with the chain id as a number and the emitter in hex.
impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            u16::from(self.emitter_chain),
            self.emitter_address,
            self.sequence
        )
    }
}

/// Storage for claims.
///
/// `put` must be atomic with respect to other `put`s of the same key: of any number of
/// concurrent calls for one key, exactly one returns `true`.
pub trait ClaimStore {
    fn exists(&self, key: &ClaimKey) -> bool;

    /// Records `key`. Returns `false` if it was already present.
    fn put(&self, key: ClaimKey) -> bool;
}

/// An in-memory claim store.
///
/// Keys are spread over a fixed number of independently locked shards, so claims on unrelated
/// keys rarely contend.
#[derive(Debug)]
pub struct MemoryClaimStore {
    shards: Box<[Mutex<HashSet<ClaimKey>>]>,
    hasher: RandomState,
}

impl Default for MemoryClaimStore {
    fn default() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shards(shards: usize) -> Self {
        MemoryClaimStore {
            shards: (0..shards.max(1))
                .map(|_| Mutex::new(HashSet::new()))
                .collect(),
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, key: &ClaimKey) -> &Mutex<HashSet<ClaimKey>> {
        let idx = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[idx]
    }

    /// Number of claims recorded.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClaimStore for MemoryClaimStore {
    fn exists(&self, key: &ClaimKey) -> bool {
        self.shard(key)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    fn put(&self, key: ClaimKey) -> bool {
        self.shard(&key)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }
}

impl<T: ClaimStore + ?Sized> ClaimStore for &T {
    fn exists(&self, key: &ClaimKey) -> bool {
        (**self).exists(key)
    }

    fn put(&self, key: ClaimKey) -> bool {
        (**self).put(key)
    }
}

/// Atomically claims `key`, failing with `AlreadyConsumed` if it was claimed before.
pub fn check_and_consume<C: ClaimStore + ?Sized>(claims: &C, key: ClaimKey) -> Result<(), VaaError> {
    if claims.put(key) {
        Ok(())
    } else {
        warn!("replayed VAA {key}");
        Err(VaaError::AlreadyConsumed(key))
    }
}
