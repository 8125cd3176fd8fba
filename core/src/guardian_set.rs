//! Guardian sets and their history.

use std::collections::{BTreeMap, HashSet};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{require, VaaError},
    GuardianAddress,
};

/// A versioned set of keys that can sign VAAs.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct GuardianSet {
    pub index: u32,
    /// Guardian addresses, in signing order. A signature's `index` points into this list.
    pub addresses: Vec<GuardianAddress>,
    pub creation_time: u32,
    /// Zero while the set is current. Set once, when the set is superseded.
    pub expiration_time: u32,
}

impl GuardianSet {
    pub fn new(index: u32, addresses: Vec<GuardianAddress>) -> Self {
        GuardianSet {
            index,
            addresses,
            creation_time: 0,
            expiration_time: 0,
        }
    }

    /// Minimum number of signatures a VAA needs: strictly more than two thirds.
    pub fn quorum(&self) -> usize {
        (self.addresses.len() * 2) / 3 + 1
    }

    /// A set stays usable up to and including its expiration time.
    pub fn is_active(&self, now: u32) -> bool {
        self.expiration_time == 0 || now <= self.expiration_time
    }

    pub fn num_guardians(&self) -> usize {
        self.addresses.len()
    }
}

/// Anything a verifier can look guardian sets up in.
pub trait GuardianSetLookup {
    fn guardian_set(&self, index: u32) -> Option<GuardianSet>;
}

/// A single set answers for its own index only.
impl GuardianSetLookup for GuardianSet {
    fn guardian_set(&self, index: u32) -> Option<GuardianSet> {
        (self.index == index).then(|| self.clone())
    }
}

impl<T: GuardianSetLookup + ?Sized> GuardianSetLookup for &T {
    fn guardian_set(&self, index: u32) -> Option<GuardianSet> {
        (**self).guardian_set(index)
    }
}

/// Persistent storage for guardian sets, keyed by index.
pub trait GuardianSetStore {
    fn get(&self, index: u32) -> Option<GuardianSet>;

    fn put(&mut self, set: GuardianSet);

    fn exists(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    fn current_index(&self) -> Option<u32>;

    fn set_current_index(&mut self, index: u32);
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryGuardianSetStore {
    sets: BTreeMap<u32, GuardianSet>,
    current: Option<u32>,
}

impl MemoryGuardianSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose only entry is `genesis`, which is also the current set.
    pub fn with_genesis(genesis: GuardianSet) -> Self {
        let mut store = Self::new();
        store.set_current_index(genesis.index);
        store.put(genesis);
        store
    }
}

impl GuardianSetStore for MemoryGuardianSetStore {
    fn get(&self, index: u32) -> Option<GuardianSet> {
        self.sets.get(&index).cloned()
    }

    fn put(&mut self, set: GuardianSet) {
        self.sets.insert(set.index, set);
    }

    fn exists(&self, index: u32) -> bool {
        self.sets.contains_key(&index)
    }

    fn current_index(&self) -> Option<u32> {
        self.current
    }

    fn set_current_index(&mut self, index: u32) {
        self.current = Some(index);
    }
}

/// The history of guardian sets known to a destination chain.
///
/// Sets are never removed. Activating a new set gives the previous one an expiration time
/// `grace_period` seconds in the future, during which VAAs signed by either set are accepted.
#[derive(Debug, Clone)]
pub struct GuardianSetRegistry<S = MemoryGuardianSetStore> {
    store: S,
    grace_period: u32,
}

impl<S: GuardianSetStore> GuardianSetRegistry<S> {
    pub fn new(store: S, grace_period: u32) -> Self {
        GuardianSetRegistry {
            store,
            grace_period,
        }
    }

    pub fn grace_period(&self) -> u32 {
        self.grace_period
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn current_index(&self) -> Result<u32, VaaError> {
        self.store
            .current_index()
            .ok_or(VaaError::NoCurrentGuardianSet)
    }

    pub fn current(&self) -> Result<GuardianSet, VaaError> {
        let index = self.current_index()?;
        self.get(index)
    }

    pub fn get(&self, index: u32) -> Result<GuardianSet, VaaError> {
        self.store
            .get(index)
            .ok_or(VaaError::UnknownGuardianSet(index))
    }

    /// Checks that `new_index` and `addresses` may replace the current set.
    pub fn check_upgrade(
        &self,
        new_index: u32,
        addresses: &[GuardianAddress],
    ) -> Result<(), VaaError> {
        let current = self.current_index()?;
        let expected = current.wrapping_add(1);
        require!(
            new_index == expected && !self.store.exists(new_index),
            VaaError::InvalidGuardianSetIndex {
                expected,
                found: new_index,
            }
        );
        require!(!addresses.is_empty(), VaaError::ZeroGuardians);

        let mut seen = HashSet::with_capacity(addresses.len());
        for addr in addresses {
            require!(!addr.is_zero(), VaaError::GuardianZeroAddress);
            require!(seen.insert(addr), VaaError::DuplicateGuardianAddress(*addr));
        }

        Ok(())
    }

    /// Makes `new_set` the current set as of `now`.
    ///
    /// The previous set expires `grace_period` seconds from `now`. `new_set` gets its creation
    /// time from `now` and no expiration.
    pub fn activate(&mut self, new_set: GuardianSet, now: u32) -> Result<(), VaaError> {
        self.check_upgrade(new_set.index, &new_set.addresses)?;

        let mut previous = self.current()?;
        previous.expiration_time = now.saturating_add(self.grace_period);

        let new_set = GuardianSet {
            creation_time: now,
            expiration_time: 0,
            ..new_set
        };

        info!(
            "guardian set {} ({} guardians) is now current, set {} expires at {}",
            new_set.index,
            new_set.num_guardians(),
            previous.index,
            previous.expiration_time
        );

        let index = new_set.index;
        self.store.put(previous);
        self.store.put(new_set);
        self.store.set_current_index(index);
        Ok(())
    }
}

impl<S: GuardianSetStore> GuardianSetLookup for GuardianSetRegistry<S> {
    fn guardian_set(&self, index: u32) -> Option<GuardianSet> {
        self.store.get(index)
    }
}
