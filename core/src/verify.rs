//! Signature verification.
//!
//! Verification is pure: it reads guardian sets but never changes them, and it knows nothing
//! about claims. It is safe to run for many VAAs at once.

use k256::{
    ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use log::debug;
use sha3::{Digest as Sha3Digest, Keccak256};

use crate::{
    codec::CodecError,
    error::{require, VaaError},
    guardian_set::{GuardianSet, GuardianSetLookup},
    vaa::{Digest, Signature, Vaa, VAA_VERSION},
    GuardianAddress,
};

/// The Ethereum-style address of a public key: the last 20 bytes of the keccak256 hash of the
/// uncompressed point, without its 0x04 prefix.
pub fn guardian_address(key: &VerifyingKey) -> GuardianAddress {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    GuardianAddress(addr)
}

/// Recovers the address that produced `sig` over `secp256k_hash`.
pub fn recover_guardian_address(
    secp256k_hash: &[u8; 32],
    sig: &Signature,
) -> Result<GuardianAddress, VaaError> {
    let signature =
        EcdsaSignature::from_slice(&sig.rs()).map_err(|_| VaaError::InvalidSignature)?;
    let recovery_id = RecoveryId::from_byte(sig.recovery_id).ok_or(VaaError::InvalidSignature)?;
    let key = VerifyingKey::recover_from_prehash(secp256k_hash, &signature, recovery_id)
        .map_err(|_| VaaError::InvalidSignature)?;

    Ok(guardian_address(&key))
}

/// Checks `signatures` over `digest` against `guardian_set`.
///
/// Every signature must come from the guardian at its index, indices must be strictly
/// increasing, and there must be at least a quorum of them.
pub fn verify_signatures(
    digest: &Digest,
    signatures: &[Signature],
    guardian_set: &GuardianSet,
) -> Result<(), VaaError> {
    let mut last_index: Option<u8> = None;

    for sig in signatures {
        if let Some(last) = last_index {
            require!(sig.index > last, VaaError::InvalidSignature);
        }
        last_index = Some(sig.index);

        let expected = guardian_set
            .addresses
            .get(usize::from(sig.index))
            .ok_or(VaaError::InvalidSignature)?;
        let signer = recover_guardian_address(&digest.secp256k_hash, sig)?;
        require!(signer == *expected, VaaError::InvalidSignature);
    }

    let quorum = guardian_set.quorum();
    require!(
        signatures.len() >= quorum,
        VaaError::NoQuorum {
            signatures: signatures.len(),
            quorum,
        }
    );

    Ok(())
}

/// Verifies `vaa` against the guardian set it names, as of `now`, and returns its digest.
pub fn verify<L: GuardianSetLookup + ?Sized>(
    vaa: &Vaa,
    guardian_sets: &L,
    now: u32,
) -> Result<Digest, VaaError> {
    // Decoding already refuses other versions, but a `Vaa` can be built by hand.
    require!(
        vaa.version == VAA_VERSION,
        CodecError::UnsupportedVersion(vaa.version)
    );

    let guardian_set = guardian_sets
        .guardian_set(vaa.guardian_set_index)
        .ok_or(VaaError::UnknownGuardianSet(vaa.guardian_set_index))?;

    require!(
        guardian_set.is_active(now),
        VaaError::GuardianSetExpired {
            index: guardian_set.index,
            expiration_time: guardian_set.expiration_time,
        }
    );

    let digest = vaa.digest();
    verify_signatures(&digest, &vaa.signatures, &guardian_set)?;

    debug!(
        "verified VAA {} with {}/{} signatures from guardian set {}",
        vaa.message_id(),
        vaa.signatures.len(),
        guardian_set.num_guardians(),
        guardian_set.index
    );
    Ok(digest)
}

/// Verifies independent VAAs. Results are in input order, and one failure has no bearing on the
/// others.
#[cfg(feature = "parallel")]
pub fn verify_batch<L>(vaas: &[Vaa], guardian_sets: &L, now: u32) -> Vec<Result<Digest, VaaError>>
where
    L: GuardianSetLookup + Sync + ?Sized,
{
    use rayon::prelude::*;

    vaas.par_iter()
        .map(|vaa| verify(vaa, guardian_sets, now))
        .collect()
}

/// Verifies independent VAAs. Results are in input order, and one failure has no bearing on the
/// others.
#[cfg(not(feature = "parallel"))]
pub fn verify_batch<L>(vaas: &[Vaa], guardian_sets: &L, now: u32) -> Vec<Result<Digest, VaaError>>
where
    L: GuardianSetLookup + ?Sized,
{
    vaas.iter()
        .map(|vaa| verify(vaa, guardian_sets, now))
        .collect()
}
