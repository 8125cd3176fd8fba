//! VAA's represent a collection of signatures combined with a message and its metadata. VAA's are
//! used as a form of proof; by submitting a VAA to a target contract, the receiving contract can
//! make assumptions about the validity of state on the source chain.
//!
//! The wire layout is:
//! ```markdown
//! version:u8 guardian_set_index:u32 num_signatures:u8 signatures[num_signatures] body
//! signature := index:u8 r:32 s:32 recovery_id:u8
//! body      := timestamp:u32 nonce:u32 emitter_chain:u16 emitter_address:32
//!              sequence:u64 consistency_level:u8 payload:rest
//! ```
//! All integers are big-endian. Only the body is signed.

use serde::{Deserialize, Serialize};
use sha3::Digest as Sha3Digest;

use crate::{
    claim::ClaimKey,
    codec::{self, encode_len, CodecError, Decode, Encode},
    Address, Chain,
};

/// The only VAA version this crate understands.
pub const VAA_VERSION: u8 = 1;

/// Bytes taken by a signature on the wire.
pub const SIGNATURE_LEN: usize = 66;

/// Bytes taken by the fixed part of a body, before the payload.
pub const BODY_HEADER_LEN: usize = 51;

/// Signatures are ECDSA signatures over the body digest, prefixed with the position of the
/// guardian in its set.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature {
    pub index: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl Signature {
    /// Split a 65 byte `r || s || v` signature.
    pub fn from_rsv(index: u8, rsv: [u8; 65]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&rsv[..32]);
        s.copy_from_slice(&rsv[32..64]);
        Signature {
            index,
            r,
            s,
            recovery_id: rsv[64],
        }
    }

    /// The 64 byte `r || s` form expected by ECDSA libraries.
    pub fn rs(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}

impl Decode for Signature {
    fn decode(buf: &mut &[u8]) -> codec::Result<Self> {
        Ok(Signature {
            index: u8::decode(buf)?,
            r: Decode::decode(buf)?,
            s: Decode::decode(buf)?,
            recovery_id: u8::decode(buf)?,
        })
    }
}

impl Encode for Signature {
    fn encode(&self, out: &mut Vec<u8>) -> codec::Result<()> {
        self.index.encode(out)?;
        self.r.encode(out)?;
        self.s.encode(out)?;
        self.recovery_id.encode(out)
    }

    fn encoded_len_hint(&self) -> usize {
        SIGNATURE_LEN
    }
}

/// The core VAA itself. This structure is what is received by a contract on the receiving side of
/// a message passing flow.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Vaa {
    // The signed part is only the body; keeping the fields flat mirrors the wire layout and
    // `From` converts to and from `(Header, Body)`.
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<Signature>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: Chain,
    pub emitter_address: Address,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
}

/// The header for a VAA.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<Signature>,
}

/// The body for a VAA.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Body {
    /// Seconds since UNIX epoch.
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: Chain,
    pub emitter_address: Address,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
}

/// Digest data for the Body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    /// Guardians don't sign the body directly, they hash it and sign the hash. This is the value
    /// that identifies a VAA across the network.
    pub hash: [u8; 32],

    /// The hash of `hash`. secp256k1 signing hashes its input once more before signing, so this
    /// is the prehash that signatures are actually made over and recovered from.
    pub secp256k_hash: [u8; 32],
}

/// Calculates the digest of an encoded body.
pub fn digest(body: &[u8]) -> Digest {
    let hash: [u8; 32] = sha3::Keccak256::digest(body).into();
    let secp256k_hash: [u8; 32] = sha3::Keccak256::digest(hash).into();

    Digest {
        hash,
        secp256k_hash,
    }
}

impl Vaa {
    /// The replay protection key of this VAA.
    pub fn message_id(&self) -> ClaimKey {
        ClaimKey {
            emitter_chain: self.emitter_chain,
            emitter_address: self.emitter_address,
            sequence: self.sequence,
        }
    }

    /// Copies out the header.
    pub fn header(&self) -> Header {
        Header {
            version: self.version,
            guardian_set_index: self.guardian_set_index,
            signatures: self.signatures.clone(),
        }
    }

    /// Copies out the body.
    pub fn body(&self) -> Body {
        Body {
            timestamp: self.timestamp,
            nonce: self.nonce,
            emitter_chain: self.emitter_chain,
            emitter_address: self.emitter_address,
            sequence: self.sequence,
            consistency_level: self.consistency_level,
            payload: self.payload.clone(),
        }
    }

    /// The encoded body, i.e. the bytes guardians sign.
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body().to_bytes()
    }

    pub fn digest(&self) -> Digest {
        digest(&self.body_bytes())
    }
}

impl Body {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len_hint());
        self.write(&mut out);
        out
    }

    pub fn digest(&self) -> Digest {
        digest(&self.to_bytes())
    }

    // Nothing in a body is length prefixed, so writing it cannot fail.
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&u16::from(self.emitter_chain).to_be_bytes());
        out.extend_from_slice(&self.emitter_address.0);
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.push(self.consistency_level);
        out.extend_from_slice(&self.payload);
    }
}

impl Decode for Header {
    fn decode(buf: &mut &[u8]) -> codec::Result<Self> {
        let version = u8::decode(buf)?;
        if version != VAA_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let guardian_set_index = u32::decode(buf)?;
        let len = u8::decode(buf)?;
        let signatures = (0..len)
            .map(|_| Signature::decode(buf))
            .collect::<codec::Result<Vec<_>>>()?;

        Ok(Header {
            version,
            guardian_set_index,
            signatures,
        })
    }
}

impl Encode for Header {
    fn encode(&self, out: &mut Vec<u8>) -> codec::Result<()> {
        self.version.encode(out)?;
        self.guardian_set_index.encode(out)?;
        encode_len("signatures", self.signatures.len(), out)?;
        for sig in &self.signatures {
            sig.encode(out)?;
        }
        Ok(())
    }

    fn encoded_len_hint(&self) -> usize {
        6 + SIGNATURE_LEN * self.signatures.len()
    }
}

impl Decode for Body {
    /// The payload is everything left in `buf`.
    fn decode(buf: &mut &[u8]) -> codec::Result<Self> {
        let timestamp = u32::decode(buf)?;
        let nonce = u32::decode(buf)?;
        let emitter_chain = Chain::from(u16::decode(buf)?);
        let emitter_address = Address(Decode::decode(buf)?);
        let sequence = u64::decode(buf)?;
        let consistency_level = u8::decode(buf)?;
        let payload = core::mem::take(buf).to_vec();

        Ok(Body {
            timestamp,
            nonce,
            emitter_chain,
            emitter_address,
            sequence,
            consistency_level,
            payload,
        })
    }
}

impl Encode for Body {
    fn encode(&self, out: &mut Vec<u8>) -> codec::Result<()> {
        self.write(out);
        Ok(())
    }

    fn encoded_len_hint(&self) -> usize {
        BODY_HEADER_LEN + self.payload.len()
    }
}

impl Decode for Vaa {
    fn decode(buf: &mut &[u8]) -> codec::Result<Self> {
        let header = Header::decode(buf)?;
        let body = Body::decode(buf)?;
        Ok((header, body).into())
    }
}

impl Encode for Vaa {
    fn encode(&self, out: &mut Vec<u8>) -> codec::Result<()> {
        self.header().encode(out)?;
        self.body().encode(out)
    }

    fn encoded_len_hint(&self) -> usize {
        6 + SIGNATURE_LEN * self.signatures.len() + BODY_HEADER_LEN + self.payload.len()
    }
}

impl Vaa {
    /// Parse a complete VAA.
    pub fn from_bytes(bytes: &[u8]) -> Result<Vaa, CodecError> {
        codec::from_slice(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::to_vec(self)
    }
}

impl From<Vaa> for (Header, Body) {
    fn from(v: Vaa) -> Self {
        (
            Header {
                version: v.version,
                guardian_set_index: v.guardian_set_index,
                signatures: v.signatures,
            },
            Body {
                timestamp: v.timestamp,
                nonce: v.nonce,
                emitter_chain: v.emitter_chain,
                emitter_address: v.emitter_address,
                sequence: v.sequence,
                consistency_level: v.consistency_level,
                payload: v.payload,
            },
        )
    }
}

impl From<(Header, Body)> for Vaa {
    fn from((hdr, body): (Header, Body)) -> Self {
        Vaa {
            version: hdr.version,
            guardian_set_index: hdr.guardian_set_index,
            signatures: hdr.signatures,
            timestamp: body.timestamp,
            nonce: body.nonce,
            emitter_chain: body.emitter_chain,
            emitter_address: body.emitter_address,
            sequence: body.sequence,
            consistency_level: body.consistency_level,
            payload: body.payload,
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use hex_literal::hex;

    use super::*;
    use crate::GOVERNANCE_EMITTER;

    /// Mainnet core contract upgrade for Fantom, signed by guardian set 0.
    pub(crate) const CONTRACT_UPGRADE_VAA: [u8; 190] = hex!(
        "01000000000100e3db309303b712a562e6aa2adc68bc10ff22328ab31ddb6a83706943a9da97bf11ba6e3b96"
        "395515868786898dc19ecd737d197b0d1a1f3f3c6aead5c1fe7009000000000100000001000100000000000000"
        "000000000000000000000000000000000000000000000000040000000004c5d05a000000000000000000000000"
        "0000000000000000000000000000000000436f726501000a0000000000000000000000000046da7a0320dd9994"
        "38b4435dac82bf1dac13d2"
    );

    #[test]
    fn decode_contract_upgrade() {
        let vaa = Vaa::from_bytes(&CONTRACT_UPGRADE_VAA).unwrap();

        assert_eq!(1, vaa.version);
        assert_eq!(0, vaa.guardian_set_index);
        assert_eq!(1, vaa.signatures.len());
        assert_eq!(0, vaa.signatures[0].index);
        assert_eq!(0, vaa.signatures[0].recovery_id);
        assert_eq!(
            hex!("e3db309303b712a562e6aa2adc68bc10ff22328ab31ddb6a83706943a9da97bf"),
            vaa.signatures[0].r
        );
        assert_eq!(1, vaa.timestamp);
        assert_eq!(1, vaa.nonce);
        assert_eq!(Chain::Solana, vaa.emitter_chain);
        assert_eq!(GOVERNANCE_EMITTER, vaa.emitter_address);
        assert_eq!(80_072_794, vaa.sequence);
        assert_eq!(0, vaa.consistency_level);
        assert_eq!(67, vaa.payload.len());

        assert_eq!(&CONTRACT_UPGRADE_VAA[..], &vaa.to_bytes().unwrap()[..]);
        assert_eq!(
            hex!("0fa21987c547cc5f4a5e4760357c4941e1666bd96c7a864e02a92a0411ddc2b1"),
            vaa.digest().secp256k_hash
        );
    }

    #[test]
    fn header_body_split() {
        let vaa = Vaa::from_bytes(&CONTRACT_UPGRADE_VAA).unwrap();
        let (header, body): (Header, Body) = vaa.clone().into();

        assert_eq!(&CONTRACT_UPGRADE_VAA[6 + SIGNATURE_LEN..], &body.to_bytes()[..]);
        assert_eq!(
            &CONTRACT_UPGRADE_VAA[..6 + SIGNATURE_LEN],
            &codec::to_vec(&header).unwrap()[..]
        );
        assert_eq!(vaa.digest(), body.digest());
        assert_eq!(header, vaa.header());
        assert_eq!(body, vaa.body());
        assert_eq!(vaa, Vaa::from((header, body)));
    }

    #[test]
    fn stable_digest() {
        let data = hex!(
            "000000010000000100010000000000000000000000000000000000000000000000000000000000000004"
            "0000000003b456b800000000000000000000000000000000000000000000546f6b656e42726964676501"
            "000000020000000000000000000000000290fb167208af455bb137780163b7b7a9a10c16"
        );

        assert_eq!(
            hex!("05d1fcc531746c7efd7feea20a81d2799f777f302b8a6a6424b81209dc3f511f"),
            digest(&data).secp256k_hash
        );

        let body: Body = codec::from_slice(&data).unwrap();
        assert_eq!(Chain::Solana, body.emitter_chain);
        assert_eq!(GOVERNANCE_EMITTER, body.emitter_address);
        assert_eq!(62_150_328, body.sequence);
        assert_eq!(&data[51..], &body.payload[..]);
    }

    #[test]
    fn empty_payload() {
        let vaa = Vaa {
            version: 1,
            emitter_chain: Chain::Ethereum,
            ..Default::default()
        };
        let bytes = vaa.to_bytes().unwrap();
        assert_eq!(6 + BODY_HEADER_LEN, bytes.len());
        assert_eq!(vaa, Vaa::from_bytes(&bytes).unwrap());
    }

    #[test]
    fn unknown_alias_of_listed_chain() {
        let vaa = Vaa {
            version: 1,
            emitter_chain: Chain::Unknown(2),
            sequence: 5,
            ..Default::default()
        };
        let decoded = Vaa::from_bytes(&vaa.to_bytes().unwrap()).unwrap();

        assert!(matches!(decoded.emitter_chain, Chain::Ethereum));
        assert_eq!(vaa, decoded);
        assert_eq!(vaa.message_id(), decoded.message_id());
        assert_eq!(vaa.digest(), decoded.digest());
    }

    #[test]
    fn truncation_is_malformed() {
        for len in 0..(6 + SIGNATURE_LEN + BODY_HEADER_LEN) {
            assert!(
                matches!(
                    Vaa::from_bytes(&CONTRACT_UPGRADE_VAA[..len]),
                    Err(CodecError::UnexpectedEof { .. })
                ),
                "prefix of {len} bytes decoded"
            );
        }
    }

    #[test]
    fn unsupported_version() {
        let mut bytes = CONTRACT_UPGRADE_VAA;
        bytes[0] = 2;
        assert_eq!(
            Err(CodecError::UnsupportedVersion(2)),
            Vaa::from_bytes(&bytes)
        );
    }

    #[test]
    fn signature_count_mismatch() {
        // Claims two signatures but only carries one, so the body is read as a signature.
        let mut bytes = CONTRACT_UPGRADE_VAA.to_vec();
        bytes[5] = 2;
        bytes.truncate(6 + 2 * SIGNATURE_LEN + 10);
        assert!(matches!(
            Vaa::from_bytes(&bytes),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn too_many_signatures() {
        let vaa = Vaa {
            version: 1,
            signatures: vec![Signature::default(); 256],
            ..Default::default()
        };
        assert_eq!(
            Err(CodecError::TooManyEntries {
                what: "signatures",
                len: 256
            }),
            vaa.to_bytes()
        );
    }
}
