//! Big-endian wire codec shared by VAAs and governance payloads.
//!
//! Decoding reads from a `&mut &[u8]` cursor and advances it past what was consumed, so
//! composite types decode field by field and "the rest of the input" is simply whatever the
//! cursor still holds. Integers are always read at their full width.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("unsupported VAA version {0}")]
    UnsupportedVersion(u8),

    #[error("too many {what}: {len} does not fit in a u8 length prefix")]
    TooManyEntries { what: &'static str, len: usize },

    #[error("unknown governance module {0}")]
    UnknownModule(String),

    #[error("governance module name {0:?} does not fit in 32 bytes")]
    InvalidModuleName(String),

    #[error("unknown governance action {action} for module {module}")]
    UnknownGovernanceAction { module: String, action: u8 },

    #[error("action {action} is not defined for module {module}")]
    UnsupportedAction { module: String, action: &'static str },
}

pub type Result<T> = core::result::Result<T, CodecError>;

pub trait Decode: Sized {
    fn decode(buf: &mut &[u8]) -> Result<Self>;
}

pub trait Encode {
    fn encode(&self, out: &mut Vec<u8>) -> Result<()>;

    fn encoded_len_hint(&self) -> usize {
        0
    }
}

/// Decode a complete message. Bytes left over after decoding are an error.
pub fn from_slice<T: Decode>(mut buf: &[u8]) -> Result<T> {
    let value = T::decode(&mut buf)?;
    if buf.is_empty() {
        Ok(value)
    } else {
        Err(CodecError::TrailingBytes(buf.len()))
    }
}

pub fn to_vec<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(value.encoded_len_hint());
    value.encode(&mut out)?;
    Ok(out)
}

/// Split `N` bytes off the front of `buf`.
pub(crate) fn take<const N: usize>(buf: &mut &[u8]) -> Result<[u8; N]> {
    if buf.len() < N {
        return Err(CodecError::UnexpectedEof {
            needed: N,
            remaining: buf.len(),
        });
    }
    let (head, rest) = buf.split_at(N);
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    *buf = rest;
    Ok(out)
}

/// Length prefix for a list carried in a single byte.
pub(crate) fn encode_len(what: &'static str, len: usize, out: &mut Vec<u8>) -> Result<()> {
    let len = u8::try_from(len).map_err(|_| CodecError::TooManyEntries { what, len })?;
    out.push(len);
    Ok(())
}

/// Integers are encoded as big-endian.
macro_rules! impl_for_integer {
    ($type: ident, $size: literal) => {
        impl Decode for $type {
            #[inline]
            fn decode(buf: &mut &[u8]) -> Result<Self> {
                take::<$size>(buf).map($type::from_be_bytes)
            }
        }

        impl Encode for $type {
            #[inline]
            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                out.extend_from_slice(&self.to_be_bytes());
                Ok(())
            }

            fn encoded_len_hint(&self) -> usize {
                $size
            }
        }
    };
}

impl_for_integer!(u8, 1);
impl_for_integer!(u16, 2);
impl_for_integer!(u32, 4);
impl_for_integer!(u64, 8);

impl<const N: usize> Decode for [u8; N] {
    #[inline]
    fn decode(buf: &mut &[u8]) -> Result<Self> {
        take::<N>(buf)
    }
}

impl<const N: usize> Encode for [u8; N] {
    #[inline]
    fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self);
        Ok(())
    }

    fn encoded_len_hint(&self) -> usize {
        N
    }
}
