//! Signer identifiers and address derivation.
//!
//! A signer is identified on the wire by opaque bytes that are either a
//! wallet address or a raw public key, distinguished purely by length.
//! Two identifiers name the same signer iff their derived addresses are
//! byte-equal; all deduplication in the signature sets goes through that
//! projection.

use crate::crypto::{sha512_qu_trunc, sha512_sq_trunc};
use crate::error::BlockError;

/// Shortest byte length an identifier can have and still be an address.
pub const ADDRESS_MIN_LEN: usize = 36;
/// Longest byte length an identifier can have and still be an address.
pub const ADDRESS_MAX_LEN: usize = 128;
/// Identifiers strictly longer than [`ADDRESS_MAX_LEN`] and strictly
/// shorter than this are treated as raw public keys.
pub const PUBKEY_LEN_CEILING: usize = 2500;

/// Byte length of every derived address.
pub const ADDRESS_LEN: usize = 36;

const ADDRESS_VERSION: u8 = 1;
const ADDRESS_DIGEST_LEN: usize = 32;
const ADDRESS_CHECK_LEN: usize = 3;

/// A signer identifier, classified by length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signer {
    /// A wallet address, used verbatim.
    Address(Vec<u8>),
    /// A raw public key; the address is derived from it.
    PublicKey(Vec<u8>),
}

impl Signer {
    /// Classifies raw identifier bytes.
    ///
    /// Lengths in `[36, 128]` are addresses, lengths in `(128, 2500)` are
    /// public keys, anything else is invalid.
    pub fn from_bytes(id: &[u8]) -> Result<Self, BlockError> {
        match id.len() {
            ADDRESS_MIN_LEN..=ADDRESS_MAX_LEN => Ok(Signer::Address(id.to_vec())),
            len if len > ADDRESS_MAX_LEN && len < PUBKEY_LEN_CEILING => {
                Ok(Signer::PublicKey(id.to_vec()))
            }
            len => Err(BlockError::Decode(format!(
                "signer identifier has invalid length {len}"
            ))),
        }
    }

    /// Raw identifier bytes, as they appear on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Signer::Address(bytes) | Signer::PublicKey(bytes) => bytes,
        }
    }

    /// Projects the identifier onto its canonical address form.
    pub fn to_address(&self) -> Vec<u8> {
        match self {
            Signer::Address(addr) => addr.clone(),
            Signer::PublicKey(pk) => address_from_public_key(pk),
        }
    }
}

/// Derives the canonical 36-byte address for a public key.
///
/// Layout: a version byte, the 32-byte quad-SHA-512 digest of the key,
/// and a 3-byte check suffix over the first 33 bytes. The derivation is
/// deterministic, so equal keys always map to equal addresses.
pub fn address_from_public_key(public_key: &[u8]) -> Vec<u8> {
    let mut address = Vec::with_capacity(ADDRESS_LEN);
    address.push(ADDRESS_VERSION);
    address.extend_from_slice(&sha512_qu_trunc(public_key, ADDRESS_DIGEST_LEN));
    let check = sha512_sq_trunc(&address, ADDRESS_CHECK_LEN);
    address.extend_from_slice(&check);
    address
}

/// Derives the address form of an arbitrary identifier.
pub fn derive_address(id: &[u8]) -> Result<Vec<u8>, BlockError> {
    Ok(Signer::from_bytes(id)?.to_address())
}

/// True iff two identifiers resolve to the same signer.
///
/// Identifiers of invalid length never match anything.
pub fn same_signer(a: &[u8], b: &[u8]) -> bool {
    match (derive_address(a), derive_address(b)) {
        (Ok(addr_a), Ok(addr_b)) => addr_a == addr_b,
        _ => false,
    }
}
