//! Hashing and signing primitives.
//!
//! The block layer needs exactly four cryptographic operations: two
//! truncated SHA-512 digest variants for checksums, and detached
//! sign/verify over a block checksum. They are consumed through the
//! [`CryptoAdapter`] trait so that checksum and signature code never
//! depends on a concrete scheme.
//!
//! The default implementation, [`NodeCrypto`], uses ML-DSA-44 detached
//! signatures (`pqcrypto-mldsa`) and iterated SHA-512 digests (`sha2`).

use pqcrypto_mldsa::mldsa44;
use pqcrypto_traits::sign::{DetachedSignature, PublicKey, SecretKey};
use sha2::{Digest, Sha512};

use crate::error::BlockError;
use crate::types::block_version;

/// Length in bytes of every checksum produced by the two digest variants.
pub const CHECKSUM_LEN: usize = 32;

/// SHA-512 applied twice, truncated to `len` bytes.
pub fn sha512_sq_trunc(data: &[u8], len: usize) -> Vec<u8> {
    let first = Sha512::digest(data);
    let second = Sha512::digest(first);
    second[..len.min(second.len())].to_vec()
}

/// SHA-512 applied four times, truncated to `len` bytes.
pub fn sha512_qu_trunc(data: &[u8], len: usize) -> Vec<u8> {
    let mut digest = Sha512::digest(data);
    for _ in 0..3 {
        digest = Sha512::digest(digest);
    }
    digest[..len.min(digest.len())].to_vec()
}

/// Opaque interface to the hash and signature primitives.
///
/// Implementations must be deterministic: the same message must always
/// produce the same digest, across nodes and across restarts.
pub trait CryptoAdapter: Send + Sync {
    /// Produces a detached signature over `message` with `private_key`.
    fn sign(&self, message: &[u8], private_key: &[u8]) -> Result<Vec<u8>, BlockError>;

    /// Verifies a detached signature over `message` against `public_key`.
    fn verify(&self, message: &[u8], public_key: &[u8], signature: &[u8]) -> bool;

    /// Quad-iterated truncated SHA-512; used by checksums up to version 2.
    fn hash_qu(&self, message: &[u8]) -> Vec<u8>;

    /// Square-iterated truncated SHA-512; used by checksums from version 3.
    fn hash_sq(&self, message: &[u8]) -> Vec<u8>;
}

/// Selects the digest variant mandated by a block version.
///
/// Versions up to 2 hash with the quad variant, later versions with the
/// square variant. The two outputs never collide for the same input.
pub fn checksum_hash(crypto: &dyn CryptoAdapter, version: i32, data: &[u8]) -> Vec<u8> {
    if version <= block_version::V2 {
        crypto.hash_qu(data)
    } else {
        crypto.hash_sq(data)
    }
}

/// Default ML-DSA-44 + truncated-SHA-512 implementation.
pub struct NodeCrypto;

impl CryptoAdapter for NodeCrypto {
    fn sign(&self, message: &[u8], private_key: &[u8]) -> Result<Vec<u8>, BlockError> {
        let sk = mldsa44::SecretKey::from_bytes(private_key)
            .map_err(|_| BlockError::Crypto("malformed ML-DSA-44 secret key".to_string()))?;
        Ok(mldsa44::detached_sign(message, &sk).as_bytes().to_vec())
    }

    fn verify(&self, message: &[u8], public_key: &[u8], signature: &[u8]) -> bool {
        let Ok(pk) = mldsa44::PublicKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = mldsa44::DetachedSignature::from_bytes(signature) else {
            return false;
        };
        mldsa44::verify_detached_signature(&sig, message, &pk).is_ok()
    }

    fn hash_qu(&self, message: &[u8]) -> Vec<u8> {
        sha512_qu_trunc(message, CHECKSUM_LEN)
    }

    fn hash_sq(&self, message: &[u8]) -> Vec<u8> {
        sha512_sq_trunc(message, CHECKSUM_LEN)
    }
}

/// Freshly generated node signing keypair.
pub struct NodeKeypair {
    pub public_key: Vec<u8>,
    pub secret_key: Vec<u8>,
}

/// Generates a new ML-DSA-44 keypair.
pub fn generate_keypair() -> NodeKeypair {
    let (pk, sk) = mldsa44::keypair();
    NodeKeypair {
        public_key: pk.as_bytes().to_vec(),
        secret_key: sk.as_bytes().to_vec(),
    }
}
