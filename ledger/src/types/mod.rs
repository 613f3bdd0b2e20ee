//! Core domain types for the block layer.
//!
//! This module defines the signature/signer collections shared by blocks
//! and superblock segments, plus the protocol constants that gate codec
//! and checksum behavior. The entities themselves live in submodules:
//!
//! - [`block`] for [`Block`],
//! - [`header`] for [`BlockHeader`],
//! - [`segment`] for [`SuperBlockSegment`].

use std::sync::Mutex;

use crate::address::derive_address;

pub mod block;
pub mod header;
pub mod segment;

pub use block::Block;
pub use header::BlockHeader;
pub use segment::SuperBlockSegment;

/// Hard ceiling on the serialized size of a block or superblock segment.
/// Buffers above this size fail to decode before any field is read.
pub const MAX_ENCODED_LEN: usize = 3_145_728;

/// Stored signer identifiers at or below this length are compared as
/// addresses; longer identifiers are compared as raw public keys.
pub const SIGNER_ADDRESS_MAX_LEN: usize = 70;

/// Block format versions and the gates tied to them.
pub mod block_version {
    /// Last version whose checksums use the quad-SHA-512 variant.
    pub const V2: i32 = 2;
    /// Last version whose signature checksum hashes signature bytes
    /// instead of signer identifiers.
    pub const V3: i32 = 3;
    /// Last version without superblock fields in the header encoding.
    pub const V4: i32 = 4;
    /// First version carrying superblock segments.
    pub const V5: i32 = 5;
    /// Highest version this node knows how to decode.
    pub const MAX: i32 = V5;
}

/// One admitted signature: the detached signature bytes and the signer
/// identifier they were recorded under (address or public key).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSignature {
    pub signature: Vec<u8>,
    pub signer: Vec<u8>,
}

impl BlockSignature {
    pub fn new(signature: Vec<u8>, signer: Vec<u8>) -> Self {
        Self { signature, signer }
    }
}

/// Internally synchronized, insertion-ordered set of block signatures.
///
/// Deduplication is by the signer's derived address, so the same wallet
/// cannot appear twice even when one entry stores its address and the
/// other its public key. Reads that compute derived values take a
/// snapshot under the lock and work off-lock.
#[derive(Debug, Default)]
pub struct SignatureSet {
    entries: Mutex<Vec<BlockSignature>>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current entries out from under the lock.
    pub fn snapshot(&self) -> Vec<BlockSignature> {
        self.entries.lock().expect("signature set lock").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("signature set lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends without any dedup check. Used by the decoder, which must
    /// preserve the wire image verbatim.
    pub fn push(&self, entry: BlockSignature) {
        self.entries.lock().expect("signature set lock").push(entry);
    }

    /// Appends unless an equivalent signer is already present.
    /// Returns `false` when the entry was dropped as a duplicate.
    pub fn insert(&self, entry: BlockSignature) -> bool {
        let Ok(address) = derive_address(&entry.signer) else {
            return false;
        };
        let mut entries = self.entries.lock().expect("signature set lock");
        let duplicate = entries
            .iter()
            .any(|e| derive_address(&e.signer).is_ok_and(|a| a == address));
        if duplicate {
            return false;
        }
        entries.push(entry);
        true
    }

    /// True iff some entry's signer derives to `address`.
    pub fn contains_address(&self, address: &[u8]) -> bool {
        let entries = self.entries.lock().expect("signature set lock");
        entries
            .iter()
            .any(|e| derive_address(&e.signer).is_ok_and(|a| a == address))
    }

    /// Removes one occurrence per victim, reapplying snapshot-based
    /// decisions against the live set. A victim that appears twice in
    /// the set only loses one copy per listed removal.
    pub fn remove_many(&self, victims: &[BlockSignature]) {
        if victims.is_empty() {
            return;
        }
        let mut entries = self.entries.lock().expect("signature set lock");
        for victim in victims {
            if let Some(pos) = entries.iter().position(|e| e == victim) {
                entries.remove(pos);
            }
        }
    }
}

impl Clone for SignatureSet {
    fn clone(&self) -> Self {
        Self {
            entries: Mutex::new(self.snapshot()),
        }
    }
}

impl From<Vec<BlockSignature>> for SignatureSet {
    fn from(entries: Vec<BlockSignature>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

/// Internally synchronized, insertion-ordered set of bare signer
/// identifiers, deduplicated by derived address.
#[derive(Debug, Default)]
pub struct SignerSet {
    entries: Mutex<Vec<Vec<u8>>>,
}

impl SignerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        self.entries.lock().expect("signer set lock").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("signer set lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends without any dedup check, preserving the wire image.
    pub fn push(&self, signer: Vec<u8>) {
        self.entries.lock().expect("signer set lock").push(signer);
    }

    /// Appends unless an equivalent signer is already present.
    pub fn insert(&self, signer: Vec<u8>) -> bool {
        let Ok(address) = derive_address(&signer) else {
            return false;
        };
        let mut entries = self.entries.lock().expect("signer set lock");
        let duplicate = entries
            .iter()
            .any(|e| derive_address(e).is_ok_and(|a| a == address));
        if duplicate {
            return false;
        }
        entries.push(signer);
        true
    }

    /// True iff some entry derives to `address`.
    pub fn contains_address(&self, address: &[u8]) -> bool {
        let entries = self.entries.lock().expect("signer set lock");
        entries
            .iter()
            .any(|e| derive_address(e).is_ok_and(|a| a == address))
    }
}

impl Clone for SignerSet {
    fn clone(&self) -> Self {
        Self {
            entries: Mutex::new(self.snapshot()),
        }
    }
}

impl From<Vec<Vec<u8>>> for SignerSet {
    fn from(entries: Vec<Vec<u8>>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::address_from_public_key;

    #[test]
    fn signature_set_dedups_by_derived_address() {
        let pk = vec![7u8; 200];
        let addr = address_from_public_key(&pk);

        let set = SignatureSet::new();
        assert!(set.insert(BlockSignature::new(vec![1], pk.clone())));
        // Same wallet, recorded under its address form this time.
        assert!(!set.insert(BlockSignature::new(vec![2], addr.clone())));
        assert_eq!(set.len(), 1);
        assert!(set.contains_address(&addr));
    }

    #[test]
    fn signature_set_rejects_invalid_identifiers() {
        let set = SignatureSet::new();
        assert!(!set.insert(BlockSignature::new(vec![1], vec![0u8; 4])));
        assert!(set.is_empty());
    }

    #[test]
    fn remove_many_only_drops_named_victims() {
        let set = SignatureSet::new();
        let a = BlockSignature::new(vec![1], vec![1u8; 36]);
        let b = BlockSignature::new(vec![2], vec![2u8; 36]);
        set.push(a.clone());
        set.push(b.clone());

        set.remove_many(std::slice::from_ref(&a));
        let left = set.snapshot();
        assert_eq!(left, vec![b]);
    }

    #[test]
    fn signer_set_preserves_insertion_order() {
        let set = SignerSet::new();
        assert!(set.insert(vec![3u8; 36]));
        assert!(set.insert(vec![1u8; 36]));
        assert!(set.insert(vec![2u8; 36]));
        assert_eq!(
            set.snapshot(),
            vec![vec![3u8; 36], vec![1u8; 36], vec![2u8; 36]]
        );
    }

    #[test]
    fn signer_set_dedups_pubkey_against_address() {
        let pk = vec![9u8; 150];
        let addr = address_from_public_key(&pk);

        let set = SignerSet::new();
        assert!(set.insert(addr));
        assert!(!set.insert(pk));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let set = SignatureSet::new();
        set.push(BlockSignature::new(vec![1], vec![1u8; 36]));
        let copy = set.clone();
        set.push(BlockSignature::new(vec![2], vec![2u8; 36]));

        assert_eq!(copy.len(), 1);
        assert_eq!(set.len(), 2);
    }
}
