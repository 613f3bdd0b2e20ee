//! Blocks.
//!
//! This module defines the full [`Block`] entity: the canonical body
//! codec, the content-addressed block checksum, the auxiliary signature
//! checksum, and every operation on the block's signature set. Blocks are
//! immutable once distributed except for the signature set and the
//! superblock segment signer sets, which grow monotonically.

use std::collections::BTreeMap;

use crate::address::{Signer, address_from_public_key, derive_address};
use crate::codec::{ByteReader, ByteWriter};
use crate::crypto::{CryptoAdapter, checksum_hash};
use crate::error::BlockError;
use crate::types::{
    BlockSignature, MAX_ENCODED_LEN, SIGNER_ADDRESS_MAX_LEN, SignatureSet, SuperBlockSegment,
    block_version,
};
use crate::wallet::WalletResolver;

/// Rendering used for the previous-block checksum of the genesis block.
const GENESIS_CHECKSUM_TEXT: &str = "G E N E S I S  B L O C K";

/// A full block.
#[derive(Clone, Debug, Default)]
pub struct Block {
    /// Format version; gates field presence and the checksum hash.
    pub version: i32,
    /// Block height.
    pub block_num: u64,
    /// Transaction identifiers in inclusion order.
    pub transactions: Vec<String>,
    /// Admitted `(signature, signer)` pairs over the block checksum.
    pub signatures: SignatureSet,
    pub block_checksum: Option<Vec<u8>>,
    /// Checksum of the previous block; absent only in the genesis block.
    pub last_block_checksum: Option<Vec<u8>>,
    pub wallet_state_checksum: Option<Vec<u8>>,
    pub signature_freeze_checksum: Option<Vec<u8>>,
    pub difficulty: u64,
    /// Creation time, seconds since the Unix epoch.
    pub timestamp: i64,
    pub last_superblock_num: u64,
    pub last_superblock_checksum: Option<Vec<u8>>,
    /// Full-content segments, keyed by height. Segment bodies are never
    /// part of the block body on the wire; they travel separately.
    pub superblock_segments: BTreeMap<u64, SuperBlockSegment>,
    /// Locally computed PoW solution. Never serialized.
    pub pow_field: Option<Vec<u8>>,
    /// True when this block was loaded from local storage rather than
    /// received from a peer. Never serialized.
    pub from_local_storage: bool,
}

impl Block {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// A genesis block has height zero and no previous-block checksum.
    pub fn is_genesis(&self) -> bool {
        self.block_num == 0 && self.last_block_checksum.is_none()
    }

    // ---------------------------
    // Codec
    // ---------------------------

    /// Serializes the block body.
    ///
    /// `pow_field` and `from_local_storage` are runtime-only and are not
    /// written; superblock segment bodies are also excluded.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_i32(self.version);
        w.write_u64(self.block_num);

        w.write_i32(self.transactions.len() as i32);
        for txid in &self.transactions {
            w.write_string(txid);
        }

        let signatures = self.signatures.snapshot();
        w.write_i32(signatures.len() as i32);
        for entry in &signatures {
            w.write_bytes(&entry.signature);
            w.write_bytes(&entry.signer);
        }

        w.write_opt_bytes(self.block_checksum.as_deref());
        w.write_opt_bytes(self.last_block_checksum.as_deref());
        w.write_opt_bytes(self.wallet_state_checksum.as_deref());
        w.write_opt_bytes(self.signature_freeze_checksum.as_deref());
        w.write_u64(self.difficulty);
        w.write_i64(self.timestamp);
        w.write_u64(self.last_superblock_num);
        w.write_opt_bytes(self.last_superblock_checksum.as_deref());

        w.into_bytes()
    }

    /// Parses a serialized block body.
    ///
    /// Oversize buffers are rejected before any field is read. Decoded
    /// signatures are taken verbatim; callers wanting assurance run
    /// [`Block::verify_signatures`] afterwards.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() > MAX_ENCODED_LEN {
            return Err(BlockError::Oversize {
                len: bytes.len(),
                max: MAX_ENCODED_LEN,
            });
        }

        let mut r = ByteReader::new(bytes);
        let version = r.read_i32()?;
        if version > block_version::MAX {
            return Err(BlockError::Decode(format!(
                "unknown block version {version}"
            )));
        }
        let block_num = r.read_u64()?;

        let tx_count = r.read_count("transaction")?;
        let mut transactions = Vec::new();
        for _ in 0..tx_count {
            transactions.push(r.read_string()?);
        }

        let sig_count = r.read_count("signature")?;
        let signatures = SignatureSet::new();
        for _ in 0..sig_count {
            let signature = r.read_bytes()?;
            let signer = r.read_bytes()?;
            signatures.push(BlockSignature::new(signature, signer));
        }

        let block_checksum = r.read_opt_bytes()?;
        let last_block_checksum = r.read_opt_bytes()?;
        let wallet_state_checksum = r.read_opt_bytes()?;
        let signature_freeze_checksum = r.read_opt_bytes()?;
        let difficulty = r.read_u64()?;
        let timestamp = r.read_i64()?;
        let last_superblock_num = r.read_u64()?;
        let last_superblock_checksum = r.read_opt_bytes()?;

        Ok(Self {
            version,
            block_num,
            transactions,
            signatures,
            block_checksum,
            last_block_checksum,
            wallet_state_checksum,
            signature_freeze_checksum,
            difficulty,
            timestamp,
            last_superblock_num,
            last_superblock_checksum,
            superblock_segments: BTreeMap::new(),
            pow_field: None,
            from_local_storage: false,
        })
    }

    // ---------------------------
    // Checksums
    // ---------------------------

    /// Computes the content-addressed block checksum.
    ///
    /// The preimage is the domain lock followed by the canonical field
    /// concatenation; superblock segments contribute in ascending key
    /// order with their transaction ids and signer sets reduced to
    /// square-variant digests. A merged segment must carry its
    /// signature-freeze checksum.
    pub fn calculate_checksum(
        &self,
        lock: &[u8],
        crypto: &dyn CryptoAdapter,
    ) -> Result<Vec<u8>, BlockError> {
        let mut merged_segments = ByteWriter::new();
        for (num, seg) in &self.superblock_segments {
            merged_segments.write_u64(*num);
            merged_segments.write_i32(seg.version);

            let freeze = seg
                .signature_freeze_checksum
                .as_deref()
                .ok_or(BlockError::MissingField("signature_freeze_checksum"))?;
            merged_segments.write_raw(freeze);

            let mut seg_txids = ByteWriter::new();
            for txid in &seg.transactions {
                seg_txids.write_raw(txid.as_bytes());
            }
            // Segment txids and signers always hash with the square
            // variant, whatever the outer block version.
            merged_segments.write_raw(&crypto.hash_sq(&seg_txids.into_bytes()));

            let mut merged_signers = ByteWriter::new();
            let mut signers = seg.signature_freeze_signers.snapshot();
            signers.sort();
            for signer in &signers {
                merged_signers.write_raw(signer);
            }
            let mut legacy = seg.legacy_signature_freeze_signers.snapshot();
            legacy.sort_by(|a, b| a.signer.cmp(&b.signer));
            for entry in &legacy {
                merged_signers.write_raw(&entry.signature);
                merged_signers.write_raw(&entry.signer);
            }
            merged_segments.write_raw(&crypto.hash_sq(&merged_signers.into_bytes()));
        }

        let mut w = ByteWriter::new();
        w.write_raw(lock);
        w.write_i32(self.version);
        w.write_u64(self.block_num);

        for txid in &self.transactions {
            w.write_raw(txid.as_bytes());
        }

        if let Some(c) = &self.last_block_checksum {
            w.write_raw(c);
        }
        if let Some(c) = &self.wallet_state_checksum {
            w.write_raw(c);
        }
        if let Some(c) = &self.signature_freeze_checksum {
            w.write_raw(c);
        }
        w.write_u64(self.difficulty);
        w.write_raw(&merged_segments.into_bytes());

        if let Some(c) = &self.last_superblock_checksum {
            w.write_u64(self.last_superblock_num);
            w.write_raw(c);
        }

        Ok(checksum_hash(crypto, self.version, &w.into_bytes()))
    }

    /// Computes the signature checksum used by block equality.
    ///
    /// Works on a snapshot of the signature set, canonicalized by sorting
    /// on the signer identifier. Versions above 3 hash the identifiers,
    /// older versions hash the signature bytes.
    pub fn calculate_signature_checksum(&self, crypto: &dyn CryptoAdapter) -> Vec<u8> {
        let mut signatures = self.signatures.snapshot();
        signatures.sort_by(|a, b| a.signer.cmp(&b.signer));

        let mut w = ByteWriter::new();
        w.write_u64(self.block_num);
        for entry in &signatures {
            if self.version > block_version::V3 {
                w.write_raw(&entry.signer);
            } else {
                w.write_raw(&entry.signature);
            }
        }

        checksum_hash(crypto, self.version, &w.into_bytes())
    }

    /// Protocol equality: same block checksum, same signature-freeze
    /// checksum (both absent counts as same), and same signature checksum.
    pub fn equals(&self, other: &Block, crypto: &dyn CryptoAdapter) -> bool {
        if self.block_checksum != other.block_checksum {
            return false;
        }
        if self.signature_freeze_checksum != other.signature_freeze_checksum {
            return false;
        }
        self.calculate_signature_checksum(crypto) == other.calculate_signature_checksum(crypto)
    }

    // ---------------------------
    // Transactions
    // ---------------------------

    /// Appends a transaction id unless it is already present.
    /// Duplicates are logged and ignored; they are not an error.
    pub fn add_transaction(&mut self, txid: &str) -> bool {
        if self.transactions.iter().any(|t| t == txid) {
            tracing::warn!(txid, block_num = self.block_num, "duplicate transaction");
            return false;
        }
        self.transactions.push(txid.to_string());
        true
    }

    // ---------------------------
    // Signature operations
    // ---------------------------

    /// True iff an equivalent signer (by derived address) already signed.
    pub fn contains_signature(&self, id: &[u8]) -> bool {
        let Ok(address) = derive_address(id) else {
            return false;
        };
        self.signatures.contains_address(&address)
    }

    /// Signs this block with the local node identity.
    ///
    /// Returns `None` when the local address has already signed. The
    /// stored identifier is the node's public key when the wallet
    /// registry has no public key on record for it (so peers can still
    /// recover the key), and the short address form otherwise.
    pub fn apply_signature(
        &self,
        crypto: &dyn CryptoAdapter,
        wallets: &dyn WalletResolver,
    ) -> Result<Option<BlockSignature>, BlockError> {
        let address = wallets.primary_address();
        if self.signatures.contains_address(&address) {
            return Ok(None);
        }

        let checksum = self
            .block_checksum
            .as_deref()
            .ok_or(BlockError::MissingField("block_checksum"))?;
        let signature = crypto.sign(checksum, &wallets.primary_private_key())?;

        let has_registered_key = wallets
            .get_wallet(&address)
            .is_some_and(|w| w.public_key.is_some());
        let signer = if has_registered_key {
            address
        } else {
            wallets.primary_public_key()
        };

        let entry = BlockSignature::new(signature, signer);
        self.signatures.push(entry.clone());
        Ok(Some(entry))
    }

    /// Admits a peer signature after recovering the signer's public key
    /// and verifying the signature against the block checksum.
    pub fn add_signature(
        &self,
        signature: &[u8],
        signer: &[u8],
        crypto: &dyn CryptoAdapter,
        wallets: &dyn WalletResolver,
    ) -> bool {
        if self.contains_signature(signer) {
            return false;
        }

        let Some(checksum) = self.block_checksum.as_deref() else {
            tracing::warn!(
                block_num = self.block_num,
                "cannot admit signature, block checksum not set"
            );
            return false;
        };

        let Some(public_key) = resolve_public_key(signer, wallets) else {
            tracing::warn!(
                block_num = self.block_num,
                signer = %hex::encode(signer),
                "cannot admit signature, signer public key unknown"
            );
            return false;
        };

        if !crypto.verify(checksum, &public_key, signature) {
            tracing::warn!(
                block_num = self.block_num,
                signer = %hex::encode(signer),
                "rejected signature, verification failed"
            );
            return false;
        }

        self.signatures
            .push(BlockSignature::new(signature.to_vec(), signer.to_vec()));
        true
    }

    /// Merges signatures from a peer copy of this block, skipping signers
    /// already present. No re-verification; the caller vouches for the
    /// source block.
    pub fn add_signatures_from(&self, other: &Block) -> Vec<BlockSignature> {
        let mut added = Vec::new();
        for entry in other.signatures.snapshot() {
            if !self.contains_signature(&entry.signer) {
                self.signatures.push(entry.clone());
                added.push(entry);
            }
        }
        added
    }

    /// Re-checks every admitted signature and removes the ones that fail.
    ///
    /// An entry is removed when its public key cannot be resolved, when
    /// its public key duplicates an earlier entry, or when verification
    /// fails. Returns `true` iff at least one signature remains.
    pub fn verify_signatures(
        &self,
        crypto: &dyn CryptoAdapter,
        wallets: &dyn WalletResolver,
    ) -> bool {
        let Some(checksum) = self.block_checksum.as_deref() else {
            return false;
        };

        let snapshot = self.signatures.snapshot();
        let mut seen_keys: Vec<Vec<u8>> = Vec::new();
        let mut rejected = Vec::new();

        for entry in snapshot {
            let Some(public_key) = resolve_public_key(&entry.signer, wallets) else {
                rejected.push(entry);
                continue;
            };
            if seen_keys.contains(&public_key) {
                rejected.push(entry);
                continue;
            }
            if !crypto.verify(checksum, &public_key, &entry.signature) {
                rejected.push(entry);
                continue;
            }
            seen_keys.push(public_key);
        }

        if !rejected.is_empty() {
            tracing::warn!(
                block_num = self.block_num,
                removed = rejected.len(),
                "removed invalid signatures"
            );
            self.signatures.remove_many(&rejected);
        }

        !self.signatures.is_empty()
    }

    /// True iff the local node (or the supplied public key) has a valid
    /// signature on this block.
    ///
    /// Stored identifiers up to 70 bytes are compared as addresses,
    /// longer ones as public-key bytes. A matching entry that fails
    /// verification is reported as possible tampering and the call
    /// returns `false`; the entry is not purged here.
    pub fn has_node_signature(
        &self,
        crypto: &dyn CryptoAdapter,
        wallets: &dyn WalletResolver,
        public_key: Option<&[u8]>,
    ) -> bool {
        let public_key = match public_key {
            Some(pk) => pk.to_vec(),
            None => wallets.primary_public_key(),
        };
        let address = address_from_public_key(&public_key);

        let Some(checksum) = self.block_checksum.as_deref() else {
            return false;
        };

        for entry in self.signatures.snapshot() {
            let matched = if entry.signer.len() <= SIGNER_ADDRESS_MAX_LEN {
                entry.signer == address
            } else {
                entry.signer == public_key
            };
            if !matched {
                continue;
            }

            if crypto.verify(checksum, &public_key, &entry.signature) {
                return true;
            }
            tracing::warn!(
                block_num = self.block_num,
                signer = %hex::encode(&entry.signer),
                "invalid node signature, possible tampering"
            );
            return false;
        }

        false
    }

    /// Collects the wallet addresses behind the signature set, sorted by
    /// byte comparison.
    ///
    /// Address-form identifiers must have a public key on record in the
    /// wallet registry or they are skipped. Public-key identifiers are
    /// converted to addresses only when `convert_pubkeys` is set,
    /// otherwise their raw bytes are returned.
    pub fn get_signatures_wallet_addresses(
        &self,
        wallets: &dyn WalletResolver,
        convert_pubkeys: bool,
    ) -> Vec<Vec<u8>> {
        let mut addresses = Vec::new();
        for entry in self.signatures.snapshot() {
            if entry.signer.len() <= SIGNER_ADDRESS_MAX_LEN {
                let registered = wallets
                    .get_wallet(&entry.signer)
                    .is_some_and(|w| w.public_key.is_some());
                if !registered {
                    continue;
                }
                addresses.push(entry.signer);
            } else if convert_pubkeys {
                addresses.push(address_from_public_key(&entry.signer));
            } else {
                addresses.push(entry.signer);
            }
        }
        addresses.sort();
        addresses
    }

    /// Counts distinct signer identifiers by raw byte comparison.
    ///
    /// An address-form and a pubkey-form identifier of the same wallet
    /// count as two distinct entries here.
    pub fn get_unique_signature_count(&self) -> usize {
        let snapshot = self.signatures.snapshot();
        let mut seen: Vec<&[u8]> = Vec::new();
        for entry in &snapshot {
            if !seen.iter().any(|s| *s == entry.signer.as_slice()) {
                seen.push(&entry.signer);
            }
        }
        seen.len()
    }

    // ---------------------------
    // Reporting
    // ---------------------------

    /// Rendering of the previous-block checksum for logs.
    pub fn last_block_checksum_display(&self) -> String {
        match &self.last_block_checksum {
            Some(c) => hex::encode(c),
            None => GENESIS_CHECKSUM_TEXT.to_string(),
        }
    }

    /// Logs a human-readable summary of this block.
    pub fn log_block_details(&self) {
        tracing::info!(block_num = self.block_num, version = self.version, "block");
        tracing::info!(signatures = self.signatures.len(), "|- signatures");
        tracing::info!(
            checksum = %self
                .block_checksum
                .as_deref()
                .map(hex::encode)
                .unwrap_or_default(),
            "|- block checksum"
        );
        tracing::info!(last = %self.last_block_checksum_display(), "|- last block checksum");
        tracing::info!(
            wallet_state = %self
                .wallet_state_checksum
                .as_deref()
                .map(hex::encode)
                .unwrap_or_default(),
            "|- wallet state checksum"
        );
        tracing::info!(
            freeze = %self
                .signature_freeze_checksum
                .as_deref()
                .map(hex::encode)
                .unwrap_or_default(),
            "|- signature freeze checksum"
        );
        tracing::info!(
            pow = %self.pow_field.as_deref().map(hex::encode).unwrap_or_default(),
            "|- pow field"
        );
        tracing::info!(
            timestamp = self.timestamp,
            difficulty = self.difficulty,
            transactions = self.transactions.len(),
            "|- contents"
        );
    }
}

/// Recovers a signer's public key: pubkey-form identifiers are the key
/// itself, address-form identifiers are looked up in the wallet registry.
fn resolve_public_key(signer: &[u8], wallets: &dyn WalletResolver) -> Option<Vec<u8>> {
    match Signer::from_bytes(signer).ok()? {
        Signer::PublicKey(pk) => Some(pk),
        Signer::Address(addr) => wallets.get_wallet(&addr)?.public_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{NodeCrypto, generate_keypair};
    use crate::wallet::{InMemoryWalletRegistry, Wallet};

    const LOCK: &[u8] = b"test-lock";

    fn sample_block(version: i32) -> Block {
        let mut block = Block::new(version);
        block.block_num = 17;
        block.transactions = vec!["tx-a".to_string(), "tx-b".to_string()];
        block.last_block_checksum = Some(vec![0x21; 32]);
        block.wallet_state_checksum = Some(vec![0x22; 32]);
        block.difficulty = 1000;
        block.timestamp = 1_700_000_000;
        block
    }

    fn node_setup() -> (NodeCrypto, InMemoryWalletRegistry) {
        (NodeCrypto, InMemoryWalletRegistry::with_primary(generate_keypair()))
    }

    fn checksummed_block(crypto: &NodeCrypto, version: i32) -> Block {
        let mut block = sample_block(version);
        block.block_checksum = Some(block.calculate_checksum(LOCK, crypto).expect("checksum"));
        block
    }

    #[test]
    fn block_roundtrip_preserves_every_serialized_field() {
        let mut block = sample_block(block_version::V5);
        block.block_checksum = Some(vec![0x20; 32]);
        block.signature_freeze_checksum = Some(vec![0x23; 32]);
        block.last_superblock_num = 10;
        block.last_superblock_checksum = Some(vec![0x24; 32]);
        block
            .signatures
            .push(BlockSignature::new(vec![0x31; 8], vec![0x32; 36]));
        // Runtime-only state must not survive the wire.
        block.pow_field = Some(vec![0x99; 16]);
        block.from_local_storage = true;
        // Segment bodies are carried out-of-band, never in the body.
        block
            .superblock_segments
            .insert(9, SuperBlockSegment::new(block_version::V5, 9));

        let decoded = Block::from_bytes(&block.to_bytes()).expect("block decode");

        assert_eq!(decoded.version, block.version);
        assert_eq!(decoded.block_num, block.block_num);
        assert_eq!(decoded.transactions, block.transactions);
        assert_eq!(decoded.signatures.snapshot(), block.signatures.snapshot());
        assert_eq!(decoded.block_checksum, block.block_checksum);
        assert_eq!(decoded.last_block_checksum, block.last_block_checksum);
        assert_eq!(decoded.wallet_state_checksum, block.wallet_state_checksum);
        assert_eq!(
            decoded.signature_freeze_checksum,
            block.signature_freeze_checksum
        );
        assert_eq!(decoded.difficulty, block.difficulty);
        assert_eq!(decoded.timestamp, block.timestamp);
        assert_eq!(decoded.last_superblock_num, block.last_superblock_num);
        assert_eq!(
            decoded.last_superblock_checksum,
            block.last_superblock_checksum
        );
        assert!(decoded.superblock_segments.is_empty());
        assert_eq!(decoded.pow_field, None);
        assert!(!decoded.from_local_storage);
    }

    #[test]
    fn oversize_block_is_rejected() {
        let bytes = vec![0u8; MAX_ENCODED_LEN + 1];
        assert!(matches!(
            Block::from_bytes(&bytes),
            Err(BlockError::Oversize { .. })
        ));
    }

    #[test]
    fn add_transaction_is_idempotent() {
        let mut block = Block::new(block_version::V5);
        assert!(block.add_transaction("tx-1"));
        assert!(!block.add_transaction("tx-1"));
        assert_eq!(block.transactions, vec!["tx-1".to_string()]);
    }

    #[test]
    fn checksum_is_deterministic_across_construction_order() {
        let crypto = NodeCrypto;

        let mut a = sample_block(block_version::V5);
        let mut seg_late = SuperBlockSegment::new(block_version::V5, 16);
        seg_late.signature_freeze_checksum = Some(vec![0x16; 32]);
        seg_late.signature_freeze_signers.push(vec![2u8; 36]);
        seg_late.signature_freeze_signers.push(vec![1u8; 36]);
        let mut seg_early = SuperBlockSegment::new(block_version::V5, 15);
        seg_early.signature_freeze_checksum = Some(vec![0x15; 32]);
        a.superblock_segments.insert(16, seg_late);
        a.superblock_segments.insert(15, seg_early);

        let mut b = sample_block(block_version::V5);
        let mut seg_early = SuperBlockSegment::new(block_version::V5, 15);
        seg_early.signature_freeze_checksum = Some(vec![0x15; 32]);
        let mut seg_late = SuperBlockSegment::new(block_version::V5, 16);
        seg_late.signature_freeze_checksum = Some(vec![0x16; 32]);
        // Same signers, inserted in the opposite order.
        seg_late.signature_freeze_signers.push(vec![1u8; 36]);
        seg_late.signature_freeze_signers.push(vec![2u8; 36]);
        b.superblock_segments.insert(15, seg_early);
        b.superblock_segments.insert(16, seg_late);

        assert_eq!(
            a.calculate_checksum(LOCK, &crypto).expect("checksum"),
            b.calculate_checksum(LOCK, &crypto).expect("checksum")
        );
    }

    #[test]
    fn merged_segment_without_freeze_checksum_is_an_error() {
        let crypto = NodeCrypto;
        let mut block = sample_block(block_version::V5);
        block
            .superblock_segments
            .insert(3, SuperBlockSegment::new(block_version::V5, 3));

        assert!(matches!(
            block.calculate_checksum(LOCK, &crypto),
            Err(BlockError::MissingField("signature_freeze_checksum"))
        ));
    }

    #[test]
    fn checksum_hash_diverges_across_the_version_gate() {
        let crypto = NodeCrypto;
        let v2 = sample_block(2).calculate_checksum(LOCK, &crypto).expect("v2");
        let v3 = sample_block(3).calculate_checksum(LOCK, &crypto).expect("v3");
        // Identical content, but the version bytes and the digest variant
        // both differ.
        assert_ne!(v2, v3);
    }

    #[test]
    fn signature_checksum_sorts_identifiers() {
        let crypto = NodeCrypto;
        let mut a = sample_block(block_version::V5);
        a.signatures.push(BlockSignature::new(vec![9], vec![0x02; 36]));
        a.signatures.push(BlockSignature::new(vec![9], vec![0x01; 36]));
        a.signatures.push(BlockSignature::new(vec![9], vec![0x03; 36]));

        let mut b = sample_block(block_version::V5);
        b.signatures.push(BlockSignature::new(vec![9], vec![0x01; 36]));
        b.signatures.push(BlockSignature::new(vec![9], vec![0x02; 36]));
        b.signatures.push(BlockSignature::new(vec![9], vec![0x03; 36]));

        assert_eq!(
            a.calculate_signature_checksum(&crypto),
            b.calculate_signature_checksum(&crypto)
        );

        // Manual preimage: block_num then the sorted identifiers.
        let mut w = ByteWriter::new();
        w.write_u64(a.block_num);
        w.write_raw(&[0x01; 36]);
        w.write_raw(&[0x02; 36]);
        w.write_raw(&[0x03; 36]);
        assert_eq!(
            a.calculate_signature_checksum(&crypto),
            crypto.hash_sq(&w.into_bytes())
        );
    }

    #[test]
    fn signature_checksum_hashes_signature_bytes_up_to_v3() {
        let crypto = NodeCrypto;
        let mut block = sample_block(3);
        block
            .signatures
            .push(BlockSignature::new(vec![0x0A; 4], vec![0x01; 36]));

        let mut w = ByteWriter::new();
        w.write_u64(block.block_num);
        w.write_raw(&[0x0A; 4]);
        assert_eq!(
            block.calculate_signature_checksum(&crypto),
            crypto.hash_sq(&w.into_bytes())
        );
    }

    #[test]
    fn equality_law() {
        let (crypto, wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);
        block.apply_signature(&crypto, &wallets).expect("sign");

        let copy = block.clone();
        assert!(block.equals(&copy, &crypto));

        // Different signature set -> different signature checksum.
        let other_keys = generate_keypair();
        let other_wallets = InMemoryWalletRegistry::with_primary(other_keys);
        copy.apply_signature(&crypto, &other_wallets).expect("sign");
        assert!(!block.equals(&copy, &crypto));

        // Different block checksum.
        let mut changed = block.clone();
        changed.block_checksum = Some(vec![0xFF; 32]);
        assert!(!block.equals(&changed, &crypto));

        // Freeze checksum presence must match.
        let mut frozen = block.clone();
        frozen.signature_freeze_checksum = Some(vec![0x01; 32]);
        assert!(!block.equals(&frozen, &crypto));
    }

    #[test]
    fn apply_signature_signs_once() {
        let (crypto, wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);

        let first = block.apply_signature(&crypto, &wallets).expect("sign");
        assert!(first.is_some());
        assert_eq!(block.signatures.len(), 1);

        // Local address already present: no-op.
        let second = block.apply_signature(&crypto, &wallets).expect("sign");
        assert!(second.is_none());
        assert_eq!(block.signatures.len(), 1);
    }

    #[test]
    fn apply_signature_stores_pubkey_until_registered() {
        let (crypto, mut wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);

        // No public key on record: the identifier is the full key.
        let entry = block
            .apply_signature(&crypto, &wallets)
            .expect("sign")
            .expect("fresh signature");
        assert_eq!(entry.signer, wallets.primary_public_key());

        // With the key registered, a fresh block gets the address form.
        wallets.register_primary_public_key();
        let block2 = checksummed_block(&crypto, block_version::V5);
        let entry2 = block2
            .apply_signature(&crypto, &wallets)
            .expect("sign")
            .expect("fresh signature");
        assert_eq!(entry2.signer, wallets.primary_address());
    }

    #[test]
    fn add_signature_verifies_before_admitting() {
        let (crypto, wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);

        let signer_keys = generate_keypair();
        let checksum = block.block_checksum.clone().expect("checksum");
        let good = crypto.sign(&checksum, &signer_keys.secret_key).expect("sign");

        assert!(block.add_signature(&good, &signer_keys.public_key, &crypto, &wallets));
        assert_eq!(block.signatures.len(), 1);

        // Same signer again: dedup.
        assert!(!block.add_signature(&good, &signer_keys.public_key, &crypto, &wallets));

        // Tampered signature from a new signer: rejected.
        let other_keys = generate_keypair();
        let mut bad = good.clone();
        bad[0] ^= 0xFF;
        assert!(!block.add_signature(&bad, &other_keys.public_key, &crypto, &wallets));
        assert_eq!(block.signatures.len(), 1);
    }

    #[test]
    fn add_signature_resolves_addresses_through_the_registry() {
        let (crypto, mut wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);

        let signer_keys = generate_keypair();
        let address = address_from_public_key(&signer_keys.public_key);
        let checksum = block.block_checksum.clone().expect("checksum");
        let sig = crypto.sign(&checksum, &signer_keys.secret_key).expect("sign");

        // Unknown address: lookup fails, entry skipped.
        assert!(!block.add_signature(&sig, &address, &crypto, &wallets));

        wallets.insert_wallet(Wallet {
            id: address.clone(),
            public_key: Some(signer_keys.public_key.clone()),
        });
        assert!(block.add_signature(&sig, &address, &crypto, &wallets));
    }

    #[test]
    fn add_signatures_from_merges_only_new_signers() {
        let (crypto, wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);
        block.apply_signature(&crypto, &wallets).expect("sign");

        let peer = block.clone();
        let peer_keys = generate_keypair();
        let peer_wallets = InMemoryWalletRegistry::with_primary(peer_keys);
        peer.apply_signature(&crypto, &peer_wallets).expect("sign");

        let added = block.add_signatures_from(&peer);
        assert_eq!(added.len(), 1);
        assert_eq!(block.signatures.len(), 2);

        // Merging again adds nothing.
        assert!(block.add_signatures_from(&peer).is_empty());
    }

    #[test]
    fn verify_signatures_purges_invalid_and_duplicate_entries() {
        let (crypto, wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);
        let checksum = block.block_checksum.clone().expect("checksum");

        let valid_keys = generate_keypair();
        let valid_sig = crypto.sign(&checksum, &valid_keys.secret_key).expect("sign");
        block
            .signatures
            .push(BlockSignature::new(valid_sig.clone(), valid_keys.public_key.clone()));

        // Garbage signature under a fresh key.
        let bogus_keys = generate_keypair();
        block
            .signatures
            .push(BlockSignature::new(vec![0xEE; 64], bogus_keys.public_key.clone()));

        // Duplicate public key, smuggled past insertion dedup via push.
        block
            .signatures
            .push(BlockSignature::new(valid_sig, valid_keys.public_key.clone()));

        assert!(block.verify_signatures(&crypto, &wallets));
        let left = block.signatures.snapshot();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].signer, valid_keys.public_key);
    }

    #[test]
    fn verify_signatures_false_when_nothing_survives() {
        let (crypto, wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);
        block
            .signatures
            .push(BlockSignature::new(vec![1; 8], vec![2; 36]));

        // Address-form signer with no wallet on record: unresolvable.
        assert!(!block.verify_signatures(&crypto, &wallets));
        assert!(block.signatures.is_empty());
    }

    #[test]
    fn has_node_signature_matches_address_and_pubkey_forms() {
        let (crypto, wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);
        block.apply_signature(&crypto, &wallets).expect("sign");

        assert!(block.has_node_signature(&crypto, &wallets, None));
        assert!(block.has_node_signature(&crypto, &wallets, Some(&wallets.primary_public_key())));

        let stranger = generate_keypair();
        assert!(!block.has_node_signature(&crypto, &wallets, Some(&stranger.public_key)));
    }

    #[test]
    fn has_node_signature_reports_tampering_without_purging() {
        let (crypto, wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);

        // An entry that names the node but carries a broken signature.
        block.signatures.push(BlockSignature::new(
            vec![0xAB; 64],
            wallets.primary_public_key(),
        ));

        assert!(!block.has_node_signature(&crypto, &wallets, None));
        assert_eq!(block.signatures.len(), 1);
    }

    #[test]
    fn wallet_addresses_are_sorted_and_filtered() {
        let (crypto, mut wallets) = node_setup();
        let block = checksummed_block(&crypto, block_version::V5);

        let keys_a = generate_keypair();
        let keys_b = generate_keypair();
        let addr_a = address_from_public_key(&keys_a.public_key);

        // Pubkey-form entry and a registered address-form entry.
        block
            .signatures
            .push(BlockSignature::new(vec![1], keys_b.public_key.clone()));
        wallets.insert_wallet(Wallet {
            id: addr_a.clone(),
            public_key: Some(keys_a.public_key.clone()),
        });
        block
            .signatures
            .push(BlockSignature::new(vec![2], addr_a.clone()));
        // Address-form entry with no registered key: skipped.
        block
            .signatures
            .push(BlockSignature::new(vec![3], vec![0x44; 36]));

        let converted = block.get_signatures_wallet_addresses(&wallets, true);
        let mut expected = vec![addr_a.clone(), address_from_public_key(&keys_b.public_key)];
        expected.sort();
        assert_eq!(converted, expected);

        let raw = block.get_signatures_wallet_addresses(&wallets, false);
        let mut expected_raw = vec![addr_a, keys_b.public_key];
        expected_raw.sort();
        assert_eq!(raw, expected_raw);
    }

    #[test]
    fn unique_signature_count_compares_raw_identifiers() {
        let block = Block::new(block_version::V5);
        let pk = vec![6u8; 200];
        let addr = address_from_public_key(&pk);

        block.signatures.push(BlockSignature::new(vec![1], pk));
        // Same wallet, different raw encoding: counted separately.
        block.signatures.push(BlockSignature::new(vec![2], addr));
        block
            .signatures
            .push(BlockSignature::new(vec![3], vec![7u8; 36]));
        block
            .signatures
            .push(BlockSignature::new(vec![4], vec![7u8; 36]));

        assert_eq!(block.get_unique_signature_count(), 3);
    }

    #[test]
    fn genesis_block_is_detected_and_rendered() {
        let mut block = Block::new(0);
        block.block_num = 0;
        block.last_block_checksum = None;
        assert!(block.is_genesis());
        assert_eq!(block.last_block_checksum_display(), GENESIS_CHECKSUM_TEXT);

        block.last_block_checksum = Some(vec![0xAB; 2]);
        assert!(!block.is_genesis());
        assert_eq!(block.last_block_checksum_display(), "abab");
    }
}
