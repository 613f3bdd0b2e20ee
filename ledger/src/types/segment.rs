//! Superblock segments.
//!
//! A superblock commits a digest of every block since the previous
//! superblock. Each committed block is represented by a
//! [`SuperBlockSegment`]: its transaction ids plus the frozen signer sets
//! backing its signature-freeze checksum. Inside a block header only the
//! segment's checksum is kept; the full segment body travels out-of-band.

use crate::address::derive_address;
use crate::codec::{ByteReader, ByteWriter};
use crate::error::BlockError;
use crate::types::{BlockSignature, MAX_ENCODED_LEN, SignatureSet, SignerSet, block_version};

/// Digest of one block committed by a superblock.
#[derive(Clone, Debug, Default)]
pub struct SuperBlockSegment {
    pub version: i32,
    pub block_num: u64,
    /// Transaction identifiers of the committed block, in block order.
    pub transactions: Vec<String>,
    pub signature_freeze_checksum: Option<Vec<u8>>,
    /// Signers backing the freeze checksum, insertion-ordered.
    pub signature_freeze_signers: SignerSet,
    /// Pre-freeze `(signature, signer)` pairs kept for old blocks.
    pub legacy_signature_freeze_signers: SignatureSet,
    /// The segment's own checksum. This is the only field present when
    /// the segment is embedded in a block header.
    pub block_checksum: Option<Vec<u8>>,
}

impl SuperBlockSegment {
    pub fn new(version: i32, block_num: u64) -> Self {
        Self {
            version,
            block_num,
            ..Self::default()
        }
    }

    /// Builds the checksum-only form used inside block headers.
    pub fn with_checksum(block_num: u64, checksum: Vec<u8>) -> Self {
        Self {
            block_num,
            block_checksum: Some(checksum),
            ..Self::default()
        }
    }

    /// Serializes the full segment body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_i32(self.version);
        w.write_u64(self.block_num);

        w.write_i32(self.transactions.len() as i32);
        for txid in &self.transactions {
            w.write_string(txid);
        }

        let signers = self.signature_freeze_signers.snapshot();
        w.write_i32(signers.len() as i32);
        for signer in &signers {
            w.write_bytes(signer);
        }

        w.write_opt_bytes(self.signature_freeze_checksum.as_deref());

        let legacy = self.legacy_signature_freeze_signers.snapshot();
        w.write_i32(legacy.len() as i32);
        for entry in &legacy {
            w.write_bytes(&entry.signature);
            w.write_bytes(&entry.signer);
        }

        w.into_bytes()
    }

    /// Parses a full segment body.
    ///
    /// Oversize buffers are rejected before any field is read; on any
    /// parse error the partial segment is discarded.
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
                "unknown segment version {version}"
            )));
        }
        let block_num = r.read_u64()?;

        let tx_count = r.read_count("transaction")?;
        let mut transactions = Vec::new();
        for _ in 0..tx_count {
            transactions.push(r.read_string()?);
        }

        let signer_count = r.read_count("signer")?;
        let mut signers = Vec::new();
        for _ in 0..signer_count {
            signers.push(r.read_bytes()?);
        }

        let signature_freeze_checksum = r.read_opt_bytes()?;

        let legacy_count = r.read_count("legacy signer")?;
        let mut legacy = Vec::new();
        for _ in 0..legacy_count {
            let signature = r.read_bytes()?;
            let signer = r.read_bytes()?;
            legacy.push(BlockSignature::new(signature, signer));
        }

        Ok(Self {
            version,
            block_num,
            transactions,
            signature_freeze_checksum,
            signature_freeze_signers: SignerSet::from(signers),
            legacy_signature_freeze_signers: SignatureSet::from(legacy),
            block_checksum: None,
        })
    }

    /// True iff `id` names a signer already present in either signer set,
    /// compared by derived address.
    pub fn contains_signature(&self, id: &[u8]) -> bool {
        let Ok(address) = derive_address(id) else {
            return false;
        };
        self.signature_freeze_signers.contains_address(&address)
            || self
                .legacy_signature_freeze_signers
                .contains_address(&address)
    }

    /// Admits a freeze signer unless an equivalent one exists in either set.
    pub fn add_signer(&self, signer: Vec<u8>) -> bool {
        if self.contains_signature(&signer) {
            return false;
        }
        self.signature_freeze_signers.insert(signer)
    }

    /// Admits a legacy `(signature, signer)` pair under the same dedup rule.
    pub fn add_legacy_signer(&self, signature: Vec<u8>, signer: Vec<u8>) -> bool {
        if self.contains_signature(&signer) {
            return false;
        }
        self.legacy_signature_freeze_signers
            .insert(BlockSignature::new(signature, signer))
    }
}
