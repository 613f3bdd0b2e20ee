//! Block headers.
//!
//! A header carries everything needed to identify and chain a block
//! without its signature set or segment bodies: superblock segments are
//! reduced to their checksums, and headers carry no timestamp. Headers
//! are built by deep-copying from a [`Block`](crate::types::Block), never
//! by sharing ownership of its buffers.

use std::collections::BTreeMap;

use crate::codec::{ByteReader, ByteWriter};
use crate::crypto::{CryptoAdapter, checksum_hash};
use crate::error::BlockError;
use crate::types::{Block, MAX_ENCODED_LEN, SuperBlockSegment, block_version};

/// Header form of a block.
#[derive(Clone, Debug, Default)]
pub struct BlockHeader {
    /// Format version; gates field presence and the checksum hash.
    pub version: i32,
    /// Block height.
    pub block_num: u64,
    /// Transaction identifiers in block order.
    pub transactions: Vec<String>,
    /// The block's own checksum; producers always set this before
    /// serializing a header.
    pub block_checksum: Option<Vec<u8>>,
    /// Checksum of the previous block; absent only in the genesis block.
    pub last_block_checksum: Option<Vec<u8>>,
    pub wallet_state_checksum: Option<Vec<u8>>,
    pub signature_freeze_checksum: Option<Vec<u8>>,
    pub difficulty: u64,
    /// Height of the most recent superblock (written from version 5).
    pub last_superblock_num: u64,
    pub last_superblock_checksum: Option<Vec<u8>>,
    /// Committed segments, keyed by height. In a header each segment
    /// carries only its checksum.
    pub superblock_segments: BTreeMap<u64, SuperBlockSegment>,
}

impl BlockHeader {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Builds a header from a block, deep-copying every byte slice and
    /// reducing segments to their checksum-only form.
    pub fn from_block(block: &Block) -> Self {
        let superblock_segments = block
            .superblock_segments
            .iter()
            .filter_map(|(num, seg)| {
                seg.block_checksum
                    .as_ref()
                    .map(|c| (*num, SuperBlockSegment::with_checksum(*num, c.clone())))
            })
            .collect();

        Self {
            version: block.version,
            block_num: block.block_num,
            transactions: block.transactions.clone(),
            block_checksum: block.block_checksum.clone(),
            last_block_checksum: block.last_block_checksum.clone(),
            wallet_state_checksum: block.wallet_state_checksum.clone(),
            signature_freeze_checksum: block.signature_freeze_checksum.clone(),
            difficulty: block.difficulty,
            last_superblock_num: block.last_superblock_num,
            last_superblock_checksum: block.last_superblock_checksum.clone(),
            superblock_segments,
        }
    }

    /// Serializes the header. Superblock fields are written only for
    /// versions above 4.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_i32(self.version);
        w.write_u64(self.block_num);

        w.write_i32(self.transactions.len() as i32);
        for txid in &self.transactions {
            w.write_string(txid);
        }

        w.write_opt_bytes(self.block_checksum.as_deref());
        w.write_opt_bytes(self.last_block_checksum.as_deref());
        w.write_opt_bytes(self.wallet_state_checksum.as_deref());
        w.write_opt_bytes(self.signature_freeze_checksum.as_deref());
        w.write_u64(self.difficulty);

        if self.version > block_version::V4 {
            w.write_u64(self.last_superblock_num);
            w.write_opt_bytes(self.last_superblock_checksum.as_deref());
            w.write_i32(self.superblock_segments.len() as i32);
            for (num, seg) in &self.superblock_segments {
                w.write_u64(*num);
                w.write_opt_bytes(seg.block_checksum.as_deref());
            }
        }

        w.into_bytes()
    }

    /// Parses a serialized header.
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
                "unknown header version {version}"
            )));
        }
        let block_num = r.read_u64()?;

        let tx_count = r.read_count("transaction")?;
        let mut transactions = Vec::new();
        for _ in 0..tx_count {
            transactions.push(r.read_string()?);
        }

        let block_checksum = r.read_opt_bytes()?;
        let last_block_checksum = r.read_opt_bytes()?;
        let wallet_state_checksum = r.read_opt_bytes()?;
        let signature_freeze_checksum = r.read_opt_bytes()?;
        let difficulty = r.read_u64()?;

        let mut last_superblock_num = 0;
        let mut last_superblock_checksum = None;
        let mut superblock_segments = BTreeMap::new();
        if version > block_version::V4 {
            last_superblock_num = r.read_u64()?;
            last_superblock_checksum = r.read_opt_bytes()?;
            let seg_count = r.read_count("segment")?;
            for _ in 0..seg_count {
                let num = r.read_u64()?;
                let checksum = r.read_opt_bytes()?.ok_or_else(|| {
                    BlockError::Decode(format!("segment {num} carries no checksum"))
                })?;
                superblock_segments.insert(num, SuperBlockSegment::with_checksum(num, checksum));
            }
        }

        Ok(Self {
            version,
            block_num,
            transactions,
            block_checksum,
            last_block_checksum,
            wallet_state_checksum,
            signature_freeze_checksum,
            difficulty,
            last_superblock_num,
            last_superblock_checksum,
            superblock_segments,
        })
    }

    /// Computes the header checksum over the canonical field
    /// concatenation, prefixed by the domain lock.
    ///
    /// Optional checksums contribute only when present; segments
    /// contribute in ascending key order. Versions up to 2 hash with the
    /// quad variant, later versions with the square variant.
    pub fn calculate_checksum(&self, lock: &[u8], crypto: &dyn CryptoAdapter) -> Vec<u8> {
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

        // BTreeMap iteration is ascending by key.
        for (num, seg) in &self.superblock_segments {
            w.write_u64(*num);
            if let Some(c) = &seg.block_checksum {
                w.write_raw(c);
            }
        }

        if let Some(c) = &self.last_superblock_checksum {
            w.write_u64(self.last_superblock_num);
            w.write_raw(c);
        }

        checksum_hash(crypto, self.version, &w.into_bytes())
    }

    /// A genesis header has height zero and no previous-block checksum.
    pub fn is_genesis(&self) -> bool {
        self.block_num == 0 && self.last_block_checksum.is_none()
    }
}
