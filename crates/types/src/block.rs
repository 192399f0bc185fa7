//! Header and body types for shard chains and the metachain.
//!
//! - [`Header`] - tagged union over [`ShardHeader`] and [`MetaHeader`]
//! - [`ShardData`] - a metachain notarization record for one shard header
//! - [`BlockBody`] - mini blocks referenced by a shard header (empty for the metachain)
//!
//! Headers are identified by `(nonce, hash)` where the hash is the Keccak256
//! of the RLP encoding of the whole tagged header.

use crate::{Error, Result, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shard identifier
pub type ShardId = u32;

/// Shard id reserved for the metachain.
pub const METACHAIN_SHARD_ID: ShardId = u32::MAX;

/// Which chain a header belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainKind {
    /// A shard chain header
    Shard,
    /// A metachain header
    Meta,
}

impl ChainKind {
    fn tag(self) -> u8 {
        match self {
            ChainKind::Shard => 0,
            ChainKind::Meta => 1,
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKind::Shard => write!(f, "shard"),
            ChainKind::Meta => write!(f, "meta"),
        }
    }
}

/// Summary of a mini block as carried in a shard header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniBlockHeader {
    /// Hash of the referenced mini block
    pub hash: H256,
    /// Shard the transactions originate from
    pub sender_shard_id: ShardId,
    /// Shard the transactions are executed on
    pub receiver_shard_id: ShardId,
    /// Number of transactions in the mini block
    pub tx_count: u32,
}

/// A batch of transaction hashes between two shards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniBlock {
    /// Shard the transactions originate from
    pub sender_shard_id: ShardId,
    /// Shard the transactions are executed on
    pub receiver_shard_id: ShardId,
    /// Transaction hashes
    pub tx_hashes: Vec<H256>,
}

impl MiniBlock {
    /// Keccak256 of the RLP encoding.
    pub fn hash(&self) -> H256 {
        H256::keccak256(&rlp::encode(self))
    }

    /// RLP encodes the mini block.
    pub fn encode_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decodes a mini block from RLP bytes.
    pub fn decode_bytes(data: &[u8]) -> Result<Self> {
        rlp::decode(data).map_err(Error::RlpDecode)
    }

    /// Builds the header entry that references this mini block.
    pub fn to_header(&self) -> MiniBlockHeader {
        MiniBlockHeader {
            hash: self.hash(),
            sender_shard_id: self.sender_shard_id,
            receiver_shard_id: self.receiver_shard_id,
            tx_count: self.tx_hashes.len() as u32,
        }
    }
}

/// Block body. Metachain blocks have no separate body and use [`BlockBody::empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    /// Mini blocks in header order
    pub mini_blocks: Vec<MiniBlock>,
}

impl BlockBody {
    /// An empty body.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if the body carries no mini blocks.
    pub fn is_empty(&self) -> bool {
        self.mini_blocks.is_empty()
    }
}

/// A shard chain block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardHeader {
    /// Sequence number within the shard chain (genesis is 0)
    pub nonce: u64,
    /// Consensus round the block was proposed in
    pub round: u64,
    /// Epoch
    pub epoch: u32,
    /// Shard this header belongs to
    pub shard_id: ShardId,
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
    /// Hash of the previous header
    pub prev_hash: H256,
    /// Account trie root after executing the block
    pub root_hash: H256,
    /// Mini blocks making up the body
    pub mini_block_headers: Vec<MiniBlockHeader>,
    /// Metachain headers this block has seen
    pub meta_block_hashes: Vec<H256>,
}

/// Metachain notarization record for a single shard header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardData {
    /// Shard the notarized header belongs to
    pub shard_id: ShardId,
    /// Hash of the notarized shard header
    pub header_hash: H256,
    /// Root hash of the notarized shard header
    pub root_hash: H256,
}

/// A metachain block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaHeader {
    /// Sequence number within the metachain (genesis is 0)
    pub nonce: u64,
    /// Consensus round the block was proposed in
    pub round: u64,
    /// Epoch
    pub epoch: u32,
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
    /// Hash of the previous header
    pub prev_hash: H256,
    /// Account trie root after executing the block
    pub root_hash: H256,
    /// Shard headers notarized by this block
    pub shard_info: Vec<ShardData>,
}

/// A block header of either chain kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Header {
    /// Shard chain header
    Shard(ShardHeader),
    /// Metachain header
    Meta(MetaHeader),
}

impl Header {
    /// Chain kind discriminant.
    pub fn kind(&self) -> ChainKind {
        match self {
            Header::Shard(_) => ChainKind::Shard,
            Header::Meta(_) => ChainKind::Meta,
        }
    }

    /// Block nonce.
    pub fn nonce(&self) -> u64 {
        match self {
            Header::Shard(h) => h.nonce,
            Header::Meta(h) => h.nonce,
        }
    }

    /// Consensus round.
    pub fn round(&self) -> u64 {
        match self {
            Header::Shard(h) => h.round,
            Header::Meta(h) => h.round,
        }
    }

    /// Epoch.
    pub fn epoch(&self) -> u32 {
        match self {
            Header::Shard(h) => h.epoch,
            Header::Meta(h) => h.epoch,
        }
    }

    /// Shard id, [`METACHAIN_SHARD_ID`] for metachain headers.
    pub fn shard_id(&self) -> ShardId {
        match self {
            Header::Shard(h) => h.shard_id,
            Header::Meta(_) => METACHAIN_SHARD_ID,
        }
    }

    /// Hash of the previous header.
    pub fn prev_hash(&self) -> H256 {
        match self {
            Header::Shard(h) => h.prev_hash,
            Header::Meta(h) => h.prev_hash,
        }
    }

    /// Account trie root.
    pub fn root_hash(&self) -> H256 {
        match self {
            Header::Shard(h) => h.root_hash,
            Header::Meta(h) => h.root_hash,
        }
    }

    /// Returns the metachain header, if this is one.
    pub fn as_meta(&self) -> Option<&MetaHeader> {
        match self {
            Header::Meta(h) => Some(h),
            Header::Shard(_) => None,
        }
    }

    /// Returns the shard header, if this is one.
    pub fn as_shard(&self) -> Option<&ShardHeader> {
        match self {
            Header::Shard(h) => Some(h),
            Header::Meta(_) => None,
        }
    }

    /// Keccak256 of the RLP encoding.
    pub fn hash(&self) -> H256 {
        H256::keccak256(&rlp::encode(self))
    }

    /// RLP encodes the header.
    pub fn encode_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decodes a header from RLP bytes.
    pub fn decode_bytes(data: &[u8]) -> Result<Self> {
        rlp::decode(data).map_err(Error::RlpDecode)
    }
}

impl From<ShardHeader> for Header {
    fn from(header: ShardHeader) -> Self {
        Header::Shard(header)
    }
}

impl From<MetaHeader> for Header {
    fn from(header: MetaHeader) -> Self {
        Header::Meta(header)
    }
}

fn append_all<T: Encodable>(s: &mut RlpStream, items: &[T]) {
    s.begin_list(items.len());
    for item in items {
        s.append(item);
    }
}

impl Encodable for MiniBlockHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.hash);
        s.append(&self.sender_shard_id);
        s.append(&self.receiver_shard_id);
        s.append(&self.tx_count);
    }
}

impl Decodable for MiniBlockHeader {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            hash: rlp.val_at(0)?,
            sender_shard_id: rlp.val_at(1)?,
            receiver_shard_id: rlp.val_at(2)?,
            tx_count: rlp.val_at(3)?,
        })
    }
}

impl Encodable for MiniBlock {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.sender_shard_id);
        s.append(&self.receiver_shard_id);
        append_all(s, &self.tx_hashes);
    }
}

impl Decodable for MiniBlock {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            sender_shard_id: rlp.val_at(0)?,
            receiver_shard_id: rlp.val_at(1)?,
            tx_hashes: rlp.list_at(2)?,
        })
    }
}

impl Encodable for ShardData {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.shard_id);
        s.append(&self.header_hash);
        s.append(&self.root_hash);
    }
}

impl Decodable for ShardData {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            shard_id: rlp.val_at(0)?,
            header_hash: rlp.val_at(1)?,
            root_hash: rlp.val_at(2)?,
        })
    }
}

impl Encodable for ShardHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(9);
        s.append(&self.nonce);
        s.append(&self.round);
        s.append(&self.epoch);
        s.append(&self.shard_id);
        s.append(&self.timestamp);
        s.append(&self.prev_hash);
        s.append(&self.root_hash);
        append_all(s, &self.mini_block_headers);
        append_all(s, &self.meta_block_hashes);
    }
}

impl Decodable for ShardHeader {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 9 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            nonce: rlp.val_at(0)?,
            round: rlp.val_at(1)?,
            epoch: rlp.val_at(2)?,
            shard_id: rlp.val_at(3)?,
            timestamp: rlp.val_at(4)?,
            prev_hash: rlp.val_at(5)?,
            root_hash: rlp.val_at(6)?,
            mini_block_headers: rlp.list_at(7)?,
            meta_block_hashes: rlp.list_at(8)?,
        })
    }
}

impl Encodable for MetaHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(7);
        s.append(&self.nonce);
        s.append(&self.round);
        s.append(&self.epoch);
        s.append(&self.timestamp);
        s.append(&self.prev_hash);
        s.append(&self.root_hash);
        append_all(s, &self.shard_info);
    }
}

impl Decodable for MetaHeader {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 7 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            nonce: rlp.val_at(0)?,
            round: rlp.val_at(1)?,
            epoch: rlp.val_at(2)?,
            timestamp: rlp.val_at(3)?,
            prev_hash: rlp.val_at(4)?,
            root_hash: rlp.val_at(5)?,
            shard_info: rlp.list_at(6)?,
        })
    }
}

impl Encodable for Header {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.kind().tag());
        match self {
            Header::Shard(h) => s.append(h),
            Header::Meta(h) => s.append(h),
        };
    }
}

impl Decodable for Header {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let tag: u8 = rlp.val_at(0)?;
        match tag {
            0 => Ok(Header::Shard(rlp.val_at(1)?)),
            1 => Ok(Header::Meta(rlp.val_at(1)?)),
            _ => Err(DecoderError::Custom("unknown header kind")),
        }
    }
}
