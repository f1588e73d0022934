// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use crate::sync::{Error, ErrorKind};
use ethereum_types::{H160, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use sha1::{Digest, Sha1};

/// Upper bound on the opaque metadata carried by a snapshot listing.
pub const MAX_SNAPSHOT_METADATA_SIZE: usize = 16 * 1024 * 1024;
/// Upper bound on a single chunk payload.
pub const MAX_CHUNK_DATA_SIZE: usize = 64 * 1024 * 1024;

/// 160-bit transport checksum over a chunk payload. Guards against
/// corruption in transit, not against a malicious serving peer.
pub fn checksum(data: &[u8]) -> H160 {
    H160::from_slice(Sha1::digest(data).as_slice())
}

/// Metadata describing one application snapshot, advertised to restoring
/// peers. A snapshot is uniquely identified by `(height, format)`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Application height the snapshot represents. Never 0.
    pub height: u64,
    /// Application-defined encoding version.
    pub format: u32,
    /// Total number of chunks, at least 1.
    pub chunks: u64,
    /// Opaque application-supplied descriptor.
    pub metadata: Vec<u8>,
}

impl Snapshot {
    pub fn key(&self) -> (u64, u32) { (self.height, self.format) }

    pub fn validate_basic(&self) -> Result<(), Error> {
        if self.height == 0 {
            bail!(ErrorKind::InvalidSnapshot("height cannot be 0".into()));
        }
        if self.chunks == 0 {
            bail!(ErrorKind::InvalidSnapshot(
                "chunk count cannot be 0".into()
            ));
        }
        if self.metadata.len() > MAX_SNAPSHOT_METADATA_SIZE {
            bail!(ErrorKind::InvalidSnapshot(format!(
                "metadata too large ({} > {})",
                self.metadata.len(),
                MAX_SNAPSHOT_METADATA_SIZE
            )));
        }
        Ok(())
    }
}

impl Encodable for Snapshot {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4)
            .append(&self.height)
            .append(&self.format)
            .append(&self.chunks)
            .append(&self.metadata);
    }
}

impl Decodable for Snapshot {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }

        Ok(Snapshot {
            height: rlp.val_at(0)?,
            format: rlp.val_at(1)?,
            chunks: rlp.val_at(2)?,
            metadata: rlp.val_at(3)?,
        })
    }
}

/// One piece of a snapshot, identified by `(height, format, chunk)`.
/// Chunk indices are 1-based; index 0 is invalid on the wire.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SnapshotChunk {
    pub height: u64,
    pub format: u32,
    pub chunk: u64,
    pub data: Vec<u8>,
    pub checksum: H160,
}

impl SnapshotChunk {
    pub fn validate_basic(&self) -> Result<(), Error> {
        if self.height == 0 {
            bail!(ErrorKind::InvalidSnapshotChunk(
                "height cannot be 0".into()
            ));
        }
        if self.chunk == 0 {
            bail!(ErrorKind::InvalidSnapshotChunk(
                "chunk index cannot be 0".into()
            ));
        }
        if self.data.len() > MAX_CHUNK_DATA_SIZE {
            bail!(ErrorKind::InvalidSnapshotChunk(format!(
                "data too large ({} > {})",
                self.data.len(),
                MAX_CHUNK_DATA_SIZE
            )));
        }
        Ok(())
    }

    /// Whether `data` hashes to the advertised checksum.
    pub fn is_checksum_valid(&self) -> bool {
        checksum(&self.data) == self.checksum
    }
}

impl Encodable for SnapshotChunk {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(5)
            .append(&self.height)
            .append(&self.format)
            .append(&self.chunk)
            .append(&self.data)
            .append(&self.checksum);
    }
}

impl Decodable for SnapshotChunk {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 5 {
            return Err(DecoderError::RlpIncorrectListLen);
        }

        Ok(SnapshotChunk {
            height: rlp.val_at(0)?,
            format: rlp.val_at(1)?,
            chunk: rlp.val_at(2)?,
            data: rlp.val_at(3)?,
            checksum: rlp.val_at(4)?,
        })
    }
}

/// Application verdict on a snapshot offer. The rejection reasons are
/// distinguishable so callers can log them, but all of them are benign:
/// the next candidate is tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferResult {
    Accept,
    Reject,
    RejectFormat,
    RejectHeight,
}

/// The application back-end this subsystem restores into and serves from.
/// The four calls map one-to-one onto the snapshot connection of the
/// application; the bridge adds no policy of its own.
pub trait SnapshotProvider: Send + Sync {
    /// Enumerate locally stored snapshots available to serve.
    fn list_snapshots(&self) -> Result<Vec<Snapshot>, Error>;

    /// Load one chunk for serving. Must return a populated chunk or an
    /// error, never an empty placeholder.
    fn load_chunk(
        &self, height: u64, format: u32, chunk: u64,
    ) -> Result<SnapshotChunk, Error>;

    /// Decide whether to begin restoring the offered snapshot.
    /// `app_hash` is the application hash the node trusts at the
    /// snapshot height.
    fn offer_snapshot(
        &self, snapshot: &Snapshot, app_hash: &H256,
    ) -> Result<OfferResult, Error>;

    /// Apply one chunk. Chunks arrive in strictly ascending index order;
    /// the application commits on the final one.
    fn apply_chunk(&self, chunk: &SnapshotChunk) -> Result<(), Error>;
}
