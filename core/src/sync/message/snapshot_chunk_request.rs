// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use crate::{
    message::{Message, MsgId},
    sync::{
        message::{msgid, Context, GetSnapshotChunkResponse, Handleable},
        Error, ErrorKind, CHUNK_CHANNEL,
    },
};
use network::{ChannelId, SendQueuePriority};
use rlp_derive::{RlpDecodable, RlpEncodable};

/// Asks a peer for one chunk of the snapshot identified by
/// `(height, format)`. Chunk indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetSnapshotChunkRequest {
    pub height: u64,
    pub format: u32,
    pub chunk: u64,
}

build_msg_impl! {
    GetSnapshotChunkRequest, msgid::GET_SNAPSHOT_CHUNK,
    "tendermint/GetSnapshotChunkRequestMessage",
    CHUNK_CHANNEL, SendQueuePriority::Low
}

impl GetSnapshotChunkRequest {
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
        Ok(())
    }
}

impl Handleable for GetSnapshotChunkRequest {
    fn handle(self, ctx: &Context) -> Result<(), Error> {
        info!(
            "Providing snapshot chunk, height = {}, format = {}, chunk = {}",
            self.height, self.format, self.chunk
        );

        let chunk = ctx
            .manager
            .provider
            .load_chunk(self.height, self.format, self.chunk)
            .map_err(|e| {
                Error::from(ErrorKind::AppCall(format!(
                    "failed to load chunk {} of snapshot ({}, {}): {}",
                    self.chunk, self.height, self.format, e
                )))
            })?;

        ctx.send_response(&GetSnapshotChunkResponse { chunk })
    }
}
