// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use crate::{
    message::{Message, MsgId},
    sync::{
        message::{msgid, Context, Handleable},
        state::SnapshotChunk,
        Error, CHUNK_CHANNEL,
    },
};
use network::{ChannelId, SendQueuePriority};
use rlp_derive::{RlpDecodable, RlpEncodable};

/// Carries one snapshot chunk towards a restoring peer.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetSnapshotChunkResponse {
    pub chunk: SnapshotChunk,
}

build_msg_impl! {
    GetSnapshotChunkResponse, msgid::GET_SNAPSHOT_CHUNK_RESPONSE,
    "tendermint/GetSnapshotChunkResponseMessage",
    CHUNK_CHANNEL, SendQueuePriority::Low
}

impl GetSnapshotChunkResponse {
    pub fn validate_basic(&self) -> Result<(), Error> {
        self.chunk.validate_basic()
    }
}

impl Handleable for GetSnapshotChunkResponse {
    fn handle(self, ctx: &Context) -> Result<(), Error> {
        if !ctx.manager.config.enabled {
            debug!("State sync disabled, ignoring snapshot chunk");
            return Ok(());
        }
        ctx.manager.state_sync.handle_chunk(ctx, self.chunk)
    }
}
