// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use crate::{
    message::{Message, MsgId},
    sync::{
        message::{msgid, Context, Handleable},
        state::Snapshot,
        Error, METADATA_CHANNEL,
    },
};
use network::{ChannelId, SendQueuePriority};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// The snapshots a peer is able to serve, in no particular order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListSnapshotsResponse {
    pub snapshots: Vec<Snapshot>,
}

build_msg_impl! {
    ListSnapshotsResponse, msgid::LIST_SNAPSHOTS_RESPONSE,
    "tendermint/ListSnapshotsResponseMessage",
    METADATA_CHANNEL, SendQueuePriority::High
}

impl ListSnapshotsResponse {
    pub fn validate_basic(&self) -> Result<(), Error> {
        for snapshot in &self.snapshots {
            snapshot.validate_basic()?;
        }
        Ok(())
    }
}

impl Encodable for ListSnapshotsResponse {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(1).append_list(&self.snapshots);
    }
}

impl Decodable for ListSnapshotsResponse {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 1 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(ListSnapshotsResponse {
            snapshots: rlp.list_at(0)?,
        })
    }
}

impl Handleable for ListSnapshotsResponse {
    fn handle(self, ctx: &Context) -> Result<(), Error> {
        if !ctx.manager.config.enabled {
            debug!("State sync disabled, ignoring snapshot listing");
            return Ok(());
        }
        ctx.manager.state_sync.handle_snapshot_list(ctx, self.snapshots)
    }
}
