// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use crate::{
    message::{Message, MsgId},
    sync::{
        message::{msgid, Context, Handleable, ListSnapshotsResponse},
        Error, METADATA_CHANNEL,
    },
};
use network::{ChannelId, SendQueuePriority};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Solicits the remote peer's locally stored snapshots.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListSnapshotsRequest;

build_msg_impl! {
    ListSnapshotsRequest, msgid::LIST_SNAPSHOTS,
    "tendermint/ListSnapshotsRequestMessage",
    METADATA_CHANNEL, SendQueuePriority::High
}

impl ListSnapshotsRequest {
    pub fn validate_basic(&self) -> Result<(), Error> { Ok(()) }
}

impl Encodable for ListSnapshotsRequest {
    fn rlp_append(&self, s: &mut RlpStream) { s.begin_list(0); }
}

impl Decodable for ListSnapshotsRequest {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 0 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(ListSnapshotsRequest)
    }
}

impl Handleable for ListSnapshotsRequest {
    fn handle(self, ctx: &Context) -> Result<(), Error> {
        let snapshots = match ctx.manager.provider.list_snapshots() {
            Ok(snapshots) => snapshots,
            Err(e) => {
                error!("Failed to list snapshots: {}", e);
                return Ok(());
            }
        };

        debug!(
            "Providing {} snapshots to peer {}",
            snapshots.len(),
            ctx.peer
        );
        ctx.send_response(&ListSnapshotsResponse { snapshots })
    }
}
