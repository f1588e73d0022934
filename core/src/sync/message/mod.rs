// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

mod handleable;
mod list_snapshots_request;
mod list_snapshots_response;
mod snapshot_chunk_request;
mod snapshot_chunk_response;

pub use self::{
    handleable::{Context, Handleable},
    list_snapshots_request::ListSnapshotsRequest,
    list_snapshots_response::ListSnapshotsResponse,
    snapshot_chunk_request::GetSnapshotChunkRequest,
    snapshot_chunk_response::GetSnapshotChunkResponse,
};

use crate::{
    message::MsgId,
    sync::{Error, ErrorKind, CHUNK_CHANNEL, METADATA_CHANNEL},
};
use network::ChannelId;
use rlp::Rlp;

build_msgid! {
    LIST_SNAPSHOTS = 0x00
    LIST_SNAPSHOTS_RESPONSE = 0x01
    GET_SNAPSHOT_CHUNK = 0x02
    GET_SNAPSHOT_CHUNK_RESPONSE = 0x03
    INVALID = 0xff
}

fn check_channel(
    channel: ChannelId, expected: ChannelId,
) -> Result<(), Error> {
    if channel != expected {
        bail!(ErrorKind::InvalidMessageFormat);
    }
    Ok(())
}

/// Decode, validate and handle one inbound message. Returns `Ok(false)` for
/// message ids this protocol does not know. Every message passes
/// `validate_basic` before its handler runs.
pub fn handle_message(
    ctx: &Context, channel: ChannelId, msg_id: MsgId, rlp: &Rlp,
) -> Result<bool, Error> {
    match msg_id {
        msgid::LIST_SNAPSHOTS => {
            check_channel(channel, METADATA_CHANNEL)?;
            let msg = rlp.as_val::<ListSnapshotsRequest>()?;
            msg.validate_basic()?;
            msg.handle(ctx)?
        }
        msgid::LIST_SNAPSHOTS_RESPONSE => {
            check_channel(channel, METADATA_CHANNEL)?;
            let msg = rlp.as_val::<ListSnapshotsResponse>()?;
            msg.validate_basic()?;
            msg.handle(ctx)?
        }
        msgid::GET_SNAPSHOT_CHUNK => {
            check_channel(channel, CHUNK_CHANNEL)?;
            let msg = rlp.as_val::<GetSnapshotChunkRequest>()?;
            msg.validate_basic()?;
            msg.handle(ctx)?
        }
        msgid::GET_SNAPSHOT_CHUNK_RESPONSE => {
            check_channel(channel, CHUNK_CHANNEL)?;
            let msg = rlp.as_val::<GetSnapshotChunkResponse>()?;
            msg.validate_basic()?;
            msg.handle(ctx)?
        }
        _ => return Ok(false),
    }

    Ok(true)
}
