// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use crate::{
    message::{decode_msg, Message, MsgId},
    sync::{
        message::{handle_message, msgid, Context, ListSnapshotsRequest},
        state::{SnapshotProvider, SnapshotSync},
        Error, ErrorKind,
    },
};
use ethereum_types::H256;
use network::{
    ChannelDescriptor, ChannelId, NetworkContext, NetworkProtocolHandler,
    PeerId, TimerToken, UpdateNodeOperation,
};
use parking_lot::RwLock;
use std::{collections::HashSet, sync::Arc, time::Duration};

/// Transfers snapshot listings and offers.
pub const METADATA_CHANNEL: ChannelId = 0x60;
/// Transfers snapshot chunks.
pub const CHUNK_CHANNEL: ChannelId = 0x61;

const MAX_MSG_SIZE: usize = 65_000_000;
const METADATA_MSG_SIZE: usize = 16_000_000;
const CHUNK_MSG_SIZE: usize = 64_000_000;

pub(super) const SOLICIT_SNAPSHOTS_TIMER: TimerToken = 0;
pub(super) const CHECK_REQUEST_TIMER: TimerToken = 1;

pub struct StateSyncConfiguration {
    /// Master switch. A disabled handler serves snapshots but never
    /// initiates a restore.
    pub enabled: bool,
    /// Application hash the node trusts at the restore target height,
    /// handed to the application with every snapshot offer.
    pub trusted_app_hash: H256,
    /// How often eligible peers are asked for their snapshot listings.
    pub solicit_snapshots_period: Duration,
    /// How long a chunk request may stay unanswered before it is routed
    /// to another peer.
    pub chunk_request_timeout: Duration,
    /// Cadence of the timeout scan.
    pub check_request_period: Duration,
}

impl Default for StateSyncConfiguration {
    fn default() -> Self {
        StateSyncConfiguration {
            enabled: true,
            trusted_app_hash: H256::zero(),
            solicit_snapshots_period: Duration::from_secs(10),
            chunk_request_timeout: Duration::from_secs(15),
            check_request_period: Duration::from_secs(1),
        }
    }
}

/// Handles state sync, both restoring a snapshot for the local node and
/// serving snapshots to peers doing state sync.
pub struct StateSyncProtocolHandler {
    pub config: StateSyncConfiguration,
    pub provider: Arc<dyn SnapshotProvider>,
    pub state_sync: SnapshotSync,
    peers: RwLock<HashSet<PeerId>>,
}

impl StateSyncProtocolHandler {
    pub fn new(
        config: StateSyncConfiguration, provider: Arc<dyn SnapshotProvider>,
    ) -> Self {
        let state_sync = SnapshotSync::new(
            provider.clone(),
            config.trusted_app_hash,
            config.chunk_request_timeout,
        );
        StateSyncProtocolHandler {
            config,
            provider,
            state_sync,
            peers: RwLock::new(HashSet::new()),
        }
    }

    /// Snapshots are solicited until a restore is running or finished.
    fn solicitation_eligible(&self) -> bool {
        !self.state_sync.is_active() && !self.state_sync.is_done()
    }

    fn solicit_snapshots(&self, io: &dyn NetworkContext) {
        if !self.solicitation_eligible() {
            return;
        }
        for peer in self.peers.read().iter() {
            debug!("Requesting snapshots from peer {}", peer);
            if let Err(e) = ListSnapshotsRequest.send(io, *peer) {
                error!(
                    "Failed to request snapshots, peer = {}, err = {:?}",
                    peer, e
                );
            }
        }
    }

    fn dispatch_message(
        &self, io: &dyn NetworkContext, peer: PeerId, channel: ChannelId,
        msg_id: MsgId, rlp: &rlp::Rlp,
    ) -> Result<(), Error>
    {
        trace!(
            "Dispatching message: peer = {}, channel = {:#x}, msgid = {}",
            peer, channel, msg_id
        );

        if !self.peers.read().contains(&peer) {
            warn!(
                "Message from unknown peer, peer = {}, msgid = {}",
                peer, msg_id
            );
            return Ok(());
        }

        let ctx = Context {
            io,
            peer,
            manager: self,
        };

        if !handle_message(&ctx, channel, msg_id, rlp)? {
            warn!("Unknown message, peer = {}, msgid = {}", peer, msg_id);
            io.disconnect_peer(
                peer,
                Some(UpdateNodeOperation::Remove),
                "unknown message",
            );
        }

        Ok(())
    }

    /// Error disposition for dispatched messages. Peer-attributable
    /// failures disconnect; application failures only surface in logs.
    fn handle_error(
        &self, io: &dyn NetworkContext, peer: PeerId, msg_id: MsgId, e: Error,
    ) {
        warn!(
            "Error while handling message, peer = {}, msgid = {}, \
             error = {:?}",
            peer, msg_id, e
        );

        let mut disconnect = true;
        let mut op = None;

        // No wildcard here: the compiler must flag unhandled new kinds.
        match e.0 {
            ErrorKind::InvalidMessageFormat => {
                op = Some(UpdateNodeOperation::Remove)
            }
            ErrorKind::InvalidSnapshot(_) => {
                op = Some(UpdateNodeOperation::Demotion)
            }
            ErrorKind::InvalidSnapshotChunk(_) => {
                op = Some(UpdateNodeOperation::Demotion)
            }
            ErrorKind::UnexpectedResponse => disconnect = true,
            ErrorKind::OversizedMessage(_, _) => {
                op = Some(UpdateNodeOperation::Remove)
            }
            ErrorKind::AppCall(_) => disconnect = false,
            ErrorKind::ChunkApply(_) => disconnect = false,
            ErrorKind::Decoder(_) => op = Some(UpdateNodeOperation::Remove),
            ErrorKind::Network(kind) => match kind {
                network::ErrorKind::BadProtocol => {
                    op = Some(UpdateNodeOperation::Remove)
                }
                network::ErrorKind::Decoder => {
                    op = Some(UpdateNodeOperation::Remove)
                }
                network::ErrorKind::OversizedPacket => disconnect = false,
                network::ErrorKind::SendQueueFull => disconnect = false,
                network::ErrorKind::Io(_) => disconnect = false,
                network::ErrorKind::Msg(_) => {
                    op = Some(UpdateNodeOperation::Failure)
                }
                network::ErrorKind::__Nonexhaustive {} => {
                    op = Some(UpdateNodeOperation::Failure)
                }
            },
            ErrorKind::Msg(_) => op = Some(UpdateNodeOperation::Failure),
            ErrorKind::__Nonexhaustive {} => {
                op = Some(UpdateNodeOperation::Failure)
            }
        }

        if disconnect {
            io.disconnect_peer(peer, op, "invalid message");
        }
    }
}

impl NetworkProtocolHandler for StateSyncProtocolHandler {
    fn channels(&self) -> Vec<ChannelDescriptor> {
        vec![
            ChannelDescriptor {
                id: METADATA_CHANNEL,
                priority: 3,
                send_queue_capacity: 100,
                recv_message_capacity: METADATA_MSG_SIZE,
            },
            // The shallow queue is deliberate: chunk traffic is bulky,
            // so producers block instead of buffering.
            ChannelDescriptor {
                id: CHUNK_CHANNEL,
                priority: 1,
                send_queue_capacity: 4,
                recv_message_capacity: CHUNK_MSG_SIZE,
            },
        ]
    }

    fn initialize(&self, io: &dyn NetworkContext) {
        info!("Starting state sync");
        if !self.config.enabled {
            info!("State sync disabled");
            return;
        }
        io.register_timer(
            SOLICIT_SNAPSHOTS_TIMER,
            self.config.solicit_snapshots_period,
        )
        .expect("Error registering solicit snapshots timer");
        io.register_timer(
            CHECK_REQUEST_TIMER,
            self.config.check_request_period,
        )
        .expect("Error registering check request timer");
    }

    fn on_message(
        &self, io: &dyn NetworkContext, peer: PeerId, channel: ChannelId,
        raw: &[u8],
    )
    {
        let limit = match channel {
            METADATA_CHANNEL => METADATA_MSG_SIZE,
            CHUNK_CHANNEL => CHUNK_MSG_SIZE,
            _ => {
                warn!(
                    "Message on unknown channel {:#x}, peer = {}",
                    channel, peer
                );
                io.disconnect_peer(
                    peer,
                    Some(UpdateNodeOperation::Remove),
                    "unknown channel",
                );
                return;
            }
        };

        if raw.len() > MAX_MSG_SIZE || raw.len() > limit {
            return self.handle_error(
                io,
                peer,
                msgid::INVALID,
                ErrorKind::OversizedMessage(
                    raw.len(),
                    limit.min(MAX_MSG_SIZE),
                )
                .into(),
            );
        }

        let (msg_id, rlp) = match decode_msg(raw) {
            Some(decoded) => decoded,
            None => {
                return self.handle_error(
                    io,
                    peer,
                    msgid::INVALID,
                    ErrorKind::InvalidMessageFormat.into(),
                )
            }
        };

        debug!("on_message: peer = {}, msgid = {}", peer, msg_id);

        self.dispatch_message(io, peer, channel, msg_id, &rlp)
            .unwrap_or_else(|e| self.handle_error(io, peer, msg_id, e));
    }

    fn on_peer_connected(&self, io: &dyn NetworkContext, peer: PeerId) {
        info!("Peer connected: peer = {}", peer);
        self.peers.write().insert(peer);

        // Solicit immediately; the timer covers the follow-ups.
        if self.config.enabled && self.solicitation_eligible() {
            debug!("Requesting snapshots from peer {}", peer);
            if let Err(e) = ListSnapshotsRequest.send(io, peer) {
                error!(
                    "Failed to request snapshots, peer = {}, err = {:?}",
                    peer, e
                );
            }
        }
    }

    fn on_peer_disconnected(&self, _io: &dyn NetworkContext, peer: PeerId) {
        info!("Peer disconnected: peer = {}", peer);
        self.peers.write().remove(&peer);
        self.state_sync.on_peer_disconnected(peer);
    }

    fn on_timeout(&self, io: &dyn NetworkContext, timer: TimerToken) {
        trace!("Timeout: timer = {}", timer);
        match timer {
            SOLICIT_SNAPSHOTS_TIMER => self.solicit_snapshots(io),
            CHECK_REQUEST_TIMER => self.state_sync.check_request_timeout(io),
            _ => warn!("Unknown timer {} triggered.", timer),
        }
    }
}
