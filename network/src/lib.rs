// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Interface surface of the peer transport consumed by protocol handlers.
//!
//! The transport itself (framing, encryption, session lifecycle) lives
//! outside this workspace. Handlers are registered with it through the
//! `NetworkProtocolHandler` trait and talk back through `NetworkContext`.

#[macro_use]
extern crate error_chain;

mod error;

pub use self::error::{Error, ErrorKind};

use std::time::Duration;

/// Index of a connected session, assigned by the session manager.
pub type PeerId = usize;

/// Identifier of one logical stream multiplexed over a peer connection.
pub type ChannelId = u8;

/// Token identifying a timer registered by a protocol handler.
pub type TimerToken = usize;

/// What the node database should record about a peer on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateNodeOperation {
    Failure,
    Demotion,
    Remove,
}

/// Scheduling class of an outbound message within its send queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendQueuePriority {
    High,
    Normal,
    Low,
}

/// Static properties of one channel, declared by the protocol handler at
/// registration time. The transport sizes its queues and inbound buffers
/// accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub id: ChannelId,
    /// Relative scheduling weight against the protocol's other channels.
    pub priority: u8,
    /// Outbound queue depth. Senders block once the queue is full.
    pub send_queue_capacity: usize,
    /// Largest inbound message accepted on this channel.
    pub recv_message_capacity: usize,
}

/// Handle into the transport passed to every handler callback.
pub trait NetworkContext {
    fn send(
        &self, peer: PeerId, channel: ChannelId, msg: Vec<u8>,
        priority: SendQueuePriority,
    ) -> Result<(), Error>;

    fn disconnect_peer(
        &self, peer: PeerId, op: Option<UpdateNodeOperation>, reason: &str,
    );

    fn register_timer(
        &self, token: TimerToken, delay: Duration,
    ) -> Result<(), Error>;
}

/// Callbacks a protocol handler receives from the transport event loop.
pub trait NetworkProtocolHandler: Send + Sync {
    /// Channels this protocol speaks, queried once at registration.
    fn channels(&self) -> Vec<ChannelDescriptor>;

    fn initialize(&self, io: &dyn NetworkContext);

    fn on_message(
        &self, io: &dyn NetworkContext, peer: PeerId, channel: ChannelId,
        raw: &[u8],
    );

    fn on_peer_connected(&self, io: &dyn NetworkContext, peer: PeerId);

    fn on_peer_disconnected(&self, io: &dyn NetworkContext, peer: PeerId);

    fn on_timeout(&self, io: &dyn NetworkContext, timer: TimerToken);
}
