// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use network::{
    ChannelId, Error as NetworkError, NetworkContext, PeerId,
    SendQueuePriority,
};
use rlp::{Encodable, Rlp};

pub type MsgId = u8;

macro_rules! build_msgid {
    ($($name:ident = $value:expr)*) => {
        #[allow(dead_code)]
        pub mod msgid {
            use super::MsgId;
            $(pub const $name: MsgId = $value;)*
        }
    }
}

macro_rules! build_msg_impl {
    ($name:ident, $msg:expr, $name_str:literal, $channel:expr, $priority:expr) => {
        impl Message for $name {
            fn msg_id(&self) -> MsgId { $msg }

            fn msg_name(&self) -> &'static str { $name_str }

            fn channel(&self) -> ChannelId { $channel }

            fn priority(&self) -> SendQueuePriority { $priority }
        }
    };
}

pub trait Message: Send + Sync + Encodable {
    fn msg_id(&self) -> MsgId;

    /// Name the message is registered under in the codec. Stable across
    /// releases; peers identify message kinds by it.
    fn msg_name(&self) -> &'static str;

    /// The channel this message travels on.
    fn channel(&self) -> ChannelId;

    fn priority(&self) -> SendQueuePriority { SendQueuePriority::High }

    fn encode(&self) -> Vec<u8> {
        let payload = self.rlp_bytes();
        let mut encoded = Vec::with_capacity(payload.len() + 1);
        encoded.push(self.msg_id());
        encoded.extend_from_slice(&payload);
        encoded
    }

    fn send(
        &self, io: &dyn NetworkContext, peer: PeerId,
    ) -> Result<(), NetworkError> {
        if let Err(e) =
            io.send(peer, self.channel(), self.encode(), self.priority())
        {
            debug!("Error sending message: {:?}", e);
            return Err(e);
        }

        debug!("Send message({}) to peer {}", self.msg_name(), peer);
        Ok(())
    }
}

pub fn decode_msg(msg: &[u8]) -> Option<(MsgId, Rlp)> {
    if msg.len() < 2 {
        return None;
    }

    Some((msg[0], Rlp::new(&msg[1..])))
}
