// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use crate::{
    message::Message,
    sync::{Error, StateSyncProtocolHandler},
};
use network::{NetworkContext, PeerId};

pub struct Context<'a> {
    pub io: &'a dyn NetworkContext,
    pub peer: PeerId,
    pub manager: &'a StateSyncProtocolHandler,
}

impl<'a> Context<'a> {
    pub fn send_response(&self, response: &dyn Message) -> Result<(), Error> {
        response.send(self.io, self.peer)?;
        Ok(())
    }
}

pub trait Handleable {
    fn handle(self, ctx: &Context) -> Result<(), Error>;
}
