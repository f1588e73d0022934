// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

mod error;
pub mod message;
pub mod state;
mod state_sync_protocol_handler;


pub use self::{
    error::{Error, ErrorKind},
    state_sync_protocol_handler::{
        StateSyncConfiguration, StateSyncProtocolHandler, CHUNK_CHANNEL,
        METADATA_CHANNEL,
    },
};
