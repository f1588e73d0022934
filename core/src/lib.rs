// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Snapshot state sync: restores a recent application snapshot from peers
//! chunk by chunk instead of replaying the full block history, and serves
//! locally stored snapshots to peers doing the same.

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

#[macro_use]
pub mod message;
pub mod sync;

pub use crate::sync::{
    state::{
        checksum, OfferResult, Snapshot, SnapshotChunk, SnapshotProvider,
        SnapshotSync, Status,
    },
    Error, ErrorKind, StateSyncConfiguration, StateSyncProtocolHandler,
    CHUNK_CHANNEL, METADATA_CHANNEL,
};
