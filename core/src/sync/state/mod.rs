// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

mod snapshot_sync;
pub mod storage;

pub use self::{
    snapshot_sync::{SnapshotSync, Status},
    storage::{
        checksum, OfferResult, Snapshot, SnapshotChunk, SnapshotProvider,
    },
};
