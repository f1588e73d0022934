// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use crate::sync::{
    message::{Context, GetSnapshotChunkRequest},
    state::storage::{OfferResult, Snapshot, SnapshotChunk, SnapshotProvider},
    Error, ErrorKind,
};
use crate::message::Message;
use ethereum_types::H256;
use network::{NetworkContext, PeerId};
use parking_lot::Mutex;
use rand::seq::IteratorRandom;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

/// Restore progress of the local node. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// No snapshot accepted yet; candidates may still be evaluated.
    Idle,
    /// An offer was accepted; fetching chunk `next_chunk`.
    Active { snapshot: Snapshot, next_chunk: u64 },
    /// The final chunk applied cleanly. The consensus layer resumes
    /// block processing from `height + 1`.
    Done { height: u64, format: u32, app_hash: H256 },
    /// The restore hit an unrecoverable error.
    Failed { reason: String },
}

struct Inner {
    status: Status,
    /// Peers known to advertise each candidate snapshot, learned from
    /// snapshot listings and pruned on disconnect. Used to reroute the
    /// in-flight chunk request when a peer stalls.
    candidate_peers: HashMap<(u64, u32), HashSet<PeerId>>,
    /// The peer currently serving the active restore.
    source_peer: Option<PeerId>,
    /// When the in-flight chunk request was sent.
    requested_at: Option<Instant>,
}

/// Drives a restore from accepted offer to final applied chunk. All state
/// mutation is serialized behind the inner lock, so exactly one inbound
/// event advances the machine at a time.
pub struct SnapshotSync {
    provider: Arc<dyn SnapshotProvider>,
    trusted_app_hash: H256,
    chunk_request_timeout: Duration,
    inner: Mutex<Inner>,
}

impl SnapshotSync {
    pub fn new(
        provider: Arc<dyn SnapshotProvider>, trusted_app_hash: H256,
        chunk_request_timeout: Duration,
    ) -> Self
    {
        SnapshotSync {
            provider,
            trusted_app_hash,
            chunk_request_timeout,
            inner: Mutex::new(Inner {
                status: Status::Idle,
                candidate_peers: HashMap::new(),
                source_peer: None,
                requested_at: None,
            }),
        }
    }

    pub fn status(&self) -> Status { self.inner.lock().status.clone() }

    pub fn is_active(&self) -> bool {
        match self.inner.lock().status {
            Status::Active { .. } => true,
            _ => false,
        }
    }

    pub fn is_done(&self) -> bool {
        match self.inner.lock().status {
            Status::Done { .. } => true,
            _ => false,
        }
    }

    /// Evaluate a snapshot listing received from `ctx.peer`. Candidates
    /// are offered to the application from the highest-ranked down; the
    /// first accepted one activates the restore and chunk 1 is requested
    /// from the listing peer.
    pub fn handle_snapshot_list(
        &self, ctx: &Context, mut snapshots: Vec<Snapshot>,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock();

        // Remember who can serve what even when a restore is already
        // running; the advertisers double as retry targets.
        for snapshot in &snapshots {
            inner
                .candidate_peers
                .entry(snapshot.key())
                .or_insert_with(HashSet::new)
                .insert(ctx.peer);
        }

        match inner.status {
            Status::Idle => {}
            _ => return Ok(()),
        }

        info!(
            "Received {} snapshots from peer {}",
            snapshots.len(),
            ctx.peer
        );
        if snapshots.is_empty() {
            return Ok(());
        }

        snapshots.sort_by(|a, b| {
            b.height.cmp(&a.height).then(b.format.cmp(&a.format))
        });

        for snapshot in snapshots {
            info!(
                "Offering snapshot, height = {}, format = {}",
                snapshot.height, snapshot.format
            );
            match self
                .provider
                .offer_snapshot(&snapshot, &self.trusted_app_hash)
            {
                Ok(OfferResult::Accept) => {
                    info!(
                        "Accepted snapshot, height = {}, format = {}",
                        snapshot.height, snapshot.format
                    );
                    inner.source_peer = Some(ctx.peer);
                    Self::request_chunk(
                        &mut inner,
                        ctx.io,
                        ctx.peer,
                        &snapshot,
                        1,
                    );
                    inner.status = Status::Active {
                        snapshot,
                        next_chunk: 1,
                    };
                    break;
                }
                Ok(result) => {
                    info!(
                        "Rejected snapshot ({:?}), height = {}, format = {}",
                        result, snapshot.height, snapshot.format
                    );
                }
                Err(e) => {
                    let err = Error::from(ErrorKind::AppCall(format!(
                        "snapshot offer failed: {}",
                        e
                    )));
                    error!("{}", err);
                    inner.status = Status::Failed {
                        reason: err.to_string(),
                    };
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Apply a chunk received from `ctx.peer` and request the next one.
    pub fn handle_chunk(
        &self, ctx: &Context, chunk: SnapshotChunk,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock();

        let (snapshot, next_chunk) = match &inner.status {
            Status::Active {
                snapshot,
                next_chunk,
            } => (snapshot.clone(), *next_chunk),
            _ => {
                debug!(
                    "Received chunk with no restore in progress, peer = {}",
                    ctx.peer
                );
                return Ok(());
            }
        };

        if chunk.height != snapshot.height || chunk.format != snapshot.format
        {
            warn!(
                "Received chunk for wrong snapshot, expected = ({}, {}), \
                 got = ({}, {}), peer = {}",
                snapshot.height,
                snapshot.format,
                chunk.height,
                chunk.format,
                ctx.peer
            );
            bail!(ErrorKind::UnexpectedResponse);
        }

        if chunk.chunk < next_chunk {
            debug!(
                "Dropping duplicate chunk {}, peer = {}",
                chunk.chunk, ctx.peer
            );
            return Ok(());
        }

        if chunk.chunk > next_chunk {
            warn!(
                "Received chunk {} out of order, expected {}, peer = {}",
                chunk.chunk, next_chunk, ctx.peer
            );
            bail!(ErrorKind::UnexpectedResponse);
        }

        if !chunk.is_checksum_valid() {
            bail!(ErrorKind::InvalidSnapshotChunk(
                "checksum mismatch".into()
            ));
        }

        info!("Applying chunk {} of {}", chunk.chunk, snapshot.chunks);
        if let Err(e) = self.provider.apply_chunk(&chunk) {
            let err = Error::from(ErrorKind::ChunkApply(e.to_string()));
            error!("{}", err);
            inner.status = Status::Failed {
                reason: err.to_string(),
            };
            inner.requested_at = None;
            return Err(err);
        }

        if chunk.chunk == snapshot.chunks {
            info!(
                "Restore complete, height = {}, format = {}",
                snapshot.height, snapshot.format
            );
            inner.status = Status::Done {
                height: snapshot.height,
                format: snapshot.format,
                app_hash: self.trusted_app_hash,
            };
            inner.source_peer = None;
            inner.requested_at = None;
        } else {
            inner.source_peer = Some(ctx.peer);
            Self::request_chunk(
                &mut inner,
                ctx.io,
                ctx.peer,
                &snapshot,
                chunk.chunk + 1,
            );
            inner.status = Status::Active {
                snapshot,
                next_chunk: chunk.chunk + 1,
            };
        }

        Ok(())
    }

    /// Re-request the in-flight chunk when its source peer has stalled.
    /// Another peer advertising the active snapshot is preferred; with
    /// nobody left to ask, the restore fails.
    pub fn check_request_timeout(&self, io: &dyn NetworkContext) {
        let mut inner = self.inner.lock();

        let (snapshot, next_chunk) = match &inner.status {
            Status::Active {
                snapshot,
                next_chunk,
            } => (snapshot.clone(), *next_chunk),
            _ => return,
        };

        match inner.requested_at {
            Some(requested_at)
                if requested_at.elapsed() >= self.chunk_request_timeout => {}
            _ => return,
        }

        let source = inner.source_peer;
        let peer = {
            let advertisers = inner.candidate_peers.get(&snapshot.key());
            let mut rng = rand::thread_rng();
            advertisers
                .and_then(|peers| {
                    peers
                        .iter()
                        .filter(|peer| Some(**peer) != source)
                        .choose(&mut rng)
                        .or_else(|| peers.iter().choose(&mut rng))
                })
                .copied()
        };

        match peer {
            Some(peer) => {
                warn!(
                    "Snapshot chunk request timed out, re-requesting, \
                     chunk = {}, peer = {}",
                    next_chunk, peer
                );
                inner.source_peer = Some(peer);
                Self::request_chunk(&mut inner, io, peer, &snapshot, next_chunk);
            }
            None => {
                error!(
                    "Snapshot chunk request timed out with no peers \
                     advertising snapshot ({}, {})",
                    snapshot.height, snapshot.format
                );
                inner.status = Status::Failed {
                    reason: "no peers advertising the active snapshot"
                        .into(),
                };
                inner.source_peer = None;
                inner.requested_at = None;
            }
        }
    }

    pub fn on_peer_disconnected(&self, peer: PeerId) {
        let mut inner = self.inner.lock();
        for peers in inner.candidate_peers.values_mut() {
            peers.remove(&peer);
        }
        inner.candidate_peers.retain(|_, peers| !peers.is_empty());
        if inner.source_peer == Some(peer) {
            inner.source_peer = None;
        }
    }

    fn request_chunk(
        inner: &mut Inner, io: &dyn NetworkContext, peer: PeerId,
        snapshot: &Snapshot, chunk: u64,
    )
    {
        info!("Fetching snapshot chunk, peer = {}, chunk = {}", peer, chunk);
        let request = GetSnapshotChunkRequest {
            height: snapshot.height,
            format: snapshot.format,
            chunk,
        };
        if let Err(e) = request.send(io, peer) {
            // The request-timeout check re-sends on the next tick.
            error!(
                "Failed to request snapshot chunk, peer = {}, err = {:?}",
                peer, e
            );
        }
        inner.requested_at = Some(Instant::now());
    }
}
