// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Coordinated tombstone reclamation across peers.
//!
//! Removing a tombstone is only safe once every participating replica has
//! witnessed the delete; otherwise a replayed delete can resurrect
//! content. The coordinator tracks each peer's version map, classifies
//! peers as active or stale by wall-clock inactivity, and computes the
//! *stable frontier*: the pointwise minimum version map across the owner
//! and every active peer. Everything at or below the frontier has been
//! seen by everyone, so tombstones there can go.
//!
//! ```
//! use omnisync::crdt::coordinator::GcCoordinator;
//! use omnisync::crdt::sequence::Sequence;
//!
//! let mut doc = Sequence::new(1);
//! let mut coordinator = GcCoordinator::new(1);
//!
//! coordinator.register_peer(2);
//! // ... as heartbeats arrive:
//! // coordinator.receive_heartbeat(2, their_version_map);
//!
//! if coordinator.should_trigger() {
//!     let removed = coordinator.perform(&mut doc);
//!     println!("reclaimed {} tombstones", removed);
//! }
//! ```

use std::time::Duration;
use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;

use crate::crdt::sequence::Sequence;
use crate::crdt::version::VersionMap;

/// Scheduling knobs for coordinated reclamation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// How often the caller should drive [`GcCoordinator::send_heartbeat`].
    pub heartbeat_interval: Duration,
    /// Maximum silence before a peer stops counting as active.
    pub peer_timeout: Duration,
    /// Minimum spacing between automatic reclamation cycles.
    pub gc_interval: Duration,
    /// Whether [`GcCoordinator::should_trigger`] may ever return true.
    pub auto_gc: bool,
    /// Minimum active peers below which reclamation is deferred.
    pub min_peers: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> CoordinatorConfig {
        return CoordinatorConfig {
            heartbeat_interval: Duration::from_secs(5),
            peer_timeout: Duration::from_secs(30),
            gc_interval: Duration::from_secs(60),
            auto_gc: true,
            min_peers: 1,
        };
    }
}

/// What the coordinator knows about one peer.
#[derive(Clone, Debug)]
struct PeerState {
    /// The peer's last-reported version map.
    versions: VersionMap,
    /// When that report arrived.
    last_seen: Instant,
    /// False until the first report; registration alone proves nothing.
    active: bool,
}

/// Tracks peer version maps and schedules safe reclamation.
///
/// The coordinator holds only copies: it never owns or mutates a
/// sequence's internals beyond the [`GcCoordinator::perform`] call the
/// caller asks for.
#[derive(Clone, Debug)]
pub struct GcCoordinator {
    replica_id: u64,
    config: CoordinatorConfig,
    /// The owner's last-known version map.
    versions: VersionMap,
    peers: FxHashMap<u64, PeerState>,
    last_gc: Instant,
}

impl GcCoordinator {
    /// Create a coordinator with default configuration.
    pub fn new(replica_id: u64) -> GcCoordinator {
        return GcCoordinator::with_config(replica_id, CoordinatorConfig::default());
    }

    /// Create a coordinator with the given configuration.
    pub fn with_config(replica_id: u64, config: CoordinatorConfig) -> GcCoordinator {
        return GcCoordinator {
            replica_id,
            config,
            versions: VersionMap::new(replica_id),
            peers: FxHashMap::default(),
            last_gc: Instant::now(),
        };
    }

    /// This coordinator's replica id.
    pub fn replica_id(&self) -> u64 {
        return self.replica_id;
    }

    /// The current configuration.
    pub fn config(&self) -> CoordinatorConfig {
        return self.config;
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: CoordinatorConfig) {
        self.config = config;
    }

    /// The owner's last-known version map.
    pub fn own_versions(&self) -> &VersionMap {
        return &self.versions;
    }

    /// Refresh the owner's version map (call after local operations, or
    /// let [`GcCoordinator::perform`] do it from the sequence).
    pub fn update_own_versions(&mut self, versions: VersionMap) {
        self.versions = versions;
    }

    /// Add a peer in the inactive state. Registering the owner or an
    /// already-known peer changes nothing.
    pub fn register_peer(&mut self, peer: u64) {
        if peer == self.replica_id {
            return;
        }
        self.peers.entry(peer).or_insert_with(|| PeerState {
            versions: VersionMap::new(peer),
            last_seen: Instant::now(),
            active: false,
        });
    }

    /// Record a fresh version map from a peer, registering it if unknown
    /// and marking it active. Reports about the owner itself are ignored.
    pub fn update_peer_state(&mut self, peer: u64, versions: VersionMap) {
        if peer == self.replica_id {
            return;
        }
        let state = self.peers.entry(peer).or_insert_with(|| PeerState {
            versions: VersionMap::new(peer),
            last_seen: Instant::now(),
            active: false,
        });
        state.versions = versions;
        state.last_seen = Instant::now();
        state.active = true;
    }

    /// Forget a peer entirely.
    pub fn remove_peer(&mut self, peer: u64) {
        self.peers.remove(&peer);
    }

    /// All registered peers, active or not.
    pub fn peer_count(&self) -> usize {
        return self.peers.len();
    }

    /// Peers that have reported at least once and within the timeout.
    pub fn active_peers(&self) -> Vec<u64> {
        let now = Instant::now();
        let mut active: Vec<u64> = self
            .peers
            .iter()
            .filter(|(_, state)| {
                state.active && now.duration_since(state.last_seen) <= self.config.peer_timeout
            })
            .map(|(&peer, _)| peer)
            .collect();
        active.sort_unstable();
        return active;
    }

    /// The number of currently active peers.
    pub fn active_peer_count(&self) -> usize {
        return self.active_peers().len();
    }

    /// The pointwise minimum version map over the owner and every active
    /// peer: the boundary below which everyone has seen everything.
    ///
    /// With no active peers this returns an empty map, which reclaims
    /// nothing.
    pub fn compute_frontier(&self) -> VersionMap {
        let active = self.active_peers();
        if active.is_empty() {
            return VersionMap::new(self.replica_id);
        }

        let mut maps: Vec<&VersionMap> = vec![&self.versions];
        for peer in &active {
            maps.push(&self.peers[peer].versions);
        }
        return VersionMap::minimum(self.replica_id, &maps);
    }

    /// Whether an automatic reclamation cycle is due: auto reclamation
    /// enabled, the configured interval has elapsed, and enough peers are
    /// active.
    pub fn should_trigger(&self) -> bool {
        if !self.config.auto_gc {
            return false;
        }
        if self.last_gc.elapsed() < self.config.gc_interval {
            return false;
        }
        return self.active_peer_count() >= self.config.min_peers;
    }

    /// Run one coordinated reclamation cycle on a sequence.
    ///
    /// Refreshes the owner's version map from the sequence, computes the
    /// frontier, reclaims below it, and stamps the cycle time. Returns
    /// the number of tombstones removed.
    pub fn perform(&mut self, doc: &mut Sequence) -> usize {
        self.versions = doc.versions();
        let frontier = self.compute_frontier();
        let removed = doc.gc(&frontier);
        self.last_gc = Instant::now();

        tracing::debug!(
            removed,
            active_peers = self.active_peer_count(),
            "coordinated reclamation cycle"
        );
        return removed;
    }

    /// Invoke `send` once per registered peer (active or not) with the
    /// owner's version map.
    pub fn send_heartbeat<F: FnMut(u64, &VersionMap)>(&self, mut send: F) {
        for &peer in self.peers.keys() {
            send(peer, &self.versions);
        }
    }

    /// Absorb a heartbeat from a peer.
    pub fn receive_heartbeat(&mut self, peer: u64, versions: VersionMap) {
        self.update_peer_state(peer, versions);
    }
}
