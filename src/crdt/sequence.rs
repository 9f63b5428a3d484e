// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! The replicated sequence: a convergent ordered store of atoms.
//!
//! This is an RGA (Replicated Growable Array). Every inserted byte becomes
//! an [`Atom`] that names its parent (the atom immediately to its left at
//! insertion time), and deletions leave tombstones behind so that later
//! merges can still order around them. Replicas exchange atoms in any
//! order, any number of times, and converge to identical content.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                           Sequence                                │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  atoms: AtomArena          <- slots + intrusive prev/next links   │
//! │  index: FxHashMap          <- OpId -> slot handle, O(1) parents   │
//! │  orphans: FxHashMap        <- parent OpId -> atoms waiting on it  │
//! │  pending_deletes: Set      <- deletes that beat their insert      │
//! │  clock: LamportClock       <- ordering                            │
//! │  versions: VersionMap      <- causal history, drives deltas & GC  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The arena stands in for a doubly-linked list: slot handles stay valid
//! across arbitrary insertions and are only invalidated when reclamation
//! removes that specific atom. Handles never cross the API boundary;
//! callers see atoms by value.
//!
//! # Out-of-order delivery
//!
//! An atom whose parent has not arrived yet is parked in the orphan buffer
//! and replayed when the parent is integrated (cascading through any
//! atoms that were waiting on *it*). A delete whose target has not arrived
//! is parked in the pending-delete set and applied the instant the target
//! is integrated. Both buffers drain to empty once every operation has
//! been delivered at least once.
//!
//! # Reclamation
//!
//! Tombstones are removed by [`Sequence::gc`] only below a frontier every
//! participating replica has witnessed (see
//! [`coordinator`](crate::crdt::coordinator)), or by [`Sequence::gc_local`]
//! below a local age cutoff in single-participant deployments.

use std::fmt;
use std::io;
use std::io::Read;
use std::io::Write;
use std::time::Instant;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Serialize;

use crate::crdt::atom::Atom;
use crate::crdt::atom::OpId;
use crate::crdt::clock::LamportClock;
use crate::crdt::stats::GcStats;
use crate::crdt::stats::MemoryStats;
use crate::crdt::version::VersionMap;
use crate::crdt::Crdt;
use crate::wire;
use crate::wire::packer;
use crate::wire::FormatError;

/// Magic bytes at the head of a stored sequence.
const MAGIC: [u8; 4] = *b"OMNI";

/// The persistence version this build writes.
const FORMAT_VERSION: u8 = 2;

// =============================================================================
// Configuration
// =============================================================================

/// Automatic tombstone reclamation settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcConfig {
    /// Run local reclamation automatically when the tombstone count
    /// reaches `tombstone_threshold`. Only safe for single-participant
    /// deployments; coordinated deployments should drive
    /// [`Sequence::gc`] through a frontier instead.
    pub auto_gc: bool,
    /// Tombstone count at which automatic reclamation kicks in.
    pub tombstone_threshold: usize,
    /// Age (in clock ticks) a tombstone must reach before automatic
    /// reclamation may remove it.
    pub min_age: u64,
}

impl Default for GcConfig {
    fn default() -> GcConfig {
        return GcConfig {
            auto_gc: false,
            tombstone_threshold: 1024,
            min_age: 64,
        };
    }
}

/// Orphan buffer admission settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanConfig {
    /// Maximum buffered orphans before the oldest ~10% are evicted.
    pub max_buffer: usize,
    /// Reject incoming orphans whose seq lags the local clock by more
    /// than this. `u64::MAX` disables the check.
    pub max_age: u64,
}

impl Default for OrphanConfig {
    fn default() -> OrphanConfig {
        return OrphanConfig {
            max_buffer: 8192,
            max_age: u64::MAX,
        };
    }
}

// =============================================================================
// Ordered store
// =============================================================================

/// Null handle.
const NIL: usize = usize::MAX;

/// One arena slot: an atom plus its intrusive list links.
#[derive(Clone, Debug)]
struct Slot {
    atom: Atom,
    prev: usize,
    next: usize,
}

/// The ordered container: an arena of slots threaded into a doubly-linked
/// list, with a free list for reuse. Slot 0 always holds the head sentinel.
#[derive(Clone, Debug)]
struct AtomArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    tail: usize,
    len: usize,
}

impl AtomArena {
    fn new() -> AtomArena {
        let sentinel = Slot {
            atom: Atom::sentinel(),
            prev: NIL,
            next: NIL,
        };
        return AtomArena {
            slots: vec![sentinel],
            free: Vec::new(),
            tail: 0,
            len: 1,
        };
    }

    /// Atoms in the container, sentinel included.
    fn len(&self) -> usize {
        return self.len;
    }

    /// The sentinel's handle.
    fn head(&self) -> usize {
        return 0;
    }

    fn get(&self, handle: usize) -> &Atom {
        return &self.slots[handle].atom;
    }

    fn get_mut(&mut self, handle: usize) -> &mut Atom {
        return &mut self.slots[handle].atom;
    }

    /// The handle after `handle`, or NIL at the end.
    fn next(&self, handle: usize) -> usize {
        return self.slots[handle].next;
    }

    /// Link a new atom in immediately after `after`.
    /// Returns the new atom's handle.
    fn insert_after(&mut self, after: usize, atom: Atom) -> usize {
        let next = self.slots[after].next;
        let slot = Slot {
            atom,
            prev: after,
            next,
        };

        let handle = match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = slot;
                handle
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };

        self.slots[after].next = handle;
        if next == NIL {
            self.tail = handle;
        } else {
            self.slots[next].prev = handle;
        }
        self.len += 1;
        return handle;
    }

    /// Link a new atom in at the end.
    fn push_back(&mut self, atom: Atom) -> usize {
        let tail = self.tail;
        return self.insert_after(tail, atom);
    }

    /// Unlink an atom and recycle its slot. The handle is dead afterwards.
    fn remove(&mut self, handle: usize) -> Atom {
        debug_assert!(handle != self.head(), "the sentinel is permanent");

        let prev = self.slots[handle].prev;
        let next = self.slots[handle].next;
        self.slots[prev].next = next;
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }

        let atom = self.slots[handle].atom;
        self.free.push(handle);
        self.len -= 1;
        return atom;
    }

    /// Walk the container in document order, sentinel first.
    fn iter(&self) -> ArenaIter<'_> {
        return ArenaIter {
            arena: self,
            cursor: self.head(),
        };
    }

    /// Estimated bytes held by the slot storage.
    fn byte_size(&self) -> usize {
        return self.slots.len() * std::mem::size_of::<Slot>();
    }
}

struct ArenaIter<'a> {
    arena: &'a AtomArena,
    cursor: usize,
}

impl<'a> Iterator for ArenaIter<'a> {
    type Item = (usize, &'a Atom);

    fn next(&mut self) -> Option<(usize, &'a Atom)> {
        if self.cursor == NIL {
            return None;
        }
        let handle = self.cursor;
        self.cursor = self.arena.slots[handle].next;
        return Some((handle, &self.arena.slots[handle].atom));
    }
}

// =============================================================================
// Sequence
// =============================================================================

/// A convergent replicated sequence of bytes.
///
/// One `Sequence` is one replica. Local edits return the atoms (or ids)
/// to broadcast; remote operations are absorbed through
/// [`remote_merge`](Sequence::remote_merge) and
/// [`remote_delete`](Sequence::remote_delete) in any order, with any
/// duplication.
#[derive(Clone, Debug)]
pub struct Sequence {
    replica_id: u64,
    clock: LamportClock,
    versions: VersionMap,
    atoms: AtomArena,
    /// OpId -> slot handle for every atom in the container.
    index: FxHashMap<OpId, usize>,
    /// Missing parent OpId -> atoms waiting on it.
    orphans: FxHashMap<OpId, Vec<Atom>>,
    orphan_count: usize,
    /// Deletes whose target has not arrived yet.
    pending_deletes: FxHashSet<OpId>,
    tombstone_count: usize,
    visible_count: usize,
    gc_config: GcConfig,
    orphan_config: OrphanConfig,
    gc_stats: GcStats,
}

impl Sequence {
    /// Create an empty sequence for the given replica.
    pub fn new(replica_id: u64) -> Sequence {
        let atoms = AtomArena::new();
        let mut index = FxHashMap::default();
        index.insert(OpId::SENTINEL, atoms.head());

        return Sequence {
            replica_id,
            clock: LamportClock::new(),
            versions: VersionMap::new(replica_id),
            atoms,
            index,
            orphans: FxHashMap::default(),
            orphan_count: 0,
            pending_deletes: FxHashSet::default(),
            tombstone_count: 0,
            visible_count: 0,
            gc_config: GcConfig::default(),
            orphan_config: OrphanConfig::default(),
            gc_stats: GcStats::default(),
        };
    }

    /// This replica's id.
    pub fn replica_id(&self) -> u64 {
        return self.replica_id;
    }

    /// The current logical time.
    pub fn clock(&self) -> u64 {
        return self.clock.peek();
    }

    /// A copy of this replica's version map, for sharing with peers.
    pub fn versions(&self) -> VersionMap {
        return self.versions.clone();
    }

    /// Visible length (tombstones and sentinel excluded).
    pub fn len(&self) -> usize {
        return self.visible_count;
    }

    /// Check whether no content is visible.
    pub fn is_empty(&self) -> bool {
        return self.visible_count == 0;
    }

    /// Tombstones currently held in the container.
    pub fn tombstone_count(&self) -> usize {
        return self.tombstone_count;
    }

    /// Atoms parked in the orphan buffer.
    pub fn orphan_count(&self) -> usize {
        return self.orphan_count;
    }

    /// Deletes waiting for their target to arrive.
    pub fn pending_delete_count(&self) -> usize {
        return self.pending_deletes.len();
    }

    /// The automatic reclamation settings.
    pub fn gc_config(&self) -> GcConfig {
        return self.gc_config;
    }

    /// Replace the automatic reclamation settings.
    pub fn set_gc_config(&mut self, config: GcConfig) {
        self.gc_config = config;
    }

    /// The orphan buffer settings.
    pub fn orphan_config(&self) -> OrphanConfig {
        return self.orphan_config;
    }

    /// Replace the orphan buffer settings.
    pub fn set_orphan_config(&mut self, config: OrphanConfig) {
        self.orphan_config = config;
    }

    /// Accumulated reclamation statistics.
    pub fn gc_stats(&self) -> GcStats {
        return self.gc_stats;
    }

    /// The visible content as raw bytes.
    pub fn bytes(&self) -> Vec<u8> {
        return self
            .atoms
            .iter()
            .filter(|(_, atom)| atom.is_visible())
            .map(|(_, atom)| atom.payload)
            .collect();
    }

    // -------------------------------------------------------------------------
    // Local operations
    // -------------------------------------------------------------------------

    /// Insert `payload` at the given visible position.
    ///
    /// The position selects the parent: the atom in visible slot
    /// `index - 1`, or the sentinel for position 0, clamped to the last
    /// visible atom past the end. The atom then takes its place among the
    /// parent's children by the sibling order (smaller (seq, replica)
    /// pairs sort earlier), exactly as it will on every other replica.
    /// Returns the new atom for broadcast.
    pub fn local_insert(&mut self, index: usize, payload: u8) -> Atom {
        let seq = self.clock.tick();
        self.versions.tick_owner();

        let parent = self.parent_for_insert(index);
        let origin = self.atoms.get(parent).id;
        let atom = Atom::new(OpId::new(self.replica_id, seq), origin, payload);

        // Same integration path as remote atoms, so local and remote
        // insertions order identically.
        self.integrate(atom);
        return atom;
    }

    /// Delete the byte at the given visible position.
    ///
    /// Returns the tombstoned atom's id for broadcast, or the sentinel id
    /// when the position is out of range (in which case nothing changes).
    pub fn local_delete(&mut self, index: usize) -> OpId {
        let Some(handle) = self.visible_handle_at(index) else {
            return OpId::SENTINEL;
        };

        let atom = self.atoms.get_mut(handle);
        atom.deleted = true;
        let id = atom.id;
        self.tombstone_count += 1;
        self.visible_count -= 1;

        // The owner entry tracks the clock across deletes too, so
        // version-map exchanges observe delete activity.
        let seq = self.clock.tick();
        self.versions.update(self.replica_id, seq);

        self.maybe_auto_gc();
        return id;
    }

    // -------------------------------------------------------------------------
    // Remote operations
    // -------------------------------------------------------------------------

    /// Absorb an atom received from a peer.
    ///
    /// Returns true when the atom was integrated into the container, false
    /// when it was a duplicate or had to be buffered or rejected. Safe to
    /// call any number of times with the same atom.
    pub fn remote_merge(&mut self, atom: Atom) -> bool {
        self.clock.merge(atom.id.seq);
        return self.integrate(atom);
    }

    /// Absorb a delete received from a peer.
    ///
    /// An unknown target is parked until its insert arrives; a sentinel or
    /// already-tombstoned target is ignored.
    pub fn remote_delete(&mut self, target: OpId) {
        if target.is_sentinel() {
            return;
        }

        match self.index.get(&target) {
            Some(&handle) => {
                let atom = self.atoms.get_mut(handle);
                if !atom.deleted {
                    atom.deleted = true;
                    self.tombstone_count += 1;
                    self.visible_count -= 1;
                    self.maybe_auto_gc();
                }
            }
            None => {
                self.pending_deletes.insert(target);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Delta synchronization
    // -------------------------------------------------------------------------

    /// Every atom the peer has not seen, in container order.
    ///
    /// Tombstones are included: they carry the deletion fact. Parents
    /// precede children in container order, which keeps orphaning to a
    /// minimum when the receiver applies the delta in order.
    pub fn delta(&self, peer: &VersionMap) -> Vec<Atom> {
        let mut missing = Vec::new();
        for (_, atom) in self.atoms.iter() {
            if atom.is_sentinel() {
                continue;
            }
            if atom.id.seq > peer.get(atom.id.replica) {
                missing.push(*atom);
            }
        }
        return missing;
    }

    /// Apply a delta produced by a peer's [`Sequence::delta`].
    ///
    /// Live atoms are merged; tombstoned atoms are merged in their live
    /// form and then deleted, so a replica that never saw the insert still
    /// reconstructs the atom (and can parent its descendants) before the
    /// deletion fact lands.
    pub fn apply_delta(&mut self, atoms: &[Atom]) {
        for &atom in atoms {
            if atom.deleted {
                let mut live = atom;
                live.deleted = false;
                self.remote_merge(live);
                self.remote_delete(atom.id);
            } else {
                self.remote_merge(atom);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Reclamation
    // -------------------------------------------------------------------------

    /// Remove every tombstone at or below the frontier.
    ///
    /// The frontier must be a pointwise lower bound of every participating
    /// replica's version map; reclaiming past a replica that has not seen
    /// a delete can resurrect content if the delete is ever replayed. A
    /// replica absent from the frontier reads as 0, so none of its
    /// tombstones qualify.
    ///
    /// Returns the number of tombstones removed.
    pub fn gc(&mut self, frontier: &VersionMap) -> usize {
        return self.reclaim(|atom| atom.id.seq <= frontier.get(atom.id.replica));
    }

    /// Remove every tombstone older than `age` clock ticks.
    ///
    /// Intended for single-participant deployments; in a multi-participant
    /// deployment this can remove tombstones peers still need, which is
    /// the caller's responsibility.
    pub fn gc_local(&mut self, age: u64) -> usize {
        let cutoff = self.clock.peek().saturating_sub(age);
        return self.reclaim(move |atom| atom.id.seq <= cutoff);
    }

    /// A snapshot of this sequence's memory footprint.
    pub fn memory_stats(&self) -> MemoryStats {
        use std::mem::size_of;

        return MemoryStats {
            atom_count: self.atoms.len() - 1,
            tombstone_count: self.tombstone_count,
            orphan_count: self.orphan_count,
            pending_delete_count: self.pending_deletes.len(),
            container_bytes: self.atoms.byte_size(),
            index_bytes: self.index.len() * (size_of::<OpId>() + size_of::<usize>()),
            orphan_bytes: self.orphan_count * size_of::<Atom>()
                + self.orphans.len() * size_of::<OpId>(),
            version_bytes: self.versions.iter().count() * 2 * size_of::<u64>(),
        };
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Write the whole sequence to a stream.
    pub fn save<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&[FORMAT_VERSION])?;
        writer.write_all(&self.replica_id.to_le_bytes())?;
        writer.write_all(&self.clock.peek().to_le_bytes())?;
        self.versions.serialize(writer)?;

        writer.write_all(&(self.atoms.len() as u64).to_le_bytes())?;
        for (_, atom) in self.atoms.iter() {
            packer::write_atom(writer, atom)?;
        }
        return Ok(());
    }

    /// Replace this sequence's state with one read from a stream.
    ///
    /// Accepts format versions 1 (no version map) and 2. The tombstone
    /// count and version map are rebuilt from the loaded atoms, and the
    /// clock is raised over the highest loaded seq, so the usual
    /// invariants hold even for a version-1 file. The sequence keeps its
    /// own replica id. On error the sequence is left unchanged.
    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<(), FormatError> {
        let mut magic = [0u8; 4];
        wire::read_exact(reader, &mut magic)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic);
        }

        let version = wire::read_u8(reader)?;
        if version != 1 && version != 2 {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let _owner = wire::read_u64_le(reader)?;
        let clock_time = wire::read_u64_le(reader)?;

        let mut versions = if version == 2 {
            VersionMap::deserialize(self.replica_id, reader)?
        } else {
            VersionMap::new(self.replica_id)
        };

        let count = wire::read_u64_le(reader)?;
        if count == 0 {
            return Err(FormatError::MissingSentinel);
        }

        let first = packer::read_atom(reader)?;
        if !first.is_sentinel() {
            return Err(FormatError::MissingSentinel);
        }

        let mut atoms = AtomArena::new();
        let mut index = FxHashMap::default();
        index.insert(OpId::SENTINEL, atoms.head());

        let mut tombstone_count = 0;
        let mut visible_count = 0;
        let mut max_seq = 0;

        for _ in 1..count {
            let atom = packer::read_atom(reader)?;
            let handle = atoms.push_back(atom);
            if index.insert(atom.id, handle).is_some() {
                return Err(FormatError::DuplicateAtom(atom.id));
            }
            if atom.deleted {
                tombstone_count += 1;
            } else {
                visible_count += 1;
            }
            versions.update(atom.id.replica, atom.id.seq);
            max_seq = max_seq.max(atom.id.seq);
        }

        self.clock = LamportClock::with_time(clock_time.max(max_seq));
        self.versions = versions;
        self.atoms = atoms;
        self.index = index;
        self.orphans.clear();
        self.orphan_count = 0;
        self.pending_deletes.clear();
        self.tombstone_count = tombstone_count;
        self.visible_count = visible_count;

        tracing::debug!(
            atoms = self.atoms.len() - 1,
            tombstones = self.tombstone_count,
            version,
            "loaded sequence"
        );
        return Ok(());
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Order an atom into the container.
    ///
    /// This is the single integration path shared by local inserts, remote
    /// merges, orphan replay, and delta application.
    fn integrate(&mut self, mut atom: Atom) -> bool {
        self.versions.update(atom.id.replica, atom.id.seq);

        if self.index.contains_key(&atom.id) {
            return false;
        }

        let Some(&parent) = self.index.get(&atom.origin) else {
            self.buffer_orphan(atom);
            return false;
        };

        // Scan right from the parent. Successors whose origin is older
        // than ours lie outside the parent's subtree: insert before them.
        // A sibling (same origin) with a larger id also stops the scan;
        // anything else is a descendant of an already-placed sibling and
        // gets skipped.
        let mut prev = parent;
        let mut cursor = self.atoms.next(parent);
        while cursor != NIL {
            let successor = self.atoms.get(cursor);
            if successor.origin.seq < atom.origin.seq {
                break;
            }
            if successor.origin == atom.origin && atom.id < successor.id {
                break;
            }
            prev = cursor;
            cursor = self.atoms.next(cursor);
        }

        // A delete may have arrived first: land directly as a tombstone.
        if self.pending_deletes.remove(&atom.id) {
            atom.deleted = true;
        }

        let handle = self.atoms.insert_after(prev, atom);
        self.index.insert(atom.id, handle);
        if atom.deleted {
            self.tombstone_count += 1;
        } else {
            self.visible_count += 1;
        }

        // Anything waiting on this atom can now be placed (and may in
        // turn release more orphans).
        if let Some(waiting) = self.orphans.remove(&atom.id) {
            self.orphan_count -= waiting.len();
            for orphan in waiting {
                self.integrate(orphan);
            }
        }

        self.maybe_auto_gc();
        return true;
    }

    /// Park an atom whose parent has not arrived.
    fn buffer_orphan(&mut self, atom: Atom) {
        let lag = self.clock.peek().saturating_sub(atom.id.seq);
        if lag > self.orphan_config.max_age {
            tracing::debug!(id = ?atom.id, lag, "rejected stale orphan");
            return;
        }

        if let Some(bucket) = self.orphans.get(&atom.origin) {
            if bucket.iter().any(|waiting| waiting.id == atom.id) {
                return;
            }
        }

        if self.orphan_count + 1 > self.orphan_config.max_buffer {
            self.evict_orphans();
        }

        tracing::trace!(id = ?atom.id, origin = ?atom.origin, "buffered orphan");
        self.orphans.entry(atom.origin).or_default().push(atom);
        self.orphan_count += 1;
    }

    /// Drop ~10% of buffered orphans, oldest ids first. Evicted atoms can
    /// only re-enter through retransmission or delta sync.
    fn evict_orphans(&mut self) {
        let target = (self.orphan_count / 10).max(1);

        let mut victims: Vec<(OpId, OpId)> = Vec::with_capacity(self.orphan_count);
        for (&origin, bucket) in &self.orphans {
            for waiting in bucket {
                victims.push((waiting.id, origin));
            }
        }
        victims.sort_unstable_by_key(|&(id, _)| id);
        victims.truncate(target);

        for (id, origin) in victims {
            if let Some(bucket) = self.orphans.get_mut(&origin) {
                bucket.retain(|waiting| waiting.id != id);
                if bucket.is_empty() {
                    self.orphans.remove(&origin);
                }
                self.orphan_count -= 1;
            }
        }

        tracing::debug!(
            evicted = target,
            remaining = self.orphan_count,
            "orphan buffer over capacity"
        );
    }

    /// Remove tombstones matching `doomed`, timing the pass.
    fn reclaim<F: Fn(&Atom) -> bool>(&mut self, doomed: F) -> usize {
        let start = Instant::now();

        let victims: Vec<(usize, OpId)> = self
            .atoms
            .iter()
            .filter(|(_, atom)| atom.deleted && doomed(atom))
            .map(|(handle, atom)| (handle, atom.id))
            .collect();

        for &(handle, id) in &victims {
            self.atoms.remove(handle);
            self.index.remove(&id);
        }
        self.tombstone_count -= victims.len();

        let removed = victims.len();
        self.gc_stats.record(start.elapsed(), removed);
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = self.tombstone_count,
                "reclaimed tombstones"
            );
        }
        return removed;
    }

    fn maybe_auto_gc(&mut self) {
        if self.gc_config.auto_gc && self.tombstone_count >= self.gc_config.tombstone_threshold {
            self.gc_local(self.gc_config.min_age);
        }
    }

    /// The handle of the atom that will become the parent of an insert at
    /// the given visible position: the sentinel for position 0, otherwise
    /// the atom in visible slot `index - 1`, clamped to the last visible
    /// atom.
    fn parent_for_insert(&self, index: usize) -> usize {
        let mut parent = self.atoms.head();
        if index == 0 {
            return parent;
        }

        let mut remaining = index;
        let mut cursor = self.atoms.next(parent);
        while cursor != NIL {
            if self.atoms.get(cursor).is_visible() {
                parent = cursor;
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }
            cursor = self.atoms.next(cursor);
        }
        return parent;
    }

    /// The handle of the atom in the given visible slot, if any.
    fn visible_handle_at(&self, index: usize) -> Option<usize> {
        let mut seen = 0;
        for (handle, atom) in self.atoms.iter() {
            if !atom.is_visible() {
                continue;
            }
            if seen == index {
                return Some(handle);
            }
            seen += 1;
        }
        return None;
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&String::from_utf8_lossy(&self.bytes()));
    }
}

impl Crdt for Sequence {
    /// State-based merge: pull everything the other replica has that we
    /// lack, then reconcile tombstones (a delete of an atom we already
    /// hold is not covered by the version-map filter).
    fn merge(&mut self, other: &Self) {
        let missing = other.delta(&self.versions);
        self.apply_delta(&missing);

        for (_, atom) in other.atoms.iter() {
            if atom.deleted {
                self.remote_delete(atom.id);
            }
        }
    }
}
