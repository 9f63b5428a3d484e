// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Version maps for causal history tracking.
//!
//! A version map records, per replica, the highest sequence number this
//! replica has observed from it. Missing entries read as 0. Version maps
//! answer three questions:
//!
//! 1. **What am I missing?** A peer's map filters delta production down to
//!    the atoms the peer has not seen.
//! 2. **How do two histories relate?** [`VersionMap::compare`] yields
//!    before / after / equal / concurrent.
//! 3. **What has *everyone* seen?** The pointwise minimum across maps is
//!    the frontier below which tombstone reclamation is safe.

use std::io;
use std::io::Read;
use std::io::Write;

use rustc_hash::FxHashMap;

use crate::wire::read_u32_le;
use crate::wire::read_u64_le;
use crate::wire::FormatError;

/// The causal relationship between two version maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Causality {
    /// Every entry is <= the other's, at least one strictly.
    Before,
    /// Every entry is >= the other's, at least one strictly.
    After,
    /// All entries agree.
    Equal,
    /// Each side has seen something the other has not.
    Concurrent,
}

/// A per-replica map of highest observed sequence numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionMap {
    /// The replica this map belongs to.
    owner: u64,
    /// Highest observed seq per replica. Absent reads as 0.
    entries: FxHashMap<u64, u64>,
}

impl VersionMap {
    /// Create a map owned by `owner`, seeded with `owner -> 0`.
    pub fn new(owner: u64) -> VersionMap {
        let mut entries = FxHashMap::default();
        entries.insert(owner, 0);
        return VersionMap { owner, entries };
    }

    /// The replica this map belongs to.
    pub fn owner(&self) -> u64 {
        return self.owner;
    }

    /// The highest observed seq for a replica (0 if never seen).
    pub fn get(&self, replica: u64) -> u64 {
        return self.entries.get(&replica).copied().unwrap_or(0);
    }

    /// Increment the owner's entry.
    /// Returns the new value.
    pub fn tick_owner(&mut self) -> u64 {
        let entry = self.entries.entry(self.owner).or_insert(0);
        *entry += 1;
        return *entry;
    }

    /// Record that `seq` from `replica` has been observed.
    /// Entries only move forward.
    pub fn update(&mut self, replica: u64, seq: u64) {
        let entry = self.entries.entry(replica).or_insert(0);
        *entry = (*entry).max(seq);
    }

    /// Pointwise maximum with another map.
    pub fn merge(&mut self, other: &VersionMap) {
        for (&replica, &seq) in &other.entries {
            self.update(replica, seq);
        }
    }

    /// Iterate over (replica, seq) entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        return self.entries.iter().map(|(&r, &s)| (r, s));
    }

    /// Pointwise minimum across a set of maps, owned by `owner`.
    ///
    /// A replica missing from any input reads as 0 there, so only replicas
    /// present in every input survive with a nonzero entry. An empty input
    /// yields an empty map.
    pub fn minimum(owner: u64, maps: &[&VersionMap]) -> VersionMap {
        let mut result = VersionMap::new(owner);
        let Some(first) = maps.first() else {
            return result;
        };

        // Any replica absent from the first map bottoms out at 0 anyway,
        // so the first map's keys bound the result.
        for (replica, seq) in first.iter() {
            let low = maps[1..]
                .iter()
                .fold(seq, |low, map| low.min(map.get(replica)));
            if low > 0 {
                result.entries.insert(replica, low);
            }
        }

        return result;
    }

    /// Compare two histories.
    pub fn compare(&self, other: &VersionMap) -> Causality {
        let mut older = false;
        let mut newer = false;

        for (replica, seq) in self.iter() {
            let theirs = other.get(replica);
            if seq < theirs {
                older = true;
            }
            if seq > theirs {
                newer = true;
            }
        }

        // Entries they have that we lack.
        for (replica, seq) in other.iter() {
            if !self.entries.contains_key(&replica) && seq > 0 {
                older = true;
            }
        }

        return match (older, newer) {
            (true, false) => Causality::Before,
            (false, true) => Causality::After,
            (false, false) => Causality::Equal,
            (true, true) => Causality::Concurrent,
        };
    }

    /// Write the wire form: u32 count, then count x (u64 replica, u64 seq),
    /// little-endian, sorted by replica id for deterministic bytes.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut entries: Vec<(u64, u64)> = self.iter().collect();
        entries.sort_unstable_by_key(|&(replica, _)| replica);

        writer.write_all(&(entries.len() as u32).to_le_bytes())?;
        for (replica, seq) in entries {
            writer.write_all(&replica.to_le_bytes())?;
            writer.write_all(&seq.to_le_bytes())?;
        }
        return Ok(());
    }

    /// Read the wire form back, producing a map owned by `owner`.
    pub fn deserialize<R: Read>(owner: u64, reader: &mut R) -> Result<VersionMap, FormatError> {
        let mut map = VersionMap::new(owner);
        let count = read_u32_le(reader)?;
        for _ in 0..count {
            let replica = read_u64_le(reader)?;
            let seq = read_u64_le(reader)?;
            map.update(replica, seq);
        }
        return Ok(map);
    }
}
