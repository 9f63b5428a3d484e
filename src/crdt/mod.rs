// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-01"
// driver = "Isaac Clayton"

//! CRDT primitives for convergent replicated sequences.

pub mod atom;
pub mod clock;
pub mod coordinator;
pub mod sequence;
pub mod stats;
pub mod version;

/// A CRDT is a data type with a merge operator that is commutative,
/// associative, and idempotent.
pub trait Crdt {
    /// Merge another instance into this one.
    /// Must be commutative: merge(a, b) == merge(b, a)
    /// Must be associative: merge(a, merge(b, c)) == merge(merge(a, b), c)
    /// Must be idempotent: merge(a, merge(a, b)) == merge(a, b)
    fn merge(&mut self, other: &Self);
}
