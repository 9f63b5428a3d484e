// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! OmniSync - convergent replicated sequences.
//!
//! Each replica holds a [`crdt::sequence::Sequence`] and edits it locally;
//! edits produce atoms that can be broadcast in any order, any number of
//! times, and every replica that receives them converges to the same
//! content. Version maps drive delta synchronization, and a frontier
//! computed across peers makes tombstone reclamation safe.
//!
//! # Quick Start
//!
//! ```
//! use omnisync::crdt::sequence::Sequence;
//!
//! // Two replicas with distinct ids.
//! let mut alice = Sequence::new(1);
//! let mut bob = Sequence::new(2);
//!
//! // Alice types; each edit yields an atom to broadcast.
//! for (i, byte) in b"Hi".iter().enumerate() {
//!     let atom = alice.local_insert(i, *byte);
//!     bob.remote_merge(atom);
//! }
//!
//! assert_eq!(alice.to_string(), "Hi");
//! assert_eq!(bob.to_string(), "Hi");
//! ```

pub mod crdt;
pub mod wire;
