// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Persistence: round trips, old format versions, malformed input.

use omnisync::crdt::atom::Atom;
use omnisync::crdt::atom::OpId;
use omnisync::crdt::sequence::Sequence;
use omnisync::wire::packer;
use omnisync::wire::FormatError;

#[test]
fn save_load_round_trip() {
    let mut doc1 = Sequence::new(1);
    doc1.local_insert(0, b'A');
    doc1.local_insert(1, b'B');
    doc1.local_insert(2, b'C');
    doc1.local_delete(1); // "AC"
    assert_eq!(doc1.to_string(), "AC");

    let mut file = Vec::new();
    doc1.save(&mut file).unwrap();

    // Load into a different replica.
    let mut doc2 = Sequence::new(2);
    doc2.load(&mut file.as_slice()).unwrap();

    assert_eq!(doc2.to_string(), "AC");
    assert_eq!(doc2.to_string(), doc1.to_string());
    assert_eq!(doc2.clock(), doc1.clock());
    assert_eq!(doc2.tombstone_count(), 1);
    assert_eq!(doc2.replica_id(), 2);

    // Index integrity: the loaded document accepts new edits.
    doc2.local_insert(2, b'D');
    assert_eq!(doc2.to_string(), "ACD");
}

#[test]
fn loaded_version_map_matches_the_original() {
    let mut doc1 = Sequence::new(1);
    doc1.local_insert(0, b'x');
    doc1.local_insert(1, b'y');
    doc1.local_delete(0);

    let mut file = Vec::new();
    doc1.save(&mut file).unwrap();

    let mut doc2 = Sequence::new(1);
    doc2.load(&mut file.as_slice()).unwrap();
    assert_eq!(doc2.versions(), doc1.versions());
}

#[test]
fn loaded_replica_keeps_merging() {
    // A replica saves mid-session, restores, and keeps receiving ops that
    // reference atoms from before the save.
    let mut alice = Sequence::new(1);
    let first = alice.local_insert(0, b'a');

    let mut bob = Sequence::new(2);
    bob.remote_merge(first);

    let mut file = Vec::new();
    bob.save(&mut file).unwrap();

    let mut restored = Sequence::new(2);
    restored.load(&mut file.as_slice()).unwrap();

    let second = alice.local_insert(1, b'b');
    restored.remote_merge(second);
    assert_eq!(restored.to_string(), "ab");
}

/// Hand-build a version-1 file (no version map section).
fn v1_file(owner: u64, clock: u64, atoms: &[Atom]) -> Vec<u8> {
    let mut file = Vec::new();
    file.extend_from_slice(b"OMNI");
    file.push(1);
    file.extend_from_slice(&owner.to_le_bytes());
    file.extend_from_slice(&clock.to_le_bytes());
    file.extend_from_slice(&(atoms.len() as u64 + 1).to_le_bytes());
    file.extend_from_slice(&packer::pack(&Atom::sentinel()));
    for atom in atoms {
        file.extend_from_slice(&packer::pack(atom));
    }
    return file;
}

#[test]
fn version_one_files_still_load() {
    let a = Atom::new(OpId::new(1, 1), OpId::SENTINEL, b'a');
    let mut b = Atom::new(OpId::new(1, 2), OpId::new(1, 1), b'b');
    b.deleted = true;
    let file = v1_file(1, 2, &[a, b]);

    let mut doc = Sequence::new(3);
    doc.load(&mut file.as_slice()).unwrap();

    assert_eq!(doc.to_string(), "a");
    // The tombstone count is rebuilt from the atoms themselves.
    assert_eq!(doc.tombstone_count(), 1);
    // So is the version map, since a v1 file stores none.
    assert_eq!(doc.versions().get(1), 2);
    assert_eq!(doc.clock(), 2);
}

#[test]
fn clock_is_raised_over_stored_atoms() {
    // An inconsistent file whose clock lags its atoms.
    let a = Atom::new(OpId::new(1, 9), OpId::SENTINEL, b'a');
    let file = v1_file(1, 3, &[a]);

    let mut doc = Sequence::new(2);
    doc.load(&mut file.as_slice()).unwrap();
    assert_eq!(doc.clock(), 9);
}

#[test]
fn bad_magic_is_rejected() {
    let mut doc = Sequence::new(1);
    doc.local_insert(0, b'k');

    let file = b"MONI\x02junk";
    assert!(matches!(
        doc.load(&mut file.as_slice()),
        Err(FormatError::BadMagic)
    ));
    // The failed load left the document alone.
    assert_eq!(doc.to_string(), "k");
}

#[test]
fn unknown_version_is_rejected() {
    let mut good = Vec::new();
    Sequence::new(1).save(&mut good).unwrap();
    good[4] = 3;

    let mut doc = Sequence::new(1);
    assert!(matches!(
        doc.load(&mut good.as_slice()),
        Err(FormatError::UnsupportedVersion(3))
    ));
}

#[test]
fn truncation_is_rejected_at_every_cut() {
    let mut doc1 = Sequence::new(1);
    doc1.local_insert(0, b'a');
    doc1.local_insert(1, b'b');

    let mut file = Vec::new();
    doc1.save(&mut file).unwrap();

    for cut in 0..file.len() {
        let mut doc = Sequence::new(2);
        let result = doc.load(&mut &file[..cut]);
        assert!(result.is_err(), "cut at {} should fail", cut);
        assert_eq!(doc.to_string(), "", "cut at {} must not mutate", cut);
    }
}

#[test]
fn missing_sentinel_is_rejected() {
    // A file whose first atom is real content instead of the sentinel.
    let a = Atom::new(OpId::new(1, 1), OpId::SENTINEL, b'a');
    let mut file = Vec::new();
    file.extend_from_slice(b"OMNI");
    file.push(1);
    file.extend_from_slice(&1u64.to_le_bytes());
    file.extend_from_slice(&1u64.to_le_bytes());
    file.extend_from_slice(&1u64.to_le_bytes());
    file.extend_from_slice(&packer::pack(&a));

    let mut doc = Sequence::new(1);
    assert!(matches!(
        doc.load(&mut file.as_slice()),
        Err(FormatError::MissingSentinel)
    ));
}

#[test]
fn duplicate_atoms_are_rejected() {
    let a = Atom::new(OpId::new(1, 1), OpId::SENTINEL, b'a');
    let file = v1_file(1, 1, &[a, a]);

    let mut doc = Sequence::new(1);
    assert!(matches!(
        doc.load(&mut file.as_slice()),
        Err(FormatError::DuplicateAtom(_))
    ));
}

#[test]
fn empty_input_is_rejected() {
    let mut doc = Sequence::new(1);
    assert!(matches!(
        doc.load(&mut [].as_slice()),
        Err(FormatError::Truncated)
    ));
}
