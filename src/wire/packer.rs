// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-01"
// driver = "Isaac Clayton"

//! Fixed-width atom records.
//!
//! Every atom occupies exactly 34 little-endian bytes:
//!
//! ```text
//! [0-7]   id.replica
//! [8-15]  id.seq
//! [16-23] origin.replica
//! [24-31] origin.seq
//! [32]    payload
//! [33]    deleted (0x00 / 0x01)
//! ```
//!
//! This is the debug interchange format and the record format used by
//! sequence persistence. The compact encoding in the parent module is the
//! bandwidth-friendly alternative.

use std::io;
use std::io::Read;
use std::io::Write;

use super::read_exact;
use super::FormatError;
use crate::crdt::atom::Atom;
use crate::crdt::atom::OpId;

/// The size of one packed atom record.
pub const ATOM_SIZE: usize = 34;

/// Pack an atom into its fixed-width record.
pub fn pack(atom: &Atom) -> [u8; ATOM_SIZE] {
    let mut buf = [0u8; ATOM_SIZE];
    buf[0..8].copy_from_slice(&atom.id.replica.to_le_bytes());
    buf[8..16].copy_from_slice(&atom.id.seq.to_le_bytes());
    buf[16..24].copy_from_slice(&atom.origin.replica.to_le_bytes());
    buf[24..32].copy_from_slice(&atom.origin.seq.to_le_bytes());
    buf[32] = atom.payload;
    buf[33] = atom.deleted as u8;
    return buf;
}

/// Unpack an atom from the start of `buf`.
pub fn unpack(buf: &[u8]) -> Result<Atom, FormatError> {
    if buf.len() < ATOM_SIZE {
        return Err(FormatError::Truncated);
    }

    let u64_at = |offset: usize| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[offset..offset + 8]);
        return u64::from_le_bytes(bytes);
    };

    return Ok(Atom {
        id: OpId::new(u64_at(0), u64_at(8)),
        origin: OpId::new(u64_at(16), u64_at(24)),
        payload: buf[32],
        deleted: buf[33] != 0,
    });
}

/// Write one packed atom record to a stream.
pub fn write_atom<W: Write>(writer: &mut W, atom: &Atom) -> io::Result<()> {
    return writer.write_all(&pack(atom));
}

/// Read one packed atom record from a stream.
pub fn read_atom<R: Read>(reader: &mut R) -> Result<Atom, FormatError> {
    let mut buf = [0u8; ATOM_SIZE];
    read_exact(reader, &mut buf)?;
    return unpack(&buf);
}
