// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Wire encodings for atoms and the errors shared by every decoder.
//!
//! Two interchange formats exist for atoms:
//!
//! - [`packer`]: a fixed 34-byte little-endian record. Trivial to inspect
//!   in a hex dump, and also the record format used by sequence
//!   persistence.
//! - the compact encoding in this module: the four ids as LEB128
//!   variable-length integers followed by the payload and tombstone bytes.
//!   Typical atoms fit in 4-10 bytes.
//!
//! Decoders never panic on malformed input: every failure is a
//! [`FormatError`], and the value under construction is discarded.

pub mod packer;
pub mod vle;

use std::io;
use std::io::Read;

use thiserror::Error;

use crate::crdt::atom::Atom;
use crate::crdt::atom::OpId;

/// Malformed input detected while decoding.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The magic bytes at the start of a stored sequence did not match.
    #[error("bad magic bytes")]
    BadMagic,
    /// A stored sequence declared a version this build cannot read.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    /// The input ended before the value did.
    #[error("input truncated")]
    Truncated,
    /// A variable-length integer ran past its 10-byte bound.
    #[error("variable-length integer too long")]
    Overlong,
    /// The first stored atom was not the head sentinel.
    #[error("first stored atom is not the head sentinel")]
    MissingSentinel,
    /// The same atom id appeared twice in a stored sequence.
    #[error("duplicate atom id {0:?} in stored sequence")]
    DuplicateAtom(OpId),
    /// The underlying stream failed.
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),
}

/// Encode an atom in the compact variable-length format.
pub fn encode_atom(atom: &Atom, out: &mut Vec<u8>) {
    vle::encode_u64(atom.id.replica, out);
    vle::encode_u64(atom.id.seq, out);
    vle::encode_u64(atom.origin.replica, out);
    vle::encode_u64(atom.origin.seq, out);
    out.push(atom.payload);
    out.push(atom.deleted as u8);
}

/// Decode an atom from the compact variable-length format.
///
/// `offset` is advanced past the decoded bytes on success and left in an
/// unspecified position on failure.
pub fn decode_atom(buf: &[u8], offset: &mut usize) -> Result<Atom, FormatError> {
    let id_replica = vle::decode_u64(buf, offset)?;
    let id_seq = vle::decode_u64(buf, offset)?;
    let origin_replica = vle::decode_u64(buf, offset)?;
    let origin_seq = vle::decode_u64(buf, offset)?;

    if *offset + 2 > buf.len() {
        return Err(FormatError::Truncated);
    }
    let payload = buf[*offset];
    let deleted = buf[*offset + 1] != 0;
    *offset += 2;

    return Ok(Atom {
        id: OpId::new(id_replica, id_seq),
        origin: OpId::new(origin_replica, origin_seq),
        payload,
        deleted,
    });
}

/// Read exactly one byte from a stream.
pub(crate) fn read_u8<R: Read>(reader: &mut R) -> Result<u8, FormatError> {
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf)?;
    return Ok(buf[0]);
}

/// Read a little-endian u32 from a stream.
pub(crate) fn read_u32_le<R: Read>(reader: &mut R) -> Result<u32, FormatError> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf)?;
    return Ok(u32::from_le_bytes(buf));
}

/// Read a little-endian u64 from a stream.
pub(crate) fn read_u64_le<R: Read>(reader: &mut R) -> Result<u64, FormatError> {
    let mut buf = [0u8; 8];
    read_exact(reader, &mut buf)?;
    return Ok(u64::from_le_bytes(buf));
}

/// `read_exact` with end-of-input mapped to [`FormatError::Truncated`].
pub(crate) fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), FormatError> {
    return reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::Truncated
        } else {
            FormatError::Io(e)
        }
    });
}
