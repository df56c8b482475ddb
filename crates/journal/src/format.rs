//! Journal binary format: header layout, opcodes, and the length-prefixed
//! modified-UTF-8 string encoding shared by every record.
//!
//! ## Header (15 bytes)
//!
//! ```text
//! [magic: u64 BE][version: u8][app_version: i32 BE][value_count: u32 BE][\n]
//! ```
//!
//! ## Records
//!
//! ```text
//! DIRTY:  [opcode=2][key][\n]
//! CLEAN:  [opcode=1][key][length_0: u64 BE]...[length_{N-1}: u64 BE][\n]
//! REMOVE: [opcode=3][key][\n]
//! READ:   [opcode=4][key][\n]
//! ```
//!
//! where `[key]` is `[len: u16 BE][modified-utf8 bytes]`. The trailing `\n`
//! (0x0A) is a sanity terminator: a record or header missing it is corrupt.

use crate::mutf8;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Identifies the journal format described above.
pub const MAGIC: u64 = 0x814A_4C45_0D0A_1A0A;
/// The only format version this crate reads or writes.
pub const VERSION: u8 = 2;

/// `CLEAN`: `key` now has a fully published version with the given lengths.
pub const OP_CLEAN: u8 = 1;
/// `DIRTY`: an edit on `key` has started.
pub const OP_DIRTY: u8 = 2;
/// `REMOVE`: `key` has been evicted or deleted.
pub const OP_REMOVE: u8 = 3;
/// `READ`: `key` was read (bumps its LRU recency on replay).
pub const OP_READ: u8 = 4;

/// Fixed header fields persisted at the start of every journal file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    pub app_version: i32,
    pub value_count: u32,
}

/// Writes the 15-byte header to `w`.
pub fn write_header<W: Write>(w: &mut W, header: &JournalHeader) -> io::Result<()> {
    w.write_u64::<BigEndian>(MAGIC)?;
    w.write_u8(VERSION)?;
    w.write_i32::<BigEndian>(header.app_version)?;
    w.write_u32::<BigEndian>(header.value_count)?;
    w.write_u8(b'\n')?;
    Ok(())
}

/// Reads and validates the header from `r`.
///
/// Callers distinguish "no journal yet" from "corrupt journal" by checking
/// for the file's existence before calling this; once a header is read, any
/// field that doesn't match (magic, version, missing terminator) is `Err`.
pub fn read_header<R: Read>(r: &mut R) -> io::Result<JournalHeader> {
    let magic = r.read_u64::<BigEndian>()?;
    if magic != MAGIC {
        return Err(invalid_data("bad journal magic"));
    }
    let version = r.read_u8()?;
    if version != VERSION {
        return Err(invalid_data("unsupported journal version"));
    }
    let app_version = r.read_i32::<BigEndian>()?;
    let value_count = r.read_u32::<BigEndian>()?;
    let terminator = r.read_u8()?;
    if terminator != b'\n' {
        return Err(invalid_data("missing header terminator"));
    }
    Ok(JournalHeader {
        app_version,
        value_count,
    })
}

/// Writes a length-prefixed modified-UTF-8 string: `[len: u16 BE][bytes]`.
pub fn write_key<W: Write>(w: &mut W, key: &str) -> io::Result<()> {
    let bytes = mutf8::encode(key);
    if bytes.len() > u16::MAX as usize {
        return Err(invalid_data("key too long for journal encoding"));
    }
    w.write_u16::<BigEndian>(bytes.len() as u16)?;
    w.write_all(&bytes)?;
    Ok(())
}

/// Reads a length-prefixed modified-UTF-8 string written by [`write_key`].
pub fn read_key<R: Read>(r: &mut R) -> io::Result<String> {
    let len = r.read_u16::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    mutf8::decode(&buf).map_err(|_| invalid_data("malformed modified-utf8 key"))
}

pub(crate) fn invalid_data(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
