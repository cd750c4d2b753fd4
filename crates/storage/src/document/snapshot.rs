//! On-disk snapshot of a document store
//!
//! # Format
//!
//! ```text
//! +----------------+----------------+----------------+----------------+---------+
//! | magic (8)      | version (u32)  | length (u64)   | crc32 (u32)    | payload |
//! +----------------+----------------+----------------+----------------+---------+
//! ```
//!
//! Integers are little-endian. The payload is the MessagePack encoding of
//! `Vec<(id, document)>` sorted by id, and the CRC covers the payload only.
//! Snapshots are written to a `.tmp` sibling and renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde_json::Value;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use stepline_core::{Error, Result};

/// File magic
pub const MAGIC: &[u8; 8] = b"STPLDOC\0";

/// Current format version
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8 + 4 + 8 + 4;

/// Encode documents into snapshot bytes
pub fn encode(docs: &[(String, Value)]) -> Result<Vec<u8>> {
    let payload = rmp_serde::to_vec(docs).map_err(|e| Error::Serialization(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.write_u32::<LittleEndian>(FORMAT_VERSION).map_err(io_err)?;
    out.write_u64::<LittleEndian>(payload.len() as u64)
        .map_err(io_err)?;
    out.write_u32::<LittleEndian>(crc32fast::hash(&payload))
        .map_err(io_err)?;
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode snapshot bytes into documents
///
/// Fails with [`Error::Corruption`] on a bad magic, unknown version,
/// truncated payload or checksum mismatch.
pub fn decode(bytes: &[u8]) -> Result<Vec<(String, Value)>> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Corruption(format!(
            "snapshot too short: {} bytes",
            bytes.len()
        )));
    }
    let mut cursor = Cursor::new(bytes);

    let mut magic = [0u8; 8];
    cursor.read_exact(&mut magic).map_err(io_err)?;
    if &magic != MAGIC {
        return Err(Error::Corruption("snapshot magic mismatch".into()));
    }

    let version = cursor.read_u32::<LittleEndian>().map_err(io_err)?;
    if version != FORMAT_VERSION {
        return Err(Error::Corruption(format!(
            "unsupported snapshot version {}",
            version
        )));
    }

    let length = cursor.read_u64::<LittleEndian>().map_err(io_err)? as usize;
    let expected_crc = cursor.read_u32::<LittleEndian>().map_err(io_err)?;

    let payload = &bytes[HEADER_LEN..];
    if payload.len() != length {
        return Err(Error::Corruption(format!(
            "snapshot payload length mismatch: header says {}, file has {}",
            length,
            payload.len()
        )));
    }
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(Error::Corruption(format!(
            "snapshot checksum mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    rmp_serde::from_slice(payload).map_err(|e| Error::Serialization(e.to_string()))
}

/// Read and decode the snapshot at `path`
///
/// Returns `Ok(None)` when no snapshot exists yet.
pub fn read(path: &Path) -> Result<Option<Vec<(String, Value)>>> {
    match fs::read(path) {
        Ok(bytes) => decode(&bytes).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(e)),
    }
}

/// Encode and atomically write a snapshot to `path`
pub fn write(path: &Path, docs: &[(String, Value)]) -> Result<()> {
    let bytes = encode(docs)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(io_err)
}

fn io_err(e: io::Error) -> Error {
    Error::StorageUnavailable(format!("snapshot I/O: {}", e))
}
