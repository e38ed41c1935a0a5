//! Flat binary dump files.
//!
//! A dump is the concatenation of fixed-size record images, with no header
//! or length prefix. Each image is 24 little-endian bytes:
//!
//! ```text
//!  0        8      12     16      20      24
//! ┌────────┬──────┬──────┬───────┬───────┐
//! │ id i64 │count │ cost │ flags │  pad  │
//! │        │ i32  │ f32  │  u32  │ zero  │
//! └────────┴──────┴──────┴───────┴───────┘
//!   flags: bit 0 = primary, bits 1..=3 = mode
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::record::Record;

/// Size in bytes of one record image.
pub const RECORD_SIZE: usize = 24;

const PRIMARY_BIT: u32 = 0b1;
const MODE_SHIFT: u32 = 1;
const MODE_MASK: u32 = 0b111;

fn encode(record: &Record, out: &mut [u8]) {
    debug_assert_eq!(out.len(), RECORD_SIZE);
    let flags = (record.primary as u32) | ((record.mode() as u32 & MODE_MASK) << MODE_SHIFT);
    out[0..8].copy_from_slice(&record.id.to_le_bytes());
    out[8..12].copy_from_slice(&record.count.to_le_bytes());
    out[12..16].copy_from_slice(&record.cost.to_le_bytes());
    out[16..20].copy_from_slice(&flags.to_le_bytes());
    out[20..24].fill(0);
}

fn decode(bytes: &[u8]) -> Record {
    debug_assert_eq!(bytes.len(), RECORD_SIZE);
    let mut id = [0u8; 8];
    id.copy_from_slice(&bytes[0..8]);
    let mut word = [0u8; 4];

    word.copy_from_slice(&bytes[8..12]);
    let count = i32::from_le_bytes(word);
    word.copy_from_slice(&bytes[12..16]);
    let cost = f32::from_le_bytes(word);
    word.copy_from_slice(&bytes[16..20]);
    let flags = u32::from_le_bytes(word);

    Record::new(
        i64::from_le_bytes(id),
        count,
        cost,
        flags & PRIMARY_BIT != 0,
        ((flags >> MODE_SHIFT) & MODE_MASK) as u8,
    )
}

/// Serializes records into their concatenated on-disk images.
pub fn encode_records(records: &[Record]) -> Result<Vec<u8>> {
    let len = records
        .len()
        .checked_mul(RECORD_SIZE)
        .ok_or(Error::OutOfMemory {
            context: "sizing the dump buffer",
        })?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::OutOfMemory {
        context: "allocating the dump buffer",
    })?;
    buf.resize(len, 0);
    for (record, chunk) in records.iter().zip(buf.chunks_exact_mut(RECORD_SIZE)) {
        encode(record, chunk);
    }
    Ok(buf)
}

/// Parses concatenated record images. Bits outside `primary` and `mode`
/// are ignored.
///
/// Returns `None` when `bytes` is not a whole number of records.
pub fn decode_records(bytes: &[u8]) -> Option<Vec<Record>> {
    if bytes.len() % RECORD_SIZE != 0 {
        return None;
    }
    Some(bytes.chunks_exact(RECORD_SIZE).map(decode).collect())
}

/// Reads every record from the dump at `path`. An empty file holds zero
/// records.
pub fn load_dump(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| {
        error!(path = %path.display(), %e, "failed to read dump");
        Error::io(path, e)
    })?;

    let records = decode_records(&bytes).ok_or_else(|| {
        error!(path = %path.display(), len = bytes.len(), "dump length is not a whole number of records");
        Error::MalformedFile {
            path: path.to_path_buf(),
            len: bytes.len() as u64,
            record_size: RECORD_SIZE,
        }
    })?;
    debug!(path = %path.display(), records = records.len(), "loaded dump");
    Ok(records)
}

/// Writes `records` to `path`, replacing any existing file. Storing zero
/// records produces an empty file.
pub fn store_dump(path: impl AsRef<Path>, records: &[Record]) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_records(records)?;

    let write = || -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()
    };
    write().map_err(|e| {
        error!(path = %path.display(), %e, "failed to write dump");
        Error::io(path, e)
    })?;
    debug!(path = %path.display(), records = records.len(), "stored dump");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<Record> {
        vec![
            Record::new(123, 456, 7.89, true, 5),
            Record::new(987, 654, 3.21, false, 2),
        ]
    }

    #[test]
    fn image_layout() {
        let bytes = encode_records(&[Record::new(0x0102, -2, 1.0, true, 5)]).unwrap();
        assert_eq!(bytes.len(), RECORD_SIZE);
        assert_eq!(&bytes[0..8], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[12..16], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[16..20], &[0b1011, 0, 0, 0]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 0]);
    }

    #[test]
    fn decode_ignores_stray_flag_bits() {
        let mut bytes = encode_records(&[Record::new(9, 1, 1.0, false, 3)]).unwrap();
        bytes[16] |= 0b1111_0000;
        bytes[19] = 0xFF;
        bytes[22] = 0xAA;
        let records = decode_records(&bytes).unwrap();
        assert_eq!(records, vec![Record::new(9, 1, 1.0, false, 3)]);
    }

    #[test]
    fn decode_rejects_partial_record() {
        assert!(decode_records(&[0u8; RECORD_SIZE + 1]).is_none());
        assert_eq!(decode_records(&[]), Some(vec![]));
    }

    #[test]
    fn store_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_file.bin");
        let data = sample();

        store_dump(&path, &data).unwrap();
        assert_eq!(
            fs::metadata(&path).unwrap().len(),
            (data.len() * RECORD_SIZE) as u64
        );

        let loaded = load_dump(&path).unwrap();
        assert_eq!(loaded.len(), data.len());
        for (l, d) in loaded.iter().zip(&data) {
            assert!(l.approx_eq(d, 0.01), "{l:?} != {d:?}");
        }
    }

    #[test]
    fn store_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        store_dump(&path, &sample()).unwrap();
        store_dump(&path, &sample()[..1]).unwrap();
        assert_eq!(load_dump(&path).unwrap().len(), 1);
    }

    #[test]
    fn empty_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        store_dump(&path, &[]).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        assert!(load_dump(&path).unwrap().is_empty());
    }

    #[test]
    fn load_malformed_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        fs::write(&path, [0u8; RECORD_SIZE * 2 + 5]).unwrap();
        match load_dump(&path) {
            Err(Error::MalformedFile {
                len, record_size, ..
            }) => {
                assert_eq!(len, (RECORD_SIZE * 2 + 5) as u64);
                assert_eq!(record_size, RECORD_SIZE);
            }
            other => panic!("expected MalformedFile, got {other:?}"),
        }
    }

    #[test]
    fn load_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_dump(dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn store_into_missing_directory() {
        let dir = tempdir().unwrap();
        let err = store_dump(dir.path().join("no/such/dir.bin"), &sample()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
