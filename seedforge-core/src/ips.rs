//! Reader and writer for the IPS patch container.
//!
//! Layout: the five bytes `PATCH`, then records, then `EOF`. A record is a
//! 3-byte big-endian offset and a 2-byte big-endian length followed by that
//! many bytes. A length of zero marks a run: a 2-byte count and one value
//! byte repeated `count` times.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAGIC: &[u8; 5] = b"PATCH";
pub const EOF_MARKER: &[u8; 3] = b"EOF";

/// Largest offset a 3-byte field can carry.
pub const MAX_OFFSET: u32 = 0xFF_FFFF;
/// An offset that reads back as the end marker.
const EOF_OFFSET: u32 = 0x45_4F_46;
const MAX_RECORD_LEN: usize = 0xFFFF;
/// Uniform records at least this long are written as runs.
const RLE_MIN_LEN: usize = 8;

/// One contiguous write: `bytes` land at `offset` in the target image.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GeneratedPatch {
    pub offset: u32,
    pub bytes: Vec<u8>,
}

impl GeneratedPatch {
    pub fn new(offset: u32, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    pub fn end(&self) -> usize {
        self.offset as usize + self.bytes.len()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("missing PATCH header")]
    BadMagic,
    #[error("record at byte {position} is truncated")]
    Truncated { position: usize },
    #[error("stream ends without an EOF marker")]
    MissingEof,
    #[error("{count} byte(s) of trailing data after EOF")]
    TrailingData { count: usize },
    #[error("run at byte {position} has a zero count")]
    EmptyRun { position: usize },
    #[error("offset {offset:#08X} does not fit in 24 bits")]
    OffsetOutOfRange { offset: u64 },
    #[error("offset {offset:#08X} would be read back as the EOF marker")]
    OffsetIsEof { offset: u32 },
    #[error("record at offset {offset:#08X} has no bytes")]
    EmptyRecord { offset: u32 },
}

/// Serialises `patches` in order.
///
/// Records longer than 0xFFFF bytes are split, so they decode into several
/// consecutive records with the same combined effect. A record with no
/// bytes has no encoding and is rejected.
pub fn encode(patches: &[GeneratedPatch]) -> Result<Vec<u8>, PatchError> {
    let mut out = Vec::with_capacity(
        MAGIC.len() + EOF_MARKER.len() + patches.iter().map(|p| p.bytes.len() + 5).sum::<usize>(),
    );
    out.extend_from_slice(MAGIC);

    for patch in patches {
        if patch.bytes.is_empty() {
            return Err(PatchError::EmptyRecord {
                offset: patch.offset,
            });
        }
        for (n, chunk) in patch.bytes.chunks(MAX_RECORD_LEN).enumerate() {
            let offset = patch.offset as u64 + (n * MAX_RECORD_LEN) as u64;
            if offset > MAX_OFFSET as u64 {
                return Err(PatchError::OffsetOutOfRange { offset });
            }
            let offset = offset as u32;
            if offset == EOF_OFFSET {
                return Err(PatchError::OffsetIsEof { offset });
            }
            out.extend_from_slice(&offset.to_be_bytes()[1..]);

            let first = chunk[0];
            if chunk.len() >= RLE_MIN_LEN && chunk.iter().all(|&b| b == first) {
                out.extend_from_slice(&[0, 0]);
                out.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
                out.push(first);
            } else {
                out.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
                out.extend_from_slice(chunk);
            }
        }
    }

    out.extend_from_slice(EOF_MARKER);
    Ok(out)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, record_start: usize) -> Result<&'a [u8], PatchError> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(PatchError::Truncated {
                position: record_start,
            });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Parses a whole patch. Nothing is returned unless the stream is valid
/// from header to marker.
pub fn decode(data: &[u8]) -> Result<Vec<GeneratedPatch>, PatchError> {
    if !data.starts_with(MAGIC) {
        return Err(PatchError::BadMagic);
    }
    let mut cur = Cursor {
        data,
        pos: MAGIC.len(),
    };
    let mut patches = Vec::new();

    loop {
        let start = cur.pos;
        match cur.remaining() {
            0 => return Err(PatchError::MissingEof),
            1 | 2 => return Err(PatchError::Truncated { position: start }),
            _ => {}
        }
        let head = cur.take(3, start)?;
        if head == EOF_MARKER {
            break;
        }
        let offset = u32::from_be_bytes([0, head[0], head[1], head[2]]);
        let raw_len = cur.take(2, start)?;
        let len = u16::from_be_bytes([raw_len[0], raw_len[1]]) as usize;

        let bytes = if len == 0 {
            let run = cur.take(3, start)?;
            let count = u16::from_be_bytes([run[0], run[1]]) as usize;
            if count == 0 {
                return Err(PatchError::EmptyRun { position: start });
            }
            vec![run[2]; count]
        } else {
            cur.take(len, start)?.to_vec()
        };
        patches.push(GeneratedPatch { offset, bytes });
    }

    if cur.remaining() > 0 {
        return Err(PatchError::TrailingData {
            count: cur.remaining(),
        });
    }
    Ok(patches)
}

/// Writes each patch in order; later writes win where they overlap. The
/// buffer grows with zeroes if a patch reaches past its end.
pub fn apply_in_place(buf: &mut Vec<u8>, patches: &[GeneratedPatch]) {
    for patch in patches {
        let end = patch.end();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[patch.offset as usize..end].copy_from_slice(&patch.bytes);
    }
}

/// Like [`apply_in_place`], leaving `base` untouched.
pub fn apply(base: &[u8], patches: &[GeneratedPatch]) -> Vec<u8> {
    let mut out = base.to_vec();
    apply_in_place(&mut out, patches);
    out
}

/// Decodes `ips` completely before touching anything, then applies it.
pub fn apply_patch_bytes(base: &[u8], ips: &[u8]) -> Result<Vec<u8>, PatchError> {
    let patches = decode(ips)?;
    Ok(apply(base, &patches))
}

/// Orders static patches before per-seed ones so the latter win on overlap.
pub fn compose(static_patches: &[GeneratedPatch], dynamic: &[GeneratedPatch]) -> Vec<GeneratedPatch> {
    static_patches.iter().chain(dynamic).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_literal_record() {
        let bytes = encode(&[GeneratedPatch::new(0x01_0203, vec![0xAA, 0xBB])]).unwrap();
        assert_eq!(
            bytes,
            b"PATCH\x01\x02\x03\x00\x02\xAA\xBBEOF".to_vec()
        );
    }

    #[test]
    fn uniform_record_becomes_run() {
        let patch = GeneratedPatch::new(0x10, vec![0xFF; 300]);
        let bytes = encode(std::slice::from_ref(&patch)).unwrap();
        assert_eq!(bytes, b"PATCH\x00\x00\x10\x00\x00\x01\x2C\xFFEOF".to_vec());
        assert_eq!(decode(&bytes).unwrap(), vec![patch]);
    }

    #[test]
    fn decode_reverses_encode() {
        let patches = vec![
            GeneratedPatch::new(0x7FC0, b"SEEDFORGE".to_vec()),
            GeneratedPatch::new(0x1C_8000, vec![0x5E, 0x01]),
            GeneratedPatch::new(0x20, vec![0; 16]),
        ];
        assert_eq!(decode(&encode(&patches).unwrap()).unwrap(), patches);
    }

    #[test]
    fn long_records_are_split() {
        let patch = GeneratedPatch::new(0, (0..0x1_0010u32).map(|i| i as u8).collect::<Vec<_>>());
        let decoded = decode(&encode(std::slice::from_ref(&patch)).unwrap()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].offset, 0xFFFF);
        assert_eq!(apply(&[], &decoded), apply(&[], &[patch]));
    }

    #[test]
    fn rejects_bad_offsets() {
        assert_eq!(
            encode(&[GeneratedPatch::new(0x100_0000, vec![1])]),
            Err(PatchError::OffsetOutOfRange { offset: 0x100_0000 })
        );
        assert_eq!(
            encode(&[GeneratedPatch::new(EOF_OFFSET, vec![1])]),
            Err(PatchError::OffsetIsEof { offset: EOF_OFFSET })
        );
    }

    #[test]
    fn empty_record_is_rejected() {
        let patches = [GeneratedPatch::new(0x20, vec![1]), GeneratedPatch::new(0x10, Vec::new())];
        assert_eq!(encode(&patches), Err(PatchError::EmptyRecord { offset: 0x10 }));
    }

    #[test]
    fn rejects_malformed_streams() {
        assert_eq!(decode(b"PATCX"), Err(PatchError::BadMagic));
        assert_eq!(decode(b"PATCH"), Err(PatchError::MissingEof));
        assert_eq!(
            decode(b"PATCH\x00\x00\x01\x00\x04\xAA"),
            Err(PatchError::Truncated { position: 5 })
        );
        assert_eq!(
            decode(b"PATCH\x00\x00\x01\x00\x00\x00\x00\x07EOF"),
            Err(PatchError::EmptyRun { position: 5 })
        );
        assert_eq!(
            decode(b"PATCHEOF\x00\x01"),
            Err(PatchError::TrailingData { count: 2 })
        );
        assert_eq!(decode(b"PATCHEO"), Err(PatchError::Truncated { position: 5 }));
    }

    #[test]
    fn later_patch_wins_on_overlap() {
        let base = vec![0u8; 8];
        let out = apply(
            &base,
            &[
                GeneratedPatch::new(2, vec![1, 1, 1, 1]),
                GeneratedPatch::new(4, vec![2, 2]),
            ],
        );
        assert_eq!(out, vec![0, 0, 1, 1, 2, 2, 0, 0]);
        assert_eq!(base, vec![0u8; 8]);
    }

    #[test]
    fn apply_grows_buffer() {
        let out = apply(&[9, 9], &[GeneratedPatch::new(4, vec![7])]);
        assert_eq!(out, vec![9, 9, 0, 0, 7]);
    }

    #[test]
    fn failed_decode_leaves_nothing_applied() {
        let base = vec![0u8; 4];
        let err = apply_patch_bytes(&base, b"PATCH\x00\x00\x00\x00\x01\x05").unwrap_err();
        assert_eq!(err, PatchError::MissingEof);
    }
}
