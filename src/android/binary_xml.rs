//! Lenient scanner for Android binary XML ("AXML") documents.
//!
//! Only the first string pool of the document is recovered. Element, attribute
//! and namespace chunks are stepped over without being interpreted; callers
//! work with the ordered pool strings instead of a reconstructed tree.

use crate::error::{ParseError, ParseResult};
use log::{debug, trace};
use nom::error::Error as NomError;
use nom::number::complete::{le_u16, le_u32};
use serde::Serialize;
use std::ops::Index;
use std::slice;

/// Size of the document header (magic word followed by the declared file size).
pub const HEADER_SIZE: usize = 8;

/// String pool chunk marker: type `0x0001` and header size `0x001C` read as one word.
pub const RES_STRING_POOL_CHUNK: u32 = 0x001C_0001;

/// Distance from the start of the string pool chunk to its offset table.
const STRING_POOL_HEADER_SIZE: usize = 28;

/// Offset of the `string_count` field inside the string pool chunk.
const STRING_COUNT_OFFSET: usize = 8;

/// Strings whose length prefix reaches this value are treated as corrupt.
pub const MAX_STRING_LEN: u16 = 1000;

/// The 8 byte document header. Read for diagnostics only, never validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxmlHeader {
    pub magic: u32,
    pub declared_size: u32,
}

/// A type-tagged, length-prefixed record as seen while walking the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawChunk {
    pub chunk_type: u32,
    pub chunk_size: u32,
    pub offset: usize,
}

impl RawChunk {
    /// First byte after the type and size words.
    pub fn payload_offset(&self) -> usize {
        self.offset + 8
    }
}

/// Everything a single scan recovers from a buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanOutcome {
    pub header: AxmlHeader,
    /// The string pool chunk the strings were read from, if one was found.
    pub string_pool_chunk: Option<RawChunk>,
    pub pool: StringPool,
}

/// Ordered strings of a binary XML string pool.
///
/// Order follows the pool's offset table. Entries the scanner had to skip
/// leave no gap, so indices are positions in this sequence rather than the
/// raw pool indices of the document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.strings.get(idx).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.strings.iter().map(|s| s.as_str())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.strings
    }

    /// Index of the first string exactly equal to `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.strings.iter().position(|s| s == needle)
    }
}

impl From<Vec<String>> for StringPool {
    fn from(strings: Vec<String>) -> Self {
        StringPool { strings }
    }
}

impl FromIterator<String> for StringPool {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        StringPool {
            strings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StringPool {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.strings.iter()
    }
}

impl Index<usize> for StringPool {
    type Output = str;

    fn index(&self, idx: usize) -> &str {
        &self.strings[idx]
    }
}

struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BinaryReader { data, pos: 0 }
    }

    fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    fn read_u16(&mut self) -> Option<u16> {
        let input = self.data.get(self.pos..)?;
        let (_, value) = le_u16::<_, NomError<&[u8]>>(input).ok()?;
        self.pos += 2;
        Some(value)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let input = self.data.get(self.pos..)?;
        let (_, value) = le_u32::<_, NomError<&[u8]>>(input).ok()?;
        self.pos += 4;
        Some(value)
    }

    fn u32_at(&mut self, offset: usize) -> Option<u32> {
        self.seek(offset);
        self.read_u32()
    }
}

/// Scan `data` and return its first string pool.
///
/// Fails only when the buffer is shorter than the document header. A buffer
/// without any string pool chunk yields an empty pool.
pub fn scan(data: &[u8]) -> ParseResult<StringPool> {
    scan_document(data).map(|outcome| outcome.pool)
}

/// Like [`scan`], but also reports the header and where the pool was found.
pub fn scan_document(data: &[u8]) -> ParseResult<ScanOutcome> {
    if data.len() < HEADER_SIZE {
        return Err(ParseError::TooSmall { len: data.len() });
    }

    let mut reader = BinaryReader::new(data);
    let (Some(magic), Some(declared_size)) = (reader.read_u32(), reader.read_u32()) else {
        return Err(ParseError::TooSmall { len: data.len() });
    };
    let header = AxmlHeader {
        magic,
        declared_size,
    };
    if declared_size as usize != data.len() {
        debug!(
            "binary XML declares {} bytes but buffer holds {}",
            declared_size,
            data.len()
        );
    }

    let mut offset = HEADER_SIZE;
    while offset < data.len() - HEADER_SIZE {
        reader.seek(offset);
        let (Some(chunk_type), Some(chunk_size)) = (reader.read_u32(), reader.read_u32()) else {
            break;
        };
        let chunk = RawChunk {
            chunk_type,
            chunk_size,
            offset,
        };

        if chunk_type == RES_STRING_POOL_CHUNK {
            let pool = read_string_pool(&mut reader, &chunk);
            debug!(
                "string pool at offset {} yielded {} strings",
                offset,
                pool.len()
            );
            return Ok(ScanOutcome {
                header,
                string_pool_chunk: Some(chunk),
                pool,
            });
        }

        if chunk_size == 0 {
            trace!("zero sized chunk {:#010x} at offset {}", chunk_type, offset);
        }
        offset = offset.saturating_add((chunk_size as usize).max(1));
    }

    debug!("no string pool chunk found in {} bytes", data.len());
    Ok(ScanOutcome {
        header,
        string_pool_chunk: None,
        pool: StringPool::default(),
    })
}

fn read_string_pool(reader: &mut BinaryReader<'_>, chunk: &RawChunk) -> StringPool {
    let data = reader.data;
    let Some(string_count) = reader.u32_at(chunk.offset + STRING_COUNT_OFFSET) else {
        debug!("string pool at offset {} is truncated before its count", chunk.offset);
        return StringPool::default();
    };
    let string_count = string_count as usize;
    let table_start = chunk.offset + STRING_POOL_HEADER_SIZE;
    let Some(data_start) = string_count
        .checked_mul(4)
        .and_then(|table_len| table_start.checked_add(table_len))
    else {
        debug!("string pool declares an impossible {} entries", string_count);
        return StringPool::default();
    };

    // The count is untrusted; never reserve more than the table could hold.
    let capacity = string_count.min(data.len().saturating_sub(table_start) / 4);
    let mut strings = Vec::with_capacity(capacity);
    for idx in 0..string_count {
        let Some(relative) = reader.u32_at(table_start + idx * 4) else {
            debug!(
                "string offset table truncated after {} of {} entries",
                idx, string_count
            );
            break;
        };
        let Some(position) = data_start.checked_add(relative as usize) else {
            continue;
        };
        if position >= data.len() - 2 {
            trace!("string {} points outside the buffer ({})", idx, position);
            continue;
        }
        reader.seek(position);
        let Some(str_len) = reader.read_u16() else {
            continue;
        };
        if str_len == 0 || str_len >= MAX_STRING_LEN {
            trace!("string {} has rejected length {}", idx, str_len);
            continue;
        }
        let start = position + 2;
        let end = start.saturating_add(str_len as usize * 2).min(data.len());
        strings.push(decode_utf16_lossy(&data[start..end]));
    }

    StringPool { strings }
}

/// Decode UTF-16LE, dropping unpaired surrogates and any trailing odd byte.
fn decode_utf16_lossy(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units).filter_map(Result::ok).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{document, opaque_chunk, string_pool_chunk};

    fn pool_strings(data: &[u8]) -> Vec<String> {
        scan(data).expect("scan").as_slice().to_vec()
    }

    #[test]
    fn rejects_buffers_shorter_than_header() {
        for len in 0..HEADER_SIZE {
            let data = vec![0xAB; len];
            assert_eq!(scan(&data), Err(ParseError::TooSmall { len }));
        }
    }

    #[test]
    fn header_only_buffer_has_empty_pool() {
        let data = [0x03, 0x00, 0x08, 0x00, 0x08, 0x00, 0x00, 0x00];
        let outcome = scan_document(&data).expect("scan");
        assert_eq!(outcome.header.magic, 0x0008_0003);
        assert_eq!(outcome.header.declared_size, 8);
        assert!(outcome.pool.is_empty());
        assert!(outcome.string_pool_chunk.is_none());
    }

    #[test]
    fn reads_strings_in_offset_table_order() {
        let data = document(&[string_pool_chunk(&["manifest", "package", "com.example.app"])]);
        assert_eq!(
            pool_strings(&data),
            vec!["manifest", "package", "com.example.app"]
        );
        let outcome = scan_document(&data).expect("scan");
        let chunk = outcome.string_pool_chunk.expect("pool chunk");
        assert_eq!(chunk.offset, HEADER_SIZE);
        assert_eq!(chunk.payload_offset(), 16);
        assert_eq!(outcome.header.declared_size as usize, data.len());
    }

    #[test]
    fn skips_chunks_before_the_string_pool() {
        let data = document(&[
            opaque_chunk(0x0180, 12),
            string_pool_chunk(&["versionCode", "42"]),
        ]);
        assert_eq!(pool_strings(&data), vec!["versionCode", "42"]);
    }

    #[test]
    fn only_the_first_string_pool_is_used() {
        let data = document(&[
            string_pool_chunk(&["first"]),
            string_pool_chunk(&["second"]),
        ]);
        assert_eq!(pool_strings(&data), vec!["first"]);
    }

    #[test]
    fn zero_sized_chunks_advance_one_byte() {
        let body = [
            0x05, 0x00, b'l', 0x00, b'a', 0x00, b'b', 0x00, b'e', 0x00, b'l', 0x00, 0x00, 0x00,
        ];
        let mut data = raw_pool(&[(0, &body[..])], 1);
        // The word at offset 8 now reads as an unknown chunk with size zero.
        data.insert(HEADER_SIZE, 0x00);
        let outcome = scan_document(&data).expect("scan");
        assert_eq!(outcome.string_pool_chunk.map(|c| c.offset), Some(HEADER_SIZE + 1));
        assert_eq!(outcome.pool.as_slice(), &["label".to_string()]);
    }

    #[test]
    fn buffer_without_pool_terminates_with_empty_pool() {
        let mut data = vec![0u8; 64];
        data[0] = 0x03;
        assert!(pool_strings(&data).is_empty());

        let data = vec![0xFF; 257];
        assert!(pool_strings(&data).is_empty());
    }

    #[test]
    fn huge_chunk_size_does_not_overflow() {
        let mut data = vec![0x03, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(&0x0000_0180u32.to_le_bytes());
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        assert!(pool_strings(&data).is_empty());
    }

    fn raw_pool(entries: &[(u32, &[u8])], count: u32) -> Vec<u8> {
        // Hand-rolled pool so offsets and lengths can be corrupted freely.
        let mut data = vec![0x03, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(&RES_STRING_POOL_CHUNK.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&count.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        for (offset, _) in entries {
            data.extend_from_slice(&offset.to_le_bytes());
        }
        for (_, bytes) in entries {
            data.extend_from_slice(bytes);
        }
        data
    }

    #[test]
    fn rejects_zero_and_oversized_lengths() {
        let good = [0x02, 0x00, b'o', 0x00, b'k', 0x00, 0x00, 0x00];
        let empty = [0x00, 0x00, 0x00, 0x00];
        let huge = [0xE8, 0x03, b'x', 0x00];
        let data = raw_pool(&[(0, &good[..]), (8, &empty[..]), (12, &huge[..])], 3);
        assert_eq!(pool_strings(&data), vec!["ok"]);
    }

    #[test]
    fn skips_offsets_past_the_buffer() {
        let good = [0x01, 0x00, b'a', 0x00, 0x00, 0x00, 0x00, 0x00];
        let data = raw_pool(&[(0xFFFF, &[0u8; 0][..]), (0, &good[..])], 2);
        assert_eq!(pool_strings(&data), vec!["a"]);
    }

    #[test]
    fn huge_declared_count_stops_at_table_end() {
        let good = [0x02, 0x00, b'h', 0x00, b'i', 0x00, 0x00, 0x00];
        // Every offset lands past the buffer once data_start moves that far out.
        let data = raw_pool(&[(0, &good[..])], 50_000);
        assert!(pool_strings(&data).is_empty());
    }

    #[test]
    fn truncated_string_body_decodes_what_is_present() {
        let short = [0x05, 0x00, b'a', 0x00, b'b', 0x00, b'c', 0x00];
        let data = raw_pool(&[(0, &short[..])], 1);
        assert_eq!(pool_strings(&data), vec!["abc"]);
    }

    #[test]
    fn lossy_decode_drops_unpaired_surrogates() {
        let bytes = [0x41, 0x00, 0x00, 0xD8, 0x42, 0x00];
        assert_eq!(decode_utf16_lossy(&bytes), "AB");
        assert_eq!(decode_utf16_lossy(&[0x41, 0x00, 0x42]), "A");
    }

    #[test]
    fn non_ascii_strings_survive() {
        let data = document(&[string_pool_chunk(&["Café Ünïcode", "日本語アプリ"])]);
        assert_eq!(pool_strings(&data), vec!["Café Ünïcode", "日本語アプリ"]);
    }

    #[test]
    fn pool_lookup_helpers() {
        let pool: StringPool = ["a", "application", "b", "application"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.position("application"), Some(1));
        assert_eq!(pool.get(2), Some("b"));
        assert_eq!(pool.get(9), None);
        assert_eq!(&pool[0], "a");
    }
}
