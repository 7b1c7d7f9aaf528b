//! Splitting an upload into the byte ranges sent one request at a time.

/// Matches the server's storage chunk size (32 KiB * 10).
pub const DEFAULT_CHUNK_SIZE: u64 = 32_768 * 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u64,
    pub start: u64,
    pub end: u64,
    pub is_last: bool,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Plans the chunks for a payload of `file_size` bytes.
///
/// An empty payload yields no chunks at all, so a chunked upload of a
/// zero-byte file never reaches the server. `chunk_size` must be non-zero;
/// [`crate::transport::ChunkedTransport::new`] enforces that before planning.
pub fn plan_chunks(file_size: u64, chunk_size: u64) -> Vec<ChunkRange> {
    debug_assert!(chunk_size > 0, "chunk size must be non-zero");
    if chunk_size == 0 {
        return Vec::new();
    }

    let splits = file_size.div_ceil(chunk_size);
    (0..splits)
        .map(|index| {
            let start = index * chunk_size;
            ChunkRange {
                index,
                start,
                end: (start + chunk_size).min(file_size),
                is_last: index == splits - 1,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(file_size: u64, chunk_size: u64) {
        let chunks = plan_chunks(file_size, chunk_size);
        assert_eq!(chunks.len() as u64, file_size.div_ceil(chunk_size));

        let mut expected_start = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i as u64);
            assert_eq!(chunk.start, expected_start);
            assert!(chunk.end > chunk.start);
            assert!(chunk.len() <= chunk_size);
            expected_start = chunk.end;
        }
        assert_eq!(expected_start, file_size);

        let last_count = chunks.iter().filter(|c| c.is_last).count();
        assert_eq!(last_count, if file_size > 0 { 1 } else { 0 });
        if let Some(last) = chunks.last() {
            assert!(last.is_last);
        }
    }

    #[test]
    fn test_chunks_tile_the_file() {
        for file_size in [1, 2, 9, 10, 11, 99, 100, 101, 1000] {
            assert_tiles(file_size, 10);
        }
        assert_tiles(DEFAULT_CHUNK_SIZE * 3, DEFAULT_CHUNK_SIZE);
        assert_tiles(DEFAULT_CHUNK_SIZE * 3 + 7, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_empty_file_has_no_chunks() {
        assert!(plan_chunks(0, DEFAULT_CHUNK_SIZE).is_empty());
    }

    #[test]
    fn test_small_file_is_single_last_chunk() {
        let chunks = plan_chunks(1024, DEFAULT_CHUNK_SIZE);
        assert_eq!(
            chunks,
            vec![ChunkRange {
                index: 0,
                start: 0,
                end: 1024,
                is_last: true
            }]
        );
    }

    #[test]
    fn test_short_final_chunk() {
        let chunks = plan_chunks(25, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[2].start, chunks[2].end), (20, 25));
        assert_eq!(chunks[2].len(), 5);
        assert!(!chunks[0].is_last && !chunks[1].is_last && chunks[2].is_last);
    }
}
