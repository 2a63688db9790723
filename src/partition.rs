//! Splitting an ordered key sequence into bounded, consecutive chunks.

use std::{fmt, num::NonZeroUsize};

use serde::{Deserialize, Serialize};

/// Maximum number of records in one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    /// One record per chunk.
    pub const ONE: ChunkSize = ChunkSize(NonZeroUsize::MIN);

    /// Chunk size used by the batch strategies unless configured otherwise.
    pub const DEFAULT: ChunkSize = match NonZeroUsize::new(20_000) {
        Some(size) => ChunkSize(size),
        None => ChunkSize::ONE,
    };

    /// `None` when `size` is zero.
    pub const fn new(size: usize) -> Option<Self> {
        match NonZeroUsize::new(size) {
            Some(size) => Some(ChunkSize(size)),
            None => None,
        }
    }

    /// The size as a plain count.
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error for a zero chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("chunk size must be greater than zero")]
pub struct ZeroChunkSize;

impl TryFrom<usize> for ChunkSize {
    type Error = ZeroChunkSize;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        ChunkSize::new(size).ok_or(ZeroChunkSize)
    }
}

impl From<ChunkSize> for usize {
    fn from(size: ChunkSize) -> Self {
        size.get()
    }
}

/// Splits key sequences into chunks of at most `max_chunk_size` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Partitioner {
    max_chunk_size: ChunkSize,
}

impl Partitioner {
    /// Partitioner bounded by `max_chunk_size`.
    pub fn new(max_chunk_size: ChunkSize) -> Self {
        Self { max_chunk_size }
    }

    /// Upper bound on chunk length.
    pub fn max_chunk_size(&self) -> ChunkSize {
        self.max_chunk_size
    }

    /// Lazily yield consecutive chunks of `keys` in source order. Only the last
    /// chunk may be shorter than the maximum; an empty input yields nothing.
    pub fn chunks<'a, K>(&self, keys: &'a [K]) -> Chunks<'a, K> {
        Chunks {
            rest: keys,
            max: self.max_chunk_size.get(),
        }
    }

    /// `ceil(len / max_chunk_size)`.
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.max_chunk_size.get())
    }
}

/// Iterator returned by [`Partitioner::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a, K> {
    rest: &'a [K],
    max: usize,
}

impl<'a, K> Iterator for Chunks<'a, K> {
    type Item = &'a [K];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let split = self.max.min(self.rest.len());
        let (chunk, rest) = self.rest.split_at(split);
        self.rest = rest;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rest.len().div_ceil(self.max);
        (remaining, Some(remaining))
    }
}

impl<K> ExactSizeIterator for Chunks<'_, K> {}

#[cfg(test)]
mod tests {
    use super::{ChunkSize, Partitioner};

    fn sizes(len: usize, max: usize) -> Vec<usize> {
        let keys: Vec<usize> = (0..len).collect();
        let partitioner = Partitioner::new(ChunkSize::new(max).unwrap());
        partitioner.chunks(&keys).map(<[usize]>::len).collect()
    }

    #[test]
    fn seven_keys_by_three() {
        assert_eq!(sizes(7, 3), vec![3, 3, 1]);
    }

    #[test]
    fn chunk_larger_than_input() {
        assert_eq!(sizes(5, 10), vec![5]);
        assert_eq!(sizes(5, 5), vec![5]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(sizes(0, 4).is_empty());
        assert_eq!(Partitioner::new(ChunkSize::ONE).chunk_count(0), 0);
    }

    #[test]
    fn exact_multiple_has_full_last_chunk() {
        assert_eq!(sizes(9, 3), vec![3, 3, 3]);
    }

    #[test]
    fn chunks_reassemble_the_input() {
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..200 {
            let len = rng.usize(0..500);
            let max = rng.usize(1..64);
            let keys: Vec<u32> = (0..len).map(|_| rng.u32(..)).collect();
            let partitioner = Partitioner::new(ChunkSize::new(max).unwrap());

            let chunks: Vec<&[u32]> = partitioner.chunks(&keys).collect();
            assert_eq!(chunks.len(), partitioner.chunk_count(len));
            assert_eq!(chunks.len(), len.div_ceil(max));
            if let Some((last, full)) = chunks.split_last() {
                assert!(full.iter().all(|chunk| chunk.len() == max));
                let expected_last = if len % max == 0 { max } else { len % max };
                assert_eq!(last.len(), expected_last);
            }
            assert_eq!(chunks.concat(), keys);
        }
    }

    #[test]
    fn size_hint_is_exact() {
        let keys = [0u8; 10];
        let partitioner = Partitioner::new(ChunkSize::new(4).unwrap());
        let mut chunks = partitioner.chunks(&keys);
        assert_eq!(chunks.len(), 3);
        chunks.next();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn chunk_size_rejects_zero() {
        assert!(ChunkSize::new(0).is_none());
        assert!(ChunkSize::try_from(0usize).is_err());
        assert_eq!(ChunkSize::default().get(), 20_000);
    }
}
