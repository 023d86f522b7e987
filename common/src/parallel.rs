//! Parallel processing utilities.

use rayon::prelude::*;

/// Multiplier for number of chunks relative to CPU threads.
/// Using 3x threads provides good load balancing when some chunks finish faster.
const CHUNKS_PER_THREAD: usize = 3;

/// Number of rows per chunk so that `rows` splits into roughly
/// `threads * CHUNKS_PER_THREAD` chunks. At least 1.
#[inline]
pub fn rows_per_chunk(rows: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (rows / num_chunks).max(1)
}

/// Split `data` into row-aligned mutable chunks, yielding `(first_row, chunk)`.
///
/// `row_len` must divide `data.len()`.
pub fn par_rows_mut<'a, T: Send>(
    data: &'a mut [T],
    row_len: usize,
) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])> {
    assert!(row_len > 0, "row_len must be > 0");
    assert_eq!(data.len() % row_len, 0, "data is not row-aligned");
    let chunk_rows = rows_per_chunk(data.len() / row_len);
    data.par_chunks_mut(row_len * chunk_rows)
        .enumerate()
        .map(move |(i, chunk)| (i * chunk_rows, chunk))
}

/// Like [`par_rows_mut`], zipped with matching read-only chunks of `other`.
pub fn par_rows_zip_mut<'a, T: Send, U: Sync>(
    data: &'a mut [T],
    other: &'a [U],
    row_len: usize,
) -> impl IndexedParallelIterator<Item = (usize, (&'a mut [T], &'a [U]))> {
    assert_eq!(data.len(), other.len(), "Zipped slices must have equal length");
    assert!(row_len > 0, "row_len must be > 0");
    let chunk_rows = rows_per_chunk(data.len() / row_len);
    let chunk_size = row_len * chunk_rows;
    data.par_chunks_mut(chunk_size)
        .zip(other.par_chunks(chunk_size))
        .enumerate()
        .map(move |(i, pair)| (i * chunk_rows, pair))
}
