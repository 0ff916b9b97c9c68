use std::ops::Range;

/// Records per chunk when `len` records are split over `workers` workers.
pub fn chunk_size(len: usize, workers: usize) -> usize {
    if workers == 0 {
        0
    } else {
        len.div_ceil(workers)
    }
}

/// Splits `0..len` into `workers` contiguous chunks of `chunk_size(len, workers)`.
///
/// The last non-empty chunk is clipped at `len`; when there are more workers
/// than the chunk size can feed, the trailing chunks are empty. Always returns
/// exactly `workers` ranges, in order, covering `0..len` without overlap.
pub fn chunk_bounds(len: usize, workers: usize) -> Vec<Range<usize>> {
    let per_worker = chunk_size(len, workers);
    (0..workers)
        .map(|i| {
            let start = (per_worker * i).min(len);
            let end = (start + per_worker).min(len);
            start..end
        })
        .collect()
}
