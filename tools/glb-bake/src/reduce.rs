//! Removal of redundant interior keyframes from baked samples
//!
//! An interior sample is dropped when it sits in a run of three identical
//! values and the last kept sample either directly precedes it or holds the
//! same value. The first and last samples are always kept.

/// Reduce single-valued samples
pub fn reduce_keyframes<T: PartialEq + Clone>(times: &[f32], values: &[T]) -> (Vec<f32>, Vec<T>) {
    debug_assert_eq!(times.len(), values.len());
    let count = times.len().min(values.len());
    if count <= 1 {
        return (times[..count].to_vec(), values[..count].to_vec());
    }

    let mut kept_times = Vec::with_capacity(count);
    let mut kept_values = Vec::with_capacity(count);
    kept_times.push(times[0]);
    kept_values.push(values[0].clone());

    let mut last_kept = 0;
    for i in 1..count - 1 {
        let redundant = (last_kept >= i - 1 || values[last_kept] == values[i])
            && values[i - 1] == values[i]
            && values[i] == values[i + 1];
        if !redundant {
            last_kept = i;
            kept_times.push(times[i]);
            kept_values.push(values[i].clone());
        }
    }

    kept_times.push(times[count - 1]);
    kept_values.push(values[count - 1].clone());
    (kept_times, kept_values)
}

/// Reduce samples stored as flat blocks of `block_size` values per time
///
/// Blocks are compared as a whole, e.g. all blend shape weights at one time.
pub fn reduce_keyframe_blocks(
    times: &[f32],
    values: &[f32],
    block_size: usize,
) -> (Vec<f32>, Vec<f32>) {
    if block_size == 0 {
        return (times.to_vec(), values.to_vec());
    }
    let blocks: Vec<&[f32]> = values.chunks_exact(block_size).collect();
    debug_assert_eq!(blocks.len(), times.len());

    let (kept_times, kept_blocks) = reduce_keyframes(times, &blocks);
    (kept_times, kept_blocks.concat())
}
