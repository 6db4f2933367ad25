/// Number of intervals reported per class.
pub const BUCKET_COUNT: usize = 6;

/// Distributes crossing frame indices over `bucket_count` equal-width intervals of
/// `[0, total_frames]`.
///
/// Interval `i` spans `(total_frames * i / n, total_frames * (i + 1) / n]`: the lower bound
/// is open, so an event at frame 0 lands in no interval, and events past `total_frames`
/// are dropped as well. Result consumers depend on this exact boundary policy.
///
/// Bounds are compared in integer arithmetic (`f * n` against `total * i`) so fractional
/// interval edges are exact.
pub fn bucket_intervals(events: &[u64], total_frames: u64, bucket_count: usize) -> Vec<u64> {
    let mut counts = vec![0u64; bucket_count];
    if total_frames == 0 || bucket_count == 0 {
        return counts;
    }
    let n = bucket_count as u128;
    let total = total_frames as u128;
    for &frame in events {
        if frame == 0 || frame > total_frames {
            continue;
        }
        // smallest i with f * n <= total * (i + 1)
        let scaled = frame as u128 * n;
        let bucket = scaled.div_ceil(total) - 1;
        counts[bucket as usize] += 1;
    }
    counts
}
