//! Sample-offset planning for the position-curve benchmark phase.
//!
//! Pure logic: the engine feeds the planned offsets to the process runner
//! one at a time, in order.

/// Bytes read sequentially from each curve position.
pub const CURVE_SAMPLE_BYTES: u64 = 128 * 1024 * 1024;

/// O_DIRECT requires offsets and sizes to be multiples of the device block
/// size. 4096 satisfies both 512-byte and 4 KiB sector devices.
pub const SECTOR_ALIGN: u64 = 4096;

/// Plan `num_points` evenly spaced byte offsets across
/// `[0, capacity - CURVE_SAMPLE_BYTES]`, each floored to the sector
/// alignment boundary so direct I/O never sees a misaligned offset.
///
/// `num_points == 1` yields the single offset 0. Capacities smaller than one
/// sample collapse every offset to 0.
pub fn plan_offsets(capacity: u64, num_points: u32) -> Vec<u64> {
    let max_offset = capacity.saturating_sub(CURVE_SAMPLE_BYTES);
    (0..num_points)
        .map(|i| {
            let fraction = if num_points == 1 {
                0.0
            } else {
                f64::from(i) / f64::from(num_points - 1)
            };
            let raw = fraction * max_offset as f64;
            (raw as u64 / SECTOR_ALIGN) * SECTOR_ALIGN
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
