/// Fixed range counting sort of splat indexes by integer depth
use super::messages::{DepthMetric, SortKernel, TailPlacement};
use crate::error::SortRequestError;
use glam::{Mat4, Vec3};
use rayon::prelude::*;
use splat_constants::sorting::{FIXED_POINT_SCALE, PARALLEL_SORT_CHUNK};

/// Parameters of one sort run, minus the buffers.
#[derive(Debug, Clone, Copy)]
pub struct SortParams {
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub sort_count: usize,
    pub render_count: usize,
    pub depth_metric: DepthMetric,
    pub tail_placement: TailPlacement,
    pub depth_map_range: usize,
}

/// Reusable per-worker temporaries. Grows to the largest request seen.
#[derive(Debug, Default)]
pub struct SortScratch {
    keys: Vec<i64>,
    counts: Vec<u32>,
    /// Per-lane histograms for the parallel kernel.
    lanes: Vec<Vec<u32>>,
}

/// Scale positions to fixed point, three integers per splat.
pub fn quantize_positions(positions: &[f32]) -> Vec<i32> {
    positions
        .par_iter()
        .map(|&value| (value * FIXED_POINT_SCALE).round() as i32)
        .collect()
}

/// Depth row of a view-projection matrix (elements 2, 6 and 10 in column
/// major order) scaled to fixed point.
pub fn fixed_point_depth_row(view_projection: &Mat4) -> [i64; 3] {
    let m = view_projection.to_cols_array();
    [m[2], m[6], m[10]].map(|value| (value * FIXED_POINT_SCALE).round() as i64)
}

/// Integer depth of one fixed point position. Larger is farther.
pub fn fixed_point_depth(row: &[i64; 3], position: &[i32]) -> i64 {
    row[0] * position[0] as i64 + row[1] * position[1] as i64 + row[2] * position[2] as i64
}

/// Squared fixed point distance to `camera`. Saturates instead of wrapping.
pub fn fixed_point_distance_squared(camera: &[i64; 3], position: &[i32]) -> i64 {
    (0..3).fold(0i64, |sum, axis| {
        let delta = position[axis] as i64 - camera[axis];
        sum.saturating_add(delta.saturating_mul(delta))
    })
}

fn fixed_point_camera(camera_position: Vec3) -> [i64; 3] {
    camera_position
        .to_array()
        .map(|value| (value * FIXED_POINT_SCALE).round() as i64)
}

/// Check a request against the buffers it will touch.
pub fn validate(
    params: &SortParams,
    splat_count: usize,
    indexes: &[u32],
    output: &[u32],
) -> Result<(), SortRequestError> {
    if params.depth_map_range < 2 {
        return Err(SortRequestError::InvalidDepthRange(params.depth_map_range));
    }
    if params.sort_count > params.render_count {
        return Err(SortRequestError::SortCountExceedsRenderCount {
            sort_count: params.sort_count,
            render_count: params.render_count,
        });
    }
    if params.render_count > indexes.len() {
        return Err(SortRequestError::NotEnoughCandidates {
            render_count: params.render_count,
            available: indexes.len(),
        });
    }
    if output.len() < params.render_count {
        return Err(SortRequestError::OutputTooSmall {
            expected: params.render_count,
            actual: output.len(),
        });
    }
    if let Some(&index) = indexes[..params.render_count]
        .iter()
        .find(|&&index| index as usize >= splat_count)
    {
        return Err(SortRequestError::IndexOutOfRange { index, splat_count });
    }
    Ok(())
}

/// Order `indexes[..render_count]` into `output`. The first `sort_count`
/// candidates come out back to front; the rest keep their input order and
/// sit before or after them per `tail_placement`.
pub fn sort_indexes(
    kernel: SortKernel,
    positions: &[i32],
    params: &SortParams,
    indexes: &[u32],
    output: &mut [u32],
    scratch: &mut SortScratch,
) -> Result<(), SortRequestError> {
    let splat_count = positions.len() / 3;
    validate(params, splat_count, indexes, output)?;

    let sort_count = params.sort_count;
    let render_count = params.render_count;
    let tail = &indexes[sort_count..render_count];
    let (sorted_out, tail_out) = match params.tail_placement {
        TailPlacement::BeforeSorted => {
            let (tail_out, rest) = output[..render_count].split_at_mut(tail.len());
            (rest, tail_out)
        }
        TailPlacement::AfterSorted => {
            let (sorted_out, tail_out) = output[..render_count].split_at_mut(sort_count);
            (sorted_out, tail_out)
        }
    };
    tail_out.copy_from_slice(tail);

    if sort_count == 0 {
        return Ok(());
    }

    let candidates = &indexes[..sort_count];
    compute_keys(kernel, positions, params, candidates, scratch);
    build_histogram(kernel, params.depth_map_range, scratch);

    // Exclusive prefix sum, then a stable scatter in input order.
    let mut offset = 0u32;
    for count in scratch.counts.iter_mut() {
        let start = offset;
        offset += *count;
        *count = start;
    }
    for (&index, &key) in candidates.iter().zip(&scratch.keys) {
        let slot = &mut scratch.counts[key as usize];
        sorted_out[*slot as usize] = index;
        *slot += 1;
    }
    Ok(())
}

/// Fill `scratch.keys` with one counting sort key per candidate.
/// Key 0 is the farthest bucket.
fn compute_keys(
    kernel: SortKernel,
    positions: &[i32],
    params: &SortParams,
    candidates: &[u32],
    scratch: &mut SortScratch,
) {
    let row = fixed_point_depth_row(&params.view_projection);
    let camera = fixed_point_camera(params.camera_position);
    let metric = params.depth_metric;
    let depth_of = |index: u32| -> i64 {
        let base = index as usize * 3;
        let position = &positions[base..base + 3];
        match metric {
            DepthMetric::ViewProjection => fixed_point_depth(&row, position),
            DepthMetric::CameraDistance => fixed_point_distance_squared(&camera, position),
        }
    };

    scratch.keys.clear();
    scratch.keys.resize(candidates.len(), 0);
    let keys = &mut scratch.keys;

    let (min, max) = match kernel {
        SortKernel::Serial => {
            let mut min = i64::MAX;
            let mut max = i64::MIN;
            for (key, &index) in keys.iter_mut().zip(candidates) {
                let depth = depth_of(index);
                min = min.min(depth);
                max = max.max(depth);
                *key = depth;
            }
            (min, max)
        }
        SortKernel::Parallel => {
            keys.par_iter_mut()
                .zip(candidates.par_iter())
                .for_each(|(key, &index)| *key = depth_of(index));
            keys.par_iter()
                .fold(|| (i64::MAX, i64::MIN), |(lo, hi), &d| (lo.min(d), hi.max(d)))
                .reduce(|| (i64::MAX, i64::MIN), |a, b| (a.0.min(b.0), a.1.max(b.1)))
        }
    };

    let top = params.depth_map_range as i128 - 1;
    let span = max as i128 - min as i128;
    let to_key = |depth: i64| -> i64 {
        let bucket = if span == 0 {
            0
        } else {
            (depth as i128 - min as i128) * top / span
        };
        (top - bucket) as i64
    };
    match kernel {
        SortKernel::Serial => keys.iter_mut().for_each(|key| *key = to_key(*key)),
        SortKernel::Parallel => keys.par_iter_mut().for_each(|key| *key = to_key(*key)),
    }
}

fn build_histogram(kernel: SortKernel, depth_map_range: usize, scratch: &mut SortScratch) {
    let SortScratch {
        keys,
        counts,
        lanes,
    } = scratch;
    counts.clear();
    counts.resize(depth_map_range, 0);
    match kernel {
        SortKernel::Serial => {
            for &key in keys.iter() {
                counts[key as usize] += 1;
            }
        }
        SortKernel::Parallel => {
            // One histogram per lane, then a merge split over bins.
            let lane_len = keys
                .len()
                .div_ceil(rayon::current_num_threads().max(1))
                .max(PARALLEL_SORT_CHUNK);
            let lane_count = keys.len().div_ceil(lane_len);
            if lanes.len() < lane_count {
                lanes.resize_with(lane_count, Vec::new);
            }
            let lanes = &mut lanes[..lane_count];

            lanes
                .par_iter_mut()
                .zip(keys.par_chunks(lane_len))
                .for_each(|(lane, chunk)| {
                    lane.clear();
                    lane.resize(depth_map_range, 0);
                    for &key in chunk {
                        lane[key as usize] += 1;
                    }
                });

            let lanes = &*lanes;
            counts
                .par_chunks_mut(PARALLEL_SORT_CHUNK)
                .enumerate()
                .for_each(|(block, out)| {
                    let start = block * PARALLEL_SORT_CHUNK;
                    let len = out.len();
                    for lane in lanes {
                        for (total, &count) in out.iter_mut().zip(&lane[start..start + len]) {
                            *total += count;
                        }
                    }
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    /// The identity's depth row reads `z` directly.
    fn z_depth_matrix() -> Mat4 {
        Mat4::IDENTITY
    }

    fn params(sort_count: usize, render_count: usize, range: usize) -> SortParams {
        SortParams {
            view_projection: z_depth_matrix(),
            camera_position: Vec3::ZERO,
            sort_count,
            render_count,
            depth_metric: DepthMetric::ViewProjection,
            tail_placement: TailPlacement::BeforeSorted,
            depth_map_range: range,
        }
    }

    fn positions_along_z(zs: &[f32]) -> Vec<i32> {
        let flat: Vec<f32> = zs.iter().flat_map(|&z| [0.0, 0.0, z]).collect();
        quantize_positions(&flat)
    }

    #[test]
    fn known_depths_come_out_back_to_front() {
        let zs: Vec<f32> = (0..1000).map(|n| n as f32 / 1000.0).collect();
        let positions = positions_along_z(&zs);
        let mut indexes: Vec<u32> = (0..1000).collect();
        indexes.shuffle(&mut StdRng::seed_from_u64(5));

        for kernel in [SortKernel::Serial, SortKernel::Parallel] {
            let mut output = vec![0u32; 1000];
            let mut scratch = SortScratch::default();
            sort_indexes(kernel, &positions, &params(1000, 1000, 65_536), &indexes, &mut output, &mut scratch)
                .unwrap();

            let mut sorted = output.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..1000).collect::<Vec<u32>>());

            let tolerance = (zs[999] - zs[0]) / 65_535.0 + 1e-6;
            for pair in output.windows(2) {
                assert!(
                    zs[pair[0] as usize] + tolerance >= zs[pair[1] as usize],
                    "{} before {}",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn static_view_sort_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(77);
        let zs: Vec<f32> = (0..4_000).map(|n| ((n * 37) % 1000) as f32 * 0.01).collect();
        let positions = positions_along_z(&zs);
        let mut indexes: Vec<u32> = (0..4_000).collect();
        indexes.shuffle(&mut rng);

        let p = params(3_000, 4_000, 1 << 16);
        let mut scratch = SortScratch::default();
        let mut first = vec![0u32; 4_000];
        let mut second = vec![0u32; 4_000];
        sort_indexes(SortKernel::Parallel, &positions, &p, &indexes, &mut first, &mut scratch).unwrap();
        sort_indexes(SortKernel::Parallel, &positions, &p, &indexes, &mut second, &mut scratch).unwrap();
        assert_eq!(first, second);

        let mut serial = vec![0u32; 4_000];
        sort_indexes(SortKernel::Serial, &positions, &p, &indexes, &mut serial, &mut scratch).unwrap();
        assert_eq!(first, serial);
    }

    #[test]
    fn parallel_histogram_reuses_scratch_buffers() {
        let zs: Vec<f32> = (0..60_000).map(|n| (n % 977) as f32 * 0.1).collect();
        let positions = positions_along_z(&zs);
        let indexes: Vec<u32> = (0..60_000).collect();
        let p = params(60_000, 60_000, 1 << 16);
        let mut scratch = SortScratch::default();
        let mut output = vec![0u32; 60_000];

        sort_indexes(SortKernel::Parallel, &positions, &p, &indexes, &mut output, &mut scratch).unwrap();
        let counts_ptr = scratch.counts.as_ptr();
        let lane_ptrs: Vec<*const u32> = scratch.lanes.iter().map(|lane| lane.as_ptr()).collect();
        assert!(!lane_ptrs.is_empty());

        let mut again = vec![0u32; 60_000];
        sort_indexes(SortKernel::Parallel, &positions, &p, &indexes, &mut again, &mut scratch).unwrap();
        assert_eq!(scratch.counts.as_ptr(), counts_ptr);
        let reused: Vec<*const u32> = scratch.lanes.iter().map(|lane| lane.as_ptr()).collect();
        assert_eq!(reused, lane_ptrs);
        assert_eq!(output, again);

        let mut serial = vec![0u32; 60_000];
        sort_indexes(SortKernel::Serial, &positions, &p, &indexes, &mut serial, &mut scratch).unwrap();
        assert_eq!(output, serial);
    }

    #[test]
    fn ties_keep_input_order() {
        // With two buckets, everything below the midpoint shares a key.
        let positions = positions_along_z(&[0.0, 0.1, 0.2, 1.0, 0.9]);
        let indexes = vec![2, 0, 1, 4, 3];
        let mut output = vec![0u32; 5];
        let mut scratch = SortScratch::default();
        sort_indexes(SortKernel::Serial, &positions, &params(5, 5, 2), &indexes, &mut output, &mut scratch)
            .unwrap();
        assert_eq!(output, vec![3, 2, 0, 1, 4]);
    }

    #[test]
    fn equal_depths_preserve_order() {
        let positions = positions_along_z(&[0.5; 6]);
        let indexes = vec![5, 3, 1, 0, 2, 4];
        let mut output = vec![0u32; 6];
        let mut scratch = SortScratch::default();
        sort_indexes(SortKernel::Parallel, &positions, &params(6, 6, 1 << 16), &indexes, &mut output, &mut scratch)
            .unwrap();
        assert_eq!(output, indexes);
    }

    #[test]
    fn unsorted_tail_is_placed_per_policy() {
        let positions = positions_along_z(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let indexes = vec![0, 1, 2, 4, 3];
        let mut scratch = SortScratch::default();

        let mut before = vec![9u32; 6];
        sort_indexes(SortKernel::Serial, &positions, &params(3, 5, 1 << 16), &indexes, &mut before, &mut scratch)
            .unwrap();
        assert_eq!(&before[..5], &[4, 3, 2, 1, 0]);
        assert_eq!(before[5], 9);

        let mut after = vec![9u32; 5];
        let mut p = params(3, 5, 1 << 16);
        p.tail_placement = TailPlacement::AfterSorted;
        sort_indexes(SortKernel::Serial, &positions, &p, &indexes, &mut after, &mut scratch).unwrap();
        assert_eq!(after, vec![2, 1, 0, 4, 3]);
    }

    #[test]
    fn camera_distance_sorts_far_to_near() {
        let flat = [0.0, 0.0, 1.0, 0.0, 0.0, 5.0, 0.0, 0.0, -3.0];
        let positions = quantize_positions(&flat);
        let mut p = params(3, 3, 1 << 16);
        p.depth_metric = DepthMetric::CameraDistance;
        p.camera_position = Vec3::new(0.0, 0.0, 2.0);

        let mut output = vec![0u32; 3];
        let mut scratch = SortScratch::default();
        sort_indexes(SortKernel::Serial, &positions, &p, &[0, 1, 2], &mut output, &mut scratch).unwrap();
        assert_eq!(output, vec![2, 1, 0]);
    }

    #[test]
    fn malformed_requests_are_refused() {
        let positions = positions_along_z(&[0.0, 1.0]);
        let mut scratch = SortScratch::default();
        let mut output = vec![0u32; 2];

        let err = sort_indexes(SortKernel::Serial, &positions, &params(3, 2, 16), &[0, 1], &mut output, &mut scratch);
        assert!(matches!(err, Err(SortRequestError::SortCountExceedsRenderCount { .. })));

        let err = sort_indexes(SortKernel::Serial, &positions, &params(2, 2, 16), &[0, 7], &mut output, &mut scratch);
        assert_eq!(err, Err(SortRequestError::IndexOutOfRange { index: 7, splat_count: 2 }));

        let err = sort_indexes(SortKernel::Serial, &positions, &params(1, 3, 16), &[0, 1], &mut output, &mut scratch);
        assert!(matches!(err, Err(SortRequestError::NotEnoughCandidates { .. })));
    }

    #[test]
    fn depth_row_reads_third_matrix_row() {
        let matrix = Mat4::from_cols_array(&[
            1.0, 2.0, 0.25, 4.0, //
            5.0, 6.0, -0.5, 8.0, //
            9.0, 10.0, 0.125, 12.0, //
            13.0, 14.0, 15.0, 16.0,
        ]);
        assert_eq!(fixed_point_depth_row(&matrix), [250, -500, 125]);
        assert_eq!(fixed_point_depth(&[250, -500, 125], &[1000, 2000, 8000]), 250_000 - 1_000_000 + 1_000_000);
    }
}
