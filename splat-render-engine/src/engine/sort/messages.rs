use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Depth kernel variant selected when the worker is initialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKernel {
    Serial,
    /// Depths and histograms computed across the rayon pool.
    #[default]
    Parallel,
}

/// Quantity the counting sort orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthMetric {
    /// Third row of the view-projection matrix dotted with the position.
    #[default]
    ViewProjection,
    /// Squared distance to the request's camera position.
    CameraDistance,
}

/// Where the unsorted `M - K` candidates go relative to the sorted prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailPlacement {
    /// Unsorted far candidates are drawn first.
    #[default]
    BeforeSorted,
    AfterSorted,
}

/// Which setup step a `SetupComplete` event acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPhase {
    Initialized,
    PositionsLoaded,
}

/// One depth sort run. The candidate and output buffers travel with the
/// request and come back in the matching event, so each side owns them
/// exclusively while it works on them.
#[derive(Debug)]
pub struct SortRequest {
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    /// `K`: leading candidates to sort exactly.
    pub sort_count: usize,
    /// `M`: total candidates to emit.
    pub render_count: usize,
    pub depth_metric: DepthMetric,
    pub tail_placement: TailPlacement,
    pub indexes: Vec<u32>,
    pub output: Vec<u32>,
}

#[derive(Debug)]
pub enum WorkerRequest {
    Init {
        kernel: SortKernel,
        splat_count: usize,
        depth_map_range: usize,
    },
    /// Three floats per splat, written once.
    Positions(Vec<f32>),
    Sort(SortRequest),
    Shutdown,
}

#[derive(Debug)]
pub struct SortResult {
    pub sort_count: usize,
    pub render_count: usize,
    pub elapsed: Duration,
    pub indexes: Vec<u32>,
    /// Permutation in `output[..render_count]`.
    pub output: Vec<u32>,
}

#[derive(Debug)]
pub enum WorkerEvent {
    SetupComplete(SetupPhase),
    /// A setup message was refused; the worker holds no positions.
    SetupFailed(String),
    SortDone(SortResult),
    SortCanceled {
        reason: String,
        indexes: Vec<u32>,
        output: Vec<u32>,
    },
}
