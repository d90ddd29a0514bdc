//! Per-frame coordination between camera, spatial index and sort worker.
//!
//! Decides when a new depth sort is worth dispatching, builds its candidate
//! set from the visible octree leaves and hands finished permutations to the
//! render target.

/// Leaf culling and candidate buffer packing.
pub mod culling;
/// Camera motion thresholds gating re-sorts.
pub mod view_tracker;

pub use culling::{CandidateCounts, gather_candidates};
pub use view_tracker::ViewTracker;

use crate::config::ViewerConfig;
use crate::engine::camera::CameraState;
use crate::engine::render::SplatRenderTarget;
use crate::engine::sort::{
    SetupPhase, SortRequest, SortResult, SortWorker, WorkerEvent, WorkerRequest,
};
use crate::engine::spatial::SplatTree;
use crate::error::SortEngineError;
use glam::Mat4;
use splat_buffer::SplatBuffer;
use std::time::{Duration, Instant};

/// What `update_view` did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dispatched { sort_count: usize, render_count: usize },
    /// A sort is outstanding; this frame keeps the last permutation.
    SortInFlight,
    /// The worker has not finished loading positions.
    NotReady,
    ViewUnchanged,
}

#[derive(Debug, Clone, Default)]
pub struct SortStatistics {
    pub last_sort_time: Option<Duration>,
    pub sort_count: usize,
    pub render_count: usize,
    pub visible_leaves: usize,
    pub total_leaves: usize,
    pub dispatched_sorts: u64,
    pub completed_sorts: u64,
    pub canceled_sorts: u64,
}

/// Drives the sort worker from camera updates.
///
/// Owns two permutation buffers: the front one holds the last completed
/// sort and the back one travels to the worker with each request.
pub struct FrameOrchestrator {
    worker: SortWorker,
    tree: SplatTree,
    config: ViewerConfig,
    model: Mat4,
    inverse_model: Mat4,
    splat_count: usize,
    pending_positions: Option<Vec<f32>>,
    ready: bool,
    initial_sort_pending: bool,
    sort_in_flight: bool,
    candidates: Option<Vec<u32>>,
    back_buffer: Option<Vec<u32>>,
    front_buffer: Vec<u32>,
    front_count: usize,
    view_tracker: ViewTracker,
    statistics: SortStatistics,
}

impl FrameOrchestrator {
    /// Validate `config`, index the buffer and start the worker. Setup then
    /// continues through `poll_events` or `wait_until_ready`.
    pub fn new(buffer: &SplatBuffer, config: &ViewerConfig) -> Result<Self, SortEngineError> {
        config.validate()?;
        let splat_count = buffer.splat_count();
        let alpha_threshold = config.splat_tree.alpha_threshold;

        let mut tree = SplatTree::new(
            config.splat_tree.max_depth,
            config.splat_tree.max_indexes_per_node,
        );
        tree.build(buffer, |index| buffer.get_color(index)[3] > alpha_threshold);

        let mut positions = vec![0.0f32; splat_count * 3];
        buffer.fill_position_array(&mut positions);

        let worker = SortWorker::spawn()?;
        worker.send(WorkerRequest::Init {
            kernel: config.sort.kernel,
            splat_count,
            depth_map_range: config.sort.depth_map_range,
        })?;

        let model = config.scene.model_matrix();
        tracing::info!(
            "Splat tree: {} of {} splats indexed in {} leaves",
            tree.included_count(),
            splat_count,
            tree.count_leaves()
        );

        Ok(Self {
            worker,
            tree,
            config: config.clone(),
            model,
            inverse_model: model.inverse(),
            splat_count,
            pending_positions: Some(positions),
            ready: false,
            initial_sort_pending: false,
            sort_in_flight: false,
            candidates: Some(Vec::with_capacity(splat_count)),
            back_buffer: Some(vec![0; splat_count]),
            front_buffer: vec![0; splat_count],
            front_count: 0,
            view_tracker: ViewTracker::new(&config.scheduling),
            statistics: SortStatistics::default(),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_sort_in_flight(&self) -> bool {
        self.sort_in_flight
    }

    pub fn tree(&self) -> &SplatTree {
        &self.tree
    }

    pub fn statistics(&self) -> &SortStatistics {
        &self.statistics
    }

    /// Last completed permutation.
    pub fn current_indexes(&self) -> &[u32] {
        &self.front_buffer[..self.front_count]
    }

    /// Drain worker events without blocking. Returns how many were handled.
    pub fn poll_events(
        &mut self,
        target: &mut dyn SplatRenderTarget,
    ) -> Result<usize, SortEngineError> {
        let mut handled = 0;
        while let Some(event) = self.worker.try_recv()? {
            self.handle_event(event, target)?;
            handled += 1;
        }
        Ok(handled)
    }

    fn handle_event(
        &mut self,
        event: WorkerEvent,
        target: &mut dyn SplatRenderTarget,
    ) -> Result<(), SortEngineError> {
        match event {
            WorkerEvent::SetupComplete(SetupPhase::Initialized) => {
                if let Some(positions) = self.pending_positions.take() {
                    self.worker.send(WorkerRequest::Positions(positions))?;
                }
            }
            WorkerEvent::SetupComplete(SetupPhase::PositionsLoaded) => {
                self.ready = true;
                self.initial_sort_pending = true;
                tracing::info!("Sort worker ready for {} splats", self.splat_count);
            }
            WorkerEvent::SetupFailed(reason) => {
                return Err(SortEngineError::SetupFailed(reason));
            }
            WorkerEvent::SortDone(result) => self.complete_sort(result, target),
            WorkerEvent::SortCanceled {
                reason,
                indexes,
                output,
            } => {
                tracing::warn!("Sort canceled: {}", reason);
                self.candidates = Some(indexes);
                self.back_buffer = Some(output);
                self.sort_in_flight = false;
                self.statistics.canceled_sorts += 1;
            }
        }
        Ok(())
    }

    fn complete_sort(&mut self, result: SortResult, target: &mut dyn SplatRenderTarget) {
        let SortResult {
            sort_count,
            render_count,
            elapsed,
            indexes,
            output,
        } = result;

        let previous_front = std::mem::replace(&mut self.front_buffer, output);
        self.back_buffer = Some(previous_front);
        self.candidates = Some(indexes);
        self.front_count = render_count;
        self.sort_in_flight = false;

        self.statistics.last_sort_time = Some(elapsed);
        self.statistics.completed_sorts += 1;
        tracing::debug!(
            "Sort done: {} sorted, {} rendered in {:.2} ms",
            sort_count,
            render_count,
            elapsed.as_secs_f64() * 1000.0
        );

        target.update_indexes(&self.front_buffer[..render_count], render_count);
    }

    /// Per-frame entry point: handle worker events, then dispatch a sort if
    /// the view warrants one. The first sort after setup gathers every leaf.
    pub fn update(
        &mut self,
        camera: &CameraState,
        target: &mut dyn SplatRenderTarget,
    ) -> Result<DispatchOutcome, SortEngineError> {
        self.poll_events(target)?;
        if self.initial_sort_pending {
            let outcome = self.update_view(camera, true, true)?;
            if matches!(outcome, DispatchOutcome::Dispatched { .. }) {
                self.initial_sort_pending = false;
            }
            return Ok(outcome);
        }
        self.update_view(camera, false, false)
    }

    /// Dispatch a sort for `camera` unless one is outstanding or, without
    /// `force`, the camera has barely changed since the last dispatch.
    pub fn update_view(
        &mut self,
        camera: &CameraState,
        force: bool,
        gather_all: bool,
    ) -> Result<DispatchOutcome, SortEngineError> {
        if !self.ready {
            return Ok(DispatchOutcome::NotReady);
        }
        if !force && !self.view_tracker.needs_sort(camera) {
            return Ok(DispatchOutcome::ViewUnchanged);
        }
        if self.sort_in_flight {
            return Ok(DispatchOutcome::SortInFlight);
        }
        let (Some(mut candidates), Some(mut output)) =
            (self.candidates.take(), self.back_buffer.take())
        else {
            return Ok(DispatchOutcome::SortInFlight);
        };

        let counts = gather_candidates(
            &self.tree,
            camera,
            &self.model,
            &self.config.culling,
            gather_all,
            &mut candidates,
        );
        if output.len() < counts.render_count {
            output.resize(counts.render_count, 0);
        }

        let request = SortRequest {
            view_projection: camera.view_projection() * self.model,
            camera_position: self.inverse_model.transform_point3(camera.position),
            sort_count: counts.sort_count,
            render_count: counts.render_count,
            depth_metric: self.config.sort.depth_metric,
            tail_placement: self.config.sort.tail_placement,
            indexes: candidates,
            output,
        };
        self.worker.send(WorkerRequest::Sort(request))?;
        self.sort_in_flight = true;
        self.view_tracker.accept(camera);

        self.statistics.sort_count = counts.sort_count;
        self.statistics.render_count = counts.render_count;
        self.statistics.visible_leaves = counts.visible_leaves;
        self.statistics.total_leaves = counts.total_leaves;
        self.statistics.dispatched_sorts += 1;
        tracing::debug!(
            "Dispatched sort: {} of {} leaves visible, {} to sort, {} to render",
            counts.visible_leaves,
            counts.total_leaves,
            counts.sort_count,
            counts.render_count
        );

        Ok(DispatchOutcome::Dispatched {
            sort_count: counts.sort_count,
            render_count: counts.render_count,
        })
    }

    /// Block until positions are loaded on the worker.
    pub fn wait_until_ready(
        &mut self,
        target: &mut dyn SplatRenderTarget,
        timeout: Duration,
    ) -> Result<(), SortEngineError> {
        let deadline = Instant::now() + timeout;
        while !self.ready {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SortEngineError::SetupTimeout(timeout));
            }
            if let Some(event) = self.worker.recv_timeout(remaining)? {
                self.handle_event(event, target)?;
            }
        }
        Ok(())
    }

    /// Block until the outstanding sort finishes. Returns false on timeout.
    pub fn wait_for_sort(
        &mut self,
        target: &mut dyn SplatRenderTarget,
        timeout: Duration,
    ) -> Result<bool, SortEngineError> {
        let deadline = Instant::now() + timeout;
        while self.sort_in_flight {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            if let Some(event) = self.worker.recv_timeout(remaining)? {
                self.handle_event(event, target)?;
            }
        }
        Ok(true)
    }
}
