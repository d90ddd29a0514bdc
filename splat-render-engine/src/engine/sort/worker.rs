use super::counting_sort::{quantize_positions, sort_indexes, SortParams, SortScratch};
use super::messages::{SetupPhase, SortKernel, SortRequest, SortResult, WorkerEvent, WorkerRequest};
use crate::error::{SortEngineError, SortRequestError};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Depth sort engine running on its own thread.
///
/// Requests and events cross an mpsc channel pair. Index and output buffers
/// move with the messages, so the worker and its owner never touch the same
/// buffer at the same time.
pub struct SortWorker {
    requests: Sender<WorkerRequest>,
    events: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl SortWorker {
    pub fn spawn() -> Result<Self, SortEngineError> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();

        let handle = thread::Builder::new()
            .name("splat-sort".into())
            .spawn(move || run_worker(request_rx, event_tx))
            .map_err(SortEngineError::Spawn)?;

        Ok(Self {
            requests: request_tx,
            events: event_rx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, request: WorkerRequest) -> Result<(), SortEngineError> {
        self.requests
            .send(request)
            .map_err(|_| SortEngineError::WorkerDisconnected)
    }

    /// Next pending event, if any. Never blocks.
    pub fn try_recv(&self) -> Result<Option<WorkerEvent>, SortEngineError> {
        match self.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SortEngineError::WorkerDisconnected),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerEvent>, SortEngineError> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SortEngineError::WorkerDisconnected),
        }
    }
}

impl Drop for SortWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Worker side state between requests.
struct WorkerState {
    kernel: SortKernel,
    splat_count: usize,
    depth_map_range: usize,
    positions: Option<Vec<i32>>,
    scratch: SortScratch,
}

fn run_worker(requests: Receiver<WorkerRequest>, events: Sender<WorkerEvent>) {
    let mut state = WorkerState {
        kernel: SortKernel::default(),
        splat_count: 0,
        depth_map_range: 0,
        positions: None,
        scratch: SortScratch::default(),
    };

    while let Ok(request) = requests.recv() {
        let event = match request {
            WorkerRequest::Init {
                kernel,
                splat_count,
                depth_map_range,
            } => {
                state.kernel = kernel;
                state.splat_count = splat_count;
                state.depth_map_range = depth_map_range;
                state.positions = None;
                tracing::debug!(
                    "Sort worker initialised: {:?} kernel, {} splats, depth range {}",
                    kernel,
                    splat_count,
                    depth_map_range
                );
                WorkerEvent::SetupComplete(SetupPhase::Initialized)
            }
            WorkerRequest::Positions(positions) => {
                let expected = state.splat_count * 3;
                if positions.len() == expected {
                    state.positions = Some(quantize_positions(&positions));
                    WorkerEvent::SetupComplete(SetupPhase::PositionsLoaded)
                } else {
                    state.positions = None;
                    let error = SortRequestError::PositionCountMismatch {
                        expected,
                        actual: positions.len(),
                    };
                    tracing::warn!("Sort worker rejected positions: {}", error);
                    WorkerEvent::SetupFailed(error.to_string())
                }
            }
            WorkerRequest::Sort(request) => run_sort(&mut state, request),
            WorkerRequest::Shutdown => break,
        };

        if events.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("Sort worker stopped");
}

fn run_sort(state: &mut WorkerState, request: SortRequest) -> WorkerEvent {
    let SortRequest {
        view_projection,
        camera_position,
        sort_count,
        render_count,
        depth_metric,
        tail_placement,
        indexes,
        mut output,
    } = request;

    let Some(positions) = &state.positions else {
        return canceled(SortRequestError::NotReady, indexes, output);
    };

    let params = SortParams {
        view_projection,
        camera_position,
        sort_count,
        render_count,
        depth_metric,
        tail_placement,
        depth_map_range: state.depth_map_range,
    };

    let start = Instant::now();
    let outcome = sort_indexes(
        state.kernel,
        positions,
        &params,
        &indexes,
        &mut output,
        &mut state.scratch,
    );
    match outcome {
        Ok(()) => WorkerEvent::SortDone(SortResult {
            sort_count,
            render_count,
            elapsed: start.elapsed(),
            indexes,
            output,
        }),
        Err(error) => canceled(error, indexes, output),
    }
}

fn canceled(error: SortRequestError, indexes: Vec<u32>, output: Vec<u32>) -> WorkerEvent {
    tracing::warn!("Sort request canceled: {}", error);
    WorkerEvent::SortCanceled {
        reason: error.to_string(),
        indexes,
        output,
    }
}
