//! Depth sort engine.
//!
//! A counting sort over a fixed integer depth range, run on a dedicated
//! worker thread that talks to the frame orchestrator through messages.

/// Fixed point depth keys and the stable counting sort kernel.
pub mod counting_sort;
/// Request and event types exchanged with the worker.
pub mod messages;
/// Worker thread owning positions and sort scratch space.
pub mod worker;

pub use counting_sort::{SortParams, SortScratch, sort_indexes};
pub use messages::{
    DepthMetric, SetupPhase, SortKernel, SortRequest, SortResult, TailPlacement, WorkerEvent,
    WorkerRequest,
};
pub use worker::SortWorker;
