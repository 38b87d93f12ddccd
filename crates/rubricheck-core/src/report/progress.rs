//! Progress reporting for grading runs. The orchestrator emits done/total in
//! completion order; the console layer consumes it via a sink.

use std::sync::Arc;

/// One progress update: how many criteria are done and the total count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
}

/// Called once per completed criterion.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
