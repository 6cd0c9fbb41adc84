/// Background queue for fan-out jobs
///
/// Request handlers submit newly created posts; a single worker task drains the
/// channel and runs the fan-out engine. Submission never waits: when the queue
/// is full the job is dropped and the post only reaches followers through the
/// trending backfill.
///
/// Shutdown: once every `FanoutQueue` handle is dropped the worker finishes the
/// jobs already queued and exits, so `main` can await its `JoinHandle`.
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::metrics::jobs as job_metrics;
use crate::models::Post;
use crate::services::FanoutEngine;

/// Fan-out job for one newly created post
#[derive(Debug, Clone)]
pub struct FanoutJob {
    pub post: Post,
}

/// Cloneable submission handle
#[derive(Clone)]
pub struct FanoutQueue {
    sender: mpsc::Sender<FanoutJob>,
}

pub type FanoutReceiver = mpsc::Receiver<FanoutJob>;

/// Create a bounded fan-out queue with room for `capacity` pending jobs
pub fn create_fanout_queue(capacity: usize) -> (FanoutQueue, FanoutReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (FanoutQueue { sender }, receiver)
}

impl FanoutQueue {
    /// Queue a post for fan-out. Returns false when the job had to be dropped.
    pub fn submit(&self, post: Post) -> bool {
        let post_id = post.post_id.clone();
        match self.sender.try_send(FanoutJob { post }) {
            Ok(()) => {
                job_metrics::record_fanout_job("queued");
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(post_id = %post_id, "Fan-out queue full, dropping job");
                job_metrics::record_fanout_job("dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(post_id = %post_id, "Fan-out worker stopped, dropping job");
                job_metrics::record_fanout_job("dropped");
                false
            }
        }
    }
}

/// Spawn the worker that runs fan-out for each queued post
pub fn spawn_fanout_worker(engine: FanoutEngine, mut receiver: FanoutReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Fan-out worker started");

        while let Some(job) = receiver.recv().await {
            engine.fan_out(&job.post).await;
        }

        info!("Fan-out worker stopped (channel closed)");
    })
}
