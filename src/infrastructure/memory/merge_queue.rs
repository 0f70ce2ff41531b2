//! Channel-backed Merge Queue

use tokio::sync::mpsc;

use crate::application::ports::{JobError, MergeJob, MergeQueuePort};

pub struct ChannelMergeQueue {
    sender: mpsc::Sender<MergeJob>,
}

impl ChannelMergeQueue {
    pub fn new(sender: mpsc::Sender<MergeJob>) -> Self {
        Self { sender }
    }
}

impl MergeQueuePort for ChannelMergeQueue {
    fn enqueue(&self, job: MergeJob) -> Result<(), JobError> {
        let merge_id = job.id;
        self.sender.try_send(job).map_err(|e| {
            tracing::warn!(merge_id = %merge_id, error = %e, "Failed to enqueue merge job");
            match e {
                mpsc::error::TrySendError::Full(_) => JobError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => JobError::QueueClosed,
            }
        })
    }
}
