use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::{
    AssetLocator, AssetPayload, AssetUploader, BatchFailure, UploadResult, UploadTask,
};

/// Outcome of one batch: every locator, or one aggregated failure
#[derive(Debug)]
pub enum UploadBatchResult {
    /// Locators in submission order
    Success(Vec<AssetLocator>),
    Failure(BatchFailure),
}

impl UploadBatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<Vec<AssetLocator>, BatchFailure> {
        match self {
            Self::Success(locators) => Ok(locators),
            Self::Failure(failure) => Err(failure),
        }
    }
}

/// Fans a batch of payloads out to concurrent uploads and joins them once.
///
/// Every task settles before the batch returns, so a failure never cancels
/// siblings that are still writing. Results are slotted by task index, not
/// by completion order.
#[derive(Clone)]
pub struct UploadCoordinator {
    uploader: Arc<AssetUploader>,
}

impl UploadCoordinator {
    pub fn new(uploader: AssetUploader) -> Self {
        Self {
            uploader: Arc::new(uploader),
        }
    }

    pub fn uploader(&self) -> &AssetUploader {
        &self.uploader
    }

    #[instrument(skip_all, fields(batch_size = payloads.len()))]
    pub async fn upload_batch(&self, payloads: &[AssetPayload]) -> UploadBatchResult {
        if payloads.is_empty() {
            debug!("empty batch, nothing to upload");
            return UploadBatchResult::Success(Vec::new());
        }

        let tasks: Vec<UploadTask> = payloads
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, payload)| UploadTask::new(index, payload))
            .collect();

        let runs = tasks.iter().map(|task| self.run(task));
        let settled = match self.uploader.config().max_in_flight {
            // `buffered` yields in input order, so slots stay index-aligned.
            Some(limit) => stream::iter(runs).buffered(limit).collect::<Vec<_>>().await,
            None => join_all(runs).await,
        };

        let result = Self::aggregate(settled);
        match &result {
            UploadBatchResult::Success(locators) => {
                info!(uploaded = locators.len(), "batch uploaded");
            }
            UploadBatchResult::Failure(failure) => {
                warn!(
                    failure_count = failure.failure_count,
                    first_index = failure.index,
                    error = %failure.first,
                    "batch failed"
                );
                if !failure.discarded.is_empty() {
                    warn!(
                        orphaned = ?failure.discarded,
                        "discarding locators of successful uploads; assets remain in storage"
                    );
                }
            }
        }
        result
    }

    async fn run(&self, task: &UploadTask) -> UploadResult<AssetLocator> {
        let outcome = self.uploader.upload(&task.id, &task.payload).await;
        if let Err(err) = &outcome {
            debug!(index = task.index, id = %task.id, error = %err, "upload task failed");
        }
        outcome
    }

    /// Fold index-ordered task results into a batch result
    fn aggregate(settled: Vec<UploadResult<AssetLocator>>) -> UploadBatchResult {
        let batch_size = settled.len();
        let mut locators = Vec::with_capacity(batch_size);
        let mut first = None;
        let mut failure_count = 0;

        for (index, outcome) in settled.into_iter().enumerate() {
            match outcome {
                Ok(locator) => locators.push(locator),
                Err(err) => {
                    failure_count += 1;
                    if first.is_none() {
                        first = Some((index, err));
                    }
                }
            }
        }

        match first {
            None => UploadBatchResult::Success(locators),
            Some((index, first)) => UploadBatchResult::Failure(BatchFailure {
                index,
                first,
                failure_count,
                batch_size,
                discarded: locators,
            }),
        }
    }
}
