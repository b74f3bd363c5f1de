use std::sync::Arc;

use chrono::Utc;
use shop_blob::{AssetLocator, AssetUploader, ObjectStore, UploadBatchResult, UploadCoordinator};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    CatalogCommitter, CatalogRecord, CatalogStore, InsertAck, PipelineEvent, PipelinePhase,
    PipelineSettings, ProductDraft, RecordBuilder,
};

const EVENT_CAPACITY: usize = 64;

/// How one submission ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Record is in the catalog; the draft was cleared
    Committed { record: CatalogRecord, ack: InsertAck },

    /// At least one asset upload failed; nothing was built or committed
    UploadFailed { reason: String, failure_count: usize },

    /// Uploads succeeded but the record never reached the catalog
    CommitFailed {
        reason: String,
        orphaned: Vec<AssetLocator>,
    },

    /// Uploads succeeded but a field could not be turned into a record
    Invalid {
        field: &'static str,
        reason: String,
        orphaned: Vec<AssetLocator>,
    },
}

impl SubmissionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// Uploaded assets no record refers to
    pub fn orphaned(&self) -> &[AssetLocator] {
        match self {
            Self::CommitFailed { orphaned, .. } | Self::Invalid { orphaned, .. } => orphaned,
            Self::Committed { .. } | Self::UploadFailed { .. } => &[],
        }
    }

    /// Phase the pipeline settled in
    pub fn phase(&self) -> PipelinePhase {
        match self {
            Self::Committed { .. } => PipelinePhase::Done,
            _ => PipelinePhase::Failed,
        }
    }
}

/// Runs a draft through upload, build and commit.
///
/// The record is only committed once every asset uploaded. `submit` takes
/// `&mut self`, so a controller runs one submission at a time.
pub struct PipelineController {
    coordinator: UploadCoordinator,
    committer: CatalogCommitter,
    phase: PipelinePhase,
    /// Submission the current phase belongs to
    submission_id: Option<String>,
    events: broadcast::Sender<PipelineEvent>,
}

impl PipelineController {
    pub fn new(coordinator: UploadCoordinator, committer: CatalogCommitter) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            coordinator,
            committer,
            phase: PipelinePhase::Idle,
            submission_id: None,
            events,
        }
    }

    /// Wire a controller over shared backends
    pub fn from_settings(
        objects: Arc<dyn ObjectStore>,
        catalog: Arc<dyn CatalogStore>,
        settings: &PipelineSettings,
    ) -> Self {
        let uploader = AssetUploader::from_shared(objects, settings.upload.clone());
        let committer = CatalogCommitter::from_shared(catalog)
            .with_collection(settings.collection.clone())
            .with_timeout(settings.commit_timeout);
        Self::new(UploadCoordinator::new(uploader), committer)
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    #[instrument(skip_all, fields(submission_id, assets = draft.assets.len()))]
    pub async fn submit(&mut self, draft: &mut ProductDraft) -> SubmissionOutcome {
        let submission_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("submission_id", submission_id.as_str());

        // A dropped submit future leaves its submission mid-flight.
        if self.phase.is_busy() {
            let interrupted = self.submission_id.clone().unwrap_or_default();
            warn!(%interrupted, phase = %self.phase, "previous submission was interrupted");
            self.transition(&interrupted, PipelinePhase::Failed);
        }
        if self.phase.is_terminal() {
            self.transition(&submission_id, PipelinePhase::Idle);
        }
        self.submission_id = Some(submission_id.clone());
        self.transition(&submission_id, PipelinePhase::Uploading);

        let locators = match self.coordinator.upload_batch(&draft.assets).await {
            UploadBatchResult::Success(locators) => locators,
            UploadBatchResult::Failure(failure) => {
                warn!(
                    failure_count = failure.failure_count,
                    "submission failed while uploading assets"
                );
                self.transition(&submission_id, PipelinePhase::Failed);
                return SubmissionOutcome::UploadFailed {
                    reason: failure.to_string(),
                    failure_count: failure.failure_count,
                };
            }
        };

        let record = match RecordBuilder::build(&draft.fields, locators.clone()) {
            Ok(record) => record,
            Err(invalid) => {
                error!(
                    field = invalid.field,
                    orphaned = ?locators,
                    "record rejected after upload; assets remain in storage"
                );
                self.transition(&submission_id, PipelinePhase::Failed);
                return SubmissionOutcome::Invalid {
                    field: invalid.field,
                    reason: invalid.to_string(),
                    orphaned: locators,
                };
            }
        };

        self.transition(&submission_id, PipelinePhase::Committing);
        match self.committer.commit(&record).await {
            Ok(ack) => {
                draft.clear();
                info!(record_id = %record.id, images = record.images.len(), "submission committed");
                self.transition(&submission_id, PipelinePhase::Done);
                SubmissionOutcome::Committed { record, ack }
            }
            Err(err) => {
                error!(
                    record_id = %record.id,
                    error = %err,
                    orphaned = ?locators,
                    "commit failed; uploaded assets remain in storage"
                );
                self.transition(&submission_id, PipelinePhase::Failed);
                SubmissionOutcome::CommitFailed {
                    reason: err.to_string(),
                    orphaned: locators,
                }
            }
        }
    }

    fn transition(&mut self, submission_id: &str, to: PipelinePhase) {
        let from = self.phase;
        debug_assert!(from.can_transition_to(to), "illegal move {from} -> {to}");
        self.phase = to;
        debug!(%from, %to, "phase changed");

        // No subscribers is fine.
        let _ = self.events.send(PipelineEvent::PhaseChanged {
            submission_id: submission_id.to_string(),
            from,
            to,
            at: Utc::now(),
        });
    }
}
