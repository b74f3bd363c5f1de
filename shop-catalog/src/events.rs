use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a pipeline stands with its current submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Idle,
    Uploading,
    Committing,
    Done,
    Failed,
}

impl PipelinePhase {
    /// Done and Failed end a submission
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// A submission is underway; a progress indicator would be showing
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading | Self::Committing)
    }

    /// Whether `self -> next` is an allowed move
    pub fn can_transition_to(&self, next: PipelinePhase) -> bool {
        use PipelinePhase::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Uploading, Committing)
                | (Uploading, Failed)
                | (Committing, Done)
                | (Committing, Failed)
                | (Done, Idle)
                | (Failed, Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Committing => "committing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published on every phase move of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
    PhaseChanged {
        submission_id: String,
        from: PipelinePhase,
        to: PipelinePhase,
        at: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase_changed",
        }
    }

    pub fn submission_id(&self) -> &str {
        match self {
            Self::PhaseChanged { submission_id, .. } => submission_id,
        }
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::PhaseChanged { at, .. } => at,
        }
    }

    /// Target phase of a phase change
    pub fn phase(&self) -> PipelinePhase {
        match self {
            Self::PhaseChanged { to, .. } => *to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_transitions() {
        use PipelinePhase::*;
        assert!(Idle.can_transition_to(Uploading));
        assert!(Uploading.can_transition_to(Failed));
        assert!(Committing.can_transition_to(Done));
        assert!(Done.can_transition_to(Idle));

        assert!(!Idle.can_transition_to(Committing));
        assert!(!Uploading.can_transition_to(Done));
        assert!(!Done.can_transition_to(Uploading));
    }

    #[test]
    fn busy_and_terminal_phases() {
        assert!(PipelinePhase::Uploading.is_busy());
        assert!(!PipelinePhase::Idle.is_busy());
        assert!(PipelinePhase::Failed.is_terminal());
        assert!(!PipelinePhase::Committing.is_terminal());
    }
}
