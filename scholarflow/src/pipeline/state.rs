//! Run state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four stages of the outreach workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Extract the professor's profile.
    ExtractInfo,
    /// Judge topical fit and find contact details.
    Classify,
    /// Check funding and recruiting status.
    Funding,
    /// Draft the outreach email.
    WriteEmail,
}

impl StageId {
    /// Fixed execution order.
    pub const ORDER: [Self; 4] = [Self::ExtractInfo, Self::Classify, Self::Funding, Self::WriteEmail];

    /// Returns the stage that follows this one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::ExtractInfo => Some(Self::Classify),
            Self::Classify => Some(Self::Funding),
            Self::Funding => Some(Self::WriteEmail),
            Self::WriteEmail => None,
        }
    }

    /// Returns the stage that precedes this one.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::ExtractInfo => None,
            Self::Classify => Some(Self::ExtractInfo),
            Self::Funding => Some(Self::Classify),
            Self::WriteEmail => Some(Self::Funding),
        }
    }

    /// Position in [`Self::ORDER`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::ExtractInfo => 0,
            Self::Classify => 1,
            Self::Funding => 2,
            Self::WriteEmail => 3,
        }
    }

    /// Fields projected from the previous stage's result into this stage.
    #[must_use]
    pub const fn projection(self) -> &'static [&'static str] {
        match self {
            Self::ExtractInfo | Self::Classify => &[],
            Self::Funding => &["webpage"],
            Self::WriteEmail => &["email"],
        }
    }

    /// Snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtractInfo => "extract_info",
            Self::Classify => "classify",
            Self::Funding => "funding",
            Self::WriteEmail => "write_email",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    /// Not started.
    Init,
    /// Executing a stage.
    Running {
        /// The active stage.
        stage: StageId,
    },
    /// All stages succeeded.
    Done,
    /// A stage failed; absorbing.
    Failed {
        /// Name of the failed stage.
        stage: String,
        /// Error description.
        cause: String,
    },
}

impl PipelineState {
    /// Returns the state after the current step succeeds.
    ///
    /// Terminal states are returned unchanged.
    #[must_use]
    pub fn advance(&self) -> Self {
        match self {
            Self::Init => Self::Running {
                stage: StageId::ExtractInfo,
            },
            Self::Running { stage } => stage
                .next()
                .map_or(Self::Done, |stage| Self::Running { stage }),
            Self::Done | Self::Failed { .. } => self.clone(),
        }
    }

    /// Returns the state after the current step fails.
    ///
    /// Terminal states are returned unchanged.
    #[must_use]
    pub fn fail(&self, stage: impl Into<String>, cause: impl Into<String>) -> Self {
        if self.is_terminal() {
            return self.clone();
        }
        Self::Failed {
            stage: stage.into(),
            cause: cause.into(),
        }
    }

    /// Returns true for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Returns the active stage, if running.
    #[must_use]
    pub const fn running_stage(&self) -> Option<StageId> {
        match self {
            Self::Running { stage } => Some(*stage),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Running { stage } => write!(f, "running({stage})"),
            Self::Done => f.write_str("done"),
            Self::Failed { stage, .. } => write!(f, "failed({stage})"),
        }
    }
}

/// One observed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// State before.
    pub from: PipelineState,
    /// State after.
    pub to: PipelineState,
}
