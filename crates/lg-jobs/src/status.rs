// SPDX-License-Identifier: MIT OR Apache-2.0
//! Job lifecycle status and its valid transition graph.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an asynchronous lint job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled by the caller or by shutdown.
    Cancelled,
}

impl JobStatus {
    /// Returns `true` if this status represents a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns the set of statuses that are valid successors of `self`.
    pub fn valid_transitions(&self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[Self::Running, Self::Cancelled],
            Self::Running => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    /// Returns `true` if transitioning from `self` to `next` is valid.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl From<lg_store::JobStatus> for JobStatus {
    fn from(status: lg_store::JobStatus) -> Self {
        match status {
            lg_store::JobStatus::Pending => Self::Pending,
            lg_store::JobStatus::Running => Self::Running,
            lg_store::JobStatus::Completed => Self::Completed,
            lg_store::JobStatus::Failed => Self::Failed,
            lg_store::JobStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<JobStatus> for lg_store::JobStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => Self::Pending,
            JobStatus::Running => Self::Running,
            JobStatus::Completed => Self::Completed,
            JobStatus::Failed => Self::Failed,
            JobStatus::Cancelled => Self::Cancelled,
        }
    }
}
