//! Errors raised while driving the owner sync schedule.
//!
//! Owner sync outcomes never surface here; they are recorded on each owner
//! as an `OwnerErrorState`. These errors only cover the cron lifecycle.

use opcal_domain::OpCalError;
use thiserror::Error;

use crate::errors::InfraError;

/// Lifecycle step of the cron engine that an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Create,
    Register,
    Start,
    Stop,
    Join,
}

impl SchedulerPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Register => "register",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Join => "join",
        }
    }
}

impl std::fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("owner sync is already scheduled")]
    AlreadyRunning,

    #[error("owner sync is not scheduled")]
    NotRunning,

    /// `sync.cron_expression` could not be parsed.
    #[error("invalid sync schedule `{expression}`: {reason}")]
    InvalidSchedule { expression: String, reason: String },

    /// The cron engine failed during `phase`.
    #[error("owner sync scheduler failed to {phase}: {reason}")]
    Engine { phase: SchedulerPhase, reason: String },

    #[error("owner sync scheduler {phase} timed out after {seconds}s")]
    Timeout { phase: SchedulerPhase, seconds: u64 },
}

impl SchedulerError {
    pub(crate) fn engine(phase: SchedulerPhase, err: impl std::fmt::Display) -> Self {
        Self::Engine { phase, reason: err.to_string() }
    }
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let opcal_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                OpCalError::InvalidInput(err.to_string())
            }
            SchedulerError::InvalidSchedule { .. } => OpCalError::Config(err.to_string()),
            SchedulerError::Engine { .. } | SchedulerError::Timeout { .. } => {
                OpCalError::Internal(err.to_string())
            }
        };
        InfraError(opcal_err)
    }
}

impl From<SchedulerError> for OpCalError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
