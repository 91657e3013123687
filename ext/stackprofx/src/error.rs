use std::io;

use thiserror::Error;

use crate::session::configuration::{Mode, SchedulerKind};

#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("unknown profiler mode '{0}'. Valid values are 'wall', 'cpu', 'object' and 'custom'.")]
    UnknownMode(String),
    #[error("unknown scheduler '{0}'. Valid values are 'signal' and 'timer_thread'.")]
    UnknownScheduler(String),
    #[error("{scheduler} scheduler does not support {mode} mode")]
    UnsupportedMode { scheduler: SchedulerKind, mode: Mode },
    #[error("interval must be greater than zero")]
    ZeroInterval,
    #[error("signal scheduler is not supported on this platform")]
    Unsupported,
    #[error("another signal timer is already armed in this process")]
    SignalTimerBusy,
    #[error("{call} failed: {source}")]
    Timer {
        call: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("manual sampling is only available in custom mode (current mode: {0})")]
    NotCustomMode(Mode),
    #[error("session finished without producing a profile")]
    MissingResults,
    #[error("failed to serialize profile: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write profile: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ProfilerError>;

impl ProfilerError {
    /// Wraps `errno` of the libc call that just failed.
    pub(crate) fn last_os_error(call: &'static str) -> Self {
        ProfilerError::Timer {
            call,
            source: io::Error::last_os_error(),
        }
    }
}
