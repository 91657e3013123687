extern crate serde;
#[macro_use]
extern crate serde_derive;

mod aggregator;
mod error;
mod init;
mod location;
mod mailbox;
mod profile;
mod profile_serializer;
pub mod raw_trace;
mod registry;
mod runtime;
mod sample;
mod scheduler;
mod session;
#[cfg(target_os = "linux")]
mod signal_scheduler;
#[cfg(not(target_os = "linux"))]
#[path = "signal_scheduler_unsupported_platform.rs"]
mod signal_scheduler;
mod timer_thread_scheduler;
mod trigger;

#[cfg(test)]
mod test_support;

pub use error::{ProfilerError, Result};
pub use location::{CodeLocation, Scope};
pub use profile::{Profile, PROFILE_VERSION};
pub use profile_serializer::ProfileSerializer;
pub use registry::{Frame, FrameId, LineStats};
pub use runtime::{Runtime, StackFrame};
pub use session::configuration::{Configuration, Mode, SchedulerKind};
pub use session::profiler::{Profiler, Run};
