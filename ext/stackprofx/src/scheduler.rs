use std::sync::Arc;

use crate::error::Result;
use crate::session::configuration::{Configuration, SchedulerKind};
use crate::signal_scheduler::SignalScheduler;
use crate::timer_thread_scheduler::TimerThreadScheduler;
use crate::trigger::Trigger;

/// An OS-level source of periodic triggers.
pub trait Scheduler: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    /// Re-creates timers that did not survive fork(2). Only meaningful in the child.
    fn rearm_after_fork(&mut self) -> Result<()>;
}

/// Returns the scheduler driving `configuration.mode`, or `None` for modes
/// triggered by the host (object, custom).
pub fn for_configuration(
    configuration: &Configuration,
    trigger: &Arc<Trigger>,
) -> Result<Option<Box<dyn Scheduler>>> {
    configuration.validate()?;
    if !configuration.mode.is_timed() {
        return Ok(None);
    }

    let scheduler: Box<dyn Scheduler> = match configuration.scheduler {
        SchedulerKind::Signal => Box::new(SignalScheduler::new(configuration, Arc::clone(trigger))),
        SchedulerKind::TimerThread => {
            Box::new(TimerThreadScheduler::new(configuration, Arc::clone(trigger)))
        }
    };
    Ok(Some(scheduler))
}
