use std::sync::Arc;

use crate::error::{ProfilerError, Result};
use crate::scheduler::Scheduler;
use crate::session::configuration::Configuration;
use crate::trigger::Trigger;

pub struct SignalScheduler {}

impl Scheduler for SignalScheduler {
    fn start(&mut self) -> Result<()> {
        Err(ProfilerError::Unsupported)
    }

    fn stop(&mut self) {}

    fn rearm_after_fork(&mut self) -> Result<()> {
        Err(ProfilerError::Unsupported)
    }
}

impl SignalScheduler {
    pub fn new(_configuration: &Configuration, _trigger: Arc<Trigger>) -> Self {
        SignalScheduler {}
    }
}
