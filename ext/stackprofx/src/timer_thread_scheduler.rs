use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::session::configuration::Configuration;
use crate::trigger::Trigger;

/// Fires the trigger from a background thread every `interval` of wall time.
pub struct TimerThreadScheduler {
    interval: Duration,
    trigger: Arc<Trigger>,
    stop_requested: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Scheduler for TimerThreadScheduler {
    fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        self.spawn();
        log::debug!("Timer thread started (interval: {:?})", self.interval);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                log::debug!("Timer thread panicked");
            }
        }
        log::debug!("Timer thread stopped");
    }

    fn rearm_after_fork(&mut self) -> Result<()> {
        // The thread behind this handle only exists in the parent
        if let Some(thread) = self.thread.take() {
            mem::forget(thread);
        }
        self.spawn();
        log::debug!("Timer thread restarted after fork");
        Ok(())
    }
}

impl TimerThreadScheduler {
    pub fn new(configuration: &Configuration, trigger: Arc<Trigger>) -> Self {
        Self {
            interval: Duration::from_micros(configuration.interval),
            trigger,
            stop_requested: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    fn spawn(&mut self) {
        self.stop_requested = Arc::new(AtomicBool::new(false));
        let interval = self.interval;
        let trigger = Arc::clone(&self.trigger);
        let stop_requested = Arc::clone(&self.stop_requested);
        self.thread = Some(thread::spawn(move || {
            Self::thread_main_loop(interval, trigger, stop_requested)
        }));
    }

    fn thread_main_loop(interval: Duration, trigger: Arc<Trigger>, stop_requested: Arc<AtomicBool>) {
        let mut deadline = Instant::now() + interval;
        loop {
            if stop_requested.load(Ordering::Acquire) {
                break;
            }
            let now = Instant::now();
            if now < deadline {
                thread::park_timeout(deadline - now);
                continue;
            }

            log::trace!("Triggering capture request");
            trigger.fire();

            deadline += interval;
            if deadline < now {
                // Fell behind (e.g. the process was suspended); don't burst to catch up
                deadline = now + interval;
            }
        }
    }
}
