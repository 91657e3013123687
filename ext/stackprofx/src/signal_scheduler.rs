#![deny(unsafe_op_in_unsafe_fn)]

use std::ffi::{c_int, c_void};
use std::mem;
use std::ptr::null_mut;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProfilerError, Result};
use crate::scheduler::Scheduler;
use crate::session::configuration::{Configuration, Mode};
use crate::trigger::Trigger;

// Signal dispositions are process-wide, so only one SignalScheduler may own them at a time.
static SIGNAL_TRIGGER: AtomicPtr<Trigger> = AtomicPtr::new(null_mut());

/// Drives the trigger with a POSIX timer delivering SIGALRM (wall) or SIGPROF (cpu).
pub struct SignalScheduler {
    mode: Mode,
    interval: Duration,
    trigger: Arc<Trigger>,
    timer: Option<libc::timer_t>,
}

// timer_t is an opaque handle that may be used from any thread
unsafe impl Send for SignalScheduler {}

impl Scheduler for SignalScheduler {
    fn start(&mut self) -> Result<()> {
        self.claim_signal_trigger()?;
        if let Err(err) = self.install_signal_handler().and_then(|_| self.create_timer()) {
            self.release_signal_trigger();
            return Err(err);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.delete_timer();
        self.ignore_signal();
        self.release_signal_trigger();
    }

    fn rearm_after_fork(&mut self) -> Result<()> {
        // POSIX timers are not inherited by the child; the handler and SIGNAL_TRIGGER are
        self.timer = None;
        self.create_timer()
    }
}

impl SignalScheduler {
    pub fn new(configuration: &Configuration, trigger: Arc<Trigger>) -> Self {
        Self {
            mode: configuration.mode,
            interval: Duration::from_micros(configuration.interval),
            trigger,
            timer: None,
        }
    }

    fn signal(&self) -> c_int {
        match self.mode {
            Mode::Cpu => libc::SIGPROF,
            _ => libc::SIGALRM,
        }
    }

    fn clock(&self) -> libc::clockid_t {
        match self.mode {
            Mode::Cpu => libc::CLOCK_PROCESS_CPUTIME_ID,
            _ => libc::CLOCK_MONOTONIC,
        }
    }

    fn claim_signal_trigger(&self) -> Result<()> {
        let ptr = Arc::as_ptr(&self.trigger) as *mut Trigger;
        SIGNAL_TRIGGER
            .compare_exchange(null_mut(), ptr, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ProfilerError::SignalTimerBusy)?;
        // NOTE: This reference is never dropped. A handler may still be running on another
        // thread after the timer is deleted, so the Trigger must outlive every scheduler.
        // One reference per Trigger is enough however many sessions reuse it.
        if !self.trigger.pin_for_signals() {
            mem::forget(Arc::clone(&self.trigger));
        }
        Ok(())
    }

    fn release_signal_trigger(&self) {
        let ptr = Arc::as_ptr(&self.trigger) as *mut Trigger;
        let _ = SIGNAL_TRIGGER.compare_exchange(ptr, null_mut(), Ordering::AcqRel, Ordering::Acquire);
    }

    // Install signal handler for profiling events to the current process.
    fn install_signal_handler(&self) -> Result<()> {
        let mut sa: libc::sigaction = unsafe { mem::zeroed() };
        sa.sa_sigaction = Self::signal_handler as usize;
        sa.sa_flags = libc::SA_SIGINFO | libc::SA_RESTART;
        unsafe { libc::sigemptyset(&mut sa.sa_mask) };
        let err = unsafe { libc::sigaction(self.signal(), &sa, null_mut()) };
        if err != 0 {
            return Err(ProfilerError::last_os_error("sigaction"));
        }
        log::debug!("Signal handler installed");
        Ok(())
    }

    fn ignore_signal(&self) {
        let mut sa: libc::sigaction = unsafe { mem::zeroed() };
        sa.sa_sigaction = libc::SIG_IGN;
        sa.sa_flags = libc::SA_RESTART;
        unsafe { libc::sigemptyset(&mut sa.sa_mask) };
        if unsafe { libc::sigaction(self.signal(), &sa, null_mut()) } != 0 {
            log::debug!("Failed to reset signal disposition");
        }
    }

    // Respond to the signal by posting a capture request.
    // Touches atomics only; the stack is walked later at a safe point.
    extern "C" fn signal_handler(_sig: c_int, _info: *mut libc::siginfo_t, _ucontext: *mut c_void) {
        let ptr = SIGNAL_TRIGGER.load(Ordering::Acquire);
        if ptr.is_null() {
            return;
        }
        let trigger = unsafe { &*ptr };
        trigger.fire();
    }

    fn create_timer(&mut self) -> Result<()> {
        let mut sigevent: libc::sigevent = unsafe { mem::zeroed() };
        sigevent.sigev_notify = libc::SIGEV_SIGNAL;
        sigevent.sigev_signo = self.signal();

        let mut timer: libc::timer_t = unsafe { mem::zeroed() };
        let err = unsafe { libc::timer_create(self.clock(), &mut sigevent, &mut timer) };
        if err != 0 {
            return Err(ProfilerError::last_os_error("timer_create"));
        }

        let itimerspec = Self::duration_to_itimerspec(&self.interval);
        let err = unsafe { libc::timer_settime(timer, 0, &itimerspec, null_mut()) };
        if err != 0 {
            let error = ProfilerError::last_os_error("timer_settime");
            unsafe { libc::timer_delete(timer) };
            return Err(error);
        }

        self.timer = Some(timer);
        log::debug!("Timer armed ({} mode, interval: {:?})", self.mode, self.interval);
        Ok(())
    }

    fn delete_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            if unsafe { libc::timer_delete(timer) } != 0 {
                log::debug!("timer_delete failed: {}", std::io::Error::last_os_error());
            }
        }
    }

    fn duration_to_itimerspec(duration: &Duration) -> libc::itimerspec {
        let mut its: libc::itimerspec = unsafe { mem::zeroed() };
        its.it_interval.tv_sec = duration.as_secs() as libc::time_t;
        its.it_interval.tv_nsec = duration.subsec_nanos() as libc::c_long;
        its.it_value = its.it_interval;
        its
    }
}
