use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;

use super::configuration::{Configuration, Mode};
use super::Session;
use crate::error::{ProfilerError, Result};
use crate::profile::Profile;
use crate::profile_serializer::ProfileSerializer;
use crate::runtime::Runtime;
use crate::trigger::Trigger;

/// The embedding application's handle to the profiler.
///
/// One handle owns one session; at most one session per handle is running at a time.
/// The host drives sampling by calling [`safe_point`](Self::safe_point) whenever its VM is
/// in a consistent state, and reports allocations and GC pauses through
/// [`on_allocation`](Self::on_allocation) and [`on_gc_start`](Self::on_gc_start).
pub struct Profiler {
    runtime: Arc<dyn Runtime>,
    trigger: Arc<Trigger>,
    session: Mutex<Session>,
}

/// Outcome of [`Profiler::run`] and [`Profiler::run_to`].
#[derive(Debug)]
pub enum Run<T, O = Profile> {
    /// The block ran inside a fresh session. `output` is the profile, or the sink it was written to.
    Finished { value: T, output: O },
    /// A session was already running; the block ran inside it and nothing was collected for it.
    Nested(T),
}

impl<T, O> Run<T, O> {
    pub fn value(&self) -> &T {
        match self {
            Run::Finished { value, .. } => value,
            Run::Nested(value) => value,
        }
    }

    pub fn into_output(self) -> Option<O> {
        match self {
            Run::Finished { output, .. } => Some(output),
            Run::Nested(_) => None,
        }
    }
}

// Stops the session if the profiled block unwinds.
struct StopOnUnwind<'a> {
    profiler: &'a Profiler,
}

impl Drop for StopOnUnwind<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.profiler.stop();
        }
    }
}

impl Profiler {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        crate::init::init();
        Profiler {
            trigger: Arc::new(Trigger::new(Arc::clone(&runtime))),
            runtime,
            session: Mutex::new(Session::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a session. Returns `Ok(false)` if one is already running.
    pub fn start(&self, configuration: Configuration) -> Result<bool> {
        self.lock().start(configuration, &self.trigger)
    }

    /// Stops the running session and freezes its profile. Returns `false` if idle.
    pub fn stop(&self) -> bool {
        self.lock().stop(&self.trigger)
    }

    /// Lock-free, so it is also usable in a forked child.
    pub fn running(&self) -> bool {
        self.trigger.is_armed()
    }

    /// Returns the last frozen profile, once.
    pub fn results(&self) -> Option<Profile> {
        self.lock().take_results()
    }

    /// Profiles `block` and returns the resulting profile.
    ///
    /// If a session is already running, `block` simply runs inside it.
    pub fn run<T, F>(&self, configuration: Configuration, block: F) -> Result<Run<T>>
    where
        F: FnOnce() -> T,
    {
        if !self.start(configuration)? {
            return Ok(Run::Nested(block()));
        }
        let value = {
            let _guard = StopOnUnwind { profiler: self };
            block()
        };
        let profile = self.finish()?;
        Ok(Run::Finished {
            value,
            output: profile,
        })
    }

    /// Like [`run`](Self::run), but writes the profile to `sink` and hands the sink back.
    /// The profile stays retrievable once through [`results`](Self::results).
    pub fn run_to<W, T, F>(&self, configuration: Configuration, mut sink: W, block: F) -> Result<Run<T, W>>
    where
        W: Write,
        F: FnOnce() -> T,
    {
        if !self.start(configuration)? {
            return Ok(Run::Nested(block()));
        }
        let value = {
            let _guard = StopOnUnwind { profiler: self };
            block()
        };
        let profile = self.finish()?;
        let written = ProfileSerializer::write(&profile, &mut sink);
        self.lock().store_results(profile);
        written?;
        Ok(Run::Finished {
            value,
            output: sink,
        })
    }

    fn finish(&self) -> Result<Profile> {
        let mut session = self.lock();
        session.stop(&self.trigger);
        session.take_results().ok_or(ProfilerError::MissingResults)
    }

    /// Takes one sample right now. Only valid in custom mode.
    ///
    /// Returns `Ok(false)` when no session is running.
    pub fn sample(&self) -> Result<bool> {
        if !self.running() {
            return Ok(false);
        }
        let mode = self.trigger.mode();
        if mode != Mode::Custom {
            return Err(ProfilerError::NotCustomMode(mode));
        }
        self.trigger.fire();
        // The caller is running ordinary code, which is a safe point by definition
        self.safe_point();
        Ok(true)
    }

    /// Processes the pending capture request, if any. Returns whether one was processed.
    ///
    /// The host must call this only where walking the stack is safe.
    pub fn safe_point(&self) -> bool {
        if !self.trigger.take_request() {
            return false;
        }
        let mut session = match self.session.try_lock() {
            Ok(session) => session,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                log::trace!("Session is busy (start/stop in progress). Dropping sample.");
                self.trigger.record_missed_sample();
                return false;
            }
        };
        session.process(self.runtime.as_ref(), &self.trigger);
        true
    }

    /// Reports one object allocation. Drives object mode.
    pub fn on_allocation(&self) {
        self.trigger.on_allocation();
    }

    pub fn on_gc_start(&self) {
        self.trigger.set_in_gc(true);
    }

    pub fn on_gc_end(&self) {
        self.trigger.set_in_gc(false);
    }

    /// Re-arms OS timers in a forked child.
    ///
    /// A child inherits the running flag but not the timers. Without this call the child
    /// keeps reporting `running() == true` while receiving no timer triggers.
    pub fn reinit_after_fork(&self) -> Result<()> {
        self.lock().rearm_after_fork()
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        self.stop();
    }
}
