pub mod configuration;
pub mod profiler;

use std::mem;
use std::sync::Arc;

use self::configuration::Configuration;
use crate::aggregator::Aggregator;
use crate::error::Result;
use crate::profile::{Profile, PROFILE_VERSION};
use crate::runtime::Runtime;
use crate::sample::{Sample, SampleKind};
use crate::scheduler::{self, Scheduler};
use crate::trigger::Trigger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
}

/// Lifecycle and live statistics of one profiling run.
pub struct Session {
    configuration: Configuration,
    state: State,
    scheduler: Option<Box<dyn Scheduler>>,
    aggregator: Aggregator,
    samples: u64,
    results: Option<Profile>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            configuration: Configuration::default(),
            state: State::Idle,
            scheduler: None,
            aggregator: Aggregator::new(false),
            samples: 0,
            results: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Returns `Ok(false)` without touching anything if already running.
    pub fn start(&mut self, configuration: Configuration, trigger: &Arc<Trigger>) -> Result<bool> {
        if self.state == State::Running {
            return Ok(false);
        }

        let mut scheduler = scheduler::for_configuration(&configuration, trigger)?;

        self.results = None;
        self.aggregator = Aggregator::new(configuration.raw);
        self.samples = 0;

        trigger.arm(configuration.mode, configuration.interval);
        if let Some(scheduler) = scheduler.as_mut() {
            if let Err(err) = scheduler.start() {
                trigger.disarm();
                return Err(err);
            }
        }

        log::debug!(
            "Session started (mode: {}, interval: {}, raw: {})",
            configuration.mode,
            configuration.interval,
            configuration.raw
        );
        self.scheduler = scheduler;
        self.configuration = configuration;
        self.state = State::Running;
        Ok(true)
    }

    /// Returns `false` if not running.
    pub fn stop(&mut self, trigger: &Trigger) -> bool {
        if self.state == State::Idle {
            return false;
        }

        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
        trigger.disarm();

        let aggregator = mem::replace(&mut self.aggregator, Aggregator::new(false));
        let (frames, raw) = aggregator.finish();
        let profile = Profile {
            version: PROFILE_VERSION,
            mode: self.configuration.mode,
            interval: self.configuration.interval,
            samples: self.samples,
            gc_samples: trigger.gc_samples(),
            missed_samples: trigger.missed_samples(),
            frames,
            raw,
        };
        log::debug!(
            "Session stopped (samples: {}, gc_samples: {}, missed_samples: {})",
            profile.samples,
            profile.gc_samples,
            profile.missed_samples
        );

        self.results = Some(profile);
        self.state = State::Idle;
        true
    }

    /// Captures and aggregates one sample. Must only run at a safe point.
    pub fn process(&mut self, runtime: &dyn Runtime, trigger: &Trigger) {
        if self.state != State::Running {
            return;
        }

        let sample = Sample::capture(runtime, self.configuration.max_depth, trigger.in_gc());
        match sample.kind {
            SampleKind::Gc => trigger.record_gc_sample(),
            SampleKind::Normal => {
                self.aggregator.fold(&sample);
                self.samples += 1;
            }
        }
    }

    pub fn take_results(&mut self) -> Option<Profile> {
        self.results.take()
    }

    pub fn store_results(&mut self, profile: Profile) {
        self.results = Some(profile);
    }

    pub fn rearm_after_fork(&mut self) -> Result<()> {
        if self.state != State::Running {
            return Ok(());
        }
        match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.rearm_after_fork(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::configuration::{Mode, SchedulerKind};
    use super::*;
    use crate::test_support::ScriptedRuntime;

    fn fixture() -> (Arc<ScriptedRuntime>, Arc<Trigger>, Session) {
        let runtime = Arc::new(ScriptedRuntime::new());
        let trigger = Arc::new(Trigger::new(Arc::clone(&runtime) as Arc<dyn Runtime>));
        (runtime, trigger, Session::new())
    }

    #[test]
    fn test_lifecycle() {
        let (_runtime, trigger, mut session) = fixture();
        assert_eq!(session.state(), State::Idle);
        assert!(!session.stop(&trigger));

        assert!(session.start(Configuration::new(Mode::Custom), &trigger).unwrap());
        assert_eq!(session.state(), State::Running);
        assert!(trigger.is_armed());
        assert!(!session.start(Configuration::new(Mode::Object), &trigger).unwrap());
        assert_eq!(session.configuration().mode, Mode::Custom);

        assert!(session.stop(&trigger));
        assert!(!trigger.is_armed());
        let profile = session.take_results().unwrap();
        assert_eq!(profile.mode, Mode::Custom);
        assert_eq!(profile.interval, 1);
        assert!(session.take_results().is_none());
    }

    #[test]
    fn test_process_counts_normal_and_gc_samples() {
        let (runtime, trigger, mut session) = fixture();
        let main = runtime.method("<main>", "main.rb", 1);
        runtime.enter(&main, 4);

        session.start(Configuration::new(Mode::Custom), &trigger).unwrap();
        session.process(runtime.as_ref(), &trigger);
        trigger.set_in_gc(true);
        session.process(runtime.as_ref(), &trigger);
        trigger.set_in_gc(false);
        session.process(runtime.as_ref(), &trigger);
        session.stop(&trigger);

        let profile = session.take_results().unwrap();
        assert_eq!(profile.samples, 2);
        assert_eq!(profile.gc_samples, 1);
        assert_eq!(profile.frames.len(), 1);
    }

    #[test]
    fn test_process_while_idle_is_ignored() {
        let (runtime, trigger, mut session) = fixture();
        session.process(runtime.as_ref(), &trigger);
        assert_eq!(runtime.walks(), 0);
    }

    #[test]
    fn test_start_clears_unretrieved_results() {
        let (_runtime, trigger, mut session) = fixture();
        session.start(Configuration::new(Mode::Custom), &trigger).unwrap();
        session.stop(&trigger);
        session.start(Configuration::new(Mode::Custom), &trigger).unwrap();
        assert!(session.take_results().is_none());
        session.stop(&trigger);
        assert!(session.take_results().is_some());
    }

    #[test]
    fn test_invalid_scheduler_pair_never_starts() {
        let (_runtime, trigger, mut session) = fixture();
        let configuration = Configuration::new(Mode::Cpu).scheduler(SchedulerKind::TimerThread);
        assert!(session.start(configuration, &trigger).is_err());
        assert_eq!(session.state(), State::Idle);
        assert!(!trigger.is_armed());
    }

    #[test]
    fn test_zero_interval_never_starts() {
        let (_runtime, trigger, mut session) = fixture();
        for configuration in [
            Configuration::new(Mode::Wall).interval(0).scheduler(SchedulerKind::TimerThread),
            Configuration::new(Mode::Object).interval(0),
        ] {
            assert!(matches!(
                session.start(configuration, &trigger),
                Err(crate::error::ProfilerError::ZeroInterval)
            ));
            assert_eq!(session.state(), State::Idle);
            assert!(!trigger.is_armed());
        }
    }
}
