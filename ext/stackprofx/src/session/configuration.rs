use std::fmt;
use std::str::FromStr;

use crate::error::{ProfilerError, Result};

pub const DEFAULT_MODE: Mode = Mode::Wall;
/// Timer interval in microseconds for the wall and cpu modes.
pub const DEFAULT_TIMER_INTERVAL: u64 = 1000;
/// Allocations per sample in object mode.
pub const DEFAULT_OBJECT_INTERVAL: u64 = 1;
pub const DEFAULT_CUSTOM_INTERVAL: u64 = 1;
pub const DEFAULT_MAX_DEPTH: usize = 2048;
#[cfg(target_os = "linux")]
pub const DEFAULT_SCHEDULER: SchedulerKind = SchedulerKind::Signal;
#[cfg(not(target_os = "linux"))]
pub const DEFAULT_SCHEDULER: SchedulerKind = SchedulerKind::TimerThread;

#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    pub mode: Mode,
    /// Microseconds for wall/cpu, allocation count for object.
    pub interval: u64,
    pub raw: bool,
    pub scheduler: SchedulerKind,
    pub max_depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Wall,
    Cpu,
    Object,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerKind {
    Signal,
    TimerThread,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(DEFAULT_MODE)
    }
}

impl Configuration {
    pub fn new(mode: Mode) -> Self {
        Configuration {
            mode,
            interval: mode.default_interval(),
            raw: false,
            scheduler: DEFAULT_SCHEDULER,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn scheduler(mut self, scheduler: SchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builds a configuration from string options, e.g. `[("mode", "object"), ("interval", "10")]`.
    ///
    /// Unknown modes and schedulers are rejected. Malformed numbers fall back to the
    /// mode's default with a warning. Unrecognized keys are ignored.
    pub fn from_options<'a, I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut mode = None;
        let mut interval = None;
        let mut raw = None;
        let mut scheduler = None;
        let mut max_depth = None;
        for (key, value) in options {
            match key {
                "mode" => mode = Some(value),
                "interval" => interval = Some(value),
                "raw" => raw = Some(value),
                "scheduler" => scheduler = Some(value),
                "max_depth" => max_depth = Some(value),
                _ => log::warn!("Ignoring unknown option '{}'", key),
            }
        }

        let mode = Self::parse_option_mode(mode)?;
        Ok(Configuration {
            mode,
            interval: Self::parse_option_interval(interval, mode),
            raw: Self::parse_option_raw(raw),
            scheduler: Self::parse_option_scheduler(scheduler)?,
            max_depth: Self::parse_option_max_depth(max_depth),
        })
    }

    fn parse_option_mode(value: Option<&str>) -> Result<Mode> {
        match value {
            None => Ok(DEFAULT_MODE),
            Some(value) => Mode::from_str(value),
        }
    }

    fn parse_option_interval(value: Option<&str>, mode: Mode) -> u64 {
        let Some(value) = value else {
            return mode.default_interval();
        };
        match value.parse::<u64>() {
            Ok(interval) if interval > 0 => interval,
            _ => {
                log::warn!(
                    "Specified interval ({}) is not valid. Using default value ({}).",
                    value,
                    mode.default_interval()
                );
                mode.default_interval()
            }
        }
    }

    fn parse_option_raw(value: Option<&str>) -> bool {
        matches!(value, Some("true") | Some("1") | Some("yes"))
    }

    fn parse_option_scheduler(value: Option<&str>) -> Result<SchedulerKind> {
        match value {
            None => Ok(DEFAULT_SCHEDULER),
            Some(value) => SchedulerKind::from_str(value),
        }
    }

    fn parse_option_max_depth(value: Option<&str>) -> usize {
        let Some(value) = value else {
            return DEFAULT_MAX_DEPTH;
        };
        match value.parse::<usize>() {
            Ok(depth) if depth > 0 => depth,
            _ => {
                log::warn!(
                    "Specified max_depth ({}) is not valid. Using default value ({}).",
                    value,
                    DEFAULT_MAX_DEPTH
                );
                DEFAULT_MAX_DEPTH
            }
        }
    }

    /// Checks that the interval is usable and that the selected scheduler can drive the
    /// selected mode.
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(ProfilerError::ZeroInterval);
        }
        if self.mode == Mode::Cpu && self.scheduler == SchedulerKind::TimerThread {
            return Err(ProfilerError::UnsupportedMode {
                scheduler: self.scheduler,
                mode: self.mode,
            });
        }
        Ok(())
    }
}

impl Mode {
    pub fn default_interval(self) -> u64 {
        match self {
            Mode::Wall | Mode::Cpu => DEFAULT_TIMER_INTERVAL,
            Mode::Object => DEFAULT_OBJECT_INTERVAL,
            Mode::Custom => DEFAULT_CUSTOM_INTERVAL,
        }
    }

    /// Whether samples in this mode are driven by an OS timer.
    pub fn is_timed(self) -> bool {
        matches!(self, Mode::Wall | Mode::Cpu)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Wall => "wall",
            Mode::Cpu => "cpu",
            Mode::Object => "object",
            Mode::Custom => "custom",
        }
    }
}

impl FromStr for Mode {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches(':') {
            "wall" => Ok(Self::Wall),
            "cpu" => Ok(Self::Cpu),
            "object" => Ok(Self::Object),
            "custom" => Ok(Self::Custom),
            _ => Err(ProfilerError::UnknownMode(s.to_owned())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulerKind {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches(':') {
            "signal" => Ok(Self::Signal),
            "timer_thread" => Ok(Self::TimerThread),
            _ => Err(ProfilerError::UnknownScheduler(s.to_owned())),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerKind::Signal => f.write_str("signal"),
            SchedulerKind::TimerThread => f.write_str("timer_thread"),
        }
    }
}
