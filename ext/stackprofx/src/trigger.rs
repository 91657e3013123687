use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::mailbox::Mailbox;
use crate::runtime::Runtime;
use crate::session::configuration::Mode;

/// State shared between the session and asynchronous trigger sources.
///
/// Everything reachable from [`Trigger::fire`] is lock-free so it can run inside a
/// signal handler. Stack capture never happens here; a trigger only posts a request
/// which [`Profiler::safe_point`](crate::Profiler::safe_point) later drains.
pub struct Trigger {
    runtime: Arc<dyn Runtime>,
    mailbox: Mailbox,
    armed: AtomicBool,
    mode: AtomicU8,
    interval: AtomicU64,
    allocations: AtomicU64,
    in_gc: AtomicBool,
    missed_samples: AtomicU64,
    gc_samples: AtomicU64,
    // Set once a strong reference has been handed to the signal handler slot
    signal_pinned: AtomicBool,
}

/// What happened to a single trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fired {
    Posted,
    /// A request was already pending; counted as missed.
    Coalesced,
    /// The VM was collecting garbage; counted as a GC sample.
    DuringGc,
    Disarmed,
}

impl Trigger {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Trigger {
            runtime,
            mailbox: Mailbox::new(),
            armed: AtomicBool::new(false),
            mode: AtomicU8::new(mode_to_u8(Mode::Wall)),
            interval: AtomicU64::new(1),
            allocations: AtomicU64::new(0),
            in_gc: AtomicBool::new(false),
            missed_samples: AtomicU64::new(0),
            gc_samples: AtomicU64::new(0),
            signal_pinned: AtomicBool::new(false),
        }
    }

    pub fn arm(&self, mode: Mode, interval: u64) {
        self.mailbox.clear();
        self.allocations.store(0, Ordering::Relaxed);
        self.missed_samples.store(0, Ordering::Relaxed);
        self.gc_samples.store(0, Ordering::Relaxed);
        self.mode.store(mode_to_u8(mode), Ordering::Relaxed);
        self.interval.store(interval.max(1), Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
        self.mailbox.clear();
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> Mode {
        mode_from_u8(self.mode.load(Ordering::Relaxed))
    }

    // async-signal-safe, provided Runtime::request_safe_point is
    pub fn fire(&self) -> Fired {
        if !self.is_armed() {
            return Fired::Disarmed;
        }
        if self.in_gc.load(Ordering::Acquire) {
            self.gc_samples.fetch_add(1, Ordering::Relaxed);
            return Fired::DuringGc;
        }
        match self.mailbox.post() {
            Ok(()) => {
                self.runtime.request_safe_point();
                Fired::Posted
            }
            Err(_) => {
                self.missed_samples.fetch_add(1, Ordering::Relaxed);
                Fired::Coalesced
            }
        }
    }

    /// Counts one allocation and fires on every `interval`-th one in object mode.
    pub fn on_allocation(&self) -> Option<Fired> {
        if !self.is_armed() || self.mode() != Mode::Object {
            return None;
        }
        let count = self.allocations.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.interval.load(Ordering::Relaxed) != 0 {
            return None;
        }
        Some(self.fire())
    }

    pub fn set_in_gc(&self, in_gc: bool) {
        self.in_gc.store(in_gc, Ordering::Release);
    }

    pub fn in_gc(&self) -> bool {
        self.in_gc.load(Ordering::Acquire)
    }

    pub fn take_request(&self) -> bool {
        self.mailbox.take()
    }

    pub fn record_gc_sample(&self) {
        self.gc_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missed_sample(&self) {
        self.missed_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn missed_samples(&self) -> u64 {
        self.missed_samples.load(Ordering::Relaxed)
    }

    pub fn gc_samples(&self) -> u64 {
        self.gc_samples.load(Ordering::Relaxed)
    }

    /// Marks this trigger as pinned for signal handlers. Returns whether it already was.
    pub fn pin_for_signals(&self) -> bool {
        self.signal_pinned.swap(true, Ordering::AcqRel)
    }
}

fn mode_to_u8(mode: Mode) -> u8 {
    match mode {
        Mode::Wall => 0,
        Mode::Cpu => 1,
        Mode::Object => 2,
        Mode::Custom => 3,
    }
}

fn mode_from_u8(value: u8) -> Mode {
    match value {
        1 => Mode::Cpu,
        2 => Mode::Object,
        3 => Mode::Custom,
        _ => Mode::Wall,
    }
}
