use std::sync::Arc;

use crate::location::CodeLocation;

/// One entry of a walked stack: the frame's location and the line it is executing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    pub location: Arc<CodeLocation>,
    /// Currently executing line. 0 when unknown.
    pub line: u32,
}

impl StackFrame {
    pub fn new(location: Arc<CodeLocation>, line: u32) -> Self {
        StackFrame { location, line }
    }
}

/// The host VM as seen by the profiler.
///
/// The profiler never inspects the VM on its own. Stacks are walked on demand at
/// safe points, and allocation and GC events are pushed by the host through
/// [`Profiler::on_allocation`](crate::Profiler::on_allocation) and
/// [`Profiler::on_gc_start`](crate::Profiler::on_gc_start).
pub trait Runtime: Send + Sync {
    /// Pushes at most `max_depth` frames of the current stack into `out`, innermost first.
    ///
    /// Only called from [`Profiler::safe_point`](crate::Profiler::safe_point).
    fn walk_stack(&self, max_depth: usize, out: &mut Vec<StackFrame>);

    /// Asks the host to reach a safe point soon.
    ///
    /// May be called from a signal handler; implementations must be async-signal-safe
    /// (setting an atomic interrupt flag is the usual choice).
    fn request_safe_point(&self) {}
}
