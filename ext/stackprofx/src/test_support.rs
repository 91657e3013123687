use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::location::{CodeLocation, Scope};
use crate::runtime::{Runtime, StackFrame};

/// Serializes tests that touch process-wide signal state or burn enough CPU to skew the
/// process cpu clock.
pub(crate) fn signal_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A pretend VM whose stack is pushed and popped by the test.
#[derive(Default)]
pub(crate) struct ScriptedRuntime {
    // Outermost first
    stack: Mutex<Vec<StackFrame>>,
    walks: AtomicUsize,
    wakeups: AtomicUsize,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(&self, label: &str, file: &str, first_line: u32) -> Arc<CodeLocation> {
        Arc::new(CodeLocation::new(Scope::named(label), file, first_line))
    }

    pub fn block(&self, parent: &Arc<CodeLocation>, first_line: u32) -> Arc<CodeLocation> {
        Arc::new(CodeLocation::new(
            Scope::block_in(parent.scope()),
            parent.file(),
            first_line,
        ))
    }

    pub fn enter(&self, location: &Arc<CodeLocation>, line: u32) {
        self.stack
            .lock()
            .unwrap()
            .push(StackFrame::new(Arc::clone(location), line));
    }

    pub fn leave(&self) {
        self.stack.lock().unwrap().pop();
    }

    /// Moves the innermost frame to another line.
    pub fn goto(&self, line: u32) {
        if let Some(frame) = self.stack.lock().unwrap().last_mut() {
            frame.line = line;
        }
    }

    pub fn walks(&self) -> usize {
        self.walks.load(Ordering::Relaxed)
    }

    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::Relaxed)
    }
}

impl Runtime for ScriptedRuntime {
    fn walk_stack(&self, max_depth: usize, out: &mut Vec<StackFrame>) {
        self.walks.fetch_add(1, Ordering::Relaxed);
        let stack = self.stack.lock().unwrap();
        out.extend(stack.iter().rev().take(max_depth).cloned());
    }

    fn request_safe_point(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }
}
