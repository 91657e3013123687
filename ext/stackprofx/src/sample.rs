use crate::runtime::{Runtime, StackFrame};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    Normal,
    /// Taken while the VM was collecting garbage. Carries no frames.
    Gc,
}

#[derive(Debug, PartialEq)]
pub struct Sample {
    pub kind: SampleKind,
    /// Outermost first; the leaf is the last element.
    pub frames: Vec<StackFrame>,
}

impl Sample {
    /// Walks the current stack. Must only run at a safe point.
    pub fn capture(runtime: &dyn Runtime, max_depth: usize, during_gc: bool) -> Self {
        if during_gc {
            return Sample {
                kind: SampleKind::Gc,
                frames: vec![],
            };
        }

        let mut frames = Vec::with_capacity(max_depth.min(64));
        runtime.walk_stack(max_depth, &mut frames);
        frames.truncate(max_depth);
        frames.reverse();

        Sample {
            kind: SampleKind::Normal,
            frames,
        }
    }

    pub fn leaf(&self) -> Option<&StackFrame> {
        self.frames.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRuntime;

    #[test]
    fn test_capture_orders_leaf_last() {
        let runtime = ScriptedRuntime::new();
        let main = runtime.method("<main>", "app.rb", 1);
        let work = runtime.method("App#work", "app.rb", 10);
        runtime.enter(&main, 3);
        runtime.enter(&work, 12);

        let sample = Sample::capture(&runtime, 16, false);
        assert_eq!(sample.kind, SampleKind::Normal);
        assert_eq!(sample.frames.len(), 2);
        assert_eq!(sample.frames[0].location.name(), "<main>");
        assert_eq!(sample.leaf().unwrap().location.name(), "App#work");
        assert_eq!(sample.leaf().unwrap().line, 12);
    }

    #[test]
    fn test_capture_is_bounded_from_the_leaf() {
        let runtime = ScriptedRuntime::new();
        let recurse = runtime.method("App#recurse", "app.rb", 5);
        for line in 0..10 {
            runtime.enter(&recurse, 6 + line);
        }

        let sample = Sample::capture(&runtime, 4, false);
        assert_eq!(sample.frames.len(), 4);
        // The innermost four frames survive
        let lines: Vec<u32> = sample.frames.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![12, 13, 14, 15]);
    }

    #[test]
    fn test_capture_during_gc() {
        let runtime = ScriptedRuntime::new();
        let main = runtime.method("<main>", "app.rb", 1);
        runtime.enter(&main, 2);

        let sample = Sample::capture(&runtime, 16, true);
        assert_eq!(sample.kind, SampleKind::Gc);
        assert!(sample.frames.is_empty());
        assert_eq!(runtime.walks(), 0);
    }
}
