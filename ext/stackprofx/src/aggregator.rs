use std::collections::{BTreeMap, HashSet};

use crate::raw_trace::RawTrace;
use crate::registry::{Frame, FrameId, FrameRegistry};
use crate::sample::{Sample, SampleKind};

/// Folds captured samples into the frame registry and the optional raw trace.
#[derive(Debug)]
pub struct Aggregator {
    registry: FrameRegistry,
    raw: Option<RawTrace>,

    // Per-sample scratch space, kept to avoid reallocating on every sample
    ids: Vec<FrameId>,
    seen_frames: HashSet<FrameId>,
}

impl Aggregator {
    pub fn new(raw: bool) -> Self {
        Aggregator {
            registry: FrameRegistry::new(),
            raw: raw.then(RawTrace::new),
            ids: vec![],
            seen_frames: HashSet::new(),
        }
    }

    pub fn fold(&mut self, sample: &Sample) {
        if sample.kind == SampleKind::Gc {
            return;
        }

        let depth = sample.frames.len();
        self.ids.clear();
        self.ids.resize(depth, 0);
        self.seen_frames.clear();

        // Walk leaf first so the leaf gets the lower id when it is new
        for (index, stack_frame) in sample.frames.iter().enumerate().rev() {
            let id = self.registry.intern(&stack_frame.location);
            self.ids[index] = id;

            let Some(frame) = self.registry.get_mut(id) else {
                continue;
            };
            let is_leaf = index + 1 == depth;

            if self.seen_frames.insert(id) {
                frame.total_samples += 1;
            }
            if is_leaf {
                frame.samples += 1;
            }

            let line = stack_frame.line;
            if line == 0 {
                continue;
            }
            // Every occurrence counts, recursive ones included
            let stats = frame.line_mut(line);
            stats.total += 1;
            if is_leaf {
                stats.exclusive += 1;
            }
        }

        if let Some(raw) = &mut self.raw {
            raw.record(&self.ids);
        }
    }

    pub fn registry(&self) -> &FrameRegistry {
        &self.registry
    }

    pub fn raw(&self) -> Option<&RawTrace> {
        self.raw.as_ref()
    }

    pub fn finish(self) -> (BTreeMap<FrameId, Frame>, Option<Vec<u64>>) {
        (
            self.registry.freeze(),
            self.raw.map(RawTrace::into_entries),
        )
    }
}
