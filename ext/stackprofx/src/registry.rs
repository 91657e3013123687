use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::location::CodeLocation;

/// Profile-local frame identity. Assigned from 1 in order of first appearance.
pub type FrameId = u64;

/// Per-line counters of a frame, serialized as `[total, exclusive]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u64, u64)", into = "(u64, u64)")]
pub struct LineStats {
    /// Samples in which some occurrence of the frame was executing this line.
    pub total: u64,
    /// Samples in which the frame was the leaf and executing this line.
    pub exclusive: u64,
}

impl From<(u64, u64)> for LineStats {
    fn from((total, exclusive): (u64, u64)) -> Self {
        LineStats { total, exclusive }
    }
}

impl From<LineStats> for (u64, u64) {
    fn from(stats: LineStats) -> Self {
        (stats.total, stats.exclusive)
    }
}

/// Accumulated statistics for one code location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub file: String,
    /// The line the scope begins at.
    #[serde(rename = "line")]
    pub first_line: u32,
    /// Samples in which this frame appeared anywhere on the stack.
    pub total_samples: u64,
    /// Samples in which this frame was the leaf.
    pub samples: u64,
    pub lines: BTreeMap<u32, LineStats>,
}

impl Frame {
    fn new(location: &CodeLocation) -> Self {
        Frame {
            name: location.name(),
            file: location.file().to_owned(),
            first_line: location.first_line(),
            total_samples: 0,
            samples: 0,
            lines: BTreeMap::new(),
        }
    }

    pub fn line(&self, line: u32) -> Option<LineStats> {
        self.lines.get(&line).copied()
    }

    pub(crate) fn line_mut(&mut self, line: u32) -> &mut LineStats {
        self.lines.entry(line).or_default()
    }
}

/// Maps code locations to their live statistics.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    ids: HashMap<Arc<CodeLocation>, FrameId>,
    // frames[id - 1]
    frames: Vec<Frame>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `location`, creating an empty frame on first sight.
    pub fn intern(&mut self, location: &Arc<CodeLocation>) -> FrameId {
        if let Some(id) = self.ids.get(location.as_ref()) {
            return *id;
        }
        self.frames.push(Frame::new(location));
        let id = self.frames.len() as FrameId;
        self.ids.insert(Arc::clone(location), id);
        id
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.frames.get(index)
    }

    pub(crate) fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.frames.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn freeze(self) -> BTreeMap<FrameId, Frame> {
        self.frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| (index as FrameId + 1, frame))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Scope;

    fn location(label: &str, first_line: u32) -> Arc<CodeLocation> {
        Arc::new(CodeLocation::new(Scope::named(label), "app.rb", first_line))
    }

    #[test]
    fn test_intern_deduplicates_by_identity() {
        let mut registry = FrameRegistry::new();
        let a = registry.intern(&location("A#a", 1));
        let b = registry.intern(&location("A#b", 5));
        // A distinct Arc with the same identity maps to the same frame
        let a_again = registry.intern(&location("A#a", 1));

        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(a_again, a);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a).unwrap().name, "A#a");
        assert_eq!(registry.get(b).unwrap().first_line, 5);
        assert_eq!(registry.get(0), None);
        assert_eq!(registry.get(3), None);
    }

    #[test]
    fn test_freeze_keeps_ids() {
        let mut registry = FrameRegistry::new();
        let a = registry.intern(&location("A#a", 1));
        let b = registry.intern(&location("A#b", 5));
        registry.get_mut(b).unwrap().line_mut(6).total += 1;

        let frames = registry.freeze();
        assert_eq!(frames.keys().copied().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(frames[&b].line(6), Some(LineStats { total: 1, exclusive: 0 }));
        assert_eq!(frames[&a].line(6), None);
    }

    #[test]
    fn test_line_stats_serialize_as_pair() {
        let stats = LineStats { total: 3, exclusive: 1 };
        assert_eq!(serde_json::to_string(&stats).unwrap(), "[3,1]");
        let parsed: LineStats = serde_json::from_str("[2,0]").unwrap();
        assert_eq!(parsed, LineStats { total: 2, exclusive: 0 });
    }
}
