use std::collections::BTreeMap;

use crate::registry::{Frame, FrameId};
use crate::session::configuration::Mode;

pub const PROFILE_VERSION: f64 = 1.1;

/// The frozen result of a profiling session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub version: f64,
    pub mode: Mode,
    pub interval: u64,
    /// Normal (non-GC) samples.
    pub samples: u64,
    pub gc_samples: u64,
    /// Triggers coalesced away while an earlier request was still pending.
    pub missed_samples: u64,
    pub frames: BTreeMap<FrameId, Frame>,
    /// Encoded stacks, see [`crate::raw_trace`]. Present only when raw capture was enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u64>>,
}

impl Profile {
    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(&id)
    }

    pub fn frame_named(&self, name: &str) -> Option<&Frame> {
        self.frames.values().find(|frame| frame.name == name)
    }
}
