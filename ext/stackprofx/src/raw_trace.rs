use crate::registry::FrameId;

/// Append-only record of every sampled stack.
///
/// Layout is a flat sequence of records `[repeat, depth, id_0, .., id_{depth-1}]`, outermost
/// frame first, so the final entry of the buffer is always the leaf of the latest sample.
/// A sample whose stack equals the previous record's bumps that record's `repeat` instead of
/// appending a new one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTrace {
    entries: Vec<u64>,
    last_record: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub repeat: u64,
    /// Outermost first.
    pub stack: &'a [FrameId],
}

impl RawTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stack: &[FrameId]) {
        if let Some(start) = self.last_record {
            if &self.entries[start + 2..] == stack {
                self.entries[start] += 1;
                return;
            }
        }

        self.last_record = Some(self.entries.len());
        self.entries.reserve(stack.len() + 2);
        self.entries.push(1);
        self.entries.push(stack.len() as u64);
        self.entries.extend_from_slice(stack);
    }

    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<u64> {
        self.entries
    }
}

/// Splits an encoded trace back into records. Returns `None` if the trace is truncated.
pub fn decode(entries: &[u64]) -> Option<Vec<RawRecord<'_>>> {
    let mut records = vec![];
    let mut rest = entries;
    while !rest.is_empty() {
        let [repeat, depth, tail @ ..] = rest else {
            return None;
        };
        let depth = usize::try_from(*depth).ok()?;
        if tail.len() < depth {
            return None;
        }
        let (stack, tail) = tail.split_at(depth);
        records.push(RawRecord {
            repeat: *repeat,
            stack,
        });
        rest = tail;
    }
    Some(records)
}

/// Expands repeats, yielding one stack per sample in capture order.
pub fn stacks(entries: &[u64]) -> Option<Vec<&[FrameId]>> {
    let records = decode(entries)?;
    let mut stacks = vec![];
    for record in records {
        for _ in 0..record.repeat {
            stacks.push(record.stack);
        }
    }
    Some(stacks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_record() {
        let mut raw = RawTrace::new();
        raw.record(&[1, 2, 3]);
        assert_eq!(raw.entries(), &[1, 3, 1, 2, 3]);
        assert_eq!(raw.entries().last(), Some(&3));
        assert_eq!(raw.entries()[1] as usize + 2, raw.entries().len());
    }

    #[test]
    fn test_repeated_stack_is_compacted() {
        let mut raw = RawTrace::new();
        for _ in 0..10 {
            raw.record(&[4, 7]);
        }
        assert_eq!(raw.entries(), &[10, 2, 4, 7]);
        assert_eq!(raw.entries().last(), Some(&7));
    }

    #[test]
    fn test_only_adjacent_stacks_are_compacted() {
        let mut raw = RawTrace::new();
        raw.record(&[1, 2]);
        raw.record(&[1]);
        raw.record(&[1, 2]);
        raw.record(&[1, 2]);
        assert_eq!(raw.entries(), &[1, 2, 1, 2, 1, 1, 1, 2, 2, 1, 2]);

        let records = decode(raw.entries()).unwrap();
        assert_eq!(
            records,
            vec![
                RawRecord { repeat: 1, stack: &[1, 2] },
                RawRecord { repeat: 1, stack: &[1] },
                RawRecord { repeat: 2, stack: &[1, 2] },
            ]
        );
        let expanded = stacks(raw.entries()).unwrap();
        assert_eq!(expanded.len(), 4);
        assert_eq!(expanded[3], &[1, 2]);
    }

    #[test]
    fn test_prefix_stack_is_not_merged() {
        let mut raw = RawTrace::new();
        raw.record(&[1, 2, 3]);
        raw.record(&[1, 2]);
        assert_eq!(raw.entries(), &[1, 3, 1, 2, 3, 1, 2, 1, 2]);
    }

    #[test]
    fn test_decode_rejects_truncated() {
        assert_eq!(decode(&[1, 3, 1, 2]), None);
        assert_eq!(decode(&[1]), None);
        assert_eq!(decode(&[]), Some(vec![]));
    }
}
