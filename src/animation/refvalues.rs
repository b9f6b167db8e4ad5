use crate::{
    animation::{
        segment::{Segment, locate, normalized_table},
        value::AnimValue,
    },
    foundation::error::{SmilError, SmilResult},
};

/// Keyframe values of one animation, as a chain of segments.
///
/// Call [`RefValues::initialize`] once all segments are in place; it computes
/// per-segment lengths and the normalized cumulative length table used for
/// paced timing and `keyPoints`.
#[derive(Clone, Debug, PartialEq)]
pub struct RefValues {
    segments: Vec<Segment>,
    lengths: Vec<f32>,
    table: Vec<f32>,
    total: f32,
}

impl RefValues {
    pub fn new(segments: Vec<Segment>) -> SmilResult<Self> {
        if segments.is_empty() {
            return Err(SmilError::structure("reference values need at least one segment"));
        }
        Ok(Self {
            segments,
            lengths: Vec::new(),
            table: Vec::new(),
            total: 0.0,
        })
    }

    pub fn initialize(&mut self) {
        self.lengths = self.segments.iter().map(Segment::length).collect();
        let (table, total) = normalized_table(&self.lengths);
        self.table = table;
        self.total = total;
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, i: usize) -> Option<&Segment> {
        self.segments.get(i)
    }

    pub(crate) fn first_segment_mut(&mut self) -> &mut Segment {
        &mut self.segments[0]
    }

    /// Total length of all segments.
    pub fn length(&self) -> f32 {
        self.total
    }

    pub fn segment_length(&self, i: usize) -> f32 {
        self.lengths.get(i).copied().unwrap_or(0.0)
    }

    /// Normalized cumulative length table, one entry per segment.
    pub fn normalized_lengths(&self) -> &[f32] {
        &self.table
    }

    /// `(segment index, local penetration)` for a normalized arc-length distance.
    pub fn segment_at_dist(&self, dist: f32) -> (usize, f32) {
        if self.table.is_empty() {
            return (0, 0.0);
        }
        locate(&self.table, dist)
    }

    pub fn compute(&self, si: usize, p: f32) -> AnimValue {
        let si = si.min(self.segments.len() - 1);
        self.segments[si].compute(p.clamp(0.0, 1.0))
    }

    pub fn first_value(&self) -> AnimValue {
        self.segments[0].start_value()
    }

    pub fn last_value(&self) -> AnimValue {
        self.segments[self.segments.len() - 1].end_value()
    }

    /// Appends a zero-length copy of the final value so that discrete
    /// animations show the last key value during the last time segment.
    pub fn make_discrete(&mut self) {
        let hold = self.segments[self.segments.len() - 1].hold_end();
        self.segments.push(hold);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/refvalues.rs"]
mod tests;
