//! Per-page segment accumulation
//!
//! Segments are held until the page's eop, then written as one group:
//!
//! ```text
//! push
//! right4 -h, down4 -v      moves the saved frame back to the page origin
//! <segments, sorted by color, descending>
//! pop                      cursor is (h, v) again
//! ```

use std::io::Write;

use tracing::debug;

use crate::error::RuleSortError;
use crate::opcode::POP;
use crate::segment::{Segment, SegmentBuilder};

#[derive(Debug, Default)]
pub struct PageAccumulator {
    segments: Vec<Segment>,
}

impl PageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sort the held segments by color text, descending
    ///
    /// The sort is stable: segments with the same color keep their order of
    /// appearance on the page.
    pub fn sort(&mut self) {
        self.segments.sort_by(|a, b| b.color_key().cmp(a.color_key()));
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Write the page's rule group relative to a cursor at `(h, v)`
    ///
    /// Returns the number of bytes written.
    pub fn flush<W: Write>(
        &mut self,
        h: i32,
        v: i32,
        capacity: usize,
        sink: &mut W,
    ) -> Result<usize, RuleSortError> {
        let mut prologue = SegmentBuilder::new(capacity);
        prologue.begin()?.move_by(h.wrapping_neg(), v.wrapping_neg())?;

        self.sort();

        sink.write_all(prologue.as_bytes())
            .map_err(RuleSortError::io("write page prologue"))?;
        let mut written = prologue.as_bytes().len();
        for segment in &self.segments {
            sink.write_all(segment.as_bytes())
                .map_err(RuleSortError::io("write rule segment"))?;
            written += segment.len();
        }
        sink.write_all(&[POP])
            .map_err(RuleSortError::io("write page epilogue"))?;
        written += 1;

        debug!(
            segments = self.segments.len(),
            bytes = written,
            h,
            v,
            "flushed page rules"
        );
        Ok(written)
    }

    /// Forget the current page's segments, keeping the allocation
    pub fn reset(&mut self) {
        self.segments.clear();
    }
}
