//! Relocatable rule segments
//!
//! A segment draws one colored rule relative to whatever cursor position is
//! current when it is written:
//!
//! ```text
//! push
//! right4 h, down4 v        (zero axes omitted)
//! xxx1 "color push ..."    (copied from the source, or gray 0)
//! put_rule a b             (never set_rule: it would move h)
//! xxx1 "color pop"
//! pop
//! ```
//!
//! The surrounding push/pop means the segment leaves the cursor untouched,
//! so segments can be reordered freely.

use crate::document::Document;
use crate::error::RuleSortError;
use crate::opcode::{DOWN4, POP, PUSH, PUT_RULE, RIGHT4, SET_RULE, XXX1};

/// Default segment capacity in bytes
pub const DEFAULT_CAPACITY: usize = 64;

/// Color used when a rule has no color special of its own
pub const DEFAULT_COLOR_PUSH: &[u8] = b"\xef\x11color push gray 0";
pub const COLOR_POP: &[u8] = b"\xef\x09color pop";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    bytes: Vec<u8>,
    /// Position of the color special's XXX1 opcode
    color: Option<usize>,
}

impl Segment {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn color_offset(&self) -> Option<usize> {
        self.color
    }

    /// Text of the color special, the sort key of the segment
    pub fn color_key(&self) -> &[u8] {
        match self.color {
            Some(at) => {
                let len = usize::from(self.bytes[at + 1]);
                &self.bytes[at + 2..at + 2 + len]
            }
            None => &[],
        }
    }
}

/// Appends commands into a bounded buffer
///
/// Every step fails with [`RuleSortError::SegmentOverflow`] instead of
/// growing past the configured capacity.
#[derive(Debug)]
pub struct SegmentBuilder {
    bytes: Vec<u8>,
    capacity: usize,
    color: Option<usize>,
}

impl SegmentBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
            color: None,
        }
    }

    fn extend(&mut self, data: &[u8]) -> Result<&mut Self, RuleSortError> {
        let len = self.bytes.len() + data.len();
        if len > self.capacity {
            return Err(RuleSortError::SegmentOverflow {
                len,
                capacity: self.capacity,
            });
        }
        self.bytes.extend_from_slice(data);
        Ok(self)
    }

    pub fn begin(&mut self) -> Result<&mut Self, RuleSortError> {
        self.extend(&[PUSH])
    }

    /// Move the cursor by `(dh, dv)` using 4-byte operands
    pub fn move_by(&mut self, dh: i32, dv: i32) -> Result<&mut Self, RuleSortError> {
        for (op, delta) in [(RIGHT4, dh), (DOWN4, dv)] {
            if delta != 0 {
                let [a, b, c, d] = delta.to_be_bytes();
                self.extend(&[op, a, b, c, d])?;
            }
        }
        Ok(self)
    }

    /// Push the color special found at `offset`, or gray 0 when `offset` is 0
    pub fn push_color(
        &mut self,
        document: &Document,
        offset: usize,
    ) -> Result<&mut Self, RuleSortError> {
        let at = self.bytes.len();
        if offset == 0 {
            self.extend(DEFAULT_COLOR_PUSH)?;
        } else {
            document.expect_opcode(offset, XXX1, "xxx1 color special")?;
            let len = usize::from(document.u8_at(offset + 1)?);
            self.extend(document.slice(offset, 2 + len)?)?;
        }
        self.color = Some(at);
        Ok(self)
    }

    /// Copy the rule at `offset` as a put_rule
    pub fn draw_rule(
        &mut self,
        document: &Document,
        offset: usize,
    ) -> Result<&mut Self, RuleSortError> {
        let op = document.u8_at(offset)?;
        if op != SET_RULE && op != PUT_RULE {
            return Err(RuleSortError::UnexpectedOpcode {
                expected: "set_rule or put_rule",
                found: op,
                offset,
            });
        }
        let dims = document.slice(offset + 1, 8)?;
        let mut rule = [PUT_RULE; 9];
        rule[1..].copy_from_slice(dims);
        self.extend(&rule)
    }

    pub fn pop_color(&mut self) -> Result<&mut Self, RuleSortError> {
        self.extend(COLOR_POP)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn end(mut self) -> Result<Segment, RuleSortError> {
        self.extend(&[POP])?;
        Ok(Segment {
            bytes: self.bytes,
            color: self.color,
        })
    }
}
