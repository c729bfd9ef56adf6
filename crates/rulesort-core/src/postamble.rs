//! Postamble relocation
//!
//! DVI Trailer Structure:
//! ```text
//! post p[4] num[4] den[4] mag[4] l[4] u[4] s[2] t[2]
//! fnt_def ... (and nops)
//! post_post q[4] i[1] 223 223 223 223 ...
//! ```
//!
//! `p` points at the last bop and `q` at the post opcode. Both are output
//! offsets, so they are recomputed; everything else is copied as is.

use std::io::Write;

use tracing::debug;

use crate::document::Document;
use crate::error::RuleSortError;
use crate::opcode::{family_width, FNT_DEF1, FNT_DEF4, NOP, POST, POST_HEADER, POST_POST};
use crate::rewrite::{pointer, OutputSink};

/// What the relocator learned while copying the trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postamble {
    /// Output offset of the post opcode
    pub post_offset: usize,
    pub max_stack_depth: u16,
    pub total_pages: u16,
    pub font_defs: usize,
}

/// Length of the fnt_def record starting at `offset`
pub fn font_def_len(document: &Document, offset: usize) -> Result<usize, RuleSortError> {
    let op = document.u8_at(offset)?;
    if !(FNT_DEF1..=FNT_DEF4).contains(&op) {
        return Err(RuleSortError::UnexpectedOpcode {
            expected: "fnt_def",
            found: op,
            offset,
        });
    }
    // op k[1..4] c[4] s[4] d[4] a[1] l[1] n[a+l]
    let names = offset + 1 + family_width(op, FNT_DEF1) + 12;
    let area = usize::from(document.u8_at(names)?);
    let name = usize::from(document.u8_at(names + 1)?);
    let len = names + 2 + area + name - offset;
    document.slice(offset, len)?;
    Ok(len)
}

/// Copy the trailer that starts at `cursor`, fixing both back-pointers
///
/// `last_bop` is the output offset of the final page's bop, `None` for a
/// document without pages.
pub fn relocate<W: Write>(
    document: &Document,
    cursor: usize,
    last_bop: Option<usize>,
    out: &mut OutputSink<W>,
) -> Result<Postamble, RuleSortError> {
    document.expect_opcode(cursor, POST, "post")?;

    let post_offset = out.position();
    let last_bop = last_bop.map(pointer).transpose()?.unwrap_or(-1);
    out.emit(&[POST], "write post")?;
    out.emit(&last_bop.to_be_bytes(), "write post pointer")?;

    let header = cursor + 5;
    // Kept as in the source, including s[2] though each page nests two deeper
    out.emit(document.slice(header, POST_HEADER)?, "write post header")?;
    let max_stack_depth = document.u16_at(header + POST_HEADER - 4)?;
    let total_pages = document.u16_at(header + POST_HEADER - 2)?;

    let defs = header + POST_HEADER;
    let mut at = defs;
    let mut font_defs = 0;
    loop {
        match document.u8_at(at)? {
            POST_POST => break,
            NOP => at += 1,
            FNT_DEF1..=FNT_DEF4 => {
                at += font_def_len(document, at)?;
                font_defs += 1;
            }
            opcode => {
                return Err(RuleSortError::UnknownTrailerRecord { opcode, offset: at });
            }
        }
    }
    out.emit(document.slice(defs, at - defs)?, "write font definitions")?;
    debug!(font_defs, bytes = at - defs, "copied font definitions");

    out.emit(&[POST_POST], "write post_post")?;
    out.emit(&pointer(post_offset)?.to_be_bytes(), "write post_post pointer")?;
    document.slice(at + 1, 4)?;
    out.emit(document.tail(at + 5)?, "write trailer padding")?;

    Ok(Postamble {
        post_offset,
        max_stack_depth,
        total_pages,
        font_defs,
    })
}
