//! Structural walk over a DVI byte stream
//!
//! This is not an interpreter: it steps over commands by their encoded
//! lengths and only tracks what is needed to check a rewritten document.
//! Positions follow move and rule commands; character advances need font
//! metrics and are not applied.

use crate::document::Document;
use crate::error::RuleSortError;
use crate::opcode::{
    family_width, fixed_operand_len, BOP, BOP_OPERANDS, BOP_PREV_POINTER, DOWN1, DOWN4, EOP,
    FNT_DEF1, FNT_DEF4, NOP, POP, POST, POST_HEADER, POST_POST, PUSH, PUT_RULE, RIGHT1,
    RIGHT4, SET_RULE, TRAILER_PAD, W0, W1, X0, X1, XXX1, XXX4, Y0, Y1, Z0, Z1,
};
use crate::postamble::font_def_len;
use crate::reader::{read_signed, read_unsigned};

/// A rule as drawn, with the color active at that point
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuleDraw {
    pub color: Option<String>,
    pub h: i32,
    pub v: i32,
    pub height: i32,
    pub width: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub bop_offset: usize,
    /// The bop's previous-page pointer
    pub prev_pointer: i32,
    pub eop_offset: usize,
    /// Deepest push nesting reached on the page
    pub max_depth: usize,
    /// Nesting left open at eop, or a pop without push
    pub unbalanced: bool,
    /// `(h, v)` right before eop
    pub final_position: (i32, i32),
    /// Offset and text of every special on the page
    pub specials: Vec<(usize, String)>,
    pub rules: Vec<RuleDraw>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DviLayout {
    pub pages: Vec<PageLayout>,
    pub post_offset: usize,
    pub post_pointer: i32,
    pub max_stack_depth: u16,
    pub total_pages: u16,
    pub font_defs: usize,
    /// Raw bytes between post's header and post_post
    pub font_table: Vec<u8>,
    pub post_post_offset: usize,
    pub post_post_pointer: i32,
    pub padding: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Registers {
    h: i32,
    v: i32,
    w: i32,
    x: i32,
    y: i32,
    z: i32,
}

/// Page being walked
struct PageWalk {
    layout: PageLayout,
    regs: Registers,
    stack: Vec<Registers>,
}

impl PageWalk {
    fn new(bop_offset: usize, prev_pointer: i32) -> Self {
        Self {
            layout: PageLayout {
                bop_offset,
                prev_pointer,
                eop_offset: 0,
                max_depth: 0,
                unbalanced: false,
                final_position: (0, 0),
                specials: Vec::new(),
                rules: Vec::new(),
            },
            regs: Registers::default(),
            stack: Vec::new(),
        }
    }

    fn apply(&mut self, op: u8, operands: &[u8], colors: &[String]) {
        let width = operands.len();
        let regs = &mut self.regs;
        match op {
            PUSH => {
                self.stack.push(*regs);
                self.layout.max_depth = self.layout.max_depth.max(self.stack.len());
            }
            POP => match self.stack.pop() {
                Some(saved) => *regs = saved,
                None => self.layout.unbalanced = true,
            },
            SET_RULE | PUT_RULE => {
                let height = read_signed(operands, 4);
                let rule_width = read_signed(&operands[4..], 4);
                self.layout.rules.push(RuleDraw {
                    color: colors.last().cloned(),
                    h: regs.h,
                    v: regs.v,
                    height,
                    width: rule_width,
                });
                if op == SET_RULE {
                    regs.h = regs.h.wrapping_add(rule_width);
                }
            }
            RIGHT1..=RIGHT4 => regs.h = regs.h.wrapping_add(read_signed(operands, width)),
            W0 => regs.h = regs.h.wrapping_add(regs.w),
            X0 => regs.h = regs.h.wrapping_add(regs.x),
            DOWN1..=DOWN4 => regs.v = regs.v.wrapping_add(read_signed(operands, width)),
            Y0 => regs.v = regs.v.wrapping_add(regs.y),
            Z0 => regs.v = regs.v.wrapping_add(regs.z),
            _ if (W1..W1 + 4).contains(&op) => {
                regs.w = read_signed(operands, width);
                regs.h = regs.h.wrapping_add(regs.w);
            }
            _ if (X1..X1 + 4).contains(&op) => {
                regs.x = read_signed(operands, width);
                regs.h = regs.h.wrapping_add(regs.x);
            }
            _ if (Y1..Y1 + 4).contains(&op) => {
                regs.y = read_signed(operands, width);
                regs.v = regs.v.wrapping_add(regs.y);
            }
            _ if (Z1..Z1 + 4).contains(&op) => {
                regs.z = read_signed(operands, width);
                regs.v = regs.v.wrapping_add(regs.z);
            }
            _ => {}
        }
    }

    fn finish(mut self, eop_offset: usize) -> PageLayout {
        self.layout.eop_offset = eop_offset;
        self.layout.unbalanced |= !self.stack.is_empty();
        self.layout.final_position = (self.regs.h, self.regs.v);
        self.layout
    }
}

/// Track the color stack the way dvips-style drivers do
fn track_color(colors: &mut Vec<String>, text: &str) {
    if let Some(color) = text.strip_prefix("color push ") {
        colors.push(color.trim().to_string());
    } else if text.starts_with("color pop") || text.starts_with("pdf:ecolor") {
        colors.pop();
    } else if let Some(color) = text.strip_prefix("pdf:bcolor ") {
        colors.push(color.trim().to_string());
    }
}

fn layout_error(what: impl Into<String>) -> RuleSortError {
    RuleSortError::Layout(what.into())
}

/// Walk `document` from the preamble to the end of the postamble
pub fn inspect(document: &Document) -> Result<DviLayout, RuleSortError> {
    let mut at = document.preamble_len()?;

    let mut pages = Vec::new();
    let mut page: Option<PageWalk> = None;
    let mut colors: Vec<String> = Vec::new();

    loop {
        let op = document.u8_at(at)?;
        match op {
            BOP => {
                if page.is_some() {
                    return Err(layout_error(format!("bop at {} inside a page", at)));
                }
                let prev = document.i32_at(at + BOP_PREV_POINTER)?;
                page = Some(PageWalk::new(at, prev));
                at += 1 + BOP_OPERANDS;
            }
            EOP => {
                let walk = page
                    .take()
                    .ok_or_else(|| layout_error(format!("eop at {} outside a page", at)))?;
                pages.push(walk.finish(at));
                at += 1;
            }
            XXX1..=XXX4 => {
                let width = family_width(op, XXX1);
                let len = read_unsigned(document.slice(at + 1, width)?, width) as usize;
                let text = document.slice(at + 1 + width, len)?;
                let text = String::from_utf8_lossy(text).into_owned();
                track_color(&mut colors, &text);
                if let Some(walk) = page.as_mut() {
                    walk.layout.specials.push((at, text));
                }
                at += 1 + width + len;
            }
            FNT_DEF1..=FNT_DEF4 => at += font_def_len(document, at)?,
            POST => break,
            _ => {
                let len = fixed_operand_len(op).ok_or(RuleSortError::UnexpectedOpcode {
                    expected: "dvi command",
                    found: op,
                    offset: at,
                })?;
                let operands = document.slice(at + 1, len)?;
                if let Some(walk) = page.as_mut() {
                    walk.apply(op, operands, &colors);
                } else if op != NOP {
                    return Err(layout_error(format!(
                        "opcode 0x{:02x} at {} outside a page",
                        op, at
                    )));
                }
                at += 1 + len;
            }
        }
    }

    if page.is_some() {
        return Err(layout_error("post inside a page"));
    }

    let post_offset = at;
    let post_pointer = document.i32_at(at + 1)?;
    let header = at + 5;
    let max_stack_depth = document.u16_at(header + POST_HEADER - 4)?;
    let total_pages = document.u16_at(header + POST_HEADER - 2)?;

    let defs = header + POST_HEADER;
    at = defs;
    let mut font_defs = 0;
    loop {
        match document.u8_at(at)? {
            POST_POST => break,
            NOP => at += 1,
            FNT_DEF1..=FNT_DEF4 => {
                at += font_def_len(document, at)?;
                font_defs += 1;
            }
            opcode => return Err(RuleSortError::UnknownTrailerRecord { opcode, offset: at }),
        }
    }
    let font_table = document.slice(defs, at - defs)?.to_vec();

    let post_post_offset = at;
    let post_post_pointer = document.i32_at(at + 1)?;
    let tail = document.tail(at + 6)?;
    if tail.iter().any(|&b| b != TRAILER_PAD) {
        return Err(layout_error("trailer padding holds bytes other than 223"));
    }

    Ok(DviLayout {
        pages,
        post_offset,
        post_pointer,
        max_stack_depth,
        total_pages,
        font_defs,
        font_table,
        post_post_offset,
        post_post_pointer,
        padding: tail.len(),
    })
}

impl DviLayout {
    /// Check push/pop nesting and every back-pointer
    pub fn validate(&self) -> Result<(), RuleSortError> {
        let mut previous = -1i32;
        for (index, page) in self.pages.iter().enumerate() {
            if page.unbalanced {
                return Err(layout_error(format!(
                    "page {} has unbalanced push/pop",
                    index + 1
                )));
            }
            if page.prev_pointer != previous {
                return Err(layout_error(format!(
                    "page {} points back to {} instead of {}",
                    index + 1,
                    page.prev_pointer,
                    previous
                )));
            }
            previous = page.bop_offset as i32;
        }
        if self.post_pointer != previous {
            return Err(layout_error(format!(
                "post points to {} instead of the last bop at {}",
                self.post_pointer, previous
            )));
        }
        if self.post_post_pointer != self.post_offset as i32 {
            return Err(layout_error(format!(
                "post_post points to {} instead of post at {}",
                self.post_post_pointer, self.post_offset
            )));
        }
        if self.padding < 4 {
            return Err(layout_error(format!(
                "only {} padding bytes after post_post",
                self.padding
            )));
        }
        Ok(())
    }
}
