//! Annotation stream parsing
//!
//! The annotation pass describes the source DVI one event per line:
//!
//! ```text
//! h=-31 v=176 1042:color_push_gray_0 1063: putrule height 26214, width 2290850 (2x146 pixels)
//! h=0 v=12 1042:pdf:bcolor [0.5] 1063: setrule height 26214, width 2290850 (2x146 pixels)
//! bop 42: beginning of page 1
//! bol 120: xxx ' sirule BOL'
//! 2104: eop  h=0 v=2206
//! ```
//!
//! Offsets are byte offsets into the source DVI. A color offset of 0 means the
//! rule has no color special of its own.

use std::io::BufRead;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::error::RuleSortError;

lazy_static! {
    /// Rule drawn under a named color push
    static ref RULE_NAMED_PATTERN: Regex = Regex::new(
        r"^h=([-+]?\d+)\s+v=([-+]?\d+)\s+(\d+):color_push_(\S+)\s+(\d+):\s*(\S+)\s+height\s+([-+]?\d+),\s*width\s+([-+]?\d+)\s+\((\d+)x(\d+)\s+pixels\)"
    )
    .unwrap();

    /// Rule drawn under a pdf:bcolor gray level
    static ref RULE_GRAY_PATTERN: Regex = Regex::new(
        r"^h=([-+]?\d+)\s+v=([-+]?\d+)\s+(\d+):pdf:bcolor\s+\[([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\]\s+(\d+):\s*(\S+)\s+height\s+([-+]?\d+),\s*width\s+([-+]?\d+)\s+\((\d+)x(\d+)\s+pixels\)"
    )
    .unwrap();

    static ref PAGE_BEGIN_PATTERN: Regex =
        Regex::new(r"^bop\s+(\d+):\s*beginning\s+(\S+)").unwrap();

    static ref LINE_MARKER_PATTERN: Regex = Regex::new(r"^([be])ol\s+(\d+):\s*(\S+)").unwrap();

    static ref PAGE_END_PATTERN: Regex =
        Regex::new(r"^(\d+):\s*eop\s+h=([-+]?\d+)\s+v=([-+]?\d+)").unwrap();
}

const RULE_FIELDS: usize = 10;
const PAGE_BEGIN_FIELDS: usize = 2;
const LINE_MARKER_FIELDS: usize = 3;
const PAGE_END_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    /// `color_push_<name>`
    Named(String),
    /// `pdf:bcolor [<level>]`
    Gray(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleEntry {
    pub h: i32,
    pub v: i32,
    /// Offset of the color special, 0 when there is none
    pub color_offset: usize,
    pub color: ColorSpec,
    pub rule_offset: usize,
    /// `setrule` or `putrule`
    pub op: String,
    pub height: i32,
    pub width: i32,
    pub pixels: (u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    BeginOfLine,
    EndOfLine,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Rule(RuleEntry),
    PageBegin { offset: usize },
    LineMarker { kind: MarkerKind, offset: usize },
    PageEnd { offset: usize, h: i32, v: i32 },
}

/// Parse one annotation line
pub fn parse_line(line: &str) -> Result<Event, RuleSortError> {
    let line = line.trim_end_matches(['\r', '\n']);

    if line.starts_with('h') {
        parse_rule(line)
    } else if line.starts_with("bop") {
        let caps = captures(&PAGE_BEGIN_PATTERN, line, PAGE_BEGIN_FIELDS)?;
        Ok(Event::PageBegin {
            offset: field(&caps, 1, line, PAGE_BEGIN_FIELDS)?,
        })
    } else if line.starts_with("bol") || line.starts_with("eol") {
        let caps = captures(&LINE_MARKER_PATTERN, line, LINE_MARKER_FIELDS)?;
        let kind = if &caps[1] == "b" {
            MarkerKind::BeginOfLine
        } else {
            MarkerKind::EndOfLine
        };
        Ok(Event::LineMarker {
            kind,
            offset: field(&caps, 2, line, LINE_MARKER_FIELDS)?,
        })
    } else {
        let caps = captures(&PAGE_END_PATTERN, line, PAGE_END_FIELDS)?;
        Ok(Event::PageEnd {
            offset: field(&caps, 1, line, PAGE_END_FIELDS)?,
            h: field(&caps, 2, line, PAGE_END_FIELDS)?,
            v: field(&caps, 3, line, PAGE_END_FIELDS)?,
        })
    }
}

fn parse_rule(line: &str) -> Result<Event, RuleSortError> {
    let (caps, color) = if let Some(caps) = RULE_NAMED_PATTERN.captures(line) {
        let color = ColorSpec::Named(caps[4].to_string());
        (caps, color)
    } else {
        let caps = captures(&RULE_GRAY_PATTERN, line, RULE_FIELDS)?;
        let color = ColorSpec::Gray(field(&caps, 4, line, RULE_FIELDS)?);
        (caps, color)
    };

    Ok(Event::Rule(RuleEntry {
        h: field(&caps, 1, line, RULE_FIELDS)?,
        v: field(&caps, 2, line, RULE_FIELDS)?,
        color_offset: field(&caps, 3, line, RULE_FIELDS)?,
        color,
        rule_offset: field(&caps, 5, line, RULE_FIELDS)?,
        op: caps[6].to_string(),
        height: dimension(&caps, 7, line)?,
        width: dimension(&caps, 8, line)?,
        pixels: (
            field(&caps, 9, line, RULE_FIELDS)?,
            field(&caps, 10, line, RULE_FIELDS)?,
        ),
    }))
}

fn grammar(line: &str, expected_fields: usize) -> RuleSortError {
    RuleSortError::Grammar {
        line: line.to_string(),
        expected_fields,
    }
}

fn captures<'a>(
    pattern: &Regex,
    line: &'a str,
    expected_fields: usize,
) -> Result<Captures<'a>, RuleSortError> {
    pattern
        .captures(line)
        .ok_or_else(|| grammar(line, expected_fields))
}

fn field<T: FromStr>(
    caps: &Captures<'_>,
    index: usize,
    line: &str,
    expected_fields: usize,
) -> Result<T, RuleSortError> {
    caps[index]
        .parse()
        .map_err(|_| grammar(line, expected_fields))
}

/// Rule dimensions are printed unsigned but stored as signed 32-bit words
fn dimension(caps: &Captures<'_>, index: usize, line: &str) -> Result<i32, RuleSortError> {
    let value: i64 = field(caps, index, line, RULE_FIELDS)?;
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return Err(grammar(line, RULE_FIELDS));
    }
    Ok(value as i32)
}

/// Iterator over the events of an annotation stream
#[derive(Debug)]
pub struct Annotations<R> {
    input: R,
    line: Vec<u8>,
}

impl<R: BufRead> Annotations<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for Annotations<R> {
    type Item = Result<Event, RuleSortError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.line.clear();
        // Lines are bytes; invalid UTF-8 surfaces as a grammar mismatch
        match self.input.read_until(b'\n', &mut self.line) {
            Ok(0) => None,
            Ok(_) => Some(parse_line(&String::from_utf8_lossy(&self.line))),
            Err(e) => Some(Err(RuleSortError::Io {
                op: "read annotation stream",
                source: e,
            })),
        }
    }
}
