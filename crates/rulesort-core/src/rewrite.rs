//! Annotation-driven DVI rewriting
//!
//! The source document is copied to the output front to back. Each page's
//! rules are collected as relocatable segments while the annotation stream
//! walks the page; at the page's eop the rule group is written, sorted by
//! color, right before the eop byte:
//!
//! ```text
//! source:  ... bop ....................... eop ... bop ... eop post ...
//!                  |                      |
//! output:  ... bop ....................... push ... pop eop ... post' ...
//!                                          (sorted rule group)
//! ```
//!
//! Everything between the copy cursor and the next eop is copied verbatim,
//! after line markers have been redacted to nops in the owned buffer.

use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

use crate::annotation::{Annotations, Event, RuleEntry};
use crate::config::RewriteConfig;
use crate::document::Document;
use crate::error::RuleSortError;
use crate::inspect;
use crate::opcode::{BOP, BOP_PREV_POINTER, EOP, XXX1};
use crate::page::PageAccumulator;
use crate::postamble;
use crate::segment::SegmentBuilder;
use crate::stats::RewriteStats;

/// DVI pointers are signed 32-bit words
pub(crate) fn pointer(offset: usize) -> Result<i32, RuleSortError> {
    i32::try_from(offset).map_err(|_| {
        RuleSortError::Layout(format!("offset {} does not fit a DVI pointer", offset))
    })
}

/// Output stream that knows how many bytes it has written
#[derive(Debug)]
pub struct OutputSink<W> {
    inner: W,
    position: usize,
}

impl<W: Write> OutputSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn emit(&mut self, bytes: &[u8], op: &'static str) -> Result<(), RuleSortError> {
        self.write_all(bytes).map_err(RuleSortError::io(op))
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for OutputSink<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// State of one rewrite run
#[derive(Debug)]
pub struct Rewriter<W> {
    document: Document,
    out: OutputSink<W>,
    /// Source bytes before this offset have been written
    cursor: usize,
    /// Output offset of the most recent bop
    last_bop: Option<usize>,
    page: PageAccumulator,
    config: RewriteConfig,
    stats: RewriteStats,
}

impl<W: Write> Rewriter<W> {
    pub fn new(document: Document, sink: W, config: RewriteConfig) -> Self {
        let stats = RewriteStats {
            input_bytes: document.len(),
            ..RewriteStats::default()
        };
        Self {
            document,
            out: OutputSink::new(sink),
            cursor: 0,
            last_bop: None,
            page: PageAccumulator::new(),
            config,
            stats,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply one annotation event
    pub fn handle(&mut self, event: Event) -> Result<(), RuleSortError> {
        match event {
            Event::Rule(rule) => self.queue_rule(&rule),
            Event::PageBegin { offset } => self.begin_page(offset),
            Event::LineMarker { offset, .. } => self.redact_marker(offset),
            Event::PageEnd { offset, h, v } => self.end_page(offset, h, v),
        }
    }

    fn ensure_ahead(&self, offset: usize) -> Result<(), RuleSortError> {
        if offset < self.cursor {
            return Err(RuleSortError::CursorRewind {
                cursor: self.cursor,
                target: offset,
            });
        }
        Ok(())
    }

    /// Write source bytes up to (not including) `target`
    fn copy_to(&mut self, target: usize) -> Result<(), RuleSortError> {
        self.ensure_ahead(target)?;
        let bytes = self.document.slice(self.cursor, target - self.cursor)?;
        self.out.emit(bytes, "copy source bytes")?;
        self.cursor = target;
        Ok(())
    }

    fn queue_rule(&mut self, rule: &RuleEntry) -> Result<(), RuleSortError> {
        let doc = &self.document;
        let mut builder = SegmentBuilder::new(self.config.segment_capacity);
        builder
            .begin()?
            .move_by(rule.h, rule.v)?
            .push_color(doc, rule.color_offset)?
            .draw_rule(doc, rule.rule_offset)?
            .pop_color()?;
        let segment = builder.end()?;

        let found = (
            doc.i32_at(rule.rule_offset + 1)?,
            doc.i32_at(rule.rule_offset + 5)?,
        );
        let expected = (rule.height, rule.width);
        if found != expected {
            return Err(RuleSortError::RuleMismatch {
                offset: rule.rule_offset,
                expected,
                found,
            });
        }

        self.page.append(segment);
        self.stats.rules += 1;
        Ok(())
    }

    fn begin_page(&mut self, offset: usize) -> Result<(), RuleSortError> {
        self.document.expect_opcode(offset, BOP, "bop")?;
        self.ensure_ahead(offset)?;

        // Nothing else is written before this bop is copied
        let output_offset = self.out.position() + (offset - self.cursor);
        if self.config.relink_pages {
            let previous = self.last_bop.map(pointer).transpose()?.unwrap_or(-1);
            self.document.patch_i32(offset + BOP_PREV_POINTER, previous)?;
        }
        debug!(offset, output_offset, "page begins");
        self.last_bop = Some(output_offset);
        Ok(())
    }

    fn redact_marker(&mut self, offset: usize) -> Result<(), RuleSortError> {
        self.document.expect_opcode(offset, XXX1, "xxx1 line marker")?;
        self.ensure_ahead(offset)?;
        let len = usize::from(self.document.u8_at(offset + 1)?) + 2;
        self.document.redact(offset, len)?;
        self.stats.markers_redacted += 1;
        debug!(offset, len, "redacted line marker");
        Ok(())
    }

    fn end_page(&mut self, offset: usize, h: i32, v: i32) -> Result<(), RuleSortError> {
        self.document.expect_opcode(offset, EOP, "eop")?;
        self.copy_to(offset)?;
        self.page
            .flush(h, v, self.config.segment_capacity, &mut self.out)?;
        self.copy_to(offset + 1)?;
        self.page.reset();
        self.stats.pages += 1;
        Ok(())
    }

    /// Write the postamble and return the sink
    pub fn finish(mut self) -> Result<(W, RewriteStats), RuleSortError> {
        if !self.page.is_empty() {
            return Err(RuleSortError::Layout(format!(
                "{} rule(s) annotated after the last eop",
                self.page.len()
            )));
        }

        // No page events: nothing has moved the cursor past the preamble
        if self.last_bop.is_none() && self.cursor == 0 {
            let preamble = self.document.preamble_len()?;
            self.copy_to(preamble)?;
        }

        let post =
            postamble::relocate(&self.document, self.cursor, self.last_bop, &mut self.out)?;
        self.out.flush().map_err(RuleSortError::io("flush output"))?;

        self.stats.output_bytes = self.out.position();
        self.stats.post_total_pages = post.total_pages;
        if usize::from(post.total_pages) != self.stats.pages {
            warn!(
                post = post.total_pages,
                seen = self.stats.pages,
                "postamble page count differs from annotated pages"
            );
        }
        info!(
            pages = self.stats.pages,
            rules = self.stats.rules,
            markers = self.stats.markers_redacted,
            input_bytes = self.stats.input_bytes,
            output_bytes = self.stats.output_bytes,
            "rewrite complete"
        );
        Ok((self.out.into_inner(), self.stats))
    }
}

/// Rewrite `document` following the events read from `annotations`
pub fn rewrite<R: BufRead, W: Write>(
    document: Document,
    annotations: R,
    sink: W,
    config: RewriteConfig,
) -> Result<(W, RewriteStats), RuleSortError> {
    let mut rewriter = Rewriter::new(document, sink, config);
    for event in Annotations::new(annotations) {
        rewriter.handle(event?)?;
    }
    rewriter.finish()
}

/// In-memory rewrite, checking the result when `verify_output` is set
pub fn rewrite_bytes<R: BufRead>(
    source: Vec<u8>,
    annotations: R,
    config: RewriteConfig,
) -> Result<(Vec<u8>, RewriteStats), RuleSortError> {
    let verify = config.verify_output;
    let (output, stats) = rewrite(Document::new(source), annotations, Vec::new(), config)?;
    if !verify {
        return Ok((output, stats));
    }
    let written = Document::new(output);
    inspect::inspect(&written)?.validate()?;
    Ok((written.into_bytes(), stats))
}
