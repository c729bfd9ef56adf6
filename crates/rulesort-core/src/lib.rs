//! Color-sorting of rules in DVI files
//!
//! Rules (filled rectangles) on a page are regrouped so that rules of the
//! same color are written next to each other, which saves color changes in
//! plotters and other drivers. Everything else in the document is copied
//! byte for byte; the postamble's back-pointers are recomputed.
//!
//! The positions of the rules come from an external annotation pass, read
//! as a line-oriented event stream (see [`annotation`]).
//!
//! - [`rewrite::rewrite`]: stream a rewrite into any `Write` sink
//! - [`rewrite::rewrite_bytes`]: in-memory variant, optionally verified
//!   with [`inspect::inspect`]

pub mod annotation;
pub mod config;
pub mod document;
pub mod error;
pub mod inspect;
pub mod opcode;
pub mod page;
pub mod postamble;
pub mod reader;
pub mod rewrite;
pub mod segment;
pub mod stats;

pub use annotation::{parse_line, Annotations, ColorSpec, Event, MarkerKind, RuleEntry};
pub use config::RewriteConfig;
pub use document::Document;
pub use error::RuleSortError;
pub use inspect::{inspect, DviLayout, PageLayout, RuleDraw};
pub use page::PageAccumulator;
pub use rewrite::{rewrite, rewrite_bytes, OutputSink, Rewriter};
pub use segment::{Segment, SegmentBuilder};
pub use stats::RewriteStats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
