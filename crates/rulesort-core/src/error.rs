use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleSortError {
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected opcode 0x{found:02x} at offset {offset} (expected {expected})")]
    UnexpectedOpcode {
        expected: &'static str,
        found: u8,
        offset: usize,
    },

    #[error("Segment of {len} bytes exceeds capacity {capacity}")]
    SegmentOverflow { len: usize, capacity: usize },

    #[error("Unknown postamble record 0x{opcode:02x} at offset {offset}")]
    UnknownTrailerRecord { opcode: u8, offset: usize },

    #[error("Annotation line does not match (expected {expected_fields} fields): {line:?}")]
    Grammar { line: String, expected_fields: usize },

    #[error("Read of {len} bytes at offset {offset} is outside the document ({doc_len} bytes)")]
    OutOfBounds {
        offset: usize,
        len: usize,
        doc_len: usize,
    },

    #[error("Copy cursor at {cursor} cannot move back to {target}")]
    CursorRewind { cursor: usize, target: usize },

    #[error("Rule at offset {offset} is {found:?} but the annotation says {expected:?}")]
    RuleMismatch {
        offset: usize,
        expected: (i32, i32),
        found: (i32, i32),
    },

    #[error("Invalid DVI layout: {0}")]
    Layout(String),
}

impl RuleSortError {
    pub(crate) fn io(op: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| RuleSortError::Io { op, source }
    }
}
