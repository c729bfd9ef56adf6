//! Owned, patchable copy of the source DVI file
//!
//! The buffer never changes length. Redaction and back-pointer relinking
//! overwrite bytes in place before they are copied to the output.

use crate::error::RuleSortError;
use crate::opcode::{NOP, PRE};
use crate::reader;

#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8], RuleSortError> {
        self.check(offset, len)?;
        Ok(&self.bytes[offset..offset + len])
    }

    /// Borrow everything from `offset` to the end of the document
    pub fn tail(&self, offset: usize) -> Result<&[u8], RuleSortError> {
        self.check(offset, 0)?;
        Ok(&self.bytes[offset..])
    }

    fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8], RuleSortError> {
        self.check(offset, len)?;
        Ok(&mut self.bytes[offset..offset + len])
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), RuleSortError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(RuleSortError::OutOfBounds {
                offset,
                len,
                doc_len: self.bytes.len(),
            }),
        }
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8, RuleSortError> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16, RuleSortError> {
        self.slice(offset, 2).map(reader::read16)
    }

    pub fn u24_at(&self, offset: usize) -> Result<u32, RuleSortError> {
        self.slice(offset, 3).map(reader::read24)
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32, RuleSortError> {
        self.slice(offset, 4).map(reader::read32)
    }

    pub fn i32_at(&self, offset: usize) -> Result<i32, RuleSortError> {
        self.slice(offset, 4).map(reader::read32_signed)
    }

    /// Fail unless the byte at `offset` is `opcode`
    pub fn expect_opcode(
        &self,
        offset: usize,
        opcode: u8,
        expected: &'static str,
    ) -> Result<(), RuleSortError> {
        let found = self.u8_at(offset)?;
        if found != opcode {
            return Err(RuleSortError::UnexpectedOpcode {
                expected,
                found,
                offset,
            });
        }
        Ok(())
    }

    /// Overwrite `len` bytes at `offset` with NOP
    pub fn redact(&mut self, offset: usize, len: usize) -> Result<(), RuleSortError> {
        self.slice_mut(offset, len)?.fill(NOP);
        Ok(())
    }

    pub fn patch_i32(&mut self, offset: usize, value: i32) -> Result<(), RuleSortError> {
        reader::write32_signed(self.slice_mut(offset, 4)?, value);
        Ok(())
    }

    /// Length of the pre command: i[1] num[4] den[4] mag[4] k[1] x[k]
    pub fn preamble_len(&self) -> Result<usize, RuleSortError> {
        self.expect_opcode(0, PRE, "pre")?;
        let len = 15 + usize::from(self.u8_at(14)?);
        self.slice(0, len)?;
        Ok(len)
    }
}
