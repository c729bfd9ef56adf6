/// Summary of one rewrite run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub pages: usize,
    pub rules: usize,
    pub markers_redacted: usize,
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Page count recorded in the postamble
    pub post_total_pages: u16,
}

impl RewriteStats {
    /// Bytes added by the rewrite (the rule groups)
    pub fn growth(&self) -> isize {
        self.output_bytes as isize - self.input_bytes as isize
    }
}
