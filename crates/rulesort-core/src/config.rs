use crate::segment::DEFAULT_CAPACITY;

/// Configuration for a rewrite run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Largest segment the builder accepts, in bytes
    pub segment_capacity: usize,

    /// Rewrite each bop's previous-page pointer to its output offset
    pub relink_pages: bool,

    /// Re-walk the written document and check its back-pointers
    pub verify_output: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            segment_capacity: DEFAULT_CAPACITY,
            relink_pages: true,
            verify_output: false,
        }
    }
}

impl RewriteConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(default)
        };
        Self {
            segment_capacity: lookup("RULESORT_SEGMENT_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CAPACITY),
            relink_pages: flag("RULESORT_RELINK_PAGES", true),
            verify_output: flag("RULESORT_VERIFY", false),
        }
    }
}
