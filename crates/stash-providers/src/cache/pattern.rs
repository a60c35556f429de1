//! Redis-style key globs
//!
//! `*` matches any run of characters (separators included), `?` one
//! character, `[...]` a character class.

use globset::{GlobBuilder, GlobMatcher};
use stash_domain::error::{Error, Result};

/// Compiled key pattern
#[derive(Debug, Clone)]
pub struct KeyPattern {
    matcher: GlobMatcher,
}

impl KeyPattern {
    /// Compile a pattern, rejecting malformed globs
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_err(|e| Error::invalid_argument(format!("Invalid key pattern '{pattern}': {e}")))?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    /// Whether `key` matches
    pub fn matches(&self, key: &str) -> bool {
        self.matcher.is_match(key)
    }
}
