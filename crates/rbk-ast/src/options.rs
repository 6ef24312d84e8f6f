use serde::Deserialize;

/// Nesting limit applied when no explicit options are given
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Knobs for a single parse call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum nesting of brackets, calls and binary operators before the
    /// parser gives up on a value and reports `NestingTooDeep`
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
