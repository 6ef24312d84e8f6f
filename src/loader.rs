//! Reading runbook files and expanding path patterns

use std::path::{Path, PathBuf};

use glob::glob;
use rbk_ast::{LineIndex, Parse, ParseOptions, parse_with_options};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("no files match `{0}`")]
    NoMatch(String),
}

/// A runbook source read from disk
pub struct Document {
    pub path: PathBuf,
    pub source: String,
    lines: LineIndex,
}

impl Document {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = source.len(), "loaded runbook");
        Ok(Self::new(path, source))
    }

    pub fn new(path: impl Into<PathBuf>, source: String) -> Self {
        let lines = LineIndex::new(&source);
        Self {
            path: path.into(),
            source,
            lines,
        }
    }

    pub fn parse(&self, options: ParseOptions) -> Parse {
        parse_with_options(&self.source, options)
    }

    /// `path:line:col` prefix for a byte offset
    pub fn location(&self, offset: u32) -> String {
        let pos = self.lines.line_col(offset);
        format!("{}:{}:{}", self.path.display(), pos.line, pos.column)
    }
}

fn has_glob(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// Expand glob patterns into concrete paths; plain paths pass through
/// untouched so a missing file surfaces as a read error later.
pub fn expand_paths(patterns: &[String]) -> Result<Vec<PathBuf>, LoadError> {
    let mut result = Vec::new();

    for pattern in patterns {
        if !has_glob(pattern) {
            result.push(PathBuf::from(pattern));
            continue;
        }

        let paths = glob(pattern).map_err(|source| LoadError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        let mut matched: Vec<PathBuf> = paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "skipping unreadable glob entry");
                    None
                }
            })
            .collect();

        if matched.is_empty() {
            return Err(LoadError::NoMatch(pattern.clone()));
        }
        matched.sort();
        result.append(&mut matched);
    }

    Ok(result)
}
