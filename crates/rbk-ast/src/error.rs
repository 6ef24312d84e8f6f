use serde::Serialize;
use thiserror::Error;

use crate::Span;

/// A diagnostic with location information.
///
/// Produced by both the lexer and the parser; parsing never fails, so a
/// document is accepted exactly when its diagnostics list is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            span,
            message: message.into(),
        }
    }

    /// Byte offset the diagnostic points at
    pub fn offset(&self) -> u32 {
        self.span.start
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Categories of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    // lexical
    /// String without its closing delimiter before end of input
    #[error("unterminated string")]
    UnterminatedString,
    /// Block comment whose nesting never returns to zero
    #[error("unterminated comment")]
    UnterminatedComment,
    /// Character that starts no token
    #[error("illegal character")]
    IllegalCharacter,

    // syntactic
    /// Unexpected token at statement level
    #[error("expected statement")]
    ExpectedStatement,
    /// Expected a specific token that wasn't found
    #[error("expected token")]
    Expected,
    /// Unexpected token where an expression should start
    #[error("expected expression")]
    ExpectedExpression,
    /// Missing `}`, `]` or `)`
    #[error("unclosed delimiter")]
    UnclosedDelimiter,
    /// Expressions nested beyond the configured limit
    #[error("nesting too deep")]
    NestingTooDeep,
    /// String literal where a bare identifier name is expected
    #[error("quoted name")]
    QuotedName,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            Self::QuotedName => Severity::Warning,
            _ => Severity::Error,
        }
    }
}
