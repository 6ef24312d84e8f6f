//! Lexer, parser and syntax tree for runbook files.
//!
//! Parsing never fails: [`parse`] always returns a tree covering the whole
//! input, together with the diagnostics found on the way. The tree can be
//! lowered into a typed [`Runbook`] model, walked with a
//! [`RunbookVisitor`], rewritten with a [`RunbookTransform`] and printed
//! back with the [`RunbookRenderer`]. Models can also be assembled in code
//! with the [`RunbookBuilder`].
//!
//! # Example
//!
//! ```
//! use rbk_ast::{Field, NodeKind, parse};
//!
//! let parse = parse(r#"
//! action deploy evm_contract {
//!     args = [1, 2, "three"]
//! }
//! "#);
//! assert!(parse.is_clean());
//!
//! let action = parse.tree.root().semantic_children().next().unwrap();
//! assert_eq!(action.kind(), NodeKind::ActionBlock);
//! assert_eq!(action.field(Field::Type).unwrap().text(), "evm_contract");
//! ```

pub mod builder;
pub mod error;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod renderer;
pub mod semantic;
pub mod semantic_parser;
pub mod span;
pub mod transform;
pub mod tree;
pub mod visitor;

pub use error::{Diagnostic, DiagnosticKind, Severity};
pub use lexer::{Lexer, Token, TokenKind};
pub use options::{DEFAULT_MAX_DEPTH, ParseOptions};
pub use parser::{Parse, parse, parse_with_options};
pub use span::{LineCol, LineIndex, Span};
pub use tree::{BinaryOp, Field, NodeId, NodeKind, NodeRef, Tree};

// re-export the typed model
pub use builder::RunbookBuilder;
pub use renderer::RunbookRenderer;
pub use semantic::{Expression, HasAttributes, Runbook};
pub use semantic_parser::{LowerError, RunbookError, lower, parse_runbook};
pub use transform::{InputSubstitution, RunbookTransform};
pub use visitor::{RunbookVisitor, collect_references};
