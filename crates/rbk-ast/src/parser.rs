use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, trace};

use crate::Span;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::lexer::{Cursor, StringStyle, Token, TokenKind, next_token};
use crate::options::ParseOptions;
use crate::tree::{CommentStyle, Detail, Field, NodeId, NodeKind, Tree, TreeBuilder};

mod expr;

/// Result of a parse: always a tree, possibly with diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct Parse {
    pub tree: Tree,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parse {
    /// True when the input is fully acceptable
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// Parse a runbook source file into a syntax tree
pub fn parse(source: &str) -> Parse {
    parse_with_options(source, ParseOptions::default())
}

pub fn parse_with_options(source: &str, options: ParseOptions) -> Parse {
    let mut parser = Parser::new(source, options);
    parser.parse_runbook();
    let Parser {
        builder,
        mut diagnostics,
        tokens,
        ..
    } = parser;
    diagnostics.sort_by_key(|d| d.span.start);
    let tree = builder.finish(source.to_string());
    debug!(
        bytes = source.len(),
        tokens,
        nodes = tree.len(),
        diagnostics = diagnostics.len(),
        "parsed runbook"
    );
    Parse { tree, diagnostics }
}

struct Parser<'a> {
    source: &'a str,
    cursor: Cursor,
    /// Lexed but unconsumed tokens, trivia included
    lookahead: VecDeque<Token>,
    builder: TreeBuilder,
    diagnostics: Vec<Diagnostic>,
    options: ParseOptions,
    depth: usize,
    /// Set after a syntax error, cleared by the next normally consumed token
    panicking: bool,
    tokens: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, options: ParseOptions) -> Self {
        Self {
            source,
            cursor: Cursor::start(),
            lookahead: VecDeque::new(),
            builder: TreeBuilder::new(),
            diagnostics: Vec::new(),
            options,
            depth: 0,
            panicking: false,
            tokens: 0,
        }
    }

    fn parse_runbook(&mut self) {
        self.builder.start_node(NodeKind::Runbook);
        loop {
            let token = self.nth_token(0);
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Addon => {
                    self.parse_block_statement(
                        NodeKind::AddonBlock,
                        &[(Field::Network, "network name")],
                    );
                }
                TokenKind::Signer => {
                    self.parse_block_statement(
                        NodeKind::SignerBlock,
                        &[(Field::Name, "signer name"), (Field::Type, "signer type")],
                    );
                }
                TokenKind::Action => {
                    self.parse_block_statement(
                        NodeKind::ActionBlock,
                        &[(Field::Name, "action name"), (Field::Type, "action type")],
                    );
                }
                TokenKind::Output => {
                    self.parse_block_statement(NodeKind::OutputBlock, &[(Field::Name, "output name")]);
                }
                TokenKind::Variable => {
                    self.parse_block_statement(
                        NodeKind::VariableDecl,
                        &[(Field::Name, "variable name")],
                    );
                }
                TokenKind::Input => self.parse_input(),
                TokenKind::Import => self.parse_import(),
                // already reported by the lexer
                TokenKind::Error => self.recover_statement(),
                other => {
                    self.error_at(
                        DiagnosticKind::ExpectedStatement,
                        token,
                        format!("expected statement, found {}", other.describe()),
                    );
                    self.recover_statement();
                }
            }
        }
        // trailing comments belong to the runbook
        self.flush_trivia();
    }

    /// `keyword name... { ... }`
    fn parse_block_statement(&mut self, kind: NodeKind, names: &[(Field, &str)]) {
        self.start_node(kind);
        self.bump();
        for &(field, what) in names {
            self.parse_name(field, what);
        }
        self.parse_block();
        self.builder.finish_node();
    }

    /// `input name = expression`
    fn parse_input(&mut self) {
        self.start_node(NodeKind::InputDecl);
        self.bump();
        self.parse_name(Field::Name, "input name");
        self.parse_assigned_value();
        self.builder.finish_node();
    }

    /// `import "path"`
    fn parse_import(&mut self) {
        self.start_node(NodeKind::ImportStmt);
        self.bump();
        match StringStyle::from_token(self.nth(0)) {
            Some(style) => {
                let path = self.parse_string(style);
                self.builder.mark_field(Field::Path, path);
            }
            None => {
                self.error_expected("import path string");
                if !self.at_sync() {
                    self.recover();
                }
            }
        }
        self.builder.finish_node();
    }

    /// Identifier in a name, type or network slot
    fn parse_name(&mut self, field: Field, what: &str) {
        let token = self.nth_token(0);
        if token.kind == TokenKind::Identifier {
            let name = self.bump_leaf(NodeKind::Identifier, Detail::None);
            self.builder.mark_field(field, name);
            return;
        }
        if let Some(style) = StringStyle::from_token(token.kind) {
            let name = self.parse_string(style);
            self.builder.mark_field(field, name);
            let span = self.builder.span(name);
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::QuotedName,
                span,
                format!("{what} should be a bare identifier"),
            ));
            return;
        }
        match token.kind {
            TokenKind::Error => self.absorb_token(),
            TokenKind::OpenBrace | TokenKind::Equals => self.error_expected(what),
            _ if self.at_sync() => self.error_expected(what),
            _ => {
                self.error_expected(what);
                self.absorb_token();
            }
        }
    }

    /// `{ attribute* }`, stored as the `config` field of the open statement
    fn parse_block(&mut self) {
        if !self.at(TokenKind::OpenBrace) {
            self.error_expected("`{`");
            if !self.at_sync() {
                self.recover();
            }
            return;
        }
        self.start_node(NodeKind::Block);
        let open = self.bump();
        loop {
            let token = self.nth_token(0);
            match token.kind {
                TokenKind::CloseBrace => {
                    self.bump();
                    break;
                }
                TokenKind::Identifier => self.parse_attribute(),
                // `signer = signer.deployer` names an attribute after a keyword
                kind if kind.is_keyword() && self.nth(1) == TokenKind::Equals => {
                    self.parse_attribute()
                }
                TokenKind::Eof => {
                    self.unclosed(open, "`}`");
                    break;
                }
                kind if kind.is_statement_keyword() && !self.continues_reference(1) => {
                    self.unclosed(open, "`}`");
                    break;
                }
                TokenKind::Error => self.recover(),
                other => {
                    self.error_at(
                        DiagnosticKind::Expected,
                        token,
                        format!("expected attribute name or `}}`, found {}", other.describe()),
                    );
                    self.recover();
                }
            }
        }
        let block = self.builder.finish_node();
        self.builder.mark_field(Field::Config, block);
    }

    /// `name = expression`
    fn parse_attribute(&mut self) {
        self.start_node(NodeKind::Attribute);
        let name = self.bump_leaf(NodeKind::Identifier, Detail::None);
        self.builder.mark_field(Field::Name, name);
        self.parse_assigned_value();
        self.builder.finish_node();
    }

    fn parse_assigned_value(&mut self) {
        if !self.at(TokenKind::Equals) {
            self.error_expected("`=`");
            if !self.at_sync() {
                self.recover();
            }
            return;
        }
        self.bump();
        if let Some(value) = self.parse_expression() {
            self.builder.mark_field(Field::Value, value);
        }
    }

    /// Opener, optional content, closer. The caller has checked the opener.
    fn parse_string(&mut self, style: StringStyle) -> NodeId {
        self.start_node(NodeKind::String);
        let open = self.bump();
        let mut content = Span::empty(open.span.end);
        if self.at(TokenKind::StringContent) {
            content = self.bump().span;
        }
        let terminated = self.at(style.token());
        if terminated {
            self.bump();
        }
        self.builder.set_detail(Detail::String {
            style,
            content,
            terminated,
        });
        self.builder.finish_node()
    }

    // ========================================================================
    // Token access
    // ========================================================================

    fn lex(&mut self) -> Token {
        let (token, cursor) = next_token(self.source, self.cursor);
        self.cursor = cursor;
        self.tokens += 1;
        token
    }

    /// The `n`th significant token ahead, lexing as far as needed
    fn nth_token(&mut self, n: usize) -> Token {
        let mut seen = 0;
        let mut i = 0;
        loop {
            if i == self.lookahead.len() {
                let token = self.lex();
                self.lookahead.push_back(token);
            }
            let token = self.lookahead[i];
            if token.kind == TokenKind::Eof {
                return token;
            }
            if !token.kind.is_trivia() {
                if seen == n {
                    return token;
                }
                seen += 1;
            }
            i += 1;
        }
    }

    fn nth(&mut self, n: usize) -> TokenKind {
        self.nth_token(n).kind
    }

    fn at(&mut self, kind: TokenKind) -> bool {
        self.nth(0) == kind
    }

    /// Move pending trivia into the open node; comments become nodes
    fn flush_trivia(&mut self) {
        self.nth_token(0);
        while let Some(&token) = self.lookahead.front() {
            if !token.kind.is_trivia() {
                break;
            }
            self.lookahead.pop_front();
            self.lex_error(token);
            if token.kind.is_comment() {
                let style = comment_style(token.text(self.source));
                self.builder
                    .leaf(NodeKind::Comment, token.span, Detail::Comment(style));
            }
        }
    }

    /// Open a node after handing pending trivia to the enclosing one
    fn start_node(&mut self, kind: NodeKind) {
        self.flush_trivia();
        self.builder.start_node(kind);
    }

    /// Consume the next significant token into the open node
    fn bump(&mut self) -> Token {
        self.flush_trivia();
        let token = self.nth_token(0);
        if token.kind != TokenKind::Eof {
            self.lookahead.pop_front();
            self.builder.token(token.span);
            self.lex_error(token);
        }
        self.panicking = false;
        token
    }

    /// Consume the next significant token as a childless node
    fn bump_leaf(&mut self, kind: NodeKind, detail: Detail) -> NodeId {
        self.flush_trivia();
        let token = self.nth_token(0);
        self.lookahead.pop_front();
        self.lex_error(token);
        self.panicking = false;
        self.builder.leaf(kind, token.span, detail)
    }

    // ========================================================================
    // Diagnostics and recovery
    // ========================================================================

    fn lex_error(&mut self, token: Token) {
        let Some(kind) = token.error else {
            return;
        };
        let message = match kind {
            DiagnosticKind::UnterminatedString => "string is never closed".to_string(),
            DiagnosticKind::UnterminatedComment => "block comment is never closed".to_string(),
            _ => format!("unexpected character `{}`", token.text(self.source)),
        };
        self.diagnostics
            .push(Diagnostic::new(kind, token.span, message));
    }

    fn error_at(&mut self, kind: DiagnosticKind, token: Token, message: String) {
        if self.panicking {
            return;
        }
        self.panicking = true;
        self.diagnostics
            .push(Diagnostic::new(kind, token.span, message));
    }

    fn error_expected(&mut self, what: &str) {
        let token = self.nth_token(0);
        let message = format!("expected {what}, found {}", token.kind.describe());
        self.error_at(DiagnosticKind::Expected, token, message);
    }

    /// Report a missing closer without consuming anything
    fn unclosed(&mut self, open: Token, closer: &str) {
        let token = self.nth_token(0);
        let message = format!(
            "expected {closer} to close {} opened on line {}, found {}",
            open.kind.describe(),
            open.line,
            token.kind.describe()
        );
        self.error_at(DiagnosticKind::UnclosedDelimiter, token, message);
    }

    /// Statement keywords, `}` and end of input end a recovery run. A
    /// statement keyword heading a reference (`input.x`) does not.
    fn at_sync(&mut self) -> bool {
        self.at(TokenKind::CloseBrace) || self.at_statement()
    }

    fn at_statement(&mut self) -> bool {
        match self.nth(0) {
            TokenKind::Eof => true,
            kind if kind.is_statement_keyword() => !self.continues_reference(1),
            _ => false,
        }
    }

    /// Whether the token at `n` joins the segment before it to another one
    fn continues_reference(&mut self, n: usize) -> bool {
        let separator = self.nth_token(n);
        match separator.kind {
            TokenKind::Dot => true,
            TokenKind::Slash => {
                let before = self.nth_token(n - 1);
                let after = self.nth_token(n + 1);
                joins(before.span, separator, after)
            }
            _ => false,
        }
    }

    /// Wrap tokens up to the next synchronizing token in an Error node.
    /// Consumes at least one token unless at end of input.
    fn recover(&mut self) {
        self.recover_to(Self::at_sync);
    }

    /// Top-level variant: a stray `}` is swallowed too
    fn recover_statement(&mut self) {
        self.recover_to(Self::at_statement);
    }

    fn recover_to(&mut self, stop: fn(&mut Self) -> bool) {
        if self.at(TokenKind::Eof) {
            self.panicking = true;
            return;
        }
        trace!(offset = self.nth_token(0).span.start, "recovering");
        self.start_node(NodeKind::Error);
        loop {
            self.bump();
            if stop(self) {
                break;
            }
        }
        self.builder.finish_node();
        self.panicking = true;
    }

    /// Wrap a single stray token in an Error node
    fn absorb_token(&mut self) {
        self.start_node(NodeKind::Error);
        self.bump();
        self.builder.finish_node();
        self.panicking = true;
    }
}

fn is_segment(kind: TokenKind) -> bool {
    kind == TokenKind::Identifier || kind.is_keyword()
}

/// `/` only joins reference segments it touches on both sides; `a / b` is
/// a division
fn joins(before: Span, separator: Token, after: Token) -> bool {
    is_segment(after.kind)
        && before.end == separator.span.start
        && separator.span.end == after.span.start
}

fn comment_style(text: &str) -> CommentStyle {
    if text.starts_with('#') {
        CommentStyle::Hash
    } else if text.starts_with("//") {
        CommentStyle::DoubleSlash
    } else {
        CommentStyle::Block
    }
}
