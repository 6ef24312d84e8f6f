use super::{Parser, is_segment, joins};
use crate::error::DiagnosticKind;
use crate::lexer::{StringStyle, TokenKind};
use crate::tree::{BinaryOp, Checkpoint, Detail, Field, NodeId, NodeKind, NumberForm};

// Expression parsing methods
impl Parser<'_> {
    /// Parse an expression, returning the node that holds its value.
    ///
    /// `None` means no expression node was produced; a diagnostic has been
    /// reported and any skipped tokens sit in an Error node.
    pub(super) fn parse_expression(&mut self) -> Option<NodeId> {
        self.parse_binary(1)
    }

    /// Precedence climbing over the two left-associative tiers.
    ///
    /// Every operator wraps the operands so far in one more node, so each
    /// one counts against the nesting limit until the expression ends.
    fn parse_binary(&mut self, min_precedence: u8) -> Option<NodeId> {
        self.flush_trivia();
        let depth = self.depth;
        let checkpoint = self.builder.checkpoint();
        let left = self.parse_primary();
        let node = left.map(|left| self.parse_operators(checkpoint, left, min_precedence));
        self.depth = depth;
        node
    }

    fn parse_operators(
        &mut self,
        checkpoint: Checkpoint,
        mut left: NodeId,
        min_precedence: u8,
    ) -> NodeId {
        loop {
            let op = match BinaryOp::from_token(self.nth(0)) {
                Some(op) if op.precedence() >= min_precedence => op,
                _ => break,
            };
            if self.depth >= self.options.max_depth {
                self.too_deep();
                break;
            }
            self.depth += 1;

            self.builder.start_node_at(checkpoint, NodeKind::BinaryExpr);
            self.builder.mark_field(Field::Left, left);
            self.builder.set_detail(Detail::Operator(op));
            self.bump();

            // higher minimum on the right keeps each tier left-associative
            if let Some(right) = self.parse_binary(op.precedence() + 1) {
                self.builder.mark_field(Field::Right, right);
            }
            left = self.builder.finish_node();
        }
        left
    }

    fn parse_primary(&mut self) -> Option<NodeId> {
        let token = self.nth_token(0);
        if let Some(style) = StringStyle::from_token(token.kind) {
            return Some(self.parse_string(style));
        }

        match token.kind {
            TokenKind::HexNumber => Some(self.parse_number(NumberForm::Hex)),
            TokenKind::Integer => Some(self.parse_number(NumberForm::Integer)),
            TokenKind::Float => Some(self.parse_number(NumberForm::Float)),
            TokenKind::True | TokenKind::False => {
                Some(self.bump_leaf(NodeKind::Boolean, Detail::None))
            }
            TokenKind::Null => Some(self.bump_leaf(NodeKind::Null, Detail::None)),
            TokenKind::OpenBracket => self.nested(Self::parse_array),
            TokenKind::OpenBrace => self.nested(Self::parse_object),
            TokenKind::Identifier if self.nth(1) == TokenKind::OpenParen => {
                self.nested(Self::parse_call)
            }
            TokenKind::Identifier => self.parse_reference(),
            kind if kind.is_statement_keyword() && self.continues_reference(1) => {
                self.parse_reference()
            }
            // a keyword with no name after it cannot open the next statement
            kind if kind.is_statement_keyword() && !self.name_follows() => {
                self.error_at(
                    DiagnosticKind::ExpectedExpression,
                    token,
                    format!("expected expression, found {}", kind.describe()),
                );
                self.absorb_token();
                None
            }
            // already reported by the lexer
            TokenKind::Error => {
                self.recover_expression();
                None
            }
            other => {
                self.error_at(
                    DiagnosticKind::ExpectedExpression,
                    token,
                    format!("expected expression, found {}", other.describe()),
                );
                self.recover_expression();
                None
            }
        }
    }

    fn name_follows(&mut self) -> bool {
        let next = self.nth(1);
        next == TokenKind::Identifier || StringStyle::from_token(next).is_some()
    }

    fn parse_number(&mut self, form: NumberForm) -> NodeId {
        self.bump_leaf(NodeKind::Number, Detail::Number(form))
    }

    /// Skip a malformed value without eating a delimiter that an enclosing
    /// array, object or call is waiting for
    fn recover_expression(&mut self) {
        let delimiter = matches!(
            self.nth(0),
            TokenKind::Comma | TokenKind::Colon | TokenKind::CloseBracket | TokenKind::CloseParen
        );
        if delimiter || self.at_sync() {
            self.panicking = true;
        } else {
            self.recover();
        }
    }

    /// Run `parse` one nesting level deeper, refusing past the limit
    fn nested<F>(&mut self, parse: F) -> Option<NodeId>
    where
        F: FnOnce(&mut Self) -> Option<NodeId>,
    {
        if self.depth >= self.options.max_depth {
            self.too_deep();
            return None;
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn too_deep(&mut self) {
        let token = self.nth_token(0);
        let message = format!(
            "expression nested deeper than {} levels",
            self.options.max_depth
        );
        self.error_at(DiagnosticKind::NestingTooDeep, token, message);
        self.recover();
    }

    /// `a.b/c.d`, optionally followed by one `[index]`
    fn parse_reference(&mut self) -> Option<NodeId> {
        self.flush_trivia();
        let checkpoint = self.builder.checkpoint();
        self.start_node(NodeKind::Reference);
        let head = self.bump_leaf(NodeKind::Identifier, Detail::None);
        let mut last = self.builder.span(head);

        loop {
            let separator = self.nth_token(0);
            match separator.kind {
                TokenKind::Dot => {
                    self.bump();
                    if !is_segment(self.nth(0)) {
                        self.error_expected("identifier after `.`");
                        break;
                    }
                }
                TokenKind::Slash if joins(last, separator, self.nth_token(1)) => {
                    self.bump();
                }
                _ => break,
            }
            let segment = self.bump_leaf(NodeKind::Identifier, Detail::None);
            last = self.builder.span(segment);
        }

        let reference = self.builder.finish_node();
        if self.at(TokenKind::OpenBracket) {
            return self.nested(|p| p.parse_index(checkpoint, reference));
        }
        Some(reference)
    }

    fn parse_index(&mut self, checkpoint: Checkpoint, target: NodeId) -> Option<NodeId> {
        self.builder.start_node_at(checkpoint, NodeKind::IndexAccess);
        self.builder.mark_field(Field::Target, target);
        let open = self.bump();
        if let Some(index) = self.parse_expression() {
            self.builder.mark_field(Field::Index, index);
        }
        if self.at(TokenKind::CloseBracket) {
            self.bump();
        } else {
            self.unclosed(open, "`]`");
        }
        Some(self.builder.finish_node())
    }

    /// `name(arg, ...)`; no trailing comma
    fn parse_call(&mut self) -> Option<NodeId> {
        self.start_node(NodeKind::FunctionCall);
        let name = self.bump_leaf(NodeKind::Identifier, Detail::None);
        self.builder.mark_field(Field::Name, name);
        let open = self.bump();

        if !self.at(TokenKind::CloseParen) {
            loop {
                if let Some(argument) = self.parse_expression() {
                    self.builder.mark_field(Field::Arguments, argument);
                }
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
        }

        if self.at(TokenKind::CloseParen) {
            self.bump();
        } else {
            self.unclosed(open, "`)`");
        }
        Some(self.builder.finish_node())
    }

    /// `[e, ...]` with an optional trailing comma
    fn parse_array(&mut self) -> Option<NodeId> {
        self.start_node(NodeKind::Array);
        let open = self.bump();
        loop {
            if self.at(TokenKind::CloseBracket) {
                self.bump();
                break;
            }
            self.parse_expression();
            if self.at(TokenKind::Comma) {
                self.bump();
                continue;
            }
            if self.at(TokenKind::CloseBracket) {
                self.bump();
                break;
            }
            self.unclosed(open, "`]`");
            break;
        }
        Some(self.builder.finish_node())
    }

    /// `{ key: value, ... }` with an optional trailing comma
    fn parse_object(&mut self) -> Option<NodeId> {
        self.start_node(NodeKind::Object);
        let open = self.bump();
        loop {
            if self.at(TokenKind::CloseBrace) {
                self.bump();
                break;
            }
            self.parse_object_field();
            if self.at(TokenKind::Comma) {
                self.bump();
                continue;
            }
            if self.at(TokenKind::CloseBrace) {
                self.bump();
                break;
            }
            self.unclosed(open, "`}`");
            break;
        }
        Some(self.builder.finish_node())
    }

    fn parse_object_field(&mut self) {
        let token = self.nth_token(0);
        let quoted = StringStyle::from_token(token.kind);
        let has_key = token.kind == TokenKind::Identifier
            || quoted.is_some()
            || (token.kind.is_keyword() && self.nth(1) == TokenKind::Colon);
        if !has_key {
            self.error_at(
                DiagnosticKind::Expected,
                token,
                format!("expected object key, found {}", token.kind.describe()),
            );
            if token.kind == TokenKind::Comma || self.at_sync() {
                return;
            }
        }

        self.start_node(NodeKind::ObjectField);
        match quoted {
            Some(style) => {
                let key = self.parse_string(style);
                self.builder.mark_field(Field::Key, key);
            }
            None if has_key => {
                let key = self.bump_leaf(NodeKind::Identifier, Detail::None);
                self.builder.mark_field(Field::Key, key);
            }
            None if token.kind != TokenKind::Colon => self.absorb_token(),
            None => {}
        }

        if self.at(TokenKind::Colon) {
            self.bump();
            if let Some(value) = self.parse_expression() {
                self.builder.mark_field(Field::Value, value);
            }
        } else {
            self.error_expected("`:`");
        }
        self.builder.finish_node();
    }
}
