//! Semantic parser - lowers the syntax tree into the typed runbook model

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::Span;
use crate::error::Diagnostic;
use crate::parser;
use crate::semantic::{
    ActionBlock, AddonBlock, Attribute, Expression, Import, InputDecl, OutputBlock, Runbook,
    SignerBlock, VariableDecl,
};
use crate::tree::{Detail, Field, NodeKind, NodeRef, NumberForm, Tree};

/// Problems found while lowering; the offending construct is left out
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("integer literal `{text}` does not fit in 64 bits")]
    NumberOutOfRange { text: String, span: Span },
    #[error("duplicate attribute `{name}`; the first definition is kept")]
    DuplicateAttribute { name: String, span: Span, first: Span },
    #[error("skipped malformed {construct}")]
    Malformed {
        construct: &'static str,
        span: Span,
    },
}

impl LowerError {
    pub fn span(&self) -> Span {
        match self {
            LowerError::NumberOutOfRange { span, .. }
            | LowerError::DuplicateAttribute { span, .. }
            | LowerError::Malformed { span, .. } => *span,
        }
    }
}

/// Any problem reported by [`parse_runbook`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunbookError {
    #[error(transparent)]
    Syntax(#[from] Diagnostic),
    #[error(transparent)]
    Lower(#[from] LowerError),
}

impl RunbookError {
    pub fn span(&self) -> Span {
        match self {
            RunbookError::Syntax(d) => d.span,
            RunbookError::Lower(e) => e.span(),
        }
    }
}

/// Parse and lower a runbook source file, collecting every problem.
///
/// Syntax diagnostics come first, then lowering errors.
pub fn parse_runbook(source: &str) -> (Runbook, Vec<RunbookError>) {
    let parse = parser::parse(source);
    let (runbook, lower_errors) = lower(&parse.tree);
    let errors = parse
        .diagnostics
        .into_iter()
        .map(RunbookError::from)
        .chain(lower_errors.into_iter().map(RunbookError::from))
        .collect();
    (runbook, errors)
}

/// Lower a syntax tree into the typed model
pub fn lower(tree: &Tree) -> (Runbook, Vec<LowerError>) {
    let mut ctx = Context::default();
    for statement in tree.root().semantic_children() {
        ctx.lower_statement(statement);
    }
    debug!(
        statements = ctx.runbook.statement_count(),
        errors = ctx.errors.len(),
        "lowered runbook"
    );
    (ctx.runbook, ctx.errors)
}

#[derive(Default)]
struct Context {
    runbook: Runbook,
    errors: Vec<LowerError>,
}

impl Context {
    fn lower_statement(&mut self, node: NodeRef<'_>) {
        let span = Some(node.span());
        match node.kind() {
            NodeKind::AddonBlock => {
                let Some(network) = self.name(node, Field::Network, "addon block") else {
                    return;
                };
                let attributes = self.block(node, "addon block");
                if let Some(attributes) = attributes {
                    self.runbook.addons.push(AddonBlock {
                        network,
                        attributes,
                        span,
                    });
                }
            }
            NodeKind::SignerBlock => {
                let (Some(name), Some(signer_type)) = (
                    self.name(node, Field::Name, "signer block"),
                    self.name(node, Field::Type, "signer block"),
                ) else {
                    return;
                };
                if let Some(attributes) = self.block(node, "signer block") {
                    self.runbook.signers.push(SignerBlock {
                        name,
                        signer_type,
                        attributes,
                        span,
                    });
                }
            }
            NodeKind::ActionBlock => {
                let (Some(name), Some(action_type)) = (
                    self.name(node, Field::Name, "action block"),
                    self.name(node, Field::Type, "action block"),
                ) else {
                    return;
                };
                if let Some(attributes) = self.block(node, "action block") {
                    self.runbook.actions.push(ActionBlock {
                        name,
                        action_type,
                        attributes,
                        span,
                    });
                }
            }
            NodeKind::OutputBlock => {
                let Some(name) = self.name(node, Field::Name, "output block") else {
                    return;
                };
                if let Some(attributes) = self.block(node, "output block") {
                    self.runbook.outputs.push(OutputBlock {
                        name,
                        attributes,
                        span,
                    });
                }
            }
            NodeKind::VariableDecl => {
                let Some(name) = self.name(node, Field::Name, "variable declaration") else {
                    return;
                };
                if let Some(attributes) = self.block(node, "variable declaration") {
                    self.runbook.variables.push(VariableDecl {
                        name,
                        attributes,
                        span,
                    });
                }
            }
            NodeKind::InputDecl => {
                let Some(name) = self.name(node, Field::Name, "input declaration") else {
                    return;
                };
                let Some(value) = node.field(Field::Value).filter(|_| !has_error(node)) else {
                    self.malformed("input declaration", node);
                    return;
                };
                match lower_expression(value) {
                    Ok(value) => self.runbook.inputs.push(InputDecl { name, value, span }),
                    Err(e) => self.errors.push(e),
                }
            }
            NodeKind::ImportStmt => match node.field(Field::Path).and_then(|p| p.string_value()) {
                Some(path) => self.runbook.imports.push(Import {
                    path: path.to_string(),
                    span,
                }),
                None => self.malformed("import statement", node),
            },
            _ => self.malformed("statement", node),
        }
    }

    /// Text of a name slot, bare or quoted
    fn name(&mut self, node: NodeRef<'_>, field: Field, construct: &'static str) -> Option<String> {
        let name = node.field(field).and_then(|n| match n.kind() {
            NodeKind::Identifier => Some(n.text()),
            NodeKind::String => n.string_value(),
            _ => None,
        });
        if name.is_none() {
            self.malformed(construct, node);
        }
        name.map(str::to_string)
    }

    /// Attributes of the statement's `config` block
    fn block(&mut self, node: NodeRef<'_>, construct: &'static str) -> Option<Vec<Attribute>> {
        let Some(block) = node.field(Field::Config) else {
            self.malformed(construct, node);
            return None;
        };

        let mut attributes: Vec<Attribute> = Vec::new();
        let mut seen: HashMap<String, Span> = HashMap::new();
        for child in block.semantic_children() {
            let Some(attribute) = self.attribute(child) else {
                continue;
            };
            let span = child.span();
            if let Some(&first) = seen.get(&attribute.name) {
                self.errors.push(LowerError::DuplicateAttribute {
                    name: attribute.name,
                    span,
                    first,
                });
                continue;
            }
            seen.insert(attribute.name.clone(), span);
            attributes.push(attribute);
        }
        Some(attributes)
    }

    fn attribute(&mut self, node: NodeRef<'_>) -> Option<Attribute> {
        if node.kind() != NodeKind::Attribute {
            self.malformed("attribute", node);
            return None;
        }
        let (Some(name), Some(value)) = (node.field(Field::Name), node.field(Field::Value)) else {
            self.malformed("attribute", node);
            return None;
        };
        if has_error(node) {
            self.malformed("attribute", node);
            return None;
        }
        match lower_expression(value) {
            Ok(value) => Some(Attribute {
                name: name.text().to_string(),
                value,
                span: Some(node.span()),
            }),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    fn malformed(&mut self, construct: &'static str, node: NodeRef<'_>) {
        self.errors.push(malformed(construct, node));
    }
}

fn malformed(construct: &'static str, node: NodeRef<'_>) -> LowerError {
    LowerError::Malformed {
        construct,
        span: node.span(),
    }
}

fn has_error(node: NodeRef<'_>) -> bool {
    node.semantic_children().any(|c| c.kind() == NodeKind::Error)
}

/// Lower one expression node; any Error node inside spoils the whole value
pub fn lower_expression(node: NodeRef<'_>) -> Result<Expression, LowerError> {
    if has_error(node) {
        return Err(malformed("expression", node));
    }

    let expr = match node.kind() {
        NodeKind::String => Expression::String(node.string_value().unwrap_or_default().to_string()),
        NodeKind::Number => lower_number(node)?,
        NodeKind::Boolean => Expression::Bool(node.text() == "true"),
        NodeKind::Null => Expression::Null,
        NodeKind::Reference => Expression::Reference(segments(node)),
        NodeKind::IndexAccess => {
            let (Some(target), Some(index)) = (node.field(Field::Target), node.field(Field::Index))
            else {
                return Err(malformed("index access", node));
            };
            Expression::Index {
                target: segments(target),
                index: Box::new(lower_expression(index)?),
            }
        }
        NodeKind::Array => Expression::Array(
            node.semantic_children()
                .map(lower_expression)
                .collect::<Result<_, _>>()?,
        ),
        NodeKind::Object => {
            let mut fields = Vec::new();
            for field in node.semantic_children() {
                let (Some(key), Some(value)) = (field.field(Field::Key), field.field(Field::Value))
                else {
                    return Err(malformed("object field", field));
                };
                let key = match key.kind() {
                    NodeKind::String => key.string_value().unwrap_or_default(),
                    _ => key.text(),
                };
                fields.push((key.to_string(), lower_expression(value)?));
            }
            Expression::Object(fields)
        }
        NodeKind::FunctionCall => {
            let Some(name) = node.field(Field::Name) else {
                return Err(malformed("function call", node));
            };
            let args = node
                .fields(Field::Arguments)
                .map(lower_expression)
                .collect::<Result<_, _>>()?;
            Expression::FunctionCall {
                name: name.text().to_string(),
                args,
            }
        }
        NodeKind::BinaryExpr => {
            let (Some(op), Some(left), Some(right)) = (
                node.operator(),
                node.field(Field::Left),
                node.field(Field::Right),
            ) else {
                return Err(malformed("binary expression", node));
            };
            Expression::binary(op, lower_expression(left)?, lower_expression(right)?)
        }
        _ => return Err(malformed("expression", node)),
    };
    Ok(expr)
}

fn lower_number(node: NodeRef<'_>) -> Result<Expression, LowerError> {
    let text = node.text();
    let out_of_range = || LowerError::NumberOutOfRange {
        text: text.to_string(),
        span: node.span(),
    };
    match node.detail() {
        Detail::Number(NumberForm::Hex) => i64::from_str_radix(&text[2..], 16)
            .map(Expression::Integer)
            .map_err(|_| out_of_range()),
        Detail::Number(NumberForm::Float) => text
            .parse::<f64>()
            .map(Expression::Float)
            .map_err(|_| malformed("number", node)),
        _ => text
            .parse::<i64>()
            .map(Expression::Integer)
            .map_err(|_| out_of_range()),
    }
}

fn segments(reference: NodeRef<'_>) -> Vec<String> {
    reference
        .semantic_children()
        .filter(|s| s.kind() == NodeKind::Identifier)
        .map(|s| s.text().to_string())
        .collect()
}
