//! Typed runbook model produced by lowering the syntax tree.
//! Constructs carry optional spans; hand-built models leave them empty.

use serde::Serialize;

use crate::Span;
use crate::tree::BinaryOp;

/// A lowered runbook document
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Runbook {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<AddonBlock>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signers: Vec<SignerBlock>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionBlock>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputBlock>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDecl>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputDecl>,
}

impl Runbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement_count(&self) -> usize {
        self.imports.len()
            + self.addons.len()
            + self.signers.len()
            + self.actions.len()
            + self.outputs.len()
            + self.variables.len()
            + self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statement_count() == 0
    }

    pub fn signer(&self, name: &str) -> Option<&SignerBlock> {
        self.signers.iter().find(|s| s.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&ActionBlock> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputBlock> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn input(&self, name: &str) -> Option<&InputDecl> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Copy of the model with every span cleared, for comparing models
    /// that came from different sources
    pub fn without_spans(&self) -> Runbook {
        let mut runbook = self.clone();
        for import in &mut runbook.imports {
            import.span = None;
        }
        for addon in &mut runbook.addons {
            addon.span = None;
            clear_spans(&mut addon.attributes);
        }
        for signer in &mut runbook.signers {
            signer.span = None;
            clear_spans(&mut signer.attributes);
        }
        for action in &mut runbook.actions {
            action.span = None;
            clear_spans(&mut action.attributes);
        }
        for output in &mut runbook.outputs {
            output.span = None;
            clear_spans(&mut output.attributes);
        }
        for variable in &mut runbook.variables {
            variable.span = None;
            clear_spans(&mut variable.attributes);
        }
        for input in &mut runbook.inputs {
            input.span = None;
        }
        runbook
    }
}

fn clear_spans(attributes: &mut [Attribute]) {
    for attribute in attributes {
        attribute.span = None;
    }
}

/// Statements whose body is a block of attributes
pub trait HasAttributes {
    fn attributes(&self) -> &[Attribute];

    /// First attribute named `name`
    fn get(&self, name: &str) -> Option<&Expression> {
        self.attributes()
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Import {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddonBlock {
    pub network: String,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignerBlock {
    pub name: String,
    pub signer_type: String,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionBlock {
    pub name: String,
    pub action_type: String,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputBlock {
    pub name: String,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDecl {
    pub name: String,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputDecl {
    pub name: String,
    pub value: Expression,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

macro_rules! impl_has_attributes {
    ($($ty:ty),*) => {
        $(impl HasAttributes for $ty {
            fn attributes(&self) -> &[Attribute] {
                &self.attributes
            }
        })*
    };
}

impl_has_attributes!(AddonBlock, SignerBlock, ActionBlock, OutputBlock, VariableDecl);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: Expression,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: Expression) -> Self {
        Self {
            name: name.into(),
            value,
            span: None,
        }
    }
}

/// A lowered attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Expression {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// Path segments, whichever separator joined them
    Reference(Vec<String>),
    Index {
        target: Vec<String>,
        index: Box<Expression>,
    },
    Array(Vec<Expression>),
    /// Fields in source order
    Object(Vec<(String, Expression)>),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

// Convenience constructors
impl Expression {
    pub fn string(s: impl Into<String>) -> Self {
        Expression::String(s.into())
    }

    pub fn reference(parts: &[&str]) -> Self {
        Expression::Reference(parts.iter().map(|s| s.to_string()).collect())
    }

    pub fn input_ref(name: &str) -> Self {
        Expression::reference(&["input", name])
    }

    pub fn action_ref(action: &str, field: &str) -> Self {
        Expression::reference(&["action", action, field])
    }

    pub fn function_call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expression::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&[String]> {
        match self {
            Expression::Reference(parts) => Some(parts),
            _ => None,
        }
    }

    /// Literal values need no evaluation context
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expression::String(_)
                | Expression::Integer(_)
                | Expression::Float(_)
                | Expression::Bool(_)
                | Expression::Null
        )
    }

    /// Whether every binary operand sits where precedence and left
    /// associativity would put it when printed without parentheses.
    /// Lowered models always do; hand-built ones may not.
    pub fn follows_precedence(&self) -> bool {
        match self {
            Expression::Binary { op, left, right } => {
                let left_ok = match left.as_ref() {
                    Expression::Binary { op: inner, .. } => inner.precedence() >= op.precedence(),
                    _ => true,
                };
                let right_ok = match right.as_ref() {
                    Expression::Binary { op: inner, .. } => inner.precedence() > op.precedence(),
                    _ => true,
                };
                left_ok && right_ok && left.follows_precedence() && right.follows_precedence()
            }
            Expression::Index { index, .. } => index.follows_precedence(),
            Expression::Array(items) => items.iter().all(Expression::follows_precedence),
            Expression::Object(fields) => fields.iter().all(|(_, v)| v.follows_precedence()),
            Expression::FunctionCall { args, .. } => args.iter().all(Expression::follows_precedence),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup() {
        let action = ActionBlock {
            name: "deploy".into(),
            action_type: "evm::deploy_contract".into(),
            attributes: vec![
                Attribute::new("signer", Expression::reference(&["signer", "deployer"])),
                Attribute::new("confirmations", Expression::Integer(1)),
            ],
            span: None,
        };
        assert_eq!(action.get("confirmations"), Some(&Expression::Integer(1)));
        assert_eq!(
            action.get("signer").and_then(Expression::as_reference),
            Some(&["signer".to_string(), "deployer".to_string()][..])
        );
        assert!(action.get("missing").is_none());
    }

    #[test]
    fn without_spans_clears_everything() {
        let runbook = Runbook {
            variables: vec![VariableDecl {
                name: "v".into(),
                attributes: vec![Attribute {
                    name: "value".into(),
                    value: Expression::Null,
                    span: Some(Span::new(13, 25)),
                }],
                span: Some(Span::new(0, 27)),
            }],
            imports: vec![Import {
                path: "a.tx".into(),
                span: Some(Span::new(28, 41)),
            }],
            ..Runbook::default()
        };
        let stripped = runbook.without_spans();
        assert_eq!(stripped.variables[0].span, None);
        assert_eq!(stripped.variables[0].attributes[0].span, None);
        assert_eq!(stripped.imports[0].span, None);
        assert_eq!(stripped.statement_count(), 2);
        assert_ne!(stripped, runbook);
    }

    #[test]
    fn expression_serializes_with_type_tag() {
        let json = serde_json::to_value(Expression::binary(
            BinaryOp::Add,
            Expression::Integer(1),
            Expression::input_ref("x"),
        ))
        .unwrap();
        assert_eq!(json["type"], "binary");
        assert_eq!(json["value"]["op"], "add");
        assert_eq!(json["value"]["left"]["value"], 1);
        assert_eq!(json["value"]["right"]["value"][0], "input");
    }
}
