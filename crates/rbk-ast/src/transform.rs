//! Rewriting passes over the typed runbook model.
//!
//! The by-value counterpart of [`RunbookVisitor`](crate::RunbookVisitor):
//! every method takes a node and returns its replacement. Defaults rebuild
//! the node from its transformed children.

use std::collections::HashMap;

use tracing::debug;

use crate::semantic::{
    ActionBlock, AddonBlock, Attribute, Expression, Import, InputDecl, OutputBlock, Runbook,
    SignerBlock, VariableDecl,
};

pub trait RunbookTransform {
    fn transform_runbook(&mut self, runbook: Runbook) -> Runbook {
        walk_runbook(self, runbook)
    }

    fn transform_import(&mut self, import: Import) -> Import {
        import
    }

    fn transform_addon(&mut self, mut addon: AddonBlock) -> AddonBlock {
        addon.attributes = self.transform_attributes(addon.attributes);
        addon
    }

    fn transform_signer(&mut self, mut signer: SignerBlock) -> SignerBlock {
        signer.attributes = self.transform_attributes(signer.attributes);
        signer
    }

    fn transform_action(&mut self, mut action: ActionBlock) -> ActionBlock {
        action.attributes = self.transform_attributes(action.attributes);
        action
    }

    fn transform_output(&mut self, mut output: OutputBlock) -> OutputBlock {
        output.attributes = self.transform_attributes(output.attributes);
        output
    }

    fn transform_variable(&mut self, mut variable: VariableDecl) -> VariableDecl {
        variable.attributes = self.transform_attributes(variable.attributes);
        variable
    }

    fn transform_input(&mut self, mut input: InputDecl) -> InputDecl {
        input.value = self.transform_expression(input.value);
        input
    }

    fn transform_attributes(&mut self, attributes: Vec<Attribute>) -> Vec<Attribute> {
        attributes
            .into_iter()
            .map(|attribute| self.transform_attribute(attribute))
            .collect()
    }

    fn transform_attribute(&mut self, mut attribute: Attribute) -> Attribute {
        attribute.value = self.transform_expression(attribute.value);
        attribute
    }

    fn transform_expression(&mut self, expr: Expression) -> Expression {
        walk_expression(self, expr)
    }
}

/// Transform every statement, category by category
pub fn walk_runbook<T: RunbookTransform + ?Sized>(transform: &mut T, runbook: Runbook) -> Runbook {
    let Runbook {
        imports,
        addons,
        signers,
        actions,
        outputs,
        variables,
        inputs,
    } = runbook;
    Runbook {
        imports: imports.into_iter().map(|i| transform.transform_import(i)).collect(),
        addons: addons.into_iter().map(|a| transform.transform_addon(a)).collect(),
        signers: signers.into_iter().map(|s| transform.transform_signer(s)).collect(),
        actions: actions.into_iter().map(|a| transform.transform_action(a)).collect(),
        outputs: outputs.into_iter().map(|o| transform.transform_output(o)).collect(),
        variables: variables
            .into_iter()
            .map(|v| transform.transform_variable(v))
            .collect(),
        inputs: inputs.into_iter().map(|i| transform.transform_input(i)).collect(),
    }
}

/// Rebuild `expr` from its transformed sub-expressions
pub fn walk_expression<T: RunbookTransform + ?Sized>(transform: &mut T, expr: Expression) -> Expression {
    match expr {
        Expression::Index { target, index } => Expression::Index {
            target,
            index: Box::new(transform.transform_expression(*index)),
        },
        Expression::Array(items) => Expression::Array(
            items
                .into_iter()
                .map(|item| transform.transform_expression(item))
                .collect(),
        ),
        Expression::Object(fields) => Expression::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, transform.transform_expression(value)))
                .collect(),
        ),
        Expression::FunctionCall { name, args } => Expression::FunctionCall {
            name,
            args: args
                .into_iter()
                .map(|arg| transform.transform_expression(arg))
                .collect(),
        },
        Expression::Binary { op, left, right } => Expression::Binary {
            op,
            left: Box::new(transform.transform_expression(*left)),
            right: Box::new(transform.transform_expression(*right)),
        },
        leaf @ (Expression::String(_)
        | Expression::Integer(_)
        | Expression::Float(_)
        | Expression::Bool(_)
        | Expression::Null
        | Expression::Reference(_)) => leaf,
    }
}

/// Replaces `input.<name>` references with known values.
///
/// A reference with further segments (`input.<name>.field`) is replaced
/// by the value of `<name>` as a whole. Index targets are paths and are
/// left alone.
#[derive(Debug, Clone, Default)]
pub struct InputSubstitution {
    values: HashMap<String, Expression>,
}

impl InputSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal values declared by the runbook's own `input` statements
    pub fn from_runbook(runbook: &Runbook) -> Self {
        let values: HashMap<_, _> = runbook
            .inputs
            .iter()
            .filter(|input| input.value.is_literal())
            .map(|input| (input.name.clone(), input.value.clone()))
            .collect();
        debug!(inputs = values.len(), "collected literal inputs");
        Self { values }
    }

    pub fn add_input(&mut self, name: impl Into<String>, value: impl Into<Expression>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.add_input(name, value);
        self
    }

    pub fn apply(&mut self, runbook: Runbook) -> Runbook {
        self.transform_runbook(runbook)
    }
}

impl RunbookTransform for InputSubstitution {
    fn transform_expression(&mut self, expr: Expression) -> Expression {
        let known = match &expr {
            Expression::Reference(parts) => match parts.as_slice() {
                [head, name, ..] if head == "input" => self.values.get(name),
                _ => None,
            },
            _ => None,
        };
        match known {
            Some(value) => value.clone(),
            None => walk_expression(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RunbookBuilder;
    use crate::semantic::HasAttributes;
    use crate::semantic_parser::parse_runbook;
    use crate::tree::BinaryOp;

    #[test]
    fn substitutes_literal_inputs() {
        let (runbook, errors) = parse_runbook(
            r#"
input chain = 11155111
input key = env("PRIVATE_KEY")
addon evm { chain_id = input.chain }
signer deployer evm_secret_key { secret_key = input.key }
action send evm_send {
    amount = [input.chain * 2, f(input.chain), { c: input.chain.id }]
    other = input.missing
    pick = list[input.chain]
}
"#,
        );
        assert!(errors.is_empty(), "{errors:?}");

        let mut substitution = InputSubstitution::from_runbook(&runbook);
        let runbook = substitution.apply(runbook);
        let chain = Expression::Integer(11155111);

        assert_eq!(runbook.addons[0].get("chain_id"), Some(&chain));
        // non-literal inputs are not collected
        assert_eq!(
            runbook.signer("deployer").unwrap().get("secret_key"),
            Some(&Expression::input_ref("key"))
        );
        let action = runbook.action("send").unwrap();
        assert_eq!(
            action.get("amount"),
            Some(&Expression::Array(vec![
                Expression::binary(BinaryOp::Mul, chain.clone(), Expression::Integer(2)),
                Expression::function_call("f", vec![chain.clone()]),
                Expression::Object(vec![("c".into(), chain.clone())]),
            ]))
        );
        assert_eq!(action.get("other"), Some(&Expression::input_ref("missing")));
        assert_eq!(
            action.get("pick"),
            Some(&Expression::Index {
                target: vec!["list".into()],
                index: Box::new(chain),
            })
        );
    }

    #[test]
    fn explicit_values_override_declared_ones() {
        let runbook = RunbookBuilder::new()
            .input("amount", 1)
            .output("o")
            .value(Expression::input_ref("amount"))
            .done()
            .build();
        let mut substitution = InputSubstitution::from_runbook(&runbook).with_input("amount", 5);
        let runbook = substitution.apply(runbook);
        assert_eq!(
            runbook.output("o").unwrap().get("value"),
            Some(&Expression::Integer(5))
        );
    }

    #[test]
    fn overrides_rewrite_and_keep_walking() {
        struct Scale(i64);

        impl RunbookTransform for Scale {
            fn transform_import(&mut self, mut import: Import) -> Import {
                import.path = format!("lib/{}", import.path);
                import
            }

            fn transform_expression(&mut self, expr: Expression) -> Expression {
                match expr {
                    Expression::Integer(n) => Expression::Integer(n * self.0),
                    other => walk_expression(self, other),
                }
            }
        }

        let runbook = RunbookBuilder::new()
            .import("shared.tx")
            .variable("v")
            .value(vec![Expression::from(1), Expression::function_call("f", vec![2.into()])])
            .done()
            .input("n", Expression::binary(BinaryOp::Add, 3.into(), "x".into()))
            .build();
        let runbook = Scale(10).transform_runbook(runbook);

        assert_eq!(runbook.imports[0].path, "lib/shared.tx");
        assert_eq!(
            runbook.variable("v").unwrap().get("value"),
            Some(&Expression::Array(vec![
                Expression::Integer(10),
                Expression::function_call("f", vec![Expression::Integer(20)]),
            ]))
        );
        assert_eq!(
            runbook.input("n").unwrap().value,
            Expression::binary(BinaryOp::Add, Expression::Integer(30), Expression::string("x"))
        );
    }
}
