//! Fluent construction of runbook models in code

use crate::semantic::{
    ActionBlock, AddonBlock, Attribute, Expression, Import, InputDecl, OutputBlock, Runbook,
    SignerBlock, VariableDecl,
};

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Integer(value)
    }
}

impl From<i32> for Expression {
    fn from(value: i32) -> Self {
        Expression::Integer(value.into())
    }
}

impl From<u32> for Expression {
    fn from(value: u32) -> Self {
        Expression::Integer(value.into())
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Float(value)
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Bool(value)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::String(value.to_string())
    }
}

impl From<String> for Expression {
    fn from(value: String) -> Self {
        Expression::String(value)
    }
}

impl From<Vec<Expression>> for Expression {
    fn from(items: Vec<Expression>) -> Self {
        Expression::Array(items)
    }
}

/// Builds a [`Runbook`] statement by statement.
///
/// Block builders return to the runbook builder with `done()`. Setting an
/// attribute twice keeps the last value in the first position, so built
/// models never carry duplicates.
///
/// ```
/// use rbk_ast::RunbookBuilder;
///
/// let runbook = RunbookBuilder::new()
///     .addon("evm")
///     .chain_id(1)
///     .done()
///     .action("send", "evm::send_eth")
///     .signer("deployer")
///     .amount(1000)
///     .done()
///     .build();
/// assert_eq!(runbook.statement_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RunbookBuilder {
    runbook: Runbook,
}

impl RunbookBuilder {
    pub fn new() -> Self {
        Self {
            runbook: Runbook::new(),
        }
    }

    pub fn import(mut self, path: impl Into<String>) -> Self {
        self.runbook.imports.push(Import {
            path: path.into(),
            span: None,
        });
        self
    }

    pub fn addon(self, network: impl Into<String>) -> AddonBuilder {
        AddonBuilder {
            parent: self,
            block: AddonBlock {
                network: network.into(),
                attributes: Vec::new(),
                span: None,
            },
        }
    }

    pub fn signer(self, name: impl Into<String>, signer_type: impl Into<String>) -> SignerBuilder {
        SignerBuilder {
            parent: self,
            block: SignerBlock {
                name: name.into(),
                signer_type: signer_type.into(),
                attributes: Vec::new(),
                span: None,
            },
        }
    }

    pub fn action(self, name: impl Into<String>, action_type: impl Into<String>) -> ActionBuilder {
        ActionBuilder {
            parent: self,
            block: ActionBlock {
                name: name.into(),
                action_type: action_type.into(),
                attributes: Vec::new(),
                span: None,
            },
        }
    }

    pub fn output(self, name: impl Into<String>) -> OutputBuilder {
        OutputBuilder {
            parent: self,
            block: OutputBlock {
                name: name.into(),
                attributes: Vec::new(),
                span: None,
            },
        }
    }

    pub fn variable(self, name: impl Into<String>) -> VariableBuilder {
        VariableBuilder {
            parent: self,
            block: VariableDecl {
                name: name.into(),
                attributes: Vec::new(),
                span: None,
            },
        }
    }

    pub fn input(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.runbook.inputs.push(InputDecl {
            name: name.into(),
            value: value.into(),
            span: None,
        });
        self
    }

    pub fn build(self) -> Runbook {
        self.runbook
    }
}

fn set_attribute(attributes: &mut Vec<Attribute>, name: String, value: Expression) {
    match attributes.iter_mut().find(|a| a.name == name) {
        Some(existing) => existing.value = value,
        None => attributes.push(Attribute::new(name, value)),
    }
}

macro_rules! block_builder {
    ($($builder:ident($block:ty) => $list:ident),* $(,)?) => {
        $(
            #[derive(Debug)]
            pub struct $builder {
                parent: RunbookBuilder,
                block: $block,
            }

            impl $builder {
                pub fn attr(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
                    set_attribute(&mut self.block.attributes, name.into(), value.into());
                    self
                }

                /// Finish the block and return to the runbook
                pub fn done(mut self) -> RunbookBuilder {
                    self.parent.runbook.$list.push(self.block);
                    self.parent
                }
            }
        )*
    };
}

block_builder! {
    AddonBuilder(AddonBlock) => addons,
    SignerBuilder(SignerBlock) => signers,
    ActionBuilder(ActionBlock) => actions,
    OutputBuilder(OutputBlock) => outputs,
    VariableBuilder(VariableDecl) => variables,
}

impl AddonBuilder {
    pub fn chain_id(self, value: impl Into<Expression>) -> Self {
        self.attr("chain_id", value)
    }

    pub fn rpc_url(self, value: impl Into<Expression>) -> Self {
        self.attr("rpc_api_url", value)
    }
}

impl SignerBuilder {
    pub fn secret_key(self, value: impl Into<Expression>) -> Self {
        self.attr("secret_key", value)
    }
}

impl ActionBuilder {
    /// `signer = signer.<name>`
    pub fn signer(self, name: &str) -> Self {
        self.attr("signer", Expression::reference(&["signer", name]))
    }

    pub fn recipient_address(self, value: impl Into<Expression>) -> Self {
        self.attr("recipient_address", value)
    }

    pub fn amount(self, value: impl Into<Expression>) -> Self {
        self.attr("amount", value)
    }

    pub fn confirmations(self, value: impl Into<Expression>) -> Self {
        self.attr("confirmations", value)
    }
}

impl OutputBuilder {
    pub fn value(self, value: impl Into<Expression>) -> Self {
        self.attr("value", value)
    }

    pub fn description(self, text: &str) -> Self {
        self.attr("description", text)
    }
}

impl VariableBuilder {
    pub fn value(self, value: impl Into<Expression>) -> Self {
        self.attr("value", value)
    }

    pub fn description(self, text: &str) -> Self {
        self.attr("description", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::HasAttributes;

    #[test]
    fn builds_every_statement_kind() {
        let runbook = RunbookBuilder::new()
            .import("shared.tx")
            .addon("evm")
            .chain_id(11155111)
            .rpc_url("http://localhost:8545")
            .done()
            .signer("deployer", "evm::secret_key")
            .secret_key(Expression::input_ref("private_key"))
            .done()
            .action("transfer", "evm::send_eth")
            .signer("deployer")
            .recipient_address("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb")
            .amount(1.5)
            .confirmations(1u32)
            .done()
            .output("tx_hash")
            .value(Expression::action_ref("transfer", "tx_hash"))
            .description("hash of the transfer")
            .done()
            .variable("fees")
            .value(vec![Expression::from(1), Expression::from(2)])
            .done()
            .input("private_key", Expression::function_call("env", vec!["KEY".into()]))
            .build();

        assert_eq!(runbook.statement_count(), 7);
        assert_eq!(runbook.imports[0].path, "shared.tx");
        assert_eq!(
            runbook.addons[0].get("chain_id"),
            Some(&Expression::Integer(11155111))
        );
        assert_eq!(
            runbook.addons[0].get("rpc_api_url").and_then(Expression::as_str),
            Some("http://localhost:8545")
        );
        let action = runbook.action("transfer").unwrap();
        assert_eq!(action.action_type, "evm::send_eth");
        assert_eq!(
            action.get("signer"),
            Some(&Expression::reference(&["signer", "deployer"]))
        );
        assert_eq!(action.get("amount"), Some(&Expression::Float(1.5)));
        assert_eq!(action.get("confirmations"), Some(&Expression::Integer(1)));
        assert_eq!(
            runbook.variable("fees").unwrap().get("value"),
            Some(&Expression::Array(vec![Expression::Integer(1), Expression::Integer(2)]))
        );
        assert!(runbook.output("tx_hash").unwrap().attributes.iter().all(|a| a.span.is_none()));
    }

    #[test]
    fn setting_an_attribute_twice_replaces_it_in_place() {
        let runbook = RunbookBuilder::new()
            .variable("v")
            .value(1)
            .description("first")
            .value(true)
            .done()
            .build();
        let names: Vec<_> = runbook.variables[0]
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["value", "description"]);
        assert_eq!(
            runbook.variable("v").unwrap().get("value"),
            Some(&Expression::Bool(true))
        );
    }

    #[test]
    fn empty_builder_is_empty_runbook() {
        let runbook = RunbookBuilder::new().build();
        assert!(runbook.is_empty());
        assert_eq!(runbook, Runbook::default());
    }
}
