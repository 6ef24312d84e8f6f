//! Visitor over the typed runbook model.
//!
//! Every method has a default that keeps walking, so an implementation only
//! overrides the nodes it cares about. Overrides that still want to descend
//! call the matching `walk_*` function.

use crate::semantic::{
    ActionBlock, AddonBlock, Attribute, Expression, HasAttributes, Import, InputDecl, OutputBlock,
    Runbook, SignerBlock, VariableDecl,
};

pub trait RunbookVisitor {
    fn visit_runbook(&mut self, runbook: &Runbook) {
        walk_runbook(self, runbook);
    }

    fn visit_import(&mut self, _import: &Import) {}

    fn visit_addon(&mut self, addon: &AddonBlock) {
        self.visit_attributes(addon.attributes());
    }

    fn visit_signer(&mut self, signer: &SignerBlock) {
        self.visit_attributes(signer.attributes());
    }

    fn visit_action(&mut self, action: &ActionBlock) {
        self.visit_attributes(action.attributes());
    }

    fn visit_output(&mut self, output: &OutputBlock) {
        self.visit_attributes(output.attributes());
    }

    fn visit_variable(&mut self, variable: &VariableDecl) {
        self.visit_attributes(variable.attributes());
    }

    fn visit_input(&mut self, input: &InputDecl) {
        self.visit_expression(&input.value);
    }

    fn visit_attributes(&mut self, attributes: &[Attribute]) {
        for attribute in attributes {
            self.visit_attribute(attribute);
        }
    }

    fn visit_attribute(&mut self, attribute: &Attribute) {
        self.visit_expression(&attribute.value);
    }

    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }

    fn visit_reference(&mut self, _parts: &[String]) {}
}

/// Visit every statement, category by category
pub fn walk_runbook<V: RunbookVisitor + ?Sized>(visitor: &mut V, runbook: &Runbook) {
    for import in &runbook.imports {
        visitor.visit_import(import);
    }
    for addon in &runbook.addons {
        visitor.visit_addon(addon);
    }
    for signer in &runbook.signers {
        visitor.visit_signer(signer);
    }
    for action in &runbook.actions {
        visitor.visit_action(action);
    }
    for output in &runbook.outputs {
        visitor.visit_output(output);
    }
    for variable in &runbook.variables {
        visitor.visit_variable(variable);
    }
    for input in &runbook.inputs {
        visitor.visit_input(input);
    }
}

/// Visit the sub-expressions of `expr`
pub fn walk_expression<V: RunbookVisitor + ?Sized>(visitor: &mut V, expr: &Expression) {
    match expr {
        Expression::Reference(parts) => visitor.visit_reference(parts),
        Expression::Index { target, index } => {
            visitor.visit_reference(target);
            visitor.visit_expression(index);
        }
        Expression::Array(items) => {
            for item in items {
                visitor.visit_expression(item);
            }
        }
        Expression::Object(fields) => {
            for (_, value) in fields {
                visitor.visit_expression(value);
            }
        }
        Expression::FunctionCall { args, .. } => {
            for arg in args {
                visitor.visit_expression(arg);
            }
        }
        Expression::Binary { left, right, .. } => {
            visitor.visit_expression(left);
            visitor.visit_expression(right);
        }
        Expression::String(_)
        | Expression::Integer(_)
        | Expression::Float(_)
        | Expression::Bool(_)
        | Expression::Null => {}
    }
}

#[derive(Default)]
struct ReferenceCollector {
    references: Vec<Vec<String>>,
}

impl RunbookVisitor for ReferenceCollector {
    fn visit_reference(&mut self, parts: &[String]) {
        self.references.push(parts.to_vec());
    }
}

/// Every reference path in the runbook, in visiting order
pub fn collect_references(runbook: &Runbook) -> Vec<Vec<String>> {
    let mut collector = ReferenceCollector::default();
    collector.visit_runbook(runbook);
    collector.references
}
