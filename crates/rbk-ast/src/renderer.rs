//! Render the typed model back to canonical runbook source

use std::fmt::{self, Write};

use crate::lexer::TokenKind;
use crate::semantic::{Attribute, Expression, Runbook};

/// Canonical source printer.
///
/// Statements come out grouped by category (imports, addons, signers,
/// actions, outputs, variables, inputs) separated by blank lines, one
/// attribute per line. Names are printed bare whenever they lex as a plain
/// identifier.
///
/// The language has no parentheses, so binary operands are printed as they
/// stand and never grouped. Output reparses to the same model only when
/// every expression satisfies [`Expression::follows_precedence`], which
/// holds for anything produced by lowering. A hand-built `(1 + 2) * 3`
/// prints as `1 + 2 * 3`.
pub struct RunbookRenderer {
    indent: String,
}

impl Default for RunbookRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RunbookRenderer {
    pub fn new() -> Self {
        Self {
            indent: "    ".to_string(),
        }
    }

    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
        }
    }

    pub fn render(&self, runbook: &Runbook) -> String {
        Rendered {
            renderer: self,
            runbook,
        }
        .to_string()
    }

    pub fn write_runbook<W: Write>(&self, out: &mut W, runbook: &Runbook) -> fmt::Result {
        let mut sep = Separator::default();
        for import in &runbook.imports {
            sep.next(out)?;
            out.write_str("import ")?;
            write_string(out, &import.path)?;
            out.write_char('\n')?;
        }
        for addon in &runbook.addons {
            sep.next(out)?;
            self.write_block(out, "addon", &[addon.network.as_str()], &addon.attributes)?;
        }
        for signer in &runbook.signers {
            sep.next(out)?;
            let names = [signer.name.as_str(), signer.signer_type.as_str()];
            self.write_block(out, "signer", &names, &signer.attributes)?;
        }
        for action in &runbook.actions {
            sep.next(out)?;
            let names = [action.name.as_str(), action.action_type.as_str()];
            self.write_block(out, "action", &names, &action.attributes)?;
        }
        for output in &runbook.outputs {
            sep.next(out)?;
            self.write_block(out, "output", &[output.name.as_str()], &output.attributes)?;
        }
        for variable in &runbook.variables {
            sep.next(out)?;
            self.write_block(out, "variable", &[variable.name.as_str()], &variable.attributes)?;
        }
        for input in &runbook.inputs {
            sep.next(out)?;
            out.write_str("input ")?;
            write_name(out, &input.name)?;
            out.write_str(" = ")?;
            write_expression(out, &input.value)?;
            out.write_char('\n')?;
        }
        Ok(())
    }

    fn write_block<W: Write>(
        &self,
        out: &mut W,
        keyword: &str,
        names: &[&str],
        attributes: &[Attribute],
    ) -> fmt::Result {
        out.write_str(keyword)?;
        for name in names {
            out.write_char(' ')?;
            write_name(out, name)?;
        }
        if attributes.is_empty() {
            return out.write_str(" {}\n");
        }
        out.write_str(" {\n")?;
        for attribute in attributes {
            write!(out, "{}{} = ", self.indent, attribute.name)?;
            write_expression(out, &attribute.value)?;
            out.write_char('\n')?;
        }
        out.write_str("}\n")
    }
}

struct Rendered<'a> {
    renderer: &'a RunbookRenderer,
    runbook: &'a Runbook,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.renderer.write_runbook(f, self.runbook)
    }
}

/// Blank line between statements
#[derive(Default)]
struct Separator {
    started: bool,
}

impl Separator {
    fn next<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        if self.started {
            out.write_char('\n')?;
        }
        self.started = true;
        Ok(())
    }
}

/// Expressions render inline in canonical form
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expression(f, self)
    }
}

pub fn write_expression<W: Write>(out: &mut W, expr: &Expression) -> fmt::Result {
    match expr {
        Expression::String(s) => write_string(out, s),
        Expression::Integer(n) => write!(out, "{n}"),
        // keep a fractional part so the literal lexes as a float again
        Expression::Float(n) if n.fract() == 0.0 && n.is_finite() => write!(out, "{n:.1}"),
        Expression::Float(n) => write!(out, "{n}"),
        Expression::Bool(b) => write!(out, "{b}"),
        Expression::Null => out.write_str("null"),
        Expression::Reference(parts) => out.write_str(&parts.join(".")),
        Expression::Index { target, index } => {
            write!(out, "{}[", target.join("."))?;
            write_expression(out, index)?;
            out.write_char(']')
        }
        Expression::Array(items) => {
            out.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_expression(out, item)?;
            }
            out.write_char(']')
        }
        Expression::Object(fields) => {
            if fields.is_empty() {
                return out.write_str("{}");
            }
            out.write_str("{ ")?;
            for (i, (key, value)) in fields.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_name(out, key)?;
                out.write_str(": ")?;
                write_expression(out, value)?;
            }
            out.write_str(" }")
        }
        Expression::FunctionCall { name, args } => {
            write!(out, "{name}(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_expression(out, arg)?;
            }
            out.write_char(')')
        }
        // no grouping syntax exists; see `Expression::follows_precedence`
        Expression::Binary { op, left, right } => {
            write_expression(out, left)?;
            write!(out, " {} ", op.symbol())?;
            write_expression(out, right)
        }
    }
}

/// Pick a delimiter that does not occur in the content
fn write_string<W: Write>(out: &mut W, content: &str) -> fmt::Result {
    let delimiter = if !content.contains('"') {
        "\""
    } else if !content.contains('\'') {
        "'"
    } else {
        "\"\"\""
    };
    write!(out, "{delimiter}{content}{delimiter}")
}

/// Bare when it lexes as an identifier, quoted otherwise
fn write_name<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    if is_bare_identifier(text) {
        out.write_str(text)
    } else {
        write_string(out, text)
    }
}

/// Whether `text` lexes as a single identifier token
fn is_bare_identifier(text: &str) -> bool {
    let mut bytes = text.bytes();
    let starts = bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_');
    starts
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        && TokenKind::keyword(text).is_none()
}
