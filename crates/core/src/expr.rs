//! # Names and Expressions
//!
//! Two renderings of the same tree:
//!
//! - the **structural name** of a derived entity, computed once at
//!   construction from its operands' names, and
//! - the **dependency expression**, rebuilt on demand with the minimum
//!   parentheses the operator precedence ladder requires.
//!
//! For `(A + B) * C` the name is `A + B * C`, while the expression is
//! `(A + B) * C`. Names are short labels; expressions are unambiguous.
//!
//! ## Parenthesisation
//!
//! A child expression is wrapped when it binds more loosely than its parent,
//! or when it binds equally, sits on the right, and the parent is not
//! associative (`A - (B - C)`). The root is never wrapped. Non-infix
//! operations render as calls, `label(a, b)`, and their arguments start a
//! fresh precedence context.

use std::collections::BTreeSet;

use crate::entity::{AnyEntity, EntityRef};
use crate::operator::{Operator, Precedence};

/// Which side of an infix parent a child sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// The infix operator a derived node renders with, if any.
fn infix(node: &dyn AnyEntity) -> Option<Operator> {
    match (node.operation(), node.operands().len()) {
        (Some(label), 2) => Operator::from_symbol(label),
        _ => None,
    }
}

/// The structural name of a derived entity over `operands`.
pub(crate) fn structural_name(operation: &str, operands: &[EntityRef]) -> String {
    match operands {
        [single] => format!("{}({})", operation, single.name()),
        [left, right] if Operator::from_symbol(operation).is_some() => {
            format!("{} {} {}", left.name(), operation, right.name())
        }
        _ => {
            let names: Vec<&str> = operands.iter().map(|operand| operand.name()).collect();
            format!("{}({})", operation, names.join(", "))
        }
    }
}

/// Render `node` as a minimally parenthesised expression.
pub fn dependency_expression(node: &dyn AnyEntity) -> String {
    render(node, None)
}

fn needs_parens(child: Precedence, parent: Operator, side: Side) -> bool {
    child < parent.precedence()
        || (child == parent.precedence() && side == Side::Right && !parent.is_associative())
}

fn render(node: &dyn AnyEntity, context: Option<(Operator, Side)>) -> String {
    if node.is_leaf() {
        return render_leaf(node);
    }

    let Some(op) = infix(node) else {
        let args: Vec<String> = node
            .operands()
            .iter()
            .map(|operand| render(operand.as_ref(), None))
            .collect();
        return format!(
            "{}({})",
            node.operation().unwrap_or_default(),
            args.join(", ")
        );
    };

    let operands = node.operands();
    let text = format!(
        "{} {} {}",
        render(operands[0].as_ref(), Some((op, Side::Left))),
        op.symbol(),
        render(operands[1].as_ref(), Some((op, Side::Right))),
    );
    match context {
        Some((parent, side)) if needs_parens(op.precedence(), parent, side) => {
            format!("({})", text)
        }
        _ => text,
    }
}

fn render_leaf(node: &dyn AnyEntity) -> String {
    match node.conditions() {
        [] => node.name().to_string(),
        [only] => format!("{} (when {})", node.name(), render(only.as_ref(), None)),
        many => {
            let joined: Vec<String> = many
                .iter()
                .map(|condition| render(condition.as_ref(), Some((Operator::And, Side::Left))))
                .collect();
            format!("{} (when {})", node.name(), joined.join(" & "))
        }
    }
}

/// Names of every leaf reachable from `node`, including leaves that only
/// appear inside scope conditions.
pub fn dependency_names(node: &dyn AnyEntity) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_names(node, &mut names);
    names
}

fn collect_names(node: &dyn AnyEntity, names: &mut BTreeSet<String>) {
    if node.is_leaf() {
        names.insert(node.name().to_string());
    }
    for operand in node.operands() {
        collect_names(operand.as_ref(), names);
    }
    for condition in node.conditions() {
        collect_names(condition.as_ref(), names);
    }
}
