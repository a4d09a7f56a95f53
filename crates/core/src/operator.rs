//! # Operators
//!
//! The closed set of binary operators an entity graph can contain. Each
//! operator knows its rendered symbol, its binding strength, and which
//! capability a value type needs in order to support it.
//!
//! | Operator | Symbol | Precedence | Capability |
//! |----------|--------|------------|------------|
//! | Multiply, Divide | `*` `/` | 6 | `Multiplicable`, `Dividable` |
//! | Add, Subtract | `+` `-` | 5 | `Addable`, `Subtractable` |
//! | Greater, Less, GreaterOrEqual, LessOrEqual | `>` `<` `>=` `<=` | 4 | `Ord` |
//! | Equal, NotEqual | `==` `!=` | 3 | (always legal) |
//! | And | `&` | 2 | `Logical` |
//! | Or | `\|` | 1 | `Logical` |

use std::fmt;

/// Binding strength of an infix operator. Higher binds tighter.
pub type Precedence = u8;

/// A binary operator recognised by dispatch and by the expression renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    And,
    Or,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 12] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
        Operator::And,
        Operator::Or,
        Operator::Equal,
        Operator::NotEqual,
        Operator::Greater,
        Operator::Less,
        Operator::GreaterOrEqual,
        Operator::LessOrEqual,
    ];

    /// The literal symbol used as the derived entity's operation label.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::And => "&",
            Operator::Or => "|",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
        }
    }

    /// Look an operator up by its symbol.
    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    pub fn precedence(self) -> Precedence {
        match self {
            Operator::Multiply | Operator::Divide => 6,
            Operator::Add | Operator::Subtract => 5,
            Operator::Greater
            | Operator::Less
            | Operator::GreaterOrEqual
            | Operator::LessOrEqual => 4,
            Operator::Equal | Operator::NotEqual => 3,
            Operator::And => 2,
            Operator::Or => 1,
        }
    }

    /// Whether `a op (b op c)` equals `(a op b) op c`.
    ///
    /// Non-associative operators force parentheses around a right operand
    /// of equal precedence.
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Multiply | Operator::And | Operator::Or
        )
    }

    /// Comparison operators produce `bool` regardless of operand type.
    pub fn is_comparison(self) -> bool {
        self.precedence() == 3 || self.precedence() == 4
    }

    /// Name of the capability a value type implements to support this operator.
    pub fn capability(self) -> &'static str {
        match self {
            Operator::Add => "Addable",
            Operator::Subtract => "Subtractable",
            Operator::Multiply => "Multiplicable",
            Operator::Divide => "Dividable",
            Operator::And | Operator::Or => "Logical",
            Operator::Equal | Operator::NotEqual => "PartialEq",
            Operator::Greater
            | Operator::Less
            | Operator::GreaterOrEqual
            | Operator::LessOrEqual => "Ord",
        }
    }

    /// Name of the `Capabilities` builder method that registers the capability.
    pub fn registration(self) -> &'static str {
        match self {
            Operator::Add => "addable",
            Operator::Subtract => "subtractable",
            Operator::Multiply => "multiplicable",
            Operator::Divide => "dividable",
            Operator::And | Operator::Or => "logical",
            Operator::Equal | Operator::NotEqual => "equatable",
            Operator::Greater
            | Operator::Less
            | Operator::GreaterOrEqual
            | Operator::LessOrEqual => "orderable",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
