//! # Native Kinds - The Built-in Fast Path
//!
//! Every value type declares a [`NativeKind`] once, as an associated
//! constant of [`Operand`]. Dispatch branches on that tag instead of
//! inspecting types at runtime:
//!
//! - a native kind is served directly by the type's `apply_native`,
//!   with no capability lookup;
//! - [`NativeKind::Other`] falls through to the capability table.
//!
//! | Kind | Types | Operators |
//! |------|-------|-----------|
//! | Integer | `i8`..`i128`, `u8`..`u128`, `isize`, `usize` | `+ - * /` (checked), ordering |
//! | Decimal | [`Rational64`] | `+ - * /` (checked, exact), ordering |
//! | Float | `f32`, `f64` | `+ - * /` (IEEE), ordering |
//! | Boolean | `bool` | `& \|`, ordering |
//! | Text | `String` | `+` (concatenation), ordering |

use std::cmp::Ordering;
use std::fmt;

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, Zero};

use crate::capability::Operand;
use crate::error::DomainError;
use crate::operator::Operator;

/// Tag describing how a value type's operators are implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Integer,
    Decimal,
    Float,
    Boolean,
    Text,
    /// Not built in; operators come from the type's capability table.
    Other,
}

impl NativeKind {
    pub fn is_native(self) -> bool {
        self != NativeKind::Other
    }

    /// Whether the built-in path implements `op` for this kind.
    ///
    /// Always `false` for [`NativeKind::Other`].
    pub fn supports(self, op: Operator) -> bool {
        use Operator::*;
        match self {
            NativeKind::Other => false,
            _ if op.is_comparison() => true,
            NativeKind::Integer | NativeKind::Decimal | NativeKind::Float => {
                matches!(op, Add | Subtract | Multiply | Divide)
            }
            NativeKind::Boolean => matches!(op, And | Or),
            NativeKind::Text => op == Add,
        }
    }
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeKind::Integer => "integer",
            NativeKind::Decimal => "decimal",
            NativeKind::Float => "float",
            NativeKind::Boolean => "boolean",
            NativeKind::Text => "text",
            NativeKind::Other => "other",
        };
        f.write_str(name)
    }
}

macro_rules! impl_integer_operand {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Operand for $ty {
                const KIND: NativeKind = NativeKind::Integer;

                fn apply_native(op: Operator, lhs: &Self, rhs: &Self) -> Option<Result<Self, DomainError>> {
                    let result = match op {
                        Operator::Add => <$ty>::checked_add(*lhs, *rhs),
                        Operator::Subtract => <$ty>::checked_sub(*lhs, *rhs),
                        Operator::Multiply => <$ty>::checked_mul(*lhs, *rhs),
                        Operator::Divide => {
                            if *rhs == 0 {
                                return Some(Err(DomainError::division_by_zero()));
                            }
                            <$ty>::checked_div(*lhs, *rhs)
                        }
                        _ => return None,
                    };
                    Some(result.ok_or_else(|| DomainError::overflow(op.symbol())))
                }

                fn order_native(lhs: &Self, rhs: &Self) -> Option<Ordering> {
                    Some(lhs.cmp(rhs))
                }
            }
        )*
    };
}

impl_integer_operand!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! impl_float_operand {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Operand for $ty {
                const KIND: NativeKind = NativeKind::Float;

                fn apply_native(op: Operator, lhs: &Self, rhs: &Self) -> Option<Result<Self, DomainError>> {
                    match op {
                        Operator::Add => Some(Ok(lhs + rhs)),
                        Operator::Subtract => Some(Ok(lhs - rhs)),
                        Operator::Multiply => Some(Ok(lhs * rhs)),
                        Operator::Divide => Some(Ok(lhs / rhs)),
                        _ => None,
                    }
                }

                fn order_native(lhs: &Self, rhs: &Self) -> Option<Ordering> {
                    lhs.partial_cmp(rhs)
                }
            }
        )*
    };
}

impl_float_operand!(f32, f64);

impl Operand for Rational64 {
    const KIND: NativeKind = NativeKind::Decimal;

    fn apply_native(op: Operator, lhs: &Self, rhs: &Self) -> Option<Result<Self, DomainError>> {
        let result = match op {
            Operator::Add => lhs.checked_add(rhs),
            Operator::Subtract => lhs.checked_sub(rhs),
            Operator::Multiply => lhs.checked_mul(rhs),
            Operator::Divide => {
                if rhs.is_zero() {
                    return Some(Err(DomainError::division_by_zero()));
                }
                lhs.checked_div(rhs)
            }
            _ => return None,
        };
        Some(result.ok_or_else(|| DomainError::overflow(op.symbol())))
    }

    fn order_native(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        Some(lhs.cmp(rhs))
    }
}

impl Operand for bool {
    const KIND: NativeKind = NativeKind::Boolean;

    fn apply_native(op: Operator, lhs: &Self, rhs: &Self) -> Option<Result<Self, DomainError>> {
        // Both sides are already resolved, so neither operator short-circuits.
        match op {
            Operator::And => Some(Ok(*lhs & *rhs)),
            Operator::Or => Some(Ok(*lhs | *rhs)),
            _ => None,
        }
    }

    fn order_native(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        Some(lhs.cmp(rhs))
    }
}

impl Operand for String {
    const KIND: NativeKind = NativeKind::Text;

    fn apply_native(op: Operator, lhs: &Self, rhs: &Self) -> Option<Result<Self, DomainError>> {
        match op {
            Operator::Add => {
                let mut joined = String::with_capacity(lhs.len() + rhs.len());
                joined.push_str(lhs);
                joined.push_str(rhs);
                Some(Ok(joined))
            }
            _ => None,
        }
    }

    fn order_native(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        Some(lhs.cmp(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(NativeKind::Decimal.to_string(), "decimal");
        assert_eq!(NativeKind::Other.to_string(), "other");
        assert_eq!(<bool as Operand>::KIND.to_string(), "boolean");
    }

    #[test]
    fn test_kind_support_table() {
        assert!(NativeKind::Integer.supports(Operator::Divide));
        assert!(!NativeKind::Integer.supports(Operator::And));
        assert!(NativeKind::Boolean.supports(Operator::Or));
        assert!(!NativeKind::Boolean.supports(Operator::Add));
        assert!(NativeKind::Text.supports(Operator::Add));
        assert!(!NativeKind::Text.supports(Operator::Subtract));
        assert!(NativeKind::Text.supports(Operator::Less));
        assert!(!NativeKind::Other.supports(Operator::Add));
    }

    #[test]
    fn test_integer_checked_arithmetic() {
        assert_eq!(i32::apply_native(Operator::Add, &2, &3), Some(Ok(5)));
        assert_eq!(
            i8::apply_native(Operator::Add, &i8::MAX, &1),
            Some(Err(DomainError::overflow("+")))
        );
        assert_eq!(
            i64::apply_native(Operator::Divide, &1, &0),
            Some(Err(DomainError::division_by_zero()))
        );
        assert_eq!(i64::apply_native(Operator::And, &1, &0), None);
    }

    #[test]
    fn test_decimal_is_exact() {
        let third = Rational64::new(1, 3);
        let sum = Rational64::apply_native(Operator::Add, &third, &third)
            .unwrap()
            .unwrap();
        assert_eq!(sum, Rational64::new(2, 3));
    }

    #[test]
    fn test_text_concatenation() {
        let joined =
            String::apply_native(Operator::Add, &"foo".to_string(), &"bar".to_string());
        assert_eq!(joined, Some(Ok("foobar".to_string())));
    }

    #[test]
    fn test_float_nan_is_unordered() {
        assert_eq!(f64::order_native(&f64::NAN, &1.0), None);
        assert_eq!(f64::order_native(&2.0, &1.0), Some(Ordering::Greater));
    }
}
