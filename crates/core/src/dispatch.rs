//! # Operator Dispatch
//!
//! Building `a + b` never computes anything. Dispatch does three things,
//! all at construction time:
//!
//! 1. **Null guard.** A missing operand fails with `ArgumentNull`.
//! 2. **Strategy selection.** Native kinds use their built-in arithmetic;
//!    every other type must have registered the matching capability.
//!    Failing either check is `UnsupportedOperation`, naming the operator,
//!    the type, and the capability to implement.
//! 3. **Wiring.** A derived entity is created whose closure resolves both
//!    operands and applies the chosen strategy on every `resolve()`.
//!
//! Comparisons always produce an `Entity<bool>`. Equality needs only
//! `PartialEq`; the relational operators need an ordering.
//!
//! ```
//! use lineage_core::Entity;
//!
//! let a = Entity::leaf("A", 2).unwrap();
//! let b = Entity::leaf("B", 3).unwrap();
//! let c = Entity::leaf("C", 4).unwrap();
//!
//! let y = a.plus(&b).unwrap().times(&c).unwrap();
//! assert_eq!(y.resolve().unwrap(), 20);
//!
//! let big = y.greater_than(&c).unwrap();
//! assert!(big.resolve().unwrap());
//! ```

use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::capability::{BinaryFn, CompareFn, Operand};
use crate::entity::Entity;
use crate::error::EntityError;
use crate::operator::Operator;

/// How a validated operator will be evaluated.
enum Strategy<T> {
    Native,
    Capability(BinaryFn<T>),
}

impl<T> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Strategy<T> {}

impl<T: Operand> Strategy<T> {
    fn apply(self, op: Operator, lhs: &T, rhs: &T) -> Result<T, EntityError> {
        match self {
            Strategy::Native => match T::apply_native(op, lhs, rhs) {
                Some(result) => Ok(result?),
                None => Err(unsupported::<T>(op)),
            },
            Strategy::Capability(apply) => Ok(apply(lhs, rhs)?),
        }
    }
}

fn unsupported<T>(op: Operator) -> EntityError {
    EntityError::UnsupportedOperation {
        operator: op.symbol(),
        type_name: std::any::type_name::<T>(),
        capability: op.capability(),
        registration: op.registration(),
    }
}

fn require<'a, T>(
    argument: &'static str,
    entity: Option<&'a Entity<T>>,
) -> Result<&'a Entity<T>, EntityError> {
    entity.ok_or(EntityError::ArgumentNull { argument })
}

fn select<T: Operand>(op: Operator) -> Result<Strategy<T>, EntityError> {
    if T::KIND.is_native() {
        return if T::KIND.supports(op) {
            trace!(operator = op.symbol(), kind = %T::KIND, "native dispatch");
            Ok(Strategy::Native)
        } else {
            Err(unsupported::<T>(op))
        };
    }
    let apply = T::capabilities()
        .binary(op)
        .ok_or_else(|| unsupported::<T>(op))?;
    debug!(
        operator = op.symbol(),
        type_name = std::any::type_name::<T>(),
        "dispatching through registered capability"
    );
    Ok(Strategy::Capability(apply))
}

fn ordering<T: Operand>(op: Operator) -> Result<CompareFn<T>, EntityError> {
    if T::KIND.is_native() {
        return Ok(T::order_native);
    }
    T::capabilities()
        .comparison()
        .ok_or_else(|| unsupported::<T>(op))
}

/// Build a derived entity for an arithmetic or logical operator.
///
/// Comparison operators are rejected with `ArgumentInvalid`; use [`compare`].
pub fn binary<T: Operand>(
    op: Operator,
    left: Option<&Entity<T>>,
    right: Option<&Entity<T>>,
) -> Result<Entity<T>, EntityError> {
    let left = require("left", left)?.clone();
    let right = require("right", right)?.clone();
    if op.is_comparison() {
        return Err(EntityError::invalid(
            "operator",
            format!("`{}` produces a boolean; build it with `compare`", op),
        ));
    }
    let strategy = select::<T>(op)?;
    let operands = vec![left.erased(), right.erased()];
    Entity::derive(op.symbol(), operands, move || {
        let lhs = left.resolve()?;
        let rhs = right.resolve()?;
        strategy.apply(op, &lhs, &rhs)
    })
}

/// Build a boolean entity for a comparison operator.
///
/// Unordered values (a NaN operand, for instance) make every relational
/// comparison `false`.
pub fn compare<T: Operand>(
    op: Operator,
    left: Option<&Entity<T>>,
    right: Option<&Entity<T>>,
) -> Result<Entity<bool>, EntityError> {
    let left = require("left", left)?.clone();
    let right = require("right", right)?.clone();
    if !op.is_comparison() {
        return Err(EntityError::invalid(
            "operator",
            format!("`{}` is not a comparison; build it with `binary`", op),
        ));
    }
    let operands = vec![left.erased(), right.erased()];

    if matches!(op, Operator::Equal | Operator::NotEqual) {
        let negate = op == Operator::NotEqual;
        return Entity::derive(op.symbol(), operands, move || {
            let equal = left.resolve()? == right.resolve()?;
            Ok(equal != negate)
        });
    }

    let order = ordering::<T>(op)?;
    Entity::derive(op.symbol(), operands, move || {
        let lhs = left.resolve()?;
        let rhs = right.resolve()?;
        let holds = match order(&lhs, &rhs) {
            Some(Ordering::Greater) => {
                matches!(op, Operator::Greater | Operator::GreaterOrEqual)
            }
            Some(Ordering::Less) => matches!(op, Operator::Less | Operator::LessOrEqual),
            Some(Ordering::Equal) => {
                matches!(op, Operator::GreaterOrEqual | Operator::LessOrEqual)
            }
            None => false,
        };
        Ok(holds)
    })
}

// ============================================================================
// Operator Methods
// ============================================================================

impl<T: Operand> Entity<T> {
    pub fn plus(&self, rhs: &Entity<T>) -> Result<Entity<T>, EntityError> {
        binary(Operator::Add, Some(self), Some(rhs))
    }

    pub fn minus(&self, rhs: &Entity<T>) -> Result<Entity<T>, EntityError> {
        binary(Operator::Subtract, Some(self), Some(rhs))
    }

    pub fn times(&self, rhs: &Entity<T>) -> Result<Entity<T>, EntityError> {
        binary(Operator::Multiply, Some(self), Some(rhs))
    }

    pub fn divided_by(&self, rhs: &Entity<T>) -> Result<Entity<T>, EntityError> {
        binary(Operator::Divide, Some(self), Some(rhs))
    }

    pub fn and(&self, rhs: &Entity<T>) -> Result<Entity<T>, EntityError> {
        binary(Operator::And, Some(self), Some(rhs))
    }

    pub fn or(&self, rhs: &Entity<T>) -> Result<Entity<T>, EntityError> {
        binary(Operator::Or, Some(self), Some(rhs))
    }

    pub fn equal_to(&self, rhs: &Entity<T>) -> Result<Entity<bool>, EntityError> {
        compare(Operator::Equal, Some(self), Some(rhs))
    }

    pub fn not_equal_to(&self, rhs: &Entity<T>) -> Result<Entity<bool>, EntityError> {
        compare(Operator::NotEqual, Some(self), Some(rhs))
    }

    pub fn greater_than(&self, rhs: &Entity<T>) -> Result<Entity<bool>, EntityError> {
        compare(Operator::Greater, Some(self), Some(rhs))
    }

    pub fn less_than(&self, rhs: &Entity<T>) -> Result<Entity<bool>, EntityError> {
        compare(Operator::Less, Some(self), Some(rhs))
    }

    pub fn at_least(&self, rhs: &Entity<T>) -> Result<Entity<bool>, EntityError> {
        compare(Operator::GreaterOrEqual, Some(self), Some(rhs))
    }

    pub fn at_most(&self, rhs: &Entity<T>) -> Result<Entity<bool>, EntityError> {
        compare(Operator::LessOrEqual, Some(self), Some(rhs))
    }

    /// Immediate value equality of two possibly-absent entities.
    ///
    /// Two absent entities are equal; one absent entity is unequal to any
    /// present one. Resolution errors propagate.
    pub fn values_equal(
        left: Option<&Entity<T>>,
        right: Option<&Entity<T>>,
    ) -> Result<bool, EntityError> {
        match (left, right) {
            (None, None) => Ok(true),
            (Some(_), None) | (None, Some(_)) => Ok(false),
            (Some(lhs), Some(rhs)) => Ok(lhs.resolve()? == rhs.resolve()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capabilities, Subtractable};
    use crate::error::DomainError;
    use num_rational::Rational64;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq)]
    struct Meters(i64);

    impl fmt::Display for Meters {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}m", self.0)
        }
    }

    impl Subtractable for Meters {
        fn subtract(&self, rhs: &Self) -> Result<Self, DomainError> {
            Ok(Meters(self.0 - rhs.0))
        }
    }

    impl Operand for Meters {
        fn capabilities() -> Capabilities<Self> {
            Capabilities::new().subtractable()
        }
    }

    #[test]
    fn test_null_operands_rejected() {
        let a = Entity::leaf("A", 1_i32).unwrap();
        assert_eq!(
            binary(Operator::Add, None, Some(&a)).unwrap_err(),
            EntityError::ArgumentNull { argument: "left" }
        );
        assert_eq!(
            binary(Operator::Add, Some(&a), None).unwrap_err(),
            EntityError::ArgumentNull { argument: "right" }
        );
        assert!(compare(Operator::Less, None::<&Entity<i32>>, None).is_err());
    }

    #[test]
    fn test_native_arithmetic() {
        let a = Entity::leaf("A", 7_i64).unwrap();
        let b = Entity::leaf("B", 2_i64).unwrap();
        assert_eq!(a.plus(&b).unwrap().resolve().unwrap(), 9);
        assert_eq!(a.minus(&b).unwrap().resolve().unwrap(), 5);
        assert_eq!(a.times(&b).unwrap().resolve().unwrap(), 14);
        assert_eq!(a.divided_by(&b).unwrap().resolve().unwrap(), 3);
    }

    #[test]
    fn test_derived_records_operation_and_operands() {
        let a = Entity::leaf("A", 1_i32).unwrap();
        let b = Entity::leaf("B", 2_i32).unwrap();
        let sum = a.plus(&b).unwrap();
        assert_eq!(sum.operation(), Some("+"));
        assert_eq!(sum.name(), "A + B");
        let names: Vec<&str> = sum.operands().iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_native_kind_rejects_unsupported_operator() {
        let a = Entity::leaf("A", "x".to_string()).unwrap();
        let b = Entity::leaf("B", "y".to_string()).unwrap();
        assert_eq!(a.plus(&b).unwrap().resolve().unwrap(), "xy");

        let err = a.minus(&b).unwrap_err();
        assert!(matches!(
            err,
            EntityError::UnsupportedOperation { operator: "-", .. }
        ));
    }

    #[test]
    fn test_capability_path() {
        let a = Entity::leaf("A", Meters(10)).unwrap();
        let b = Entity::leaf("B", Meters(4)).unwrap();
        assert_eq!(a.minus(&b).unwrap().resolve().unwrap(), Meters(6));

        let err = a.plus(&b).unwrap_err();
        match err {
            EntityError::UnsupportedOperation {
                operator,
                type_name,
                capability,
                ..
            } => {
                assert_eq!(operator, "+");
                assert!(type_name.ends_with("Meters"));
                assert_eq!(capability, "Addable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(a.greater_than(&b).is_err());

        for (err, symbol, needed) in [
            (a.times(&b).unwrap_err(), "*", "Multiplicable"),
            (a.divided_by(&b).unwrap_err(), "/", "Dividable"),
        ] {
            match err {
                EntityError::UnsupportedOperation {
                    operator,
                    capability,
                    ..
                } => {
                    assert_eq!(operator, symbol);
                    assert_eq!(capability, needed);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_equality_needs_no_capability() {
        let a = Entity::leaf("A", Meters(3)).unwrap();
        let b = Entity::leaf("B", Meters(3)).unwrap();
        assert!(a.equal_to(&b).unwrap().resolve().unwrap());
        assert!(!a.not_equal_to(&b).unwrap().resolve().unwrap());
    }

    #[test]
    fn test_relational_operators() {
        let a = Entity::leaf("A", 3_i32).unwrap();
        let b = Entity::leaf("B", 3_i32).unwrap();
        assert!(!a.greater_than(&b).unwrap().resolve().unwrap());
        assert!(!a.less_than(&b).unwrap().resolve().unwrap());
        assert!(a.at_least(&b).unwrap().resolve().unwrap());
        assert!(a.at_most(&b).unwrap().resolve().unwrap());
        b.reset(5).unwrap();
        assert!(a.less_than(&b).unwrap().resolve().unwrap());
    }

    #[test]
    fn test_nan_comparisons_are_false() {
        let nan = Entity::leaf("N", f64::NAN).unwrap();
        let one = Entity::leaf("One", 1.0_f64).unwrap();
        assert!(!nan.greater_than(&one).unwrap().resolve().unwrap());
        assert!(!nan.at_most(&one).unwrap().resolve().unwrap());
        assert!(!nan.equal_to(&nan).unwrap().resolve().unwrap());
    }

    #[test]
    fn test_boolean_logic() {
        let t = Entity::leaf("T", true).unwrap();
        let f = Entity::leaf("F", false).unwrap();
        assert!(!t.and(&f).unwrap().resolve().unwrap());
        assert!(t.or(&f).unwrap().resolve().unwrap());
        assert!(t.plus(&f).is_err());
    }

    #[test]
    fn test_domain_errors_surface_on_resolve() {
        let a = Entity::leaf("A", 1_i32).unwrap();
        let zero = Entity::leaf("Z", 0_i32).unwrap();
        let ratio = a.divided_by(&zero).unwrap();
        assert!(matches!(ratio.resolve(), Err(EntityError::Domain(_))));

        zero.reset(1).unwrap();
        assert_eq!(ratio.resolve().unwrap(), 1);
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = Entity::leaf("A", Rational64::new(1, 10)).unwrap();
        let b = Entity::leaf("B", Rational64::new(2, 10)).unwrap();
        let sum = a.plus(&b).unwrap();
        assert_eq!(sum.resolve().unwrap(), Rational64::new(3, 10));
    }

    #[test]
    fn test_binary_rejects_comparison_operator() {
        let a = Entity::leaf("A", 1_i32).unwrap();
        assert!(matches!(
            binary(Operator::Less, Some(&a), Some(&a)),
            Err(EntityError::ArgumentInvalid { .. })
        ));
        assert!(matches!(
            compare(Operator::Add, Some(&a), Some(&a)),
            Err(EntityError::ArgumentInvalid { .. })
        ));
    }

    #[test]
    fn test_values_equal_with_absent_entities() {
        let a = Entity::leaf("A", 1_i32).unwrap();
        let b = Entity::leaf("B", 1_i32).unwrap();
        assert!(Entity::<i32>::values_equal(None, None).unwrap());
        assert!(!Entity::values_equal(Some(&a), None).unwrap());
        assert!(!Entity::<i32>::values_equal(None, Some(&b)).unwrap());
        assert!(Entity::values_equal(Some(&a), Some(&b)).unwrap());
    }
}
