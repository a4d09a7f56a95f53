//! # Value Capabilities
//!
//! A value type opts into operators by implementing small capability
//! traits, one per operator:
//!
//! - [`Addable`], [`Subtractable`], [`Multiplicable`], [`Dividable`]
//! - [`Logical`] (both `&` and `|`)
//! - `std::cmp::Ord` for `>`, `<`, `>=`, `<=`
//!
//! Equality is always available through `PartialEq`, which every
//! [`Operand`] already requires.
//!
//! ## Why a Table?
//!
//! Rust cannot ask "does `T` implement `Addable`?" at runtime. Instead each
//! type hands dispatch a [`Capabilities`] table. The builder methods on the
//! table are bounded by the matching trait, so a type can only register what
//! it really implements:
//!
//! ```
//! use lineage_core::capability::{Capabilities, Operand, Subtractable};
//! use lineage_core::DomainError;
//! use std::fmt;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Celsius(f64);
//!
//! impl fmt::Display for Celsius {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "{}°C", self.0)
//!     }
//! }
//!
//! impl Subtractable for Celsius {
//!     fn subtract(&self, rhs: &Self) -> Result<Self, DomainError> {
//!         Ok(Celsius(self.0 - rhs.0))
//!     }
//! }
//!
//! impl Operand for Celsius {
//!     fn capabilities() -> Capabilities<Self> {
//!         Capabilities::new().subtractable()
//!     }
//! }
//! ```
//!
//! The value supplies the operation itself; there is no global registry.

use std::cmp::Ordering;
use std::fmt;

use crate::error::DomainError;
use crate::kind::NativeKind;
use crate::operator::Operator;

// ============================================================================
// Capability Traits
// ============================================================================

/// Support for `+`.
pub trait Addable: Sized {
    fn add(&self, rhs: &Self) -> Result<Self, DomainError>;
}

/// Support for `-`.
pub trait Subtractable: Sized {
    fn subtract(&self, rhs: &Self) -> Result<Self, DomainError>;
}

/// Support for `*`.
pub trait Multiplicable: Sized {
    fn multiply(&self, rhs: &Self) -> Result<Self, DomainError>;
}

/// Support for `/`.
pub trait Dividable: Sized {
    fn divide(&self, rhs: &Self) -> Result<Self, DomainError>;
}

/// Support for `&` and `|`.
pub trait Logical: Sized {
    fn and(&self, rhs: &Self) -> Result<Self, DomainError>;
    fn or(&self, rhs: &Self) -> Result<Self, DomainError>;
}

// ============================================================================
// Operand
// ============================================================================

/// A type that can live inside an entity.
///
/// Built-in kinds (see [`crate::kind`]) override `KIND` and the `*_native`
/// methods. Everything else leaves `KIND` as [`NativeKind::Other`] and
/// describes its operators through [`Operand::capabilities`].
pub trait Operand:
    Clone + PartialEq + fmt::Display + fmt::Debug + Send + Sync + 'static
{
    /// How this type's operators are implemented.
    const KIND: NativeKind = NativeKind::Other;

    /// Built-in implementation of an arithmetic or logical operator.
    ///
    /// Only consulted when `KIND` is native. `None` means the operator has no
    /// built-in meaning for this type.
    fn apply_native(
        _op: Operator,
        _lhs: &Self,
        _rhs: &Self,
    ) -> Option<Result<Self, DomainError>> {
        None
    }

    /// Built-in three-way comparison. `None` means unordered (e.g. NaN).
    fn order_native(_lhs: &Self, _rhs: &Self) -> Option<Ordering> {
        None
    }

    /// Operators this type supports beyond the built-in path.
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new()
    }
}

// ============================================================================
// Capability Table
// ============================================================================

/// A binary operator implementation taken from a capability trait.
pub type BinaryFn<T> = fn(&T, &T) -> Result<T, DomainError>;

/// A three-way comparison.
pub type CompareFn<T> = fn(&T, &T) -> Option<Ordering>;

/// The set of operators a value type has registered.
pub struct Capabilities<T> {
    add: Option<BinaryFn<T>>,
    subtract: Option<BinaryFn<T>>,
    multiply: Option<BinaryFn<T>>,
    divide: Option<BinaryFn<T>>,
    and: Option<BinaryFn<T>>,
    or: Option<BinaryFn<T>>,
    compare: Option<CompareFn<T>>,
}

impl<T> Capabilities<T> {
    /// A table with nothing registered.
    pub const fn new() -> Self {
        Self {
            add: None,
            subtract: None,
            multiply: None,
            divide: None,
            and: None,
            or: None,
            compare: None,
        }
    }

    pub fn addable(mut self) -> Self
    where
        T: Addable,
    {
        self.add = Some(<T as Addable>::add);
        self
    }

    pub fn subtractable(mut self) -> Self
    where
        T: Subtractable,
    {
        self.subtract = Some(<T as Subtractable>::subtract);
        self
    }

    pub fn multiplicable(mut self) -> Self
    where
        T: Multiplicable,
    {
        self.multiply = Some(<T as Multiplicable>::multiply);
        self
    }

    pub fn dividable(mut self) -> Self
    where
        T: Dividable,
    {
        self.divide = Some(<T as Dividable>::divide);
        self
    }

    /// Registers both `&` and `|`.
    pub fn logical(mut self) -> Self
    where
        T: Logical,
    {
        self.and = Some(<T as Logical>::and);
        self.or = Some(<T as Logical>::or);
        self
    }

    /// Registers the relational operators through `Ord`.
    pub fn orderable(mut self) -> Self
    where
        T: Ord,
    {
        self.compare = Some(total_order::<T>);
        self
    }

    /// The registered implementation of an arithmetic or logical operator.
    pub fn binary(&self, op: Operator) -> Option<BinaryFn<T>> {
        match op {
            Operator::Add => self.add,
            Operator::Subtract => self.subtract,
            Operator::Multiply => self.multiply,
            Operator::Divide => self.divide,
            Operator::And => self.and,
            Operator::Or => self.or,
            _ => None,
        }
    }

    /// The registered ordering, if any.
    pub fn comparison(&self) -> Option<CompareFn<T>> {
        self.compare
    }

    /// Whether `op` can be dispatched through this table.
    pub fn supports(&self, op: Operator) -> bool {
        match op {
            Operator::Equal | Operator::NotEqual => true,
            op if op.is_comparison() => self.compare.is_some(),
            op => self.binary(op).is_some(),
        }
    }

    /// Number of operators registered (equality not counted).
    pub fn len(&self) -> usize {
        [
            self.add.is_some(),
            self.subtract.is_some(),
            self.multiply.is_some(),
            self.divide.is_some(),
            self.and.is_some(),
            self.or.is_some(),
            self.compare.is_some(),
        ]
        .into_iter()
        .filter(|registered| *registered)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn total_order<T: Ord>(lhs: &T, rhs: &T) -> Option<Ordering> {
    Some(lhs.cmp(rhs))
}

impl<T> Default for Capabilities<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Capabilities<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Capabilities<T> {}

impl<T> fmt::Debug for Capabilities<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<&'static str> = Operator::ALL
            .into_iter()
            .filter(|op| !matches!(op, Operator::Equal | Operator::NotEqual))
            .filter(|op| self.supports(*op))
            .map(Operator::symbol)
            .collect();
        f.debug_struct("Capabilities")
            .field("registered", &registered)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
