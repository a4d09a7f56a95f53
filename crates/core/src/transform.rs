//! # User-Defined Derivations
//!
//! Beyond the fixed operators, an entity can be derived through any closure:
//!
//! - [`Entity::transform`] maps one entity to another value type,
//! - [`Entity::try_transform`] does the same with a fallible closure,
//! - [`Entity::combine`] folds several same-typed entities into one,
//! - [`Entity::split`] derives two entities from one.
//!
//! The closure runs on every `resolve()`, like operator closures do. Labels
//! become the operation name, so `a.transform("abs", ..)` is named `abs(A)`.

use std::sync::Arc;

use crate::capability::Operand;
use crate::entity::Entity;
use crate::error::{DomainError, EntityError};

impl<T: Operand> Entity<T> {
    /// Derive a new entity by applying `f` to this entity's value.
    ///
    /// ```
    /// use lineage_core::Entity;
    ///
    /// let celsius = Entity::leaf("C", 100.0).unwrap();
    /// let fahrenheit = celsius.transform("to_f", |c| c * 9.0 / 5.0 + 32.0).unwrap();
    /// assert_eq!(fahrenheit.name(), "to_f(C)");
    /// assert_eq!(fahrenheit.resolve().unwrap(), 212.0);
    /// ```
    pub fn transform<U, F>(&self, label: &str, f: F) -> Result<Entity<U>, EntityError>
    where
        U: Operand,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.try_transform(label, move |value| Ok(f(value)))
    }

    /// Like [`transform`](Self::transform), but the closure may reject a value.
    /// Its error surfaces from `resolve()` as [`EntityError::Domain`].
    pub fn try_transform<U, F>(&self, label: &str, f: F) -> Result<Entity<U>, EntityError>
    where
        U: Operand,
        F: Fn(T) -> Result<U, DomainError> + Send + Sync + 'static,
    {
        let source = self.clone();
        Entity::derive(label, vec![self.erased()], move || {
            Ok(f(source.resolve()?)?)
        })
    }

    /// Derive one entity from several, in operand order.
    ///
    /// Fails with `ArgumentNull` when `operands` is empty.
    pub fn combine<U, F>(label: &str, operands: &[Entity<T>], f: F) -> Result<Entity<U>, EntityError>
    where
        U: Operand,
        F: Fn(&[T]) -> U + Send + Sync + 'static,
    {
        if operands.is_empty() {
            return Err(EntityError::ArgumentNull {
                argument: "operands",
            });
        }
        let sources = operands.to_vec();
        let erased = operands.iter().map(Entity::erased).collect();
        Entity::derive(label, erased, move || {
            let values = sources
                .iter()
                .map(Entity::resolve)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(f(&values))
        })
    }

    /// Derive two entities from this one. They are labelled `label.0` and
    /// `label.1` and each re-runs `f` when resolved.
    pub fn split<A, B, F>(&self, label: &str, f: F) -> Result<(Entity<A>, Entity<B>), EntityError>
    where
        A: Operand,
        B: Operand,
        F: Fn(&T) -> (A, B) + Send + Sync + 'static,
    {
        if label.trim().is_empty() {
            return Err(EntityError::invalid(
                "operation",
                "operation label must not be blank",
            ));
        }
        let f = Arc::new(f);

        let first = {
            let (source, f) = (self.clone(), Arc::clone(&f));
            Entity::derive(format!("{label}.0"), vec![self.erased()], move || {
                Ok((*f)(&source.resolve()?).0)
            })?
        };
        let second = {
            let source = self.clone();
            Entity::derive(format!("{label}.1"), vec![self.erased()], move || {
                Ok((*f)(&source.resolve()?).1)
            })?
        };
        Ok((first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_is_lazy() {
        let a = Entity::leaf("A", -3_i32).unwrap();
        let abs = a.transform("abs", |v: i32| v.abs()).unwrap();
        assert_eq!(abs.name(), "abs(A)");
        assert_eq!(abs.operation(), Some("abs"));
        assert_eq!(abs.resolve().unwrap(), 3);
        a.reset(-8).unwrap();
        assert_eq!(abs.resolve().unwrap(), 8);
    }

    #[test]
    fn test_transform_changes_type() {
        let a = Entity::leaf("A", 42_i64).unwrap();
        let text = a.transform("show", |v| format!("#{v}")).unwrap();
        assert_eq!(text.resolve().unwrap(), "#42");
    }

    #[test]
    fn test_blank_label_rejected() {
        let a = Entity::leaf("A", 1_i32).unwrap();
        assert!(matches!(
            a.transform("", |v| v),
            Err(EntityError::ArgumentInvalid { .. })
        ));
        assert!(a.split(" ", |v| (*v, *v)).is_err());
    }

    #[test]
    fn test_try_transform_surfaces_domain_error() {
        let a = Entity::leaf("A", -1.0_f64).unwrap();
        let root = a
            .try_transform("sqrt", |v: f64| {
                if v < 0.0 {
                    Err(DomainError::new("negative input"))
                } else {
                    Ok(v.sqrt())
                }
            })
            .unwrap();
        assert_eq!(
            root.resolve().unwrap_err(),
            EntityError::Domain(DomainError::new("negative input"))
        );
        a.reset(9.0).unwrap();
        assert_eq!(root.resolve().unwrap(), 3.0);
    }

    #[test]
    fn test_combine_many_operands() {
        let parts: Vec<Entity<i32>> = ["A", "B", "C"]
            .iter()
            .zip([1, 2, 3])
            .map(|(name, value)| Entity::leaf(*name, value).unwrap())
            .collect();
        let total = Entity::combine("sum", &parts, |vs| vs.iter().sum::<i32>()).unwrap();
        assert_eq!(total.name(), "sum(A, B, C)");
        assert_eq!(total.operands().len(), 3);
        assert_eq!(total.resolve().unwrap(), 6);

        parts[1].reset(20).unwrap();
        assert_eq!(total.resolve().unwrap(), 24);
    }

    #[test]
    fn test_combine_requires_operands() {
        let err = Entity::<i32>::combine("sum", &[], |vs| vs.len() as i32).unwrap_err();
        assert_eq!(
            err,
            EntityError::ArgumentNull {
                argument: "operands"
            }
        );
    }

    #[test]
    fn test_split_produces_labelled_pair() {
        let a = Entity::leaf("A", 17_i32).unwrap();
        let (quotient, remainder) = a.split("divmod", |v| (v / 5, v % 5)).unwrap();
        assert_eq!(quotient.name(), "divmod.0(A)");
        assert_eq!(remainder.name(), "divmod.1(A)");
        assert_eq!(quotient.resolve().unwrap(), 3);
        assert_eq!(remainder.resolve().unwrap(), 2);

        a.reset(23).unwrap();
        assert_eq!(quotient.resolve().unwrap(), 4);
        assert_eq!(remainder.resolve().unwrap(), 3);
    }
}
