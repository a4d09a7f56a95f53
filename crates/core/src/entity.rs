//! # Entities - Values That Remember Where They Came From
//!
//! An [`Entity<T>`] is either:
//!
//! - a **leaf**: a named, mutable source value, or
//! - a **derived** entity: an operation label, a fixed list of operands,
//!   and a closure that recomputes the value from those operands.
//!
//! ## Lazy, Uncached Resolution
//!
//! `resolve()` on a derived entity walks its whole operand tree every time.
//! Nothing is memoised, so after `reset()` on any leaf the next `resolve()`
//! of anything downstream sees the new value:
//!
//! ```
//! use lineage_core::Entity;
//!
//! let a = Entity::leaf("A", 10).unwrap();
//! let b = Entity::leaf("B", 5).unwrap();
//! let sum = a.plus(&b).unwrap();
//! assert_eq!(sum.resolve().unwrap(), 15);
//!
//! a.reset(20).unwrap();
//! assert_eq!(sum.resolve().unwrap(), 25);
//! ```
//!
//! ## Type Erasure
//!
//! Operands may have a different value type than the entity they feed
//! (`a > b` is an `Entity<bool>` over two `Entity<i64>`), so operand lists
//! hold [`EntityRef`] trait objects. Naming, expression rendering and graph
//! snapshots all walk the tree through [`AnyEntity`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::capability::Operand;
use crate::error::EntityError;
use crate::expr;
use crate::graph::{self, GraphNode};
use crate::scope;

/// A type-erased handle to any entity, used for operand and condition lists.
pub type EntityRef = Arc<dyn AnyEntity>;

/// Arbitrary per-leaf metadata.
pub type ArbitraryState = BTreeMap<String, serde_json::Value>;

/// The zero-argument closure behind a derived entity.
type ComputeFn<T> = Arc<dyn Fn() -> Result<T, EntityError> + Send + Sync>;

// ============================================================================
// Type-Erased View
// ============================================================================

/// The structure of an entity, independent of its value type.
pub trait AnyEntity: Send + Sync {
    /// Leaf name, or the structural name of a derived entity.
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str>;

    /// Operation label; `None` for leaves.
    fn operation(&self) -> Option<&str>;

    fn is_leaf(&self) -> bool {
        self.operation().is_none()
    }

    /// Operands in construction order. Empty for leaves.
    fn operands(&self) -> &[EntityRef];

    /// Scope conditions captured when a leaf was built. Empty for derived entities.
    fn conditions(&self) -> &[EntityRef];

    /// Rust type name of the value.
    fn type_name(&self) -> &'static str;

    /// Resolve the value and render it with `Display`.
    fn resolve_display(&self) -> Result<String, EntityError>;

    /// Resolve this entity and its subtree into an immutable snapshot.
    fn snapshot(&self) -> Result<GraphNode, EntityError>;
}

impl fmt::Debug for dyn AnyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyEntity")
            .field("name", &self.name())
            .field("operation", &self.operation())
            .field("type", &self.type_name())
            .finish()
    }
}

// ============================================================================
// Storage
// ============================================================================

struct LeafCell<T> {
    value: RwLock<T>,
}

struct Derived<T> {
    operation: String,
    operands: Vec<EntityRef>,
    compute: ComputeFn<T>,
}

enum Kind<T> {
    Leaf(Arc<LeafCell<T>>),
    Derived(Derived<T>),
}

pub(crate) struct EntityInner<T> {
    name: String,
    description: Option<String>,
    kind: Kind<T>,
    conditions: Vec<EntityRef>,
    arbitrary_state: ArbitraryState,
    value_state: BTreeMap<String, T>,
}

impl<T: Operand> EntityInner<T> {
    fn resolve(&self) -> Result<T, EntityError> {
        let key = self as *const Self as usize;
        if let Some(value) = walk::lookup::<T>(key) {
            return Ok(value);
        }
        let value = match &self.kind {
            Kind::Leaf(cell) => cell
                .value
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            Kind::Derived(derived) => (derived.compute)()?,
        };
        walk::record(key, &value);
        Ok(value)
    }

    pub(crate) fn arbitrary_state(&self) -> &ArbitraryState {
        &self.arbitrary_state
    }

    pub(crate) fn value_state(&self) -> &BTreeMap<String, T> {
        &self.value_state
    }
}

impl<T: Operand> AnyEntity for EntityInner<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn operation(&self) -> Option<&str> {
        match &self.kind {
            Kind::Leaf(_) => None,
            Kind::Derived(derived) => Some(&derived.operation),
        }
    }

    fn operands(&self) -> &[EntityRef] {
        match &self.kind {
            Kind::Leaf(_) => &[],
            Kind::Derived(derived) => &derived.operands,
        }
    }

    fn conditions(&self) -> &[EntityRef] {
        &self.conditions
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn resolve_display(&self) -> Result<String, EntityError> {
        Ok(self.resolve()?.to_string())
    }

    fn snapshot(&self) -> Result<GraphNode, EntityError> {
        walk::run(|| {
            let value = self.resolve()?;
            graph::snapshot(self, value)
        })
    }
}

// ============================================================================
// Snapshot Walk
// ============================================================================

/// Per-thread memo of resolved values, active only while a snapshot is
/// being taken. Each node of the tree is then computed once, and a parent's
/// value is always built from the same child values the snapshot records.
mod walk {
    use super::*;

    thread_local! {
        static RESOLVED: RefCell<Option<HashMap<usize, Box<dyn Any>>>> =
            const { RefCell::new(None) };
    }

    /// Ends the walk on drop, including when a snapshot fails part way.
    struct Active;

    impl Drop for Active {
        fn drop(&mut self) {
            let _ = RESOLVED.try_with(|memo| memo.borrow_mut().take());
        }
    }

    /// Run `f` with memoised resolution. Nested calls join the outer walk.
    pub(super) fn run<R>(f: impl FnOnce() -> R) -> R {
        let started = RESOLVED.with(|memo| {
            let mut memo = memo.borrow_mut();
            if memo.is_some() {
                return false;
            }
            *memo = Some(HashMap::new());
            true
        });
        let _active = started.then(|| Active);
        f()
    }

    // Keys are node addresses; every node stays alive for the whole walk
    // because the root owns the tree.
    pub(super) fn lookup<T: Operand>(key: usize) -> Option<T> {
        RESOLVED.with(|memo| {
            memo.borrow()
                .as_ref()?
                .get(&key)?
                .downcast_ref::<T>()
                .cloned()
        })
    }

    pub(super) fn record<T: Operand>(key: usize, value: &T) {
        RESOLVED.with(|memo| {
            if let Some(memo) = memo.borrow_mut().as_mut() {
                memo.insert(key, Box::new(value.clone()));
            }
        });
    }
}

// ============================================================================
// Entity
// ============================================================================

/// A traceable value: a mutable leaf or a lazily recomputed derived entity.
///
/// Cloning is cheap and clones share state: resetting one clone of a leaf
/// is visible through every other clone.
pub struct Entity<T> {
    inner: Arc<EntityInner<T>>,
}

impl<T> Clone for Entity<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Operand> Entity<T> {
    /// Create a leaf, capturing any active scope conditions.
    ///
    /// Fails with `ArgumentInvalid` if `name` is blank.
    pub fn leaf(name: impl Into<String>, value: T) -> Result<Self, EntityError> {
        Self::builder(name, value).build()
    }

    /// Start building a leaf with metadata, a description or explicit conditions.
    pub fn builder(name: impl Into<String>, value: T) -> LeafBuilder<T> {
        LeafBuilder {
            name: name.into(),
            value,
            description: None,
            conditions: Vec::new(),
            arbitrary_state: ArbitraryState::new(),
            value_state: BTreeMap::new(),
        }
    }

    /// Create a derived entity over a fixed operand list.
    ///
    /// The structural name is computed once here; operands never change
    /// afterwards.
    pub(crate) fn derive<F>(
        operation: impl Into<String>,
        operands: Vec<EntityRef>,
        compute: F,
    ) -> Result<Self, EntityError>
    where
        F: Fn() -> Result<T, EntityError> + Send + Sync + 'static,
    {
        let operation = operation.into();
        if operation.trim().is_empty() {
            return Err(EntityError::invalid(
                "operation",
                "operation label must not be blank",
            ));
        }
        let name = expr::structural_name(&operation, &operands);
        Ok(Self {
            inner: Arc::new(EntityInner {
                name,
                description: None,
                kind: Kind::Derived(Derived {
                    operation,
                    operands,
                    compute: Arc::new(compute),
                }),
                conditions: Vec::new(),
                arbitrary_state: ArbitraryState::new(),
                value_state: BTreeMap::new(),
            }),
        })
    }

    /// Compute the current value.
    ///
    /// Leaves return their stored value. Derived entities re-run their
    /// closure, which resolves every operand again. Errors raised by values
    /// or user closures propagate unchanged.
    pub fn resolve(&self) -> Result<T, EntityError> {
        self.inner.resolve()
    }

    /// Replace a leaf's value.
    ///
    /// Fails with `InvalidState` on a derived entity.
    pub fn reset(&self, value: T) -> Result<(), EntityError> {
        let cell = self.leaf_cell()?;
        *cell.value.write().unwrap_or_else(PoisonError::into_inner) = value;
        debug!(entity = %self.inner.name, "leaf reset");
        Ok(())
    }

    /// Replace a leaf's value with one computed from the current value.
    ///
    /// `f` runs with no lock held, so it may resolve entities that depend
    /// on this leaf. The read and the write are not one atomic step.
    pub fn reload<F>(&self, f: F) -> Result<(), EntityError>
    where
        F: FnOnce(&T) -> T,
    {
        let cell = self.leaf_cell()?;
        let current = cell
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let next = f(&current);
        *cell.value.write().unwrap_or_else(PoisonError::into_inner) = next;
        debug!(entity = %self.inner.name, "leaf reloaded");
        Ok(())
    }

    fn leaf_cell(&self) -> Result<&LeafCell<T>, EntityError> {
        match &self.inner.kind {
            Kind::Leaf(cell) => Ok(cell.as_ref()),
            Kind::Derived(_) => Err(EntityError::InvalidState {
                reason: format!(
                    "cannot mutate a derived entity (`{}`)",
                    self.inner.name
                ),
            }),
        }
    }

    /// A handle to the same entity carrying a human-readable description.
    ///
    /// Leaves keep sharing their value cell; derived entities keep sharing
    /// their operands and closure.
    pub fn described(&self, description: impl Into<String>) -> Result<Self, EntityError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(EntityError::invalid(
                "description",
                "description must not be blank",
            ));
        }
        let kind = match &self.inner.kind {
            Kind::Leaf(cell) => Kind::Leaf(Arc::clone(cell)),
            Kind::Derived(derived) => Kind::Derived(Derived {
                operation: derived.operation.clone(),
                operands: derived.operands.clone(),
                compute: Arc::clone(&derived.compute),
            }),
        };
        Ok(Self {
            inner: Arc::new(EntityInner {
                name: self.inner.name.clone(),
                description: Some(description),
                kind,
                conditions: self.inner.conditions.clone(),
                arbitrary_state: self.inner.arbitrary_state.clone(),
                value_state: self.inner.value_state.clone(),
            }),
        })
    }

    /// This entity as a type-erased operand.
    pub fn erased(&self) -> EntityRef {
        self.inner.clone()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// The description if one was given, otherwise the name.
    pub fn label(&self) -> &str {
        self.description().unwrap_or(self.name())
    }

    pub fn operation(&self) -> Option<&str> {
        self.inner.operation()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.inner.kind, Kind::Leaf(_))
    }

    pub fn operands(&self) -> &[EntityRef] {
        self.inner.operands()
    }

    pub fn conditions(&self) -> &[EntityRef] {
        &self.inner.conditions
    }

    pub fn arbitrary_state(&self) -> &ArbitraryState {
        self.inner.arbitrary_state()
    }

    pub fn value_state(&self) -> &BTreeMap<String, T> {
        self.inner.value_state()
    }

    /// Whether two handles refer to the same underlying entity.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The precedence-correct expression this entity computes.
    pub fn dependency_expression(&self) -> String {
        expr::dependency_expression(&*self.inner)
    }

    /// Names of every leaf (and scope condition leaf) this entity depends on.
    pub fn dependency_names(&self) -> std::collections::BTreeSet<String> {
        expr::dependency_names(&*self.inner)
    }

    /// Snapshot this entity and its subtree, resolving every node once.
    pub fn build_graph(&self) -> Result<GraphNode, EntityError> {
        self.inner.snapshot()
    }
}

// ============================================================================
// Value Semantics
// ============================================================================

/// Entities compare by their *resolved values*, not by identity or structure.
///
/// Two unrelated entities that currently resolve to equal values are equal.
/// Entities that fail to resolve are equal when their errors are equal, and
/// never equal to an entity that resolves.
impl<T: Operand> PartialEq for Entity<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.resolve(), other.resolve()) {
            (Ok(lhs), Ok(rhs)) => lhs == rhs,
            (Err(lhs), Err(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl<T: Operand + Eq> Eq for Entity<T> {}

/// Hashes the resolved value, or only the failure marker when resolution
/// fails, so equal errors hash alike.
impl<T: Operand + Hash> Hash for Entity<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.resolve() {
            Ok(value) => {
                0_u8.hash(state);
                value.hash(state);
            }
            Err(_) => 1_u8.hash(state),
        }
    }
}

impl<T: Operand> fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.inner.name)
            .field("operation", &self.operation())
            .field("operands", &self.operands().len())
            .finish()
    }
}

impl<T: Operand> fmt::Display for Entity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Leaf Builder
// ============================================================================

/// Builder for leaves that carry metadata or explicit conditions.
///
/// ```
/// use lineage_core::Entity;
/// use serde_json::json;
///
/// let price = Entity::builder("price", 12)
///     .description("Unit price")
///     .arbitrary("currency", json!("EUR"))
///     .value_state("floor", 10)
///     .build()
///     .unwrap();
///
/// assert_eq!(price.label(), "Unit price");
/// assert_eq!(price.value_state()["floor"], 10);
/// ```
pub struct LeafBuilder<T> {
    name: String,
    value: T,
    description: Option<String>,
    conditions: Vec<EntityRef>,
    arbitrary_state: ArbitraryState,
    value_state: BTreeMap<String, T>,
}

impl<T: Operand> LeafBuilder<T> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach an arbitrary metadata entry.
    pub fn arbitrary(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.arbitrary_state.insert(key.into(), value);
        self
    }

    /// Attach a typed metadata entry.
    pub fn value_state(mut self, key: impl Into<String>, value: T) -> Self {
        self.value_state.insert(key.into(), value);
        self
    }

    /// Attach a condition explicitly, in addition to any ambient scope.
    pub fn condition<U: Operand>(mut self, condition: &Entity<U>) -> Self {
        self.conditions.push(condition.erased());
        self
    }

    /// Validate the name and create the leaf.
    ///
    /// Ambient scope conditions are snapshotted here, bottom of the stack
    /// first, followed by explicit ones.
    pub fn build(self) -> Result<Entity<T>, EntityError> {
        if self.name.trim().is_empty() {
            return Err(EntityError::invalid("name", "leaf name must not be blank"));
        }
        let mut conditions = scope::current();
        conditions.extend(self.conditions);

        Ok(Entity {
            inner: Arc::new(EntityInner {
                name: self.name,
                description: self.description,
                kind: Kind::Leaf(Arc::new(LeafCell {
                    value: RwLock::new(self.value),
                })),
                conditions,
                arbitrary_state: self.arbitrary_state,
                value_state: self.value_state,
            }),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
