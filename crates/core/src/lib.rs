//! # Lineage Core - Traceable Expression Graphs
//!
//! Every value lives inside an [`Entity`] that remembers where it came from:
//! either a named, mutable source (a leaf) or the operation and operands that
//! produced it (a derived entity). Resolving an entity replays its
//! computation, so changing a leaf changes every downstream result the next
//! time it is asked for.
//!
//! - **Entities**: leaves, derived entities, lazy resolution (`entity`)
//! - **Dispatch**: operators checked against value capabilities (`dispatch`)
//! - **Capabilities**: built-in kinds and opt-in operator traits (`kind`, `capability`)
//! - **Expressions**: precedence-correct names and dependency sets (`expr`)
//! - **Graphs**: resolved snapshots rendered as ASCII, DOT, or JSON (`graph`)
//! - **Scopes**: ambient conditions captured by leaves (`scope`)
//!
//! ## Example
//!
//! ```
//! use lineage_core::Entity;
//!
//! let a = Entity::leaf("A", 2).unwrap();
//! let b = Entity::leaf("B", 3).unwrap();
//! let c = Entity::leaf("C", 4).unwrap();
//!
//! let y = a.plus(&b).unwrap().times(&c).unwrap();
//! assert_eq!(y.dependency_expression(), "(A + B) * C");
//! assert_eq!(y.resolve().unwrap(), 20);
//!
//! b.reset(6).unwrap();
//! assert_eq!(y.resolve().unwrap(), 32);
//! ```

pub mod capability;
pub mod config;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod expr;
pub mod graph;
pub mod kind;
pub mod operator;
pub mod scope;
pub mod transform;

// Re-export key types at crate root for convenience
pub use capability::{
    Addable, Capabilities, Dividable, Logical, Multiplicable, Operand, Subtractable,
};
pub use config::RenderOptions;
pub use entity::{AnyEntity, Entity, EntityRef, LeafBuilder};
pub use error::{DomainError, EntityError};
pub use graph::{GraphNode, SnapshotValue};
pub use kind::NativeKind;
pub use operator::Operator;
pub use scope::ScopeGuard;
