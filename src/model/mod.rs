//! Runtime type synthesis.
//!
//! One build pass turns an [`OntologySchema`](crate::schema::OntologySchema)
//! into a [`TypeModel`]: a runtime type per ontology class, ancestor closures
//! precomputed from the subclass-of graph, scalar fields merged with caller
//! overrides, and relationship descriptors wired onto their domain types.
//! Built models are immutable; the [`ModelRegistry`] swaps whole models in
//! and out so readers never observe a partial build.

pub mod builder;
pub mod registry;
pub mod types;
mod wiring;

pub use builder::{BuildError, FieldFactory, ModelBuilder, Overrides, RelationshipFactory};
pub use registry::{InferenceError, ModelRegistry, TypeModel};
pub use types::{
    FieldDescriptor, FieldKind, FieldValue, Multiplicity, RelationshipDescriptor, RuntimeType,
};
