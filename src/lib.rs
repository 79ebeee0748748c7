//! Dynamic materialization of the CIDOC CRM as graph node and relationship
//! types.
//!
//! One build pass downloads (or reads) the CRM RDF/XML specification,
//! deconstructs its class and property hierarchy, and synthesizes a runtime
//! type per ontology class: ancestor closures mirror the subclass-of graph,
//! scalar fields and relationship descriptors are attached to the classes
//! that declare them, and descendants inherit both structurally. Persisted
//! records carry the full ancestor label set, which later drives casts
//! between types of the same chain and range checks on relationship writes.
//!
//! # Example
//!
//! ```no_run
//! use cidoc_graph::{build_models, GraphStore, MemoryGraph, Overrides};
//! use std::{collections::BTreeMap, sync::Arc};
//!
//! # async fn demo() -> cidoc_graph::Result<()> {
//! let model = build_models(
//!     "https://cidoc-crm.org/rdfs/7.1.3/CIDOC_CRM_v7.1.3.rdfs.xml",
//!     Overrides::new(),
//! )
//! .await?;
//!
//! let store = MemoryGraph::new(Arc::new(model));
//! let joe = store.create("E21Person", BTreeMap::new()).await?;
//! let tempe = store.create("E53Place", BTreeMap::new()).await?;
//! store
//!     .connect(&joe, "P74_has_current_or_former_residence", tempe.id())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod model;
pub mod record;
pub mod schema;

pub use config::{ModelSettings, UnresolvedPolicy};
pub use model::{
    BuildError, FieldDescriptor, FieldKind, FieldValue, ModelBuilder, ModelRegistry, Multiplicity,
    Overrides, RelationshipDescriptor, RuntimeType, TypeModel,
};
pub use record::{CastError, GraphStore, MemoryGraph, RecordView, StoreError};
pub use schema::{
    ClassDecl, Iri, LocalName, OntologySchema, PropertyDecl, SchemaError, SchemaLoader,
    SchemaSource,
};

use thiserror::Error;

/// Crate-wide error aggregating each subsystem's failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Cast(#[from] CastError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Loads the schema behind `location` and builds the full type model.
///
/// The locator may be a URL, a filesystem path, or a raw RDF/XML document.
/// The build is atomic: any failure surfaces before a model exists, so a
/// caller-held [`ModelRegistry`] keeps its previous model on error.
pub async fn build_models(location: &str, overrides: Overrides) -> Result<TypeModel> {
    build_models_with(&ModelSettings::new(location), overrides).await
}

/// [`build_models`] driven by explicit [`ModelSettings`].
pub async fn build_models_with(
    settings: &ModelSettings,
    overrides: Overrides,
) -> Result<TypeModel> {
    let source = SchemaSource::locate(&settings.schema);
    let schema = SchemaLoader::new().load(&source).await?;
    let model = ModelBuilder::new()
        .with_overrides(overrides)
        .with_policy(settings.unresolved)
        .build(&schema)?;
    tracing::info!(types = model.types().len(), "model built");
    Ok(model)
}
