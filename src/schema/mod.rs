//! Ontology loading and deconstruction.
//!
//! The module turns an RDF/XML ontology document into a queryable
//! [`OntologySchema`]: class declarations with their super-class edges and
//! property declarations with their domain/range edges. The RDF parsing
//! itself is delegated to the `oxrdf`/`oxrdfxml` stack; everything here is
//! about reading the handful of `rdf:`/`rdfs:`/`owl:` predicates the CRM
//! specification actually uses and normalizing resource names into type
//! identifiers.

pub mod iri;
pub mod loader;
pub mod name;
pub mod vocabulary;

pub use iri::{Iri, IriError};
pub use loader::{
    ClassDecl, OntologySchema, PropertyDecl, SchemaError, SchemaLoader, SchemaSource,
};
pub use name::LocalName;
