//! Vocabulary terms consulted while deconstructing an ontology document.
//!
//! `rdf:` and `rdfs:` terms come from [`oxrdf::vocab`]; only the terms that
//! crate does not ship are declared here.

use oxrdf::NamedNodeRef;

/// `owl:Class`; some CRM serializations type classes with OWL.
pub const OWL_CLASS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Class");

/// `dcterms:description`, preferred over `rdfs:comment` for type docs.
pub const DCTERMS_DESCRIPTION: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/description");
