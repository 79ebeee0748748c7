use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use oxrdf::{
    vocab::{rdf, rdfs},
    Graph, NamedNodeRef, NamedOrBlankNodeRef, TermRef,
};
use oxrdfxml::RdfXmlParser;
use thiserror::Error;
use tracing::debug;

use super::{iri::Iri, name::LocalName, vocabulary};

/// Locator accepted by [`SchemaLoader::load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaSource {
    /// Remote document fetched over HTTP(S).
    Url(String),
    /// Document read from the local filesystem.
    Path(PathBuf),
    /// Raw RDF/XML text supplied in memory.
    Inline(String),
}

impl SchemaSource {
    /// Guesses the source kind from a free-form locator string.
    #[must_use]
    pub fn locate(locator: &str) -> Self {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            Self::Url(locator.to_owned())
        } else if locator.trim_start().starts_with('<') {
            Self::Inline(locator.to_owned())
        } else {
            Self::Path(PathBuf::from(locator))
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
            Self::Inline(_) => "inline document".to_owned(),
        }
    }
}

/// Class declaration extracted from the ontology document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    id: Iri,
    name: LocalName,
    label: Option<String>,
    comment: Option<String>,
    super_classes: BTreeSet<Iri>,
}

impl ClassDecl {
    /// Creates a declaration for the supplied class identifier.
    #[must_use]
    pub fn new(id: Iri) -> Self {
        let name = id.local_name();
        Self {
            id,
            name,
            label: None,
            comment: None,
            super_classes: BTreeSet::new(),
        }
    }

    /// Sets the human readable label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the descriptive text.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Records a direct super-class edge.
    pub fn add_super(&mut self, super_class: Iri) -> bool {
        self.super_classes.insert(super_class)
    }

    /// Returns the class identifier.
    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    /// Returns the deconstructed local name.
    #[must_use]
    pub fn name(&self) -> &LocalName {
        &self.name
    }

    /// Returns the optional label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the direct super-classes in lexical order.
    #[must_use]
    pub fn supers(&self) -> &BTreeSet<Iri> {
        &self.super_classes
    }
}

/// Property declaration extracted from the ontology document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDecl {
    id: Iri,
    name: LocalName,
    label: Option<String>,
    comment: Option<String>,
    domain: Option<Iri>,
    range: Option<Iri>,
}

impl PropertyDecl {
    /// Creates a declaration for the supplied property identifier.
    #[must_use]
    pub fn new(id: Iri) -> Self {
        let name = id.local_name();
        Self {
            id,
            name,
            label: None,
            comment: None,
            domain: None,
            range: None,
        }
    }

    /// Sets the human readable label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the descriptive text.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Declares the class the property is attached to.
    #[must_use]
    pub fn with_domain(mut self, class: Iri) -> Self {
        self.domain = Some(class);
        self
    }

    /// Declares the class the property points at.
    #[must_use]
    pub fn with_range(mut self, class: Iri) -> Self {
        self.range = Some(class);
        self
    }

    /// Returns the property identifier.
    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    /// Returns the deconstructed local name.
    #[must_use]
    pub fn name(&self) -> &LocalName {
        &self.name
    }

    /// Returns the optional label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the declared domain class, if any.
    #[must_use]
    pub fn domain(&self) -> Option<&Iri> {
        self.domain.as_ref()
    }

    /// Returns the declared range class, if any.
    #[must_use]
    pub fn range(&self) -> Option<&Iri> {
        self.range.as_ref()
    }
}

/// Queryable deconstruction of one ontology document.
///
/// Produced by [`SchemaLoader::load`] and consumed once by the model builder.
/// Both collections are keyed by IRI so iteration order is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OntologySchema {
    classes: BTreeMap<Iri, ClassDecl>,
    properties: BTreeMap<Iri, PropertyDecl>,
}

impl OntologySchema {
    /// Creates an empty schema, useful for programmatic construction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class declaration, rejecting duplicate identifiers.
    pub fn add_class(&mut self, class: ClassDecl) -> Result<(), SchemaError> {
        let id = class.id().clone();
        if self.classes.contains_key(&id) {
            return Err(SchemaError::DuplicateClass { class: id });
        }
        self.classes.insert(id, class);
        Ok(())
    }

    /// Adds a property declaration, rejecting duplicate identifiers.
    pub fn add_property(&mut self, property: PropertyDecl) -> Result<(), SchemaError> {
        let id = property.id().clone();
        if self.properties.contains_key(&id) {
            return Err(SchemaError::DuplicateProperty { property: id });
        }
        self.properties.insert(id, property);
        Ok(())
    }

    /// Retrieves a class declaration by identifier.
    #[must_use]
    pub fn class(&self, id: &Iri) -> Option<&ClassDecl> {
        self.classes.get(id)
    }

    /// Retrieves a property declaration by identifier.
    #[must_use]
    pub fn property(&self, id: &Iri) -> Option<&PropertyDecl> {
        self.properties.get(id)
    }

    /// Returns all class declarations ordered by identifier.
    #[must_use]
    pub fn classes(&self) -> &BTreeMap<Iri, ClassDecl> {
        &self.classes
    }

    /// Returns all property declarations ordered by identifier.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<Iri, PropertyDecl> {
        &self.properties
    }
}

/// Errors raised while fetching or deconstructing an ontology document.
///
/// The `Fetch`/`Read`/`Parse` variants make the schema unreachable: the build
/// never starts and no registry is touched.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The remote document could not be fetched.
    #[error("failed to fetch schema `{location}`")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },
    /// The local document could not be read.
    #[error("failed to read schema `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The document is not well-formed RDF/XML.
    #[error("failed to parse schema `{location}`")]
    Parse {
        location: String,
        #[source]
        source: oxrdfxml::RdfXmlSyntaxError,
    },
    /// A class declaration was added twice.
    #[error("class `{class}` declared twice")]
    DuplicateClass { class: Iri },
    /// A property declaration was added twice.
    #[error("property `{property}` declared twice")]
    DuplicateProperty { property: Iri },
}

/// Fetches and deconstructs RDF/XML ontology documents.
#[derive(Clone, Debug, Default)]
pub struct SchemaLoader {
    client: reqwest::Client,
}

impl SchemaLoader {
    /// Creates a loader with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the source and deconstructs it into an [`OntologySchema`].
    pub async fn load(&self, source: &SchemaSource) -> Result<OntologySchema, SchemaError> {
        let document = self.resolve(source).await?;
        let graph = parse_document(&document, &source.describe())?;
        let schema = extract_schema(&graph)?;
        debug!(
            classes = schema.classes().len(),
            properties = schema.properties().len(),
            "schema deconstructed"
        );
        Ok(schema)
    }

    async fn resolve(&self, source: &SchemaSource) -> Result<String, SchemaError> {
        match source {
            SchemaSource::Url(url) => {
                let fetch = |source| SchemaError::Fetch {
                    location: url.clone(),
                    source,
                };
                let response = self.client.get(url).send().await.map_err(fetch)?;
                let response = response.error_for_status().map_err(fetch)?;
                response.text().await.map_err(fetch)
            }
            SchemaSource::Path(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SchemaError::Read {
                        path: path.clone(),
                        source,
                    })
            }
            SchemaSource::Inline(document) => Ok(document.clone()),
        }
    }
}

fn parse_document(document: &str, location: &str) -> Result<Graph, SchemaError> {
    let mut graph = Graph::default();
    for triple in RdfXmlParser::new().for_slice(document.as_bytes()) {
        let triple = triple.map_err(|source| SchemaError::Parse {
            location: location.to_owned(),
            source,
        })?;
        graph.insert(&triple);
    }
    Ok(graph)
}

fn extract_schema(graph: &Graph) -> Result<OntologySchema, SchemaError> {
    let mut schema = OntologySchema::new();

    // Some serializations type classes with OWL instead of RDFS.
    let class_subjects = graph
        .subjects_for_predicate_object(rdf::TYPE, rdfs::CLASS)
        .chain(graph.subjects_for_predicate_object(rdf::TYPE, vocabulary::OWL_CLASS));
    for subject in class_subjects {
        let NamedOrBlankNodeRef::NamedNode(node) = subject else {
            continue;
        };
        let id = Iri::from(node);
        if schema.class(&id).is_some() {
            continue;
        }
        let mut class = ClassDecl::new(id);
        let label = preferred_label(graph, node)
            .unwrap_or_else(|| class.name().type_name().to_owned());
        class = class.with_label(label);
        if let Some(comment) = description(graph, node) {
            class = class.with_comment(comment);
        }
        for term in graph.objects_for_subject_predicate(node, rdfs::SUB_CLASS_OF) {
            if let TermRef::NamedNode(super_class) = term {
                class.add_super(Iri::from(super_class));
            }
        }
        schema.add_class(class)?;
    }

    for subject in graph.subjects_for_predicate_object(rdf::TYPE, rdf::PROPERTY) {
        let NamedOrBlankNodeRef::NamedNode(node) = subject else {
            continue;
        };
        let id = Iri::from(node);
        if id.local_name().is_inverse() {
            debug!(property = %id, "skipping inverse property declaration");
            continue;
        }
        if schema.property(&id).is_some() {
            continue;
        }
        let mut property = PropertyDecl::new(id);
        let label = preferred_label(graph, node)
            .unwrap_or_else(|| property.name().type_name().to_owned());
        property = property.with_label(label);
        if let Some(comment) = description(graph, node) {
            property = property.with_comment(comment);
        }
        if let Some(domain) = named_object(graph, node, rdfs::DOMAIN) {
            property = property.with_domain(domain);
        }
        if let Some(range) = named_object(graph, node, rdfs::RANGE) {
            property = property.with_range(range);
        }
        schema.add_property(property)?;
    }

    Ok(schema)
}

/// Prefers the English label, falls back to the first one. Subjects with no
/// label at all are labelled with their type name by the caller.
fn preferred_label(graph: &Graph, subject: NamedNodeRef<'_>) -> Option<String> {
    let mut fallback = None;
    for term in graph.objects_for_subject_predicate(subject, rdfs::LABEL) {
        if let TermRef::Literal(literal) = term {
            if literal.language() == Some("en") {
                return Some(literal.value().to_owned());
            }
            if fallback.is_none() {
                fallback = Some(literal.value().to_owned());
            }
        }
    }
    fallback
}

fn description(graph: &Graph, subject: NamedNodeRef<'_>) -> Option<String> {
    literal_object(graph, subject, vocabulary::DCTERMS_DESCRIPTION)
        .or_else(|| literal_object(graph, subject, rdfs::COMMENT))
}

fn literal_object(
    graph: &Graph,
    subject: NamedNodeRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Option<String> {
    graph
        .objects_for_subject_predicate(subject, predicate)
        .find_map(|term| match term {
            TermRef::Literal(literal) => Some(literal.value().to_owned()),
            _ => None,
        })
}

fn named_object(graph: &Graph, subject: NamedNodeRef<'_>, predicate: NamedNodeRef<'_>) -> Option<Iri> {
    graph
        .objects_for_subject_predicate(subject, predicate)
        .find_map(|term| match term {
            TermRef::NamedNode(node) => Some(Iri::from(node)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::{SchemaLoader, SchemaSource};
    use crate::schema::iri::Iri;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
         xmlns:owl="http://www.w3.org/2002/07/owl#">
  <rdfs:Class rdf:about="http://www.cidoc-crm.org/cidoc-crm/E1_CRM_Entity">
    <rdfs:label xml:lang="de">CRM Entität</rdfs:label>
    <rdfs:label xml:lang="en">CRM Entity</rdfs:label>
    <rdfs:comment>The root of the hierarchy.</rdfs:comment>
  </rdfs:Class>
  <owl:Class rdf:about="http://www.cidoc-crm.org/cidoc-crm/E39_Actor">
    <rdfs:label xml:lang="en">Actor</rdfs:label>
    <rdfs:subClassOf rdf:resource="http://www.cidoc-crm.org/cidoc-crm/E1_CRM_Entity"/>
  </owl:Class>
  <rdfs:Class rdf:about="http://www.cidoc-crm.org/cidoc-crm/E53_Place">
    <rdfs:subClassOf rdf:resource="http://www.cidoc-crm.org/cidoc-crm/E1_CRM_Entity"/>
  </rdfs:Class>
  <rdf:Property rdf:about="http://www.cidoc-crm.org/cidoc-crm/P74_has_current_or_former_residence">
    <rdfs:label xml:lang="en">has current or former residence</rdfs:label>
    <rdfs:domain rdf:resource="http://www.cidoc-crm.org/cidoc-crm/E39_Actor"/>
    <rdfs:range rdf:resource="http://www.cidoc-crm.org/cidoc-crm/E53_Place"/>
  </rdf:Property>
  <rdf:Property rdf:about="http://www.cidoc-crm.org/cidoc-crm/P74i_is_current_or_former_residence_of">
    <rdfs:domain rdf:resource="http://www.cidoc-crm.org/cidoc-crm/E53_Place"/>
    <rdfs:range rdf:resource="http://www.cidoc-crm.org/cidoc-crm/E39_Actor"/>
  </rdf:Property>
</rdf:RDF>
"#;

    fn iri(text: &str) -> Iri {
        Iri::new(text).expect("valid iri")
    }

    #[tokio::test]
    async fn deconstructs_classes_and_properties() {
        let loader = SchemaLoader::new();
        let schema = loader
            .load(&SchemaSource::Inline(DOCUMENT.to_owned()))
            .await
            .expect("schema loads");

        let root = schema
            .class(&iri("http://www.cidoc-crm.org/cidoc-crm/E1_CRM_Entity"))
            .expect("root class");
        assert_eq!(root.label(), Some("CRM Entity"));
        assert_eq!(root.comment(), Some("The root of the hierarchy."));
        assert!(root.supers().is_empty());

        let actor = schema
            .class(&iri("http://www.cidoc-crm.org/cidoc-crm/E39_Actor"))
            .expect("owl-typed class");
        assert!(actor
            .supers()
            .contains(&iri("http://www.cidoc-crm.org/cidoc-crm/E1_CRM_Entity")));

        let place = schema
            .class(&iri("http://www.cidoc-crm.org/cidoc-crm/E53_Place"))
            .expect("unlabelled class");
        assert_eq!(place.label(), Some("E53Place"), "falls back to the type name");

        assert_eq!(schema.properties().len(), 1, "inverse declaration skipped");
        let residence = schema
            .properties()
            .values()
            .next()
            .expect("forward property");
        assert_eq!(residence.name().safe_name(), "P74_has_current_or_former_residence");
        assert_eq!(
            residence.domain(),
            Some(&iri("http://www.cidoc-crm.org/cidoc-crm/E39_Actor"))
        );
        assert_eq!(
            residence.range(),
            Some(&iri("http://www.cidoc-crm.org/cidoc-crm/E53_Place"))
        );
    }

    #[tokio::test]
    async fn missing_file_is_unreachable() {
        let loader = SchemaLoader::new();
        let err = loader
            .load(&SchemaSource::Path("/nonexistent/schema.rdfs.xml".into()))
            .await
            .expect_err("missing file");
        assert!(matches!(err, super::SchemaError::Read { .. }));
    }

    #[tokio::test]
    async fn malformed_document_is_unreachable() {
        let loader = SchemaLoader::new();
        let err = loader
            .load(&SchemaSource::Inline("<rdf:RDF".to_owned()))
            .await
            .expect_err("malformed document");
        assert!(matches!(err, super::SchemaError::Parse { .. }));
    }

    #[test]
    fn locator_heuristics() {
        assert!(matches!(
            SchemaSource::locate("https://cidoc-crm.org/rdfs/CIDOC_CRM.rdfs.xml"),
            SchemaSource::Url(_)
        ));
        assert!(matches!(
            SchemaSource::locate("/tmp/schema.rdfs.xml"),
            SchemaSource::Path(_)
        ));
        assert!(matches!(
            SchemaSource::locate("<?xml version=\"1.0\"?>"),
            SchemaSource::Inline(_)
        ));
    }
}
