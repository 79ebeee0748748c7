use std::collections::BTreeMap;

use serde::Serialize;

/// Scalar value kinds a node field can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
}

/// Scalar field declaration attached to a runtime type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
}

impl FieldDescriptor {
    /// Creates a field declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for a text field, the kind the ontology itself produces.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field kind.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// Scalar value stored on a persisted record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl FieldValue {
    /// Shorthand for a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the kind of the stored value.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Integer(_) => FieldKind::Integer,
            Self::Boolean(_) => FieldKind::Boolean,
        }
    }
}

/// Cardinality of a relationship.
///
/// The ontology declares none, so every property connects many to many;
/// override factories may later grow this surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    ManyToMany,
}

/// Outbound relationship declared on a runtime type.
///
/// A descriptor declared on a class is visible, unmodified, on every
/// descendant type: resolution walks the ancestor chain instead of copying
/// descriptors downwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelationshipDescriptor {
    /// Accessor key, e.g. `P74_has_current_or_former_residence`.
    pub name: String,
    /// Edge label written to the store, e.g. `P74HasCurrentOrFormerResidence`.
    pub edge_type: String,
    /// Type the descriptor is declared on.
    pub source: String,
    /// Type a connection must target; `None` leaves the end unconstrained.
    pub target: Option<String>,
    pub multiplicity: Multiplicity,
    /// Accessor attached to the target type pointing back at the source.
    pub inverse: Option<String>,
}

impl RelationshipDescriptor {
    /// Creates a many-to-many descriptor with no inverse accessor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        edge_type: impl Into<String>,
        source: impl Into<String>,
        target: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            edge_type: edge_type.into(),
            source: source.into(),
            target,
            multiplicity: Multiplicity::ManyToMany,
            inverse: None,
        }
    }

    /// Declares the backward accessor name, wiring a symmetric descriptor
    /// onto the target type.
    #[must_use]
    pub fn with_inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse = Some(name.into());
        self
    }

    /// Replaces the target constraint.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Runtime node type synthesized from one ontology class.
///
/// Immutable once the build finishes. The `fields` and `relationships`
/// collections hold only this type's own declarations; the effective surface
/// (own plus inherited) is resolved through
/// [`TypeModel`](super::registry::TypeModel).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuntimeType {
    name: String,
    local_name: String,
    code: String,
    label: Option<String>,
    comment: Option<String>,
    ancestors: Vec<String>,
    fields: BTreeMap<String, FieldDescriptor>,
    relationships: BTreeMap<String, RelationshipDescriptor>,
}

impl RuntimeType {
    pub(crate) fn new(
        name: impl Into<String>,
        local_name: impl Into<String>,
        code: impl Into<String>,
        label: Option<String>,
        comment: Option<String>,
        ancestors: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            local_name: local_name.into(),
            code: code.into(),
            label,
            comment,
            ancestors,
            fields: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub(crate) fn add_field(&mut self, field: FieldDescriptor) {
        self.fields.insert(field.name().to_owned(), field);
    }

    pub(crate) fn add_relationship(&mut self, descriptor: RelationshipDescriptor) {
        self.relationships
            .insert(descriptor.name.clone(), descriptor);
    }

    /// Normalized type identifier, e.g. `E21Person`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original local name, e.g. `E21_Person`.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// CRM code, e.g. `E21`.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Display label taken from the ontology.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Descriptive text taken from the ontology.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Full ancestor closure, nearest first.
    #[must_use]
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// Distance to the farthest root, used for most-derived inference.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Whether the type has no super-class.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.ancestors.is_empty()
    }

    /// This type's own field declarations.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, FieldDescriptor> {
        &self.fields
    }

    /// This type's own relationship declarations.
    #[must_use]
    pub fn relationships(&self) -> &BTreeMap<String, RelationshipDescriptor> {
        &self.relationships
    }
}
