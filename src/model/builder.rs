use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
    sync::Arc,
};

use thiserror::Error;
use tracing::debug;

use crate::{
    config::UnresolvedPolicy,
    schema::{ClassDecl, Iri, LocalName, OntologySchema},
};

use super::{
    registry::TypeModel,
    types::{FieldDescriptor, RelationshipDescriptor, RuntimeType},
    wiring,
};

/// Zero-argument factory producing an injected scalar field.
pub type FieldFactory = Arc<dyn Fn() -> FieldDescriptor + Send + Sync>;

/// Factory rewriting the default descriptor wiring computed for a property.
///
/// The factory receives the descriptor as wiring would attach it and may
/// replace any part: the target (including supplying one for an unresolved
/// range), the inverse accessor, or the multiplicity.
pub type RelationshipFactory =
    Arc<dyn Fn(RelationshipDescriptor) -> RelationshipDescriptor + Send + Sync>;

/// Caller-supplied field and relationship injections, applied at build time.
///
/// Field factories are keyed by class name, relationship factories by
/// property name; both accept the normalized or the original local form.
#[derive(Clone, Default)]
pub struct Overrides {
    fields: BTreeMap<String, Vec<FieldFactory>>,
    relationships: BTreeMap<String, RelationshipFactory>,
}

impl Overrides {
    /// Creates an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extra scalar field on the named class.
    #[must_use]
    pub fn field<F>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> FieldDescriptor + Send + Sync + 'static,
    {
        self.fields
            .entry(class.into())
            .or_default()
            .push(Arc::new(factory));
        self
    }

    /// Registers a descriptor constructor for the named property.
    #[must_use]
    pub fn relationship<F>(mut self, property: impl Into<String>, factory: F) -> Self
    where
        F: Fn(RelationshipDescriptor) -> RelationshipDescriptor + Send + Sync + 'static,
    {
        self.relationships.insert(property.into(), Arc::new(factory));
        self
    }

    /// Whether any override has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.relationships.is_empty()
    }

    pub(crate) fn fields_for<'a>(
        &'a self,
        class: &ClassDecl,
    ) -> impl Iterator<Item = &'a FieldFactory> {
        let primary = self.fields.get(class.name().type_name());
        let secondary = if class.name().safe_name() == class.name().type_name() {
            None
        } else {
            self.fields.get(class.name().safe_name())
        };
        primary.into_iter().chain(secondary).flatten()
    }

    pub(crate) fn relationship_for(&self, name: &LocalName) -> Option<&RelationshipFactory> {
        self.relationships
            .get(name.safe_name())
            .or_else(|| self.relationships.get(name.type_name()))
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overrides")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("relationships", &self.relationships.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Errors raised while synthesizing runtime types from a schema.
///
/// Any variant aborts the whole build; nothing is registered.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The subclass-of relation is not a DAG.
    #[error("class hierarchy contains a cycle through `{class}`")]
    CyclicHierarchy { class: String },
    /// Two classes normalize to the same type identifier.
    #[error("classes `{first}` and `{second}` both normalize to type name `{name}`")]
    DuplicateTypeName {
        name: String,
        first: String,
        second: String,
    },
    /// A class declares a super-class absent from the class set.
    #[error("class `{class}` declares unknown super-class `{super_class}`")]
    UnknownSuperClass { class: String, super_class: String },
    /// A property references a domain or range class absent from the class
    /// set and no override supplies a synthetic target.
    #[error("property `{property}` references unknown class `{class}`")]
    UnresolvedReference { property: String, class: String },
}

/// Synthesizes a [`TypeModel`] from an extracted [`OntologySchema`].
#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    overrides: Overrides,
    policy: UnresolvedPolicy,
}

impl ModelBuilder {
    /// Creates a builder with no overrides and the strict reference policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the override set.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replaces the unresolved-reference policy.
    #[must_use]
    pub fn with_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Walks the class hierarchy superclasses-first, synthesizes one runtime
    /// type per class and wires relationship descriptors onto the domain
    /// types. The returned model is complete; on any error nothing is kept.
    pub fn build(&self, schema: &OntologySchema) -> Result<TypeModel, BuildError> {
        let order = topological_order(schema)?;
        let names = normalized_names(schema)?;

        let mut types: BTreeMap<String, RuntimeType> = BTreeMap::new();
        let mut aliases: BTreeMap<String, String> = BTreeMap::new();
        for id in &order {
            let Some(class) = schema.class(id) else {
                continue;
            };
            let Some(type_name) = names.get(id) else {
                continue;
            };
            let ancestors = ancestor_chain(schema, &names, id, class)?;
            let mut runtime = RuntimeType::new(
                type_name.clone(),
                class.name().safe_name(),
                class.name().code(),
                class.label().map(str::to_owned),
                class.comment().map(str::to_owned),
                ancestors,
            );
            // Every node type carries a free-form value field.
            runtime.add_field(FieldDescriptor::text("value"));
            for factory in self.overrides.fields_for(class) {
                runtime.add_field(factory());
            }
            if class.name().safe_name() != type_name.as_str() {
                aliases.insert(class.name().safe_name().to_owned(), type_name.clone());
            }
            types.insert(type_name.clone(), runtime);
        }

        wiring::wire(&mut types, schema, &self.overrides, self.policy)?;
        debug!(types = types.len(), "type model built");
        Ok(TypeModel::new(types, aliases))
    }
}

fn normalized_names(schema: &OntologySchema) -> Result<BTreeMap<Iri, String>, BuildError> {
    let mut names: BTreeMap<Iri, String> = BTreeMap::new();
    let mut seen: BTreeMap<String, Iri> = BTreeMap::new();
    for (id, class) in schema.classes() {
        let type_name = class.name().type_name().to_owned();
        if let Some(first) = seen.get(&type_name) {
            return Err(BuildError::DuplicateTypeName {
                name: type_name,
                first: first.to_string(),
                second: id.to_string(),
            });
        }
        seen.insert(type_name.clone(), id.clone());
        names.insert(id.clone(), type_name);
    }
    Ok(names)
}

/// Kahn's algorithm over the subclass-of edges, BTree-ordered for
/// deterministic output.
fn topological_order(schema: &OntologySchema) -> Result<Vec<Iri>, BuildError> {
    let mut in_degree: BTreeMap<&Iri, usize> =
        schema.classes().keys().map(|id| (id, 0)).collect();
    let mut children: BTreeMap<&Iri, Vec<&Iri>> = BTreeMap::new();
    for (id, class) in schema.classes() {
        for super_class in class.supers() {
            // Unknown super-classes are reported by the ancestor walk.
            if schema.class(super_class).is_some() {
                if let Some(degree) = in_degree.get_mut(id) {
                    *degree += 1;
                }
                children.entry(super_class).or_default().push(id);
            }
        }
    }

    let mut ready: BTreeSet<&Iri> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(schema.classes().len());
    while let Some(id) = ready.pop_first() {
        order.push(id.clone());
        if let Some(subclasses) = children.get(id) {
            for &subclass in subclasses {
                if let Some(degree) = in_degree.get_mut(subclass) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(subclass);
                    }
                }
            }
        }
    }

    if order.len() < schema.classes().len() {
        let stuck = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(id, _)| (*id).to_string())
            .next()
            .unwrap_or_default();
        return Err(BuildError::CyclicHierarchy { class: stuck });
    }
    Ok(order)
}

/// Breadth-first walk over the super-class edges, so nearer ancestors come
/// first and diamonds collapse to a single entry.
fn ancestor_chain(
    schema: &OntologySchema,
    names: &BTreeMap<Iri, String>,
    id: &Iri,
    class: &ClassDecl,
) -> Result<Vec<String>, BuildError> {
    let mut chain = Vec::new();
    let mut visited: BTreeSet<Iri> = BTreeSet::new();
    let mut queue: VecDeque<Iri> = class.supers().iter().cloned().collect();
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let Some(name) = names.get(&current) else {
            return Err(BuildError::UnknownSuperClass {
                class: id.to_string(),
                super_class: current.to_string(),
            });
        };
        chain.push(name.clone());
        if let Some(super_class) = schema.class(&current) {
            queue.extend(super_class.supers().iter().cloned());
        }
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::{BuildError, ModelBuilder, Overrides};
    use crate::model::registry::ModelRegistry;
    use crate::model::types::{FieldDescriptor, FieldKind};
    use crate::schema::{ClassDecl, Iri, OntologySchema};

    const NS: &str = "http://www.cidoc-crm.org/cidoc-crm/";

    fn iri(local: &str) -> Iri {
        Iri::new(format!("{NS}{local}")).expect("valid iri")
    }

    fn class(local: &str, supers: &[&str]) -> ClassDecl {
        let mut class = ClassDecl::new(iri(local));
        for super_class in supers {
            class.add_super(iri(super_class));
        }
        class
    }

    fn crm_schema() -> OntologySchema {
        let mut schema = OntologySchema::new();
        for decl in [
            class("E1_CRM_Entity", &[]),
            class("E18_Physical_Thing", &["E1_CRM_Entity"]),
            class("E19_Physical_Object", &["E18_Physical_Thing"]),
            class("E20_Biological_Object", &["E19_Physical_Object"]),
            class("E39_Actor", &["E1_CRM_Entity"]),
            class("E21_Person", &["E20_Biological_Object", "E39_Actor"]),
        ] {
            schema.add_class(decl).expect("unique class");
        }
        schema
    }

    #[test]
    fn ancestors_are_bfs_ordered_and_deduplicated() {
        let model = ModelBuilder::new()
            .build(&crm_schema())
            .expect("build succeeds");
        let person = model.get("E21Person").expect("registered");
        assert_eq!(
            person.ancestors(),
            [
                "E20BiologicalObject",
                "E39Actor",
                "E19PhysicalObject",
                "E1CrmEntity",
                "E18PhysicalThing",
            ]
        );
        assert_eq!(person.depth(), 5);
    }

    #[test]
    fn registers_aliases_for_local_names() {
        let model = ModelBuilder::new()
            .build(&crm_schema())
            .expect("build succeeds");
        assert_eq!(
            model.get("E18_Physical_Thing").map(|t| t.name()),
            Some("E18PhysicalThing")
        );
    }

    #[test]
    fn every_type_carries_the_value_field() {
        let model = ModelBuilder::new()
            .build(&crm_schema())
            .expect("build succeeds");
        for runtime in model.types().values() {
            assert!(runtime.fields().contains_key("value"));
        }
    }

    #[test]
    fn field_overrides_win_on_collision() {
        let overrides = Overrides::new()
            .field("E21_Person", || FieldDescriptor::text("forename"))
            .field("E21Person", || {
                FieldDescriptor::new("value", FieldKind::Integer)
            });
        let model = ModelBuilder::new()
            .with_overrides(overrides)
            .build(&crm_schema())
            .expect("build succeeds");
        let person = model.get("E21Person").expect("registered");
        assert_eq!(
            person.fields().get("value").map(FieldDescriptor::kind),
            Some(FieldKind::Integer)
        );
        assert!(person.fields().contains_key("forename"));
    }

    #[test]
    fn cyclic_hierarchy_is_rejected() {
        let mut schema = OntologySchema::new();
        schema
            .add_class(class("E1_CRM_Entity", &["E77_Persistent_Item"]))
            .expect("unique class");
        schema
            .add_class(class("E77_Persistent_Item", &["E1_CRM_Entity"]))
            .expect("unique class");
        let err = ModelBuilder::new().build(&schema).expect_err("cycle");
        assert!(matches!(err, BuildError::CyclicHierarchy { .. }));
    }

    #[test]
    fn colliding_type_names_are_rejected() {
        let mut schema = OntologySchema::new();
        schema
            .add_class(ClassDecl::new(
                Iri::new("http://example.org/vocab/E21_Person").expect("valid iri"),
            ))
            .expect("unique class");
        schema
            .add_class(ClassDecl::new(
                Iri::new("http://example.org/vocab2/E21-Person").expect("valid iri"),
            ))
            .expect("unique class");
        let err = ModelBuilder::new().build(&schema).expect_err("collision");
        assert!(
            matches!(err, BuildError::DuplicateTypeName { name, .. } if name == "E21Person")
        );
    }

    #[test]
    fn unknown_super_class_is_rejected() {
        let mut schema = OntologySchema::new();
        schema
            .add_class(class("E21_Person", &["E39_Actor"]))
            .expect("unique class");
        let err = ModelBuilder::new().build(&schema).expect_err("missing super");
        assert!(matches!(
            err,
            BuildError::UnknownSuperClass { class, super_class }
                if class.ends_with("E21_Person") && super_class.ends_with("E39_Actor")
        ));
    }

    #[test]
    fn failed_build_leaves_the_registry_untouched() {
        let registry = ModelRegistry::new();
        let good = ModelBuilder::new()
            .build(&crm_schema())
            .expect("build succeeds");
        registry.install(good);

        let mut bad = OntologySchema::new();
        bad.add_class(class("E21_Person", &["E39_Actor"]))
            .expect("unique class");
        assert!(ModelBuilder::new().build(&bad).is_err());

        let current = registry.current().expect("previous model intact");
        assert_eq!(current.types().len(), 6);
    }
}
