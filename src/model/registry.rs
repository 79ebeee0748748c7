use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, RwLock},
};

use serde::Serialize;
use thiserror::Error;

use super::types::{FieldDescriptor, RelationshipDescriptor, RuntimeType};

/// Complete set of runtime types produced by one build.
///
/// Types are keyed by their normalized name; the alias table maps each
/// original local name (`E21_Person`) onto the normalized one (`E21Person`)
/// so callers can look types up either way. Immutable once returned by the
/// builder, so it is safe to share behind an [`Arc`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TypeModel {
    types: BTreeMap<String, RuntimeType>,
    aliases: BTreeMap<String, String>,
}

impl TypeModel {
    pub(crate) fn new(types: BTreeMap<String, RuntimeType>, aliases: BTreeMap<String, String>) -> Self {
        Self { types, aliases }
    }

    /// Looks a type up by normalized name or original local name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RuntimeType> {
        self.types.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|canonical| self.types.get(canonical))
        })
    }

    /// Returns all types keyed by normalized name.
    #[must_use]
    pub fn types(&self) -> &BTreeMap<String, RuntimeType> {
        &self.types
    }

    /// Returns every root type (no super-class).
    #[must_use]
    pub fn roots(&self) -> Vec<&RuntimeType> {
        self.types.values().filter(|t| t.is_root()).collect()
    }

    /// Whether `descendant` is `ancestor` or inherits from it.
    #[must_use]
    pub fn is_descendant(&self, descendant: &str, ancestor: &str) -> bool {
        let (Some(descendant), Some(ancestor)) = (self.get(descendant), self.get(ancestor)) else {
            return false;
        };
        descendant.name() == ancestor.name()
            || descendant.ancestors().iter().any(|name| name == ancestor.name())
    }

    /// Whether `ancestor` is `descendant` or one of its super-types.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.is_descendant(descendant, ancestor)
    }

    /// Effective field surface: own declarations plus every ancestor's,
    /// nearer declarations shadowing farther ones.
    #[must_use]
    pub fn effective_fields(&self, name: &str) -> Option<BTreeMap<&str, &FieldDescriptor>> {
        let target = self.get(name)?;
        let mut surface = BTreeMap::new();
        for ancestor in target.ancestors().iter().rev() {
            if let Some(ancestor) = self.types.get(ancestor) {
                for (key, field) in ancestor.fields() {
                    surface.insert(key.as_str(), field);
                }
            }
        }
        for (key, field) in target.fields() {
            surface.insert(key.as_str(), field);
        }
        Some(surface)
    }

    /// Effective relationship surface, resolved the same way as fields.
    #[must_use]
    pub fn effective_relationships(
        &self,
        name: &str,
    ) -> Option<BTreeMap<&str, &RelationshipDescriptor>> {
        let target = self.get(name)?;
        let mut surface = BTreeMap::new();
        for ancestor in target.ancestors().iter().rev() {
            if let Some(ancestor) = self.types.get(ancestor) {
                for (key, descriptor) in ancestor.relationships() {
                    surface.insert(key.as_str(), descriptor);
                }
            }
        }
        for (key, descriptor) in target.relationships() {
            surface.insert(key.as_str(), descriptor);
        }
        Some(surface)
    }

    /// Most specific registered type among a record's structural labels.
    ///
    /// The deepest ancestor chain wins; several unrelated maximal types are
    /// an ambiguity the caller has to resolve by naming a target.
    pub fn most_derived(
        &self,
        labels: &BTreeSet<String>,
    ) -> Result<&RuntimeType, InferenceError> {
        let candidates: BTreeMap<&str, &RuntimeType> = labels
            .iter()
            .filter_map(|label| self.get(label))
            .map(|t| (t.name(), t))
            .collect();
        let Some(max_depth) = candidates.values().map(|t| t.depth()).max() else {
            return Err(InferenceError::NoMatch);
        };
        let deepest: Vec<&RuntimeType> = candidates
            .into_values()
            .filter(|t| t.depth() == max_depth)
            .collect();
        match deepest.as_slice() {
            [single] => Ok(*single),
            _ => Err(InferenceError::Ambiguous {
                candidates: deepest.iter().map(|t| t.name().to_owned()).collect(),
            }),
        }
    }
}

/// Errors raised while inferring a type from structural labels.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// None of the labels names a registered type.
    #[error("no registered type matches the record's labels")]
    NoMatch,
    /// Several unrelated types are maximally derived.
    #[error("ambiguous most derived type among [{}]", .candidates.join(", "))]
    Ambiguous { candidates: Vec<String> },
}

/// Process-wide holder for the active [`TypeModel`].
///
/// A rebuild fully replaces the previous model or, on failure, leaves it
/// untouched; readers keep whatever snapshot they grabbed.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    current: RwLock<Option<Arc<TypeModel>>>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fully built model, replacing any previous one.
    pub fn install(&self, model: TypeModel) -> Arc<TypeModel> {
        let model = Arc::new(model);
        let mut guard = self
            .current
            .write()
            .expect("model registry lock poisoned");
        *guard = Some(Arc::clone(&model));
        model
    }

    /// Returns the active model, if a build has been installed.
    #[must_use]
    pub fn current(&self) -> Option<Arc<TypeModel>> {
        self.current
            .read()
            .expect("model registry lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::{InferenceError, ModelRegistry, TypeModel};
    use crate::model::types::{FieldDescriptor, RuntimeType};

    fn model() -> TypeModel {
        let mut types = BTreeMap::new();
        let mut entity = RuntimeType::new("E1CrmEntity", "E1_CRM_Entity", "E1", None, None, vec![]);
        entity.add_field(FieldDescriptor::text("value"));
        types.insert("E1CrmEntity".to_owned(), entity);

        let actor = RuntimeType::new(
            "E39Actor",
            "E39_Actor",
            "E39",
            None,
            None,
            vec!["E1CrmEntity".to_owned()],
        );
        types.insert("E39Actor".to_owned(), actor);

        let mut person = RuntimeType::new(
            "E21Person",
            "E21_Person",
            "E21",
            None,
            None,
            vec!["E39Actor".to_owned(), "E1CrmEntity".to_owned()],
        );
        person.add_field(FieldDescriptor::text("forename"));
        types.insert("E21Person".to_owned(), person);

        let place = RuntimeType::new(
            "E53Place",
            "E53_Place",
            "E53",
            None,
            None,
            vec!["E1CrmEntity".to_owned()],
        );
        types.insert("E53Place".to_owned(), place);

        let aliases = [
            ("E1_CRM_Entity", "E1CrmEntity"),
            ("E39_Actor", "E39Actor"),
            ("E21_Person", "E21Person"),
            ("E53_Place", "E53Place"),
        ]
        .into_iter()
        .map(|(alias, canonical)| (alias.to_owned(), canonical.to_owned()))
        .collect();

        TypeModel::new(types, aliases)
    }

    fn labels(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn lookup_accepts_both_name_forms() {
        let model = model();
        assert!(model.get("E21Person").is_some());
        assert_eq!(
            model.get("E21_Person").map(RuntimeType::name),
            Some("E21Person")
        );
        assert!(model.get("E99Unknown").is_none());
    }

    #[test]
    fn ancestry_checks_include_equality() {
        let model = model();
        assert!(model.is_descendant("E21Person", "E39Actor"));
        assert!(model.is_descendant("E21Person", "E21Person"));
        assert!(model.is_ancestor("E1CrmEntity", "E53Place"));
        assert!(!model.is_descendant("E53Place", "E39Actor"));
    }

    #[test]
    fn effective_fields_union_ancestors() {
        let model = model();
        let surface = model.effective_fields("E21Person").expect("known type");
        assert!(surface.contains_key("value"), "inherited from the root");
        assert!(surface.contains_key("forename"), "declared on the type");
        let root_surface = model.effective_fields("E1CrmEntity").expect("root");
        assert!(!root_surface.contains_key("forename"));
    }

    #[test]
    fn most_derived_prefers_the_longest_chain() {
        let model = model();
        let derived = model
            .most_derived(&labels(&["E1CrmEntity", "E39Actor", "E21Person"]))
            .expect("unambiguous");
        assert_eq!(derived.name(), "E21Person");
    }

    #[test]
    fn most_derived_rejects_unrelated_maxima() {
        let model = model();
        let err = model
            .most_derived(&labels(&["E39Actor", "E53Place"]))
            .expect_err("two unrelated depth-1 types");
        assert!(matches!(err, InferenceError::Ambiguous { candidates } if candidates.len() == 2));
    }

    #[test]
    fn most_derived_requires_registered_labels() {
        let model = model();
        let err = model
            .most_derived(&labels(&["E99Unknown"]))
            .expect_err("nothing registered");
        assert_eq!(err, InferenceError::NoMatch);
    }

    #[test]
    fn registry_replaces_wholesale() {
        let registry = ModelRegistry::new();
        assert!(registry.current().is_none());

        let first = registry.install(model());
        assert_eq!(
            registry.current().map(|m| m.types().len()),
            Some(first.types().len())
        );

        registry.install(TypeModel::default());
        let replaced = registry.current().expect("installed");
        assert!(replaced.types().is_empty());
        assert_eq!(first.types().len(), 4, "old snapshot untouched");
    }
}
