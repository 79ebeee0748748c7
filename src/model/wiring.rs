//! Relationship wiring pass.
//!
//! Runs once per build, after every runtime type exists and before the model
//! is returned. Each ontology property becomes either a relationship
//! descriptor on its domain type or, for literal-ranged properties, a scalar
//! field. Descendant types never receive copies: the effective relationship
//! set is resolved through the ancestor chain at lookup time.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    config::UnresolvedPolicy,
    schema::{Iri, OntologySchema, PropertyDecl},
};

use super::{
    builder::{BuildError, Overrides},
    types::{FieldDescriptor, RelationshipDescriptor, RuntimeType},
};

/// Resolution of one end of a property declaration.
enum End {
    /// The end names a registered type.
    Known(String),
    /// The end is undeclared, or unresolved under the lenient policy.
    Unconstrained,
    /// The end is `rdfs:Literal`: the property is a scalar field.
    Literal,
}

pub(crate) fn wire(
    types: &mut BTreeMap<String, RuntimeType>,
    schema: &OntologySchema,
    overrides: &Overrides,
    policy: UnresolvedPolicy,
) -> Result<(), BuildError> {
    let roots: Vec<String> = types
        .values()
        .filter(|t| t.is_root())
        .map(|t| t.name().to_owned())
        .collect();

    for property in schema.properties().values() {
        let overridden = overrides.relationship_for(property.name()).is_some();
        let domain = resolve_end(types, property, property.domain(), policy, overridden)?;
        let range = resolve_end(types, property, property.range(), policy, overridden)?;

        // An unconstrained domain falls back to the hierarchy roots.
        let owners: Vec<String> = match &domain {
            End::Known(name) => vec![name.clone()],
            End::Unconstrained => roots.clone(),
            End::Literal => continue,
        };

        if matches!(range, End::Literal) {
            // Text-valued properties such as P3_has_note become fields.
            let field = FieldDescriptor::text(property.name().safe_name());
            debug!(property = property.name().safe_name(), "literal range declared as field");
            for owner in &owners {
                if let Some(runtime) = types.get_mut(owner) {
                    runtime.add_field(field.clone());
                }
            }
            continue;
        }

        let target = match &range {
            End::Known(name) => Some(name.clone()),
            _ => None,
        };
        for owner in owners {
            let blueprint = RelationshipDescriptor::new(
                property.name().safe_name(),
                property.name().type_name(),
                owner.clone(),
                target.clone(),
            );
            let descriptor = match overrides.relationship_for(property.name()) {
                Some(factory) => factory(blueprint),
                None => blueprint,
            };
            if let Some(target) = &descriptor.target {
                if !types.contains_key(target) {
                    return Err(BuildError::UnresolvedReference {
                        property: property.name().safe_name().to_owned(),
                        class: target.clone(),
                    });
                }
            }

            let backward = descriptor
                .inverse
                .as_ref()
                .zip(descriptor.target.as_ref())
                .map(|(inverse, target)| {
                    let mut flipped = RelationshipDescriptor::new(
                        inverse.clone(),
                        descriptor.edge_type.clone(),
                        target.clone(),
                        Some(descriptor.source.clone()),
                    );
                    flipped.inverse = Some(descriptor.name.clone());
                    (target.clone(), flipped)
                });

            if let Some(runtime) = types.get_mut(&owner) {
                runtime.add_relationship(descriptor);
            }
            if let Some((target, flipped)) = backward {
                if let Some(runtime) = types.get_mut(&target) {
                    runtime.add_relationship(flipped);
                }
            }
        }
    }
    Ok(())
}

fn resolve_end(
    types: &BTreeMap<String, RuntimeType>,
    property: &PropertyDecl,
    end: Option<&Iri>,
    policy: UnresolvedPolicy,
    overridden: bool,
) -> Result<End, BuildError> {
    let Some(end) = end else {
        return Ok(End::Unconstrained);
    };
    let name = end.local_name();
    if name.type_name() == "Literal" {
        return Ok(End::Literal);
    }
    if types.contains_key(name.type_name()) {
        return Ok(End::Known(name.type_name().to_owned()));
    }
    // A declared end naming a class outside the class set: an override can
    // still supply a synthetic target, and the lenient policy downgrades the
    // reference to an unconstrained end.
    if overridden || policy == UnresolvedPolicy::Unconstrained {
        debug!(
            property = property.name().safe_name(),
            class = name.type_name(),
            "treating unresolved reference as unconstrained"
        );
        return Ok(End::Unconstrained);
    }
    Err(BuildError::UnresolvedReference {
        property: property.name().safe_name().to_owned(),
        class: name.type_name().to_owned(),
    })
}
