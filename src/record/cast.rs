use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use uuid::Uuid;

use crate::model::{FieldDescriptor, FieldValue, InferenceError, RelationshipDescriptor, TypeModel};

/// View of a persisted record under one runtime type.
///
/// The structural label set carries the name of every type the record was
/// instantiated under, most derived included; the current type selects which
/// field and relationship surface is presented. Casting never touches the
/// labels or the stored values, it only re-instantiates the view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordView {
    id: Uuid,
    current: String,
    labels: BTreeSet<String>,
    values: BTreeMap<String, FieldValue>,
}

impl RecordView {
    /// Assembles a view over a persisted record. Intended for storage
    /// adapters; `current` must be one of the labels.
    #[must_use]
    pub fn new(
        id: Uuid,
        current: impl Into<String>,
        labels: BTreeSet<String>,
        values: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            id,
            current: current.into(),
            labels,
            values,
        }
    }

    /// Returns the persisted record identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the type the record is currently viewed as.
    #[must_use]
    pub fn current_type(&self) -> &str {
        &self.current
    }

    /// Returns the structural label set.
    #[must_use]
    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Returns the stored scalar values.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    /// Returns one stored scalar value.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Field surface of the current type, ancestors included.
    #[must_use]
    pub fn effective_fields<'m>(
        &self,
        model: &'m TypeModel,
    ) -> Option<BTreeMap<&'m str, &'m FieldDescriptor>> {
        model.effective_fields(&self.current)
    }

    /// Relationship surface of the current type, ancestors included.
    #[must_use]
    pub fn effective_relationships<'m>(
        &self,
        model: &'m TypeModel,
    ) -> Option<BTreeMap<&'m str, &'m RelationshipDescriptor>> {
        model.effective_relationships(&self.current)
    }

    /// Re-instantiates the record as a more derived type.
    ///
    /// Without a target, the most derived registered type among the record's
    /// labels is inferred (longest ancestor chain wins; unrelated maxima are
    /// ambiguous). With a target, the named type must be carried in the label
    /// set and be a descendant of (or equal to) the current type.
    pub fn downcast(
        &self,
        model: &TypeModel,
        target: Option<&str>,
    ) -> Result<RecordView, CastError> {
        match target {
            None => {
                let derived = model.most_derived(&self.labels).map_err(|err| match err {
                    InferenceError::NoMatch => CastError::UnknownType {
                        name: self.current.clone(),
                    },
                    InferenceError::Ambiguous { candidates } => {
                        CastError::AmbiguousType { candidates }
                    }
                })?;
                Ok(self.as_type(derived.name()))
            }
            Some(target) => {
                let Some(target) = model.get(target) else {
                    return Err(CastError::UnknownType {
                        name: target.to_owned(),
                    });
                };
                if !self.labels.contains(target.name())
                    || !model.is_descendant(target.name(), &self.current)
                {
                    return Err(CastError::NotASubclass {
                        target: target.name().to_owned(),
                        current: self.current.clone(),
                    });
                }
                Ok(self.as_type(target.name()))
            }
        }
    }

    /// Re-instantiates the record as an ancestor type (or itself).
    pub fn upcast(&self, model: &TypeModel, target: &str) -> Result<RecordView, CastError> {
        let Some(target) = model.get(target) else {
            return Err(CastError::UnknownType {
                name: target.to_owned(),
            });
        };
        if !model.is_ancestor(target.name(), &self.current) {
            return Err(CastError::NotASuperclass {
                target: target.name().to_owned(),
                current: self.current.clone(),
            });
        }
        Ok(self.as_type(target.name()))
    }

    fn as_type(&self, name: &str) -> RecordView {
        RecordView {
            id: self.id,
            current: name.to_owned(),
            labels: self.labels.clone(),
            values: self.values.clone(),
        }
    }
}

/// Errors raised by cast operations.
///
/// Local to one call: the registry and the persisted record are untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CastError {
    /// The named type is not registered.
    #[error("type `{name}` is not registered")]
    UnknownType { name: String },
    /// The target is not a descendant of the record's current type.
    #[error("`{target}` is not a subclass of `{current}`")]
    NotASubclass { target: String, current: String },
    /// The target is not an ancestor of the record's current type.
    #[error("`{target}` is not a superclass of `{current}`")]
    NotASuperclass { target: String, current: String },
    /// The label set matches several unrelated maximally derived types.
    #[error("record labels match multiple unrelated types: {}", .candidates.join(", "))]
    AmbiguousType { candidates: Vec<String> },
}
