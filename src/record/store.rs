use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::model::{FieldValue, TypeModel};

use super::cast::RecordView;

/// Contract the core expects from the graph storage engine.
///
/// Records are created under their most derived type and persist the full
/// structural label set; relationship writes are validated against the
/// descriptor declared on the source view's current type, ancestors
/// included.
#[async_trait]
pub trait GraphStore {
    /// Associated error type allowing infrastructure specific failures.
    type Error;

    /// Instantiates a record, labelling it with the type and every ancestor.
    async fn create(
        &self,
        type_name: &str,
        values: BTreeMap<String, FieldValue>,
    ) -> Result<RecordView, Self::Error>;

    /// Re-inflates a record under any label it carries.
    async fn fetch(&self, id: Uuid, as_type: &str) -> Result<RecordView, Self::Error>;

    /// Connects two records through a declared relationship, enforcing the
    /// descriptor's range constraint before the write.
    async fn connect(
        &self,
        from: &RecordView,
        relationship: &str,
        to: Uuid,
    ) -> Result<(), Self::Error>;

    /// Returns the records connected through the named relationship.
    async fn related(&self, id: Uuid, relationship: &str) -> Result<Vec<Uuid>, Self::Error>;
}

/// Errors raised by the in-memory reference store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named type is not registered in the active model.
    #[error("type `{name}` is not registered")]
    UnknownType { name: String },
    /// The record does not exist.
    #[error("record `{id}` not found")]
    MissingRecord { id: Uuid },
    /// The record does not carry the requested label.
    #[error("record `{id}` does not carry label `{label}`")]
    MissingLabel { id: Uuid, label: String },
    /// The source type declares no such relationship, own or inherited.
    #[error("type `{type_name}` declares no relationship `{relationship}`")]
    UnknownRelationship {
        type_name: String,
        relationship: String,
    },
    /// The target record does not satisfy the declared range constraint.
    #[error("relationship `{relationship}` expects a `{expected}` target, record `{id}` is not one")]
    ConstraintViolation {
        relationship: String,
        expected: String,
        id: Uuid,
    },
}

#[derive(Debug)]
struct StoredRecord {
    labels: BTreeSet<String>,
    values: BTreeMap<String, FieldValue>,
}

#[derive(Debug, PartialEq, Eq)]
struct StoredEdge {
    from: Uuid,
    relationship: String,
    to: Uuid,
}

#[derive(Debug, Default)]
struct GraphState {
    records: BTreeMap<Uuid, StoredRecord>,
    edges: Vec<StoredEdge>,
}

/// In-memory [`GraphStore`] used by tests and embedded callers.
#[derive(Debug)]
pub struct MemoryGraph {
    model: Arc<TypeModel>,
    state: Mutex<GraphState>,
}

impl MemoryGraph {
    /// Creates an empty store bound to a built model.
    #[must_use]
    pub fn new(model: Arc<TypeModel>) -> Self {
        Self {
            model,
            state: Mutex::new(GraphState::default()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().expect("in-memory graph store poisoned")
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    type Error = StoreError;

    async fn create(
        &self,
        type_name: &str,
        values: BTreeMap<String, FieldValue>,
    ) -> Result<RecordView, Self::Error> {
        let Some(runtime) = self.model.get(type_name) else {
            return Err(StoreError::UnknownType {
                name: type_name.to_owned(),
            });
        };
        let mut labels: BTreeSet<String> = runtime.ancestors().iter().cloned().collect();
        labels.insert(runtime.name().to_owned());

        let id = Uuid::new_v4();
        let mut guard = self.guard();
        guard.records.insert(
            id,
            StoredRecord {
                labels: labels.clone(),
                values: values.clone(),
            },
        );
        debug!(record = %id, type_name = runtime.name(), "record created");
        Ok(RecordView::new(id, runtime.name(), labels, values))
    }

    async fn fetch(&self, id: Uuid, as_type: &str) -> Result<RecordView, Self::Error> {
        let Some(runtime) = self.model.get(as_type) else {
            return Err(StoreError::UnknownType {
                name: as_type.to_owned(),
            });
        };
        let guard = self.guard();
        let Some(record) = guard.records.get(&id) else {
            return Err(StoreError::MissingRecord { id });
        };
        if !record.labels.contains(runtime.name()) {
            return Err(StoreError::MissingLabel {
                id,
                label: runtime.name().to_owned(),
            });
        }
        Ok(RecordView::new(
            id,
            runtime.name(),
            record.labels.clone(),
            record.values.clone(),
        ))
    }

    async fn connect(
        &self,
        from: &RecordView,
        relationship: &str,
        to: Uuid,
    ) -> Result<(), Self::Error> {
        let Some(surface) = self.model.effective_relationships(from.current_type()) else {
            return Err(StoreError::UnknownType {
                name: from.current_type().to_owned(),
            });
        };
        let Some(descriptor) = surface.get(relationship) else {
            return Err(StoreError::UnknownRelationship {
                type_name: from.current_type().to_owned(),
                relationship: relationship.to_owned(),
            });
        };

        let mut guard = self.guard();
        if !guard.records.contains_key(&from.id()) {
            return Err(StoreError::MissingRecord { id: from.id() });
        }
        let Some(target) = guard.records.get(&to) else {
            return Err(StoreError::MissingRecord { id: to });
        };
        // A record labelled with any descendant of the expected class also
        // carries the expected label itself, so one membership test covers
        // subtype targets.
        if let Some(expected) = &descriptor.target {
            if !target.labels.contains(expected.as_str()) {
                return Err(StoreError::ConstraintViolation {
                    relationship: relationship.to_owned(),
                    expected: expected.clone(),
                    id: to,
                });
            }
        }
        guard.edges.push(StoredEdge {
            from: from.id(),
            relationship: relationship.to_owned(),
            to,
        });
        Ok(())
    }

    async fn related(&self, id: Uuid, relationship: &str) -> Result<Vec<Uuid>, Self::Error> {
        let guard = self.guard();
        if !guard.records.contains_key(&id) {
            return Err(StoreError::MissingRecord { id });
        }
        Ok(guard
            .edges
            .iter()
            .filter(|edge| edge.from == id && edge.relationship == relationship)
            .map(|edge| edge.to)
            .collect())
    }
}
