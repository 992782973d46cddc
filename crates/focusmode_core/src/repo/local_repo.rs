//! Typed repository over the local document store.
//!
//! # Responsibility
//! - Map entity drafts to store documents and documents back to entities.
//! - Enforce session lifecycle rules against stored state.
//!
//! # Invariants
//! - Updates merge draft fields over the stored document; identity and
//!   `created_at` are preserved.
//! - A missing id is reported as `StoreError::NotFound`, never as success.

use crate::model::entity::{sort_for_display, Entity, EntityId, TransitionError};
use crate::model::session::Session;
use crate::repo::{EntityRepository, SessionRepository, Source, SourceResult};
use crate::store::{Document, LocalStore, StoreError};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

/// Local store repository for one entity kind.
pub struct LocalRepository<'s, E: Entity> {
    store: &'s LocalStore,
    _kind: PhantomData<E>,
}

impl<'s, E: Entity> LocalRepository<'s, E> {
    pub fn new(store: &'s LocalStore) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    /// Loads one entity by id.
    pub fn get(&self, id: &EntityId) -> SourceResult<Option<E>> {
        self.store
            .get(E::KIND.collection(), &id.to_string())?
            .map(decode_document)
            .transpose()
    }

    fn load_existing(&self, id: &EntityId) -> SourceResult<(Document, E)> {
        let document = self
            .store
            .get(E::KIND.collection(), &id.to_string())?
            .ok_or_else(|| self.not_found(id))?;
        let entity = decode_document(document.clone())?;
        Ok((document, entity))
    }

    // Rewrites a stored entity in place after a typed edit.
    fn patch(
        &self,
        id: &EntityId,
        edit: impl FnOnce(&mut E) -> Result<(), TransitionError>,
    ) -> SourceResult<()> {
        let (_, mut entity) = self.load_existing(id)?;
        edit(&mut entity)?;
        self.store
            .set(E::KIND.collection(), encode_document(&entity)?)?;
        Ok(())
    }

    fn not_found(&self, id: &EntityId) -> StoreError {
        StoreError::NotFound {
            collection: E::KIND.collection().to_string(),
            id: id.to_string(),
        }
    }
}

impl<E: Entity> EntityRepository<E> for LocalRepository<'_, E> {
    fn source(&self) -> Source {
        Source::Local
    }

    fn list(&self) -> SourceResult<Vec<E>> {
        let mut items = self
            .store
            .get_all(E::KIND.collection())?
            .into_iter()
            .map(decode_document)
            .collect::<SourceResult<Vec<E>>>()?;
        sort_for_display(&mut items);
        Ok(items)
    }

    fn create(&self, draft: &E::Draft) -> SourceResult<EntityId> {
        let mut document = encode_document(draft)?;
        document.remove("id");
        let stored = self.store.set(E::KIND.collection(), document)?;
        let id = stored.get("id").cloned().ok_or_else(|| {
            StoreError::InvalidData(format!(
                "store returned a `{}` document without id",
                E::KIND.collection()
            ))
        })?;
        Ok(serde_json::from_value(id)?)
    }

    fn update(&self, id: &EntityId, draft: &E::Draft) -> SourceResult<()> {
        let (mut document, current) = self.load_existing(id)?;
        current.check_update(draft)?;
        for (field, value) in encode_document(draft)? {
            if field != "id" {
                document.insert(field, value);
            }
        }
        self.store.set(E::KIND.collection(), document)?;
        Ok(())
    }

    fn delete(&self, id: &EntityId) -> SourceResult<()> {
        self.store.delete(E::KIND.collection(), &id.to_string())?;
        Ok(())
    }
}

impl SessionRepository for LocalRepository<'_, Session> {
    fn start(&self, id: &EntityId) -> SourceResult<()> {
        self.patch(id, |session| session.start(Utc::now()))
    }

    fn complete(&self, id: &EntityId, duration: u32) -> SourceResult<()> {
        self.patch(id, |session| session.complete(duration, Utc::now()))
    }
}

fn encode_document<T: Serialize>(value: &T) -> SourceResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidData(format!(
            "expected a JSON object to store, got `{other}`"
        ))
        .into()),
    }
}

fn decode_document<E: Entity>(document: Document) -> SourceResult<E> {
    Ok(serde_json::from_value(Value::Object(document))?)
}
