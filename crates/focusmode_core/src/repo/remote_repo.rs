//! Repository adapter over the remote API client.

use crate::auth::SessionContext;
use crate::model::entity::{sort_for_display, Entity, EntityId};
use crate::model::session::Session;
use crate::remote::RemoteClient;
use crate::repo::{EntityRepository, SessionRepository, Source, SourceResult};
use std::marker::PhantomData;

/// Remote repository for one entity kind, bound to one session context.
pub struct RemoteRepository<'c, E: Entity> {
    client: &'c RemoteClient,
    context: &'c SessionContext,
    _kind: PhantomData<E>,
}

impl<'c, E: Entity> RemoteRepository<'c, E> {
    pub fn new(client: &'c RemoteClient, context: &'c SessionContext) -> Self {
        Self {
            client,
            context,
            _kind: PhantomData,
        }
    }
}

impl<E: Entity> EntityRepository<E> for RemoteRepository<'_, E> {
    fn source(&self) -> Source {
        Source::Remote
    }

    fn list(&self) -> SourceResult<Vec<E>> {
        let mut items = self.client.list::<E>(self.context)?;
        sort_for_display(&mut items);
        Ok(items)
    }

    fn create(&self, draft: &E::Draft) -> SourceResult<EntityId> {
        Ok(self.client.create::<E>(self.context, draft)?)
    }

    fn update(&self, id: &EntityId, draft: &E::Draft) -> SourceResult<()> {
        Ok(self.client.update::<E>(self.context, id, draft)?)
    }

    fn delete(&self, id: &EntityId) -> SourceResult<()> {
        Ok(self.client.delete::<E>(self.context, id)?)
    }
}

impl SessionRepository for RemoteRepository<'_, Session> {
    fn start(&self, id: &EntityId) -> SourceResult<()> {
        Ok(self.client.start_session(self.context, id)?)
    }

    fn complete(&self, id: &EntityId, duration: u32) -> SourceResult<()> {
        Ok(self.client.complete_session(self.context, id, duration)?)
    }
}
