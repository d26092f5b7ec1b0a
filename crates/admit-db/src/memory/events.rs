//! Events

use async_trait::async_trait;

use admit_core::entities::Event;
use admit_core::traits::{EventRepository, RepoResult};
use admit_core::value_objects::Snowflake;

use super::MemoryStore;

#[async_trait]
impl EventRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Event>> {
        Ok(self.events.get(&id).map(|event| event.clone()))
    }

    async fn create(&self, event: &Event) -> RepoResult<()> {
        self.seed_event(event.clone());
        Ok(())
    }
}
