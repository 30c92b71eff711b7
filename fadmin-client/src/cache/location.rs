use crate::config::BackendEndpoint;
use crate::error::Error;
use crate::pipeline::ApiClient;
use fadmin_protocol::Id;
use fadmin_protocol::http::resources::{Location, Resource};
use parking_lot::RwLock;
use tracing::instrument;

/// Locations visible to the logged in user. The backend already limits franchise admins to their
/// own location.
pub struct LocationCache {
    api: ApiClient,
    locations: RwLock<Option<Vec<Location>>>,
}

impl LocationCache {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            locations: RwLock::new(None),
        }
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch(&self) -> Result<Vec<Location>, Error> {
        let path = self.api.config().endpoint_path(BackendEndpoint::Locations);
        let locations = self.api.get_json::<Vec<Location>>(&path, None).await?;
        tracing::debug!(count = locations.len(), "Fetched locations");
        *self.locations.write() = Some(locations.clone());
        Ok(locations)
    }

    /// Cached locations, `None` until the first successful fetch.
    pub fn all(&self) -> Option<Vec<Location>> {
        self.locations.read().clone()
    }

    pub fn get(&self, id: Id) -> Option<Location> {
        self.locations
            .read()
            .as_ref()?
            .iter()
            .find(|location| location.id() == id)
            .cloned()
    }

    pub fn upsert(&self, location: Location) {
        let mut locations = self.locations.write();
        let locations = locations.get_or_insert_with(Vec::new);
        match locations.iter_mut().find(|existing| existing.id == location.id) {
            Some(existing) => *existing = location,
            None => locations.push(location),
        }
    }

    pub fn remove(&self, id: Id) -> Option<Location> {
        let mut locations = self.locations.write();
        let locations = locations.as_mut()?;
        let pos = locations.iter().position(|location| location.id == id)?;
        Some(locations.remove(pos))
    }

    pub fn clear(&self) {
        *self.locations.write() = None;
    }
}
