//! In-memory caches of backend resources.
//!
//! Lists are fetched through the [`ApiClient`] and denormalized by location, so views for a single
//! location never have to filter the full result set. The local mutation helpers apply changes
//! optimistically; the backend stays the source of truth and a later `fetch` overwrites them.

pub mod location;
pub mod menu;
pub mod orders;

pub use location::LocationCache;

use crate::config::BackendEndpoint;
use crate::error::Error;
use crate::pipeline::ApiClient;
use crate::request::RequestDescriptor;
use fadmin_protocol::Id;
use fadmin_protocol::http::resources::{
    Feedback, LocationScoped, MenuCategory, MenuItem, Order, StaffMember,
};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::instrument;

/// A location scoped resource the backend serves as a per-location collection.
pub trait CachedResource:
    LocationScoped + Clone + DeserializeOwned + Send + Sync + 'static
{
    /// Human readable name used in logs.
    const NAME: &'static str;

    fn endpoint(location_id: Id) -> BackendEndpoint;
}

impl CachedResource for MenuCategory {
    const NAME: &'static str = "menu category";

    fn endpoint(location_id: Id) -> BackendEndpoint {
        BackendEndpoint::MenuCategories(location_id)
    }
}

impl CachedResource for MenuItem {
    const NAME: &'static str = "menu item";

    fn endpoint(location_id: Id) -> BackendEndpoint {
        BackendEndpoint::MenuItems(location_id)
    }
}

impl CachedResource for StaffMember {
    const NAME: &'static str = "staff member";

    fn endpoint(location_id: Id) -> BackendEndpoint {
        BackendEndpoint::Staff(location_id)
    }
}

impl CachedResource for Order {
    const NAME: &'static str = "order";

    fn endpoint(location_id: Id) -> BackendEndpoint {
        BackendEndpoint::Orders(location_id)
    }
}

impl CachedResource for Feedback {
    const NAME: &'static str = "feedback";

    fn endpoint(location_id: Id) -> BackendEndpoint {
        BackendEndpoint::Feedback(location_id)
    }
}

pub type MenuCategoryCache = LocationScopedCache<MenuCategory>;
pub type MenuItemCache = LocationScopedCache<MenuItem>;
pub type StaffCache = LocationScopedCache<StaffMember>;
pub type OrderCache = LocationScopedCache<Order>;
pub type FeedbackCache = LocationScopedCache<Feedback>;

/// Cache of one resource type keyed by location ID.
pub struct LocationScopedCache<T: CachedResource> {
    api: ApiClient,
    entries: RwLock<HashMap<Id, Vec<T>>>,
}

impl<T: CachedResource> LocationScopedCache<T> {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.api
    }

    fn collection_path(&self, location_id: Id) -> String {
        self.api.config().endpoint_path(T::endpoint(location_id))
    }

    pub(crate) fn item_path(&self, location_id: Id, id: Id) -> String {
        format!(
            "{}/{id}/",
            self.collection_path(location_id).trim_end_matches('/')
        )
    }

    /// Fetches the full collection of `location_id`, replacing the cached one.
    #[instrument(level = "debug", skip(self), fields(resource = T::NAME), err)]
    pub async fn fetch(&self, location_id: Id) -> Result<Vec<T>, Error> {
        let items = self
            .api
            .get_json::<Vec<T>>(&self.collection_path(location_id), None)
            .await?;
        tracing::debug!(count = items.len(), "Fetched collection");
        self.entries.write().insert(location_id, items.clone());
        Ok(items)
    }

    /// Returns the cached collection, fetching it if the location was never loaded.
    pub async fn get_or_fetch(&self, location_id: Id) -> Result<Vec<T>, Error> {
        match self.get(location_id) {
            Some(items) => Ok(items),
            None => self.fetch(location_id).await,
        }
    }

    pub fn get(&self, location_id: Id) -> Option<Vec<T>> {
        self.entries.read().get(&location_id).cloned()
    }

    pub fn find(&self, location_id: Id, id: Id) -> Option<T> {
        self.entries
            .read()
            .get(&location_id)?
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// IDs of all locations with a cached collection.
    pub fn locations(&self) -> Vec<Id> {
        let mut locations = self.entries.read().keys().copied().collect::<Vec<_>>();
        locations.sort_unstable();
        locations
    }

    /// Adds `item` to its location's collection, replacing an entry with the same ID.
    pub fn insert(&self, item: T) {
        let mut entries = self.entries.write();
        let items = entries.entry(item.location_id()).or_default();
        match items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Replaces the cached entry with the same ID. Returns `false` if no such entry is cached.
    pub fn update(&self, item: T) -> bool {
        let mut entries = self.entries.write();
        let Some(existing) = entries
            .get_mut(&item.location_id())
            .and_then(|items| items.iter_mut().find(|existing| existing.id() == item.id()))
        else {
            return false;
        };
        *existing = item;
        true
    }

    /// Applies `f` to the cached entry and returns the entry as it was before.
    pub fn modify(&self, location_id: Id, id: Id, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut entries = self.entries.write();
        let existing = entries
            .get_mut(&location_id)?
            .iter_mut()
            .find(|item| item.id() == id)?;
        let previous = existing.clone();
        f(existing);
        Some(previous)
    }

    pub fn remove(&self, location_id: Id, id: Id) -> Option<T> {
        let mut entries = self.entries.write();
        let items = entries.get_mut(&location_id)?;
        let pos = items.iter().position(|item| item.id() == id)?;
        Some(items.remove(pos))
    }

    /// Forgets the collection of `location_id`, the next [`Self::get_or_fetch`] reloads it.
    pub fn invalidate(&self, location_id: Id) {
        self.entries.write().remove(&location_id);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Creates a resource in `location_id` and caches the backend's representation of it.
    #[instrument(level = "debug", skip(self, payload), fields(resource = T::NAME), err)]
    pub async fn create<P: Serialize>(&self, location_id: Id, payload: &P) -> Result<T, Error> {
        let descriptor =
            RequestDescriptor::post(self.collection_path(location_id)).with_json(payload)?;
        let created = self.api.request(descriptor).await?.json::<T>()?;
        self.insert(created.clone());
        Ok(created)
    }

    /// Deletes a resource, removing it from the cache only once the backend confirmed.
    #[instrument(level = "debug", skip(self), fields(resource = T::NAME), err)]
    pub async fn delete(&self, location_id: Id, id: Id) -> Result<(), Error> {
        self.api.delete(&self.item_path(location_id, id)).await?;
        self.remove(location_id, id);
        Ok(())
    }
}

/// Every resource cache of a dashboard session, sharing one [`ApiClient`].
pub struct ResourceCaches {
    pub locations: LocationCache,
    pub menu_categories: MenuCategoryCache,
    pub menu_items: MenuItemCache,
    pub staff: StaffCache,
    pub orders: OrderCache,
    pub feedback: FeedbackCache,
}

impl ResourceCaches {
    pub fn new(api: &ApiClient) -> Self {
        Self {
            locations: LocationCache::new(api.clone()),
            menu_categories: LocationScopedCache::new(api.clone()),
            menu_items: LocationScopedCache::new(api.clone()),
            staff: LocationScopedCache::new(api.clone()),
            orders: LocationScopedCache::new(api.clone()),
            feedback: LocationScopedCache::new(api.clone()),
        }
    }

    /// Drops everything cached, e.g. after logging out.
    pub fn clear(&self) {
        self.locations.clear();
        self.menu_categories.clear();
        self.menu_items.clear();
        self.staff.clear();
        self.orders.clear();
        self.feedback.clear();
    }
}
