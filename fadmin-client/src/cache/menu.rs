use crate::cache::{MenuCategoryCache, MenuItemCache};
use fadmin_protocol::Id;
use fadmin_protocol::http::resources::{MenuCategory, MenuItem};

impl MenuCategoryCache {
    /// Cached categories of `location_id` in display order.
    pub fn ordered(&self, location_id: Id) -> Option<Vec<MenuCategory>> {
        let mut categories = self.get(location_id)?;
        categories.sort_by_key(|category| (category.position, category.id));
        Some(categories)
    }
}

impl MenuItemCache {
    pub fn items_in_category(&self, location_id: Id, category_id: Id) -> Vec<MenuItem> {
        self.get(location_id)
            .unwrap_or_default()
            .into_iter()
            .filter(|item| item.category == category_id)
            .collect()
    }

    /// Flips availability locally and returns the new value, `None` if the item is not cached.
    pub fn toggle_availability(&self, location_id: Id, item_id: Id) -> Option<bool> {
        self.modify(location_id, item_id, |item| item.is_available = !item.is_available)
            .map(|previous| !previous.is_available)
    }
}
