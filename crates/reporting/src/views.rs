//! In-memory saved-view store — the persistence the report UI saves its
//! date/dimension/sort bundles into.

use crate::dates::SavedView;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

pub struct SavedViewStore {
    views: DashMap<Uuid, SavedView>,
}

impl SavedViewStore {
    pub fn new() -> Self {
        Self {
            views: DashMap::new(),
        }
    }

    pub fn create(&self, view: SavedView) -> Uuid {
        let id = view.id;
        self.views.insert(id, view);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<SavedView> {
        self.views.get(id).map(|v| v.clone())
    }

    pub fn update(&self, id: Uuid, mut view: SavedView) -> bool {
        if self.views.contains_key(&id) {
            view.updated_at = Utc::now();
            self.views.insert(id, view);
            true
        } else {
            false
        }
    }

    pub fn delete(&self, id: &Uuid) -> bool {
        self.views.remove(id).is_some()
    }

    pub fn list(&self, created_by: Option<&Uuid>) -> Vec<SavedView> {
        self.views
            .iter()
            .filter(|v| created_by.is_none_or(|uid| &v.created_by == uid))
            .map(|v| v.clone())
            .collect()
    }
}

impl Default for SavedViewStore {
    fn default() -> Self {
        Self::new()
    }
}
