use serde::{Deserialize, Serialize};

use picsort_api::{CatalogResponse, Item, SettingsMap};

/// The catalog snapshot held by the catalog store.
///
/// Always replaced wholesale; the client never edits individual items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Items in server order.
    pub items: Vec<Item>,
    /// Scalar flag from the earlier protocol variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_orientation: Option<i64>,
}

impl Catalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            same_orientation: None,
        }
    }

    /// Split a catalog response into the snapshot and the settings it carried.
    pub fn from_response(resp: CatalogResponse) -> (Self, Option<SettingsMap>) {
        let catalog = Self {
            items: resp.images,
            same_orientation: resp.same_orientation,
        };
        (catalog, resp.settings)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Paths of every item except `winner`, in catalog order.
    pub fn losers(&self, winner: &str) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.path != winner)
            .map(|item| item.path.clone())
            .collect()
    }
}
