// ── Snapshot application ──
//
// Applies a catalog refetch result to the stores. Both stores are replaced
// wholesale; there is no merge with the previous values.

use chrono::Utc;
use tracing::debug;

use super::Stores;
use crate::model::Catalog;
use picsort_api::CatalogResponse;

impl Stores {
    /// Replace the catalog (and the settings, when the response has them).
    ///
    /// Responses from the earlier protocol variant carry no settings; the
    /// settings store keeps its value in that case.
    ///
    /// The two stores are not updated atomically: the catalog is set first,
    /// so a subscriber can briefly observe the new catalog next to the old
    /// settings.
    pub(crate) fn apply_catalog_snapshot(&self, resp: CatalogResponse) {
        let (catalog, settings) = Catalog::from_response(resp);
        let items = catalog.len();

        self.catalog.set(catalog);
        if let Some(settings) = settings {
            self.settings.set(settings);
        }

        self.last_refresh.send_replace(Some(Utc::now()));
        debug!(items, "catalog snapshot applied");
    }
}
