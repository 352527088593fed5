// ── Vote protocol ──
//
// Builds outbound `rate` and `toggle_setting` messages. The loser set of a
// vote is resolved against the current catalog snapshot. Nothing here
// mutates local state: the server's result events drive every update.

use std::sync::Arc;

use tracing::debug;

use crate::connection::MessageSink;
use crate::model::ClientMessage;
use crate::store::CatalogStore;

#[derive(Clone)]
pub struct VoteProtocol {
    sink: Arc<dyn MessageSink>,
    catalog: CatalogStore,
}

impl VoteProtocol {
    pub fn new(sink: Arc<dyn MessageSink>, catalog: CatalogStore) -> Self {
        Self { sink, catalog }
    }

    /// Record a preference for `winner` over every other catalog item.
    ///
    /// A winner that is not in the catalog is still sent, with every item
    /// as a loser. Returns the message handed to the sink.
    pub fn vote(&self, winner: &str, is_random: bool) -> ClientMessage {
        let catalog = self.catalog.get();
        if !catalog.contains(winner) {
            debug!(winner, "voting for an item outside the current catalog");
        }

        let message = ClientMessage::Rate {
            winner: winner.to_owned(),
            losers: catalog.losers(winner),
            is_random,
        };
        self.sink.send(&message);
        message
    }

    /// Ask the server to flip the boolean setting `name`.
    pub fn toggle_setting(&self, name: &str) -> ClientMessage {
        let message = ClientMessage::ToggleSetting {
            name: name.to_owned(),
        };
        self.sink.send(&message);
        message
    }
}

impl std::fmt::Debug for VoteProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteProtocol")
            .field("items", &self.catalog.get().len())
            .finish_non_exhaustive()
    }
}
