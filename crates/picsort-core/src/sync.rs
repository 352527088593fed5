// ── Sync engine ──
//
// Consumes the inbound event stream, logs every event, and turns the
// recognized ones into store updates: result events trigger a catalog
// refetch, settings events replace the settings map.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use picsort_api::{CatalogClient, CatalogResponse};

use crate::error::CoreError;
use crate::model::{Event, SyncAction};
use crate::store::Stores;

// ── Catalog source ───────────────────────────────────────────────────

/// The catalog refetch collaborator.
pub trait CatalogSource: Send + Sync {
    fn fetch(&self, is_random: bool) -> BoxFuture<'_, Result<CatalogResponse, picsort_api::Error>>;
}

impl CatalogSource for CatalogClient {
    fn fetch(&self, is_random: bool) -> BoxFuture<'_, Result<CatalogResponse, picsort_api::Error>> {
        CatalogClient::fetch(self, is_random).boxed()
    }
}

// ── SyncEngine ───────────────────────────────────────────────────────

/// Outcome of [`SyncEngine::apply`].
#[derive(Debug)]
pub enum Applied {
    /// A catalog refetch was spawned. Await the handle for its result.
    Refresh(JoinHandle<Result<(), CoreError>>),
    /// The settings store was replaced from the event payload.
    SettingsReplaced,
    /// The event was only logged.
    Logged,
}

/// Maps inbound events onto store updates.
///
/// Cheaply cloneable. Refetches run as independent tasks, so when two
/// overlap the one that finishes last determines the stores' contents.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    stores: Arc<Stores>,
    source: Arc<dyn CatalogSource>,
}

impl SyncEngine {
    pub fn new(stores: Arc<Stores>, source: Arc<dyn CatalogSource>) -> Self {
        Self {
            inner: Arc::new(EngineInner { stores, source }),
        }
    }

    pub fn stores(&self) -> &Arc<Stores> {
        &self.inner.stores
    }

    /// Fetch the catalog and replace the stores with the result.
    ///
    /// On failure the stores keep their previous values.
    pub async fn refresh(&self, is_random: bool) -> Result<(), CoreError> {
        let resp = self.inner.source.fetch(is_random).await?;
        self.inner.stores.apply_catalog_snapshot(resp);
        Ok(())
    }

    /// Log `event` and perform the action its kind maps to.
    ///
    /// Must be called from within a tokio runtime: refetches are spawned.
    pub fn apply(&self, event: Arc<Event>) -> Applied {
        self.inner.stores.record_event(Arc::clone(&event));

        match SyncAction::for_event(&event) {
            SyncAction::RefreshCatalog => {
                let is_random = event.is_random();
                debug!(event = %event.event, is_random, "refetching catalog");
                let engine = self.clone();
                Applied::Refresh(tokio::spawn(async move {
                    let result = engine.refresh(is_random).await;
                    if let Err(ref e) = result {
                        warn!(error = %e, "catalog refetch failed, stores unchanged");
                    }
                    result
                }))
            }
            SyncAction::ReplaceSettings => match event.settings() {
                Ok(settings) => {
                    debug!(count = settings.len(), "settings replaced by event");
                    self.inner.stores.settings.set(settings);
                    Applied::SettingsReplaced
                }
                Err(e) => {
                    let err = CoreError::Protocol {
                        message: format!("update_settings without a valid settings map: {e}"),
                    };
                    warn!(error = %err, "ignoring settings event");
                    Applied::Logged
                }
            },
            SyncAction::LogOnly => {
                debug!(event = %event.event, "unhandled event logged");
                Applied::Logged
            }
        }
    }

    /// Apply events from `events` in delivery order until the stream
    /// closes or `cancel` fires.
    pub async fn run(self, mut events: broadcast::Receiver<Arc<Event>>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                recv = events.recv() => match recv {
                    Ok(event) => {
                        self.apply(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "sync engine lagged, events lost");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        info!("sync engine stopped");
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::SettingValue;

    /// Scripted catalog source: pops one `(delay, result)` per fetch and
    /// records the `is_random` flag of every call.
    #[derive(Default)]
    struct FakeSource {
        script: Mutex<VecDeque<(Duration, Result<CatalogResponse, u16>)>>,
        calls: Mutex<Vec<bool>>,
    }

    impl FakeSource {
        fn then(self, delay_ms: u64, result: Result<serde_json::Value, u16>) -> Self {
            let result = result.map(|v| serde_json::from_value(v).unwrap());
            self.script
                .lock()
                .unwrap()
                .push_back((Duration::from_millis(delay_ms), result));
            self
        }

        fn calls(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CatalogSource for FakeSource {
        fn fetch(
            &self,
            is_random: bool,
        ) -> BoxFuture<'_, Result<CatalogResponse, picsort_api::Error>> {
            self.calls.lock().unwrap().push(is_random);
            let (delay, result) = self.script.lock().unwrap().pop_front().unwrap();
            async move {
                tokio::time::sleep(delay).await;
                result.map_err(|status| picsort_api::Error::Http {
                    status,
                    body: String::new(),
                })
            }
            .boxed()
        }
    }

    fn engine(source: FakeSource) -> (SyncEngine, Arc<FakeSource>) {
        let source = Arc::new(source);
        let engine = SyncEngine::new(Arc::new(Stores::default()), source.clone());
        (engine, source)
    }

    fn snapshot(paths: &[&str], flag: bool) -> serde_json::Value {
        let images: Vec<_> = paths
            .iter()
            .map(|p| json!({"path": p, "link": format!("/pics/{p}")}))
            .collect();
        json!({"images": images, "settings": {"same_orientation": flag}})
    }

    fn paths(engine: &SyncEngine) -> Vec<String> {
        engine
            .stores()
            .catalog
            .get()
            .items
            .iter()
            .map(|i| i.path.clone())
            .collect()
    }

    async fn join(applied: Applied) -> Result<(), CoreError> {
        match applied {
            Applied::Refresh(handle) => handle.await.unwrap(),
            other => panic!("expected a refresh, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_success_refetches_with_payload_flag() {
        let (engine, source) = engine(FakeSource::default().then(0, Ok(snapshot(&["a", "b"], true))));

        let event = Event::new("rate_success").with("is_random", json!(true));
        join(engine.apply(Arc::new(event))).await.unwrap();

        assert_eq!(source.calls(), vec![true]);
        assert_eq!(paths(&engine), vec!["a", "b"]);
        assert_eq!(
            engine.stores().settings.get()["same_orientation"],
            SettingValue::Bool(true)
        );
        assert_eq!(engine.stores().event_log.len(), 1);
    }

    #[tokio::test]
    async fn missing_flag_refetches_non_random() {
        let (engine, source) = engine(FakeSource::default().then(0, Ok(snapshot(&["a"], false))));
        join(engine.apply(Arc::new(Event::new("rate_success")))).await.unwrap();
        assert_eq!(source.calls(), vec![false]);
    }

    #[tokio::test]
    async fn hide_and_restore_refetch_like_rate() {
        let (engine, source) = engine(
            FakeSource::default()
                .then(0, Ok(snapshot(&["a"], false)))
                .then(0, Ok(snapshot(&["a", "b"], false))),
        );

        join(engine.apply(Arc::new(Event::new("hide_success")))).await.unwrap();
        assert_eq!(paths(&engine), vec!["a"]);

        join(engine.apply(Arc::new(Event::new("restore_success")))).await.unwrap();
        assert_eq!(paths(&engine), vec!["a", "b"]);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn update_settings_replaces_only_settings() {
        let (engine, source) = engine(FakeSource::default());
        engine.stores().settings.set(
            [("old".to_owned(), SettingValue::Bool(true))]
                .into_iter()
                .collect(),
        );

        let event = Event::new("update_settings").with("settings", json!({"same_orientation": true}));
        let applied = engine.apply(Arc::new(event));

        assert!(matches!(applied, Applied::SettingsReplaced));
        let settings = engine.stores().settings.get();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings["same_orientation"], SettingValue::Bool(true));
        assert!(engine.stores().catalog.get().is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_settings_event_is_logged_without_mutation() {
        let (engine, _) = engine(FakeSource::default());
        engine.stores().settings.set(
            [("kept".to_owned(), SettingValue::Int(1))]
                .into_iter()
                .collect(),
        );

        let applied = engine.apply(Arc::new(Event::new("update_settings").with("settings", json!(5))));

        assert!(matches!(applied, Applied::Logged));
        assert!(engine.stores().settings.get().contains_key("kept"));
        assert_eq!(engine.stores().event_log.len(), 1);
    }

    #[tokio::test]
    async fn unknown_event_is_logged_only() {
        let (engine, source) = engine(FakeSource::default());
        let catalog_before = engine.stores().catalog.get();
        let settings_before = engine.stores().settings.get();

        let applied = engine.apply(Arc::new(Event::new("something_new").with("x", json!(1))));

        assert!(matches!(applied, Applied::Logged));
        assert!(Arc::ptr_eq(&catalog_before, &engine.stores().catalog.get()));
        assert!(Arc::ptr_eq(&settings_before, &engine.stores().settings.get()));
        assert!(source.calls().is_empty());
        assert_eq!(engine.stores().event_log.latest().unwrap().event, "something_new");
        assert!(engine.stores().last_event().is_some());
    }

    #[tokio::test]
    async fn failed_refetch_leaves_stores_untouched() {
        let (engine, _) = engine(
            FakeSource::default()
                .then(0, Ok(snapshot(&["a"], true)))
                .then(0, Err(500)),
        );
        engine.refresh(false).await.unwrap();
        let before = engine.stores().catalog.get();

        let err = join(engine.apply(Arc::new(Event::new("rate_success"))))
            .await
            .unwrap_err();

        assert!(err.is_fetch_error());
        assert!(Arc::ptr_eq(&before, &engine.stores().catalog.get()));
        assert_eq!(
            engine.stores().settings.get()["same_orientation"],
            SettingValue::Bool(true)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slower_earlier_fetch_wins_when_it_lands_last() {
        let (engine, _) = engine(
            FakeSource::default()
                .then(200, Ok(snapshot(&["first"], false)))
                .then(50, Ok(snapshot(&["second"], false))),
        );

        let first = engine.apply(Arc::new(Event::new("rate_success")));
        let second = engine.apply(Arc::new(Event::new("hide_success")));

        join(second).await.unwrap();
        assert_eq!(paths(&engine), vec!["second"]);

        join(first).await.unwrap();
        assert_eq!(paths(&engine), vec!["first"]);
    }

    #[tokio::test]
    async fn run_applies_events_in_order_until_the_stream_closes() {
        let (engine, _) = engine(FakeSource::default());
        let (tx, rx) = broadcast::channel(16);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(engine.clone().run(rx, cancel.clone()));

        for name in ["one", "two", "three"] {
            tx.send(Arc::new(Event::new(name))).unwrap();
        }
        drop(tx);
        task.await.unwrap();

        let names: Vec<_> = engine
            .stores()
            .event_log
            .entries()
            .iter()
            .map(|e| e.event.clone())
            .collect();
        assert_eq!(names, vec!["three", "two", "one"]);
    }
}
