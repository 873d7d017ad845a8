//! Live view models for the lead list and analytics dashboard.
//!
//! A [`LiveView`] fetches the whole `leads` table on start, then re-fetches
//! and re-derives its state every time the store announces a change or
//! [`LiveView::refresh`] is called. Fetches run one at a time, so the state
//! always reflects the most recent completed fetch.

use crate::analytics::LeadAnalytics;
use crate::models::Lead;
use crate::store::LeadStore;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// Render state of a view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    /// Last fetch failed; carries the error message shown to the user.
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// A view model kept in sync with the store's change feed.
pub struct LiveView<T> {
    state: watch::Receiver<ViewState<T>>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

/// Lead list: every lead, newest first.
pub type LeadListView = LiveView<Vec<Lead>>;

/// Analytics dashboard derived from every lead.
pub type AnalyticsView = LiveView<LeadAnalytics>;

impl<T> LiveView<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Subscribes to `store` and starts the refresh loop.
    ///
    /// The subscription is taken before this returns, so any write made after
    /// construction is guaranteed to trigger a refetch.
    pub fn spawn<F>(store: Arc<dyn LeadStore>, derive: F) -> Self
    where
        F: Fn(Vec<Lead>) -> T + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(ViewState::Loading);
        let refresh = Arc::new(Notify::new());
        let mut changes = store.subscribe();
        let trigger = refresh.clone();

        let task = tokio::spawn(async move {
            loop {
                let next = match store.list().await {
                    Ok(leads) => ViewState::Ready(derive(leads)),
                    Err(e) => {
                        tracing::warn!("View refresh failed: {}", e);
                        ViewState::Failed(e.to_string())
                    }
                };
                if tx.send(next).is_err() {
                    // Every receiver is gone.
                    break;
                }

                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(_) | Err(RecvError::Lagged(_)) => {
                            // Coalesce a burst into one refetch.
                            while changes.try_recv().is_ok() {}
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = trigger.notified() => {}
                }
            }
        });

        Self {
            state: rx,
            refresh,
            task,
        }
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// Requests an immediate refetch.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Waits for the next state change. Returns false once the view stopped.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Waits until the state satisfies `predicate` and returns that state.
    pub async fn wait_for<P>(&mut self, predicate: P) -> Option<ViewState<T>>
    where
        P: Fn(&ViewState<T>) -> bool,
    {
        self.state
            .wait_for(|state| predicate(state))
            .await
            .ok()
            .map(|state| state.clone())
    }
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Live list of every lead, newest first.
pub fn lead_list_view(store: Arc<dyn LeadStore>) -> LeadListView {
    LiveView::spawn(store, |leads| leads)
}

/// Live analytics over every lead.
pub fn analytics_view(store: Arc<dyn LeadStore>) -> AnalyticsView {
    LiveView::spawn(store, |leads| LeadAnalytics::from_leads(&leads))
}
