use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;

use super::{QueryCache, QueryStatus};
use crate::keys::QueryKey;
use crate::result::ApiFailure;

/// Typed view of one cache entry at a point in time.
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    /// Set while the entry is errored; `data` then holds the last good value.
    pub error: Option<ApiFailure>,
    pub updated_at: Option<Instant>,
}

impl<T> QueryState<T> {
    pub(super) fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            updated_at: None,
        }
    }

    /// Fetching with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Fetching && self.data.is_none()
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("error", &self.error)
            .finish()
    }
}

/// Subscription to one cache key. While any observer is alive the entry is
/// never garbage-collected, and invalidating it triggers a background
/// refetch.
pub struct QueryObserver<T> {
    cache: QueryCache,
    key: QueryKey,
    rx: watch::Receiver<QueryStatus>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub(super) fn new(cache: QueryCache, key: QueryKey, rx: watch::Receiver<QueryStatus>) -> Self {
        Self {
            cache,
            key,
            rx,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn state(&self) -> QueryState<T> {
        self.cache.query_state(&self.key)
    }

    /// Wait for the next transition. `None` once the entry has been removed.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.state())
    }

    /// Wait until `predicate` holds for the current state.
    pub async fn wait_until(
        &mut self,
        predicate: impl Fn(&QueryState<T>) -> bool,
    ) -> Option<QueryState<T>> {
        loop {
            let state = self.state();
            if predicate(&state) {
                return Some(state);
            }
            self.rx.changed().await.ok()?;
        }
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        self.cache.touch(&self.key);
    }
}
