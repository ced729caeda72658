//! In-memory query cache keyed by [`QueryKey`].
//!
//! # Design
//! One `QueryCache` value owns every entry; clones share it through an
//! `Arc`, so it is passed to consumers explicitly rather than living in a
//! global. Entries are only written by the cache's own methods.
//!
//! Reads go through [`QueryCache::fetch_query`]:
//! - fresh data is returned without touching the network;
//! - stale data is returned immediately while a refetch runs in the
//!   background;
//! - otherwise the caller waits for a fetch, joining one that is already in
//!   flight for the same key.
//!
//! Fetches run on spawned tasks, so a caller that stops waiting does not
//! cancel the request; the result still lands in the cache. Retries are
//! owned here, and every failure passes through one error hook. Each caller
//! waiting on a fetch, including those that joined it, gets its own
//! callbacks; the [`ErrorChannel`] is written once unless every waiter is
//! background.
//!
//! Timestamps use `tokio::time::Instant` so behaviour over time can be
//! tested on a paused clock.

mod observer;

pub use observer::{QueryObserver, QueryState};

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{CacheConfig, RetryPolicy};
use crate::draft;
use crate::error_channel::ErrorChannel;
use crate::keys::QueryKey;
use crate::messages;
use crate::result::{ApiFailure, ApiResult, FailureKind};
use crate::retry::{with_retries, OperationKind};

type AnyData = Arc<dyn Any + Send + Sync>;
type Outcome = Result<AnyData, ApiFailure>;
type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type QueryFn = Arc<dyn Fn() -> BoxFuture<Outcome> + Send + Sync>;

/// Fixed-shape failure callback.
pub type ErrorCallback = Arc<dyn Fn(&ApiFailure) + Send + Sync>;

/// Fixed-shape success callback. Receives the fetched or written value;
/// downcast it to the type the call produces.
pub type SuccessCallback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Per-call presentation options.
#[derive(Clone, Default)]
pub struct QueryOptions {
    /// Background operations never write to the shared error channel.
    pub background: bool,
    /// Called once per failed operation, after retries are exhausted.
    pub on_error: Option<ErrorCallback>,
    /// Called when the fetch or write this call started or joined succeeds.
    /// Not called when fresh data is served from the cache.
    pub on_success: Option<SuccessCallback>,
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("background", &self.background)
            .field("has_on_error", &self.on_error.is_some())
            .field("has_on_success", &self.on_success.is_some())
            .finish()
    }
}

impl QueryOptions {
    pub fn background() -> Self {
        Self {
            background: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn Any) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ApiFailure) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Fetching,
    Fresh,
    Stale,
    Errored,
}

/// Options of every caller waiting on one fetch, starting with the one that
/// started it.
type Waiters = Arc<Mutex<Vec<QueryOptions>>>;

struct InFlight {
    rx: watch::Receiver<Option<Outcome>>,
    waiters: Waiters,
}

impl InFlight {
    /// Register a caller. Must be called with the entries lock held so the
    /// fetch cannot settle in between.
    fn join(&self, options: QueryOptions) -> watch::Receiver<Option<Outcome>> {
        lock(&self.waiters).push(options);
        self.rx.clone()
    }
}

struct Entry {
    data: Option<AnyData>,
    error: Option<ApiFailure>,
    updated_at: Option<Instant>,
    invalidated: bool,
    last_used: Instant,
    in_flight: Option<InFlight>,
    query_fn: Option<QueryFn>,
    notify: watch::Sender<QueryStatus>,
}

impl Entry {
    fn new(now: Instant) -> Self {
        let (notify, _) = watch::channel(QueryStatus::Idle);
        Self {
            data: None,
            error: None,
            updated_at: None,
            invalidated: false,
            last_used: now,
            in_flight: None,
            query_fn: None,
            notify,
        }
    }

    fn is_fresh(&self, now: Instant, stale_time: Duration) -> bool {
        !self.invalidated
            && self
                .updated_at
                .is_some_and(|at| now.duration_since(at) < stale_time)
    }

    fn status(&self, now: Instant, stale_time: Duration) -> QueryStatus {
        if self.in_flight.is_some() {
            QueryStatus::Fetching
        } else if self.error.is_some() {
            QueryStatus::Errored
        } else if self.data.is_none() {
            QueryStatus::Idle
        } else if self.is_fresh(now, stale_time) {
            QueryStatus::Fresh
        } else {
            QueryStatus::Stale
        }
    }

    fn observers(&self) -> usize {
        self.notify.receiver_count()
    }

    fn publish(&self, now: Instant, stale_time: Duration) {
        self.notify.send_replace(self.status(now, stale_time));
    }
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    config: CacheConfig,
    retry: RetryPolicy,
    errors: ErrorChannel,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.inner.config)
            .field("retry", &self.inner.retry)
            .field("entries", &self.entries().len())
            .finish()
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig, retry: RetryPolicy, errors: ErrorChannel) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                config,
                retry,
                errors,
            }),
        }
    }

    /// Default windows and retry policy, reporting to `errors`.
    pub fn with_error_channel(errors: ErrorChannel) -> Self {
        Self::new(CacheConfig::default(), RetryPolicy::default(), errors)
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.inner.errors
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        lock(&self.inner.entries)
    }

    /// Serve `key` from the cache or fetch it with `fetch`.
    ///
    /// `fetch` is kept with the entry and reused for background refetches.
    ///
    /// # Errors
    ///
    /// Returns the failure of the last attempt once retries are exhausted,
    /// or a [`FailureKind::Request`] failure when `key` already holds data of
    /// another type.
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetch: F,
    ) -> Result<Arc<T>, ApiFailure>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let query_fn: QueryFn = Arc::new(move || -> BoxFuture<Outcome> {
            let fut = fetch();
            Box::pin(async move {
                fut.await
                    .into_result()
                    .map(|data| Arc::new(data) as AnyData)
            })
        });
        let data = self.fetch_erased(&key, options, query_fn).await?;
        downcast(data).ok_or_else(|| type_mismatch(&key))
    }

    async fn fetch_erased(&self, key: &QueryKey, options: QueryOptions, query_fn: QueryFn) -> Outcome {
        self.collect_garbage();

        let rx = {
            let now = Instant::now();
            let stale_time = self.inner.config.stale_time;
            let mut entries = self.entries();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(now));
            entry.last_used = now;
            entry.query_fn = Some(Arc::clone(&query_fn));

            let usable = entry
                .data
                .clone()
                .filter(|_| entry.error.is_none() && !entry.invalidated);
            if let Some(data) = usable {
                if entry.is_fresh(now, stale_time) {
                    debug!(%key, "serving fresh data");
                } else if entry.in_flight.is_none() {
                    debug!(%key, "serving stale data while refetching");
                    self.start_fetch(key, entry, query_fn, options);
                }
                return Ok(data);
            }

            match &entry.in_flight {
                Some(in_flight) => {
                    debug!(%key, "joining in-flight fetch");
                    in_flight.join(options)
                }
                None => self.start_fetch(key, entry, query_fn, options),
            }
        };

        wait_for_outcome(rx).await
    }

    /// Spawn a fetch for `entry`. Must be called with the entries lock held.
    fn start_fetch(
        &self,
        key: &QueryKey,
        entry: &mut Entry,
        query_fn: QueryFn,
        options: QueryOptions,
    ) -> watch::Receiver<Option<Outcome>> {
        let (tx, rx) = watch::channel(None);
        let waiters: Waiters = Arc::new(Mutex::new(vec![options]));
        entry.in_flight = Some(InFlight {
            rx: rx.clone(),
            waiters: Arc::clone(&waiters),
        });
        entry.publish(Instant::now(), self.inner.config.stale_time);

        let cache = self.clone();
        let key = key.clone();
        let own = rx.clone();
        tokio::spawn(async move {
            let outcome = with_retries(&cache.inner.retry, OperationKind::Read, || query_fn()).await;
            let waiters = cache.settle(&key, &own, &waiters, &outcome);
            match &outcome {
                Ok(data) => notify_success(&waiters, &**data),
                Err(failure) => cache.report(&key.to_string(), failure, &waiters),
            }
            tx.send_replace(Some(outcome));
        });
        rx
    }

    /// Store `outcome` and close the waiter list. Returns every caller that
    /// waited on this fetch.
    fn settle(
        &self,
        key: &QueryKey,
        own: &watch::Receiver<Option<Outcome>>,
        waiters: &Waiters,
        outcome: &Outcome,
    ) -> Vec<QueryOptions> {
        let now = Instant::now();
        let mut entries = self.entries();
        let waiters = std::mem::take(&mut *lock(waiters));
        let Some(entry) = entries.get_mut(key) else {
            return waiters;
        };
        // The entry may have been removed and recreated while this fetch ran.
        if !entry
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.rx.same_channel(own))
        {
            return waiters;
        }
        entry.in_flight = None;
        match outcome {
            Ok(data) => {
                entry.data = Some(Arc::clone(data));
                entry.error = None;
                entry.updated_at = Some(now);
                entry.invalidated = false;
            }
            Err(failure) => entry.error = Some(failure.clone()),
        }
        entry.publish(now, self.inner.config.stale_time);
        waiters
    }

    /// The single error hook. Logs once, surfaces the failure once unless
    /// every waiter is background, then calls each waiter's callback.
    fn report(&self, target: &str, failure: &ApiFailure, waiters: &[QueryOptions]) {
        let background = waiters.iter().all(|options| options.background);
        warn!(
            target_key = target,
            status = ?failure.status_code,
            kind = ?failure.kind,
            background,
            waiters = waiters.len(),
            error = %failure.raw_error_message,
            "operation failed"
        );
        if !background {
            self.inner
                .errors
                .show_error(failure.status_code, failure.error_message.clone());
        }
        for callback in waiters.iter().filter_map(|options| options.on_error.as_ref()) {
            callback(failure);
        }
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        let now = Instant::now();
        self.entries()
            .get(key)
            .map_or(QueryStatus::Idle, |entry| {
                entry.status(now, self.inner.config.stale_time)
            })
    }

    pub fn query_state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let now = Instant::now();
        let entries = self.entries();
        match entries.get(key) {
            None => QueryState::idle(),
            Some(entry) => QueryState {
                status: entry.status(now, self.inner.config.stale_time),
                data: entry.data.clone().and_then(downcast),
                error: entry.error.clone(),
                updated_at: entry.updated_at,
            },
        }
    }

    /// Subscribe to `key`, creating an idle entry if there is none.
    pub fn observe<T: Send + Sync + 'static>(&self, key: QueryKey) -> QueryObserver<T> {
        let rx = self
            .entries()
            .entry(key.clone())
            .or_insert_with(|| Entry::new(Instant::now()))
            .notify
            .subscribe();
        QueryObserver::new(self.clone(), key, rx)
    }

    pub(crate) fn touch(&self, key: &QueryKey) {
        if let Some(entry) = self.entries().get_mut(key) {
            entry.last_used = Instant::now();
        }
    }

    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.entries()
            .get(key)
            .and_then(|entry| entry.data.clone())
            .and_then(downcast)
    }

    /// Store `data` under `key` as freshly fetched.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
        self.put(key, Arc::new(data), true);
    }

    fn put(&self, key: &QueryKey, data: AnyData, fresh: bool) {
        let now = Instant::now();
        let mut entries = self.entries();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(now));
        entry.data = Some(data);
        entry.error = None;
        entry.last_used = now;
        if fresh {
            entry.updated_at = Some(now);
            entry.invalidated = false;
        }
        entry.publish(now, self.inner.config.stale_time);
    }

    /// Replace the data under `key` with a copy edited by `mutator` (see
    /// [`draft::update`]). Returns the new value, or `None` without calling
    /// `mutator` when the key holds no data of type `T`. The fetch timestamp
    /// is kept.
    ///
    /// `mutator` runs with the cache locked and must not call back into it.
    pub fn patch_query_data<T, F>(&self, key: &QueryKey, mutator: F) -> Option<Arc<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: FnOnce(&mut T) -> Option<T>,
    {
        let mut entries = self.entries();
        let entry = entries.get_mut(key)?;
        let current = entry.data.clone().and_then(downcast::<T>)?;
        let next = draft::update_shared(Some(&current), mutator)?;
        if !Arc::ptr_eq(&current, &next) {
            let data: AnyData = next.clone();
            entry.data = Some(data);
            entry.publish(Instant::now(), self.inner.config.stale_time);
        }
        Some(next)
    }

    /// Drop the entry for `key`. Observers see their channel close.
    pub fn remove_query(&self, key: &QueryKey) -> bool {
        self.entries().remove(key).is_some()
    }

    /// Mark every entry under `prefix` stale so the next read refetches.
    /// Observed entries refetch in the background right away. Returns the
    /// number of entries matched.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let now = Instant::now();
        let stale_time = self.inner.config.stale_time;
        let can_spawn = tokio::runtime::Handle::try_current().is_ok();
        let mut entries = self.entries();
        let mut matched = 0;
        for (key, entry) in entries.iter_mut() {
            if !key.starts_with(prefix) {
                continue;
            }
            matched += 1;
            entry.invalidated = true;
            let refetch = entry
                .query_fn
                .clone()
                .filter(|_| can_spawn && entry.observers() > 0 && entry.in_flight.is_none());
            match refetch {
                Some(query_fn) => {
                    debug!(%key, "refetching observed query");
                    self.start_fetch(key, entry, query_fn, QueryOptions::background());
                }
                None => entry.publish(now, stale_time),
            }
        }
        debug!(%prefix, matched, "invalidated queries");
        matched
    }

    /// Evict entries with no observers and nothing in flight that have been
    /// unused for at least the GC window. Returns the number evicted.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let gc_time = self.inner.config.gc_time;
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, entry| {
            let idle = entry.observers() == 0
                && entry.in_flight.is_none()
                && now.duration_since(entry.last_used) >= gc_time;
            if idle {
                debug!(%key, "evicting idle query");
            }
            !idle
        });
        before - entries.len()
    }

    /// Run [`collect_garbage`](Self::collect_garbage) every `every` until the
    /// cache is dropped.
    pub fn spawn_collector(&self, every: Duration) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                QueryCache { inner }.collect_garbage();
            }
        })
    }

    /// Run a write. Writes are never cached; on success every key returned by
    /// `invalidates` is invalidated by prefix.
    ///
    /// # Errors
    ///
    /// Returns the failure of the last attempt once write retries are
    /// exhausted.
    pub async fn mutate<T, F, Fut, K>(
        &self,
        options: &QueryOptions,
        mut op: F,
        invalidates: K,
    ) -> Result<T, ApiFailure>
    where
        T: 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
        K: FnOnce(&T) -> Vec<QueryKey>,
    {
        let outcome = with_retries(&self.inner.retry, OperationKind::Write, || {
            let fut = op();
            async move { fut.await.into_result() }
        })
        .await;

        match outcome {
            Ok(value) => {
                for key in invalidates(&value) {
                    self.invalidate(&key);
                }
                notify_success(std::slice::from_ref(options), &value);
                Ok(value)
            }
            Err(failure) => {
                self.report("mutation", &failure, std::slice::from_ref(options));
                Err(failure)
            }
        }
    }

    /// [`mutate`](Self::mutate) with `patch` applied to the data under `key`
    /// first. On failure the previous value is restored.
    ///
    /// # Errors
    ///
    /// Same as [`mutate`](Self::mutate).
    pub async fn mutate_optimistic<D, P, T, F, Fut, K>(
        &self,
        key: &QueryKey,
        patch: P,
        options: &QueryOptions,
        op: F,
        invalidates: K,
    ) -> Result<T, ApiFailure>
    where
        D: Clone + PartialEq + Send + Sync + 'static,
        P: FnOnce(&mut D) -> Option<D>,
        T: 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
        K: FnOnce(&T) -> Vec<QueryKey>,
    {
        let previous = self.get_query_data::<D>(key);
        self.patch_query_data(key, patch);

        let result = self.mutate(options, op, invalidates).await;
        if result.is_err() {
            if let Some(previous) = previous {
                debug!(%key, "rolling back optimistic update");
                self.put(key, previous, false);
            }
        }
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn notify_success(waiters: &[QueryOptions], data: &dyn Any) {
    for callback in waiters.iter().filter_map(|options| options.on_success.as_ref()) {
        callback(data);
    }
}

fn downcast<T: Send + Sync + 'static>(data: AnyData) -> Option<Arc<T>> {
    data.downcast::<T>().ok()
}

fn type_mismatch(key: &QueryKey) -> ApiFailure {
    ApiFailure {
        kind: FailureKind::Request,
        status_code: None,
        error_message: messages::DEFAULT_ERROR.to_string(),
        raw_error_message: format!("cached data for {key} has a different type"),
    }
}

async fn wait_for_outcome(mut rx: watch::Receiver<Option<Outcome>>) -> Outcome {
    let abandoned = || ApiFailure {
        kind: FailureKind::Transport,
        status_code: None,
        error_message: messages::DEFAULT_ERROR.to_string(),
        raw_error_message: "fetch ended without a result".to_string(),
    };
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => (*outcome).clone().unwrap_or_else(|| Err(abandoned())),
        Err(_) => Err(abandoned()),
    }
}
