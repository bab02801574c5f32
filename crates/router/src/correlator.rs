//! Tracks messages the bot sent that are waiting for a follow-up reply.
//!
//! Each pending entry is keyed by the sent message's id. An inbound reply
//! quoting that id is handed to [`ReplyCorrelator::resolve`], which runs the
//! entry's filter and callback. Entries expire after their timeout, either
//! through the timer scheduled at registration or through the periodic
//! sweep.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    courier_common::types::InboundEvent,
    futures::future::BoxFuture,
    tokio::{task::JoinHandle, time::Instant},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info},
};

/// Default lifetime of a pending reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(300);

pub type ReplyFuture = BoxFuture<'static, anyhow::Result<()>>;
pub type ReplyCallback = Arc<dyn Fn(InboundEvent) -> ReplyFuture + Send + Sync>;
pub type ReplyFilter = Arc<dyn Fn(&InboundEvent) -> bool + Send + Sync>;

/// How a registration behaves once it is matched.
#[derive(Clone)]
pub struct ListenOptions {
    pub timeout: Duration,
    /// Remove the entry after the first successful invocation.
    pub one_time: bool,
    /// Replies rejected by the filter leave the entry in place.
    pub filter: Option<ReplyFilter>,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REPLY_TIMEOUT,
            one_time: true,
            filter: None,
        }
    }
}

impl ListenOptions {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keep listening after a successful invocation.
    #[must_use]
    pub fn repeating(mut self) -> Self {
        self.one_time = false;
        self
    }

    #[must_use]
    pub fn filter(
        mut self,
        filter: impl Fn(&InboundEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Accept only replies with a non-empty body.
    #[must_use]
    pub fn non_empty_body(self) -> Self {
        self.filter(|event| !event.text().is_empty())
    }
}

impl fmt::Debug for ListenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenOptions")
            .field("timeout", &self.timeout)
            .field("one_time", &self.one_time)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

struct PendingReply {
    generation: u64,
    callback: ReplyCallback,
    filter: Option<ReplyFilter>,
    created_at: Instant,
    timeout: Duration,
    one_time: bool,
}

impl PendingReply {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.timeout
    }
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, PendingReply>>,
    next_generation: AtomicU64,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, PendingReply>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `key` only if it still holds the given registration.
    fn remove_generation(&self, key: &str, generation: u64) -> bool {
        let mut entries = self.entries();
        if entries.get(key).is_some_and(|p| p.generation == generation) {
            entries.remove(key);
            true
        } else {
            false
        }
    }
}

/// Shared handle to the pending-reply table. Clones see the same entries.
#[derive(Clone, Default)]
pub struct ReplyCorrelator {
    inner: Arc<Inner>,
}

impl fmt::Debug for ReplyCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyCorrelator")
            .field("pending", &self.len())
            .finish()
    }
}

impl ReplyCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for replies to `key`, replacing any earlier registration for it.
    ///
    /// Schedules a removal timer on the current tokio runtime.
    pub fn register<F, Fut>(&self, key: impl Into<String>, callback: F, options: ListenOptions)
    where
        F: Fn(InboundEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let key = key.into();
        let timeout = options.timeout;
        let callback: ReplyCallback = Arc::new(move |event| Box::pin(callback(event)));
        let generation = self.insert(key.clone(), callback, options);

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = weak.upgrade()
                && inner.remove_generation(&key, generation)
            {
                debug!(key = %key, "pending reply expired");
            }
        });
    }

    fn insert(&self, key: String, callback: ReplyCallback, options: ListenOptions) -> u64 {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let pending = PendingReply {
            generation,
            callback,
            filter: options.filter,
            created_at: Instant::now(),
            timeout: options.timeout,
            one_time: options.one_time,
        };
        debug!(
            key = %key,
            timeout_ms = options.timeout.as_millis() as u64,
            one_time = options.one_time,
            "awaiting reply"
        );
        self.inner.entries().insert(key, pending);
        generation
    }

    /// Offer `event` to the entry registered under `key`.
    ///
    /// Returns `true` iff the callback was invoked. Callback errors are
    /// logged and remove the entry.
    pub async fn resolve(&self, key: &str, event: &InboundEvent) -> bool {
        let (generation, callback, filter, one_time) = {
            let mut entries = self.inner.entries();
            let Some(pending) = entries.get(key) else {
                return false;
            };
            if pending.is_expired(Instant::now()) {
                entries.remove(key);
                debug!(key, "pending reply expired before resolve");
                return false;
            }
            (
                pending.generation,
                Arc::clone(&pending.callback),
                pending.filter.clone(),
                pending.one_time,
            )
        };

        if let Some(filter) = filter
            && !filter(event)
        {
            debug!(key, "reply rejected by filter");
            return false;
        }

        // Claim one-time entries up front so a concurrent reply cannot run
        // the same callback twice.
        let still_registered = if one_time {
            self.inner.remove_generation(key, generation)
        } else {
            self.inner
                .entries()
                .get(key)
                .is_some_and(|p| p.generation == generation)
        };
        if !still_registered {
            return false;
        }

        if let Err(e) = callback(event.clone()).await {
            error!(key, error = %e, "reply callback failed");
            self.inner.remove_generation(key, generation);
        }
        true
    }

    /// Drop the entry for `key`, if any.
    pub fn remove(&self, key: &str) {
        self.inner.entries().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry older than its own timeout.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.inner.entries();
        let before = entries.len();
        entries.retain(|_, pending| !pending.is_expired(now));
        before - entries.len()
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `period` until
    /// `cancel` fires.
    pub fn spawn_sweeper(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let correlator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("reply sweeper stopped");
                        break;
                    },
                    _ = ticker.tick() => {
                        let removed = correlator.sweep_expired();
                        if removed > 0 {
                            info!(removed, "swept expired pending replies");
                        }
                    },
                }
            }
        })
    }
}
