//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a cheaply cloneable flag that an engine observes
//! for control flow and that any number of observers can subscribe to for
//! teardown side effects. Cancelling is idempotent and safe at any point
//! in a run's lifetime, including before start and after settlement.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

type Teardown = Box<dyn FnOnce() + Send>;

struct Shared {
    token: CancellationToken,
    cancelled: AtomicBool,
    subscribers: DashMap<u64, Mutex<Teardown>>,
    next_id: AtomicU64,
}

/// Cooperative cancellation flag with teardown subscriptions.
///
/// Clones share the same underlying flag. The async [`cancelled`]
/// future integrates with `tokio::select!` for cancellation-aware awaits.
///
/// [`cancelled`]: CancelToken::cancelled
#[derive(Clone)]
pub struct CancelToken {
    shared: Arc<Shared>,
}

impl CancelToken {
    /// Creates a new, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                token: CancellationToken::new(),
                cancelled: AtomicBool::new(false),
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Requests cancellation.
    ///
    /// Idempotent: only the first call has any effect. The underlying
    /// token is cancelled first (waking cooperative awaits), then every
    /// registered teardown hook runs exactly once on this caller's thread.
    pub fn cancel(&self) {
        if self.shared.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.token.cancel();

        // remove() arbitrates against concurrent unsubscribe and against
        // hooks registered while cancellation is in flight: whichever side
        // removes the entry runs it.
        let ids: Vec<u64> = self.shared.subscribers.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, hook)) = self.shared.subscribers.remove(&id) {
                (hook.into_inner().unwrap())();
            }
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.shared.token.cancelled().await;
    }

    /// Registers a teardown hook to run on cancellation.
    ///
    /// If the token is already cancelled the hook runs immediately. The
    /// returned subscription removes the hook when
    /// [`CancelSubscription::unsubscribe`] is called.
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) -> CancelSubscription {
        if self.is_cancelled() {
            hook();
            return CancelSubscription {
                id: None,
                shared: Arc::downgrade(&self.shared),
            };
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared.subscribers.insert(id, Mutex::new(Box::new(hook)));

        // cancel() may have drained between the check above and the insert;
        // claim the entry back so the hook still runs exactly once.
        if self.is_cancelled() {
            if let Some((_, hook)) = self.shared.subscribers.remove(&id) {
                (hook.into_inner().unwrap())();
            }
            return CancelSubscription {
                id: None,
                shared: Arc::downgrade(&self.shared),
            };
        }

        CancelSubscription {
            id: Some(id),
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("subscribers", &self.shared.subscribers.len())
            .finish_non_exhaustive()
    }
}

/// Handle for a teardown hook registered via [`CancelToken::on_cancel`].
pub struct CancelSubscription {
    id: Option<u64>,
    shared: Weak<Shared>,
}

impl CancelSubscription {
    /// Removes the hook so it will not run on cancellation.
    ///
    /// A no-op if the hook already ran or the token is gone.
    pub fn unsubscribe(self) {
        if let (Some(id), Some(shared)) = (self.id, self.shared.upgrade()) {
            shared.subscribers.remove(&id);
        }
    }
}

impl std::fmt::Debug for CancelSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelSubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
