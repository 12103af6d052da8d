//! Rate-limited upstream load balancer
//!
//! Balances calls over a pool of dialed upstream clients:
//! - per-upstream token buckets refilled to their RPS cap once per second
//! - round-robin selection with spill-over to the least-throttled upstream
//! - eviction on connection errors, background reconnection every 2 seconds
//! - `call_waiting` polls for capacity; bound it with `tokio::time::timeout`

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Bucket refill period; buckets hold one second of request allowance.
const REFILL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll cadence of [`ClientBalancer::call_waiting`].
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Cadence of the background reconnect task.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(2);

/// Bucket value standing in for "no rate limit".
const UNLIMITED: i64 = i64::MAX;

/// Error returned by balancer calls.
#[derive(Debug, Error)]
pub enum BalancerError<E> {
    /// No connected upstream with capacity exists.
    #[error("no upstream")]
    NoUpstream,
    /// The operation failed; the underlying error is returned unchanged.
    #[error(transparent)]
    Upstream(E),
}

impl<E> BalancerError<E> {
    pub fn is_no_upstream(&self) -> bool {
        matches!(self, Self::NoUpstream)
    }
}

/// Connects one upstream and classifies its failures.
///
/// Which errors count as connection errors is up to the dialer; the balancer
/// only asks the question and never enumerates error kinds itself.
#[async_trait::async_trait]
pub trait ClientDialer: Send + Sync + 'static {
    type Client: Clone + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Connect the client.
    async fn dial(&self) -> Result<Self::Client, Self::Error>;

    /// Whether `err` means the connection is gone and the upstream must be
    /// evicted until redial.
    fn is_connection_error(&self, err: &Self::Error) -> bool;

    /// Requests-per-second cap; 0 means unlimited.
    fn limit_rps(&self) -> u32;
}

/// Callback invoked when an upstream joins or leaves the connected set.
pub type ConnectionObserver<C> = Box<dyn Fn(&C, bool) + Send + Sync>;

struct ClientRecord<C> {
    connected: bool,
    cap: i64,
    bucket: i64,
    client: Option<C>,
}

struct BalancerState<C> {
    records: Vec<ClientRecord<C>>,
    /// Indices of connected records, ascending; a subsequence of `records`.
    connected: Vec<usize>,
    index: usize,
    last_refill: Instant,
}

impl<C: Clone> BalancerState<C> {
    fn rebuild_connected(&mut self) {
        self.connected =
            (0..self.records.len()).filter(|&i| self.records[i].connected).collect();
    }

    /// Select a connected upstream with budget; decrements its bucket.
    fn select(&mut self) -> Option<(usize, C)> {
        let len = self.connected.len();
        if len == 0 {
            return None;
        }
        if self.index >= len {
            self.index = 0;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        if elapsed >= REFILL_INTERVAL {
            let Self { records, connected, last_refill, .. } = self;
            for &idx in connected.iter() {
                let record = &mut records[idx];
                record.bucket = record.cap;
            }
            // Advance the anchor on the whole-second grid.
            *last_refill += Duration::from_secs(elapsed.as_secs());
        }

        for i in 0..len {
            let idx = self.connected[(self.index + i) % len];
            if self.records[idx].bucket > 0 {
                self.index = (self.index + i + 1) % len;
                self.records[idx].bucket -= 1;
                return Some((idx, self.records[idx].client.clone()?));
            }
        }

        // Everything in rotation order is drained: the least-throttled
        // upstream takes the call, first position winning ties. A fully
        // exhausted set yields nothing.
        let mut best: Option<usize> = None;
        let mut best_bucket = 0i64;
        for &idx in &self.connected {
            if self.records[idx].bucket > best_bucket {
                best_bucket = self.records[idx].bucket;
                best = Some(idx);
            }
        }
        let idx = best?;
        self.records[idx].bucket -= 1;
        Some((idx, self.records[idx].client.clone()?))
    }
}

/// Load balancer over multiple upstream clients.
pub struct ClientBalancer<D: ClientDialer> {
    dialers: Vec<D>,
    state: Mutex<BalancerState<D::Client>>,
    observer: Option<ConnectionObserver<D::Client>>,
    reconnect: Mutex<Option<JoinHandle<()>>>,
}

impl<D: ClientDialer> ClientBalancer<D> {
    pub fn new(dialers: Vec<D>) -> Self {
        let records = dialers
            .iter()
            .map(|d| {
                let cap = effective_cap(d.limit_rps());
                ClientRecord { connected: false, cap, bucket: cap, client: None }
            })
            .collect();
        Self {
            dialers,
            state: Mutex::new(BalancerState {
                records,
                connected: Vec::new(),
                index: 0,
                last_refill: Instant::now(),
            }),
            observer: None,
            reconnect: Mutex::new(None),
        }
    }

    pub fn with_observer(mut self, observer: ConnectionObserver<D::Client>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Dial every upstream and spawn the reconnect task. Dial failures are
    /// logged, not fatal: the balancer runs on whatever came up.
    pub async fn start(self: Arc<Self>) -> Arc<Self> {
        self.state.lock().last_refill = Instant::now();
        self.connect_clients().await;
        let this = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(RECONNECT_INTERVAL).await;
                this.connect_clients().await;
            }
        });
        *self.reconnect.lock() = Some(handle);
        self
    }

    async fn connect_clients(&self) {
        let pending: Vec<usize> = {
            let state = self.state.lock();
            (0..state.records.len()).filter(|&i| !state.records[i].connected).collect()
        };
        for idx in pending {
            match self.dialers[idx].dial().await {
                Ok(client) => {
                    {
                        let mut state = self.state.lock();
                        let record = &mut state.records[idx];
                        record.client = Some(client.clone());
                        record.connected = true;
                        state.rebuild_connected();
                    }
                    if let Some(observer) = &self.observer {
                        observer(&client, true);
                    }
                }
                Err(err) => {
                    warn!(upstream = idx, error = %err, "failed to connect upstream");
                }
            }
        }
    }

    fn mark_disconnected(&self, idx: usize) {
        let client = {
            let mut state = self.state.lock();
            let record = &mut state.records[idx];
            if !record.connected {
                return;
            }
            record.connected = false;
            let client = record.client.take();
            state.rebuild_connected();
            client
        };
        if let (Some(observer), Some(client)) = (&self.observer, &client) {
            observer(client, false);
        }
    }

    fn select_client(&self) -> Option<(usize, D::Client)> {
        self.state.lock().select()
    }

    async fn run_op<F, Fut, R>(&self, idx: usize, client: D::Client, op: F) -> Result<R, BalancerError<D::Error>>
    where
        F: FnOnce(D::Client) -> Fut,
        Fut: Future<Output = Result<R, D::Error>>,
    {
        match op(client).await {
            Ok(res) => Ok(res),
            Err(err) => {
                if self.dialers[idx].is_connection_error(&err) {
                    self.mark_disconnected(idx);
                }
                Err(BalancerError::Upstream(err))
            }
        }
    }

    /// Run `op` against one available upstream, or fail immediately with
    /// [`BalancerError::NoUpstream`].
    pub async fn call<F, Fut, R>(&self, op: F) -> Result<R, BalancerError<D::Error>>
    where
        F: FnOnce(D::Client) -> Fut,
        Fut: Future<Output = Result<R, D::Error>>,
    {
        let (idx, client) = self.select_client().ok_or(BalancerError::NoUpstream)?;
        self.run_op(idx, client, op).await
    }

    /// Like [`ClientBalancer::call`], but polls once per second until an
    /// upstream has budget. Apply `tokio::time::timeout` to bound the wait.
    pub async fn call_waiting<F, Fut, R>(&self, op: F) -> Result<R, BalancerError<D::Error>>
    where
        F: FnOnce(D::Client) -> Fut,
        Fut: Future<Output = Result<R, D::Error>>,
    {
        let (idx, client) = loop {
            match self.select_client() {
                Some(selected) => break selected,
                None => {
                    debug!("no upstream available");
                    tokio::time::sleep(WAIT_POLL_INTERVAL).await;
                }
            }
        };
        self.run_op(idx, client, op).await
    }

    /// Run `op` sequentially against every connected upstream, returning the
    /// last error encountered.
    pub async fn call_every<F, Fut>(&self, mut op: F) -> Result<(), BalancerError<D::Error>>
    where
        F: FnMut(D::Client) -> Fut,
        Fut: Future<Output = Result<(), D::Error>>,
    {
        let clients: Vec<D::Client> = {
            let state = self.state.lock();
            state
                .connected
                .iter()
                .filter_map(|&idx| state.records[idx].client.clone())
                .collect()
        };
        let mut result = Ok(());
        for client in clients {
            if let Err(err) = op(client).await {
                result = Err(BalancerError::Upstream(err));
            }
        }
        result
    }

    /// Number of currently connected upstreams.
    pub fn connected_len(&self) -> usize {
        self.state.lock().connected.len()
    }

    /// Stop reconnection and release every live client handle.
    pub fn close(&self) {
        if let Some(handle) = self.reconnect.lock().take() {
            handle.abort();
        }
        let mut state = self.state.lock();
        for record in &mut state.records {
            record.connected = false;
            record.client = None;
        }
        state.connected.clear();
    }
}

fn effective_cap(limit_rps: u32) -> i64 {
    if limit_rps == 0 {
        UNLIMITED
    } else {
        i64::from(limit_rps)
    }
}
