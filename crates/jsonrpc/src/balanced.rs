//! Balanced JSON-RPC client
//!
//! Routes every call through the upstream balancer, waiting for bucket
//! capacity, and records per-upstream request metrics:
//! `clientrpc_req_sec` (histogram, buckets 0.1/1/5/10 s) and `clientrpc_up`
//! (0/1 gauge), both labeled `{chain, upstream}`.

use crate::call::{RawCall, RpcBatch, RpcClient};
use crate::error::RpcClientError;
use crate::http::HttpRpcClient;
use omni_balancer::{ClientBalancer, ClientDialer};
use prometheus::{Gauge, Histogram, HistogramOpts, Opts};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error};

const REQUEST_BUCKETS: &[f64] = &[0.1, 1.0, 5.0, 10.0];

/// One RPC endpoint from configuration.
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    /// Display label; the URL stands in when empty.
    pub name: String,
    pub url: String,
    /// Requests per second, 0 for unlimited.
    pub limit_rps: u32,
}

impl RpcEndpoint {
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

/// Per-upstream metrics, created once per endpoint and shared by redials.
#[derive(Clone)]
pub struct UpstreamMetrics {
    pub requests: Histogram,
    pub up: Gauge,
}

impl UpstreamMetrics {
    fn new(chain: &str, upstream: &str) -> Result<Self, prometheus::Error> {
        let labels = HashMap::from([
            ("chain".to_string(), chain.to_string()),
            ("upstream".to_string(), upstream.to_string()),
        ]);
        let requests = Histogram::with_opts(
            HistogramOpts::new("req_sec", "RPC request time")
                .subsystem("clientrpc")
                .const_labels(labels.clone())
                .buckets(REQUEST_BUCKETS.to_vec()),
        )?;
        let up = Gauge::with_opts(
            Opts::new("up", "Upstream connection status")
                .subsystem("clientrpc")
                .const_labels(labels),
        )?;
        if let Err(err) = prometheus::register(Box::new(requests.clone())) {
            debug!(error = %err, "request histogram already registered");
        }
        if let Err(err) = prometheus::register(Box::new(up.clone())) {
            debug!(error = %err, "up gauge already registered");
        }
        Ok(Self { requests, up })
    }
}

/// A dialed upstream: connection handle plus its metrics.
#[derive(Clone)]
pub struct Upstream {
    pub client: HttpRpcClient,
    pub metrics: UpstreamMetrics,
}

/// Dialer for one configured endpoint.
pub struct RpcDialer {
    endpoint: RpcEndpoint,
    http: reqwest::Client,
    metrics: UpstreamMetrics,
}

impl RpcDialer {
    pub fn new(chain: &str, endpoint: RpcEndpoint) -> Result<Self, prometheus::Error> {
        let metrics = UpstreamMetrics::new(chain, endpoint.label())?;
        Ok(Self { endpoint, http: reqwest::Client::new(), metrics })
    }
}

#[async_trait::async_trait]
impl ClientDialer for RpcDialer {
    type Client = Upstream;
    type Error = RpcClientError;

    async fn dial(&self) -> Result<Upstream, RpcClientError> {
        Ok(Upstream {
            client: HttpRpcClient::new(self.http.clone(), self.endpoint.url.clone()),
            metrics: self.metrics.clone(),
        })
    }

    fn is_connection_error(&self, err: &RpcClientError) -> bool {
        matches!(err, RpcClientError::Transport(e) if e.is_connect() || e.is_timeout())
    }

    fn limit_rps(&self) -> u32 {
        self.endpoint.limit_rps
    }
}

/// JSON-RPC client over a balanced pool of upstreams.
pub struct BalancedRpcClient {
    balancer: Arc<ClientBalancer<RpcDialer>>,
}

impl BalancedRpcClient {
    /// Dial all endpoints and start the reconnect loop. Initial failures are
    /// logged by the balancer, not fatal.
    pub async fn start(chain: &str, endpoints: Vec<RpcEndpoint>) -> Result<Self, prometheus::Error> {
        let dialers = endpoints
            .into_iter()
            .map(|endpoint| RpcDialer::new(chain, endpoint))
            .collect::<Result<Vec<_>, _>>()?;
        let balancer = ClientBalancer::new(dialers).with_observer(Box::new(
            |upstream: &Upstream, connected| {
                upstream.metrics.up.set(if connected { 1.0 } else { 0.0 });
            },
        ));
        let balancer = Arc::new(balancer).start().await;
        Ok(Self { balancer })
    }

    pub fn connected_len(&self) -> usize {
        self.balancer.connected_len()
    }

    pub fn close(&self) {
        self.balancer.close();
    }

    /// Run one call against every connected upstream sequentially; the last
    /// successful result and the last error win.
    pub async fn call_every_upstream(&self, call: &mut RawCall) -> Result<(), RpcClientError> {
        let method = call.method.clone();
        let params = call.params.clone();
        let result = Arc::new(Mutex::new(None));
        let outcome = self
            .balancer
            .call_every(|upstream: Upstream| {
                let method = method.clone();
                let params = params.clone();
                let result = Arc::clone(&result);
                async move {
                    let mut elem = RawCall::new(method, params);
                    match upstream.client.call_raw(&mut elem).await {
                        Ok(()) => {
                            *result.lock().unwrap() = elem.result.take();
                            Ok(())
                        }
                        Err(err) => {
                            error!(url = upstream.client.url(), error = %err, "call to upstream failed");
                            Err(err)
                        }
                    }
                }
            })
            .await;
        call.result = result.lock().unwrap().take();
        outcome.map_err(Into::into)
    }
}

#[async_trait::async_trait]
impl RpcClient for BalancedRpcClient {
    async fn call_raw(&self, call: &mut RawCall) -> Result<(), RpcClientError> {
        debug!(method = %call.method, params = ?call.params, "rpc request");
        let reborrow = &mut *call;
        let result = self
            .balancer
            .call_waiting(|upstream: Upstream| async move {
                let start = Instant::now();
                let result = upstream.client.call_raw(reborrow).await;
                upstream.metrics.requests.observe(start.elapsed().as_secs_f64());
                result
            })
            .await
            .map_err(RpcClientError::from);
        debug!(method = %call.method, ok = result.is_ok(), "rpc response");
        result
    }

    async fn batch_call(&self, batch: &mut RpcBatch) -> Result<(), RpcClientError> {
        for call in &batch.calls {
            debug!(method = %call.method, params = ?call.params, "batch request");
        }
        let reborrow = &mut *batch;
        let result = self
            .balancer
            .call_waiting(|upstream: Upstream| async move {
                let start = Instant::now();
                let result = upstream.client.batch_call(reborrow).await;
                upstream.metrics.requests.observe(start.elapsed().as_secs_f64());
                result
            })
            .await
            .map_err(RpcClientError::from);
        for call in &batch.calls {
            debug!(method = %call.method, has_result = call.result.is_some(), "batch response");
        }
        result
    }
}
