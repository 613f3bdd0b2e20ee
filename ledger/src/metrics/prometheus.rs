//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed block-layer metrics, and an
//! async HTTP exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Block-layer Prometheus metrics.
///
/// These are registered into a [`Registry`] and can be updated from the
/// codec and signature paths.
#[derive(Clone)]
pub struct BlockMetrics {
    /// Blocks decoded successfully from the wire.
    pub decoded_total: IntCounter,
    /// Block payloads that failed to decode (malformed or oversize).
    pub decode_failures_total: IntCounter,
    /// Signatures that survived a verification pass.
    pub signatures_verified_total: IntCounter,
    /// Signatures removed or rejected by a verification pass.
    pub signatures_rejected_total: IntCounter,
    /// Latency of a full signature-set verification, in seconds.
    pub verify_seconds: Histogram,
}

impl BlockMetrics {
    /// Registers block metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let decoded_total = IntCounter::with_opts(Opts::new(
            "block_decoded_total",
            "Total number of blocks decoded successfully",
        ))?;
        registry.register(Box::new(decoded_total.clone()))?;

        let decode_failures_total = IntCounter::with_opts(Opts::new(
            "block_decode_failures_total",
            "Total number of block payloads that failed to decode",
        ))?;
        registry.register(Box::new(decode_failures_total.clone()))?;

        let signatures_verified_total = IntCounter::with_opts(Opts::new(
            "block_signatures_verified_total",
            "Total number of block signatures that passed verification",
        ))?;
        registry.register(Box::new(signatures_verified_total.clone()))?;

        let signatures_rejected_total = IntCounter::with_opts(Opts::new(
            "block_signatures_rejected_total",
            "Total number of block signatures removed by verification",
        ))?;
        registry.register(Box::new(signatures_rejected_total.clone()))?;

        let verify_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "block_verify_seconds",
                "Time to verify a block's signature set in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(verify_seconds.clone()))?;

        Ok(Self {
            decoded_total,
            decode_failures_total,
            signatures_verified_total,
            signatures_rejected_total,
            verify_seconds,
        })
    }
}

/// Wrapper around a Prometheus registry and the block-layer metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub blocks: BlockMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the block-layer metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ledger".to_string()), None)?;
        let blocks = BlockMetrics::register(&registry)?;
        Ok(Self { registry, blocks })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}
