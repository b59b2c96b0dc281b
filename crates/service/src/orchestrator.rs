//! Update orchestration: triggers, persistence, badge pushes

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use coinpeek_aggregator::PriceAggregator;
use coinpeek_core::{now_ms, AggregateResult, AppConfig, PriceSnapshot, UPDATE_TRIGGER};

use crate::badge::{badge_for, DisplaySurface};

/// Requests from the display layer
#[derive(Debug)]
pub enum Request {
    /// Drive an aggregation pass (respecting or bypassing the rate
    /// gate) and reply with the resulting snapshot
    FetchCryptoData {
        force_refresh: bool,
        reply: oneshot::Sender<FetchResponse>,
    },
    /// Read the cached snapshot without touching the network
    CachedSnapshot { reply: oneshot::Sender<CachedResponse> },
}

/// Response envelope: `{success, data}` or `{success: false, error}`.
/// Errors cross this boundary as strings, never as panics.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PriceSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResponse {
    fn ok(data: PriceSnapshot) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(error: String) -> Self {
        Self { success: false, data: None, error: Some(error) }
    }
}

/// Cached snapshot plus its staleness against the freshness threshold
#[derive(Debug, Clone, Serialize)]
pub struct CachedResponse {
    pub data: Option<PriceSnapshot>,
    pub stale: bool,
}

/// Handle held by the display layer. Each request gets exactly one
/// reply; a stopped service answers with an error envelope.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Request>,
}

impl ServiceHandle {
    pub async fn fetch(&self, force_refresh: bool) -> FetchResponse {
        let (reply, rx) = oneshot::channel();
        let request = Request::FetchCryptoData { force_refresh, reply };
        if self.tx.send(request).await.is_err() {
            return FetchResponse::err("aggregation service stopped".to_string());
        }
        rx.await
            .unwrap_or_else(|_| FetchResponse::err("aggregation service stopped".to_string()))
    }

    pub async fn cached(&self) -> CachedResponse {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Request::CachedSnapshot { reply }).await.is_err() {
            return CachedResponse { data: None, stale: true };
        }
        rx.await
            .unwrap_or(CachedResponse { data: None, stale: true })
    }
}

/// Reacts to external triggers and drives the aggregator, persisting
/// results and pushing badge updates.
///
/// The run loop is strictly sequential: only one aggregation pass is
/// in flight at a time, and a trigger arriving mid-fetch queues behind
/// it. Missed periodic ticks are skipped rather than replayed.
pub struct Orchestrator {
    aggregator: Arc<PriceAggregator>,
    display: Arc<dyn DisplaySurface>,
    config: AppConfig,
    rx: mpsc::Receiver<Request>,
}

impl Orchestrator {
    pub fn new(
        aggregator: Arc<PriceAggregator>,
        display: Arc<dyn DisplaySurface>,
        config: AppConfig,
    ) -> (Self, ServiceHandle) {
        let (tx, rx) = mpsc::channel(16);
        let orchestrator = Self { aggregator, display, config, rx };
        (orchestrator, ServiceHandle { tx })
    }

    /// Run until `shutdown` fires or every handle is dropped. The first
    /// periodic tick lands after the startup delay, so process start
    /// gets its initial fetch without contending with anything else.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.intervals.initial_delay,
            self.config.intervals.refresh_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(trigger = UPDATE_TRIGGER, "orchestrator started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("orchestrator shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    // Periodic wake-ups always force a refresh
                    if let Err(e) = self.refresh(true).await {
                        error!(error = %e, "scheduled refresh failed");
                    }
                }
                request = self.rx.recv() => {
                    match request {
                        Some(request) => self.handle(request).await,
                        None => {
                            info!("all service handles dropped");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, request: Request) {
        match request {
            Request::FetchCryptoData { force_refresh, reply } => {
                let response = match self.refresh(force_refresh).await {
                    Ok(snapshot) => FetchResponse::ok(snapshot),
                    Err(e) => FetchResponse::err(e.to_string()),
                };
                // At most one reply; a dropped receiver is ignored
                let _ = reply.send(response);
            }
            Request::CachedSnapshot { reply } => {
                let cache = self.aggregator.cache();
                let data = cache.read().await;
                let stale = data
                    .as_ref()
                    .map_or(true, |snapshot| cache.is_stale(snapshot, now_ms()));
                let _ = reply.send(CachedResponse { data, stale });
            }
        }
    }

    /// One pass: aggregate, persist, push the badge. A failed persist
    /// costs durability, not the response; a failed pass leaves the
    /// prior cached state untouched.
    async fn refresh(&self, force_refresh: bool) -> AggregateResult<PriceSnapshot> {
        let snapshot = self.aggregator.fetch_prices(force_refresh).await?;

        if let Err(e) = self.aggregator.cache().write(&snapshot).await {
            warn!(error = %e, "failed to persist snapshot");
        }

        if let Some(badge) = badge_for(&snapshot, &self.config.badge) {
            self.display.update_badge(&badge);
        }

        Ok(snapshot)
    }
}
