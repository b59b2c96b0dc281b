//! Canned transport for exercising fetch paths without a network

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use coinpeek_core::{FetchError, FetchResult};

use crate::fetch::Transport;

struct Route {
    pattern: &'static str,
    response: FetchResult<Value>,
    hits: usize,
}

/// Routes requests by URL substring and counts every call per route
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<Vec<Route>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: &'static str, response: FetchResult<Value>) -> Self {
        self.routes.lock().push(Route { pattern, response, hits: 0 });
        self
    }

    /// Number of requests that matched `pattern`
    pub fn hits(&self, pattern: &str) -> usize {
        self.routes
            .lock()
            .iter()
            .filter(|r| r.pattern == pattern)
            .map(|r| r.hits)
            .sum()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, url: &str, _timeout: Duration) -> FetchResult<Value> {
        let mut routes = self.routes.lock();
        for route in routes.iter_mut() {
            if url.contains(route.pattern) {
                route.hits += 1;
                return route.response.clone();
            }
        }
        Err(FetchError::Network(format!("no canned route for {url}")))
    }
}
