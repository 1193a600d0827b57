use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{endpoint::Endpoint, response::ClientResponse};

pub enum CacheRequest {
    LastCalled(Endpoint, oneshot::Sender<Option<DateTime<Utc>>>),
    LastResponse(Endpoint, oneshot::Sender<Option<ClientResponse>>),
    Update(Endpoint, ClientResponse),
}

/// Remembers when each endpoint last answered and with what, so requests
/// can be conditional and a `304 Not Modified` can be served locally.
#[derive(Debug, Clone)]
pub struct ClientCache {
    receiver: mpsc::Sender<CacheRequest>,
}

struct CacheInner {
    last_called: HashMap<Endpoint, DateTime<Utc>>,
    last_response: HashMap<Endpoint, ClientResponse>,
}

impl ClientCache {
    const CLEANUP_INTERVAL: u64 = 100;

    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::channel::<CacheRequest>(100);
        tokio::spawn(async move {
            let mut inner = CacheInner::new();
            let mut counter = 0;
            while let Some(request) = rx.recv().await {
                inner.handle_request(request);
                counter += 1;
                if counter == Self::CLEANUP_INTERVAL {
                    info!("Cleaning up cache");
                    counter = 0;
                    inner.cleanup(Utc::now());
                }
            }
        });
        Self { receiver: tx }
    }

    async fn send(&self, request: CacheRequest) {
        if self.receiver.send(request).await.is_err() {
            warn!("Response cache is gone");
        }
    }

    pub async fn last_called(&self, endpoint: Endpoint) -> Option<DateTime<Utc>> {
        let (tx, rx) = oneshot::channel();
        self.send(CacheRequest::LastCalled(endpoint, tx)).await;
        rx.await.ok().flatten()
    }

    pub async fn update(&self, endpoint: Endpoint, response: ClientResponse) {
        self.send(CacheRequest::Update(endpoint, response)).await;
    }

    pub async fn last_response(&self, endpoint: Endpoint) -> Option<ClientResponse> {
        let (tx, rx) = oneshot::channel();
        self.send(CacheRequest::LastResponse(endpoint, tx)).await;
        rx.await.ok().flatten()
    }
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheInner {
    const MAX_CACHE_TIME_S: i64 = 60 * 60;

    fn new() -> Self {
        Self {
            last_called: HashMap::new(),
            last_response: HashMap::new(),
        }
    }

    fn cleanup(&mut self, now: DateTime<Utc>) {
        let expired: Vec<Endpoint> = self
            .last_called
            .iter()
            .filter(|(_, called)| {
                now.signed_duration_since(**called).num_seconds() > Self::MAX_CACHE_TIME_S
            })
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        for endpoint in expired {
            debug!("Evicting cached response for {}", endpoint);
            self.last_called.remove(&endpoint);
            self.last_response.remove(&endpoint);
        }
    }

    fn handle_request(&mut self, request: CacheRequest) {
        match request {
            CacheRequest::LastCalled(endpoint, tx) => {
                let found = self.last_called.get(&endpoint).copied();
                debug!("Last called time for {}: {:?}", endpoint, found);
                let _ = tx.send(found);
            }
            CacheRequest::LastResponse(endpoint, tx) => {
                let found = self.last_response.get(&endpoint).cloned();
                debug!("Cached response for {}: {}", endpoint, found.is_some());
                let _ = tx.send(found);
            }
            CacheRequest::Update(endpoint, response) => {
                debug!("Updating cache for {}", endpoint);
                self.last_called.insert(endpoint.clone(), Utc::now());
                self.last_response.insert(endpoint, response);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_cache() {
        let endpoint = Endpoint::Boards;
        let cache = ClientCache::new();
        assert!(cache.last_called(endpoint.clone()).await.is_none());
        assert!(cache.last_response(endpoint.clone()).await.is_none());

        cache
            .update(endpoint.clone(), ClientResponse::Boards(Arc::new(vec![])))
            .await;

        assert!(cache.last_called(endpoint.clone()).await.is_some());
        assert!(matches!(
            cache.last_response(endpoint.clone()).await,
            Some(ClientResponse::Boards(_))
        ));
        assert!(cache
            .last_response(Endpoint::Catalog("g".to_string()))
            .await
            .is_none());
    }

    #[test]
    fn test_cleanup_evicts_stale_entries() {
        let mut inner = CacheInner::new();
        let stale = Endpoint::Catalog("g".to_string());
        let fresh = Endpoint::Catalog("v".to_string());
        let now = Utc::now();
        inner
            .last_called
            .insert(stale.clone(), now - chrono::Duration::hours(2));
        inner.last_response.insert(stale.clone(), ClientResponse::Catalog(Arc::new(vec![])));
        inner.last_called.insert(fresh.clone(), now);
        inner.last_response.insert(fresh.clone(), ClientResponse::Catalog(Arc::new(vec![])));
        inner.cleanup(now);
        assert!(!inner.last_response.contains_key(&stale));
        assert!(inner.last_response.contains_key(&fresh));
    }
}
