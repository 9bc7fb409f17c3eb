//! Concurrent status aggregation.
//!
//! Fans a list of channel requests out over a bounded set of tokio tasks.
//! Each task consults the [`StatusCache`], falls back to the platform
//! provider on a miss, and keeps serving the last known status when the
//! provider fails. Results are collected only after every task finishes and
//! are returned live-first, busiest-first.
//!
//! Failures never fail the batch: an unsupported platform or a failed fetch
//! with nothing cached simply leaves that channel out of the result.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use common::models::{ChannelRequest, Platform, StreamStatus};
use providers::ProviderRegistry;

pub mod cache;
pub mod ordering;

pub use cache::{CacheEntry, StatusCache};

/// Upper bound on concurrent fetches per `fetch_all` call.
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Freshness window used when the caller does not pick one.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// How a single request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Served from a cache entry younger than the ttl.
    Cached,
    /// Fetched from the provider and written to the cache.
    Fresh,
    /// Provider failed; served the last cached status regardless of age.
    Stale,
    /// Provider failed and nothing was cached.
    Unavailable,
    /// No provider exists for the platform.
    Unsupported,
}

pub struct StatusService {
    channels: Vec<ChannelRequest>,
    registry: Arc<ProviderRegistry>,
    cache: StatusCache,
    worker_count: usize,
}

impl StatusService {
    pub fn new(channels: Vec<ChannelRequest>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            channels,
            registry,
            cache: StatusCache::new(),
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }

    /// Change the concurrency bound. Zero is treated as one.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Status of every configured channel.
    pub async fn all_statuses(&self, ttl: Duration) -> Vec<StreamStatus> {
        self.fetch_all(&self.channels, ttl).await
    }

    /// Status of the configured channels on one platform.
    pub async fn statuses_for_platform(&self, platform: &Platform, ttl: Duration) -> Vec<StreamStatus> {
        let targets: Vec<ChannelRequest> = self
            .channels
            .iter()
            .filter(|c| &c.platform == platform)
            .cloned()
            .collect();
        self.fetch_all(&targets, ttl).await
    }

    /// Fetch every request with at most `min(worker_count, requests.len())`
    /// in flight, wait for all of them, and return the ordered results.
    pub async fn fetch_all(&self, requests: &[ChannelRequest], ttl: Duration) -> Vec<StreamStatus> {
        if requests.is_empty() {
            return Vec::new();
        }

        let workers = self.worker_count.min(requests.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for request in requests.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let cache = self.cache.clone();
            let registry = Arc::clone(&self.registry);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };
                let (_, status) = fetch_one(&request, ttl, &cache, &registry).await;
                status
            });
        }

        let mut statuses = Vec::with_capacity(requests.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(status)) => statuses.push(status),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Status task panicked"),
            }
        }

        ordering::sort_statuses(&mut statuses);
        statuses
    }
}

/// Serve one request: fresh cache, then provider, then stale cache.
pub async fn fetch_one(
    request: &ChannelRequest,
    ttl: Duration,
    cache: &StatusCache,
    registry: &ProviderRegistry,
) -> (FetchOutcome, Option<StreamStatus>) {
    let key = request.cache_key();
    let platform = &request.platform;
    let channel_id = request.channel_id.as_str();

    let cached = cache.get(&key).await;
    if let Some(entry) = cached.as_ref().filter(|entry| entry.is_fresh(ttl)) {
        debug!(%platform, channel_id, "Cache hit");
        return (FetchOutcome::Cached, Some(entry.status.clone()));
    }

    let Some(provider) = registry.resolve(platform) else {
        debug!(%platform, channel_id, "No provider for platform, skipping");
        return (FetchOutcome::Unsupported, None);
    };

    debug!(%platform, channel_id, "Fetching status");
    match provider.fetch_status(channel_id).await {
        Ok(mut status) => {
            if let Some(name) = request.name_override() {
                status.name = name.to_string();
            }
            cache.put(key, status.clone()).await;
            debug!(%platform, channel_id, "Cache updated");
            (FetchOutcome::Fresh, Some(status))
        }
        Err(e) => match cached {
            Some(entry) => {
                warn!(
                    %platform,
                    channel_id,
                    age_secs = entry.age().as_secs(),
                    error = %e,
                    "Using stale cache due to error"
                );
                (FetchOutcome::Stale, Some(entry.status))
            }
            None => {
                error!(%platform, channel_id, error = %e, "Failed to fetch stream status");
                (FetchOutcome::Unavailable, None)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use providers::{ProviderError, StreamProvider, TransportError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Stub provider that counts calls and can be switched into failure.
    struct StubProvider {
        platform: Platform,
        viewers: Mutex<HashMap<String, (bool, i64)>>,
        failing: AtomicBool,
        calls: AtomicUsize,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubProvider {
        fn new(platform: Platform) -> Self {
            Self {
                platform,
                viewers: Mutex::new(HashMap::new()),
                failing: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn serve(self, channel_id: &str, is_live: bool, viewers: i64) -> Self {
            self.viewers.lock().unwrap().insert(channel_id.into(), (is_live, viewers));
            self
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StreamProvider for StubProvider {
        fn platform(&self) -> Platform {
            self.platform.clone()
        }

        async fn fetch_status(&self, channel_id: &str) -> Result<StreamStatus, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.load(Ordering::SeqCst) {
                return Err(ProviderError::Transport(TransportError::Status {
                    url: format!("stub://{}", channel_id),
                    status: 503,
                }));
            }
            let (is_live, viewers) = self.viewers.lock().unwrap().get(channel_id).copied().unwrap_or((false, 0));
            Ok(StreamStatus {
                channel_id: channel_id.into(),
                name: format!("scraped-{}", channel_id),
                platform: self.platform.to_string(),
                is_live,
                viewer_count: viewers,
                observed_at: chrono::Utc::now().timestamp(),
                ..Default::default()
            })
        }
    }

    fn registry_with(providers: Vec<Arc<StubProvider>>) -> Arc<ProviderRegistry> {
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider);
        }
        Arc::new(registry)
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_example_batch_is_ordered_and_skips_unsupported() {
        let bilibili = Arc::new(StubProvider::new(Platform::Bilibili).serve("1", true, 50));
        let huya = Arc::new(StubProvider::new(Platform::Huya).serve("2", true, 200));
        let service = StatusService::new(Vec::new(), registry_with(vec![bilibili.clone(), huya.clone()]));

        let requests = vec![
            ChannelRequest::new(Platform::Bilibili, "1"),
            ChannelRequest::new(Platform::Huya, "2"),
            ChannelRequest::new("badplat", "3"),
        ];
        let statuses = service.fetch_all(&requests, TTL).await;

        let got: Vec<(&str, i64)> = statuses.iter().map(|s| (s.channel_id.as_str(), s.viewer_count)).collect();
        assert_eq!(got, vec![("2", 200), ("1", 50)]);
        assert_eq!(service.cache().len().await, 2);
        assert!(service.cache().get("badplat:3").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let bilibili = Arc::new(StubProvider::new(Platform::Bilibili).serve("1", true, 50));
        let service = StatusService::new(Vec::new(), registry_with(vec![bilibili.clone()]));
        let requests = vec![ChannelRequest::new(Platform::Bilibili, "1")];

        let first = service.fetch_all(&requests, TTL).await;
        assert_eq!(bilibili.calls(), 1);

        let second = service.fetch_all(&requests, TTL).await;
        assert_eq!(bilibili.calls(), 1, "cache hit must not call the provider");
        assert_eq!(first, second);
        assert_eq!(first[0].observed_at, second[0].observed_at);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let huya = Arc::new(StubProvider::new(Platform::Huya).serve("2", false, 3));
        let service = StatusService::new(Vec::new(), registry_with(vec![huya.clone()]));
        let requests = vec![ChannelRequest::new(Platform::Huya, "2")];

        service.fetch_all(&requests, TTL).await;
        service.fetch_all(&requests, Duration::ZERO).await;
        assert_eq!(huya.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_serves_stale_entry() {
        let huya = Arc::new(StubProvider::new(Platform::Huya).serve("2", true, 200));
        let service = StatusService::new(Vec::new(), registry_with(vec![huya.clone()]));
        let request = ChannelRequest::new(Platform::Huya, "2");

        let fresh = service.fetch_all(std::slice::from_ref(&request), TTL).await;
        let before = service.cache().get("huya:2").await.unwrap();

        huya.set_failing(true);
        let (outcome, status) =
            fetch_one(&request, Duration::ZERO, service.cache(), &service.registry).await;
        assert_eq!(outcome, FetchOutcome::Stale);
        assert_eq!(status.as_ref(), fresh.first());

        let stale = service.fetch_all(std::slice::from_ref(&request), Duration::ZERO).await;
        assert_eq!(stale, fresh);
        assert_eq!(huya.calls(), 3);

        let after = service.cache().get("huya:2").await.unwrap();
        assert_eq!(after.cached_at, before.cached_at, "stale fallback must not refresh the entry");
    }

    #[tokio::test]
    async fn test_failure_without_cache_is_omitted() {
        let huya = Arc::new(StubProvider::new(Platform::Huya).serve("2", true, 200));
        let douyu = Arc::new(StubProvider::new(Platform::Douyu).serve("5", false, 7));
        huya.set_failing(true);
        let service = StatusService::new(Vec::new(), registry_with(vec![huya.clone(), douyu.clone()]));

        let request = ChannelRequest::new(Platform::Huya, "2");
        let (outcome, status) = fetch_one(&request, TTL, service.cache(), &service.registry).await;
        assert_eq!(outcome, FetchOutcome::Unavailable);
        assert!(status.is_none());

        let statuses = service
            .fetch_all(&[request, ChannelRequest::new(Platform::Douyu, "5")], TTL)
            .await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].channel_id, "5");
        assert!(service.cache().get("huya:2").await.is_none());
    }

    #[tokio::test]
    async fn test_display_name_override() {
        let bilibili = Arc::new(
            StubProvider::new(Platform::Bilibili)
                .serve("1", true, 1)
                .serve("2", true, 2),
        );
        let service = StatusService::new(Vec::new(), registry_with(vec![bilibili]));

        let requests = vec![
            ChannelRequest::new(Platform::Bilibili, "1").with_display_name("Configured Name"),
            ChannelRequest::new(Platform::Bilibili, "2").with_display_name(""),
        ];
        let statuses = service.fetch_all(&requests, TTL).await;

        let by_id: HashMap<_, _> = statuses.iter().map(|s| (s.channel_id.as_str(), s.name.as_str())).collect();
        assert_eq!(by_id["1"], "Configured Name");
        assert_eq!(by_id["2"], "scraped-2");

        let cached = service.cache().get("bilibili:1").await.unwrap();
        assert_eq!(cached.status.name, "Configured Name");
    }

    #[tokio::test]
    async fn test_unsupported_platform_never_reaches_a_provider() {
        let huya = Arc::new(StubProvider::new(Platform::Huya));
        let service = StatusService::new(Vec::new(), registry_with(vec![huya.clone()]));

        let request = ChannelRequest::new("badplat", "3");
        let (outcome, status) = fetch_one(&request, TTL, service.cache(), &service.registry).await;
        assert_eq!(outcome, FetchOutcome::Unsupported);
        assert!(status.is_none());
        assert!(service.fetch_all(&[request], TTL).await.is_empty());
        assert_eq!(huya.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_requests_yields_empty_result() {
        let service = StatusService::new(Vec::new(), Arc::new(ProviderRegistry::new()));
        assert!(service.fetch_all(&[], TTL).await.is_empty());
        assert!(service.all_statuses(TTL).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_worker_count() {
        let mut douyu = StubProvider::new(Platform::Douyu).with_delay(Duration::from_millis(20));
        let requests: Vec<ChannelRequest> = (0..25)
            .map(|i| ChannelRequest::new(Platform::Douyu, i.to_string()))
            .collect();
        for (i, req) in requests.iter().enumerate() {
            douyu = douyu.serve(&req.channel_id, i % 2 == 0, i as i64);
        }
        let douyu = Arc::new(douyu);
        let service = StatusService::new(Vec::new(), registry_with(vec![douyu.clone()])).with_worker_count(3);

        let statuses = service.fetch_all(&requests, TTL).await;
        assert_eq!(statuses.len(), 25);
        assert_eq!(douyu.calls(), 25);
        let peak = douyu.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeded worker count", peak);

        for pair in statuses.windows(2) {
            assert!(pair[0].is_live >= pair[1].is_live);
            if pair[0].is_live == pair[1].is_live {
                assert!(pair[0].viewer_count >= pair[1].viewer_count);
            }
        }
    }

    #[tokio::test]
    async fn test_statuses_for_platform_filters_configured_channels() {
        let bilibili = Arc::new(StubProvider::new(Platform::Bilibili).serve("1", true, 10));
        let huya = Arc::new(StubProvider::new(Platform::Huya).serve("2", true, 20));
        let channels = vec![
            ChannelRequest::new(Platform::Bilibili, "1"),
            ChannelRequest::new(Platform::Huya, "2"),
        ];
        let service = StatusService::new(channels, registry_with(vec![bilibili.clone(), huya.clone()]));

        let only_huya = service.statuses_for_platform(&Platform::Huya, TTL).await;
        assert_eq!(only_huya.len(), 1);
        assert_eq!(only_huya[0].platform, "huya");
        assert_eq!(bilibili.calls(), 0);

        let all = service.all_statuses(TTL).await;
        assert_eq!(all.len(), 2);
        assert_eq!(huya.calls(), 1, "second read of huya:2 is a cache hit");
    }

    #[tokio::test]
    async fn test_returned_statuses_are_not_in_the_future() {
        let huya = Arc::new(StubProvider::new(Platform::Huya).serve("2", true, 1));
        let service = StatusService::new(Vec::new(), registry_with(vec![huya]));
        let statuses = service.fetch_all(&[ChannelRequest::new(Platform::Huya, "2")], TTL).await;
        assert!(statuses[0].observed_at <= chrono::Utc::now().timestamp());
    }
}
