//! Shared fakes for catalog cache integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use storefront_cache::{
    CacheDomain, CacheError, CacheResult, CacheSettings, CatalogCache, MetricsError, MetricsSink,
    NoopMetrics, RemoteClient, RemoteClientFactory, RemoteStoreConfig,
};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const FAKE_URL: &str = "redis://fake-cache:6379";

/// In-memory stand-in for the remote store, with call spies and failure switches.
#[derive(Default)]
pub struct FakeRemote {
    entries: Mutex<BTreeMap<String, (String, u64)>>,
    scan_snapshot: Mutex<Vec<String>>,

    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub scans: AtomicUsize,
    pub dels: AtomicUsize,

    pub refuse_connect: AtomicBool,
    pub hang_get: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_del: AtomicBool,
    /// Zero-based SCAN call that fails; `usize::MAX` disables.
    pub fail_scan_at: AtomicUsize,
    pub connect_delay_ms: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        fake.fail_scan_at.store(usize::MAX, Ordering::SeqCst);
        Arc::new(fake)
    }

    pub fn refusing() -> Arc<Self> {
        let fake = Self::new();
        fake.refuse_connect.store(true, Ordering::SeqCst);
        fake
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), 60));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Matches the trailing-`*` patterns the remote backend issues.
fn matches_pattern(pattern: &str, key: &str) -> bool {
    let literal = pattern.strip_suffix('*').unwrap_or(pattern);
    let mut prefix = String::new();
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                prefix.push(next);
            }
        } else {
            prefix.push(c);
        }
    }
    key.starts_with(&prefix)
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn connect(&self) -> CacheResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(CacheError::connection("connection refused"));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.hang_get.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CacheError::command("GET", "injected failure"));
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(value, _)| value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(CacheError::command("SET", "injected failure"));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)> {
        let call = self.scans.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_scan_at.load(Ordering::SeqCst) {
            return Err(CacheError::command("SCAN", "injected failure"));
        }

        let mut snapshot = self.scan_snapshot.lock().unwrap();
        if cursor == 0 {
            *snapshot = self
                .entries
                .lock()
                .unwrap()
                .keys()
                .filter(|key| matches_pattern(pattern, key))
                .cloned()
                .collect();
        }

        let start = cursor as usize;
        let end = (start + count).min(snapshot.len());
        let batch = snapshot[start.min(end)..end].to_vec();
        let next = if end >= snapshot.len() { 0 } else { end as u64 };
        Ok((next, batch))
    }

    async fn del(&self, keys: &[String]) -> CacheResult<u64> {
        self.dels.fetch_add(1, Ordering::SeqCst);
        if self.fail_del.load(Ordering::SeqCst) {
            return Err(CacheError::command("DEL", "injected failure"));
        }
        let mut entries = self.entries.lock().unwrap();
        Ok(keys.iter().filter(|k| entries.remove(k.as_str()).is_some()).count() as u64)
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out one shared [`FakeRemote`], counting how often it is asked.
pub struct SpyFactory {
    pub remote: Arc<FakeRemote>,
    pub creates: AtomicUsize,
    pub fail_create: bool,
}

impl SpyFactory {
    pub fn new(remote: Arc<FakeRemote>) -> Arc<Self> {
        Arc::new(Self {
            remote,
            creates: AtomicUsize::new(0),
            fail_create: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            remote: FakeRemote::new(),
            creates: AtomicUsize::new(0),
            fail_create: true,
        })
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

impl RemoteClientFactory for SpyFactory {
    fn create(&self, _config: &RemoteStoreConfig) -> CacheResult<Arc<dyn RemoteClient>> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(CacheError::connection("invalid remote url"));
        }
        let client: Arc<dyn RemoteClient> = self.remote.clone();
        Ok(client)
    }
}

/// Cache without a remote endpoint, with a spy factory that must stay unused.
pub fn in_process_cache() -> (CatalogCache, Arc<SpyFactory>) {
    let factory = SpyFactory::new(FakeRemote::new());
    let cache = CatalogCache::builder(CacheSettings::in_process())
        .remote_factory(factory.clone())
        .metrics(Arc::new(NoopMetrics))
        .build();
    (cache, factory)
}

/// Cache pointed at `remote` through a spy factory.
pub fn remote_cache(remote: Arc<FakeRemote>) -> (CatalogCache, Arc<SpyFactory>) {
    remote_cache_with(remote, |_| {})
}

pub fn remote_cache_with(
    remote: Arc<FakeRemote>,
    tweak: impl FnOnce(&mut RemoteStoreConfig),
) -> (CatalogCache, Arc<SpyFactory>) {
    let mut settings = CacheSettings::with_remote(FAKE_URL);
    if let Some(ref mut config) = settings.remote {
        tweak(config);
    }
    let factory = SpyFactory::new(remote);
    let cache = CatalogCache::builder(settings)
        .remote_factory(factory.clone())
        .metrics(Arc::new(NoopMetrics))
        .build();
    (cache, factory)
}

/// One recorded metrics event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    Hit(CacheDomain),
    Miss(CacheDomain),
    Invalidation(CacheDomain, u64),
}

/// Sink recording every event it receives.
#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<MetricEvent>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: MetricEvent) -> Result<(), MetricsError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl MetricsSink for RecordingMetrics {
    fn record_hit(&self, domain: CacheDomain) -> Result<(), MetricsError> {
        self.push(MetricEvent::Hit(domain))
    }

    fn record_miss(&self, domain: CacheDomain) -> Result<(), MetricsError> {
        self.push(MetricEvent::Miss(domain))
    }

    fn record_invalidation(&self, domain: CacheDomain, removed: u64) -> Result<(), MetricsError> {
        self.push(MetricEvent::Invalidation(domain, removed))
    }
}

/// Sink that fails every call, by error or by panic.
#[derive(Default)]
pub struct BrokenMetrics {
    pub panics: bool,
    pub calls: AtomicUsize,
}

impl BrokenMetrics {
    fn fail(&self) -> Result<(), MetricsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("metrics backend exploded");
        }
        Err(MetricsError::new("exporter unavailable"))
    }
}

impl MetricsSink for BrokenMetrics {
    fn record_hit(&self, _domain: CacheDomain) -> Result<(), MetricsError> {
        self.fail()
    }

    fn record_miss(&self, _domain: CacheDomain) -> Result<(), MetricsError> {
        self.fail()
    }

    fn record_invalidation(&self, _domain: CacheDomain, _removed: u64) -> Result<(), MetricsError> {
        self.fail()
    }
}

/// Tracing layer counting events per level.
#[derive(Clone, Default)]
pub struct LevelCounter {
    errors: Arc<AtomicUsize>,
    warnings: Arc<AtomicUsize>,
    debugs: Arc<AtomicUsize>,
}

impl LevelCounter {
    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }

    pub fn warnings(&self) -> usize {
        self.warnings.load(Ordering::SeqCst)
    }

    pub fn debugs(&self) -> usize {
        self.debugs.load(Ordering::SeqCst)
    }

    /// Install as the thread's default subscriber until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        use tracing_subscriber::layer::SubscriberExt;
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }
}

impl<S: Subscriber> Layer<S> for LevelCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let counter = match *event.metadata().level() {
            Level::ERROR => &self.errors,
            Level::WARN => &self.warnings,
            Level::DEBUG => &self.debugs,
            _ => return,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}
