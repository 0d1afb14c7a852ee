//! Concurrency Tests for the Stampede Guard
//!
//! An instrumented store records the interval of every store call. Under
//! concurrent load through one provider, no write interval may overlap any
//! other interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ranger_cache::{
    CacheCore, CacheOperations, CacheProvider, EnvelopeSerializer, KvClient, MemoryStore,
    Pipeline, Reply, Result, TextEncoding, Ttl,
};

// == Recording Store ==

#[derive(Debug, Clone, Copy)]
struct Interval {
    start: Instant,
    end: Instant,
    write: bool,
}

impl Interval {
    fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Wraps the memory store, stalls each call and records when it ran.
struct RecordingStore {
    inner: MemoryStore,
    delay: Duration,
    intervals: Mutex<Vec<Interval>>,
}

impl RecordingStore {
    fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
            intervals: Mutex::new(Vec::new()),
        }
    }

    async fn record<T>(&self, write: bool, call: impl std::future::Future<Output = T>) -> T {
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;
        let out = call.await;
        let end = Instant::now();
        self.intervals
            .lock()
            .unwrap()
            .push(Interval { start, end, write });
        out
    }

    fn intervals(&self) -> Vec<Interval> {
        self.intervals.lock().unwrap().clone()
    }
}

#[async_trait]
impl KvClient for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.record(false, self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.record(true, self.inner.set(key, value)).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        self.record(true, self.inner.expire(key, seconds)).await
    }

    async fn del(&self, key: &str) -> Result<u64> {
        self.record(true, self.inner.del(key)).await
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<Vec<Reply>> {
        let write = pipeline.has_writes();
        self.record(write, self.inner.execute(pipeline)).await
    }
}

// == Helper Functions ==

fn write_overlaps(intervals: &[Interval]) -> usize {
    let mut overlaps = 0;
    for (i, a) in intervals.iter().enumerate() {
        for b in &intervals[i + 1..] {
            if (a.write || b.write) && a.overlaps(b) {
                overlaps += 1;
            }
        }
    }
    overlaps
}

fn read_overlaps(intervals: &[Interval]) -> usize {
    let mut overlaps = 0;
    for (i, a) in intervals.iter().enumerate() {
        for b in &intervals[i + 1..] {
            if !a.write && !b.write && a.overlaps(b) {
                overlaps += 1;
            }
        }
    }
    overlaps
}

async fn mixed_load<C>(cache: Arc<C>, tasks: usize)
where
    C: CacheOperations + 'static,
{
    let mut handles = Vec::with_capacity(tasks);
    for i in 0..tasks {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let key = format!("k{}", i % 4);
            match i % 5 {
                0 => cache.set(&key, &(i as u64), Ttl::Seconds(60)).await,
                1 => {
                    let entries: HashMap<String, u64> =
                        [(key.clone(), i as u64), (format!("{}-b", key), 0)].into_iter().collect();
                    cache.set_batch(&entries, Ttl::Persistent).await
                }
                2 => cache.delete(&key).await,
                3 => cache
                    .get_batch::<u64, _>(&[key.as_str(), "k0", "k1"])
                    .await
                    .map(|_| ()),
                _ => cache.get::<u64>(&key).await.map(|_| ()),
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

// == Mutual Exclusion ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_guarded_writes_never_overlap() {
    let store = Arc::new(RecordingStore::new(Duration::from_millis(5)));
    let provider = Arc::new(CacheProvider::with_defaults(Arc::clone(&store)));

    mixed_load(provider, 40).await;

    let intervals = store.intervals();
    assert!(intervals.len() >= 40);
    assert_eq!(write_overlaps(&intervals), 0, "a write overlapped another call");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_guarded_reads_run_concurrently() {
    let store = Arc::new(RecordingStore::new(Duration::from_millis(50)));
    let provider = Arc::new(CacheProvider::with_defaults(Arc::clone(&store)));

    let started = Instant::now();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get::<u64>(&format!("r{}", i)).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), None);
    }

    assert!(read_overlaps(&store.intervals()) > 0);
    assert!(started.elapsed() < Duration::from_millis(8 * 50));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unguarded_core_lets_writes_overlap() {
    let store = Arc::new(RecordingStore::new(Duration::from_millis(20)));
    let core = Arc::new(CacheCore::new(
        Arc::clone(&store),
        EnvelopeSerializer::new(),
        TextEncoding::Latin1,
    ));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let core = Arc::clone(&core);
            tokio::spawn(async move { core.set(&format!("w{}", i), &i, Ttl::Persistent).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(write_overlaps(&store.intervals()) > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_separate_providers_are_independent_lock_domains() {
    let store = Arc::new(RecordingStore::new(Duration::from_millis(20)));
    let left = Arc::new(CacheProvider::with_defaults(Arc::clone(&store)));
    let right = Arc::new(CacheProvider::with_defaults(Arc::clone(&store)));

    let a = {
        let left = Arc::clone(&left);
        tokio::spawn(async move { left.set("shared", &1u8, Ttl::Persistent).await })
    };
    let b = {
        let right = Arc::clone(&right);
        tokio::spawn(async move { right.set("shared", &2u8, Ttl::Persistent).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert!(write_overlaps(&store.intervals()) > 0);
}
