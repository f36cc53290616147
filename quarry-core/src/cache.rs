use crate::{CacheKey, Statement};
use dashmap::DashMap;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// Tuning knobs of the compiled statement cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entry count above which the sweeper starts evicting.
    pub capacity: usize,
    /// Minimum interval between size checks, and the idle age below which a
    /// background sweep never evicts an entry.
    pub check_interval: Duration,
    /// Denominator of the eviction batch: one sweep removes at most
    /// `capacity / trim_fraction` entries.
    pub trim_fraction: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            check_interval: Duration::from_millis(100),
            trim_fraction: 5,
        }
    }
}

struct CacheEntry {
    statement: Arc<Statement>,
    /// Microseconds since the cache epoch of the last lookup or insert.
    last_used: AtomicU64,
}

/// Bounded concurrent map from query shape to compiled statement.
///
/// Lookups and inserts never block on maintenance: eviction runs on a
/// detached thread, at most one at a time, triggered by a rate-limited size
/// check on insert. The cache may transiently exceed `capacity` between the
/// trigger and the sweep.
pub struct StatementCache {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
    config: CacheConfig,
    epoch: Instant,
    last_check: AtomicU64,
    sweeping: Arc<AtomicBool>,
}

impl StatementCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
            epoch: Instant::now(),
            last_check: AtomicU64::new(0),
            sweeping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    /// Fetch the compiled statement for a key, refreshing its usage stamp.
    pub fn lookup(&self, key: &CacheKey) -> Option<Arc<Statement>> {
        let entry = self.entries.get(key)?;
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Some(entry.statement.clone())
    }

    /// Insert a freshly compiled statement, compacting it first so every
    /// cached template is in canonical fragment form. Returns the shared
    /// handle callers render from.
    pub fn add(&self, key: CacheKey, mut statement: Statement) -> Arc<Statement> {
        statement.compact();
        let statement = Arc::new(statement);
        self.entries.insert(
            key,
            CacheEntry {
                statement: statement.clone(),
                last_used: AtomicU64::new(self.tick()),
            },
        );
        self.maybe_check_size();
        statement
    }

    /// Rate-limited size check: at most one per `check_interval`, and the
    /// winning inserter pays only the cost of spawning the sweeper.
    fn maybe_check_size(&self) {
        let now = self.tick();
        let interval = self.config.check_interval.as_micros() as u64;
        let last = self.last_check.load(Ordering::Relaxed);
        if now.saturating_sub(last) < interval {
            return;
        }
        if self
            .last_check
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        // Start sweeping before the hard limit so growth and eviction overlap.
        if self.entries.len() * 5 >= self.config.capacity * 4
            && self
                .sweeping
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        {
            let entries = self.entries.clone();
            let sweeping = self.sweeping.clone();
            let config = self.config.clone();
            let threshold = now.saturating_sub(interval);
            let spawned = std::thread::Builder::new()
                .name("statement-cache-sweep".into())
                .spawn(move || {
                    sweep(&entries, &config, threshold);
                    sweeping.store(false, Ordering::Release);
                });
            if let Err(e) = spawned {
                self.sweeping.store(false, Ordering::Release);
                log::error!("Cannot spawn cache sweeper: {}", e);
            }
        }
    }

    /// Run one eviction pass synchronously, treating every current entry as
    /// idle. Maintenance normally runs on its own thread; this entry point
    /// exists for deterministic shutdown and inspection.
    pub fn sweep_now(&self) {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            sweep(&self.entries, &self.config, self.tick());
            self.sweeping.store(false, Ordering::Release);
        }
    }
}

/// Evict up to `capacity / trim_fraction` entries last used at or before
/// `threshold`, oldest usage first.
fn sweep(entries: &DashMap<CacheKey, CacheEntry>, config: &CacheConfig, threshold: u64) {
    // Evict only while above the pressure threshold that triggered the sweep.
    let floor = config.capacity * 4 / 5;
    let excess = entries.len().saturating_sub(floor);
    if excess == 0 {
        return;
    }
    let mut candidates: Vec<(CacheKey, u64)> = entries
        .iter()
        .filter_map(|entry| {
            let last_used = entry.last_used.load(Ordering::Relaxed);
            (last_used <= threshold).then(|| (entry.key().clone(), last_used))
        })
        .collect();
    candidates.sort_by_key(|&(_, last_used)| last_used);
    let limit = (config.capacity / config.trim_fraction).max(1).min(excess);
    let mut evicted = 0;
    for (key, last_used) in candidates.into_iter().take(limit) {
        // The entry may have been touched since the scan, skip it then.
        let removed = entries
            .remove_if(&key, |_, entry| {
                entry.last_used.load(Ordering::Relaxed) == last_used
            })
            .is_some();
        if removed {
            evicted += 1;
        }
    }
    if evicted > 0 {
        log::debug!("Evicted {} cached statements", evicted);
    }
}
