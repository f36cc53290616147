#[cfg(test)]
mod tests {
    use quarry::{
        CacheConfig, Command, Select, SqlBuf, Statement, StatementCache, StatementKind, TableRef,
        analyze,
    };
    use std::time::Duration;

    fn key_for(table: String) -> quarry::CacheKey {
        analyze(&Command::select(Select::new(TableRef::new(table))))
            .unwrap()
            .key
    }

    /// Check interval long enough that `add` never spawns the background
    /// sweeper, so eviction happens only through `sweep_now`.
    fn small_cache() -> StatementCache {
        StatementCache::new(CacheConfig {
            capacity: 10,
            check_interval: Duration::from_secs(3600),
            trim_fraction: 5,
        })
    }

    #[test]
    fn lookup_returns_the_shared_statement() {
        let cache = StatementCache::new(CacheConfig::default());
        let key = key_for("Book".into());
        assert!(cache.lookup(&key).is_none());
        let added = cache.add(key.clone(), Statement::new(StatementKind::Select));
        let found = cache.lookup(&key).unwrap();
        assert!(std::sync::Arc::ptr_eq(&added, &found));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn added_statements_are_compacted() {
        let cache = StatementCache::new(CacheConfig::default());
        let mut statement = Statement::new(StatementKind::Select);
        statement.push_str("SELECT ");
        statement.seal();
        statement.push_str("1");
        assert_eq!(statement.fragments().len(), 2);
        let added = cache.add(key_for("Book".into()), statement);
        assert!(added.is_compacted());
        assert_eq!(added.fragments().len(), 1);
    }

    #[test]
    fn sweep_keeps_the_cache_bounded() {
        let _ = env_logger::builder().is_test(true).try_init();
        let cache = small_cache();
        for i in 0..12 {
            cache.add(key_for(format!("T{}", i)), Statement::new(StatementKind::Select));
        }
        assert_eq!(cache.len(), 12);
        cache.sweep_now();
        // One sweep evicts at most capacity / trim_fraction entries.
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn recently_used_entries_survive_the_sweep() {
        let cache = small_cache();
        for i in 0..12 {
            cache.add(key_for(format!("T{}", i)), Statement::new(StatementKind::Select));
        }
        // Refresh one entry with a strictly newer usage stamp: it is no
        // longer the oldest and must survive.
        std::thread::sleep(Duration::from_millis(2));
        let favorite = key_for("T0".into());
        assert!(cache.lookup(&favorite).is_some());
        cache.sweep_now();
        assert_eq!(cache.len(), 10);
        assert!(cache.lookup(&favorite).is_some());
    }

    #[test]
    fn repeated_sweeps_converge() {
        let cache = small_cache();
        for i in 0..20 {
            cache.add(key_for(format!("T{}", i)), Statement::new(StatementKind::Select));
        }
        for _ in 0..10 {
            cache.sweep_now();
        }
        // Eviction stops at the pressure floor instead of draining the cache.
        assert_eq!(cache.len(), 8);
        cache.sweep_now();
        assert_eq!(cache.len(), 8);
    }
}
