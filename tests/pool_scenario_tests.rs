//! Matching, eviction, misuse, and teardown scenarios, run against both pools.

mod support;

use std::sync::Arc;

use scratchpool::{BufferRecord, Error, PoolConfig, PoolEvent};
use support::{sizes, CountingHeap, Handle, RecordingSink};

macro_rules! pool_scenarios {
    ($module:ident, $pool:ident) => {
        #[allow(unused_mut)]
        mod $module {
            use super::*;
            use scratchpool::$pool;

            fn pool_with(config: PoolConfig) -> ($pool<CountingHeap>, Arc<RecordingSink>) {
                let sink = Arc::new(RecordingSink::default());
                let pool = $pool::with_backend(CountingHeap::default(), &config, sink.clone())
                    .expect("valid config");
                (pool, sink)
            }

            fn pool() -> ($pool<CountingHeap>, Arc<RecordingSink>) {
                pool_with(PoolConfig::default())
            }

            /// Ten cached records sized 1..=10, nothing on loan.
            fn primed() -> ($pool<CountingHeap>, Arc<RecordingSink>) {
                let (mut pool, sink) = pool();
                let handles: Vec<Handle> =
                    (1..=10).map(|s| pool.allocate(s).unwrap()).collect();
                for h in handles {
                    pool.release(h).unwrap();
                }
                assert_eq!(sizes(&pool.available_records()), (1..=10).collect::<Vec<_>>());
                (pool, sink)
            }

            #[test]
            fn allocated_size_is_at_least_requested() {
                let (mut pool, _) = pool();
                for size in [0, 1, 7, 300, 4096] {
                    let h = pool.allocate(size).unwrap();
                    let rec = pool
                        .checked_out_records()
                        .into_iter()
                        .find(|r| r.address == h.address)
                        .unwrap();
                    assert!(rec.size >= size);
                    pool.release(h).unwrap();
                }
            }

            #[test]
            fn round_trip_returns_same_address() {
                let (mut pool, _) = pool();
                let a = pool.allocate(512).unwrap();
                pool.release(a).unwrap();
                let b = pool.allocate(512).unwrap();
                assert_eq!(a.address, b.address);
                assert_eq!(pool.backend().allocations(), 1);
                pool.release(b).unwrap();
            }

            #[test]
            fn reuse_preserves_recorded_size() {
                let (mut pool, _) = pool();
                let a = pool.allocate(1000).unwrap();
                pool.release(a).unwrap();
                let b = pool.allocate(10).unwrap();
                assert_eq!(b.address, a.address);
                assert_eq!(
                    pool.checked_out_records(),
                    vec![BufferRecord::new(1000, a.address)]
                );
                pool.release(b).unwrap();
                assert_eq!(
                    pool.available_records(),
                    vec![BufferRecord::new(1000, a.address)]
                );
            }

            #[test]
            fn exact_ratio_only_matches_equal_size() {
                let (mut pool, _) = pool_with(PoolConfig {
                    match_ratio: 1.0,
                    ..PoolConfig::default()
                });
                let a = pool.allocate(64).unwrap();
                pool.release(a).unwrap();

                let smaller = pool.allocate(63).unwrap();
                assert_ne!(smaller.address, a.address);

                let exact = pool.allocate(64).unwrap();
                assert_eq!(exact.address, a.address);

                pool.release(smaller).unwrap();
                pool.release(exact).unwrap();
            }

            #[test]
            fn first_fit_follows_release_order() {
                let (mut pool, _) = pool();
                let big = pool.allocate(200).unwrap();
                let small = pool.allocate(50).unwrap();
                pool.release(big).unwrap();
                pool.release(small).unwrap();

                // Both fit with ratio 0; the first released wins, not the tightest.
                let h = pool.allocate(40).unwrap();
                assert_eq!(h.address, big.address);
                pool.release(h).unwrap();
            }

            #[test]
            fn growing_request_evicts_smallest() {
                let (mut pool, _) = primed();
                let h = pool.allocate(20).unwrap();

                assert_eq!(pool.backend().released_sizes(), vec![1]);
                assert_eq!(sizes(&pool.available_records()), (2..=10).collect::<Vec<_>>());
                assert_eq!(sizes(&pool.checked_out_records()), vec![20]);
                assert_eq!(h.size, 20);
                pool.release(h).unwrap();
            }

            #[test]
            fn shrinking_request_evicts_largest() {
                let (mut pool, _) = primed();
                // Ratio 0 would let any cached buffer serve a 0-byte request.
                pool.set_match_ratio(1.0).unwrap();
                let h = pool.allocate(0).unwrap();

                assert_eq!(pool.backend().released_sizes(), vec![10]);
                assert_eq!(sizes(&pool.available_records()), (1..=9).collect::<Vec<_>>());
                assert_eq!(sizes(&pool.checked_out_records()), vec![0]);
                pool.release(h).unwrap();
            }

            #[test]
            fn request_within_cached_range_does_not_evict() {
                let (mut pool, _) = pool_with(PoolConfig {
                    match_ratio: 1.0,
                    drop_threshold: 2,
                });
                let a = pool.allocate(2).unwrap();
                let b = pool.allocate(8).unwrap();
                pool.release(a).unwrap();
                pool.release(b).unwrap();

                // 2 <= 5 <= 8 but neither is an exact fit.
                let h = pool.allocate(5).unwrap();
                assert!(pool.backend().released().is_empty());
                assert_eq!(sizes(&pool.available_records()), vec![2, 8]);
                pool.release(h).unwrap();
            }

            #[test]
            fn eviction_keeps_cache_bounded() {
                let (mut pool, _) = pool_with(PoolConfig {
                    match_ratio: 0.0,
                    drop_threshold: 4,
                });
                // Ever-growing demand: every allocation misses, every release adds one.
                for size in 1..=50 {
                    let h = pool.allocate(size * 10).unwrap();
                    pool.release(h).unwrap();
                    assert!(pool.available_records().len() <= 4);
                }
                let stats = pool.stats();
                assert_eq!(stats.misses, 50);
                assert_eq!(stats.evictions, 46);
            }

            #[test]
            fn drop_threshold_zero_evicts_on_every_miss() {
                let (mut pool, _) = pool();
                pool.set_drop_threshold(0);
                let small = pool.allocate(8).unwrap();
                pool.release(small).unwrap();

                // 16 > every cached size: the cached 8 goes back before the fresh allocation.
                let big = pool.allocate(16).unwrap();
                assert_eq!(pool.backend().released(), vec![small]);
                assert!(pool.available_records().is_empty());
                assert_eq!(pool.stats().evictions, 1);
                pool.release(big).unwrap();

                // An empty cache has nothing to evict, so a miss is a plain allocation.
                pool.clear();
                let fresh = pool.allocate(4).unwrap();
                assert_eq!(pool.stats().evictions, 1);
                pool.release(fresh).unwrap();
            }

            #[test]
            fn huge_threshold_never_evicts() {
                let (mut pool, _) = pool_with(PoolConfig {
                    match_ratio: 0.0,
                    drop_threshold: usize::MAX,
                });
                for size in 1..=30 {
                    let h = pool.allocate(size).unwrap();
                    pool.release(h).unwrap();
                }
                assert!(pool.backend().released().is_empty());
                assert_eq!(pool.available_records().len(), 30);
            }

            #[test]
            fn rejected_ratio_keeps_prior_value() {
                let (mut pool, sink) = pool();
                let err = pool.set_match_ratio(2.0).unwrap_err();
                assert!(matches!(err, Error::InvalidConfiguration { field: "match_ratio", .. }));
                assert_eq!(pool.config().match_ratio, 0.0);
                assert_eq!(
                    sink.events(),
                    vec![PoolEvent::InvalidConfiguration {
                        field: "match_ratio",
                        value: "2".into(),
                    }]
                );

                // Ratio 0 still in force: a 100-byte buffer serves a 1-byte request.
                let a = pool.allocate(100).unwrap();
                pool.release(a).unwrap();
                let b = pool.allocate(1).unwrap();
                assert_eq!(b.address, a.address);
                pool.release(b).unwrap();
            }

            #[test]
            fn negative_and_nan_ratios_are_rejected() {
                let (mut pool, sink) = pool();
                pool.set_match_ratio(0.25).unwrap();
                assert!(pool.set_match_ratio(-0.5).is_err());
                assert!(pool.set_match_ratio(f32::NAN).is_err());
                assert_eq!(pool.config().match_ratio, 0.25);
                assert_eq!(
                    sink.count(|e| matches!(e, PoolEvent::InvalidConfiguration { .. })),
                    2
                );
            }

            #[test]
            fn invalid_construction_config_is_reported() {
                let sink = Arc::new(RecordingSink::default());
                let cfg = PoolConfig {
                    match_ratio: 1.5,
                    ..PoolConfig::default()
                };
                let res = $pool::with_backend(CountingHeap::default(), &cfg, sink.clone());
                assert!(matches!(res, Err(Error::InvalidConfiguration { .. })));
                assert_eq!(sink.events().len(), 1);
            }

            #[test]
            fn double_release_is_rejected_once() {
                let (mut pool, sink) = pool();
                let h = pool.allocate(32).unwrap();
                pool.release(h).unwrap();

                let before = (pool.available_records(), pool.checked_out_records());
                let err = pool.release(h).unwrap_err();
                assert!(matches!(
                    err,
                    Error::UntrackedRelease {
                        address,
                        double_release: true,
                    } if address == h.address
                ));
                assert_eq!((pool.available_records(), pool.checked_out_records()), before);
                assert_eq!(
                    sink.events(),
                    vec![PoolEvent::UntrackedRelease {
                        address: h.address,
                        double_release: true,
                        available: 1,
                        checked_out: 0,
                    }]
                );
                assert!(pool.backend().released().is_empty());
            }

            #[test]
            fn foreign_release_is_rejected_without_forwarding() {
                let (mut pool, sink) = pool();
                let kept = pool.allocate(16).unwrap();
                let foreign = Handle { address: 0xdead_0000, size: 16 };

                let err = pool.release(foreign).unwrap_err();
                assert!(matches!(err, Error::UntrackedRelease { double_release: false, .. }));
                assert_eq!(sink.count(|e| matches!(e, PoolEvent::UntrackedRelease { .. })), 1);
                assert!(pool.backend().released().is_empty());
                assert_eq!(pool.checked_out_records().len(), 1);
                assert!(pool.available_records().is_empty());
                assert_eq!(pool.stats().rejected_releases, 1);
                pool.release(kept).unwrap();
            }

            #[test]
            fn clear_releases_cache_only() {
                let (mut pool, _) = pool();
                let a = pool.allocate(1).unwrap();
                let b = pool.allocate(2).unwrap();
                let c = pool.allocate(3).unwrap();
                pool.release(a).unwrap();
                pool.release(b).unwrap();

                pool.clear();
                assert_eq!(pool.backend().released(), vec![a, b]);
                assert!(pool.available_records().is_empty());
                assert_eq!(pool.checked_out_records(), vec![BufferRecord::new(3, c.address)]);

                pool.release(c).unwrap();
                assert_eq!(pool.available_records().len(), 1);
            }

            #[test]
            fn drop_reports_each_outstanding_loan() {
                let (mut pool, sink) = pool();
                let a = pool.allocate(8).unwrap();
                let b = pool.allocate(16).unwrap();
                let c = pool.allocate(24).unwrap();
                pool.release(b).unwrap();
                drop(pool);

                let leaks: Vec<_> = sink
                    .events()
                    .into_iter()
                    .filter_map(|e| match e {
                        PoolEvent::OutstandingAtTeardown { address, size, checked_out } => {
                            assert_eq!(checked_out, 2);
                            Some((address, size))
                        }
                        _ => None,
                    })
                    .collect();
                assert_eq!(leaks, vec![(a.address, 8), (c.address, 24)]);
            }

            #[test]
            fn close_returns_outstanding_records() {
                let (mut pool, sink) = pool();
                let a = pool.allocate(8).unwrap();
                match pool.close() {
                    Err(Error::OutstandingAtTeardown { records }) => {
                        assert_eq!(records, vec![BufferRecord::new(8, a.address)]);
                    }
                    other => panic!("expected outstanding loans, got {other:?}"),
                }
                // Drop after close must not report the loan a second time.
                assert_eq!(sink.events().len(), 1);
            }

            #[test]
            fn clean_close_releases_cache() {
                let (mut pool, sink) = pool();
                let a = pool.allocate(8).unwrap();
                pool.release(a).unwrap();
                assert!(pool.close().is_ok());
                assert!(sink.events().is_empty());
            }

            #[test]
            fn ratio_is_quantized() {
                let (mut pool, _) = pool();
                pool.set_match_ratio(0.3).unwrap();
                // floor(0.3 * 256) = 76
                assert_eq!(pool.config().match_ratio, 76.0 / 256.0);
            }
        }
    };
}

pool_scenarios!(synchronized, PoolAllocator);
pool_scenarios!(unsynchronized, UnlockedPoolAllocator);
