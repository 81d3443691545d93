// A cache whose writes never return must not stall the throughput harness.

use cachemark_bench::runner::{measure_qps, throughput::Op, Trial};
use cachemark_engine::Cache;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// `set` parks forever; `close` is recorded
#[derive(Default)]
struct Wedged {
    closed: Arc<AtomicBool>,
    entered: AtomicUsize,
}

impl Cache<u64> for Wedged {
    fn get(&self, _key: &u64) -> Option<u64> {
        None
    }

    fn set(&self, _key: u64, _value: u64) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        loop {
            thread::park();
        }
    }

    fn name(&self) -> &str {
        "wedged"
    }

    fn len(&self) -> usize {
        0
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn setter() -> Arc<Op<u64>> {
    Arc::new(|c: &dyn Cache<u64>, i: usize| c.set(i as u64, i as u64))
}

#[test]
fn wedged_set_scores_zero_within_timeout() {
    let closed = Arc::new(AtomicBool::new(false));
    let cache = Arc::new(Wedged {
        closed: Arc::clone(&closed),
        ..Wedged::default()
    });

    let trial = Trial {
        threads: 4,
        duration: Duration::from_millis(20),
        batch_size: 100,
        hang_timeout: Duration::from_millis(200),
    };
    let start = Instant::now();
    let qps = measure_qps::<u64>(cache.clone(), setter(), trial);

    assert_eq!(qps, 0.0);
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "took {:?}",
        start.elapsed()
    );
    assert_eq!(cache.entered.load(Ordering::SeqCst), 4);

    // close runs on a detached thread; give it a moment
    let deadline = Instant::now() + Duration::from_secs(2);
    while !closed.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn healthy_cache_is_closed_after_trial() {
    let closed = Arc::new(AtomicBool::new(false));

    struct Counting {
        closed: Arc<AtomicBool>,
    }

    impl Cache<u64> for Counting {
        fn get(&self, key: &u64) -> Option<u64> {
            Some(*key)
        }
        fn set(&self, _key: u64, _value: u64) {}
        fn name(&self) -> &str {
            "counting"
        }
        fn len(&self) -> usize {
            0
        }
        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    let cache = Arc::new(Counting {
        closed: Arc::clone(&closed),
    });
    let trial = Trial {
        threads: 2,
        duration: Duration::from_millis(20),
        batch_size: 50,
        hang_timeout: Duration::from_secs(1),
    };
    let qps = measure_qps::<u64>(cache, setter(), trial);
    assert!(qps > 0.0);
    assert!(closed.load(Ordering::SeqCst));
}
