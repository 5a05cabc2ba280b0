use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;

#[test]
fn every_task_runs_exactly_once() {
  let pool = ThreadPool::with_threads(4);
  let counter = Arc::new(AtomicUsize::new(0));

  let handles: Vec<_> = (0..64)
    .map(|_| {
      let counter = Arc::clone(&counter);
      pool
        .enqueue(move |_idx| {
          counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap()
    })
    .collect();

  for handle in &handles {
    handle.wait();
  }

  assert_eq!(counter.load(Ordering::Relaxed), 64);
}

#[test]
fn worker_indices_are_stable_and_in_range() {
  let pool = ThreadPool::with_threads(3);
  let seen = Arc::new(Mutex::new(HashSet::new()));

  let handles: Vec<_> = (0..32)
    .map(|_| {
      let seen = Arc::clone(&seen);
      pool
        .enqueue(move |idx| {
          seen.lock().unwrap().insert(idx);
        })
        .unwrap()
    })
    .collect();

  for handle in &handles {
    handle.wait();
  }

  let seen = seen.lock().unwrap();
  assert!(!seen.is_empty());
  for idx in seen.iter() {
    assert!(*idx < pool.num_threads(), "index {} out of range", idx);
  }
}

#[test]
fn enqueue_after_shutdown_fails() {
  let pool = ThreadPool::with_threads(2);
  pool.shutdown();

  let result = pool.enqueue(|_idx| {});
  assert!(matches!(result, Err(PoolError::Stopped)));
}

#[test]
fn queued_tasks_drain_on_shutdown() {
  let counter = Arc::new(AtomicUsize::new(0));

  {
    let pool = ThreadPool::with_threads(2);
    for _ in 0..16 {
      let counter = Arc::clone(&counter);
      pool
        .enqueue(move |_idx| {
          std::thread::sleep(Duration::from_millis(1));
          counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }
    // drop joins, and queued tasks must still run
  }

  assert_eq!(counter.load(Ordering::Relaxed), 16);
}

#[test]
fn single_worker_serializes_tasks() {
  let pool = ThreadPool::with_threads(1);
  assert_eq!(pool.num_threads(), 1);

  let order = Arc::new(Mutex::new(Vec::new()));
  let handles: Vec<_> = (0..8)
    .map(|i| {
      let order = Arc::clone(&order);
      pool
        .enqueue(move |_idx| {
          order.lock().unwrap().push(i);
        })
        .unwrap()
    })
    .collect();

  for handle in &handles {
    handle.wait();
  }

  // FIFO on a single worker
  assert_eq!(*order.lock().unwrap(), (0..8).collect::<Vec<_>>());
}

#[test]
fn sleep_policy_still_completes_work() {
  let pool = ThreadPool::new(
    Affinity::All,
    false,
    2,
    SleepConfig {
      period: Duration::from_micros(50),
      duration: Duration::from_micros(100),
      method: SleepMethod::Sleep,
    },
  );

  let counter = Arc::new(AtomicUsize::new(0));
  let handles: Vec<_> = (0..32)
    .map(|_| {
      let counter = Arc::clone(&counter);
      pool
        .enqueue(move |_idx| {
          // enough busy work to trip the sleep policy occasionally
          std::thread::sleep(Duration::from_micros(20));
          counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap()
    })
    .collect();

  for handle in &handles {
    handle.wait();
  }

  assert_eq!(counter.load(Ordering::Relaxed), 32);
}

#[test]
fn spinlock_sleep_method_completes() {
  let pool = ThreadPool::new(
    Affinity::All,
    false,
    1,
    SleepConfig {
      period: Duration::from_micros(10),
      duration: Duration::from_micros(20),
      method: SleepMethod::Spinlock,
    },
  );

  let handle = pool.enqueue(|_idx| {}).unwrap();
  handle.wait();
}

#[test]
fn affinity_classes_produce_at_least_one_worker() {
  for affinity in [Affinity::All, Affinity::BigCores, Affinity::LittleCores] {
    let pool = ThreadPool::new(affinity, false, usize::MAX, SleepConfig::none());
    assert!(pool.num_threads() >= 1, "{:?} produced no workers", affinity);
  }
}

#[test]
fn max_threads_caps_worker_count() {
  let pool = ThreadPool::new(Affinity::All, false, 2, SleepConfig::none());
  assert!(pool.num_threads() <= 2);
}
