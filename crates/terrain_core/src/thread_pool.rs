//! Fixed worker pool with stable worker indices.
//!
//! Jobs receive the 0-based index of the thread running them, which callers
//! use to bind each worker to a dedicated triangle consumer so the hot path
//! never synchronizes between "add triangle" calls.
//!
//! The pool optionally pins workers to CPUs and can periodically sleep
//! workers to mitigate cores overheating and being throttled by the OS.
//! A little periodic sleeping has been observed to *increase* throughput on
//! long-running workloads on mobile SoCs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};
use thiserror::Error;
use tracing::debug;

/// Which class of cores the pool's workers should occupy.
///
/// Big/little partitioning is detected from per-core max frequencies where
/// the OS exposes them; on symmetric machines every class resolves to all
/// cores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Affinity {
  All,
  BigCores,
  LittleCores,
}

/// The technique used to sleep a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepMethod {
  None,
  Sleep,
  Spinlock,
}

/// If/how to periodically sleep worker threads.
///
/// After `period` of cumulative busy time, a worker sleeps for `duration`
/// per elapsed period, capped at 3 periods so an abnormally long single task
/// cannot park a worker indefinitely. Best effort only.
#[derive(Clone, Copy, Debug)]
pub struct SleepConfig {
  /// How often each thread will be slept.
  pub period: Duration,
  /// How long the thread will sleep for.
  pub duration: Duration,
  /// The technique used to sleep the thread.
  pub method: SleepMethod,
}

impl SleepConfig {
  /// No sleeping; threads run at full bore.
  pub fn none() -> Self {
    Self {
      period: Duration::ZERO,
      duration: Duration::ZERO,
      method: SleepMethod::None,
    }
  }

  fn is_active(&self) -> bool {
    self.method != SleepMethod::None && !self.duration.is_zero() && !self.period.is_zero()
  }
}

impl Default for SleepConfig {
  fn default() -> Self {
    Self::none()
  }
}

/// Errors from pool misuse.
#[derive(Debug, Error)]
pub enum PoolError {
  /// Work was submitted after shutdown began.
  #[error("thread pool is stopped")]
  Stopped,
}

type Job = Box<dyn FnOnce(usize) + Send + 'static>;

/// Completion handle for an enqueued job.
///
/// Once dequeued a job cannot be cancelled, only waited on.
pub struct TaskHandle {
  done: Receiver<()>,
}

impl TaskHandle {
  /// Block until the job has run.
  pub fn wait(&self) {
    // a disconnect (worker gone) also counts as done
    let _ = self.done.recv();
  }
}

struct PoolState {
  tasks: VecDeque<Job>,
  stop: bool,
}

struct Shared {
  state: Mutex<PoolState>,
  task_available: Condvar,
  sleep_config: SleepConfig,
  // one global flag so at most one worker naps at a time
  sleeping: AtomicBool,
}

/// A simple fixed-size thread pool.
///
/// Tasks queued before shutdown are drained; tasks submitted after shutdown
/// fail with [`PoolError::Stopped`].
pub struct ThreadPool {
  shared: Arc<Shared>,
  workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
  /// Create a pool over the cores selected by `affinity`.
  ///
  /// `pin_threads` pins each worker to one CPU of the affinity class (best
  /// effort, Linux/Android only). `max_threads` caps the worker count below
  /// the number of cores in the class; at least one worker is always
  /// created.
  pub fn new(
    affinity: Affinity,
    pin_threads: bool,
    max_threads: usize,
    sleep_config: SleepConfig,
  ) -> Self {
    let cpus = cores_in_class(affinity);
    let count = cpus.len().min(max_threads).max(1);

    let shared = Arc::new(Shared {
      state: Mutex::new(PoolState {
        tasks: VecDeque::new(),
        stop: false,
      }),
      task_available: Condvar::new(),
      sleep_config,
      sleeping: AtomicBool::new(false),
    });

    let workers = (0..count)
      .map(|i| {
        let shared = Arc::clone(&shared);
        let cpu = if pin_threads { cpus.get(i).copied() } else { None };
        thread::Builder::new()
          .name(format!("mesher-{}", i))
          .spawn(move || worker_loop(shared, i, cpu))
          .expect("failed to spawn pool worker")
      })
      .collect();

    debug!(threads = count, ?affinity, pinned = pin_threads, "thread pool up");

    Self { shared, workers }
  }

  /// Convenience constructor: `count` unpinned workers, no sleep policy.
  pub fn with_threads(count: usize) -> Self {
    Self::new(Affinity::All, false, count.max(1), SleepConfig::none())
  }

  /// Number of worker threads; job indices are in `0..num_threads()`.
  pub fn num_threads(&self) -> usize {
    self.workers.len()
  }

  /// Enqueue a job to run. The job receives the stable index of the worker
  /// executing it.
  pub fn enqueue<F>(&self, f: F) -> Result<TaskHandle, PoolError>
  where
    F: FnOnce(usize) + Send + 'static,
  {
    let (tx, rx) = bounded(1);

    let mut state = self.shared.state.lock().unwrap();
    if state.stop {
      return Err(PoolError::Stopped);
    }

    state.tasks.push_back(Box::new(move |idx| {
      f(idx);
      let _ = tx.send(());
    }));
    drop(state);
    self.shared.task_available.notify_one();

    Ok(TaskHandle { done: rx })
  }

  /// Begin shutdown: already-queued tasks still drain, new submissions
  /// fail. Idempotent; `Drop` joins the workers.
  pub fn shutdown(&self) {
    let mut state = self.shared.state.lock().unwrap();
    state.stop = true;
    drop(state);
    self.shared.task_available.notify_all();
  }
}

impl Drop for ThreadPool {
  fn drop(&mut self) {
    self.shutdown();
    for worker in self.workers.drain(..) {
      let _ = worker.join();
    }
  }
}

fn worker_loop(shared: Arc<Shared>, thread_idx: usize, cpu: Option<usize>) {
  if let Some(cpu) = cpu {
    pin_to_cpu(cpu);
  }

  let mut elapsed_work = Duration::ZERO;

  loop {
    let job = {
      let mut state = shared.state.lock().unwrap();
      loop {
        if let Some(job) = state.tasks.pop_front() {
          break job;
        }
        if state.stop {
          return;
        }
        state = shared.task_available.wait(state).unwrap();
      }
    };

    let start = Instant::now();
    job(thread_idx);
    elapsed_work += start.elapsed();

    maybe_sleep(&shared, &mut elapsed_work);
  }
}

/// Nap after enough cumulative busy time, if the policy asks for it.
fn maybe_sleep(shared: &Shared, elapsed_work: &mut Duration) {
  let config = &shared.sleep_config;
  if !config.is_active() || *elapsed_work < config.period {
    return;
  }

  // only one worker naps at a time; the rest keep draining the queue
  if shared
    .sleeping
    .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
    .is_err()
  {
    return;
  }

  // sleep one duration per period worked; a long-running task shouldn't
  // put us to sleep forever, so max out at 3 periods
  let periods = (elapsed_work.as_nanos() / config.period.as_nanos()).min(3) as u32;
  let nap = config.duration * periods;

  match config.method {
    SleepMethod::None => {}
    SleepMethod::Sleep => thread::sleep(nap),
    SleepMethod::Spinlock => {
      let start = Instant::now();
      while start.elapsed() < nap {
        thread::yield_now();
      }
    }
  }

  *elapsed_work = Duration::ZERO;
  shared.sleeping.store(false, Ordering::Release);
}

// =============================================================================
// Core topology
// =============================================================================

/// CPU ids belonging to an affinity class.
///
/// On asymmetric SoCs the "big" cores report the highest max frequency;
/// without frequency data every class degrades to all cores.
fn cores_in_class(affinity: Affinity) -> Vec<usize> {
  let total = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
  let all: Vec<usize> = (0..total).collect();

  if affinity == Affinity::All {
    return all;
  }

  let freqs: Vec<Option<u64>> = (0..total).map(core_max_freq).collect();
  let Some(max_freq) = freqs.iter().flatten().copied().max() else {
    return all;
  };
  let Some(min_freq) = freqs.iter().flatten().copied().min() else {
    return all;
  };
  if max_freq == min_freq {
    // symmetric machine
    return all;
  }

  let selected: Vec<usize> = all
    .iter()
    .copied()
    .filter(|&i| match (affinity, freqs[i]) {
      (Affinity::BigCores, Some(f)) => f == max_freq,
      (Affinity::LittleCores, Some(f)) => f < max_freq,
      _ => false,
    })
    .collect();

  if selected.is_empty() {
    all
  } else {
    selected
  }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn core_max_freq(cpu: usize) -> Option<u64> {
  let path = format!("/sys/devices/system/cpu/cpu{}/cpufreq/cpuinfo_max_freq", cpu);
  std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn core_max_freq(_cpu: usize) -> Option<u64> {
  None
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn pin_to_cpu(cpu: usize) {
  unsafe {
    let mut set: libc::cpu_set_t = std::mem::zeroed();
    libc::CPU_SET(cpu, &mut set);
    libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
  }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn pin_to_cpu(_cpu: usize) {}

#[cfg(test)]
#[path = "thread_pool_test.rs"]
mod thread_pool_test;
