//! Cooperative completion queue for asynchronous march results.
//!
//! Worker threads push zero-argument callbacks; one thread the application
//! designates as "main" drains them at a time of its choosing, typically
//! once per frame. Triangle consumer finalization always happens inside
//! drained callbacks, never on a pool worker.
//!
//! The queue is an explicit injected dependency rather than process-global
//! state, which keeps the core testable without a real main loop.

use crossbeam_channel::{unbounded, Receiver, Sender};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// FIFO of completion callbacks, cloneable across threads.
///
/// `drain()` must only be called from the single thread designated as main.
#[derive(Clone)]
pub struct MainThreadQueue {
  tx: Sender<Callback>,
  rx: Receiver<Callback>,
}

impl MainThreadQueue {
  pub fn new() -> Self {
    let (tx, rx) = unbounded();
    Self { tx, rx }
  }

  /// Enqueue a callback from any thread.
  pub fn add<F>(&self, f: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let _ = self.tx.send(Box::new(f));
  }

  /// Run every queued callback in submission order. Returns how many ran.
  pub fn drain(&self) -> usize {
    let mut ran = 0;
    while let Ok(callback) = self.rx.try_recv() {
      callback();
      ran += 1;
    }
    ran
  }

  /// Number of callbacks currently waiting.
  pub fn len(&self) -> usize {
    self.rx.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rx.is_empty()
  }
}

impl Default for MainThreadQueue {
  fn default() -> Self {
    Self::new()
  }
}
