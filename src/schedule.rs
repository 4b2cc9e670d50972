//! Deferred dependency connection
//!
//! Bindings render synchronously on `bind` but subscribe to their
//! dependencies through a [`ConnectScheduler`]. [`ConnectQueue`] batches that
//! work across many bindings created in one render pass; [`ImmediateScheduler`]
//! connects on the spot.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::binding::Connect;
use crate::config::QueueConfig;
use crate::error::Result;

/// Accepts bindings whose `connect` should run later
pub trait ConnectScheduler {
    fn enqueue(&self, binding: Rc<dyn Connect>) -> Result<()>;
}

/// Connects every binding as soon as it is enqueued
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl ConnectScheduler for ImmediateScheduler {
    fn enqueue(&self, binding: Rc<dyn Connect>) -> Result<()> {
        binding.connect(false)
    }
}

/// Batched connect queue.
///
/// The first `minimum_immediate` enqueues since the queue last drained connect
/// right away. Later bindings wait for [`ConnectQueue::flush`], which forces
/// re-evaluation (a dependency may have changed in between) and stops at a
/// checkpoint once the frame budget is spent.
pub struct ConnectQueue {
    config: QueueConfig,
    immediate: Cell<usize>,
    queue: RefCell<VecDeque<Rc<dyn Connect>>>,
    queued: RefCell<FxHashSet<*const ()>>,
}

impl ConnectQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            immediate: Cell::new(0),
            queue: RefCell::new(VecDeque::new()),
            queued: RefCell::new(FxHashSet::default()),
        }
    }

    /// Bindings waiting for the next flush
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Connect queued bindings in order; returns how many were processed.
    ///
    /// Only bindings queued before the call are considered. When the budget
    /// runs out the remainder stays queued for the next flush.
    pub fn flush(&self) -> Result<usize> {
        let start = Instant::now();
        let budget = Duration::from_millis(self.config.frame_budget_ms);
        let check_interval = self.config.check_interval.max(1);
        let length = self.pending();
        let mut processed = 0;

        while processed < length {
            let Some(binding) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            self.queued.borrow_mut().remove(&key(&binding));
            processed += 1;
            binding.connect(true)?;

            if processed % check_interval == 0 && start.elapsed() > budget {
                debug!(processed, remaining = self.pending(), "connect queue over frame budget");
                break;
            }
        }

        if self.pending() == 0 {
            self.immediate.set(0);
        }
        trace!(processed, "connect queue flushed");
        Ok(processed)
    }
}

impl Default for ConnectQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl ConnectScheduler for ConnectQueue {
    fn enqueue(&self, binding: Rc<dyn Connect>) -> Result<()> {
        if self.immediate.get() < self.config.minimum_immediate {
            self.immediate.set(self.immediate.get() + 1);
            return binding.connect(false);
        }
        if self.queued.borrow_mut().insert(key(&binding)) {
            self.queue.borrow_mut().push_back(binding);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectQueue")
            .field("immediate", &self.immediate.get())
            .field("pending", &self.pending())
            .finish()
    }
}

fn key(binding: &Rc<dyn Connect>) -> *const () {
    Rc::as_ptr(binding) as *const ()
}
