//! Dispatch of row-range work for the three execution strategies.
//!
//! Every phase is expressed as a function of `(worker index, row range)`.
//! A scheduler only decides how those calls are dispatched and joined; the
//! call returns once every range has finished, which is the phase barrier.

use crate::coordinator::RowRange;
use ecosim_core::{Error, ExecutionConfig, Result, Strategy};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use tracing::debug;

pub enum Scheduler {
    /// Ranges run one after another on the calling thread
    Sequential,
    /// Ranges run as a structured parallel-for inside a dedicated pool
    DataParallel { pool: ThreadPool, workers: usize },
    /// Each range is spawned as its own task on a dedicated pool
    TaskPool { pool: ThreadPool, workers: usize },
}

fn build_pool(strategy: Strategy, workers: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(move |i| format!("ecosim-{}-{}", strategy.name(), i))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))
}

impl Scheduler {
    pub fn new(config: &ExecutionConfig) -> Result<Self> {
        let workers = config.resolved_workers();
        let scheduler = match config.strategy {
            Strategy::Sequential => Scheduler::Sequential,
            Strategy::DataParallel => Scheduler::DataParallel {
                pool: build_pool(config.strategy, workers)?,
                workers,
            },
            Strategy::TaskPool => Scheduler::TaskPool {
                pool: build_pool(config.strategy, workers)?,
                workers,
            },
        };
        debug!(strategy = config.strategy.name(), workers, "Scheduler ready");
        Ok(scheduler)
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Scheduler::Sequential => Strategy::Sequential,
            Scheduler::DataParallel { .. } => Strategy::DataParallel,
            Scheduler::TaskPool { .. } => Strategy::TaskPool,
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            Scheduler::Sequential => 1,
            Scheduler::DataParallel { workers, .. } | Scheduler::TaskPool { workers, .. } => *workers,
        }
    }

    /// Run `f` once per range and return the results in range order
    pub fn map_ranges<T, F>(&self, ranges: &[RowRange], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, RowRange) -> T + Sync,
    {
        match self {
            Scheduler::Sequential => ranges
                .iter()
                .enumerate()
                .map(|(worker, range)| f(worker, *range))
                .collect(),
            Scheduler::DataParallel { pool, .. } => pool.install(|| {
                ranges
                    .par_iter()
                    .enumerate()
                    .map(|(worker, range)| f(worker, *range))
                    .collect()
            }),
            Scheduler::TaskPool { pool, .. } => {
                let slots: Vec<Mutex<Option<T>>> = ranges.iter().map(|_| Mutex::new(None)).collect();
                let f = &f;
                pool.scope(|scope| {
                    for (worker, (range, slot)) in ranges.iter().zip(&slots).enumerate() {
                        let range = *range;
                        scope.spawn(move |_| {
                            *slot.lock() = Some(f(worker, range));
                        });
                    }
                });
                // The scope has joined every task, so every slot is filled.
                slots.into_iter().filter_map(|slot| slot.into_inner()).collect()
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("strategy", &self.strategy())
            .field("workers", &self.workers())
            .finish()
    }
}
