use std::time::Instant;

use crate::error::Error;
use crate::util::Result;

/// Accumulates the cost of one evaluation: CPU seconds, GPU seconds and I/O
/// bytes, each split into the node's own share (`self_*`) and the share of
/// the whole subtree (`all_*`).
///
/// Only one timer may run at a time. Self-cost attribution works by pausing
/// the parent's timer while a child runs, see
/// [`OperatorSources`](super::OperatorSources).
#[derive(Debug, Default)]
pub struct QueryProfiler {
    pub self_cpu: f64,
    pub all_cpu: f64,
    pub self_gpu: f64,
    pub all_gpu: f64,
    pub self_io: u64,
    pub all_io: u64,
    t_start: Option<Instant>,
}

impl QueryProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_timer(&mut self) -> Result<()> {
        if self.t_start.is_some() {
            return Err(Error::TimerAlreadyRunning);
        }
        self.t_start = Some(Instant::now());
        Ok(())
    }

    pub fn stop_timer(&mut self) -> Result<()> {
        let started = self.t_start.take().ok_or(Error::TimerNotRunning)?;
        let cost = started.elapsed().as_secs_f64();
        self.self_cpu += cost;
        self.all_cpu += cost;
        Ok(())
    }

    pub fn add_gpu_cost(&mut self, seconds: f64) {
        self.self_gpu += seconds;
        self.all_gpu += seconds;
    }

    pub fn add_io_cost(&mut self, bytes: u64) {
        self.self_io += bytes;
        self.all_io += bytes;
    }

    /// Adds a finished child profiler's total cost to this profiler's total
    pub fn add_child(&mut self, child: &QueryProfiler) -> Result<()> {
        if child.t_start.is_some() {
            return Err(Error::TimerStillRunning);
        }
        self.all_cpu += child.all_cpu;
        self.all_gpu += child.all_gpu;
        self.all_io += child.all_io;
        Ok(())
    }
}
