//! 有界工作线程池
//!
//! 任务是相互独立的顶层工作，通常是"求这个节点的这个属性"。启动前按阶段
//! 排序，低阶段任务还在队列里时，不会有线程取到阶段 `k` 的任务。

use std::collections::VecDeque;
use std::thread;

use kiln_config::PoolConfig;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::engine::error::EngineError;
use crate::engine::scheduler::{Evaluator, Scheduler};
use crate::engine::unit::Phase;

type Task<'a> = Box<dyn FnOnce(&mut Evaluator<'_>) -> Result<(), EngineError> + Send + 'a>;

/// 排队中的顶层任务
pub struct Job<'a> {
    label: String,
    phase: Option<Phase>,
    task: Task<'a>,
}

/// 线程池运行汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// 每个工作线程完成的任务数，按线程编号索引
    pub completed: Vec<usize>,
}

impl PoolReport {
    pub fn total(&self) -> usize {
        self.completed.iter().sum()
    }
}

/// 在共享同一调度器的 scoped 线程上运行任务
pub struct WorkerPool<'a> {
    scheduler: &'a Scheduler,
    config: PoolConfig,
    jobs: Vec<Job<'a>>,
}

impl<'a> WorkerPool<'a> {
    pub fn new(scheduler: &'a Scheduler, config: PoolConfig) -> Self {
        Self {
            scheduler,
            config,
            jobs: Vec::new(),
        }
    }

    /// 提交任务
    ///
    /// 没有阶段的任务排在所有带阶段的任务之前。
    pub fn submit<F>(&mut self, label: impl Into<String>, phase: Option<Phase>, task: F)
    where
        F: FnOnce(&mut Evaluator<'_>) -> Result<(), EngineError> + Send + 'a,
    {
        self.jobs.push(Job {
            label: label.into(),
            phase,
            task: Box::new(task),
        });
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// 运行全部任务并等待所有工作线程
    ///
    /// 出现第一个错误后不再分发任务，并返回该错误。
    pub fn run(self) -> Result<PoolReport, EngineError> {
        let WorkerPool {
            scheduler,
            config,
            mut jobs,
        } = self;
        let workers = config.workers.max(1);

        jobs.sort_by_key(|job| job.phase);
        info!(target: "kiln::pool", workers, jobs = jobs.len(), "starting worker pool");

        let queue = Mutex::new(VecDeque::from(jobs));
        let first_error: Mutex<Option<EngineError>> = Mutex::new(None);

        let completed = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let queue = &queue;
                    let first_error = &first_error;
                    let name = format!("kiln-worker-{worker}");
                    let spawned = thread::Builder::new()
                        .name(name.clone())
                        .stack_size(config.stack_size)
                        .spawn_scoped(scope, move || {
                            work(scheduler, worker, queue, first_error)
                        });
                    (name, spawned)
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, spawned)| {
                    let handle = spawned.map_err(|_| EngineError::WorkerPanicked(name.clone()))?;
                    handle.join().map_err(|_| EngineError::WorkerPanicked(name))
                })
                .collect::<Result<Vec<usize>, EngineError>>()
        })?;

        if let Some(err) = first_error.into_inner() {
            warn!(target: "kiln::pool", error = %err, "worker pool aborted");
            return Err(err);
        }

        let report = PoolReport { completed };
        info!(target: "kiln::pool", jobs = report.total(), "worker pool finished");
        Ok(report)
    }
}

fn work(
    scheduler: &Scheduler,
    worker: usize,
    queue: &Mutex<VecDeque<Job<'_>>>,
    first_error: &Mutex<Option<EngineError>>,
) -> usize {
    let mut ev = scheduler.evaluator();
    let mut done = 0;
    loop {
        if first_error.lock().is_some() {
            break;
        }
        let Some(job) = queue.lock().pop_front() else {
            break;
        };

        debug!(target: "kiln::pool", worker, job = %job.label, phase = ?job.phase, "picked job");
        match (job.task)(&mut ev) {
            Ok(()) => done += 1,
            Err(err) => {
                warn!(target: "kiln::pool", worker, job = %job.label, error = %err, "job failed");
                first_error.lock().get_or_insert(err);
                break;
            }
        }
    }
    done
}
