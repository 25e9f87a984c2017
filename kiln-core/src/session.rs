//! 求值会话
//!
//! 把一次编译的配置、调度器和报告器打包在一起。原本会成为进程级全局状态
//! 的东西都归会话所有，并显式传递。

use std::sync::Arc;

use kiln_config::EngineConfig;

use crate::diagnostics::{DiagnosticBuffer, Reporter};
use crate::engine::{Evaluator, Scheduler, WorkerPool};

pub struct Session {
    config: EngineConfig,
    scheduler: Scheduler,
    diagnostics: Option<Arc<DiagnosticBuffer>>,
}

impl Session {
    /// 报告写入内存 [`DiagnosticBuffer`] 的会话
    pub fn new(config: EngineConfig) -> Self {
        let buffer = Arc::new(DiagnosticBuffer::new());
        let scheduler = Scheduler::new(config.limits.clone(), buffer.clone());
        Self {
            config,
            scheduler,
            diagnostics: Some(buffer),
        }
    }

    /// 报告写入调用方提供的报告器的会话
    pub fn with_reporter(config: EngineConfig, reporter: Arc<dyn Reporter>) -> Self {
        let scheduler = Scheduler::new(config.limits.clone(), reporter);
        Self {
            config,
            scheduler,
            diagnostics: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// 会话自带的内存缓冲区（如果有）
    pub fn diagnostics(&self) -> Option<&Arc<DiagnosticBuffer>> {
        self.diagnostics.as_ref()
    }

    /// 单线程求值用的求值器
    pub fn evaluator(&self) -> Evaluator<'_> {
        self.scheduler.evaluator()
    }

    /// 按会话配置设定大小的工作线程池
    pub fn pool(&self) -> WorkerPool<'_> {
        WorkerPool::new(&self.scheduler, self.config.pool.clone())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
